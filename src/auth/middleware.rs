//! Auth middleware for Axum routes.
//!
//! Validates access tokens from the `Authorization: Bearer` header and
//! injects the caller's identity into request extensions.

use crate::api::handlers::{AppError, AppState};
use crate::auth::extractor::AuthUser;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::debug;

/// Middleware that requires a valid access token.
///
/// # Behavior
/// 1. Extract `Authorization: Bearer <token>` header → 401 if missing
/// 2. Validate signature, expiry and token type → 401 if invalid
/// 3. Inject [`AuthUser`] into request extensions for downstream handlers
///
/// Never touches the stores.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = req
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("missing authorization header".to_string()))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Unauthorized("invalid authorization header format".to_string()))?;

    let user_id = state.auth.validate_access_token(token).map_err(|e| {
        debug!(error = ?e.private_cause(), "Rejected access token");
        AppError::Unauthorized(e.public_message())
    })?;

    req.extensions_mut().insert(AuthUser { user_id });

    Ok(next.run(req).await)
}

// ============================================================================
// Tests
// ============================================================================
