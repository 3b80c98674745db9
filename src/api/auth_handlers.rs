//! Authentication route handlers — Google sign-in, token refresh, logout.
//!
//! Endpoints:
//! - `POST /auth/google`  — Verifies a Google ID token, returns a token pair
//! - `POST /auth/refresh` — Rotates a refresh token, returns a new pair
//! - `POST /auth/logout`  — Revokes a refresh token

use crate::api::handlers::{AppError, AppState};
use crate::auth::service::{AuthResponse, SignOutResult};
use crate::store::SessionMetadata;
use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    Json,
};
use serde::Deserialize;
use tracing::info;

// ============================================================================
// Request types
// ============================================================================

/// Request body for POST /auth/google
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GoogleSignInRequest {
    pub id_token: String,
}

/// Request body for POST /auth/refresh and POST /auth/logout
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

/// Client details recorded with a new session
fn session_metadata(headers: &HeaderMap) -> SessionMetadata {
    let header_str = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    SessionMetadata {
        device_info: header_str("x-device-info"),
        // First hop is the original client
        ip_address: header_str("x-forwarded-for")
            .and_then(|v| v.split(',').next().map(|ip| ip.trim().to_string())),
        user_agent: header_str(header::USER_AGENT.as_str()),
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /auth/google
pub async fn google_sign_in(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<GoogleSignInRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let resp = state
        .auth
        .sign_in_with_metadata(&body.id_token, session_metadata(&headers))
        .await?;

    info!(user_id = %resp.user.id, "User signed in with Google");
    Ok((StatusCode::CREATED, Json(resp)))
}

/// POST /auth/refresh
pub async fn refresh_token(
    State(state): State<AppState>,
    Json(body): Json<RefreshTokenRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let resp = state.auth.refresh(&body.refresh_token).await?;

    info!(user_id = %resp.user.id, "Refresh token rotated");
    Ok(Json(resp))
}

/// POST /auth/logout
pub async fn logout(
    State(state): State<AppState>,
    Json(body): Json<RefreshTokenRequest>,
) -> Result<Json<SignOutResult>, AppError> {
    let resp = state.auth.sign_out(&body.refresh_token).await?;

    info!(user_id = %resp.user_id, "User logged out");
    Ok(Json(resp))
}

// ============================================================================
// Tests
// ============================================================================
