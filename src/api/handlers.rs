//! Shared API state, health check and error mapping

use crate::auth::error::{AuthError, ErrorKind};
use crate::auth::service::AuthService;
use crate::profile::ProfileService;
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Shared server state
pub struct ServerState {
    pub auth: Arc<AuthService>,
    pub profile: Arc<ProfileService>,
}

/// State handed to every handler
pub type AppState = Arc<ServerState>;

// ============================================================================
// Health
// ============================================================================

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// GET /health — liveness probe, no dependencies checked
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============================================================================
// Error handling
// ============================================================================

/// Error returned by handlers. Rendered as `{"error": message}`.
#[derive(Debug)]
pub enum AppError {
    Internal(String),
    NotFound(String),
    BadRequest(String),
    Unauthorized(String),
    ServiceUnavailable(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
        };

        let body = Json(serde_json::json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

/// Only the public message reaches the client; the cause chain is logged.
impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        let message = err.public_message();
        let cause = err.private_cause();
        match err.kind() {
            ErrorKind::InvalidInput => {
                debug!(error = %message, "Rejected request input");
                AppError::BadRequest(message)
            }
            ErrorKind::IdentityProvider => {
                warn!(error = %message, cause = ?cause, "Identity check failed");
                AppError::Unauthorized(message)
            }
            ErrorKind::StateConflict => {
                debug!(error = %message, "Refresh token no longer usable");
                AppError::Unauthorized(message)
            }
            ErrorKind::NotFound => AppError::NotFound(message),
            ErrorKind::Persistence => {
                error!(error = %message, cause = ?cause, "Request failed");
                AppError::Internal(message)
            }
            ErrorKind::Cancelled => {
                warn!(error = %message, "Request aborted");
                AppError::ServiceUnavailable(message)
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
