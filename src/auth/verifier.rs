//! Identity assertion verification contract.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Facts extracted from a verified Google ID token.
///
/// `sub` and `email` are always present on success. Profile fields are
/// best-effort and may be `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoogleClaims {
    pub sub: String,
    pub email: String,
    pub email_verified: bool,
    pub name: Option<String>,
    pub picture: Option<String>,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub locale: Option<String>,
    /// Hosted domain of a Workspace account
    pub hd: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error("identity provider request failed")]
    Http(#[from] reqwest::Error),
    #[error("identity provider rejected the token ({status})")]
    Rejected { status: u16 },
    #[error("token is missing required field `{0}`")]
    MissingField(&'static str),
    #[error("token audience mismatch: got {got}, expected {expected}")]
    AudienceMismatch { got: String, expected: String },
    #[error("token has expired")]
    Expired,
}

/// Verifies an opaque identity assertion with the identity provider.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify_token(&self, assertion: &str) -> Result<GoogleClaims, VerifyError>;
}
