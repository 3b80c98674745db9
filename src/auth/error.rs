//! Error taxonomy of the authentication and profile services.
//!
//! Every failure is one variant of [`AuthError`]. Variants that wrap a store
//! or provider failure keep it as `#[source]`: the `Display` text is safe to
//! show to clients, the source chain is for logs only.

use super::jwt::TokenError;
use super::verifier::VerifyError;

/// Coarse class of an [`AuthError`], used to pick a transport status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Client sent something unusable (400). Never retried.
    InvalidInput,
    /// Identity provider rejected the assertion or could not be reached.
    IdentityProvider,
    /// User or refresh token does not exist (404).
    NotFound,
    /// Token exists but is revoked or expired (401).
    StateConflict,
    /// A store write/read or token signing failed (500). Not retried by the core.
    Persistence,
    /// The call was cancelled or ran past its deadline before finishing.
    Cancelled,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    // ── input validation ───────────────────────────────────────────────
    #[error("empty google token")]
    EmptyIdentityAssertion,
    #[error("empty refresh token")]
    EmptyRefreshToken,
    #[error("invalid user id")]
    InvalidUserId,
    #[error("empty google sub")]
    EmptySubject,
    #[error("empty email")]
    EmptyEmail,
    #[error("email not verified")]
    EmailNotVerified,

    // ── identity provider / token checks ───────────────────────────────
    #[error("failed to validate google token")]
    IdentityVerificationFailed(#[source] VerifyError),
    #[error("invalid access token")]
    InvalidAccessToken(#[source] TokenError),

    // ── not found ──────────────────────────────────────────────────────
    #[error("user not found")]
    UserNotFound,
    #[error("refresh token not found")]
    RefreshTokenNotFound,

    // ── state conflict ─────────────────────────────────────────────────
    #[error("refresh token revoked")]
    RefreshTokenRevoked,
    #[error("refresh token expired")]
    RefreshTokenExpired,

    // ── persistence / signing ──────────────────────────────────────────
    #[error("failed to create user")]
    CreateUser(#[source] anyhow::Error),
    #[error("failed to get user")]
    GetUser(#[source] anyhow::Error),
    #[error("failed to update user")]
    UpdateUser(#[source] anyhow::Error),
    #[error("failed to update user picture")]
    UpdateUserPicture(#[source] anyhow::Error),
    #[error("failed to create refresh token")]
    CreateRefreshToken(#[source] anyhow::Error),
    #[error("failed to get refresh token by user id")]
    GetRefreshTokenByUserId(#[source] anyhow::Error),
    #[error("failed to get refresh token by hash")]
    GetRefreshTokenByHash(#[source] anyhow::Error),
    #[error("failed to revoke refresh token")]
    RevokeRefreshToken(#[source] anyhow::Error),
    #[error("failed to generate new access token")]
    GenerateAccessToken(#[source] TokenError),
    #[error("failed to generate new refresh token")]
    GenerateRefreshToken(#[source] TokenError),

    // ── cancellation ───────────────────────────────────────────────────
    #[error("request cancelled")]
    Cancelled,
    #[error("request deadline exceeded")]
    DeadlineExceeded,
}

impl AuthError {
    pub fn kind(&self) -> ErrorKind {
        use AuthError::*;
        match self {
            EmptyIdentityAssertion | EmptyRefreshToken | InvalidUserId | EmptySubject
            | EmptyEmail | EmailNotVerified => ErrorKind::InvalidInput,
            IdentityVerificationFailed(_) | InvalidAccessToken(_) => ErrorKind::IdentityProvider,
            UserNotFound | RefreshTokenNotFound => ErrorKind::NotFound,
            RefreshTokenRevoked | RefreshTokenExpired => ErrorKind::StateConflict,
            CreateUser(_)
            | GetUser(_)
            | UpdateUser(_)
            | UpdateUserPicture(_)
            | CreateRefreshToken(_)
            | GetRefreshTokenByUserId(_)
            | GetRefreshTokenByHash(_)
            | RevokeRefreshToken(_)
            | GenerateAccessToken(_)
            | GenerateRefreshToken(_) => ErrorKind::Persistence,
            Cancelled | DeadlineExceeded => ErrorKind::Cancelled,
        }
    }

    /// Message that is safe to return to a client.
    pub fn public_message(&self) -> String {
        self.to_string()
    }

    /// Full causal chain, for logs.
    pub fn private_cause(&self) -> Option<String> {
        let source = std::error::Error::source(self)?;
        let mut chain = source.to_string();
        let mut next = source.source();
        while let Some(err) = next {
            chain.push_str(": ");
            chain.push_str(&err.to_string());
            next = err.source();
        }
        Some(chain)
    }
}
