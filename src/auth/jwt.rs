//! Access token and refresh envelope encoding/decoding using HS256.
//!
//! Two token classes, each with its own secret and lifetime:
//! - **access**: short-lived, carries the user id, checked on every
//!   protected request without touching the store
//! - **refresh**: long-lived opaque envelope handed to the client once; the
//!   server only keeps its hash (see [`crate::auth::refresh`])
//!
//! Separate secrets mean a leaked access secret cannot mint refresh tokens,
//! and the request hot path never needs the refresh secret.

use crate::{AuthConfig, MAX_SPAN_SECS};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// `type` discriminator of access tokens
pub const ACCESS_TOKEN_TYPE: &str = "access";
/// `type` discriminator of refresh envelopes
pub const REFRESH_TOKEN_TYPE: &str = "refresh";
/// Clock skew tolerated when checking `exp`
pub const LEEWAY_SECS: u64 = 30;

/// Access token payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    #[serde(rename = "type")]
    pub token_type: String,
    pub user_id: Uuid,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
}

/// Refresh envelope payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    #[serde(rename = "type")]
    pub token_type: String,
    /// Random id; two envelopes signed in the same second still differ
    pub jti: Uuid,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("failed to sign token")]
    Encode(#[source] jsonwebtoken::errors::Error),
    #[error("failed to parse token")]
    Parse(#[source] jsonwebtoken::errors::Error),
    #[error("invalid token type: expected {expected}, got {found}")]
    WrongType {
        expected: &'static str,
        found: String,
    },
}

/// Signs and verifies both token classes.
///
/// Keys are derived once at construction and never mutated, so a single
/// codec is shared across requests behind an `Arc`.
#[derive(Clone)]
pub struct TokenCodec {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    access_lifetime: Duration,
    refresh_lifetime: Duration,
}

/// Lifetimes above [`MAX_SPAN_SECS`] are clamped; config validation
/// rejects them before a codec is built.
fn lifetime(secs: u64) -> Duration {
    Duration::seconds(secs.min(MAX_SPAN_SECS) as i64)
}

impl TokenCodec {
    pub fn new(
        access_secret: &str,
        refresh_secret: &str,
        access_expiry_secs: u64,
        refresh_expiry_secs: u64,
    ) -> Self {
        Self {
            access_encoding: EncodingKey::from_secret(access_secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(access_secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(refresh_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(refresh_secret.as_bytes()),
            access_lifetime: lifetime(access_expiry_secs),
            refresh_lifetime: lifetime(refresh_expiry_secs),
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(
            &config.access_secret,
            &config.refresh_secret,
            config.access_token_expiry_secs,
            config.refresh_token_expiry_secs,
        )
    }

    /// Lifetime of refresh envelopes; stored rows expire after the same span.
    pub fn refresh_lifetime(&self) -> Duration {
        self.refresh_lifetime
    }

    pub fn access_lifetime(&self) -> Duration {
        self.access_lifetime
    }

    /// Sign an access token for `user_id`.
    pub fn issue_access_token(&self, user_id: Uuid) -> Result<String, TokenError> {
        let now = Utc::now().timestamp();
        let claims = AccessClaims {
            token_type: ACCESS_TOKEN_TYPE.to_string(),
            user_id,
            iat: now,
            exp: now + self.access_lifetime().num_seconds(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.access_encoding)
            .map_err(TokenError::Encode)
    }

    /// Sign a new refresh envelope. This is the raw secret the client keeps.
    pub fn issue_refresh_envelope(&self) -> Result<String, TokenError> {
        let now = Utc::now().timestamp();
        let claims = RefreshClaims {
            token_type: REFRESH_TOKEN_TYPE.to_string(),
            jti: Uuid::new_v4(),
            iat: now,
            exp: now + self.refresh_lifetime().num_seconds(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.refresh_encoding)
            .map_err(TokenError::Encode)
    }

    /// Verify signature, algorithm and expiry of an access token.
    pub fn parse_access_token(&self, token: &str) -> Result<AccessClaims, TokenError> {
        decode::<AccessClaims>(token, &self.access_decoding, &validation())
            .map(|data| data.claims)
            .map_err(TokenError::Parse)
    }

    /// Verify signature, algorithm and expiry of a refresh envelope.
    pub fn parse_refresh_token(&self, token: &str) -> Result<RefreshClaims, TokenError> {
        decode::<RefreshClaims>(token, &self.refresh_decoding, &validation())
            .map(|data| data.claims)
            .map_err(TokenError::Parse)
    }

    /// Parse an access token and check its type discriminator.
    /// Returns the user id it was issued for.
    pub fn validate_access_token(&self, token: &str) -> Result<Uuid, TokenError> {
        let claims = self.parse_access_token(token)?;
        if claims.token_type != ACCESS_TOKEN_TYPE {
            return Err(TokenError::WrongType {
                expected: ACCESS_TOKEN_TYPE,
                found: claims.token_type,
            });
        }
        Ok(claims.user_id)
    }
}

fn validation() -> Validation {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = LEEWAY_SECS;
    validation
}

// ============================================================================
// Tests
// ============================================================================
