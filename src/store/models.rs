//! Persisted records for users and refresh tokens

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// User
// ============================================================================

/// A local identity bound to exactly one Google subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    /// Google's `sub` claim. Unique across users, never changes after creation.
    pub google_sub: String,
    pub email: String,
    pub email_verified: bool,
    pub full_name: Option<String>,
    pub picture: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub locale: Option<String>,
    /// Hosted domain (`hd` claim) for Google Workspace accounts
    pub google_domain: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ============================================================================
// Refresh token
// ============================================================================

/// Why a refresh token stopped being active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RevokeReason {
    #[serde(rename = "new log in")]
    NewLogIn,
    #[serde(rename = "logout")]
    Logout,
    #[serde(rename = "rotating")]
    Rotating,
    #[serde(rename = "expired")]
    Expired,
}

impl RevokeReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RevokeReason::NewLogIn => "new log in",
            RevokeReason::Logout => "logout",
            RevokeReason::Rotating => "rotating",
            RevokeReason::Expired => "expired",
        }
    }
}

impl fmt::Display for RevokeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Client details recorded alongside a refresh token. Informational only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionMetadata {
    pub device_info: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// One outstanding (or historical) session credential.
///
/// Only the SHA-256 hex digest of the raw token is kept; the raw value is
/// handed to the client once and never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    #[serde(flatten)]
    pub metadata: SessionMetadata,
    pub is_revoked: bool,
    pub revoked_at: Option<DateTime<Utc>>,
    pub revoked_reason: Option<String>,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl RefreshToken {
    /// Build a fresh, un-revoked token record.
    pub fn issue(
        user_id: Uuid,
        token_hash: String,
        metadata: SessionMetadata,
        issued_at: DateTime<Utc>,
        lifetime: chrono::Duration,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            token_hash,
            metadata,
            is_revoked: false,
            revoked_at: None,
            revoked_reason: None,
            issued_at,
            expires_at: issued_at
                .checked_add_signed(lifetime)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }

    /// `expires_at <= now`
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Neither revoked nor expired.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        !self.is_revoked && !self.is_expired(now)
    }
}
