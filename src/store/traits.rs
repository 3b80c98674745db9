//! Store trait definitions
//!
//! The authentication core only talks to persistence through these two
//! traits, so tests can swap in in-memory or failure-injecting backends.
//! "Not found" is always `Ok(None)` (or `Ok(false)` for writes); `Err` is
//! reserved for backend failures.

use super::models::{RefreshToken, RevokeReason, User};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Local user identities, keyed by internal id and by Google subject.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Get a user by internal ID
    async fn get_by_id(&self, id: Uuid) -> Result<Option<User>>;

    /// Get a user by Google subject
    async fn get_by_google_sub(&self, google_sub: &str) -> Result<Option<User>>;

    /// Insert a new user. Fails if the id or the Google subject is taken.
    async fn create(&self, user: &User) -> Result<()>;

    /// Overwrite the mutable profile fields of an existing user.
    /// Returns `false` if no user has this id.
    async fn update(&self, user: &User) -> Result<bool>;
}

/// Refresh token records, keyed by token hash and by owning user.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Insert a new token record.
    ///
    /// Implementations must reject a record whose hash already exists and a
    /// record for a user that still holds an un-revoked token.
    async fn create(&self, token: &RefreshToken) -> Result<()>;

    /// Look up a token (revoked or not) by its hash
    async fn get_by_hash(&self, token_hash: &str) -> Result<Option<RefreshToken>>;

    /// Get the user's un-revoked token, if any. The token may be expired.
    async fn get_by_user_id(&self, user_id: Uuid) -> Result<Option<RefreshToken>>;

    /// Mark a token revoked.
    ///
    /// Conditional write: only a token that is still un-revoked is flipped.
    /// Returns `false` when the hash is unknown or the token was already
    /// revoked, leaving the stored reason untouched.
    async fn revoke(&self, token_hash: &str, reason: RevokeReason) -> Result<bool>;

    /// All tokens ever issued to a user, newest first
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<RefreshToken>>;

    /// True if the hash belongs to a token that is neither revoked nor expired
    async fn is_valid(&self, token_hash: &str) -> Result<bool>;

    /// Delete every token with `expires_at <= now`. Returns the number removed.
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64>;

    /// Delete revoked tokens with `revoked_at <= older_than`. Returns the number removed.
    async fn delete_revoked(&self, older_than: DateTime<Utc>) -> Result<u64>;
}
