//! In-memory implementation of `UserStore` and `TokenStore`.
//!
//! Backs the server when no external database is wired in and serves as the
//! reference behaviour for the store contracts. Each table sits behind one
//! `tokio::sync::RwLock`, so every check-then-write below happens under a
//! single write guard and is atomic with respect to other callers.

use super::models::{RefreshToken, RevokeReason, User};
use super::traits::{TokenStore, UserStore};
use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct UserTable {
    by_id: HashMap<Uuid, User>,
    /// google_sub -> id
    by_sub: HashMap<String, Uuid>,
}

/// In-memory user and refresh token tables.
#[derive(Default)]
pub struct InMemoryStore {
    users: RwLock<UserTable>,
    /// token_hash -> record
    tokens: RwLock<HashMap<String, RefreshToken>>,
}

impl InMemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored users
    pub async fn user_count(&self) -> usize {
        self.users.read().await.by_id.len()
    }

    /// Number of stored refresh token rows (revoked included)
    pub async fn token_count(&self) -> usize {
        self.tokens.read().await.len()
    }

    /// Snapshot of every stored refresh token row
    pub async fn all_tokens(&self) -> Vec<RefreshToken> {
        self.tokens.read().await.values().cloned().collect()
    }
}

// ============================================================================
// UserStore
// ============================================================================

#[async_trait]
impl UserStore for InMemoryStore {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.users.read().await.by_id.get(&id).cloned())
    }

    async fn get_by_google_sub(&self, google_sub: &str) -> Result<Option<User>> {
        let table = self.users.read().await;
        Ok(table
            .by_sub
            .get(google_sub)
            .and_then(|id| table.by_id.get(id))
            .cloned())
    }

    async fn create(&self, user: &User) -> Result<()> {
        let mut table = self.users.write().await;
        if table.by_id.contains_key(&user.id) {
            bail!("user {} already exists", user.id);
        }
        if table.by_sub.contains_key(&user.google_sub) {
            bail!("a user with google_sub {} already exists", user.google_sub);
        }
        table.by_sub.insert(user.google_sub.clone(), user.id);
        table.by_id.insert(user.id, user.clone());
        Ok(())
    }

    async fn update(&self, user: &User) -> Result<bool> {
        let mut table = self.users.write().await;
        let Some(existing) = table.by_id.get_mut(&user.id) else {
            return Ok(false);
        };
        // Identity and creation fields stay as first written
        existing.email = user.email.clone();
        existing.full_name = user.full_name.clone();
        existing.picture = user.picture.clone();
        existing.first_name = user.first_name.clone();
        existing.last_name = user.last_name.clone();
        existing.locale = user.locale.clone();
        existing.updated_at = user.updated_at;
        Ok(true)
    }
}

// ============================================================================
// TokenStore
// ============================================================================

#[async_trait]
impl TokenStore for InMemoryStore {
    async fn create(&self, token: &RefreshToken) -> Result<()> {
        let mut tokens = self.tokens.write().await;
        if tokens.contains_key(&token.token_hash) {
            bail!("refresh token hash already exists");
        }
        if !token.is_revoked
            && tokens
                .values()
                .any(|t| t.user_id == token.user_id && !t.is_revoked)
        {
            bail!("user {} already holds an un-revoked refresh token", token.user_id);
        }
        tokens.insert(token.token_hash.clone(), token.clone());
        Ok(())
    }

    async fn get_by_hash(&self, token_hash: &str) -> Result<Option<RefreshToken>> {
        Ok(self.tokens.read().await.get(token_hash).cloned())
    }

    async fn get_by_user_id(&self, user_id: Uuid) -> Result<Option<RefreshToken>> {
        Ok(self
            .tokens
            .read()
            .await
            .values()
            .find(|t| t.user_id == user_id && !t.is_revoked)
            .cloned())
    }

    async fn revoke(&self, token_hash: &str, reason: RevokeReason) -> Result<bool> {
        let mut tokens = self.tokens.write().await;
        match tokens.get_mut(token_hash) {
            Some(token) if !token.is_revoked => {
                token.is_revoked = true;
                token.revoked_at = Some(Utc::now());
                token.revoked_reason = Some(reason.as_str().to_string());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<RefreshToken>> {
        let mut list: Vec<RefreshToken> = self
            .tokens
            .read()
            .await
            .values()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        list.sort_by(|a, b| b.issued_at.cmp(&a.issued_at));
        Ok(list)
    }

    async fn is_valid(&self, token_hash: &str) -> Result<bool> {
        let now = Utc::now();
        Ok(self
            .tokens
            .read()
            .await
            .get(token_hash)
            .is_some_and(|t| t.is_active(now)))
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let mut tokens = self.tokens.write().await;
        let before = tokens.len();
        tokens.retain(|_, t| !t.is_expired(now));
        Ok((before - tokens.len()) as u64)
    }

    async fn delete_revoked(&self, older_than: DateTime<Utc>) -> Result<u64> {
        let mut tokens = self.tokens.write().await;
        let before = tokens.len();
        tokens.retain(|_, t| !matches!(t.revoked_at, Some(at) if at <= older_than));
        Ok((before - tokens.len()) as u64)
    }
}

// ============================================================================
// Tests
// ============================================================================
