//! Failure-injecting store wrapper for testing.
//!
//! Delegates to an `InMemoryStore` but can be told to fail, or to never
//! return, on specific operations. It can also lose every revoke to a
//! simulated concurrent writer.

use super::memory::InMemoryStore;
use super::models::{RefreshToken, RevokeReason, User};
use super::traits::{TokenStore, UserStore};
use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

/// Store operations that can be targeted by [`FailingStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    UserGetById,
    UserGetBySub,
    UserCreate,
    UserUpdate,
    TokenCreate,
    TokenGetByHash,
    TokenGetByUserId,
    TokenRevoke,
}

#[derive(Default)]
pub struct FailingStore {
    pub inner: InMemoryStore,
    failing: Mutex<HashSet<StoreOp>>,
    hanging: Mutex<HashSet<StoreOp>>,
    racing_revoke: AtomicBool,
}

impl FailingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `op` return an error from now on.
    pub fn fail_on(&self, op: StoreOp) {
        self.failing.lock().unwrap().insert(op);
    }

    /// Make `op` never complete from now on.
    pub fn hang_on(&self, op: StoreOp) {
        self.hanging.lock().unwrap().insert(op);
    }

    /// Have another writer revoke the row just before each `revoke` call
    /// lands, so the call itself finds it already revoked.
    pub fn lose_revoke_race(&self) {
        self.racing_revoke.store(true, Ordering::SeqCst);
    }

    pub fn heal(&self) {
        self.failing.lock().unwrap().clear();
        self.hanging.lock().unwrap().clear();
        self.racing_revoke.store(false, Ordering::SeqCst);
    }

    async fn check(&self, op: StoreOp) -> Result<()> {
        let hang = self.hanging.lock().unwrap().contains(&op);
        if hang {
            std::future::pending::<()>().await;
        }
        if self.failing.lock().unwrap().contains(&op) {
            bail!("injected failure on {:?}", op);
        }
        Ok(())
    }
}

#[async_trait]
impl UserStore for FailingStore {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<User>> {
        self.check(StoreOp::UserGetById).await?;
        self.inner.get_by_id(id).await
    }

    async fn get_by_google_sub(&self, google_sub: &str) -> Result<Option<User>> {
        self.check(StoreOp::UserGetBySub).await?;
        self.inner.get_by_google_sub(google_sub).await
    }

    async fn create(&self, user: &User) -> Result<()> {
        self.check(StoreOp::UserCreate).await?;
        UserStore::create(&self.inner, user).await
    }

    async fn update(&self, user: &User) -> Result<bool> {
        self.check(StoreOp::UserUpdate).await?;
        self.inner.update(user).await
    }
}

#[async_trait]
impl TokenStore for FailingStore {
    async fn create(&self, token: &RefreshToken) -> Result<()> {
        self.check(StoreOp::TokenCreate).await?;
        TokenStore::create(&self.inner, token).await
    }

    async fn get_by_hash(&self, token_hash: &str) -> Result<Option<RefreshToken>> {
        self.check(StoreOp::TokenGetByHash).await?;
        self.inner.get_by_hash(token_hash).await
    }

    async fn get_by_user_id(&self, user_id: Uuid) -> Result<Option<RefreshToken>> {
        self.check(StoreOp::TokenGetByUserId).await?;
        self.inner.get_by_user_id(user_id).await
    }

    async fn revoke(&self, token_hash: &str, reason: RevokeReason) -> Result<bool> {
        self.check(StoreOp::TokenRevoke).await?;
        if self.racing_revoke.load(Ordering::SeqCst) {
            self.inner.revoke(token_hash, RevokeReason::Rotating).await?;
        }
        self.inner.revoke(token_hash, reason).await
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<RefreshToken>> {
        self.inner.list_for_user(user_id).await
    }

    async fn is_valid(&self, token_hash: &str) -> Result<bool> {
        self.inner.is_valid(token_hash).await
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        self.inner.delete_expired(now).await
    }

    async fn delete_revoked(&self, older_than: DateTime<Utc>) -> Result<u64> {
        self.inner.delete_revoked(older_than).await
    }
}
