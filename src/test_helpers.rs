//! Test helper factories and mock service builders
//!
//! Provides convenience functions for creating test objects with sensible defaults,
//! and helpers for wiring `AuthService` / `ProfileService` / `AppState` over
//! in-memory backends.
#![allow(dead_code)]

use crate::api::handlers::ServerState;
use crate::auth::jwt::TokenCodec;
use crate::auth::service::AuthService;
use crate::auth::verifier::{GoogleClaims, IdentityVerifier, VerifyError};
use crate::profile::ProfileService;
use crate::store::{InMemoryStore, TokenStore, User, UserStore};
use crate::{AppState, AuthConfig};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

pub const TEST_ACCESS_SECRET: &str = "test-access-secret-minimum-32-chars!";
pub const TEST_REFRESH_SECRET: &str = "test-refresh-secret-minimum-32-chars";

// ============================================================================
// Config / codec
// ============================================================================

pub fn test_auth_config() -> AuthConfig {
    AuthConfig {
        google_client_id: "test-client.apps.googleusercontent.com".to_string(),
        access_secret: TEST_ACCESS_SECRET.to_string(),
        refresh_secret: TEST_REFRESH_SECRET.to_string(),
        access_token_expiry_secs: 900,
        refresh_token_expiry_secs: 2_592_000,
        step_timeout_secs: None,
    }
}

pub fn test_codec() -> TokenCodec {
    TokenCodec::from_config(&test_auth_config())
}

// ============================================================================
// Entity factories
// ============================================================================

/// Create a test user bound to `google_sub`
pub fn test_user(google_sub: &str, email: &str) -> User {
    let now = Utc::now();
    User {
        id: Uuid::new_v4(),
        google_sub: google_sub.to_string(),
        email: email.to_string(),
        email_verified: true,
        full_name: Some("Test User".to_string()),
        picture: Some("https://example.com/avatar.png".to_string()),
        first_name: Some("Test".to_string()),
        last_name: Some("User".to_string()),
        locale: Some("en".to_string()),
        google_domain: None,
        created_at: now,
        updated_at: now,
    }
}

/// Verified claims with a full profile
pub fn test_claims(sub: &str, email: &str) -> GoogleClaims {
    GoogleClaims {
        sub: sub.to_string(),
        email: email.to_string(),
        email_verified: true,
        name: Some("Test User".to_string()),
        picture: Some("https://example.com/avatar.png".to_string()),
        given_name: Some("Test".to_string()),
        family_name: Some("User".to_string()),
        locale: Some("en".to_string()),
        hd: None,
        expires_at: Some(Utc::now() + chrono::Duration::hours(1)),
    }
}

// ============================================================================
// Stub verifier
// ============================================================================

/// Identity verifier that accepts a fixed set of assertions.
/// Unknown assertions are rejected as if Google returned 400.
#[derive(Default)]
pub struct StubVerifier {
    accepted: Mutex<HashMap<String, GoogleClaims>>,
    calls: AtomicUsize,
}

impl StubVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `assertion` and answer with `claims` (replaces any earlier answer)
    pub fn accept(&self, assertion: &str, claims: GoogleClaims) {
        self.accepted
            .lock()
            .unwrap()
            .insert(assertion.to_string(), claims);
    }

    /// Number of `verify_token` calls so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityVerifier for StubVerifier {
    async fn verify_token(&self, assertion: &str) -> Result<GoogleClaims, VerifyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.accepted
            .lock()
            .unwrap()
            .get(assertion)
            .cloned()
            .ok_or(VerifyError::Rejected { status: 400 })
    }
}

// ============================================================================
// Service builders
// ============================================================================

/// `AuthService` over one backend implementing both stores
pub fn service_over<S>(store: Arc<S>, verifier: Arc<StubVerifier>) -> AuthService
where
    S: UserStore + TokenStore + 'static,
{
    AuthService::new(
        store.clone(),
        store,
        verifier,
        Arc::new(test_codec()),
    )
}

/// `AppState` over a fresh in-memory store. Returns the store and verifier
/// so tests can seed and inspect them.
pub fn mock_app_state() -> (AppState, Arc<InMemoryStore>, Arc<StubVerifier>) {
    let store = Arc::new(InMemoryStore::new());
    let verifier = Arc::new(StubVerifier::new());
    let auth = service_over(store.clone(), verifier.clone());
    let profile = ProfileService::new(store.clone());
    let state = Arc::new(ServerState {
        auth: Arc::new(auth),
        profile: Arc::new(profile),
    });
    (state, store, verifier)
}
