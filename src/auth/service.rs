//! Authentication orchestrator
//!
//! `AuthService` is the only component that talks to more than one leaf per
//! call. It composes the identity verifier, the token codec and both stores
//! into the three session protocols:
//!
//! - **sign-in**: verify a Google ID token, bind it to a local user exactly
//!   once, replace the user's refresh token and issue an access token
//! - **refresh**: exchange a refresh token for a new pair, revoking the
//!   presented one (single use)
//! - **sign-out**: revoke the presented refresh token
//!
//! Steps inside a call run strictly in order and the first failure stops the
//! call. Every suspending step races the service shutdown token and the
//! optional per-step deadline. This module does not log: errors carry their
//! cause and the caller decides what to record.

use super::error::AuthError;
use super::jwt::TokenCodec;
use super::refresh::hash_token;
use super::verifier::{GoogleClaims, IdentityVerifier};
use crate::store::{RefreshToken, RevokeReason, SessionMetadata, TokenStore, User, UserStore};
use anyhow::anyhow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

// ============================================================================
// Responses
// ============================================================================

/// Public projection of a [`User`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub google_sub: String,
    pub email: String,
    pub full_name: Option<String>,
    pub picture: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email_verified: bool,
    pub google_domain: Option<String>,
    pub locale: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            google_sub: user.google_sub.clone(),
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            picture: user.picture.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email_verified: user.email_verified,
            google_domain: user.google_domain.clone(),
            locale: user.locale.clone(),
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Token pair returned by sign-in and refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub access_token: String,
    /// Raw refresh token. Only its hash is stored server side.
    pub refresh_token: String,
    pub user: UserResponse,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignOutResult {
    pub user_id: Uuid,
    pub logout: bool,
}

// ============================================================================
// AuthService
// ============================================================================

pub struct AuthService {
    users: Arc<dyn UserStore>,
    tokens: Arc<dyn TokenStore>,
    verifier: Arc<dyn IdentityVerifier>,
    codec: Arc<TokenCodec>,
    shutdown: CancellationToken,
    step_timeout: Option<Duration>,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserStore>,
        tokens: Arc<dyn TokenStore>,
        verifier: Arc<dyn IdentityVerifier>,
        codec: Arc<TokenCodec>,
    ) -> Self {
        Self {
            users,
            tokens,
            verifier,
            codec,
            shutdown: CancellationToken::new(),
            step_timeout: None,
        }
    }

    /// Abort in-flight and future calls once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    /// Bound every suspending step by `timeout`.
    pub fn with_step_timeout(mut self, timeout: Duration) -> Self {
        self.step_timeout = Some(timeout);
        self
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Sign in with a Google ID token, no client metadata.
    pub async fn sign_in(&self, assertion: &str) -> Result<AuthResponse, AuthError> {
        self.sign_in_with_metadata(assertion, SessionMetadata::default())
            .await
    }

    /// Sign in with a Google ID token.
    ///
    /// Creates the user on first sign-in. Any refresh token the user still
    /// holds is revoked before the new one is stored, so a user never has
    /// more than one active session.
    pub async fn sign_in_with_metadata(
        &self,
        assertion: &str,
        metadata: SessionMetadata,
    ) -> Result<AuthResponse, AuthError> {
        if assertion.is_empty() {
            return Err(AuthError::EmptyIdentityAssertion);
        }

        let claims = self
            .guard(self.verifier.verify_token(assertion))
            .await?
            .map_err(AuthError::IdentityVerificationFailed)?;
        if claims.sub.is_empty() {
            return Err(AuthError::EmptySubject);
        }
        if claims.email.is_empty() {
            return Err(AuthError::EmptyEmail);
        }
        if !claims.email_verified {
            return Err(AuthError::EmailNotVerified);
        }

        let user = self.find_or_create_user(&claims).await?;

        let current = self
            .guard(self.tokens.get_by_user_id(user.id))
            .await?
            .map_err(AuthError::GetRefreshTokenByUserId)?;
        if let Some(existing) = current {
            let reason = if existing.is_expired(Utc::now()) {
                RevokeReason::Expired
            } else {
                RevokeReason::NewLogIn
            };
            if !self.revoke(&existing.token_hash, reason).await? {
                return Err(AuthError::RevokeRefreshToken(anyhow!(
                    "refresh token was revoked concurrently"
                )));
            }
        }

        let refresh_token = self.store_new_refresh_token(user.id, metadata).await?;
        let access_token = self
            .codec
            .issue_access_token(user.id)
            .map_err(AuthError::GenerateAccessToken)?;

        Ok(AuthResponse {
            access_token,
            refresh_token,
            user: UserResponse::from(&user),
        })
    }

    /// Exchange a refresh token for a new token pair.
    ///
    /// The presented token is single use: it is revoked with reason
    /// `rotating` and replaced by a new one carrying the same metadata.
    pub async fn refresh(&self, raw_token: &str) -> Result<AuthResponse, AuthError> {
        if raw_token.is_empty() {
            return Err(AuthError::EmptyRefreshToken);
        }

        let token_hash = hash_token(raw_token);
        let stored = self
            .guard(self.tokens.get_by_hash(&token_hash))
            .await?
            .map_err(AuthError::GetRefreshTokenByHash)?
            .ok_or(AuthError::RefreshTokenNotFound)?;

        if stored.is_revoked {
            return Err(AuthError::RefreshTokenRevoked);
        }
        if stored.is_expired(Utc::now()) {
            if !self.revoke(&token_hash, RevokeReason::Expired).await? {
                return Err(AuthError::RefreshTokenRevoked);
            }
            return Err(AuthError::RefreshTokenExpired);
        }

        let user = self
            .guard(self.users.get_by_id(stored.user_id))
            .await?
            .map_err(AuthError::GetUser)?
            .ok_or(AuthError::UserNotFound)?;

        let access_token = self
            .codec
            .issue_access_token(user.id)
            .map_err(AuthError::GenerateAccessToken)?;

        // Losing a concurrent rotation of the same token
        if !self.revoke(&token_hash, RevokeReason::Rotating).await? {
            return Err(AuthError::RefreshTokenRevoked);
        }
        let refresh_token = self
            .store_new_refresh_token(user.id, stored.metadata)
            .await?;

        Ok(AuthResponse {
            access_token,
            refresh_token,
            user: UserResponse::from(&user),
        })
    }

    /// Revoke a refresh token. Presenting an unknown or already revoked
    /// token is an error.
    pub async fn sign_out(&self, raw_token: &str) -> Result<SignOutResult, AuthError> {
        if raw_token.is_empty() {
            return Err(AuthError::EmptyRefreshToken);
        }

        let token_hash = hash_token(raw_token);
        let stored = self
            .guard(self.tokens.get_by_hash(&token_hash))
            .await?
            .map_err(AuthError::GetRefreshTokenByHash)?
            .ok_or_else(|| AuthError::GetRefreshTokenByHash(anyhow!("refresh token not found")))?;

        if !self.revoke(&token_hash, RevokeReason::Logout).await? {
            return Err(AuthError::RevokeRefreshToken(anyhow!(
                "refresh token already revoked"
            )));
        }

        Ok(SignOutResult {
            user_id: stored.user_id,
            logout: true,
        })
    }

    /// Check an access token and return the user id it was issued for.
    /// Never touches the stores.
    pub fn validate_access_token(&self, token: &str) -> Result<Uuid, AuthError> {
        self.codec
            .validate_access_token(token)
            .map_err(AuthError::InvalidAccessToken)
    }

    // ------------------------------------------------------------------------
    // Steps
    // ------------------------------------------------------------------------

    async fn find_or_create_user(&self, claims: &GoogleClaims) -> Result<User, AuthError> {
        let existing = self
            .guard(self.users.get_by_google_sub(&claims.sub))
            .await?
            .map_err(AuthError::GetUser)?;
        if let Some(user) = existing {
            return Ok(user);
        }

        let user = user_from_claims(claims, Utc::now());
        match self.guard(self.users.create(&user)).await? {
            Ok(()) => Ok(user),
            Err(create_err) => {
                // A concurrent first sign-in for the same subject may have won
                let winner = self
                    .guard(self.users.get_by_google_sub(&claims.sub))
                    .await?
                    .ok()
                    .flatten();
                winner.ok_or(AuthError::CreateUser(create_err))
            }
        }
    }

    /// Sign a new refresh envelope and persist its hash. Returns the raw token.
    async fn store_new_refresh_token(
        &self,
        user_id: Uuid,
        metadata: SessionMetadata,
    ) -> Result<String, AuthError> {
        let raw = self
            .codec
            .issue_refresh_envelope()
            .map_err(AuthError::GenerateRefreshToken)?;
        let record = RefreshToken::issue(
            user_id,
            hash_token(&raw),
            metadata,
            Utc::now(),
            self.codec.refresh_lifetime(),
        );
        self.guard(self.tokens.create(&record))
            .await?
            .map_err(AuthError::CreateRefreshToken)?;
        Ok(raw)
    }

    /// `Ok(false)` when the token was no longer un-revoked.
    async fn revoke(&self, token_hash: &str, reason: RevokeReason) -> Result<bool, AuthError> {
        self.guard(self.tokens.revoke(token_hash, reason))
            .await?
            .map_err(AuthError::RevokeRefreshToken)
    }

    /// Run one suspending step under the shutdown token and step deadline.
    async fn guard<T>(&self, step: impl Future<Output = T>) -> Result<T, AuthError> {
        let bounded = async {
            match self.step_timeout {
                Some(limit) => tokio::time::timeout(limit, step)
                    .await
                    .map_err(|_| AuthError::DeadlineExceeded),
                None => Ok(step.await),
            }
        };
        tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => Err(AuthError::Cancelled),
            out = bounded => out,
        }
    }
}

fn user_from_claims(claims: &GoogleClaims, now: DateTime<Utc>) -> User {
    User {
        id: Uuid::new_v4(),
        google_sub: claims.sub.clone(),
        email: claims.email.clone(),
        email_verified: claims.email_verified,
        full_name: claims.name.clone(),
        picture: claims.picture.clone(),
        first_name: claims.given_name.clone(),
        last_name: claims.family_name.clone(),
        locale: claims.locale.clone(),
        google_domain: claims.hd.clone(),
        created_at: now,
        updated_at: now,
    }
}

// ============================================================================
// Tests
// ============================================================================
