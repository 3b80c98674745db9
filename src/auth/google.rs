//! Google ID token verification
//!
//! Handles the server side of "Sign in with Google":
//! 1. Send the client's ID token to Google's tokeninfo endpoint
//! 2. Check audience (must be our client id), expiry and required fields
//! 3. Fill in missing profile fields from the userinfo endpoint, best-effort
//!
//! Step 3 presents the ID token itself as the userinfo bearer. Google's
//! userinfo endpoint only accepts OAuth access tokens, so against the real
//! provider that call is rejected and the profile comes from tokeninfo
//! alone. Google includes the profile claims in tokeninfo whenever the ID
//! token was minted with the `profile` scope. The lookup only fills gaps
//! for providers (and test doubles) that accept the ID token there.

use super::verifier::{GoogleClaims, IdentityVerifier, VerifyError};
use crate::AuthConfig;
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde::{Deserialize, Deserializer};
use tracing::{debug, warn};

const GOOGLE_TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";
const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v3/userinfo";

/// tokeninfo response. Google encodes booleans and timestamps as strings here.
#[derive(Debug, Deserialize)]
struct TokenInfo {
    sub: Option<String>,
    email: Option<String>,
    #[serde(default, deserialize_with = "lenient_bool")]
    email_verified: bool,
    aud: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    exp: Option<i64>,
    name: Option<String>,
    picture: Option<String>,
    given_name: Option<String>,
    family_name: Option<String>,
    locale: Option<String>,
    hd: Option<String>,
}

/// userinfo response (profile subset)
#[derive(Debug, Deserialize)]
struct UserInfo {
    name: Option<String>,
    picture: Option<String>,
    given_name: Option<String>,
    family_name: Option<String>,
    locale: Option<String>,
    hd: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Lenient<T> {
    Native(T),
    Text(String),
}

fn lenient_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(match Option::<Lenient<bool>>::deserialize(deserializer)? {
        Some(Lenient::Native(b)) => b,
        Some(Lenient::Text(s)) => s.eq_ignore_ascii_case("true"),
        None => false,
    })
}

fn lenient_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    Ok(match Option::<Lenient<i64>>::deserialize(deserializer)? {
        Some(Lenient::Native(n)) => Some(n),
        Some(Lenient::Text(s)) => s.parse().ok(),
        None => None,
    })
}

/// Empty strings from Google mean "not set"
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

/// Verifies Google ID tokens for one registered client id.
pub struct GoogleVerifier {
    client_id: String,
    tokeninfo_url: String,
    userinfo_url: String,
    http_client: reqwest::Client,
}

impl GoogleVerifier {
    /// Create a verifier against Google's public endpoints.
    pub fn new(config: &AuthConfig) -> Self {
        Self::with_endpoints(
            &config.google_client_id,
            GOOGLE_TOKENINFO_URL,
            GOOGLE_USERINFO_URL,
        )
    }

    /// Create a verifier against custom endpoints (tests, proxies).
    pub fn with_endpoints(client_id: &str, tokeninfo_url: &str, userinfo_url: &str) -> Self {
        Self {
            client_id: client_id.to_string(),
            tokeninfo_url: tokeninfo_url.to_string(),
            userinfo_url: userinfo_url.to_string(),
            http_client: reqwest::Client::new(),
        }
    }

    async fn fetch_token_info(&self, assertion: &str) -> Result<TokenInfo, VerifyError> {
        let response = self
            .http_client
            .get(&self.tokeninfo_url)
            .query(&[("id_token", assertion)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(http_status = %status, "Google tokeninfo rejected the ID token");
            return Err(VerifyError::Rejected {
                status: status.as_u16(),
            });
        }

        Ok(response.json::<TokenInfo>().await?)
    }

    /// Profile lookup. Any failure just means fewer profile fields.
    async fn fetch_user_info(&self, assertion: &str) -> Option<UserInfo> {
        let response = match self
            .http_client
            .get(&self.userinfo_url)
            .bearer_auth(assertion)
            .send()
            .await
        {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                debug!(http_status = %r.status(), "Google userinfo unavailable, skipping profile enrichment");
                return None;
            }
            Err(e) => {
                debug!(error = %e, "Google userinfo request failed, skipping profile enrichment");
                return None;
            }
        };

        match response.json::<UserInfo>().await {
            Ok(info) => Some(info),
            Err(e) => {
                debug!(error = %e, "Failed to parse Google userinfo response");
                None
            }
        }
    }
}

#[async_trait]
impl IdentityVerifier for GoogleVerifier {
    async fn verify_token(&self, assertion: &str) -> Result<GoogleClaims, VerifyError> {
        let info = self.fetch_token_info(assertion).await?;

        let aud = info.aud.unwrap_or_default();
        if aud != self.client_id {
            return Err(VerifyError::AudienceMismatch {
                got: aud,
                expected: self.client_id.clone(),
            });
        }

        let sub = non_empty(info.sub).ok_or(VerifyError::MissingField("sub"))?;
        let email = non_empty(info.email).ok_or(VerifyError::MissingField("email"))?;

        let expires_at = info.exp.and_then(|exp| Utc.timestamp_opt(exp, 0).single());
        if expires_at.is_some_and(|at| at < Utc::now()) {
            return Err(VerifyError::Expired);
        }

        let mut claims = GoogleClaims {
            sub,
            email,
            email_verified: info.email_verified,
            name: non_empty(info.name),
            picture: non_empty(info.picture),
            given_name: non_empty(info.given_name),
            family_name: non_empty(info.family_name),
            locale: non_empty(info.locale),
            hd: non_empty(info.hd),
            expires_at,
        };

        let profile_complete = claims.name.is_some()
            && claims.picture.is_some()
            && claims.given_name.is_some()
            && claims.family_name.is_some()
            && claims.locale.is_some();
        if !profile_complete {
            if let Some(extra) = self.fetch_user_info(assertion).await {
                claims.name = claims.name.or(non_empty(extra.name));
                claims.picture = claims.picture.or(non_empty(extra.picture));
                claims.given_name = claims.given_name.or(non_empty(extra.given_name));
                claims.family_name = claims.family_name.or(non_empty(extra.family_name));
                claims.locale = claims.locale.or(non_empty(extra.locale));
                claims.hd = claims.hd.or(non_empty(extra.hd));
            }
        }

        Ok(claims)
    }
}

// ============================================================================
// Tests
// ============================================================================
