//! Sightline
//!
//! Sign-in and session backend with:
//! - Google ID token verification
//! - Short-lived access tokens and single-use, rotating refresh tokens
//! - One active session per user, with revocation reasons kept for audit
//! - A small authenticated profile API

pub mod api;
pub mod auth;
pub mod profile;
pub mod store;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use api::handlers::{AppState, ServerState};

use anyhow::{bail, Result};
use auth::google::GoogleVerifier;
use auth::jwt::TokenCodec;
use auth::service::AuthService;
use auth::verifier::IdentityVerifier;
use profile::ProfileService;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use store::{InMemoryStore, TokenStore, UserStore};
use tokio::signal;
use tokio_util::sync::CancellationToken;

/// Shortest accepted signing secret, in bytes
pub const MIN_SECRET_LEN: usize = 32;

/// Longest accepted token lifetime, retention window or sweep interval
/// (10 years). Keeps every `now + span` inside chrono's range.
pub const MAX_SPAN_SECS: u64 = 10 * 365 * 24 * 3600;

// ============================================================================
// YAML config structs (deserialization targets)
// ============================================================================

/// Top-level YAML configuration file structure
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub server: ServerYamlConfig,
    pub auth: AuthConfig,
    pub retention: RetentionConfig,
}

/// Server configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerYamlConfig {
    pub port: u16,
}

impl Default for ServerYamlConfig {
    fn default() -> Self {
        Self { port: 8080 }
    }
}

/// Token signing and identity provider settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// OAuth client id that Google ID tokens must be issued for (`aud`)
    pub google_client_id: String,
    /// HS256 secret for access tokens
    pub access_secret: String,
    /// HS256 secret for refresh envelopes, distinct from `access_secret`
    pub refresh_secret: String,
    pub access_token_expiry_secs: u64,
    pub refresh_token_expiry_secs: u64,
    /// Deadline for each store or identity provider call. None = no deadline.
    pub step_timeout_secs: Option<u64>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            google_client_id: String::new(),
            access_secret: String::new(),
            refresh_secret: String::new(),
            access_token_expiry_secs: 900,        // 15 min
            refresh_token_expiry_secs: 2_592_000, // 720 h
            step_timeout_secs: None,
        }
    }
}

impl AuthConfig {
    /// Reject configurations the server must not start with.
    pub fn validate(&self) -> Result<()> {
        if self.google_client_id.is_empty() {
            bail!("GOOGLE_CLIENT_ID is not set");
        }
        for (name, secret) in [
            ("ACCESS_SECRET", &self.access_secret),
            ("REFRESH_SECRET", &self.refresh_secret),
        ] {
            if secret.is_empty() {
                bail!("{} is not set", name);
            }
            if secret.len() < MIN_SECRET_LEN {
                bail!("{} must be at least {} bytes", name, MIN_SECRET_LEN);
            }
        }
        if self.access_secret == self.refresh_secret {
            bail!("ACCESS_SECRET and REFRESH_SECRET must differ");
        }
        for (name, secs) in [
            ("ACCESS_TOKEN_EXPIRY_SECS", self.access_token_expiry_secs),
            ("REFRESH_TOKEN_EXPIRY_SECS", self.refresh_token_expiry_secs),
        ] {
            if secs == 0 {
                bail!("{} must be greater than zero", name);
            }
            if secs > MAX_SPAN_SECS {
                bail!("{} must be at most {} seconds", name, MAX_SPAN_SECS);
            }
        }
        Ok(())
    }

    pub fn step_timeout(&self) -> Option<Duration> {
        self.step_timeout_secs.map(Duration::from_secs)
    }
}

/// Refresh token cleanup settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    pub sweep_interval_secs: u64,
    /// How long revoked rows are kept for audit before deletion
    pub revoked_retention_secs: u64,
}

impl RetentionConfig {
    pub fn validate(&self) -> Result<()> {
        if self.sweep_interval_secs > MAX_SPAN_SECS {
            bail!("SWEEP_INTERVAL_SECS must be at most {} seconds", MAX_SPAN_SECS);
        }
        if self.revoked_retention_secs > MAX_SPAN_SECS {
            bail!("REVOKED_RETENTION_SECS must be at most {} seconds", MAX_SPAN_SECS);
        }
        Ok(())
    }
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            sweep_interval_secs: 3600,
            revoked_retention_secs: 604_800, // 7 days
        }
    }
}

// ============================================================================
// Runtime config
// ============================================================================

/// Resolved configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    pub auth: AuthConfig,
    pub retention: RetentionConfig,
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.parse().ok())
}

impl Config {
    /// Load configuration from an optional YAML file, then override with env vars.
    ///
    /// Priority: env var > YAML > default
    ///
    /// If `yaml_path` is None, tries "config.yaml" in CWD. The result is
    /// validated; missing or weak secrets are an error.
    pub fn from_yaml_and_env(yaml_path: Option<&Path>) -> Result<Self> {
        let yaml = Self::load_yaml(yaml_path);
        let auth = yaml.auth;
        let retention = yaml.retention;

        let config = Self {
            server_port: env_parse("SERVER_PORT").unwrap_or(yaml.server.port),
            auth: AuthConfig {
                google_client_id: std::env::var("GOOGLE_CLIENT_ID")
                    .unwrap_or(auth.google_client_id),
                access_secret: std::env::var("ACCESS_SECRET").unwrap_or(auth.access_secret),
                refresh_secret: std::env::var("REFRESH_SECRET").unwrap_or(auth.refresh_secret),
                access_token_expiry_secs: env_parse("ACCESS_TOKEN_EXPIRY_SECS")
                    .unwrap_or(auth.access_token_expiry_secs),
                refresh_token_expiry_secs: env_parse("REFRESH_TOKEN_EXPIRY_SECS")
                    .unwrap_or(auth.refresh_token_expiry_secs),
                step_timeout_secs: env_parse("STEP_TIMEOUT_SECS").or(auth.step_timeout_secs),
            },
            retention: RetentionConfig {
                sweep_interval_secs: env_parse("SWEEP_INTERVAL_SECS")
                    .unwrap_or(retention.sweep_interval_secs),
                revoked_retention_secs: env_parse("REVOKED_RETENTION_SECS")
                    .unwrap_or(retention.revoked_retention_secs),
            },
        };

        config.auth.validate()?;
        config.retention.validate()?;
        Ok(config)
    }

    /// Try to load and parse a YAML config file. Returns defaults on any failure.
    fn load_yaml(yaml_path: Option<&Path>) -> YamlConfig {
        let default_path = Path::new("config.yaml");
        let path = yaml_path.unwrap_or(default_path);

        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_yaml::from_str(&contents) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                    YamlConfig::default()
                }
            },
            Err(_) => {
                tracing::debug!(
                    "No config file at {}, using env vars / defaults",
                    path.display()
                );
                YamlConfig::default()
            }
        }
    }
}

// ============================================================================
// Server
// ============================================================================

/// Wire the services over the given backends.
pub fn build_state(
    config: &Config,
    users: Arc<dyn UserStore>,
    tokens: Arc<dyn TokenStore>,
    verifier: Arc<dyn IdentityVerifier>,
    shutdown: CancellationToken,
) -> AppState {
    let codec = Arc::new(TokenCodec::from_config(&config.auth));
    let mut auth = AuthService::new(users.clone(), tokens, verifier, codec)
        .with_cancellation(shutdown);
    if let Some(limit) = config.auth.step_timeout() {
        auth = auth.with_step_timeout(limit);
    }

    Arc::new(ServerState {
        auth: Arc::new(auth),
        profile: Arc::new(ProfileService::new(users)),
    })
}

/// Run the HTTP server until SIGINT/SIGTERM.
pub async fn start_server(config: Config) -> Result<()> {
    let shutdown = CancellationToken::new();
    let store = Arc::new(InMemoryStore::new());
    let verifier = Arc::new(GoogleVerifier::new(&config.auth));

    let state = build_state(
        &config,
        store.clone(),
        store.clone(),
        verifier,
        shutdown.clone(),
    );
    let sweeper = crate::store::retention::spawn_sweeper(
        store,
        config.retention.clone(),
        shutdown.clone(),
    );

    let app = api::create_router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await?;

    shutdown.cancel();
    if let Err(e) = sweeper.await {
        tracing::warn!("Sweeper task ended abnormally: {}", e);
    }
    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM, then cancel `shutdown` so in-flight calls stop.
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining requests");
    shutdown.cancel();
}

// ============================================================================
// Tests
// ============================================================================
