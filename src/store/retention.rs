//! Periodic cleanup of expired and long-revoked refresh tokens.
//!
//! Runs beside the request path, owned by the server. The authentication
//! service never deletes rows itself.

use super::traits::TokenStore;
use crate::{RetentionConfig, MAX_SPAN_SECS};
use anyhow::Result;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Rows removed by one sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub expired: u64,
    pub revoked: u64,
}

/// Delete expired tokens, then revoked tokens older than `revoked_retention`.
pub async fn sweep_once(
    store: &dyn TokenStore,
    now: DateTime<Utc>,
    revoked_retention: chrono::Duration,
) -> Result<SweepReport> {
    let expired = store.delete_expired(now).await?;
    let cutoff = now
        .checked_sub_signed(revoked_retention)
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
    let revoked = store.delete_revoked(cutoff).await?;
    Ok(SweepReport { expired, revoked })
}

/// Spawn the sweeper loop. It stops when `shutdown` is cancelled.
pub fn spawn_sweeper(
    store: Arc<dyn TokenStore>,
    config: RetentionConfig,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(
            config.sweep_interval_secs.clamp(1, MAX_SPAN_SECS),
        ));
        let retention =
            chrono::Duration::seconds(config.revoked_retention_secs.min(MAX_SPAN_SECS) as i64);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!("Refresh token sweeper stopping");
                    break;
                }
                _ = ticker.tick() => {
                    match sweep_once(store.as_ref(), Utc::now(), retention).await {
                        Ok(report) if report.expired + report.revoked > 0 => {
                            info!(
                                expired = report.expired,
                                revoked = report.revoked,
                                "Swept refresh tokens"
                            );
                        }
                        Ok(_) => debug!("Refresh token sweep found nothing to delete"),
                        Err(e) => warn!(error = %e, "Refresh token sweep failed"),
                    }
                }
            }
        }
    })
}
