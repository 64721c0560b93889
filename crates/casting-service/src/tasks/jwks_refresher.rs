//! JWKS refresher background task.
//!
//! Refreshes the key set on a fixed interval so request-time lookups rarely
//! hit an expired cache. The first refresh runs immediately, warming the
//! cache at startup.
//!
//! # Graceful Shutdown
//!
//! The task exits when the cancellation token is cancelled. A refresh in
//! progress at that moment is abandoned; concurrent request-time lookups that
//! joined it still receive its outcome.

use crate::auth::JwksCache;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

/// Start the JWKS refresher background task.
///
/// # Arguments
///
/// * `jwks` - Cache to refresh
/// * `interval` - Time between refreshes
/// * `cancel_token` - Token for graceful shutdown
///
/// # Returns
///
/// Returns when the cancellation token is triggered.
#[instrument(skip_all, name = "casting.task.jwks_refresher")]
pub async fn start_jwks_refresher(
    jwks: Arc<JwksCache>,
    interval: Duration,
    cancel_token: CancellationToken,
) {
    info!(
        target: "casting.task.jwks_refresher",
        interval_seconds = interval.as_secs(),
        "Starting JWKS refresher task"
    );

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;

            _ = cancel_token.cancelled() => {
                info!(
                    target: "casting.task.jwks_refresher",
                    "JWKS refresher received shutdown signal, exiting"
                );
                break;
            }
            _ = ticker.tick() => {
                // Errors leave the previous key set in place; the next tick retries
                if let Err(e) = jwks.refresh().await {
                    warn!(
                        target: "casting.task.jwks_refresher",
                        error = %e,
                        "Scheduled JWKS refresh failed"
                    );
                }
            }
        }
    }

    info!(target: "casting.task.jwks_refresher", "JWKS refresher task stopped");
}
