//! Casting API
//!
//! Entry point for the movie and actor catalog service.
//!
//! # Startup Sequence
//!
//! 1. Initialize tracing
//! 2. Initialize Prometheus metrics recorder
//! 3. Load configuration
//! 4. Build JWKS cache, validator, guard and catalog
//! 5. Spawn the JWKS refresher (when `JWKS_REFRESH_INTERVAL_SECONDS` > 0)
//! 6. Serve HTTP until SIGINT/SIGTERM, then drain

use casting_service::config::Config;
use casting_service::routes::{self, init_metrics_recorder, AppState};
use casting_service::tasks::start_jwks_refresher;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "casting_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Casting API");

    // Must happen before any metrics are recorded
    let metrics_handle = init_metrics_recorder().inspect_err(|e| {
        error!(error = %e, "Failed to install Prometheus metrics recorder");
    })?;

    // Load configuration
    let config = Config::from_env().inspect_err(|e| {
        error!("Failed to load configuration: {}", e);
    })?;

    info!(
        issuer = %config.issuer(),
        audience = %config.api_audience,
        jwks_url = %config.jwks_url,
        bind_address = %config.bind_address,
        "Configuration loaded successfully"
    );

    let bind_address = config.bind_address.clone();
    let refresh_interval = config.jwks_refresh_interval();

    let state = Arc::new(AppState::from_config(config));

    // Background JWKS refresh shares the request path's cache
    let cancel_token = CancellationToken::new();
    let refresher = refresh_interval.map(|interval| {
        tokio::spawn(start_jwks_refresher(
            Arc::clone(&state.jwks),
            interval,
            cancel_token.child_token(),
        ))
    });

    let app = routes::build_routes(state, metrics_handle);

    let addr: SocketAddr = bind_address.parse().inspect_err(|e| {
        error!("Invalid bind address: {}", e);
    })?;

    // Bind before announcing to fail fast on bind errors
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Casting API listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    cancel_token.cancel();
    if let Some(refresher) = refresher {
        if let Err(e) = refresher.await {
            warn!(error = %e, "JWKS refresher task ended abnormally");
        }
    }

    info!("Casting API shutdown complete");

    Ok(())
}

/// Listens for shutdown signals (SIGTERM, SIGINT).
/// Returns when a shutdown signal is received and drain period is complete.
async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT, starting graceful shutdown..."),
            Err(e) => error!("Failed to listen for SIGINT: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, starting graceful shutdown...");
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    // Graceful shutdown drain period
    let drain_secs: u64 = std::env::var("CASTING_DRAIN_SECONDS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(30);

    if drain_secs > 0 {
        warn!("Draining connections for {} seconds...", drain_secs);
        tokio::time::sleep(Duration::from_secs(drain_secs)).await;
        info!("Drain period complete");
    } else {
        info!("Skipping drain period (CASTING_DRAIN_SECONDS=0)");
    }
}
