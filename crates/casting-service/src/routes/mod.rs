//! HTTP routes for the Casting API.
//!
//! Defines the Axum router and application state.

use crate::auth::{AuthGuard, JwksCache, JwtValidator};
use crate::config::Config;
use crate::handlers;
use crate::observability::http_metrics::http_metrics_middleware;
use crate::repositories::Catalog;
use axum::{
    middleware,
    routing::{get, patch},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

pub use crate::observability::metrics::init_metrics_recorder;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Service configuration.
    pub config: Config,

    /// Key set cache, shared with the validator and the refresher task.
    pub jwks: Arc<JwksCache>,

    /// Authorization entry point for protected handlers.
    pub guard: Arc<AuthGuard>,

    /// Movie and actor store.
    pub catalog: Arc<Catalog>,
}

impl AppState {
    /// Build the JWKS cache, validator, guard and an empty catalog from
    /// configuration.
    pub fn from_config(config: Config) -> Self {
        let jwks = Arc::new(JwksCache::with_options(
            config.jwks_url.clone(),
            config.jwks_cache_options(),
        ));
        let validator = Arc::new(JwtValidator::new(
            Arc::clone(&jwks),
            config.validation_policy(),
        ));
        let guard = Arc::new(AuthGuard::new(
            validator,
            config.reveal_required_permission,
        ));

        Self {
            config,
            jwks,
            guard,
            catalog: Arc::new(Catalog::new()),
        }
    }
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/v1/health` - Health check (public)
/// - `/metrics` - Prometheus metrics endpoint (public)
/// - `/v1/me` - Current caller (any valid token)
/// - `/movies`, `/movies/:id` - Movie catalog (per-endpoint permission)
/// - `/actors`, `/actors/:id` - Actor catalog (per-endpoint permission)
/// - TraceLayer for request logging
/// - HTTP metrics middleware
/// - 30 second request timeout
///
/// Protected handlers call `AuthGuard::authorize` themselves, before any
/// other extraction is acted on.
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let api_routes = Router::new()
        .route("/v1/health", get(handlers::health_check))
        .route("/v1/me", get(handlers::get_me))
        .route(
            "/movies",
            get(handlers::list_movies).post(handlers::create_movie),
        )
        .route(
            "/movies/:id",
            patch(handlers::update_movie).delete(handlers::delete_movie),
        )
        .route(
            "/actors",
            get(handlers::list_actors).post(handlers::create_actor),
        )
        .route(
            "/actors/:id",
            patch(handlers::update_actor).delete(handlers::delete_actor),
        )
        .with_state(state);

    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    // Layer order (bottom-to-top execution):
    // 1. TimeoutLayer - Timeout the request (innermost)
    // 2. TraceLayer - Log request details
    // 3. http_metrics_middleware - Record ALL responses (outermost)
    api_routes
        .merge(metrics_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(middleware::from_fn(http_metrics_middleware))
}
