//! Health check handler.

use crate::models::HealthResponse;
use crate::routes::AppState;
use axum::extract::State;
use axum::Json;
use std::sync::Arc;
use tracing::instrument;

/// Handler for GET /v1/health
///
/// Public. Reports how many signing keys the JWKS cache currently holds;
/// never triggers a fetch.
///
/// ## Example Response
///
/// ```json
/// {
///   "status": "healthy",
///   "jwks_keys_cached": 2
/// }
/// ```
#[instrument(skip_all, name = "casting.health.check")]
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        jwks_keys_cached: state.jwks.cached_key_count().await,
    })
}
