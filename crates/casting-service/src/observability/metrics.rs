//! Metrics definitions for the Casting API.
//!
//! All metrics follow Prometheus naming conventions:
//! - `casting_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded to prevent cardinality explosion:
//! - `method`: HTTP methods
//! - `endpoint`: parameterized paths (`/movies/{id}`), unknown paths are `/other`
//! - `status`: success, error, timeout
//! - `outcome`: one value per authorization failure kind plus `allowed`
//! - `result`: hit, miss, unknown

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize Prometheus metrics recorder and return the handle
/// for serving metrics via HTTP.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns error if Prometheus recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("casting_http_request".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.150, 0.200, 0.300, 0.500, 1.000, 2.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        // Authorization includes a JWKS fetch on a cold cache
        .set_buckets_for_metric(
            Matcher::Prefix("casting_authorization".to_string()),
            &[
                0.0005, 0.001, 0.002, 0.005, 0.010, 0.050, 0.100, 0.500, 1.000, 5.000, 10.000,
            ],
        )
        .map_err(|e| format!("Failed to set authorization buckets: {e}"))?
        .set_buckets_for_metric(
            Matcher::Prefix("casting_jwks_fetch".to_string()),
            &[0.010, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000, 10.000],
        )
        .map_err(|e| format!("Failed to set JWKS fetch buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// HTTP Request Metrics
// ============================================================================

/// Record HTTP request completion
///
/// Metric: `casting_http_requests_total`, `casting_http_request_duration_seconds`
/// Labels: `method`, `endpoint`, `status` / `status_code`
///
/// This captures ALL HTTP responses including framework-level errors
/// (415, 400 JSON rejections, 404, 405).
pub fn record_http_request(method: &str, endpoint: &str, status_code: u16, duration: Duration) {
    let normalized_endpoint = normalize_endpoint(endpoint);
    let status = categorize_status_code(status_code);

    histogram!("casting_http_request_duration_seconds",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint.clone(),
        "status" => status.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("casting_http_requests_total",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

/// Categorize HTTP status code into success/error/timeout
fn categorize_status_code(status_code: u16) -> &'static str {
    match status_code {
        200..=299 => "success",
        408 | 504 => "timeout",
        _ => "error",
    }
}

/// Normalize endpoint path to prevent label cardinality explosion.
///
/// Replaces numeric resource ids with `{id}`.
fn normalize_endpoint(path: &str) -> String {
    match path {
        "/" | "/v1/health" | "/v1/me" | "/metrics" | "/movies" | "/actors" => path.to_string(),
        _ => normalize_dynamic_endpoint(path),
    }
}

fn normalize_dynamic_endpoint(path: &str) -> String {
    let mut segments = path.trim_start_matches('/').split('/');

    match (segments.next(), segments.next(), segments.next()) {
        (Some(resource @ ("movies" | "actors")), Some(id), None)
            if !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit()) =>
        {
            format!("/{resource}/{{id}}")
        }
        _ => "/other".to_string(),
    }
}

// ============================================================================
// Authorization Metrics
// ============================================================================

/// Record an authorization decision made by the auth guard.
///
/// Metric: `casting_authorization_total`, `casting_authorization_duration_seconds`
/// Labels: `outcome` (`allowed` or the failure code, e.g. `token_expired`)
pub fn record_authorization(outcome: &str, duration: Duration) {
    histogram!("casting_authorization_duration_seconds",
        "outcome" => outcome.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("casting_authorization_total",
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

// ============================================================================
// JWKS Metrics
// ============================================================================

/// Record a key lookup against the JWKS cache.
///
/// Metric: `casting_jwks_cache_lookups_total`
/// Labels: `result` (`hit`, `miss` - triggered a refresh, `unknown` - answered
/// from a fresh cache without refreshing)
pub fn record_jwks_cache_lookup(result: &str) {
    counter!("casting_jwks_cache_lookups_total",
        "result" => result.to_string()
    )
    .increment(1);
}

/// Record a JWKS fetch from the identity provider.
///
/// Metric: `casting_jwks_fetch_total`, `casting_jwks_fetch_duration_seconds`
/// Labels: `status` (`success`, `error`)
pub fn record_jwks_fetch(status: &str, duration: Duration) {
    histogram!("casting_jwks_fetch_duration_seconds",
        "status" => status.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("casting_jwks_fetch_total",
        "status" => status.to_string()
    )
    .increment(1);
}
