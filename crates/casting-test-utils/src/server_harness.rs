//! Test server harness for E2E testing
//!
//! Provides `TestCastingServer` for spawning real Casting API instances in
//! tests, wired to a mock JWKS endpoint.

use crate::token_builders::{TEST_AUDIENCE, TEST_AUTH0_DOMAIN};
use casting_service::config::Config;
use casting_service::routes::{self, init_metrics_recorder, AppState};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use tokio::task::JoinHandle;

/// Global metrics handle for test servers.
///
/// Only one recorder can be installed per process; later servers share it.
static TEST_METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Prometheus handle shared by all test servers in this process.
pub fn test_metrics_handle() -> PrometheusHandle {
    TEST_METRICS_HANDLE
        .get_or_init(|| {
            init_metrics_recorder()
                .unwrap_or_else(|_| PrometheusBuilder::new().build_recorder().handle())
        })
        .clone()
}

/// Test harness for spawning the Casting API in E2E tests.
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_list_movies() -> Result<()> {
///     let keypair = TestKeypair::primary();
///     let jwks = MockJwks::start(&[&keypair]).await;
///     let server = TestCastingServer::spawn(&jwks.url()).await?;
///
///     let token = TestTokenBuilder::new()
///         .with_permissions(&["get:movies"])
///         .sign(&keypair);
///
///     let response = reqwest::Client::new()
///         .get(format!("{}/movies", server.url()))
///         .bearer_auth(token)
///         .send()
///         .await?;
///
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestCastingServer {
    addr: SocketAddr,
    state: Arc<AppState>,
    _handle: JoinHandle<()>,
}

impl TestCastingServer {
    /// Spawn a server validating tokens against `jwks_url`.
    pub async fn spawn(jwks_url: &str) -> Result<Self, anyhow::Error> {
        Self::spawn_with(jwks_url, &[]).await
    }

    /// Spawn a server with additional configuration variables.
    ///
    /// `overrides` are applied on top of the test defaults, so any setting
    /// (for example `REVEAL_REQUIRED_PERMISSION`) can be changed per test.
    pub async fn spawn_with(
        jwks_url: &str,
        overrides: &[(&str, &str)],
    ) -> Result<Self, anyhow::Error> {
        let mut vars = HashMap::from([
            ("AUTH0_DOMAIN".to_string(), TEST_AUTH0_DOMAIN.to_string()),
            ("API_AUDIENCE".to_string(), TEST_AUDIENCE.to_string()),
            ("JWKS_URL".to_string(), jwks_url.to_string()),
            ("BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
            ("JWKS_FETCH_TIMEOUT_SECONDS".to_string(), "2".to_string()),
        ]);
        for (key, value) in overrides {
            vars.insert((*key).to_string(), (*value).to_string());
        }

        let config = Config::from_vars(&vars)
            .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))?;

        let state = Arc::new(AppState::from_config(config));

        // Build routes using the service's real route builder
        let app = routes::build_routes(Arc::clone(&state), test_metrics_handle());

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
            if let Err(e) = axum::serve(listener, make_service).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            state,
            _handle: handle,
        })
    }

    /// Get the base URL of the test server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get the socket address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Application state the server runs with (catalog, JWKS cache, config).
    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    /// Get reference to the server configuration.
    pub fn config(&self) -> &Config {
        &self.state.config
    }
}

impl Drop for TestCastingServer {
    fn drop(&mut self) {
        // Abort the HTTP server task so the port is released immediately
        self._handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_server_spawns_and_binds() -> Result<(), anyhow::Error> {
        let server = TestCastingServer::spawn("http://127.0.0.1:9/.well-known/jwks.json").await?;

        assert_ne!(server.addr().port(), 0);
        assert!(server.url().starts_with("http://127.0.0.1:"));
        assert_eq!(server.config().api_audience, TEST_AUDIENCE);

        Ok(())
    }

    #[tokio::test]
    async fn test_health_endpoint_is_public() -> Result<(), anyhow::Error> {
        let server = TestCastingServer::spawn("http://127.0.0.1:9/.well-known/jwks.json").await?;

        let response = reqwest::get(format!("{}/v1/health", server.url())).await?;

        assert_eq!(response.status(), 200);
        let body: serde_json::Value = response.json().await?;
        assert_eq!(body["status"], "healthy");

        Ok(())
    }

    #[tokio::test]
    async fn test_overrides_apply() -> Result<(), anyhow::Error> {
        let server = TestCastingServer::spawn_with(
            "http://127.0.0.1:9/.well-known/jwks.json",
            &[("REVEAL_REQUIRED_PERMISSION", "true")],
        )
        .await?;

        assert!(server.config().reveal_required_permission);

        Ok(())
    }
}
