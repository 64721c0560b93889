//! Mock identity provider JWKS endpoint
//!
//! Wraps a `wiremock::MockServer` serving `/.well-known/jwks.json`.

use crate::crypto_fixtures::{jwks_document, TestKeypair};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Path the mock serves the key set on.
pub const JWKS_PATH: &str = "/.well-known/jwks.json";

/// A running mock JWKS endpoint.
pub struct MockJwks {
    server: MockServer,
}

impl MockJwks {
    /// Start a server publishing `keys`.
    pub async fn start(keys: &[&TestKeypair]) -> Self {
        Self::start_with(ResponseTemplate::new(200).set_body_json(jwks_document(keys))).await
    }

    /// Start a server answering every JWKS request with `response`.
    pub async fn start_with(response: ResponseTemplate) -> Self {
        let mock = Self {
            server: MockServer::start().await,
        };
        mock.respond_with(response).await;
        mock
    }

    /// Start a server publishing `keys` after `delay`.
    pub async fn start_delayed(keys: &[&TestKeypair], delay: Duration) -> Self {
        Self::start_with(
            ResponseTemplate::new(200)
                .set_body_json(jwks_document(keys))
                .set_delay(delay),
        )
        .await
    }

    /// Replace whatever the endpoint serves and forget recorded requests.
    pub async fn respond_with(&self, response: ResponseTemplate) {
        self.server.reset().await;
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(response)
            .mount(&self.server)
            .await;
    }

    /// Publish a new key set (key rotation).
    pub async fn publish(&self, keys: &[&TestKeypair]) {
        self.respond_with(ResponseTemplate::new(200).set_body_json(jwks_document(keys)))
            .await;
    }

    /// Full JWKS URL.
    pub fn url(&self) -> String {
        format!("{}{}", self.server.uri(), JWKS_PATH)
    }

    /// Number of JWKS requests received since start or the last reset.
    pub async fn request_count(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map_or(0, |requests| requests.len())
    }
}
