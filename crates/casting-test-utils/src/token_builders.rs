//! Builder patterns for test tokens
//!
//! Provides a fluent API for minting access tokens the way the identity
//! provider would, plus deliberately broken variants.

use crate::crypto_fixtures::TestKeypair;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Map, Value};

/// Identity provider domain used by the test harness.
pub const TEST_AUTH0_DOMAIN: &str = "casting-test.auth0.local";

/// Issuer matching `TEST_AUTH0_DOMAIN`.
pub const TEST_ISSUER: &str = "https://casting-test.auth0.local/";

/// API audience used by the test harness.
pub const TEST_AUDIENCE: &str = "casting";

/// Builder for test access tokens
///
/// # Example
/// ```rust,ignore
/// let token = TestTokenBuilder::new()
///     .for_user("auth0|assistant")
///     .with_permissions(&["get:movies", "get:actors"])
///     .expires_in(3600)
///     .sign(&TestKeypair::primary());
/// ```
pub struct TestTokenBuilder {
    claims: Map<String, Value>,
}

impl TestTokenBuilder {
    /// Create a new token builder with defaults
    ///
    /// Defaults carry the test issuer and audience, a one hour lifetime and
    /// no `permissions` claim.
    pub fn new() -> Self {
        let now = Utc::now();
        let mut claims = Map::new();
        claims.insert("iss".to_string(), json!(TEST_ISSUER));
        claims.insert("sub".to_string(), json!("auth0|test-subject"));
        claims.insert("aud".to_string(), json!([TEST_AUDIENCE]));
        claims.insert("iat".to_string(), json!(now.timestamp()));
        claims.insert(
            "exp".to_string(),
            json!((now + Duration::seconds(3600)).timestamp()),
        );
        Self { claims }
    }

    /// Set the subject
    pub fn for_user(self, subject: &str) -> Self {
        self.claim("sub", json!(subject))
    }

    /// Set the `permissions` claim
    pub fn with_permissions(self, permissions: &[&str]) -> Self {
        self.claim("permissions", json!(permissions))
    }

    /// Set the space-separated `scope` claim
    pub fn with_scope(self, scope: &str) -> Self {
        self.claim("scope", json!(scope))
    }

    /// Set a single-string audience
    pub fn with_audience(self, audience: &str) -> Self {
        self.claim("aud", json!(audience))
    }

    /// Set the issuer
    pub fn with_issuer(self, issuer: &str) -> Self {
        self.claim("iss", json!(issuer))
    }

    /// Set expiration in seconds from now (negative for already expired)
    pub fn expires_in(self, seconds: i64) -> Self {
        self.claim("exp", json!((Utc::now() + Duration::seconds(seconds)).timestamp()))
    }

    /// Set or override an arbitrary claim
    pub fn claim(mut self, name: &str, value: Value) -> Self {
        self.claims.insert(name.to_string(), value);
        self
    }

    /// Remove a claim entirely
    pub fn without(mut self, name: &str) -> Self {
        self.claims.remove(name);
        self
    }

    /// Claims as a JSON value
    pub fn build(self) -> Value {
        Value::Object(self.claims)
    }

    /// Sign with `keypair`, putting its `kid` in the header
    pub fn sign(self, keypair: &TestKeypair) -> String {
        self.sign_with_kid(keypair, Some(keypair.kid()))
    }

    /// Sign with `keypair` but advertise `kid` (or none) in the header
    pub fn sign_with_kid(self, keypair: &TestKeypair, kid: Option<&str>) -> String {
        let mut header = Header::new(keypair.algorithm());
        header.typ = Some("JWT".to_string());
        header.kid = kid.map(str::to_string);

        encode(&header, &self.build(), keypair.encoding_key()).expect("Failed to sign token")
    }

    /// Sign with a shared HMAC secret (never accepted by the service)
    pub fn sign_hs256(self, kid: &str) -> String {
        let mut header = Header::new(Algorithm::HS256);
        header.kid = Some(kid.to_string());

        encode(
            &header,
            &self.build(),
            &EncodingKey::from_secret(b"casting-test-shared-secret"),
        )
        .expect("Failed to sign token")
    }

    /// Unsigned token with `alg: none`
    pub fn unsigned(self, kid: &str) -> String {
        let header = json!({"alg": "none", "typ": "JWT", "kid": kid});
        format!(
            "{}.{}.",
            URL_SAFE_NO_PAD.encode(header.to_string()),
            URL_SAFE_NO_PAD.encode(self.build().to_string())
        )
    }
}

impl Default for TestTokenBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Replace the signature segment of a token with a different valid-looking one.
pub fn tamper_signature(token: &str) -> String {
    let mut parts: Vec<&str> = token.split('.').collect();
    let forged = URL_SAFE_NO_PAD.encode([0x42u8; 256]);
    if let Some(signature) = parts.last_mut() {
        *signature = &forged;
    }
    parts.join(".")
}
