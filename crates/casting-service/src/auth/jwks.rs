//! JWKS cache for the identity provider's public signing keys.
//!
//! Fetches the key set from `https://{domain}/.well-known/jwks.json` (or a
//! configured override), converts each entry into a ready-to-use
//! `SigningKey`, and caches the whole set with a TTL.
//!
//! # Concurrency
//!
//! - Readers share a `RwLock`; the key map is replaced wholesale on refresh
//! - Refreshes are single-flight: concurrent callers await one shared fetch
//!   and all observe the same outcome
//! - A failed fetch is not cached; the next caller triggers a new one
//!
//! # Security
//!
//! - Symmetric (`oct`) and encryption (`use: enc`) keys are never loaded
//! - By default every unknown key ID triggers a refetch (joining any fetch
//!   already in flight). A non-zero miss cooldown limits this to one refetch
//!   per cooldown, so random `kid` values cannot force a fetch per request

use crate::observability::metrics;
use futures::future::{BoxFuture, FutureExt, Shared};
use jsonwebtoken::{Algorithm, DecodingKey};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::instrument;

/// Default cache TTL in seconds (5 minutes).
pub const DEFAULT_CACHE_TTL_SECONDS: u64 = 300;

/// Default timeout for one JWKS fetch in seconds.
pub const DEFAULT_FETCH_TIMEOUT_SECONDS: u64 = 10;

/// Default minimum age of the cache before an unknown `kid` triggers a
/// refetch. Zero refetches on every miss.
pub const DEFAULT_MISS_COOLDOWN_SECONDS: u64 = 0;

/// Key set lookup failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeySetError {
    /// The key ID is not in the (freshly fetched) key set.
    #[error("Signing key not found in key set")]
    UnknownKeyId,

    /// The key set could not be fetched or parsed. Transient.
    #[error("Key set fetch failed: {0}")]
    FetchFailure(String),
}

/// JSON Web Key from the JWKS endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Jwk {
    /// Key type ("RSA", "EC", "OKP").
    pub kty: String,

    /// Key ID - used to select the correct key for verification.
    #[serde(default)]
    pub kid: Option<String>,

    /// Algorithm (e.g. "RS256").
    #[serde(default)]
    pub alg: Option<String>,

    /// Key use (should be "sig" for signing).
    #[serde(default, rename = "use")]
    pub key_use: Option<String>,

    /// RSA modulus (base64url).
    #[serde(default)]
    pub n: Option<String>,

    /// RSA public exponent (base64url).
    #[serde(default)]
    pub e: Option<String>,

    /// Curve name for EC / OKP keys.
    #[serde(default)]
    pub crv: Option<String>,

    /// EC x coordinate or Ed25519 public key (base64url).
    #[serde(default)]
    pub x: Option<String>,

    /// EC y coordinate (base64url).
    #[serde(default)]
    pub y: Option<String>,
}

/// JWKS response from the identity provider.
#[derive(Debug, Clone, Deserialize)]
pub struct JwksResponse {
    /// List of JSON Web Keys.
    pub keys: Vec<Jwk>,
}

/// A verification key ready for signature checks.
///
/// Immutable once built; a refresh replaces the whole set.
pub struct SigningKey {
    kid: String,
    algorithm: Algorithm,
    decoding_key: DecodingKey,
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("kid", &self.kid)
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

impl SigningKey {
    /// Key ID.
    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// The algorithm this key verifies.
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Key material for `jsonwebtoken`.
    pub fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }
}

impl Jwk {
    /// Convert into a `SigningKey`.
    ///
    /// Returns a description of the problem when the entry is not usable
    /// for signature verification.
    pub fn to_signing_key(&self) -> Result<SigningKey, String> {
        let kid = self
            .kid
            .as_deref()
            .filter(|kid| !kid.is_empty())
            .ok_or_else(|| "missing kid".to_string())?;

        if let Some(key_use) = &self.key_use {
            if key_use != "sig" {
                return Err(format!("unsupported key use '{key_use}'"));
            }
        }

        let algorithm = self.algorithm()?;

        let decoding_key = match self.kty.as_str() {
            "RSA" => {
                if !matches!(
                    algorithm,
                    Algorithm::RS256
                        | Algorithm::RS384
                        | Algorithm::RS512
                        | Algorithm::PS256
                        | Algorithm::PS384
                        | Algorithm::PS512
                ) {
                    return Err(format!("algorithm {algorithm:?} does not fit an RSA key"));
                }
                let n = required(&self.n, "n")?;
                let e = required(&self.e, "e")?;
                DecodingKey::from_rsa_components(n, e).map_err(|e| e.to_string())?
            }
            "EC" => {
                let expected_curve = match algorithm {
                    Algorithm::ES256 => "P-256",
                    Algorithm::ES384 => "P-384",
                    other => return Err(format!("algorithm {other:?} does not fit an EC key")),
                };
                if self.crv.as_deref() != Some(expected_curve) {
                    return Err(format!("EC key curve does not match {algorithm:?}"));
                }
                let x = required(&self.x, "x")?;
                let y = required(&self.y, "y")?;
                DecodingKey::from_ec_components(x, y).map_err(|e| e.to_string())?
            }
            "OKP" => {
                if algorithm != Algorithm::EdDSA || self.crv.as_deref() != Some("Ed25519") {
                    return Err("OKP keys must be Ed25519 with EdDSA".to_string());
                }
                let x = required(&self.x, "x")?;
                DecodingKey::from_ed_components(x).map_err(|e| e.to_string())?
            }
            other => return Err(format!("unsupported key type '{other}'")),
        };

        Ok(SigningKey {
            kid: kid.to_string(),
            algorithm,
            decoding_key,
        })
    }

    /// Declared algorithm, or the conventional one for the key type.
    fn algorithm(&self) -> Result<Algorithm, String> {
        if let Some(alg) = &self.alg {
            return Algorithm::from_str(alg).map_err(|_| format!("unsupported algorithm '{alg}'"));
        }

        match (self.kty.as_str(), self.crv.as_deref()) {
            ("RSA", _) => Ok(Algorithm::RS256),
            ("EC", Some("P-256")) => Ok(Algorithm::ES256),
            ("EC", Some("P-384")) => Ok(Algorithm::ES384),
            ("OKP", Some("Ed25519")) => Ok(Algorithm::EdDSA),
            _ => Err("cannot infer algorithm".to_string()),
        }
    }
}

fn required<'a>(field: &'a Option<String>, name: &str) -> Result<&'a str, String> {
    field
        .as_deref()
        .filter(|value| !value.is_empty())
        .ok_or_else(|| format!("missing '{name}'"))
}

/// Tuning knobs for `JwksCache`.
#[derive(Debug, Clone, Copy)]
pub struct JwksCacheOptions {
    /// How long a fetched key set is served before refetching.
    pub cache_ttl: Duration,

    /// Upper bound on one fetch, including body download.
    pub fetch_timeout: Duration,

    /// Minimum cache age before an unknown `kid` forces a refetch.
    pub miss_cooldown: Duration,
}

impl Default for JwksCacheOptions {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECONDS),
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECONDS),
            miss_cooldown: Duration::from_secs(DEFAULT_MISS_COOLDOWN_SECONDS),
        }
    }
}

/// Cached key set with fetch and expiry times.
struct CachedKeySet {
    /// Map of key ID to signing key.
    keys: HashMap<String, Arc<SigningKey>>,

    /// When this key set was fetched.
    fetched_at: Instant,

    /// When this cache entry expires.
    expires_at: Instant,
}

type SharedCache = Arc<RwLock<Option<CachedKeySet>>>;

/// One in-flight refresh, awaited by every concurrent caller.
type RefreshFlight = Shared<BoxFuture<'static, Result<usize, KeySetError>>>;

enum Lookup {
    Hit(Arc<SigningKey>),
    Unknown,
    Refresh,
}

/// JWKS cache for fetching and caching public keys.
///
/// Owned by the application state for the lifetime of the process.
pub struct JwksCache {
    /// URL to the JWKS endpoint.
    jwks_url: String,

    /// HTTP client for fetching JWKS.
    http_client: reqwest::Client,

    /// Cached key set.
    cache: SharedCache,

    /// Refresh currently in progress, if any.
    in_flight: Mutex<Option<RefreshFlight>>,

    options: JwksCacheOptions,
}

impl JwksCache {
    /// Create a new JWKS cache with default options.
    ///
    /// # Arguments
    ///
    /// * `jwks_url` - URL to the identity provider's JWKS endpoint
    pub fn new(jwks_url: String) -> Self {
        Self::with_options(jwks_url, JwksCacheOptions::default())
    }

    /// Create a new JWKS cache with custom TTL, timeout and miss cooldown.
    pub fn with_options(jwks_url: String, options: JwksCacheOptions) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(options.fetch_timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(target: "casting.auth.jwks", error = %e, "Failed to build HTTP client with custom config, using defaults");
                reqwest::Client::new()
            });

        Self {
            jwks_url,
            http_client,
            cache: Arc::new(RwLock::new(None)),
            in_flight: Mutex::new(None),
            options,
        }
    }

    /// JWKS endpoint this cache fetches from.
    pub fn jwks_url(&self) -> &str {
        &self.jwks_url
    }

    /// Get a signing key by key ID.
    ///
    /// Serves from cache when fresh; otherwise joins (or starts) a refresh.
    ///
    /// # Errors
    ///
    /// Returns `KeySetError::FetchFailure` if the key set cannot be fetched.
    /// Returns `KeySetError::UnknownKeyId` if the key ID is not in the set.
    #[instrument(skip(self), fields(kid = %kid))]
    pub async fn get_key(&self, kid: &str) -> Result<Arc<SigningKey>, KeySetError> {
        let observed_at = Instant::now();

        match self.lookup(kid).await {
            Lookup::Hit(key) => {
                tracing::debug!(target: "casting.auth.jwks", kid = %kid, "JWKS cache hit");
                metrics::record_jwks_cache_lookup("hit");
                return Ok(key);
            }
            Lookup::Unknown => {
                tracing::debug!(target: "casting.auth.jwks", kid = %kid, "Key not found in JWKS cache");
                metrics::record_jwks_cache_lookup("unknown");
                return Err(KeySetError::UnknownKeyId);
            }
            Lookup::Refresh => {
                metrics::record_jwks_cache_lookup("miss");
            }
        }

        self.refresh_after(Some(observed_at)).await?;

        let cache = self.cache.read().await;
        if let Some(key) = cache.as_ref().and_then(|cached| cached.keys.get(kid)) {
            return Ok(Arc::clone(key));
        }

        // Key not found even after refresh
        tracing::warn!(target: "casting.auth.jwks", kid = %kid, "Key not found in JWKS after refresh");
        Err(KeySetError::UnknownKeyId)
    }

    /// Refresh the key set now, joining any refresh already in progress.
    ///
    /// Returns the number of usable keys loaded.
    pub async fn refresh(&self) -> Result<usize, KeySetError> {
        self.refresh_after(None).await
    }

    /// Number of keys currently cached (expired or not).
    pub async fn cached_key_count(&self) -> usize {
        self.cache
            .read()
            .await
            .as_ref()
            .map_or(0, |cached| cached.keys.len())
    }

    async fn lookup(&self, kid: &str) -> Lookup {
        let cache = self.cache.read().await;
        let Some(cached) = cache.as_ref() else {
            return Lookup::Refresh;
        };

        let now = Instant::now();
        if cached.expires_at <= now {
            return Lookup::Refresh;
        }

        if let Some(key) = cached.keys.get(kid) {
            return Lookup::Hit(Arc::clone(key));
        }

        if now.duration_since(cached.fetched_at) < self.options.miss_cooldown {
            Lookup::Unknown
        } else {
            Lookup::Refresh
        }
    }

    /// Single-flight refresh.
    ///
    /// With `observed_at`, a key set fetched after that instant is accepted
    /// as-is instead of starting another fetch. A flight that already
    /// resolved is never joined: if all of its waiters were dropped before
    /// clearing the slot, its outcome is stale.
    #[instrument(skip_all)]
    async fn refresh_after(&self, observed_at: Option<Instant>) -> Result<usize, KeySetError> {
        let flight = {
            let mut in_flight = self.in_flight.lock().await;
            match in_flight
                .as_ref()
                .filter(|existing| existing.peek().is_none())
            {
                Some(existing) => {
                    tracing::debug!(target: "casting.auth.jwks", "Joining in-flight JWKS refresh");
                    existing.clone()
                }
                None => {
                    if let Some(observed_at) = observed_at {
                        let cache = self.cache.read().await;
                        if let Some(cached) = cache
                            .as_ref()
                            .filter(|cached| cached.fetched_at >= observed_at)
                        {
                            return Ok(cached.keys.len());
                        }
                    }

                    let flight = fetch_key_set(
                        self.http_client.clone(),
                        self.jwks_url.clone(),
                        Arc::clone(&self.cache),
                        self.options,
                    )
                    .boxed()
                    .shared();
                    *in_flight = Some(flight.clone());
                    flight
                }
            }
        };

        let outcome = flight.clone().await;

        let mut in_flight = self.in_flight.lock().await;
        if in_flight
            .as_ref()
            .is_some_and(|current| current.ptr_eq(&flight))
        {
            *in_flight = None;
        }

        outcome
    }

    /// Drop the cached key set.
    #[cfg(test)]
    pub async fn clear_cache(&self) {
        let mut cache = self.cache.write().await;
        *cache = None;
    }
}

/// Fetch, convert and store the key set. Runs once per flight.
async fn fetch_key_set(
    http_client: reqwest::Client,
    jwks_url: String,
    cache: SharedCache,
    options: JwksCacheOptions,
) -> Result<usize, KeySetError> {
    let start = Instant::now();
    tracing::debug!(target: "casting.auth.jwks", url = %jwks_url, "Fetching JWKS from identity provider");

    let downloaded = tokio::time::timeout(
        options.fetch_timeout,
        download_key_set(&http_client, &jwks_url),
    )
    .await
    .unwrap_or_else(|_| {
        tracing::error!(target: "casting.auth.jwks", timeout = ?options.fetch_timeout, "JWKS fetch timed out");
        Err(KeySetError::FetchFailure("timed out".to_string()))
    });

    let jwks = match downloaded {
        Ok(jwks) => jwks,
        Err(e) => {
            metrics::record_jwks_fetch("error", start.elapsed());
            return Err(e);
        }
    };

    // Build key map, skipping entries that cannot verify signatures
    let mut keys = HashMap::with_capacity(jwks.keys.len());
    for jwk in &jwks.keys {
        match jwk.to_signing_key() {
            Ok(key) => {
                keys.insert(key.kid.clone(), Arc::new(key));
            }
            Err(reason) => {
                tracing::warn!(
                    target: "casting.auth.jwks",
                    kid = ?jwk.kid,
                    kty = %jwk.kty,
                    reason = %reason,
                    "Skipping unusable JWK"
                );
            }
        }
    }

    let key_count = keys.len();
    let fetched_at = Instant::now();

    {
        let mut cached = cache.write().await;
        *cached = Some(CachedKeySet {
            keys,
            fetched_at,
            expires_at: fetched_at + options.cache_ttl,
        });
    }

    metrics::record_jwks_fetch("success", start.elapsed());
    tracing::info!(
        target: "casting.auth.jwks",
        key_count,
        "JWKS cache refreshed"
    );

    Ok(key_count)
}

async fn download_key_set(
    http_client: &reqwest::Client,
    jwks_url: &str,
) -> Result<JwksResponse, KeySetError> {
    let response = http_client.get(jwks_url).send().await.map_err(|e| {
        tracing::error!(target: "casting.auth.jwks", error = %e, "Failed to fetch JWKS");
        KeySetError::FetchFailure("identity provider unreachable".to_string())
    })?;

    if !response.status().is_success() {
        tracing::error!(
            target: "casting.auth.jwks",
            status = %response.status(),
            "JWKS endpoint returned error"
        );
        return Err(KeySetError::FetchFailure(format!(
            "JWKS endpoint returned {}",
            response.status()
        )));
    }

    response.json::<JwksResponse>().await.map_err(|e| {
        tracing::error!(target: "casting.auth.jwks", error = %e, "Failed to parse JWKS response");
        KeySetError::FetchFailure("malformed key set".to_string())
    })
}
