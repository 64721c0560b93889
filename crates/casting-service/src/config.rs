//! Casting API configuration.
//!
//! Configuration is loaded from environment variables once at startup and is
//! immutable for the lifetime of the process.

use crate::auth::jwks::{
    JwksCacheOptions, DEFAULT_CACHE_TTL_SECONDS, DEFAULT_FETCH_TIMEOUT_SECONDS,
    DEFAULT_MISS_COOLDOWN_SECONDS,
};
use crate::auth::jwt::ValidationPolicy;
use jsonwebtoken::Algorithm;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Default HTTP bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Default allowed token algorithms.
pub const DEFAULT_ALGORITHMS: &str = "RS256";

/// Maximum JWKS fetch timeout in seconds.
pub const MAX_FETCH_TIMEOUT_SECONDS: u64 = 60;

/// Casting API configuration.
#[derive(Clone)]
pub struct Config {
    /// Identity provider tenant domain, without scheme or trailing slash.
    pub auth0_domain: String,

    /// Required token audience.
    pub api_audience: String,

    /// Allowed token signing algorithms.
    pub algorithms: Vec<Algorithm>,

    /// JWKS endpoint (default: `https://{domain}/.well-known/jwks.json`).
    pub jwks_url: String,

    /// Server bind address (default: "0.0.0.0:8080").
    pub bind_address: String,

    /// How long a fetched key set is trusted.
    pub jwks_cache_ttl_seconds: u64,

    /// Upper bound on one JWKS fetch.
    pub jwks_fetch_timeout_seconds: u64,

    /// Minimum cache age before an unknown `kid` forces a refetch.
    pub jwks_miss_cooldown_seconds: u64,

    /// Background refresh interval; 0 disables the refresher.
    pub jwks_refresh_interval_seconds: u64,

    /// Name the missing permission in 403 responses.
    pub reveal_required_permission: bool,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("auth0_domain", &self.auth0_domain)
            .field("api_audience", &self.api_audience)
            .field("algorithms", &self.algorithms)
            .field("jwks_url", &self.jwks_url)
            .field("bind_address", &self.bind_address)
            .field("jwks_cache_ttl_seconds", &self.jwks_cache_ttl_seconds)
            .field("jwks_fetch_timeout_seconds", &self.jwks_fetch_timeout_seconds)
            .field("jwks_miss_cooldown_seconds", &self.jwks_miss_cooldown_seconds)
            .field(
                "jwks_refresh_interval_seconds",
                &self.jwks_refresh_interval_seconds,
            )
            .field(
                "reveal_required_permission",
                &self.reveal_required_permission,
            )
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid algorithm configuration: {0}")]
    InvalidAlgorithms(String),

    #[error("Invalid JWKS configuration: {0}")]
    InvalidJwks(String),

    #[error("Invalid boolean for {0}: expected 'true' or 'false'")]
    InvalidBool(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let auth0_domain = normalize_domain(required(vars, "AUTH0_DOMAIN")?);
        if auth0_domain.is_empty() {
            return Err(ConfigError::MissingEnvVar("AUTH0_DOMAIN".to_string()));
        }

        let api_audience = required(vars, "API_AUDIENCE")?.to_string();

        let algorithms = parse_algorithms(
            vars.get("ALGORITHMS")
                .map_or(DEFAULT_ALGORITHMS, String::as_str),
        )?;

        let jwks_url = vars
            .get("JWKS_URL")
            .filter(|url| !url.trim().is_empty())
            .cloned()
            .unwrap_or_else(|| format!("https://{auth0_domain}/.well-known/jwks.json"));

        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let jwks_cache_ttl_seconds =
            parse_seconds(vars, "JWKS_CACHE_TTL_SECONDS", DEFAULT_CACHE_TTL_SECONDS)?;
        if jwks_cache_ttl_seconds == 0 {
            return Err(ConfigError::InvalidJwks(
                "JWKS_CACHE_TTL_SECONDS must be greater than 0".to_string(),
            ));
        }

        let jwks_fetch_timeout_seconds = parse_seconds(
            vars,
            "JWKS_FETCH_TIMEOUT_SECONDS",
            DEFAULT_FETCH_TIMEOUT_SECONDS,
        )?;
        if !(1..=MAX_FETCH_TIMEOUT_SECONDS).contains(&jwks_fetch_timeout_seconds) {
            return Err(ConfigError::InvalidJwks(format!(
                "JWKS_FETCH_TIMEOUT_SECONDS must be between 1 and {MAX_FETCH_TIMEOUT_SECONDS}, got {jwks_fetch_timeout_seconds}"
            )));
        }

        let jwks_miss_cooldown_seconds = parse_seconds(
            vars,
            "JWKS_MISS_COOLDOWN_SECONDS",
            DEFAULT_MISS_COOLDOWN_SECONDS,
        )?;

        let jwks_refresh_interval_seconds =
            parse_seconds(vars, "JWKS_REFRESH_INTERVAL_SECONDS", 0)?;

        let reveal_required_permission = match vars.get("REVEAL_REQUIRED_PERMISSION") {
            None => false,
            Some(value) => match value.trim().to_ascii_lowercase().as_str() {
                "true" => true,
                "false" => false,
                _ => {
                    return Err(ConfigError::InvalidBool(
                        "REVEAL_REQUIRED_PERMISSION".to_string(),
                    ))
                }
            },
        };

        Ok(Config {
            auth0_domain,
            api_audience,
            algorithms,
            jwks_url,
            bind_address,
            jwks_cache_ttl_seconds,
            jwks_fetch_timeout_seconds,
            jwks_miss_cooldown_seconds,
            jwks_refresh_interval_seconds,
            reveal_required_permission,
        })
    }

    /// Expected token issuer, `https://{domain}/`.
    pub fn issuer(&self) -> String {
        format!("https://{}/", self.auth0_domain)
    }

    /// Audience, issuer and algorithm requirements for the validator.
    pub fn validation_policy(&self) -> ValidationPolicy {
        ValidationPolicy {
            audience: self.api_audience.clone(),
            issuer: self.issuer(),
            algorithms: self.algorithms.clone(),
        }
    }

    /// Cache tuning derived from the `JWKS_*` variables.
    pub fn jwks_cache_options(&self) -> JwksCacheOptions {
        JwksCacheOptions {
            cache_ttl: Duration::from_secs(self.jwks_cache_ttl_seconds),
            fetch_timeout: Duration::from_secs(self.jwks_fetch_timeout_seconds),
            miss_cooldown: Duration::from_secs(self.jwks_miss_cooldown_seconds),
        }
    }

    /// Background refresh interval, if enabled.
    pub fn jwks_refresh_interval(&self) -> Option<Duration> {
        (self.jwks_refresh_interval_seconds > 0)
            .then(|| Duration::from_secs(self.jwks_refresh_interval_seconds))
    }
}

fn required<'a>(vars: &'a HashMap<String, String>, name: &str) -> Result<&'a str, ConfigError> {
    vars.get(name)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))
}

/// Accepts `tenant.auth0.com`, `https://tenant.auth0.com` or
/// `https://tenant.auth0.com/`.
fn normalize_domain(raw: &str) -> String {
    raw.trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_end_matches('/')
        .to_string()
}

/// Parse a comma-separated list of asymmetric algorithms.
fn parse_algorithms(raw: &str) -> Result<Vec<Algorithm>, ConfigError> {
    let mut algorithms = Vec::new();

    for name in raw.split(',').map(str::trim).filter(|name| !name.is_empty()) {
        let algorithm = Algorithm::from_str(name).map_err(|_| {
            ConfigError::InvalidAlgorithms(format!("unknown algorithm '{name}'"))
        })?;

        if matches!(algorithm, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512) {
            return Err(ConfigError::InvalidAlgorithms(format!(
                "symmetric algorithm '{name}' cannot be verified against a JWKS"
            )));
        }

        if !algorithms.contains(&algorithm) {
            algorithms.push(algorithm);
        }
    }

    if algorithms.is_empty() {
        return Err(ConfigError::InvalidAlgorithms(
            "ALGORITHMS must name at least one algorithm".to_string(),
        ));
    }

    Ok(algorithms)
}

fn parse_seconds(
    vars: &HashMap<String, String>,
    name: &str,
    default: u64,
) -> Result<u64, ConfigError> {
    match vars.get(name) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|e| {
            ConfigError::InvalidJwks(format!(
                "{name} must be a valid non-negative integer, got '{value}': {e}"
            ))
        }),
    }
}
