//! JWT validation for the Casting API.
//!
//! Validates incoming JWTs using public keys fetched from the identity
//! provider's JWKS endpoint.
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - The header `alg` must be in the configured allow-list AND match the
//!   algorithm of the resolved key (no algorithm substitution)
//! - Expiry, audience and issuer are checked only after the signature
//! - Every failure is a distinct `TokenError` variant; the client-facing
//!   message stays generic

use crate::auth::claims::Claims;
use crate::auth::jwks::{JwksCache, KeySetError};
use chrono::Utc;
use common::jwt::{split_token, JwtValidationError};
use jsonwebtoken::{crypto, Algorithm};
use serde::Deserialize;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tracing::instrument;

/// Token validation failures.
///
/// Display strings are what clients see; untrusted-token kinds other than
/// `Expired` share one message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    /// Not three decodable segments, bad header, missing `kid`, or
    /// unparseable claims.
    #[error("The access token is invalid")]
    InvalidStructure,

    /// Declared algorithm is not allowed or does not match the key.
    #[error("The access token is invalid")]
    InvalidAlgorithm,

    /// No key with the token's `kid` in the key set.
    #[error("The access token is invalid")]
    UnknownKeyId,

    /// Signature does not verify.
    #[error("The access token is invalid")]
    InvalidSignature,

    /// `exp` missing or not in the future.
    #[error("Token expired")]
    Expired,

    /// `aud` does not contain the expected audience.
    #[error("The access token is invalid")]
    InvalidAudience,

    /// `iss` does not equal the expected issuer.
    #[error("The access token is invalid")]
    InvalidIssuer,

    /// The key set could not be fetched.
    #[error("Unable to verify credentials at this time")]
    KeySetUnavailable,
}

impl From<KeySetError> for TokenError {
    fn from(err: KeySetError) -> Self {
        match err {
            KeySetError::UnknownKeyId => TokenError::UnknownKeyId,
            KeySetError::FetchFailure(_) => TokenError::KeySetUnavailable,
        }
    }
}

impl From<JwtValidationError> for TokenError {
    fn from(_: JwtValidationError) -> Self {
        TokenError::InvalidStructure
    }
}

/// What a token must satisfy to be accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationPolicy {
    /// Required entry in `aud`.
    pub audience: String,

    /// Required value of `iss`.
    pub issuer: String,

    /// Accepted header `alg` values.
    pub algorithms: Vec<Algorithm>,
}

impl ValidationPolicy {
    /// Whether `algorithm` is on the allow-list.
    pub fn allows(&self, algorithm: Algorithm) -> bool {
        self.algorithms.contains(&algorithm)
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Audience {
    One(String),
    Many(Vec<String>),
}

/// Claims as they appear on the wire, before validation.
#[derive(Debug, Deserialize)]
struct RawClaims {
    #[serde(default)]
    iss: Option<String>,
    #[serde(default)]
    sub: Option<String>,
    #[serde(default)]
    aud: Option<Audience>,
    // NumericDate may carry a fractional part
    #[serde(default)]
    exp: Option<f64>,
    #[serde(default)]
    iat: Option<f64>,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    permissions: Option<Vec<String>>,
}

/// JWT validator using JWKS from the identity provider.
pub struct JwtValidator {
    /// JWKS cache for resolving public keys.
    jwks: Arc<JwksCache>,

    /// Audience, issuer and algorithm requirements.
    policy: ValidationPolicy,
}

impl JwtValidator {
    /// Create a new JWT validator.
    ///
    /// # Arguments
    ///
    /// * `jwks` - Cache for resolving public keys
    /// * `policy` - Audience, issuer and allowed algorithms
    pub fn new(jwks: Arc<JwksCache>, policy: ValidationPolicy) -> Self {
        Self { jwks, policy }
    }

    /// The policy tokens are checked against.
    pub fn policy(&self) -> &ValidationPolicy {
        &self.policy
    }

    /// Validate a JWT and return the claims.
    ///
    /// # Security Checks
    ///
    /// 1. Size check and three-segment base64url decode
    /// 2. Header `alg` in the allow-list; `kid` present
    /// 3. Resolve the key from the JWKS cache
    /// 4. Key algorithm matches, signature verifies
    /// 5. Claims decode
    /// 6. `exp` in the future, `aud` contains the audience, `iss` matches
    ///
    /// # Errors
    ///
    /// Returns the `TokenError` for the first failing check.
    #[instrument(skip_all)]
    pub async fn validate(&self, token: &str) -> Result<Claims, TokenError> {
        // 1. Split and decode segments (includes size check via common::jwt)
        let decoded = split_token(token).map_err(|e| {
            tracing::debug!(target: "casting.auth.jwt", error = ?e, "Token structure invalid");
            TokenError::from(e)
        })?;

        // 2. Algorithm allow-list, then kid
        let algorithm = Algorithm::from_str(&decoded.header.alg)
            .ok()
            .filter(|alg| self.policy.allows(*alg))
            .ok_or_else(|| {
                tracing::debug!(target: "casting.auth.jwt", alg = %decoded.header.alg, "Token algorithm not allowed");
                TokenError::InvalidAlgorithm
            })?;

        let kid = decoded.header.key_id().ok_or_else(|| {
            tracing::debug!(target: "casting.auth.jwt", "Token header missing kid");
            TokenError::InvalidStructure
        })?;

        // 3. Fetch public key from JWKS
        let key = self.jwks.get_key(kid).await?;

        // 4. Verify signature with the key's own algorithm
        if key.algorithm() != algorithm {
            tracing::warn!(
                target: "casting.auth.jwt",
                kid = %kid,
                header_alg = ?algorithm,
                key_alg = ?key.algorithm(),
                "Token algorithm does not match signing key"
            );
            return Err(TokenError::InvalidAlgorithm);
        }

        let verified = crypto::verify(
            decoded.signature,
            decoded.signing_input.as_bytes(),
            key.decoding_key(),
            algorithm,
        )
        .map_err(|e| {
            tracing::debug!(target: "casting.auth.jwt", error = %e, "Signature verification errored");
            TokenError::InvalidSignature
        })?;

        if !verified {
            tracing::debug!(target: "casting.auth.jwt", kid = %kid, "Token signature mismatch");
            return Err(TokenError::InvalidSignature);
        }

        // 5. Decode claims
        let raw: RawClaims = serde_json::from_slice(&decoded.claims).map_err(|e| {
            tracing::debug!(target: "casting.auth.jwt", error = %e, "Token claims malformed");
            TokenError::InvalidStructure
        })?;

        // 6. Temporal, audience and issuer checks
        let claims = check_claims(raw, &self.policy, Utc::now().timestamp()).inspect_err(|e| {
            tracing::debug!(target: "casting.auth.jwt", error = ?e, "Token claims rejected");
        })?;

        tracing::debug!(target: "casting.auth.jwt", "Token validated successfully");
        Ok(claims)
    }
}

/// Check `exp`, `aud` and `iss`, in that order, and build `Claims`.
fn check_claims(raw: RawClaims, policy: &ValidationPolicy, now: i64) -> Result<Claims, TokenError> {
    let exp = raw
        .exp
        .filter(|exp| *exp > now as f64)
        .ok_or(TokenError::Expired)?;

    let aud = match raw.aud {
        Some(Audience::One(aud)) => vec![aud],
        Some(Audience::Many(aud)) => aud,
        None => Vec::new(),
    };
    if !aud.iter().any(|a| *a == policy.audience) {
        return Err(TokenError::InvalidAudience);
    }

    let iss = raw
        .iss
        .filter(|iss| *iss == policy.issuer)
        .ok_or(TokenError::InvalidIssuer)?;

    Ok(Claims {
        iss,
        sub: raw.sub.unwrap_or_default(),
        aud,
        exp: exp as i64,
        iat: raw.iat.map(|iat| iat as i64),
        scope: raw.scope,
        permissions: raw
            .permissions
            .map(|permissions| permissions.into_iter().collect()),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
    use common::jwt::MAX_JWT_SIZE_BYTES;

    const NOW: i64 = 1_700_000_000;

    fn policy() -> ValidationPolicy {
        ValidationPolicy {
            audience: "casting".to_string(),
            issuer: "https://casting.example.com/".to_string(),
            algorithms: vec![Algorithm::RS256],
        }
    }

    fn raw(value: serde_json::Value) -> RawClaims {
        serde_json::from_value(value).unwrap()
    }

    fn valid_raw() -> serde_json::Value {
        serde_json::json!({
            "iss": "https://casting.example.com/",
            "sub": "auth0|user-1",
            "aud": ["casting", "https://casting.example.com/userinfo"],
            "exp": NOW + 3600,
            "iat": NOW,
            "permissions": ["get:movies"]
        })
    }

    /// Validator whose JWKS endpoint is never reachable; only failures that
    /// happen before key lookup can be exercised with it.
    fn offline_validator() -> JwtValidator {
        let jwks = Arc::new(JwksCache::new(
            "http://127.0.0.1:9/.well-known/jwks.json".to_string(),
        ));
        JwtValidator::new(jwks, policy())
    }

    fn token(header: &str, payload: &str) -> String {
        format!(
            "{}.{}.{}",
            URL_SAFE_NO_PAD.encode(header),
            URL_SAFE_NO_PAD.encode(payload),
            URL_SAFE_NO_PAD.encode("fake_signature")
        )
    }

    // =========================================================================
    // check_claims
    // =========================================================================

    #[test]
    fn test_check_claims_accepts_valid() {
        let claims = check_claims(raw(valid_raw()), &policy(), NOW).unwrap();

        assert_eq!(claims.iss, "https://casting.example.com/");
        assert_eq!(claims.sub, "auth0|user-1");
        assert_eq!(claims.exp, NOW + 3600);
        assert!(claims.has_permission("get:movies"));
    }

    #[test]
    fn test_check_claims_single_string_audience() {
        let mut value = valid_raw();
        value["aud"] = serde_json::json!("casting");

        let claims = check_claims(raw(value), &policy(), NOW).unwrap();
        assert_eq!(claims.aud, vec!["casting".to_string()]);
    }

    #[test]
    fn test_check_claims_expired() {
        let mut value = valid_raw();
        value["exp"] = serde_json::json!(NOW - 1);

        assert_eq!(
            check_claims(raw(value), &policy(), NOW).unwrap_err(),
            TokenError::Expired
        );
    }

    #[test]
    fn test_check_claims_exp_equal_to_now_is_expired() {
        let mut value = valid_raw();
        value["exp"] = serde_json::json!(NOW);

        assert_eq!(
            check_claims(raw(value), &policy(), NOW).unwrap_err(),
            TokenError::Expired
        );
    }

    #[test]
    fn test_check_claims_accepts_fractional_exp() {
        let mut value = valid_raw();
        value["exp"] = serde_json::json!(NOW as f64 + 0.5);
        value["iat"] = serde_json::json!(NOW as f64 - 0.25);

        let claims = check_claims(raw(value), &policy(), NOW).unwrap();

        assert_eq!(claims.exp, NOW);
        assert_eq!(claims.iat, Some(NOW - 1));
    }

    #[test]
    fn test_check_claims_fractional_exp_in_past_is_expired() {
        let mut value = valid_raw();
        value["exp"] = serde_json::json!(NOW as f64 - 0.5);

        assert_eq!(
            check_claims(raw(value), &policy(), NOW).unwrap_err(),
            TokenError::Expired
        );
    }

    #[test]
    fn test_check_claims_missing_exp_is_expired() {
        let mut value = valid_raw();
        value.as_object_mut().unwrap().remove("exp");

        assert_eq!(
            check_claims(raw(value), &policy(), NOW).unwrap_err(),
            TokenError::Expired
        );
    }

    #[test]
    fn test_check_claims_wrong_audience() {
        let mut value = valid_raw();
        value["aud"] = serde_json::json!(["other-api"]);

        assert_eq!(
            check_claims(raw(value), &policy(), NOW).unwrap_err(),
            TokenError::InvalidAudience
        );
    }

    #[test]
    fn test_check_claims_missing_audience() {
        let mut value = valid_raw();
        value.as_object_mut().unwrap().remove("aud");

        assert_eq!(
            check_claims(raw(value), &policy(), NOW).unwrap_err(),
            TokenError::InvalidAudience
        );
    }

    #[test]
    fn test_check_claims_wrong_issuer() {
        let mut value = valid_raw();
        value["iss"] = serde_json::json!("https://evil.example.com/");

        assert_eq!(
            check_claims(raw(value), &policy(), NOW).unwrap_err(),
            TokenError::InvalidIssuer
        );
    }

    #[test]
    fn test_check_claims_expiry_checked_before_audience() {
        let mut value = valid_raw();
        value["exp"] = serde_json::json!(NOW - 10);
        value["aud"] = serde_json::json!("other-api");
        value["iss"] = serde_json::json!("https://evil.example.com/");

        assert_eq!(
            check_claims(raw(value), &policy(), NOW).unwrap_err(),
            TokenError::Expired
        );
    }

    #[test]
    fn test_check_claims_absent_permissions_is_none() {
        let mut value = valid_raw();
        value.as_object_mut().unwrap().remove("permissions");

        let claims = check_claims(raw(value), &policy(), NOW).unwrap();
        assert!(claims.permissions.is_none());
        assert!(claims.permission_set().is_empty());
    }

    // =========================================================================
    // validate - failures before key lookup
    // =========================================================================

    #[tokio::test]
    async fn test_validate_rejects_malformed_token() {
        let validator = offline_validator();

        for bad in ["", "single", "only.two", "a.b.c.d", "!!!.payload.sig"] {
            assert_eq!(
                validator.validate(bad).await.unwrap_err(),
                TokenError::InvalidStructure,
                "expected {bad:?} to be rejected as malformed"
            );
        }
    }

    #[tokio::test]
    async fn test_validate_rejects_oversized_token() {
        let validator = offline_validator();
        let oversized = "a".repeat(MAX_JWT_SIZE_BYTES + 1);

        assert_eq!(
            validator.validate(&oversized).await.unwrap_err(),
            TokenError::InvalidStructure
        );
    }

    #[tokio::test]
    async fn test_validate_rejects_disallowed_algorithm() {
        let validator = offline_validator();

        for alg in ["HS256", "RS512", "none", "EdDSA", "rs256"] {
            let header = format!(r#"{{"alg":"{alg}","typ":"JWT","kid":"key-01"}}"#);
            let token = token(&header, r#"{"sub":"x"}"#);

            assert_eq!(
                validator.validate(&token).await.unwrap_err(),
                TokenError::InvalidAlgorithm,
                "expected alg {alg} to be rejected"
            );
        }
    }

    #[tokio::test]
    async fn test_validate_rejects_missing_kid() {
        let validator = offline_validator();
        let token = token(r#"{"alg":"RS256","typ":"JWT"}"#, r#"{"sub":"x"}"#);

        assert_eq!(
            validator.validate(&token).await.unwrap_err(),
            TokenError::InvalidStructure
        );
    }

    #[tokio::test]
    async fn test_validate_surfaces_unreachable_key_set() {
        let validator = offline_validator();
        let token = token(r#"{"alg":"RS256","typ":"JWT","kid":"key-01"}"#, "{}");

        assert_eq!(
            validator.validate(&token).await.unwrap_err(),
            TokenError::KeySetUnavailable
        );
    }

    // =========================================================================
    // Error mapping
    // =========================================================================

    #[test]
    fn test_key_set_error_mapping() {
        assert_eq!(
            TokenError::from(KeySetError::UnknownKeyId),
            TokenError::UnknownKeyId
        );
        assert_eq!(
            TokenError::from(KeySetError::FetchFailure("down".to_string())),
            TokenError::KeySetUnavailable
        );
    }

    #[test]
    fn test_untrusted_token_messages_are_generic() {
        let generic = [
            TokenError::InvalidStructure,
            TokenError::InvalidAlgorithm,
            TokenError::UnknownKeyId,
            TokenError::InvalidSignature,
            TokenError::InvalidAudience,
            TokenError::InvalidIssuer,
        ];
        for err in generic {
            assert_eq!(err.to_string(), "The access token is invalid");
        }
        assert_eq!(TokenError::Expired.to_string(), "Token expired");
    }

    #[test]
    fn test_policy_allows() {
        let policy = policy();
        assert!(policy.allows(Algorithm::RS256));
        assert!(!policy.allows(Algorithm::HS256));
    }
}
