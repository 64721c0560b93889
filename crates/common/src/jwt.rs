//! JWT utilities shared across Casting API services.
//!
//! This module provides the untrusted, pre-verification half of token
//! handling:
//! - Size limits for DoS prevention
//! - Splitting a compact JWT into its three segments
//! - Decoding the header (`alg`, `kid`, `typ`) without verifying anything
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - Nothing returned from this module is trusted; the signature MUST still be
//!   verified against a key from the identity provider's key set
//! - Generic error messages prevent information leakage
//!
//! # Usage
//!
//! ```rust,ignore
//! use common::jwt::split_token;
//!
//! let decoded = split_token(token)?;
//! let kid = decoded.header.key_id().ok_or(MyError::Malformed)?;
//! // look up key, then verify `decoded.signature` over `decoded.signing_input`
//! ```

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::Deserialize;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum allowed JWT size in bytes (8KB).
///
/// JWTs larger than this size are rejected BEFORE any base64 decoding or
/// cryptographic operations.
///
/// - Typical identity provider access tokens are 700-1500 bytes (RS256 sig)
/// - A large `permissions` array still fits comfortably in 8KB
pub const MAX_JWT_SIZE_BYTES: usize = 8192; // 8KB

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while splitting and decoding a JWT.
///
/// Note: Error messages are intentionally generic to prevent information leakage.
/// Detailed information is logged at debug level for troubleshooting.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtValidationError {
    /// Token size exceeds maximum allowed.
    #[error("The access token is invalid")]
    TokenTooLarge,

    /// Token format is invalid (segment count, base64, or header JSON).
    #[error("The access token is invalid")]
    MalformedToken,
}

// =============================================================================
// Header / Segments
// =============================================================================

/// Decoded (but unverified) JOSE header.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct JwtHeader {
    /// Declared signing algorithm, e.g. `RS256`.
    pub alg: String,

    /// Key ID used to select the verification key.
    #[serde(default)]
    pub kid: Option<String>,

    /// Token type, usually `JWT`.
    #[serde(default)]
    pub typ: Option<String>,
}

impl JwtHeader {
    /// The key ID, rejecting empty values.
    #[must_use]
    pub fn key_id(&self) -> Option<&str> {
        self.kid.as_deref().filter(|kid| !kid.is_empty())
    }
}

/// A compact JWT split into its parts.
///
/// `claims` holds the decoded payload bytes; they are not parsed here so
/// callers can verify the signature before trusting any claim.
#[derive(Debug, Clone)]
pub struct DecodedToken<'a> {
    /// Decoded JOSE header.
    pub header: JwtHeader,

    /// Decoded payload bytes (JSON, not yet parsed).
    pub claims: Vec<u8>,

    /// `header.payload` exactly as received; the signed message.
    pub signing_input: &'a str,

    /// Signature segment, still base64url encoded.
    pub signature: &'a str,
}

/// Split a compact JWT into header, claims and signature without verifying it.
///
/// # Security
///
/// - Token size is checked BEFORE any parsing
/// - All three segments must be non-empty, valid base64url (no padding)
/// - The header must be a JSON object with a string `alg`
///
/// # Errors
///
/// - `TokenTooLarge` - Token exceeds `MAX_JWT_SIZE_BYTES`
/// - `MalformedToken` - Wrong segment count, bad base64, or invalid header JSON
pub fn split_token(token: &str) -> Result<DecodedToken<'_>, JwtValidationError> {
    // Check token size first (DoS prevention)
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "common.jwt",
            token_size = token.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(JwtValidationError::TokenTooLarge);
    }

    // JWT format: header.payload.signature
    let segment_count = token.split('.').count();
    if segment_count != 3 {
        tracing::debug!(
            target: "common.jwt",
            parts = segment_count,
            "Token rejected: invalid JWT format"
        );
        return Err(JwtValidationError::MalformedToken);
    }

    let (signing_input, signature) = token
        .rsplit_once('.')
        .ok_or(JwtValidationError::MalformedToken)?;
    let (header_part, claims_part) = signing_input
        .split_once('.')
        .ok_or(JwtValidationError::MalformedToken)?;

    let header_bytes = decode_segment(header_part, "header")?;
    let claims = decode_segment(claims_part, "claims")?;
    // Signature bytes are only checked for decodability here
    decode_segment(signature, "signature")?;

    let header: JwtHeader = serde_json::from_slice(&header_bytes).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to parse JWT header JSON");
        JwtValidationError::MalformedToken
    })?;

    Ok(DecodedToken {
        header,
        claims,
        signing_input,
        signature,
    })
}

fn decode_segment(segment: &str, name: &'static str) -> Result<Vec<u8>, JwtValidationError> {
    if segment.is_empty() {
        tracing::debug!(target: "common.jwt", segment = name, "Empty JWT segment");
        return Err(JwtValidationError::MalformedToken);
    }

    URL_SAFE_NO_PAD.decode(segment).map_err(|e| {
        tracing::debug!(target: "common.jwt", segment = name, error = %e, "Failed to decode JWT segment base64");
        JwtValidationError::MalformedToken
    })
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn encode(s: &str) -> String {
        URL_SAFE_NO_PAD.encode(s)
    }

    fn token_with_header(header: &str) -> String {
        format!("{}.{}.{}", encode(header), encode("{}"), encode("sig"))
    }

    #[test]
    fn test_max_jwt_size_is_8kb() {
        assert_eq!(MAX_JWT_SIZE_BYTES, 8192);
    }

    #[test]
    fn test_split_token_valid() {
        let header = r#"{"alg":"RS256","typ":"JWT","kid":"key-01"}"#;
        let payload = r#"{"sub":"auth0|123"}"#;
        let token = format!("{}.{}.{}", encode(header), encode(payload), encode("sig"));

        let decoded = split_token(&token).unwrap();

        assert_eq!(decoded.header.alg, "RS256");
        assert_eq!(decoded.header.key_id(), Some("key-01"));
        assert_eq!(decoded.header.typ.as_deref(), Some("JWT"));
        assert_eq!(decoded.claims, payload.as_bytes());
        assert_eq!(
            decoded.signing_input,
            format!("{}.{}", encode(header), encode(payload))
        );
        assert_eq!(decoded.signature, encode("sig"));
    }

    #[test]
    fn test_split_token_wrong_segment_count() {
        assert_eq!(
            split_token("only.two").unwrap_err(),
            JwtValidationError::MalformedToken
        );
        assert_eq!(
            split_token("a.b.c.d").unwrap_err(),
            JwtValidationError::MalformedToken
        );
        assert_eq!(
            split_token("single").unwrap_err(),
            JwtValidationError::MalformedToken
        );
        assert_eq!(split_token("").unwrap_err(), JwtValidationError::MalformedToken);
    }

    #[test]
    fn test_split_token_empty_segments() {
        let header = encode(r#"{"alg":"RS256","kid":"k"}"#);
        assert!(split_token(&format!(".{}.{}", encode("{}"), encode("s"))).is_err());
        assert!(split_token(&format!("{}..{}", header, encode("s"))).is_err());
        assert!(split_token(&format!("{}.{}.", header, encode("{}"))).is_err());
    }

    #[test]
    fn test_split_token_invalid_base64() {
        let result = split_token("!!!invalid!!!.payload.signature");
        assert_eq!(result.unwrap_err(), JwtValidationError::MalformedToken);

        let header = encode(r#"{"alg":"RS256","kid":"k"}"#);
        let token = format!("{header}.e30.***");
        let result = split_token(&token);
        assert_eq!(result.unwrap_err(), JwtValidationError::MalformedToken);
    }

    #[test]
    fn test_split_token_padded_base64_rejected() {
        let header = encode(r#"{"alg":"RS256","kid":"k"}"#);
        let token = format!("{header}.e30=.c2ln");
        let result = split_token(&token);
        assert_eq!(result.unwrap_err(), JwtValidationError::MalformedToken);
    }

    #[test]
    fn test_split_token_invalid_header_json() {
        let token = token_with_header("not-json");
        let result = split_token(&token);
        assert_eq!(result.unwrap_err(), JwtValidationError::MalformedToken);
    }

    #[test]
    fn test_split_token_header_without_alg() {
        let token = token_with_header(r#"{"typ":"JWT","kid":"k"}"#);
        let result = split_token(&token);
        assert_eq!(result.unwrap_err(), JwtValidationError::MalformedToken);
    }

    #[test]
    fn test_split_token_non_string_kid() {
        let token = token_with_header(r#"{"alg":"RS256","kid":12345}"#);
        let result = split_token(&token);
        assert_eq!(result.unwrap_err(), JwtValidationError::MalformedToken);
    }

    #[test]
    fn test_key_id_missing_or_empty() {
        let token = token_with_header(r#"{"alg":"RS256"}"#);
        let decoded = split_token(&token).unwrap();
        assert_eq!(decoded.header.key_id(), None);

        let token = token_with_header(r#"{"alg":"RS256","kid":""}"#);
        let decoded = split_token(&token).unwrap();
        assert_eq!(decoded.header.key_id(), None);

        let token = token_with_header(r#"{"alg":"RS256","kid":null}"#);
        let decoded = split_token(&token).unwrap();
        assert_eq!(decoded.header.key_id(), None);
    }

    #[test]
    fn test_split_token_oversized() {
        let oversized = "a".repeat(MAX_JWT_SIZE_BYTES + 1);
        assert_eq!(
            split_token(&oversized).unwrap_err(),
            JwtValidationError::TokenTooLarge
        );
    }

    #[test]
    fn test_split_token_at_size_limit() {
        let header_b64 = encode(r#"{"alg":"RS256","kid":"key"}"#);
        let mut payload_b64 = encode("{}");
        let mut sig_len = MAX_JWT_SIZE_BYTES - header_b64.len() - payload_b64.len() - 2;
        // A base64 run of length 4n+1 is never decodable; shift one byte into the payload
        if sig_len % 4 == 1 {
            payload_b64 = encode("{} ");
            sig_len -= 1;
        }
        let token = format!("{}.{}.{}", header_b64, payload_b64, "A".repeat(sig_len));

        assert_eq!(token.len(), MAX_JWT_SIZE_BYTES);
        let decoded = split_token(&token).expect("Token at size limit should be accepted");
        assert_eq!(decoded.header.key_id(), Some("key"));
    }
}
