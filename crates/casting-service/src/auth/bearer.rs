//! Bearer credential extraction.
//!
//! Pulls the raw token out of the `Authorization` header. Nothing is decoded
//! here, so a header problem is always reported separately from a token
//! problem.

use axum::http::{header::AUTHORIZATION, HeaderMap, HeaderValue};
use thiserror::Error;

/// The only accepted authorization scheme (case-sensitive).
pub const BEARER_SCHEME: &str = "Bearer";

/// Failures while reading the `Authorization` header.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HeaderError {
    /// No `Authorization` header on the request.
    #[error("Authorization header is expected")]
    Missing,

    /// Header present but not `Bearer <token>`.
    #[error("Authorization header must be bearer token")]
    Malformed,
}

/// Extract the bearer token from request headers.
///
/// # Errors
///
/// - `HeaderError::Missing` - no `Authorization` header
/// - `HeaderError::Malformed` - repeated header, non-ASCII value, or a value
///   that is not exactly `Bearer <token>`
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, HeaderError> {
    let mut values = headers.get_all(AUTHORIZATION).iter();

    let value = values.next().ok_or_else(|| {
        tracing::debug!(target: "casting.auth.bearer", "Missing Authorization header");
        HeaderError::Missing
    })?;

    if values.next().is_some() {
        tracing::debug!(target: "casting.auth.bearer", "Multiple Authorization headers");
        return Err(HeaderError::Malformed);
    }

    parse_authorization(value)
}

/// Parse a single `Authorization` header value.
///
/// The value must split on single spaces into exactly two parts: the literal
/// `Bearer` and a non-empty token.
pub fn parse_authorization(value: &HeaderValue) -> Result<&str, HeaderError> {
    let value = value.to_str().map_err(|_| {
        tracing::debug!(target: "casting.auth.bearer", "Authorization header is not visible ASCII");
        HeaderError::Malformed
    })?;

    let mut parts = value.split(' ');
    let (Some(scheme), Some(token), None) = (parts.next(), parts.next(), parts.next()) else {
        tracing::debug!(target: "casting.auth.bearer", "Authorization header must have two parts");
        return Err(HeaderError::Malformed);
    };

    if scheme != BEARER_SCHEME || token.is_empty() {
        tracing::debug!(target: "casting.auth.bearer", "Invalid Authorization header format");
        return Err(HeaderError::Malformed);
    }

    Ok(token)
}
