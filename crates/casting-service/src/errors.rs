//! Casting API error types.
//!
//! All errors map to HTTP status codes via `IntoResponse` and render the same
//! JSON body:
//!
//! ```json
//! {"success": false, "error": 401, "code": "invalid_token", "message": "..."}
//! ```
//!
//! Messages returned to clients are stable per failure kind. Details such as
//! the reason a JWKS fetch failed are logged server-side only.

use crate::auth::bearer::HeaderError;
use crate::auth::jwt::TokenError;
use crate::auth::permissions::PermissionError;
use crate::repositories::CatalogError;
use axum::{
    extract::rejection::JsonRejection,
    http::{header::WWW_AUTHENTICATE, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// `WWW-Authenticate` value sent with every 401.
const WWW_AUTHENTICATE_VALUE: &str = "Bearer realm=\"casting-api\", error=\"invalid_token\"";

/// Authorization failure produced by the auth guard.
///
/// Maps to HTTP status codes:
/// - Header, Token: 401 Unauthorized
/// - Token(KeySetUnavailable): 500 Internal Server Error
/// - Permission(MissingPermissionsClaim): 400 Bad Request
/// - Permission(PermissionDenied): 403 Forbidden
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error(transparent)]
    Header(#[from] HeaderError),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Permission(#[from] PermissionError),
}

impl AuthError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::Header(_) => StatusCode::UNAUTHORIZED,
            AuthError::Token(TokenError::KeySetUnavailable) => StatusCode::INTERNAL_SERVER_ERROR,
            AuthError::Token(_) => StatusCode::UNAUTHORIZED,
            AuthError::Permission(PermissionError::MissingPermissionsClaim) => {
                StatusCode::BAD_REQUEST
            }
            AuthError::Permission(PermissionError::PermissionDenied { .. }) => {
                StatusCode::FORBIDDEN
            }
        }
    }

    /// Stable machine-readable code, also used as the metrics `outcome` label.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::Header(HeaderError::Missing) => "authorization_header_missing",
            AuthError::Header(HeaderError::Malformed) => "invalid_header",
            AuthError::Token(TokenError::Expired) => "token_expired",
            AuthError::Token(TokenError::KeySetUnavailable) => "key_set_unavailable",
            AuthError::Token(_) => "invalid_token",
            AuthError::Permission(PermissionError::MissingPermissionsClaim) => "invalid_claims",
            AuthError::Permission(PermissionError::PermissionDenied { .. }) => {
                "permission_denied"
            }
        }
    }

    /// Client-facing description.
    pub fn description(&self) -> String {
        self.to_string()
    }
}

/// Error returned by catalog handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),
}

impl ApiError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Auth(err) => err.status_code(),
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }
}

/// Unreadable or non-JSON request bodies are reported like missing fields.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(target: "casting.api", error = %rejection, "Request body rejected");
        ApiError::BadRequest("Missing required fields".to_string())
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        ApiError::NotFound(err.to_string())
    }
}

#[derive(Serialize)]
struct ErrorResponse<'a> {
    success: bool,
    error: u16,
    code: &'a str,
    message: String,
}

fn error_response(status: StatusCode, code: &str, message: String) -> Response {
    let body = ErrorResponse {
        success: false,
        error: status.as_u16(),
        code,
        message,
    };

    let mut response = (status, Json(body)).into_response();

    if status == StatusCode::UNAUTHORIZED {
        response.headers_mut().insert(
            WWW_AUTHENTICATE,
            HeaderValue::from_static(WWW_AUTHENTICATE_VALUE),
        );
    }

    response
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::warn!(target: "casting.api", code = self.code(), "Authorization unavailable");
        }

        error_response(status, self.code(), self.description())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Auth(err) => err.into_response(),
            ApiError::BadRequest(message) => {
                error_response(StatusCode::BAD_REQUEST, "bad_request", message)
            }
            ApiError::NotFound(message) => {
                error_response(StatusCode::NOT_FOUND, "not_found", message)
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http_body_util::BodyExt;

    // Helper function to read the response body as JSON
    async fn read_body_json(body: Body) -> serde_json::Value {
        let bytes = body.collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AuthError::from(HeaderError::Missing).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthError::from(HeaderError::Malformed).status_code(),
            StatusCode::UNAUTHORIZED
        );
        for err in [
            TokenError::InvalidStructure,
            TokenError::InvalidAlgorithm,
            TokenError::UnknownKeyId,
            TokenError::InvalidSignature,
            TokenError::Expired,
            TokenError::InvalidAudience,
            TokenError::InvalidIssuer,
        ] {
            assert_eq!(AuthError::from(err).status_code(), StatusCode::UNAUTHORIZED);
        }
        assert_eq!(
            AuthError::from(TokenError::KeySetUnavailable).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AuthError::from(PermissionError::MissingPermissionsClaim).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AuthError::from(PermissionError::PermissionDenied { permission: None }).status_code(),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn test_codes() {
        assert_eq!(
            AuthError::from(HeaderError::Missing).code(),
            "authorization_header_missing"
        );
        assert_eq!(AuthError::from(HeaderError::Malformed).code(), "invalid_header");
        assert_eq!(AuthError::from(TokenError::Expired).code(), "token_expired");
        assert_eq!(AuthError::from(TokenError::UnknownKeyId).code(), "invalid_token");
        assert_eq!(
            AuthError::from(TokenError::KeySetUnavailable).code(),
            "key_set_unavailable"
        );
        assert_eq!(
            AuthError::from(PermissionError::MissingPermissionsClaim).code(),
            "invalid_claims"
        );
    }

    #[tokio::test]
    async fn test_into_response_invalid_token() {
        let response = AuthError::from(TokenError::InvalidSignature).into_response();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let www_auth = response.headers().get("WWW-Authenticate");
        assert!(www_auth.is_some());
        let www_auth_str = www_auth.unwrap().to_str().unwrap();
        assert!(www_auth_str.contains("Bearer realm=\"casting-api\""));

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["success"], false);
        assert_eq!(body_json["error"], 401);
        assert_eq!(body_json["code"], "invalid_token");
        assert_eq!(body_json["message"], "The access token is invalid");
    }

    #[tokio::test]
    async fn test_into_response_expired() {
        let response = AuthError::from(TokenError::Expired).into_response();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["code"], "token_expired");
        assert_eq!(body_json["message"], "Token expired");
    }

    #[tokio::test]
    async fn test_into_response_missing_header() {
        let response = AuthError::from(HeaderError::Missing).into_response();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["message"], "Authorization header is expected");
    }

    #[tokio::test]
    async fn test_into_response_permission_denied() {
        let response = AuthError::from(PermissionError::PermissionDenied { permission: None })
            .into_response();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(response.headers().get("WWW-Authenticate").is_none());

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["error"], 403);
        assert_eq!(body_json["code"], "permission_denied");
        assert_eq!(body_json["message"], "Permission not found");
    }

    #[tokio::test]
    async fn test_into_response_missing_permissions_claim() {
        let response = AuthError::from(PermissionError::MissingPermissionsClaim).into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["error"], 400);
        assert_eq!(body_json["message"], "Permissions not included in token");
    }

    #[tokio::test]
    async fn test_into_response_key_set_unavailable() {
        let response = AuthError::from(TokenError::KeySetUnavailable).into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.headers().get("WWW-Authenticate").is_none());

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["error"], 500);
        assert_eq!(
            body_json["message"],
            "Unable to verify credentials at this time"
        );
    }

    #[tokio::test]
    async fn test_api_error_not_found() {
        let response = ApiError::NotFound("Movie not found".to_string()).into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["success"], false);
        assert_eq!(body_json["error"], 404);
        assert_eq!(body_json["message"], "Movie not found");
    }

    #[tokio::test]
    async fn test_api_error_bad_request() {
        let error = ApiError::BadRequest("Missing required fields".to_string());
        assert_eq!(error.status_code(), StatusCode::BAD_REQUEST);

        let response = error.into_response();
        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["code"], "bad_request");
        assert_eq!(body_json["message"], "Missing required fields");
    }

    #[test]
    fn test_catalog_error_is_not_found() {
        let error = ApiError::from(CatalogError::ActorNotFound);
        assert_eq!(error.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(error.to_string(), "Actor not found");
    }

    #[tokio::test]
    async fn test_api_error_wraps_auth() {
        let error = ApiError::from(AuthError::from(HeaderError::Missing));
        assert_eq!(error.status_code(), StatusCode::UNAUTHORIZED);

        let response = error.into_response();
        assert!(response.headers().get("WWW-Authenticate").is_some());
    }
}
