//! Current caller handler.
//!
//! Returns information about the authenticated caller from JWT claims.

use crate::auth::permissions;
use crate::errors::ApiError;
use crate::routes::AppState;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;

/// Response for `/v1/me` endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct MeResponse {
    pub success: bool,

    /// Subject (user or client ID).
    pub sub: String,

    /// Granted permissions, sorted.
    pub permissions: Vec<String>,

    /// Token expiration timestamp.
    pub exp: i64,
}

/// Handler for GET /v1/me
///
/// Accepts any valid token; no permission is required.
///
/// ## Response
///
/// ```json
/// {
///   "success": true,
///   "sub": "auth0|abc123",
///   "permissions": ["get:actors", "get:movies"],
///   "exp": 1234567890
/// }
/// ```
#[instrument(skip_all, name = "casting.handlers.me")]
pub async fn get_me(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<MeResponse>, ApiError> {
    let claims = state.guard.authorize(&headers, permissions::NONE).await?;

    tracing::debug!(target: "casting.handlers.me", "Returning caller claims");

    let permissions = claims.permission_set().iter().cloned().collect();

    Ok(Json(MeResponse {
        success: true,
        sub: claims.sub,
        permissions,
        exp: claims.exp,
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_me_response_serialization() {
        let response = MeResponse {
            success: true,
            sub: "auth0|user123".to_string(),
            permissions: vec!["get:actors".to_string(), "get:movies".to_string()],
            exp: 1234567890,
        };

        let json = serde_json::to_string(&response).unwrap();

        assert!(json.contains("\"success\":true"));
        assert!(json.contains("\"sub\":\"auth0|user123\""));
        assert!(json.contains("\"permissions\":[\"get:actors\",\"get:movies\"]"));
        assert!(json.contains("\"exp\":1234567890"));
    }
}
