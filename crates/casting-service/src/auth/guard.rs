//! Per-request authorization.
//!
//! `AuthGuard::authorize` is the single entry point handlers call: extract
//! the bearer token, validate it, then check the required permission. The
//! first failure short-circuits.

use crate::auth::bearer::extract_bearer_token;
use crate::auth::claims::Claims;
use crate::auth::jwt::JwtValidator;
use crate::auth::permissions;
use crate::errors::AuthError;
use crate::observability::metrics;
use axum::http::HeaderMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::instrument;

/// Authorization gate shared by all protected handlers.
pub struct AuthGuard {
    validator: Arc<JwtValidator>,

    /// Include the missing permission name in 403 messages.
    reveal_required_permission: bool,
}

impl AuthGuard {
    /// Create a guard around a validator.
    pub fn new(validator: Arc<JwtValidator>, reveal_required_permission: bool) -> Self {
        Self {
            validator,
            reveal_required_permission,
        }
    }

    /// Authorize a request for `required` (empty for "any valid token").
    ///
    /// # Errors
    ///
    /// Returns the first `AuthError` among header extraction, token
    /// validation and the permission check.
    #[instrument(skip_all, name = "casting.auth.guard", fields(required = %required))]
    pub async fn authorize(&self, headers: &HeaderMap, required: &str) -> Result<Claims, AuthError> {
        let start = Instant::now();
        let result = self.evaluate(headers, required).await;

        let outcome = match &result {
            Ok(_) => "allowed",
            Err(err) => err.code(),
        };
        metrics::record_authorization(outcome, start.elapsed());

        if let Err(err) = &result {
            tracing::debug!(target: "casting.auth.guard", outcome, error = %err, "Request not authorized");
        }

        result
    }

    async fn evaluate(&self, headers: &HeaderMap, required: &str) -> Result<Claims, AuthError> {
        let token = extract_bearer_token(headers)?;
        let claims = self.validator.validate(token).await?;

        permissions::check(&claims, required).map_err(|err| {
            if self.reveal_required_permission {
                err
            } else {
                err.redacted()
            }
        })?;

        Ok(claims)
    }
}
