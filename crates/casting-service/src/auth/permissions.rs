//! Permission checks against validated claims.
//!
//! Each catalog endpoint requires exactly one permission string from the
//! token's `permissions` claim.

use crate::auth::claims::Claims;
use thiserror::Error;

/// List movies.
pub const GET_MOVIES: &str = "get:movies";
/// Create a movie.
pub const POST_MOVIE: &str = "post:movie";
/// Update a movie.
pub const PATCH_MOVIE: &str = "patch:movie";
/// Delete a movie.
pub const DELETE_MOVIE: &str = "delete:movie";
/// List actors.
pub const GET_ACTORS: &str = "get:actors";
/// Create an actor.
pub const POST_ACTOR: &str = "post:actor";
/// Update an actor.
pub const PATCH_ACTOR: &str = "patch:actor";
/// Delete an actor.
pub const DELETE_ACTOR: &str = "delete:actor";

/// No permission required; any validated token is accepted.
pub const NONE: &str = "";

/// Permission check failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PermissionError {
    /// The token has no `permissions` claim at all.
    ///
    /// Points at issuer configuration (RBAC not enabled for the API) rather
    /// than at the caller.
    #[error("Permissions not included in token")]
    MissingPermissionsClaim,

    /// The claim is present but lacks the required permission.
    ///
    /// `permission` is `None` once redacted for the client.
    #[error("Permission not found{}", permission_suffix(.permission))]
    PermissionDenied { permission: Option<String> },
}

fn permission_suffix(permission: &Option<String>) -> String {
    permission
        .as_deref()
        .map(|p| format!(": {p}"))
        .unwrap_or_default()
}

impl PermissionError {
    /// Drop the permission name from a denial.
    pub fn redacted(self) -> Self {
        match self {
            PermissionError::PermissionDenied { .. } => {
                PermissionError::PermissionDenied { permission: None }
            }
            other => other,
        }
    }
}

/// Check that `claims` grant `required`.
///
/// An empty `required` always succeeds, even without a `permissions` claim.
///
/// # Errors
///
/// - `PermissionError::MissingPermissionsClaim` - no `permissions` claim
/// - `PermissionError::PermissionDenied` - claim present, `required` absent
pub fn check(claims: &Claims, required: &str) -> Result<(), PermissionError> {
    if required.is_empty() {
        return Ok(());
    }

    if !claims.has_permissions_claim() {
        tracing::debug!(target: "casting.auth.permissions", "Token has no permissions claim");
        return Err(PermissionError::MissingPermissionsClaim);
    }

    if !claims.has_permission(required) {
        tracing::debug!(
            target: "casting.auth.permissions",
            required = %required,
            "Required permission not granted"
        );
        return Err(PermissionError::PermissionDenied {
            permission: Some(required.to_string()),
        });
    }

    Ok(())
}
