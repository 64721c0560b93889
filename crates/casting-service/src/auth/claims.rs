//! JWT claims structure.
//!
//! Contains the claims extracted from validated JWTs. The `sub` field is
//! redacted in Debug output to prevent exposure in logs.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

static NO_PERMISSIONS: BTreeSet<String> = BTreeSet::new();

/// JWT Claims structure for validated tokens.
///
/// Only produced by `JwtValidator::validate` after the signature, expiry,
/// audience and issuer checks have passed.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Issuer (`https://{domain}/`).
    pub iss: String,

    /// Subject (user or client id) - redacted in Debug output.
    pub sub: String,

    /// Audiences the token was issued for.
    pub aud: Vec<String>,

    /// Expiration timestamp (Unix epoch seconds).
    pub exp: i64,

    /// Issued-at timestamp (Unix epoch seconds), if present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    /// Space-separated OAuth scopes, if present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    /// Capability strings from the `permissions` claim.
    ///
    /// `None` when the token carried no `permissions` claim at all, which is
    /// different from an empty list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<BTreeSet<String>>,
}

/// Custom Debug implementation that redacts the `sub` field.
impl fmt::Debug for Claims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Claims")
            .field("iss", &self.iss)
            .field("sub", &"[REDACTED]")
            .field("aud", &self.aud)
            .field("exp", &self.exp)
            .field("iat", &self.iat)
            .field("scope", &self.scope)
            .field("permissions", &self.permissions)
            .finish()
    }
}

impl Claims {
    /// Permissions as a set; empty when the claim was absent.
    pub fn permission_set(&self) -> &BTreeSet<String> {
        self.permissions.as_ref().unwrap_or(&NO_PERMISSIONS)
    }

    /// Whether the token carried a `permissions` claim.
    pub fn has_permissions_claim(&self) -> bool {
        self.permissions.is_some()
    }

    /// Check if the token grants a specific permission.
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permission_set().contains(permission)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn claims(permissions: Option<&[&str]>) -> Claims {
        Claims {
            iss: "https://casting.example.com/".to_string(),
            sub: "auth0|secret-user-id".to_string(),
            aud: vec!["casting".to_string()],
            exp: 1_234_567_890,
            iat: Some(1_234_567_800),
            scope: None,
            permissions: permissions
                .map(|list| list.iter().map(|p| (*p).to_string()).collect()),
        }
    }

    #[test]
    fn test_claims_debug_redacts_sub() {
        let debug_str = format!("{:?}", claims(None));

        assert!(
            !debug_str.contains("secret-user-id"),
            "Debug output should not contain actual sub value"
        );
        assert!(
            debug_str.contains("[REDACTED]"),
            "Debug output should contain [REDACTED]"
        );
    }

    #[test]
    fn test_has_permission() {
        let claims = claims(Some(&["get:movies", "post:movie"]));

        assert!(claims.has_permission("get:movies"));
        assert!(claims.has_permission("post:movie"));
        assert!(!claims.has_permission("delete:movie"));
        assert!(!claims.has_permission("get:movie")); // Partial match should not work
    }

    #[test]
    fn test_absent_permissions_is_empty_set() {
        let claims = claims(None);

        assert!(!claims.has_permissions_claim());
        assert!(claims.permission_set().is_empty());
        assert!(!claims.has_permission("get:movies"));
    }

    #[test]
    fn test_empty_permissions_claim_is_present() {
        let claims = claims(Some(&[]));

        assert!(claims.has_permissions_claim());
        assert!(claims.permission_set().is_empty());
    }

    #[test]
    fn test_claims_without_permissions_omits_field() {
        let json = serde_json::to_string(&claims(None)).unwrap();
        assert!(
            !json.contains("permissions"),
            "permissions should be omitted when None"
        );
    }

    #[test]
    fn test_claims_serialization() {
        let original = claims(Some(&["get:actors"]));
        let json = serde_json::to_string(&original).unwrap();
        let deserialized: Claims = serde_json::from_str(&json).unwrap();

        assert_eq!(deserialized, original);
    }
}
