//! Request authorization.
//!
//! Bearer tokens issued by the identity provider are validated against its
//! published JWKS, then checked for the permission each endpoint requires.
//!
//! # Components
//!
//! - `bearer` - `Authorization` header parsing
//! - `jwks` - Key set cache with single-flight refresh
//! - `jwt` - Token signature and claim validation
//! - `claims` - Validated token claims
//! - `permissions` - Permission constants and checks
//! - `guard` - `AuthGuard::authorize`, the entry point for handlers

pub mod bearer;
pub mod claims;
pub mod guard;
pub mod jwks;
pub mod jwt;
pub mod permissions;

pub use claims::Claims;
pub use guard::AuthGuard;
pub use jwks::{JwksCache, JwksCacheOptions};
pub use jwt::{JwtValidator, ValidationPolicy};
