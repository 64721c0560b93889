//! Background tasks for the Casting API.
//!
//! # Tasks
//!
//! - `jwks_refresher` - Keeps the JWKS cache warm ahead of expiry

pub mod jwks_refresher;

pub use jwks_refresher::start_jwks_refresher;
