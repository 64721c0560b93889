//! Casting API Service Library
//!
//! Movie and actor catalog API whose requests are authorized with bearer
//! tokens issued by an external identity provider:
//!
//! - Bearer token extraction from the `Authorization` header
//! - Signature verification against the provider's JWKS (cached, single-flight refresh)
//! - Expiry, audience and issuer checks
//! - Per-endpoint permission checks
//!
//! # Architecture
//!
//! Handlers call the auth guard first, then the catalog:
//!
//! ```text
//! routes/mod.rs -> handlers/*.rs -> auth::guard -> repositories/catalog.rs
//! ```
//!
//! # Modules
//!
//! - `auth` - Token parsing, JWKS cache, validation, permissions, guard
//! - `config` - Service configuration from environment
//! - `errors` - Error types with HTTP status code mapping
//! - `handlers` - HTTP request handlers
//! - `models` - Data models
//! - `observability` - Metrics and HTTP metrics middleware
//! - `repositories` - In-memory catalog
//! - `routes` - Axum router setup
//! - `tasks` - Background JWKS refresher

pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod observability;
pub mod repositories;
pub mod routes;
pub mod tasks;
