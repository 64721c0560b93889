//! # Casting Test Utilities
//!
//! Shared test utilities for the Casting API.
//!
//! This crate provides:
//! - Deterministic crypto fixtures (fixed RSA keys, seeded Ed25519 keys)
//! - Token builders (TestTokenBuilder)
//! - A mock JWKS endpoint (MockJwks)
//! - Server test harness (TestCastingServer for E2E tests)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use casting_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> anyhow::Result<()> {
//!     let keypair = TestKeypair::primary();
//!     let jwks = MockJwks::start(&[&keypair]).await;
//!     let server = TestCastingServer::spawn(&jwks.url()).await?;
//!
//!     let token = TestTokenBuilder::new()
//!         .with_permissions(&["get:actors"])
//!         .sign(&keypair);
//!     // ...
//!     Ok(())
//! }
//! ```

pub mod crypto_fixtures;
pub mod jwks_mock;
pub mod server_harness;
pub mod token_builders;

// Re-export commonly used items
pub use crypto_fixtures::*;
pub use jwks_mock::*;
pub use server_harness::*;
pub use token_builders::*;
