//! Observability for the Casting API.
//!
//! Provides metrics definitions and the HTTP metrics middleware.

pub mod http_metrics;
pub mod metrics;
