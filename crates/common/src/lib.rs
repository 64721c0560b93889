//! Common utilities shared across Casting API components.

#![warn(clippy::pedantic)]

/// Module for JWT utilities (size limits, segment decoding, header parsing)
pub mod jwt;
