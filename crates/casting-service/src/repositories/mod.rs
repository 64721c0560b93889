//! Repository layer for the Casting API.
//!
//! Handlers call the catalog only after the auth guard has admitted the
//! request.

pub mod catalog;

pub use catalog::{ActorPatch, Catalog, CatalogError, MoviePatch, NewActor};
