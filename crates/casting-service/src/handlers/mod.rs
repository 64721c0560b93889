//! HTTP request handlers for the Casting API.

pub mod actors;
pub mod health;
pub mod me;
pub mod metrics;
pub mod movies;

pub use actors::{create_actor, delete_actor, list_actors, update_actor};
pub use health::health_check;
pub use me::get_me;
pub use metrics::metrics_handler;
pub use movies::{create_movie, delete_movie, list_movies, update_movie};
