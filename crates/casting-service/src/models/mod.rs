//! Casting API models.
//!
//! Catalog records, request bodies and response envelopes. Every success
//! response carries `"success": true`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Format accepted for `release_date`.
pub const RELEASE_DATE_FORMAT: &str = "%Y-%m-%d";

// ============================================================================
// Records
// ============================================================================

/// A movie in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Movie {
    pub id: i64,
    pub title: String,
    /// Serialized as `YYYY-MM-DD`.
    pub release_date: NaiveDate,
}

/// An actor, optionally cast in one movie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Actor {
    pub id: i64,
    pub name: String,
    pub age: u32,
    pub gender: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub movie_id: Option<i64>,
}

/// Movie listing entry with its cast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MovieWithActors {
    #[serde(flatten)]
    pub movie: Movie,
    pub actors: Vec<Actor>,
}

// ============================================================================
// Request bodies
// ============================================================================

/// Body of `POST /movies`. Both fields are required.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateMovieRequest {
    pub title: Option<String>,
    pub release_date: Option<String>,
}

/// Body of `PATCH /movies/:id`. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateMovieRequest {
    pub title: Option<String>,
    pub release_date: Option<String>,
}

/// Body of `POST /actors`. `name`, `age` and `gender` are required.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateActorRequest {
    pub name: Option<String>,
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub movie_id: Option<i64>,
}

/// Body of `PATCH /actors/:id`. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateActorRequest {
    pub name: Option<String>,
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub movie_id: Option<i64>,
}

// ============================================================================
// Responses
// ============================================================================

#[derive(Debug, Serialize)]
pub struct MoviesResponse {
    pub success: bool,
    pub movies: Vec<MovieWithActors>,
}

#[derive(Debug, Serialize)]
pub struct MovieResponse {
    pub success: bool,
    pub message: &'static str,
    pub movie: Movie,
}

#[derive(Debug, Serialize)]
pub struct ActorsResponse {
    pub success: bool,
    pub actors: Vec<Actor>,
}

#[derive(Debug, Serialize)]
pub struct ActorResponse {
    pub success: bool,
    pub message: &'static str,
    pub actor: Actor,
}

/// Response for deletes.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: &'static str,
}

/// Health check response.
///
/// Returned by the `/v1/health` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always "healthy" while the process serves requests.
    pub status: String,

    /// Keys currently held by the JWKS cache (0 before the first fetch).
    pub jwks_keys_cached: usize,
}

/// Parse a `YYYY-MM-DD` release date.
pub fn parse_release_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, RELEASE_DATE_FORMAT).ok()
}
