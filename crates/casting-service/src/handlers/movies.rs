//! Movie handlers.
//!
//! Every handler authorizes before touching the path, the body or the
//! catalog, so an unauthorized caller learns nothing about what exists.

use crate::auth::permissions;
use crate::errors::ApiError;
use crate::models::{
    parse_release_date, CreateMovieRequest, MessageResponse, MovieResponse, MoviesResponse,
    UpdateMovieRequest,
};
use crate::repositories::{CatalogError, MoviePatch};
use crate::routes::AppState;
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::{HeaderMap, StatusCode},
    Json,
};
use std::sync::Arc;
use tracing::instrument;

pub(crate) const MISSING_FIELDS: &str = "Missing required fields";
const INVALID_RELEASE_DATE: &str = "release_date must be formatted YYYY-MM-DD";

fn movie_id(path: Result<Path<i64>, PathRejection>) -> Result<i64, ApiError> {
    path.map(|Path(id)| id)
        .map_err(|_| CatalogError::MovieNotFound.into())
}

/// Handler for GET /movies
#[instrument(skip_all, name = "casting.handlers.list_movies")]
pub async fn list_movies(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<MoviesResponse>, ApiError> {
    state
        .guard
        .authorize(&headers, permissions::GET_MOVIES)
        .await?;

    Ok(Json(MoviesResponse {
        success: true,
        movies: state.catalog.list_movies().await,
    }))
}

/// Handler for POST /movies
///
/// Returns 201 with the created movie; 400 when `title` or `release_date` is
/// missing or the date is not `YYYY-MM-DD`.
#[instrument(skip_all, name = "casting.handlers.create_movie")]
pub async fn create_movie(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Json<CreateMovieRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<MovieResponse>), ApiError> {
    state
        .guard
        .authorize(&headers, permissions::POST_MOVIE)
        .await?;

    let Json(body) = body?;
    let (Some(title), Some(raw_date)) = (body.title, body.release_date) else {
        return Err(ApiError::BadRequest(MISSING_FIELDS.to_string()));
    };
    let release_date = parse_release_date(&raw_date)
        .ok_or_else(|| ApiError::BadRequest(INVALID_RELEASE_DATE.to_string()))?;

    let movie = state.catalog.create_movie(title, release_date).await;

    Ok((
        StatusCode::CREATED,
        Json(MovieResponse {
            success: true,
            message: "Movie created",
            movie,
        }),
    ))
}

/// Handler for PATCH /movies/:id
#[instrument(skip_all, name = "casting.handlers.update_movie")]
pub async fn update_movie(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    path: Result<Path<i64>, PathRejection>,
    body: Result<Json<UpdateMovieRequest>, JsonRejection>,
) -> Result<Json<MovieResponse>, ApiError> {
    state
        .guard
        .authorize(&headers, permissions::PATCH_MOVIE)
        .await?;

    let id = movie_id(path)?;
    let Json(body) = body?;
    let release_date = body
        .release_date
        .map(|raw| {
            parse_release_date(&raw)
                .ok_or_else(|| ApiError::BadRequest(INVALID_RELEASE_DATE.to_string()))
        })
        .transpose()?;

    let movie = state
        .catalog
        .update_movie(
            id,
            MoviePatch {
                title: body.title,
                release_date,
            },
        )
        .await?;

    Ok(Json(MovieResponse {
        success: true,
        message: "Movie updated",
        movie,
    }))
}

/// Handler for DELETE /movies/:id
#[instrument(skip_all, name = "casting.handlers.delete_movie")]
pub async fn delete_movie(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .guard
        .authorize(&headers, permissions::DELETE_MOVIE)
        .await?;

    state.catalog.delete_movie(movie_id(path)?).await?;

    Ok(Json(MessageResponse {
        success: true,
        message: "Movie deleted",
    }))
}
