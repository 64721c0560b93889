//! Actor handlers.

use crate::auth::permissions;
use crate::errors::ApiError;
use crate::handlers::movies::MISSING_FIELDS;
use crate::models::{
    ActorResponse, ActorsResponse, CreateActorRequest, MessageResponse, UpdateActorRequest,
};
use crate::repositories::{ActorPatch, CatalogError, NewActor};
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

fn actor_id(path: Result<Path<i64>, PathRejection>) -> Result<i64, ApiError> {
    path.map(|Path(id)| id)
        .map_err(|_| CatalogError::ActorNotFound.into())
}

/// Handler for GET /actors
#[instrument(skip_all, name = "casting.handlers.list_actors")]
pub async fn list_actors(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<ActorsResponse>, ApiError> {
    state
        .guard
        .authorize(&headers, permissions::GET_ACTORS)
        .await?;

    Ok(Json(ActorsResponse {
        success: true,
        actors: state.catalog.list_actors().await,
    }))
}

/// Handler for POST /actors
///
/// `name`, `age` and `gender` are required; `movie_id` optionally casts the
/// actor into an existing movie.
#[instrument(skip_all, name = "casting.handlers.create_actor")]
pub async fn create_actor(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Json<CreateActorRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ActorResponse>), ApiError> {
    state
        .guard
        .authorize(&headers, permissions::POST_ACTOR)
        .await?;

    let Json(body) = body?;
    let (Some(name), Some(age), Some(gender)) = (body.name, body.age, body.gender) else {
        return Err(ApiError::BadRequest(MISSING_FIELDS.to_string()));
    };

    let actor = state
        .catalog
        .create_actor(NewActor {
            name,
            age,
            gender,
            movie_id: body.movie_id,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ActorResponse {
            success: true,
            message: "Actor created",
            actor,
        }),
    ))
}

/// Handler for PATCH /actors/:id
#[instrument(skip_all, name = "casting.handlers.update_actor")]
pub async fn update_actor(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    path: Result<Path<i64>, PathRejection>,
    body: Result<Json<UpdateActorRequest>, JsonRejection>,
) -> Result<Json<ActorResponse>, ApiError> {
    state
        .guard
        .authorize(&headers, permissions::PATCH_ACTOR)
        .await?;

    let id = actor_id(path)?;
    let Json(body) = body?;

    let actor = state
        .catalog
        .update_actor(
            id,
            ActorPatch {
                name: body.name,
                age: body.age,
                gender: body.gender,
                movie_id: body.movie_id,
            },
        )
        .await?;

    Ok(Json(ActorResponse {
        success: true,
        message: "Actor updated",
        actor,
    }))
}

/// Handler for DELETE /actors/:id
#[instrument(skip_all, name = "casting.handlers.delete_actor")]
pub async fn delete_actor(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .guard
        .authorize(&headers, permissions::DELETE_ACTOR)
        .await?;

    state.catalog.delete_actor(actor_id(path)?).await?;

    Ok(Json(MessageResponse {
        success: true,
        message: "Actor deleted",
    }))
}
