//! In-memory movie and actor catalog.
//!
//! Records live for the lifetime of the process. Ids are assigned
//! sequentially from 1 and never reused.

use crate::models::{Actor, Movie, MovieWithActors};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::instrument;

/// Catalog lookup failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("Movie not found")]
    MovieNotFound,

    #[error("Actor not found")]
    ActorNotFound,
}

/// Fields for a new actor.
#[derive(Debug, Clone)]
pub struct NewActor {
    pub name: String,
    pub age: u32,
    pub gender: String,
    pub movie_id: Option<i64>,
}

/// Movie fields to change; `None` leaves a field as is.
#[derive(Debug, Clone, Default)]
pub struct MoviePatch {
    pub title: Option<String>,
    pub release_date: Option<NaiveDate>,
}

/// Actor fields to change; `None` leaves a field as is.
#[derive(Debug, Clone, Default)]
pub struct ActorPatch {
    pub name: Option<String>,
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub movie_id: Option<i64>,
}

#[derive(Debug, Default)]
struct Records {
    movies: BTreeMap<i64, Movie>,
    actors: BTreeMap<i64, Actor>,
    last_movie_id: i64,
    last_actor_id: i64,
}

impl Records {
    fn require_movie(&self, movie_id: Option<i64>) -> Result<(), CatalogError> {
        match movie_id {
            Some(id) if !self.movies.contains_key(&id) => Err(CatalogError::MovieNotFound),
            _ => Ok(()),
        }
    }
}

/// Shared catalog store.
#[derive(Debug, Default)]
pub struct Catalog {
    records: RwLock<Records>,
}

impl Catalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// All movies in id order, each with its cast.
    pub async fn list_movies(&self) -> Vec<MovieWithActors> {
        let records = self.records.read().await;

        records
            .movies
            .values()
            .map(|movie| MovieWithActors {
                movie: movie.clone(),
                actors: records
                    .actors
                    .values()
                    .filter(|actor| actor.movie_id == Some(movie.id))
                    .cloned()
                    .collect(),
            })
            .collect()
    }

    #[instrument(skip_all)]
    pub async fn create_movie(&self, title: String, release_date: NaiveDate) -> Movie {
        let mut records = self.records.write().await;
        records.last_movie_id += 1;

        let movie = Movie {
            id: records.last_movie_id,
            title,
            release_date,
        };
        records.movies.insert(movie.id, movie.clone());

        tracing::debug!(target: "casting.catalog", movie_id = movie.id, "Movie created");
        movie
    }

    /// # Errors
    ///
    /// `CatalogError::MovieNotFound` if `id` is unknown.
    #[instrument(skip(self, patch))]
    pub async fn update_movie(&self, id: i64, patch: MoviePatch) -> Result<Movie, CatalogError> {
        let mut records = self.records.write().await;
        let movie = records
            .movies
            .get_mut(&id)
            .ok_or(CatalogError::MovieNotFound)?;

        if let Some(title) = patch.title {
            movie.title = title;
        }
        if let Some(release_date) = patch.release_date {
            movie.release_date = release_date;
        }

        Ok(movie.clone())
    }

    /// Remove a movie; actors cast in it stay in the catalog uncast.
    ///
    /// # Errors
    ///
    /// `CatalogError::MovieNotFound` if `id` is unknown.
    #[instrument(skip(self))]
    pub async fn delete_movie(&self, id: i64) -> Result<(), CatalogError> {
        let mut records = self.records.write().await;
        records
            .movies
            .remove(&id)
            .ok_or(CatalogError::MovieNotFound)?;

        for actor in records.actors.values_mut() {
            if actor.movie_id == Some(id) {
                actor.movie_id = None;
            }
        }

        tracing::debug!(target: "casting.catalog", movie_id = id, "Movie deleted");
        Ok(())
    }

    /// All actors in id order.
    pub async fn list_actors(&self) -> Vec<Actor> {
        self.records.read().await.actors.values().cloned().collect()
    }

    /// # Errors
    ///
    /// `CatalogError::MovieNotFound` if `movie_id` names an unknown movie.
    #[instrument(skip_all)]
    pub async fn create_actor(&self, new: NewActor) -> Result<Actor, CatalogError> {
        let mut records = self.records.write().await;
        records.require_movie(new.movie_id)?;
        records.last_actor_id += 1;

        let actor = Actor {
            id: records.last_actor_id,
            name: new.name,
            age: new.age,
            gender: new.gender,
            movie_id: new.movie_id,
        };
        records.actors.insert(actor.id, actor.clone());

        tracing::debug!(target: "casting.catalog", actor_id = actor.id, "Actor created");
        Ok(actor)
    }

    /// # Errors
    ///
    /// `CatalogError::ActorNotFound` if `id` is unknown, or
    /// `CatalogError::MovieNotFound` if the patch casts into an unknown movie.
    #[instrument(skip(self, patch))]
    pub async fn update_actor(&self, id: i64, patch: ActorPatch) -> Result<Actor, CatalogError> {
        let mut records = self.records.write().await;
        if !records.actors.contains_key(&id) {
            return Err(CatalogError::ActorNotFound);
        }
        records.require_movie(patch.movie_id)?;

        let actor = records
            .actors
            .get_mut(&id)
            .ok_or(CatalogError::ActorNotFound)?;

        if let Some(name) = patch.name {
            actor.name = name;
        }
        if let Some(age) = patch.age {
            actor.age = age;
        }
        if let Some(gender) = patch.gender {
            actor.gender = gender;
        }
        if patch.movie_id.is_some() {
            actor.movie_id = patch.movie_id;
        }

        Ok(actor.clone())
    }

    /// # Errors
    ///
    /// `CatalogError::ActorNotFound` if `id` is unknown.
    #[instrument(skip(self))]
    pub async fn delete_actor(&self, id: i64) -> Result<(), CatalogError> {
        self.records
            .write()
            .await
            .actors
            .remove(&id)
            .map(|_| ())
            .ok_or(CatalogError::ActorNotFound)
    }
}
