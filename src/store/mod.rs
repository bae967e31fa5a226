//! Storage seam. Handlers and services talk to a [`Store`]; the server picks the backend
//! ([`PgStore`] when a database URL is configured, [`MemoryStore`] otherwise).
//!
//! Every mutation that touches an entity table and the membership table is atomic:
//! either all statements apply or none do.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;
pub(crate) use postgres::Tables;

use crate::error::AppError;
use crate::model::{Actor, Film, FilmSort, NewActor, NewFilm, NewUser, Session, User};
use crate::rows::RowSet;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Column names of `GET /actors/get` rows.
pub const FILMOGRAPHY_COLUMNS: [&str; 2] = ["actor_name", "film_name"];
/// Column names of `GET /films/get` rows.
pub const FILM_COLUMNS: [&str; 4] = ["id", "name", "release_date", "rating"];
/// Column names of `GET /film/get` rows.
pub const SEARCH_COLUMNS: [&str; 1] = ["name"];

#[async_trait]
pub trait Store: Send + Sync {
    /// Cheap liveness probe.
    async fn ping(&self) -> Result<(), AppError>;

    async fn email_exists(&self, email: &str) -> Result<bool, AppError>;
    /// Fails with [`AppError::Conflict`] when the email is taken.
    async fn insert_user(&self, user: &NewUser) -> Result<i64, AppError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;
    async fn user_role(&self, id: i64) -> Result<Option<String>, AppError>;
    /// Returns false when no user has that email.
    async fn set_user_role(&self, email: &str, role: &str) -> Result<bool, AppError>;

    async fn insert_session(&self, session: &Session) -> Result<(), AppError>;
    async fn find_session(&self, token: &str) -> Result<Option<Session>, AppError>;
    /// Idempotent.
    async fn delete_session(&self, token: &str) -> Result<(), AppError>;
    /// Deletes sessions whose expiry is strictly before `now`; returns how many.
    async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64, AppError>;

    async fn insert_actor(&self, actor: &NewActor) -> Result<i64, AppError>;
    /// Returns false when the id does not exist.
    async fn update_actor(&self, actor: &Actor) -> Result<bool, AppError>;
    /// Removes the actor and every membership row naming it.
    async fn delete_actor(&self, id: i64) -> Result<bool, AppError>;
    /// `(actor_name, film_name)` for every membership, ordered by actor then film.
    async fn actor_filmography(&self) -> Result<RowSet, AppError>;

    /// Inserts the film and one membership row per distinct cast member. Unknown actor
    /// ids fail with [`AppError::Validation`] and nothing is written.
    async fn insert_film(&self, film: &NewFilm) -> Result<i64, AppError>;
    /// Updates the film row and replaces its cast.
    async fn update_film(&self, film: &Film) -> Result<bool, AppError>;
    /// Removes the film and every membership row naming it.
    async fn delete_film(&self, id: i64) -> Result<bool, AppError>;
    /// All films, descending by `sort`, ties broken by descending id.
    async fn list_films(&self, sort: FilmSort) -> Result<RowSet, AppError>;
    /// Distinct film names where the film name or a cast member's name contains
    /// `fragment` (literal, case-sensitive).
    async fn search_films(&self, fragment: &str) -> Result<RowSet, AppError>;
}

/// Cast ids without duplicates, keeping first-seen order.
pub(crate) fn distinct_cast(actors: &[i64]) -> Vec<i64> {
    let mut seen = std::collections::HashSet::with_capacity(actors.len());
    actors.iter().copied().filter(|id| seen.insert(*id)).collect()
}
