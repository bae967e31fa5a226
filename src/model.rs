//! Request and record shapes for actors, films, users, and sessions.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Role that may use every non-public route.
pub const ADMIN_ROLE: &str = "admin";
/// Role given to accounts created through sign-up.
pub const DEFAULT_ROLE: &str = "user";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
        }
    }
}

/// Body of `POST /actors/add`.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct NewActor {
    pub name: String,
    pub gender: Gender,
    pub birthday: NaiveDate,
}

/// Body of `POST /actors/update`.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Actor {
    pub id: i64,
    pub name: String,
    pub gender: Gender,
    pub birthday: NaiveDate,
}

/// Body of `POST /films/add`. `actors` is the cast, as actor ids.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct NewFilm {
    pub name: String,
    pub release_date: NaiveDate,
    pub rating: i32,
    #[serde(default)]
    pub actors: Vec<i64>,
}

/// Body of `POST /films/update`. The cast replaces the stored one.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Film {
    pub id: i64,
    pub name: String,
    pub release_date: NaiveDate,
    pub rating: i32,
    #[serde(default)]
    pub actors: Vec<i64>,
}

/// Body of the delete routes. Other fields are ignored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub struct EntityId {
    pub id: i64,
}

/// Sign-in / sign-up body.
#[derive(Clone, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Stored account. Not serializable: neither the hash nor the role leaves the server.
#[derive(Clone, Debug, PartialEq)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub password_hash: String,
    pub role: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub role: String,
}

/// Stored session row: owner, opaque token, absolute expiry.
#[derive(Clone, Debug, PartialEq)]
pub struct Session {
    pub uid: i64,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Sort keys accepted by `GET /films/get`. Ordering is always descending.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FilmSort {
    Name,
    ReleaseDate,
    #[default]
    Rating,
}

impl FilmSort {
    /// Missing or unrecognized keys fall back to rating.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("name") => FilmSort::Name,
            Some("release_date") => FilmSort::ReleaseDate,
            Some("rating") | None => FilmSort::Rating,
            Some(other) => {
                tracing::debug!(sort_by = %other, "unknown sort key, using rating");
                FilmSort::Rating
            }
        }
    }

    pub fn column(&self) -> &'static str {
        match self {
            FilmSort::Name => "name",
            FilmSort::ReleaseDate => "release_date",
            FilmSort::Rating => "rating",
        }
    }
}
