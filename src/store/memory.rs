//! In-process backend with the same observable behaviour as [`super::PgStore`]: unique
//! emails, membership rows that must reference existing actors and films, and cascading
//! deletes. Used for tests and for running without a database.
//!
//! Every operation takes the lock once and never holds it across an `.await`, so each
//! call is atomic with respect to the others.

use super::{distinct_cast, Store, FILMOGRAPHY_COLUMNS, FILM_COLUMNS, SEARCH_COLUMNS};
use crate::error::AppError;
use crate::model::{Actor, Film, FilmSort, Gender, NewActor, NewFilm, NewUser, Session, User};
use crate::rows::{Cell, RowSet};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

#[derive(Clone, Debug)]
struct ActorRow {
    name: String,
    #[allow(dead_code)]
    gender: Gender,
    #[allow(dead_code)]
    birthday: NaiveDate,
}

#[derive(Clone, Debug)]
struct FilmRow {
    name: String,
    release_date: NaiveDate,
    rating: i32,
}

/// Last id handed out per table, like a `BIGSERIAL` sequence.
#[derive(Default)]
struct Sequences {
    actors: i64,
    films: i64,
    users: i64,
}

fn next(seq: &mut i64) -> i64 {
    *seq += 1;
    *seq
}

#[derive(Default)]
struct Inner {
    seq: Sequences,
    actors: BTreeMap<i64, ActorRow>,
    films: BTreeMap<i64, FilmRow>,
    /// (actor, film)
    membership: BTreeSet<(i64, i64)>,
    users: BTreeMap<i64, User>,
    sessions: HashMap<String, Session>,
}

impl Inner {
    fn check_cast(&self, actors: &[i64]) -> Result<Vec<i64>, AppError> {
        let cast = distinct_cast(actors);
        if let Some(missing) = cast.iter().find(|id| !self.actors.contains_key(id)) {
            return Err(AppError::Validation(format!("unknown actor id {}", missing)));
        }
        Ok(cast)
    }
}

/// Cloneable handle; clones share the same data.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session_count(&self) -> usize {
        self.inner.read().sessions.len()
    }

    pub fn user_count(&self) -> usize {
        self.inner.read().users.len()
    }

    pub fn membership_count(&self) -> usize {
        self.inner.read().membership.len()
    }

    /// Cast of a film, ascending by actor id.
    pub fn cast_of(&self, film: i64) -> Vec<i64> {
        self.inner
            .read()
            .membership
            .iter()
            .filter(|(_, f)| *f == film)
            .map(|(a, _)| *a)
            .collect()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }

    async fn email_exists(&self, email: &str) -> Result<bool, AppError> {
        Ok(self.inner.read().users.values().any(|u| u.email == email))
    }

    async fn insert_user(&self, user: &NewUser) -> Result<i64, AppError> {
        let mut inner = self.inner.write();
        if inner.users.values().any(|u| u.email == user.email) {
            return Err(AppError::Conflict("Email already exists".into()));
        }
        let id = next(&mut inner.seq.users);
        inner.users.insert(
            id,
            User {
                id,
                email: user.email.clone(),
                password_hash: user.password_hash.clone(),
                role: user.role.clone(),
            },
        );
        Ok(id)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self.inner.read().users.values().find(|u| u.email == email).cloned())
    }

    async fn user_role(&self, id: i64) -> Result<Option<String>, AppError> {
        Ok(self.inner.read().users.get(&id).map(|u| u.role.clone()))
    }

    async fn set_user_role(&self, email: &str, role: &str) -> Result<bool, AppError> {
        let mut inner = self.inner.write();
        match inner.users.values_mut().find(|u| u.email == email) {
            Some(user) => {
                user.role = role.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn insert_session(&self, session: &Session) -> Result<(), AppError> {
        let mut inner = self.inner.write();
        if !inner.users.contains_key(&session.uid) {
            return Err(AppError::Validation(format!("unknown user id {}", session.uid)));
        }
        inner.sessions.insert(session.token.clone(), session.clone());
        Ok(())
    }

    async fn find_session(&self, token: &str) -> Result<Option<Session>, AppError> {
        Ok(self.inner.read().sessions.get(token).cloned())
    }

    async fn delete_session(&self, token: &str) -> Result<(), AppError> {
        self.inner.write().sessions.remove(token);
        Ok(())
    }

    async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64, AppError> {
        let mut inner = self.inner.write();
        let before = inner.sessions.len();
        inner.sessions.retain(|_, s| s.expires_at >= now);
        Ok((before - inner.sessions.len()) as u64)
    }

    async fn insert_actor(&self, actor: &NewActor) -> Result<i64, AppError> {
        let mut inner = self.inner.write();
        let id = next(&mut inner.seq.actors);
        inner.actors.insert(
            id,
            ActorRow {
                name: actor.name.clone(),
                gender: actor.gender,
                birthday: actor.birthday,
            },
        );
        Ok(id)
    }

    async fn update_actor(&self, actor: &Actor) -> Result<bool, AppError> {
        let mut inner = self.inner.write();
        match inner.actors.get_mut(&actor.id) {
            Some(row) => {
                row.name = actor.name.clone();
                row.gender = actor.gender;
                row.birthday = actor.birthday;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_actor(&self, id: i64) -> Result<bool, AppError> {
        let mut inner = self.inner.write();
        inner.membership.retain(|(actor, _)| *actor != id);
        Ok(inner.actors.remove(&id).is_some())
    }

    async fn actor_filmography(&self) -> Result<RowSet, AppError> {
        let inner = self.inner.read();
        let mut pairs: Vec<(&str, &str, i64, i64)> = inner
            .membership
            .iter()
            .filter_map(|(a, f)| {
                let actor = inner.actors.get(a)?;
                let film = inner.films.get(f)?;
                Some((actor.name.as_str(), film.name.as_str(), *a, *f))
            })
            .collect();
        pairs.sort();
        let mut set = RowSet::new(FILMOGRAPHY_COLUMNS);
        for (actor, film, _, _) in pairs {
            set.push(vec![actor.into(), film.into()]);
        }
        Ok(set)
    }

    async fn insert_film(&self, film: &NewFilm) -> Result<i64, AppError> {
        let mut inner = self.inner.write();
        let cast = inner.check_cast(&film.actors)?;
        let id = next(&mut inner.seq.films);
        inner.films.insert(
            id,
            FilmRow {
                name: film.name.clone(),
                release_date: film.release_date,
                rating: film.rating,
            },
        );
        inner.membership.extend(cast.into_iter().map(|actor| (actor, id)));
        Ok(id)
    }

    async fn update_film(&self, film: &Film) -> Result<bool, AppError> {
        let mut inner = self.inner.write();
        if !inner.films.contains_key(&film.id) {
            return Ok(false);
        }
        let cast = inner.check_cast(&film.actors)?;
        if let Some(row) = inner.films.get_mut(&film.id) {
            row.name = film.name.clone();
            row.release_date = film.release_date;
            row.rating = film.rating;
        }
        inner.membership.retain(|(_, f)| *f != film.id);
        inner.membership.extend(cast.into_iter().map(|actor| (actor, film.id)));
        Ok(true)
    }

    async fn delete_film(&self, id: i64) -> Result<bool, AppError> {
        let mut inner = self.inner.write();
        inner.membership.retain(|(_, film)| *film != id);
        Ok(inner.films.remove(&id).is_some())
    }

    async fn list_films(&self, sort: FilmSort) -> Result<RowSet, AppError> {
        let inner = self.inner.read();
        let mut films: Vec<(&i64, &FilmRow)> = inner.films.iter().collect();
        films.sort_by(|(a_id, a), (b_id, b)| {
            let by_key = match sort {
                FilmSort::Name => b.name.cmp(&a.name),
                FilmSort::ReleaseDate => b.release_date.cmp(&a.release_date),
                FilmSort::Rating => b.rating.cmp(&a.rating),
            };
            by_key.then_with(|| b_id.cmp(a_id))
        });
        let mut set = RowSet::new(FILM_COLUMNS);
        for (id, film) in films {
            set.push(vec![
                Cell::Int(*id),
                film.name.as_str().into(),
                Cell::Text(film.release_date.format("%Y-%m-%d").to_string()),
                film.rating.into(),
            ]);
        }
        Ok(set)
    }

    async fn search_films(&self, fragment: &str) -> Result<RowSet, AppError> {
        let inner = self.inner.read();
        let names: BTreeSet<&str> = inner
            .films
            .iter()
            .filter(|(id, film)| {
                film.name.contains(fragment)
                    || inner
                        .membership
                        .iter()
                        .filter(|(_, f)| f == *id)
                        .filter_map(|(a, _)| inner.actors.get(a))
                        .any(|actor| actor.name.contains(fragment))
            })
            .map(|(_, film)| film.name.as_str())
            .collect();
        let mut set = RowSet::new(SEARCH_COLUMNS);
        for name in names {
            set.push(vec![name.into()]);
        }
        Ok(set)
    }
}
