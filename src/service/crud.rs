//! Create/update/delete shared by every catalog entity. Each entity supplies its body
//! shapes, validation, and the store calls; [`EntityCrud`] adds the common flow
//! (validate, write, map a missing id to 404, log).

use crate::error::AppError;
use crate::model::{Actor, Film, NewActor, NewFilm};
use crate::service::RequestValidator;
use crate::store::Store;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;

#[async_trait]
pub trait CatalogEntity: Send + Sync + 'static {
    /// Used in log lines and error messages.
    const KIND: &'static str;
    /// Create body (no id).
    type Draft: DeserializeOwned + Send + Sync + 'static;
    /// Update body (with id).
    type Record: DeserializeOwned + Send + Sync + 'static;

    fn validate_draft(draft: &Self::Draft) -> Result<(), AppError>;
    fn validate_record(record: &Self::Record) -> Result<(), AppError>;
    fn record_id(record: &Self::Record) -> i64;

    async fn insert(store: &dyn Store, draft: &Self::Draft) -> Result<i64, AppError>;
    async fn update(store: &dyn Store, record: &Self::Record) -> Result<bool, AppError>;
    async fn delete(store: &dyn Store, id: i64) -> Result<bool, AppError>;
}

pub struct EntityCrud<E>(PhantomData<E>);

impl<E: CatalogEntity> EntityCrud<E> {
    pub async fn create(store: &dyn Store, draft: &E::Draft) -> Result<i64, AppError> {
        E::validate_draft(draft)?;
        let id = E::insert(store, draft).await?;
        tracing::info!(kind = E::KIND, id, "created");
        Ok(id)
    }

    pub async fn update(store: &dyn Store, record: &E::Record) -> Result<(), AppError> {
        let id = E::record_id(record);
        RequestValidator::id("id", id)?;
        E::validate_record(record)?;
        if !E::update(store, record).await? {
            return Err(AppError::NotFound(format!("{} {}", E::KIND, id)));
        }
        tracing::info!(kind = E::KIND, id, "updated");
        Ok(())
    }

    pub async fn delete(store: &dyn Store, id: i64) -> Result<(), AppError> {
        RequestValidator::id("id", id)?;
        if !E::delete(store, id).await? {
            return Err(AppError::NotFound(format!("{} {}", E::KIND, id)));
        }
        tracing::info!(kind = E::KIND, id, "deleted");
        Ok(())
    }
}

fn validate_cast(actors: &[i64]) -> Result<(), AppError> {
    actors.iter().try_for_each(|id| RequestValidator::id("actors", *id))
}

#[async_trait]
impl CatalogEntity for Actor {
    const KIND: &'static str = "actor";
    type Draft = NewActor;
    type Record = Actor;

    fn validate_draft(draft: &NewActor) -> Result<(), AppError> {
        RequestValidator::name("name", &draft.name)
    }

    fn validate_record(record: &Actor) -> Result<(), AppError> {
        RequestValidator::name("name", &record.name)
    }

    fn record_id(record: &Actor) -> i64 {
        record.id
    }

    async fn insert(store: &dyn Store, draft: &NewActor) -> Result<i64, AppError> {
        store.insert_actor(draft).await
    }

    async fn update(store: &dyn Store, record: &Actor) -> Result<bool, AppError> {
        store.update_actor(record).await
    }

    async fn delete(store: &dyn Store, id: i64) -> Result<bool, AppError> {
        store.delete_actor(id).await
    }
}

#[async_trait]
impl CatalogEntity for Film {
    const KIND: &'static str = "film";
    type Draft = NewFilm;
    type Record = Film;

    fn validate_draft(draft: &NewFilm) -> Result<(), AppError> {
        RequestValidator::name("name", &draft.name)?;
        validate_cast(&draft.actors)
    }

    fn validate_record(record: &Film) -> Result<(), AppError> {
        RequestValidator::name("name", &record.name)?;
        validate_cast(&record.actors)
    }

    fn record_id(record: &Film) -> i64 {
        record.id
    }

    async fn insert(store: &dyn Store, draft: &NewFilm) -> Result<i64, AppError> {
        store.insert_film(draft).await
    }

    async fn update(store: &dyn Store, record: &Film) -> Result<bool, AppError> {
        store.update_film(record).await
    }

    async fn delete(store: &dyn Store, id: i64) -> Result<bool, AppError> {
        store.delete_film(id).await
    }
}
