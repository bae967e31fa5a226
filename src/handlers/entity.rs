//! Write handlers shared by actors and films; routes pick the entity with a type parameter.

use crate::error::AppError;
use crate::extractors::{AuthUser, JsonBody};
use crate::model::EntityId;
use crate::response::{created, ok};
use crate::service::{CatalogEntity, EntityCrud};
use crate::state::AppState;
use axum::{extract::State, http::StatusCode};

pub async fn create<E: CatalogEntity>(
    State(state): State<AppState>,
    caller: AuthUser,
    JsonBody(draft): JsonBody<E::Draft>,
) -> Result<StatusCode, AppError> {
    tracing::debug!(kind = E::KIND, uid = caller.id, "create");
    EntityCrud::<E>::create(state.store.as_ref(), &draft).await?;
    Ok(created())
}

/// Answers 201 like create, matching the existing clients.
pub async fn update<E: CatalogEntity>(
    State(state): State<AppState>,
    caller: AuthUser,
    JsonBody(record): JsonBody<E::Record>,
) -> Result<StatusCode, AppError> {
    tracing::debug!(kind = E::KIND, uid = caller.id, "update");
    EntityCrud::<E>::update(state.store.as_ref(), &record).await?;
    Ok(created())
}

pub async fn delete<E: CatalogEntity>(
    State(state): State<AppState>,
    caller: AuthUser,
    JsonBody(EntityId { id }): JsonBody<EntityId>,
) -> Result<StatusCode, AppError> {
    tracing::debug!(kind = E::KIND, uid = caller.id, id, "delete");
    EntityCrud::<E>::delete(state.store.as_ref(), id).await?;
    Ok(ok())
}
