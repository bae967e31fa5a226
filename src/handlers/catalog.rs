//! Public read handlers. Every result goes through the row serializer.

use crate::error::AppError;
use crate::model::FilmSort;
use crate::response::rows;
use crate::state::AppState;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
};
use std::collections::HashMap;

/// `GET /actors/get`: every (actor, film) pairing.
pub async fn list_actors(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let set = state.store.actor_filmography().await?;
    Ok(rows(set))
}

/// `GET /films/get?sort_by=name|release_date|rating`
pub async fn list_films(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let sort = FilmSort::parse(params.get("sort_by").map(String::as_str));
    let set = state.store.list_films(sort).await?;
    Ok(rows(set))
}

/// `GET /film/get?fragment=text`. A missing fragment matches every film with a name.
pub async fn search_films(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let fragment = params.get("fragment").map(String::as_str).unwrap_or("");
    let set = state.store.search_films(fragment).await?;
    Ok(rows(set))
}
