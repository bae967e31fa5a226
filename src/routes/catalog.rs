//! Actor and film routes. Writes are POST with a JSON body; reads are GET with query
//! parameters.

use crate::handlers::catalog::{list_actors, list_films, search_films};
use crate::handlers::entity::{create, delete, update};
use crate::model::{Actor, Film};
use crate::state::AppState;
use axum::{routing::get, routing::post, Router};

pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/actors/add", post(create::<Actor>))
        .route("/actors/delete", post(delete::<Actor>))
        .route("/actors/update", post(update::<Actor>))
        .route("/actors/get", get(list_actors))
        .route("/films/add", post(create::<Film>))
        .route("/films/delete", post(delete::<Film>))
        .route("/films/update", post(update::<Film>))
        .route("/films/get", get(list_films))
        .route("/film/get", get(search_films))
}
