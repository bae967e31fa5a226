//! Router assembly.

mod account;
mod catalog;
mod common;

pub use account::account_routes;
pub use catalog::catalog_routes;
pub use common::common_routes;

use crate::auth::auth_gate;
use crate::state::AppState;
use axum::{middleware::from_fn_with_state, Router};
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};

/// Full application: all routes behind the auth gate, with body limit and request tracing.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(common_routes())
        .merge(account_routes())
        .merge(catalog_routes())
        .layer(from_fn_with_state(state.clone(), auth_gate))
        .layer(RequestBodyLimitLayer::new(state.max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
