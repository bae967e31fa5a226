//! Account routes.

use crate::handlers::account::{sign_in, sign_out, sign_up};
use crate::state::AppState;
use axum::{routing::post, Router};

pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/sign-up", post(sign_up))
        .route("/sign-in", post(sign_in))
        .route("/sign-out", post(sign_out))
}
