//! Sign-up, sign-in, sign-out.

use crate::auth::{removal_cookie, session_cookie};
use crate::error::AppError;
use crate::extractors::JsonBody;
use crate::model::Credentials;
use crate::response::{created, ok};
use crate::service::AccountService;
use crate::session::SESSION_COOKIE;
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse};
use axum_extra::extract::cookie::CookieJar;

pub async fn sign_up(
    State(state): State<AppState>,
    JsonBody(credentials): JsonBody<Credentials>,
) -> Result<StatusCode, AppError> {
    AccountService::sign_up(state.store.as_ref(), &state.hasher, credentials).await?;
    Ok(created())
}

pub async fn sign_in(
    State(state): State<AppState>,
    jar: CookieJar,
    JsonBody(credentials): JsonBody<Credentials>,
) -> Result<impl IntoResponse, AppError> {
    let session = AccountService::sign_in(
        state.store.as_ref(),
        &state.hasher,
        &state.sessions,
        credentials,
    )
    .await?;
    Ok((jar.add(session_cookie(&session.token, session.expires_at)), ok()))
}

/// Revokes the presented session, if any, and clears the cookie.
pub async fn sign_out(State(state): State<AppState>, jar: CookieJar) -> Result<impl IntoResponse, AppError> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        state.sessions.revoke(cookie.value()).await?;
    }
    Ok((jar.remove(removal_cookie()), ok()))
}
