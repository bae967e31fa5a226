//! Auth gate: every route outside [`PUBLIC_PATHS`] needs a live session owned by an admin.
//!
//! Per request:
//! 1. public path: forward untouched;
//! 2. no `session_id` cookie: 401;
//! 3. unknown token: 401;
//! 4. expired session: delete it, 401;
//! 5. owner missing: 404;
//! 6. owner is not an admin: 403;
//! 7. re-issue the cookie (same value, same stored expiry) and forward.
//!
//! Expiry is checked before the role so an expired session is always cleaned up,
//! whoever owns it.

use crate::error::AppError;
use crate::extractors::AuthUser;
use crate::model::ADMIN_ROLE;
use crate::session::SESSION_COOKIE;
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use chrono::{DateTime, Utc};

/// Paths served without a session.
pub const PUBLIC_PATHS: &[&str] = &[
    "/sign-in",
    "/sign-up",
    "/sign-out",
    "/actors/get",
    "/films/get",
    "/film/get",
    "/health",
    "/ready",
    "/version",
];

pub fn is_public(path: &str) -> bool {
    PUBLIC_PATHS.contains(&path)
}

/// HttpOnly session cookie expiring with the stored session.
pub fn session_cookie(token: &str, expires_at: DateTime<Utc>) -> Cookie<'static> {
    let mut cookie = Cookie::build((SESSION_COOKIE, token.to_string()))
        .path("/")
        .http_only(true)
        .build();
    if let Ok(at) = time::OffsetDateTime::from_unix_timestamp(expires_at.timestamp()) {
        cookie.set_expires(at);
    }
    cookie
}

/// Cookie that tells the client to drop the session.
pub fn removal_cookie() -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE).path("/").build()
}

pub async fn auth_gate(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if is_public(request.uri().path()) {
        return Ok(next.run(request).await);
    }

    let token = jar
        .get(SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .ok_or(AppError::Unauthenticated("missing session cookie"))?;

    let session = state
        .sessions
        .lookup(&token)
        .await?
        .ok_or(AppError::Unauthenticated("unknown session"))?;

    if state.sessions.is_expired(&session) {
        if let Err(e) = state.sessions.revoke(&token).await {
            tracing::warn!(error = %e, uid = session.uid, "could not delete expired session");
        }
        tracing::debug!(uid = session.uid, "expired session rejected");
        return Err(AppError::Unauthenticated("session expired"));
    }

    let role = state
        .store
        .user_role(session.uid)
        .await?
        .ok_or_else(|| AppError::NotFound("cant found user".into()))?;
    if role != ADMIN_ROLE {
        tracing::warn!(uid = session.uid, role = %role, "non-admin session rejected");
        return Err(AppError::Forbidden("user has wrong role".into()));
    }

    request.extensions_mut().insert(AuthUser { id: session.uid, role });
    let response = next.run(request).await;
    Ok((jar.add(session_cookie(&token, session.expires_at)), response).into_response())
}
