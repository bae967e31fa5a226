//! Shared application state for all routes. Built once by the server and cloned per request.

use crate::config::AppConfig;
use crate::error::AppError;
use crate::password::PasswordHasher;
use crate::session::SessionStore;
use crate::store::Store;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub sessions: Arc<SessionStore>,
    pub hasher: PasswordHasher,
    pub max_body_bytes: usize,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, config: &AppConfig) -> Result<Self, AppError> {
        let sessions = Arc::new(SessionStore::new(store.clone(), config.session_ttl));
        Self::with_sessions(store, sessions, config)
    }

    /// Use a prepared [`SessionStore`] (e.g. one with a test clock).
    pub fn with_sessions(
        store: Arc<dyn Store>,
        sessions: Arc<SessionStore>,
        config: &AppConfig,
    ) -> Result<Self, AppError> {
        Ok(AppState {
            store,
            sessions,
            hasher: PasswordHasher::new(config.password_log_n)?,
            max_body_bytes: config.max_body_bytes,
        })
    }
}
