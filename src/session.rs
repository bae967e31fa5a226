//! Session tokens: issue, look up, revoke, expire.
//!
//! Expiry is absolute (issuance + TTL, never extended). Expired rows are removed lazily
//! when the auth gate meets them and, unless disabled, by a periodic sweep so storage
//! stays bounded without client traffic.

use crate::error::AppError;
use crate::model::Session;
use crate::store::Store;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "session_id";
/// Random bytes per token, before encoding.
pub const TOKEN_BYTES: usize = 32;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: parking_lot::Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        ManualClock { now: parking_lot::Mutex::new(start) }
    }

    pub fn advance(&self, by: chrono::Duration) {
        *self.now.lock() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// URL-safe, unpadded encoding of [`TOKEN_BYTES`] bytes from the OS RNG.
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

pub struct SessionStore {
    store: Arc<dyn Store>,
    ttl: chrono::Duration,
    clock: Arc<dyn Clock>,
}

impl SessionStore {
    pub fn new(store: Arc<dyn Store>, ttl: chrono::Duration) -> Self {
        Self::with_clock(store, ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<dyn Store>, ttl: chrono::Duration, clock: Arc<dyn Clock>) -> Self {
        SessionStore { store, ttl, clock }
    }

    /// Persist a new session for `uid` expiring at now + TTL.
    pub async fn create(&self, uid: i64) -> Result<Session, AppError> {
        let expires_at = self
            .clock
            .now()
            .checked_add_signed(self.ttl)
            .ok_or_else(|| AppError::Internal("session expiry out of range".into()))?;
        let session = Session {
            uid,
            token: generate_token(),
            expires_at,
        };
        self.store.insert_session(&session).await?;
        tracing::info!(uid, expires_at = %session.expires_at, "session created");
        Ok(session)
    }

    pub async fn lookup(&self, token: &str) -> Result<Option<Session>, AppError> {
        self.store.find_session(token).await
    }

    /// Idempotent: revoking an unknown token is not an error.
    pub async fn revoke(&self, token: &str) -> Result<(), AppError> {
        self.store.delete_session(token).await
    }

    pub fn is_expired(&self, session: &Session) -> bool {
        self.clock.now() > session.expires_at
    }

    pub async fn sweep_expired(&self) -> Result<u64, AppError> {
        let removed = self.store.delete_expired_sessions(self.clock.now()).await?;
        if removed > 0 {
            tracing::info!(removed, "expired sessions swept");
        }
        Ok(removed)
    }

    /// Run [`Self::sweep_expired`] every `interval` until the task is aborted. Errors are
    /// logged and the loop continues.
    pub fn spawn_sweeper(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(e) = self.sweep_expired().await {
                    tracing::warn!(error = %e, "session sweep failed");
                }
            }
        })
    }
}
