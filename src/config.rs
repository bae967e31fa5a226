//! Process configuration from environment variables (`.env` is honoured by the binary).

use crate::error::ConfigError;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";
/// Upper bound for `SESSION_TTL_DAYS`.
pub const MAX_SESSION_TTL_DAYS: i64 = 3650;

#[derive(Clone, Debug)]
pub struct AppConfig {
    /// When absent the server runs on the in-memory store.
    pub database_url: Option<String>,
    pub bind_addr: SocketAddr,
    /// PostgreSQL schema holding the catalog tables.
    pub schema: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    pub statement_timeout: Duration,
    pub session_ttl: chrono::Duration,
    /// Zero disables the background sweep; expiry is then enforced lazily only.
    pub session_sweep_interval: Duration,
    pub password_log_n: u8,
    pub max_body_bytes: usize,
    pub admin: Option<AdminBootstrap>,
}

/// Administrator account created (or promoted) at startup.
#[derive(Clone)]
pub struct AdminBootstrap {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for AdminBootstrap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminBootstrap")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            database_url: None,
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            schema: "public".into(),
            max_connections: 5,
            acquire_timeout: Duration::from_secs(5),
            statement_timeout: Duration::from_millis(10_000),
            session_ttl: chrono::Duration::days(7),
            session_sweep_interval: Duration::from_secs(3600),
            password_log_n: 15,
            max_body_bytes: 64 * 1024,
            admin: None,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = AppConfig::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let schema = get("CATALOG_SCHEMA").unwrap_or(defaults.schema);
        if !is_identifier(&schema) {
            return Err(ConfigError::Invalid { key: "CATALOG_SCHEMA", value: schema });
        }

        let admin = match (get("ADMIN_EMAIL"), get("ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(AdminBootstrap { email, password }),
            (None, None) => None,
            _ => {
                return Err(ConfigError::Load(
                    "ADMIN_EMAIL and ADMIN_PASSWORD must be set together".into(),
                ))
            }
        };

        let ttl_days: i64 = parse_or("SESSION_TTL_DAYS", get("SESSION_TTL_DAYS"), 7)?;
        if !(1..=MAX_SESSION_TTL_DAYS).contains(&ttl_days) {
            return Err(ConfigError::Invalid { key: "SESSION_TTL_DAYS", value: ttl_days.to_string() });
        }

        Ok(AppConfig {
            database_url: get("DATABASE_URL"),
            bind_addr: parse_or("BIND_ADDR", get("BIND_ADDR"), defaults.bind_addr)?,
            schema,
            max_connections: parse_or("DB_MAX_CONNECTIONS", get("DB_MAX_CONNECTIONS"), defaults.max_connections)?,
            acquire_timeout: Duration::from_secs(parse_or("DB_ACQUIRE_TIMEOUT_SECS", get("DB_ACQUIRE_TIMEOUT_SECS"), 5)?),
            statement_timeout: Duration::from_millis(parse_or(
                "DB_STATEMENT_TIMEOUT_MS",
                get("DB_STATEMENT_TIMEOUT_MS"),
                10_000,
            )?),
            session_ttl: chrono::Duration::days(ttl_days),
            session_sweep_interval: Duration::from_secs(parse_or("SESSION_SWEEP_SECS", get("SESSION_SWEEP_SECS"), 3600)?),
            password_log_n: parse_or("PASSWORD_HASH_LOG_N", get("PASSWORD_HASH_LOG_N"), defaults.password_log_n)?,
            max_body_bytes: parse_or("MAX_BODY_BYTES", get("MAX_BODY_BYTES"), defaults.max_body_bytes)?,
            admin,
        })
    }
}

fn parse_or<T: FromStr>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(v) => v.parse().map_err(|_| ConfigError::Invalid { key, value: v }),
    }
}

/// Plain SQL identifier: letters, digits, underscore; not starting with a digit.
fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
