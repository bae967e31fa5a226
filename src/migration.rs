//! Catalog DDL. Idempotent: every statement is `IF NOT EXISTS`, so it runs on each start.

use crate::error::{AppError, ConfigError};
use crate::store::Tables;
use sqlx::postgres::PgConnectOptions;
use sqlx::ConnectOptions;
use sqlx::PgPool;
use std::str::FromStr;

/// Statements creating the schema, tables, and indexes, in dependency order.
pub fn schema_ddl(schema: &str) -> Vec<String> {
    let t = Tables::in_schema(schema);
    vec![
        format!("CREATE SCHEMA IF NOT EXISTS {}", quote_ident(schema)),
        format!(
            "CREATE TABLE IF NOT EXISTS {} (
                id BIGSERIAL PRIMARY KEY,
                name TEXT NOT NULL,
                gender TEXT NOT NULL CHECK (gender IN ('Male', 'Female')),
                birthday DATE NOT NULL
            )",
            t.actors
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS {} (
                id BIGSERIAL PRIMARY KEY,
                name TEXT NOT NULL,
                release_date DATE NOT NULL,
                rating INTEGER NOT NULL
            )",
            t.films
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS {} (
                actor BIGINT NOT NULL REFERENCES {} (id) ON DELETE CASCADE,
                film BIGINT NOT NULL REFERENCES {} (id) ON DELETE CASCADE,
                PRIMARY KEY (actor, film)
            )",
            t.membership, t.actors, t.films
        ),
        format!(
            "CREATE INDEX IF NOT EXISTS filmmembership_film_idx ON {} (film)",
            t.membership
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS {} (
                id BIGSERIAL PRIMARY KEY,
                email TEXT NOT NULL UNIQUE,
                password TEXT NOT NULL,
                role TEXT NOT NULL DEFAULT 'user'
            )",
            t.users
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS {} (
                cookie TEXT PRIMARY KEY,
                uid BIGINT NOT NULL REFERENCES {} (id) ON DELETE CASCADE,
                expire_date TIMESTAMPTZ NOT NULL
            )",
            t.sessions, t.users
        ),
        format!(
            "CREATE INDEX IF NOT EXISTS sessions_expire_date_idx ON {} (expire_date)",
            t.sessions
        ),
    ]
}

/// Create the catalog schema and tables if missing.
pub async fn ensure_schema(pool: &PgPool, schema: &str) -> Result<(), AppError> {
    for sql in schema_ddl(schema) {
        tracing::debug!(sql = %sql, "ddl");
        sqlx::query(&sql).execute(pool).await?;
    }
    tracing::info!(schema = %schema, "catalog schema ready");
    Ok(())
}

/// Ensure the database in `database_url` exists; create it if not. Connects to the same
/// server's `postgres` database to run CREATE DATABASE. Call before creating the main pool.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), AppError> {
    let options = parse_database_url(database_url)?;
    let Some(db_name) = target_database(&options) else {
        return Ok(());
    };
    let mut conn: sqlx::PgConnection = options.database("postgres").connect().await?;
    let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
        .bind(&db_name)
        .fetch_one(&mut conn)
        .await?;
    if !exists.0 {
        sqlx::query(&format!("CREATE DATABASE {}", quote_ident(&db_name)))
            .execute(&mut conn)
            .await?;
        tracing::info!(database = %db_name, "database created");
    }
    Ok(())
}

pub(crate) fn parse_database_url(url: &str) -> Result<PgConnectOptions, ConfigError> {
    PgConnectOptions::from_str(url).map_err(|e| ConfigError::Load(format!("invalid DATABASE_URL: {}", e)))
}

/// Database named in the URL, unless it is absent or the maintenance database itself.
fn target_database(options: &PgConnectOptions) -> Option<String> {
    options
        .get_database()
        .filter(|name| !name.is_empty() && *name != "postgres")
        .map(str::to_string)
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(url: &str) -> Option<String> {
        target_database(&parse_database_url(url).unwrap())
    }

    #[test]
    fn target_database_comes_from_the_url_path() {
        assert_eq!(target("postgres://u:p@localhost:5432/catalog").as_deref(), Some("catalog"));
        assert_eq!(target("postgres://localhost/catalog?sslmode=disable").as_deref(), Some("catalog"));
    }

    #[test]
    fn no_database_or_maintenance_database_skips_creation() {
        assert_eq!(target("postgres://u@host:5432"), None);
        assert_eq!(target("postgres://u@host:5432/postgres"), None);
    }

    #[test]
    fn malformed_url_is_a_config_error() {
        assert!(matches!(parse_database_url("not a url"), Err(ConfigError::Load(_))));
    }

    #[test]
    fn ddl_is_idempotent_and_qualified() {
        let ddl = schema_ddl("catalog");
        assert!(ddl.iter().all(|s| s.contains("IF NOT EXISTS")));
        assert!(ddl[0].contains("\"catalog\""));
        let membership = ddl.iter().find(|s| s.contains("filmmembership\" (")).unwrap();
        assert_eq!(membership.matches("ON DELETE CASCADE").count(), 2);
    }

    #[test]
    fn sessions_reference_users() {
        let ddl = schema_ddl("public");
        let sessions = ddl.iter().find(|s| s.contains("\"sessions\" (")).unwrap();
        assert!(sessions.contains("REFERENCES \"public\".\"users\""));
    }
}
