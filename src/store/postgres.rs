//! PostgreSQL backend over a `sqlx` pool.

use super::{distinct_cast, Store, FILMOGRAPHY_COLUMNS, FILM_COLUMNS, SEARCH_COLUMNS};
use crate::config::AppConfig;
use crate::error::AppError;
use crate::migration::parse_database_url;
use crate::model::{Actor, Film, FilmSort, NewActor, NewFilm, NewUser, Session, User};
use crate::rows::{Cell, RowSet};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Column, PgConnection, Row, TypeInfo};

/// Quote identifier for PostgreSQL (safe: only from config).
pub(crate) fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Schema-qualified table names, computed once.
#[derive(Clone, Debug)]
pub(crate) struct Tables {
    pub actors: String,
    pub films: String,
    pub membership: String,
    pub users: String,
    pub sessions: String,
}

impl Tables {
    pub fn in_schema(schema: &str) -> Self {
        let q = |t: &str| format!("{}.{}", quoted(schema), quoted(t));
        Tables {
            actors: q("actors"),
            films: q("films"),
            membership: q("filmmembership"),
            users: q("users"),
            sessions: q("sessions"),
        }
    }
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    tables: Tables,
}

impl PgStore {
    pub fn new(pool: PgPool, schema: &str) -> Self {
        PgStore {
            pool,
            tables: Tables::in_schema(schema),
        }
    }

    /// Open a pool with the configured size, acquire timeout, and per-statement timeout.
    pub async fn connect(config: &AppConfig, database_url: &str) -> Result<Self, AppError> {
        let options = parse_database_url(database_url)?
            .options([("statement_timeout", config.statement_timeout.as_millis().to_string())]);
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect_with(options)
            .await?;
        tracing::info!(schema = %config.schema, "connected to PostgreSQL");
        Ok(PgStore::new(pool, &config.schema))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn fetch_rowset(&self, sql: &str, columns: &[&str], binds: &[&str]) -> Result<RowSet, AppError> {
        tracing::debug!(sql = %sql, "query");
        let mut query = sqlx::query(sql);
        for b in binds {
            query = query.bind(*b);
        }
        let rows = query.fetch_all(&self.pool).await?;
        Ok(rowset_from_pg(columns, &rows))
    }

    async fn insert_cast(&self, tx: &mut PgConnection, film_id: i64, actors: &[i64]) -> Result<(), AppError> {
        let sql = format!("INSERT INTO {} (actor, film) VALUES ($1, $2)", self.tables.membership);
        for actor in distinct_cast(actors) {
            tracing::debug!(sql = %sql, actor, film = film_id, "query (tx)");
            sqlx::query(&sql)
                .bind(actor)
                .bind(film_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| map_write_error(e, || format!("unknown actor id {}", actor)))?;
        }
        Ok(())
    }
}

/// Unique violations become `Conflict`, foreign-key violations `Validation`; anything
/// else stays a database error.
fn map_write_error(e: sqlx::Error, fk_message: impl FnOnce() -> String) -> AppError {
    if let Some(db) = e.as_database_error() {
        if db.is_unique_violation() {
            return AppError::Conflict("Email already exists".into());
        }
        if db.is_foreign_key_violation() {
            return AppError::Validation(fk_message());
        }
    }
    AppError::Db(e)
}

/// Build a [`RowSet`] with the expected column names. Rows whose width or cells cannot be
/// decoded are carried as-is and dropped later by the serializer.
fn rowset_from_pg(columns: &[&str], rows: &[PgRow]) -> RowSet {
    let mut set = RowSet::new(columns.iter().copied());
    for row in rows {
        let mut cells = Vec::with_capacity(row.len());
        for idx in 0..row.len() {
            match cell_from_pg(row, idx) {
                Ok(cell) => cells.push(cell),
                Err(e) => {
                    tracing::warn!(column = idx, error = %e, "undecodable column");
                    break;
                }
            }
        }
        set.push(cells);
    }
    set
}

/// Decode one column by its PostgreSQL type. Unknown types fall back to their raw bytes.
fn cell_from_pg(row: &PgRow, idx: usize) -> Result<Cell, sqlx::Error> {
    let type_name = row.column(idx).type_info().name().to_string();
    let cell = match type_name.as_str() {
        "INT2" => row.try_get::<Option<i16>, _>(idx)?.map(|n| Cell::Int(n.into())),
        "INT4" => row.try_get::<Option<i32>, _>(idx)?.map(|n| Cell::Int(n.into())),
        "INT8" => row.try_get::<Option<i64>, _>(idx)?.map(Cell::Int),
        "FLOAT4" => row.try_get::<Option<f32>, _>(idx)?.map(|n| Cell::Float(n.into())),
        "FLOAT8" => row.try_get::<Option<f64>, _>(idx)?.map(Cell::Float),
        "BOOL" => row.try_get::<Option<bool>, _>(idx)?.map(Cell::Bool),
        "DATE" => row
            .try_get::<Option<chrono::NaiveDate>, _>(idx)?
            .map(|d| Cell::Text(d.format("%Y-%m-%d").to_string())),
        "TIMESTAMPTZ" => row
            .try_get::<Option<DateTime<Utc>>, _>(idx)?
            .map(|d| Cell::Text(d.to_rfc3339())),
        "TIMESTAMP" => row
            .try_get::<Option<chrono::NaiveDateTime>, _>(idx)?
            .map(|d| Cell::Text(d.format("%Y-%m-%dT%H:%M:%S%.f").to_string())),
        "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" => row.try_get::<Option<String>, _>(idx)?.map(Cell::Text),
        "BYTEA" => row.try_get::<Option<Vec<u8>>, _>(idx)?.map(Cell::Bytes),
        _ => row.try_get_unchecked::<Option<Vec<u8>>, _>(idx)?.map(Cell::Bytes),
    };
    Ok(cell.unwrap_or(Cell::Null))
}

/// `%fragment%` with LIKE wildcards in the fragment escaped, so it matches literally.
pub(crate) fn like_pattern(fragment: &str) -> String {
    let mut out = String::with_capacity(fragment.len() + 2);
    out.push('%');
    for c in fragment.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('%');
    out
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").fetch_optional(&self.pool).await?;
        Ok(())
    }

    async fn email_exists(&self, email: &str) -> Result<bool, AppError> {
        let sql = format!("SELECT EXISTS(SELECT 1 FROM {} WHERE email = $1)", self.tables.users);
        let (exists,): (bool,) = sqlx::query_as(&sql).bind(email).fetch_one(&self.pool).await?;
        Ok(exists)
    }

    async fn insert_user(&self, user: &NewUser) -> Result<i64, AppError> {
        let sql = format!(
            "INSERT INTO {} (email, password, role) VALUES ($1, $2, $3) RETURNING id",
            self.tables.users
        );
        let (id,): (i64,) = sqlx::query_as(&sql)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.role)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_write_error(e, || "invalid user".into()))?;
        Ok(id)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT id, email, password, role FROM {} WHERE email = $1", self.tables.users);
        let row: Option<(i64, String, String, String)> =
            sqlx::query_as(&sql).bind(email).fetch_optional(&self.pool).await?;
        Ok(row.map(|(id, email, password_hash, role)| User { id, email, password_hash, role }))
    }

    async fn user_role(&self, id: i64) -> Result<Option<String>, AppError> {
        let sql = format!("SELECT role FROM {} WHERE id = $1", self.tables.users);
        let row: Option<(String,)> = sqlx::query_as(&sql).bind(id).fetch_optional(&self.pool).await?;
        Ok(row.map(|(role,)| role))
    }

    async fn set_user_role(&self, email: &str, role: &str) -> Result<bool, AppError> {
        let sql = format!("UPDATE {} SET role = $1 WHERE email = $2", self.tables.users);
        let done = sqlx::query(&sql).bind(role).bind(email).execute(&self.pool).await?;
        Ok(done.rows_affected() > 0)
    }

    async fn insert_session(&self, session: &Session) -> Result<(), AppError> {
        let sql = format!(
            "INSERT INTO {} (uid, cookie, expire_date) VALUES ($1, $2, $3)",
            self.tables.sessions
        );
        sqlx::query(&sql)
            .bind(session.uid)
            .bind(&session.token)
            .bind(session.expires_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_session(&self, token: &str) -> Result<Option<Session>, AppError> {
        let sql = format!("SELECT uid, cookie, expire_date FROM {} WHERE cookie = $1", self.tables.sessions);
        let row: Option<(i64, String, DateTime<Utc>)> =
            sqlx::query_as(&sql).bind(token).fetch_optional(&self.pool).await?;
        Ok(row.map(|(uid, token, expires_at)| Session { uid, token, expires_at }))
    }

    async fn delete_session(&self, token: &str) -> Result<(), AppError> {
        let sql = format!("DELETE FROM {} WHERE cookie = $1", self.tables.sessions);
        sqlx::query(&sql).bind(token).execute(&self.pool).await?;
        Ok(())
    }

    async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64, AppError> {
        let sql = format!("DELETE FROM {} WHERE expire_date < $1", self.tables.sessions);
        let done = sqlx::query(&sql).bind(now).execute(&self.pool).await?;
        Ok(done.rows_affected())
    }

    async fn insert_actor(&self, actor: &NewActor) -> Result<i64, AppError> {
        let sql = format!(
            "INSERT INTO {} (name, gender, birthday) VALUES ($1, $2, $3) RETURNING id",
            self.tables.actors
        );
        let (id,): (i64,) = sqlx::query_as(&sql)
            .bind(&actor.name)
            .bind(actor.gender.as_str())
            .bind(actor.birthday)
            .fetch_one(&self.pool)
            .await?;
        Ok(id)
    }

    async fn update_actor(&self, actor: &Actor) -> Result<bool, AppError> {
        let sql = format!(
            "UPDATE {} SET name = $1, gender = $2, birthday = $3 WHERE id = $4",
            self.tables.actors
        );
        let done = sqlx::query(&sql)
            .bind(&actor.name)
            .bind(actor.gender.as_str())
            .bind(actor.birthday)
            .bind(actor.id)
            .execute(&self.pool)
            .await?;
        Ok(done.rows_affected() > 0)
    }

    async fn delete_actor(&self, id: i64) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(&format!("DELETE FROM {} WHERE actor = $1", self.tables.membership))
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let done = sqlx::query(&format!("DELETE FROM {} WHERE id = $1", self.tables.actors))
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(done.rows_affected() > 0)
    }

    async fn actor_filmography(&self) -> Result<RowSet, AppError> {
        let sql = format!(
            "SELECT a.name AS actor_name, f.name AS film_name FROM {} AS a \
             JOIN {} AS fm ON a.id = fm.actor \
             JOIN {} AS f ON fm.film = f.id \
             ORDER BY a.name, f.name, a.id, f.id",
            self.tables.actors, self.tables.membership, self.tables.films
        );
        self.fetch_rowset(&sql, &FILMOGRAPHY_COLUMNS, &[]).await
    }

    async fn insert_film(&self, film: &NewFilm) -> Result<i64, AppError> {
        let mut tx = self.pool.begin().await?;
        let sql = format!(
            "INSERT INTO {} (name, release_date, rating) VALUES ($1, $2, $3) RETURNING id",
            self.tables.films
        );
        let (id,): (i64,) = sqlx::query_as(&sql)
            .bind(&film.name)
            .bind(film.release_date)
            .bind(film.rating)
            .fetch_one(&mut *tx)
            .await?;
        self.insert_cast(&mut tx, id, &film.actors).await?;
        tx.commit().await?;
        Ok(id)
    }

    async fn update_film(&self, film: &Film) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;
        let sql = format!(
            "UPDATE {} SET name = $1, release_date = $2, rating = $3 WHERE id = $4",
            self.tables.films
        );
        let done = sqlx::query(&sql)
            .bind(&film.name)
            .bind(film.release_date)
            .bind(film.rating)
            .bind(film.id)
            .execute(&mut *tx)
            .await?;
        if done.rows_affected() == 0 {
            return Ok(false);
        }
        sqlx::query(&format!("DELETE FROM {} WHERE film = $1", self.tables.membership))
            .bind(film.id)
            .execute(&mut *tx)
            .await?;
        self.insert_cast(&mut tx, film.id, &film.actors).await?;
        tx.commit().await?;
        Ok(true)
    }

    async fn delete_film(&self, id: i64) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(&format!("DELETE FROM {} WHERE film = $1", self.tables.membership))
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let done = sqlx::query(&format!("DELETE FROM {} WHERE id = $1", self.tables.films))
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(done.rows_affected() > 0)
    }

    async fn list_films(&self, sort: FilmSort) -> Result<RowSet, AppError> {
        let sql = format!(
            "SELECT id, name, release_date, rating FROM {} ORDER BY {} DESC, id DESC",
            self.tables.films,
            quoted(sort.column())
        );
        self.fetch_rowset(&sql, &FILM_COLUMNS, &[]).await
    }

    async fn search_films(&self, fragment: &str) -> Result<RowSet, AppError> {
        let sql = format!(
            r"SELECT DISTINCT f.name FROM {} AS f
              LEFT JOIN {} AS fm ON f.id = fm.film
              LEFT JOIN {} AS a ON fm.actor = a.id
              WHERE f.name LIKE $1 ESCAPE '\' OR a.name LIKE $1 ESCAPE '\'
              ORDER BY f.name",
            self.tables.films, self.tables.membership, self.tables.actors
        );
        let pattern = like_pattern(fragment);
        self.fetch_rowset(&sql, &SEARCH_COLUMNS, &[pattern.as_str()]).await
    }
}
