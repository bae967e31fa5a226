//! Catalog server: reads configuration from the environment, prepares the store, and
//! serves the HTTP API until interrupted.

use film_catalog::service::AccountService;
use film_catalog::{app, ensure_database_exists, ensure_schema, AppConfig, AppState, MemoryStore, PgStore, Store};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("film_catalog=info,tower_http=info")),
        )
        .init();

    let config = AppConfig::from_env()?;

    let store: Arc<dyn Store> = match config.database_url.as_deref() {
        Some(url) => {
            ensure_database_exists(url).await?;
            let pg = PgStore::connect(&config, url).await?;
            ensure_schema(pg.pool(), &config.schema).await?;
            Arc::new(pg)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; running on the in-memory store, data will not survive restarts");
            Arc::new(MemoryStore::new())
        }
    };

    let state = AppState::new(store, &config)?;

    if let Some(admin) = &config.admin {
        AccountService::ensure_admin(state.store.as_ref(), &state.hasher, &admin.email, &admin.password).await?;
    }

    let sweeper = if config.session_sweep_interval.is_zero() {
        tracing::info!("session sweep disabled; expired sessions are removed on access only");
        None
    } else {
        Some(state.sessions.clone().spawn_sweeper(config.session_sweep_interval))
    };

    let listener = TcpListener::bind(config.bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app(state))
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("shutting down");
        })
        .await?;

    if let Some(handle) = sweeper {
        handle.abort();
    }
    Ok(())
}
