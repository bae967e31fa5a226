//! Film catalog: actors, films, and their cast memberships over HTTP, with cookie sessions
//! restricted to administrators for every write.

pub mod auth;
pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod migration;
pub mod model;
pub mod password;
pub mod response;
pub mod routes;
pub mod rows;
pub mod service;
pub mod session;
pub mod state;
pub mod store;

pub use config::AppConfig;
pub use error::{AppError, ConfigError};
pub use migration::{ensure_database_exists, ensure_schema};
pub use routes::app;
pub use rows::{serialize_rows, Cell, RowSet};
pub use session::SessionStore;
pub use state::AppState;
pub use store::{MemoryStore, PgStore, Store};
