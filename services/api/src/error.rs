//! services/api/src/error.rs
//!
//! Startup and wiring failures for the `api` binary. Request-time failures are
//! mapped to status codes in the web layer instead.

use crate::config::ConfigError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Missing or malformed environment settings.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Connecting the PostgreSQL pool failed.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// A migration under `services/api/migrations` could not be applied.
    #[error("Migration Error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Binding the listener or serving connections failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Anything else that stops the server from starting, such as a bad CORS origin.
    #[error("Startup error: {0}")]
    Internal(String),
}
