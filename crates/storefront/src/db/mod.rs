//! Database access for the storefront.
//!
//! The storefront only reads the catalog tables. Schema and migrations are
//! owned by the admin crate (`crates/admin/migrations/`) and applied with:
//! ```bash
//! cargo run -p vitrine-cli -- migrate
//! ```
//!
//! The session table (`tower_sessions.session`) holds shopper carts.

pub mod catalog;

use std::sync::Arc;
use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use catalog::CatalogRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// A load shared by concurrent callers failed.
    #[error(transparent)]
    Shared(Arc<RepositoryError>),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
