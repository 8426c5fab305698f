//! Database operations for the admin panel.
//!
//! The admin owns the catalog schema and is the only writer.
//!
//! ## Tables
//!
//! - `products`, `product_categories` - Products and their categories
//! - `categories` - Category tree with optional explicit product order
//! - `kits`, `kit_products` - Bundles and their component products
//! - `highlights` - Home page carousel slides
//! - `admin_users` - Admin logins (argon2 password hashes)
//! - `tower_sessions.session` - Session storage (shared with the storefront)
//!
//! # Migrations
//!
//! Migrations are stored in `crates/admin/migrations/` and run via:
//! ```bash
//! cargo run -p vitrine-cli -- migrate
//! ```

pub mod admin_users;
pub mod categories;
pub mod highlights;
pub mod kits;
pub mod products;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;
use vitrine_core::reorder::ReorderError;

pub use admin_users::AdminUserRepository;
pub use categories::CategoryRepository;
pub use highlights::HighlightRepository;
pub use kits::KitRepository;
pub use products::ProductRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// A submitted order did not match the stored items.
    #[error("invalid order: {0}")]
    Reorder(#[from] ReorderError),
}

/// Map unique and foreign key violations to `Conflict`.
pub(crate) fn map_constraint(e: sqlx::Error, message: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && (db_err.is_unique_violation() || db_err.is_foreign_key_violation())
    {
        return RepositoryError::Conflict(message.to_owned());
    }
    RepositoryError::Database(e)
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
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
