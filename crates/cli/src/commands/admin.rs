//! Admin user management commands.
//!
//! # Usage
//!
//! ```bash
//! # Prompts for the password on stdin
//! vitrine-cli admin create -e owner@example.com -n "Store Owner"
//!
//! # Non-interactive
//! echo "$PASSWORD" | vitrine-cli admin create -e owner@example.com -n "Store Owner"
//!
//! vitrine-cli admin list
//! ```
//!
//! # Environment Variables
//!
//! - `ADMIN_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)

use std::io::BufRead;

use sqlx::PgPool;
use thiserror::Error;

use vitrine_admin::db::AdminUserRepository;
use vitrine_admin::services::{AdminAuthError, AdminAuthService};

use super::migrate::{self, MigrationError};

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    /// Database URL could not be resolved.
    #[error(transparent)]
    Config(#[from] MigrationError),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    /// Creating the user failed.
    #[error("{0}")]
    Auth(#[from] AdminAuthError),

    /// Listing users failed.
    #[error("{0}")]
    Repository(#[from] vitrine_admin::db::RepositoryError),

    /// Password could not be read from stdin.
    #[error("Could not read password: {0}")]
    Input(#[from] std::io::Error),
}

async fn connect() -> Result<PgPool, AdminError> {
    let database_url = migrate::database_url()?;
    tracing::info!("Connecting to database...");
    Ok(PgPool::connect(&database_url).await?)
}

fn read_password() -> Result<String, AdminError> {
    #[allow(clippy::print_stderr)]
    {
        eprint!("Password: ");
    }
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// Create a new admin user.
///
/// The password is taken from `password` when given, otherwise read from
/// stdin.
///
/// # Errors
///
/// Returns an error for an invalid email, a weak password, a duplicate
/// email or a database failure.
pub async fn create_user(
    email: &str,
    name: &str,
    password: Option<String>,
) -> Result<(), AdminError> {
    let password = match password {
        Some(password) => password,
        None => read_password()?,
    };

    let pool = connect().await?;
    let user = AdminAuthService::new(&pool)
        .create_admin(email, name, &password)
        .await?;

    tracing::info!(
        "Admin user created successfully! ID: {}, Email: {}",
        user.id,
        user.email
    );
    Ok(())
}

/// Log every admin user.
///
/// # Errors
///
/// Returns an error if the database is unreachable.
pub async fn list_users() -> Result<(), AdminError> {
    let pool = connect().await?;
    let users = AdminUserRepository::new(&pool).list().await?;

    if users.is_empty() {
        tracing::warn!("No admin users yet. Create one with `vitrine-cli admin create`.");
    }
    for user in users {
        let last_login = user
            .last_login_at
            .map_or_else(|| "never".to_string(), |at| at.to_rfc3339());
        tracing::info!("{} {} <{}> last login: {}", user.id, user.name, user.email, last_login);
    }
    Ok(())
}
