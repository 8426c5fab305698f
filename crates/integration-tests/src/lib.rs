//! Integration tests for Vitrine.
//!
//! # Running Tests
//!
//! ```bash
//! # Start the database and apply migrations
//! vitrine-cli migrate
//!
//! # Start both servers
//! cargo run -p vitrine-admin &
//! cargo run -p vitrine-storefront &
//!
//! # Run the ignored HTTP tests
//! cargo test -p vitrine-integration-tests -- --ignored
//! ```
//!
//! # Environment Variables
//!
//! - `ADMIN_DATABASE_URL` - Database both servers use (falls back to `DATABASE_URL`)
//! - `ADMIN_TEST_URL` - Admin server (default `http://localhost:3001`)
//! - `STOREFRONT_TEST_URL` - Storefront server (default `http://localhost:3000`)
//!
//! Every test creates its own admin user and catalog rows with unique
//! names, so tests can run in parallel against a shared database.

use std::time::Duration;

use reqwest::redirect::Policy;
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use vitrine_admin::db::ProductRepository;
use vitrine_admin::models::ProductInput;
use vitrine_admin::services::AdminAuthService;
use vitrine_core::ProductId;
use vitrine_core::catalog::StockLevels;

/// Password given to the admins tests create.
pub const TEST_PASSWORD: &str = "integration-test-password";

/// Shared handles for a test run.
pub struct TestContext {
    pub pool: PgPool,
    pub admin_url: String,
    pub storefront_url: String,
}

impl TestContext {
    /// Connect to the test database and read the server URLs.
    ///
    /// # Panics
    ///
    /// Panics if no database URL is configured or it cannot be reached.
    pub async fn new() -> Self {
        dotenvy::dotenv().ok();

        let database_url = std::env::var("ADMIN_DATABASE_URL")
            .or_else(|_| std::env::var("DATABASE_URL"))
            .expect("ADMIN_DATABASE_URL or DATABASE_URL must be set");
        let pool = PgPool::connect(&database_url)
            .await
            .expect("Failed to connect to test database");

        Self {
            pool,
            admin_url: env_or("ADMIN_TEST_URL", "http://localhost:3001"),
            storefront_url: env_or("STOREFRONT_TEST_URL", "http://localhost:3000"),
        }
    }

    /// Admin URL for `path`.
    #[must_use]
    pub fn admin(&self, path: &str) -> String {
        format!("{}{path}", self.admin_url)
    }

    /// Storefront URL for `path`.
    #[must_use]
    pub fn storefront(&self, path: &str) -> String {
        format!("{}{path}", self.storefront_url)
    }

    /// Create a fresh admin user and return its email.
    ///
    /// # Panics
    ///
    /// Panics if the user cannot be created.
    pub async fn create_admin(&self) -> String {
        let email = format!("admin-{}@example.com", Uuid::new_v4().simple());
        AdminAuthService::new(&self.pool)
            .create_admin(&email, "Integration Test", TEST_PASSWORD)
            .await
            .expect("Failed to create test admin");
        email
    }

    /// A client logged into the admin panel as a fresh user.
    ///
    /// # Panics
    ///
    /// Panics if the login does not redirect to the dashboard.
    pub async fn admin_client(&self) -> Client {
        let email = self.create_admin().await;
        let client = client();

        let resp = client
            .post(self.admin("/login"))
            .form(&[("email", email.as_str()), ("password", TEST_PASSWORD)])
            .send()
            .await
            .expect("Failed to log in");
        assert_eq!(resp.status(), StatusCode::SEE_OTHER, "login should redirect");

        client
    }

    /// Insert a one-size product with `stock` units directly.
    ///
    /// # Panics
    ///
    /// Panics on database errors.
    pub async fn create_product(&self, name: &str, price: Decimal, stock: i32) -> ProductId {
        let repo = ProductRepository::new(&self.pool);
        let id = repo
            .create(&ProductInput {
                name: name.to_string(),
                description: "Created by integration tests".to_string(),
                price,
                images: vec![],
                sizes: vec![],
                category_ids: vec![],
                customizable: false,
                customization_label: None,
            })
            .await
            .expect("Failed to create product");
        repo.update_stock(id, &StockLevels::flat(stock))
            .await
            .expect("Failed to set stock");
        id
    }

    /// Remove a product created by a test.
    pub async fn delete_product(&self, id: ProductId) {
        let _ = ProductRepository::new(&self.pool).delete(id).await;
    }
}

/// HTTP client with a cookie store that does not follow redirects.
///
/// # Panics
///
/// Panics if the client cannot be built.
#[must_use]
pub fn client() -> Client {
    Client::builder()
        .cookie_store(true)
        .redirect(Policy::none())
        .build()
        .expect("Failed to create HTTP client")
}

/// Unique name for rows a test creates.
#[must_use]
pub fn unique_name(prefix: &str) -> String {
    format!("{prefix} {}", Uuid::new_v4().simple())
}

/// Poll `check` until it returns true, for state behind the storefront's
/// catalog cache.
pub async fn eventually<F, Fut>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if check().await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_secs(2)).await;
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
