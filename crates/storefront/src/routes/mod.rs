//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Home page (highlights, kits, newest products)
//!
//! # Products
//! GET  /products               - Product grid (?category=&sort=&q=)
//! GET  /products/{id}          - Product detail
//! GET  /products/{id}/modal    - Product detail modal fragment (HTMX)
//!
//! # Kits
//! GET  /kits/{id}              - Kit detail with a size choice per product
//!
//! # Cart (HTMX fragments)
//! GET  /cart                   - Cart page
//! GET  /cart/modal             - Cart modal fragment
//! POST /cart/add               - Add product (returns count badge, triggers cart-updated)
//! POST /cart/add-kit           - Add kit (returns count badge, triggers cart-updated)
//! POST /cart/update            - Set quantity (returns cart_items fragment)
//! POST /cart/remove            - Remove line (returns cart_items fragment)
//! GET  /cart/count             - Cart count badge (fragment)
//!
//! # Checkout
//! POST /checkout               - Redirect to the WhatsApp order conversation
//! ```

pub mod cart;
pub mod checkout;
pub mod home;
pub mod kits;
pub mod products;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_sessions::Session;
use vitrine_core::cart::Cart;
use vitrine_core::catalog::Catalog;
use vitrine_core::category_tree::CategoryTree;

use crate::error::Result;
use crate::models::session::load_cart;
use crate::state::AppState;
use crate::views::LayoutView;

/// What every full page needs: the catalog snapshot, its category tree,
/// the session cart and the layout built from them.
pub struct PageContext {
    pub catalog: Arc<Catalog>,
    pub tree: CategoryTree,
    pub cart: Cart,
    pub layout: LayoutView,
}

impl PageContext {
    /// Load the catalog snapshot and the shopper's cart.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` when the catalog cannot be loaded.
    pub async fn load(state: &AppState, session: &Session) -> Result<Self> {
        let catalog = state.catalog().snapshot().await?;
        let tree = CategoryTree::new(&catalog.categories);
        let cart = load_cart(session).await;
        let layout = LayoutView::new(&state.config().store, &tree, &cart);

        Ok(Self {
            catalog,
            tree,
            cart,
            layout,
        })
    }
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{id}", get(products::show))
        .route("/{id}/modal", get(products::modal))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/modal", get(cart::modal))
        .route("/add", post(cart::add))
        .route("/add-kit", post(cart::add_kit))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/count", get(cart::count))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .nest("/products", product_routes())
        .route("/kits/{id}", get(kits::show))
        .nest("/cart", cart_routes())
        .route("/checkout", post(checkout::checkout))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;
    use tower_sessions::{MemoryStore, SessionManagerLayer};

    use super::*;
    use crate::config::test_config;

    /// Router with an in-memory session store and a pool that never connects.
    fn test_app() -> Router {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/vitrine_test")
            .unwrap();
        routes()
            .layer(SessionManagerLayer::new(MemoryStore::default()))
            .with_state(AppState::new(test_config(), pool))
    }

    async fn body_text(response: axum::response::Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_empty_cart_count() {
        let response = test_app()
            .oneshot(Request::get("/cart/count").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains('0'));
    }

    #[tokio::test]
    async fn test_non_numeric_category_is_bad_request() {
        let response = test_app()
            .oneshot(
                Request::get("/products?category=shirts")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_add_kit_requires_kit_id() {
        let response = test_app()
            .oneshot(
                Request::post("/cart/add-kit")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from("quantity=1&size_3=M"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let response = test_app()
            .oneshot(Request::get("/account").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
