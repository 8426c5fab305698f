//! HTTP route handlers for admin.
//!
//! # Route Structure
//!
//! ```text
//! GET  /login, POST /login, POST /logout
//!
//! GET  /                                  Dashboard
//!
//! GET  /products, GET /products/new, POST /products
//! GET  /products/{id}/edit, POST /products/{id}, POST /products/{id}/delete
//! POST /products/{id}/stock
//!
//! GET  /categories, POST /categories
//! POST /categories/{id}, POST /categories/{id}/delete
//! GET  /categories/{id}/order
//!
//! GET  /kits, GET /kits/new, POST /kits
//! GET  /kits/{id}/edit, POST /kits/{id}, POST /kits/{id}/delete
//!
//! GET  /highlights, POST /highlights, POST /highlights/{id}/delete
//!
//! POST /api/kits/reorder
//! POST /api/highlights/reorder
//! POST /api/categories/{id}/order
//! POST /api/uploads
//! ```

pub mod api;
pub mod auth;
pub mod categories;
pub mod dashboard;
pub mod highlights;
pub mod kits;
pub mod products;

use askama::Template;
use axum::{Router, response::Html, routing::get};
use tower_sessions::Session;

use crate::models::{CurrentAdmin, Flash, take_flash};
use crate::state::AppState;

/// Admin user view for templates.
#[derive(Debug, Clone)]
pub struct AdminUserView {
    pub name: String,
    pub email: String,
}

impl From<&CurrentAdmin> for AdminUserView {
    fn from(admin: &CurrentAdmin) -> Self {
        Self {
            name: admin.name.clone(),
            email: admin.email.to_string(),
        }
    }
}

/// Flash message view for templates.
#[derive(Debug, Clone)]
pub struct FlashView {
    pub level: &'static str,
    pub message: String,
}

impl From<Flash> for FlashView {
    fn from(flash: Flash) -> Self {
        Self {
            level: flash.level.as_str(),
            message: flash.message,
        }
    }
}

/// Take the pending flash message for the page being rendered.
pub(crate) async fn flash_view(session: &Session) -> Option<FlashView> {
    take_flash(session).await.map(FlashView::from)
}

/// Render a template, logging failures instead of propagating them.
pub(crate) fn render(template: &impl Template) -> Html<String> {
    Html(template.render().unwrap_or_else(|e| {
        tracing::error!("Template render error: {}", e);
        "Internal Server Error".to_string()
    }))
}

/// Build the complete admin router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(dashboard::dashboard))
        .merge(auth::router())
        .merge(products::router())
        .merge(categories::router())
        .merge(kits::router())
        .merge(highlights::router())
        .merge(api::router())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;
    use tower_sessions::{MemoryStore, SessionManagerLayer};

    use super::*;
    use crate::config::test_config;

    fn test_app() -> Router {
        let config = test_config();
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/vitrine_test")
            .unwrap();
        let state = AppState::new(config, pool).unwrap();

        routes()
            .layer(SessionManagerLayer::new(MemoryStore::default()))
            .with_state(state)
    }

    async fn send(request: Request<Body>) -> axum::response::Response {
        test_app().oneshot(request).await.unwrap()
    }

    #[tokio::test]
    async fn test_login_page_is_public() {
        let response = send(Request::get("/login").body(Body::empty()).unwrap()).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_pages_redirect_to_login() {
        for path in ["/", "/products", "/categories", "/kits/new", "/highlights"] {
            let response = send(Request::get(path).body(Body::empty()).unwrap()).await;
            assert_eq!(response.status(), StatusCode::SEE_OTHER, "{path}");
            assert_eq!(response.headers()[header::LOCATION], "/login", "{path}");
        }
    }

    #[tokio::test]
    async fn test_api_requires_auth() {
        let response = send(
            Request::post("/api/kits/reorder")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"ids":[1,2]}"#))
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
