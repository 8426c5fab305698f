//! Home carousel (highlight) route handlers.

use askama::Template;
use axum::{
    Form, Router,
    extract::{Path, State},
    response::{Html, Redirect},
    routing::{get, post},
};
use tower_sessions::Session;
use tracing::instrument;

use vitrine_core::HighlightId;
use vitrine_core::catalog::{Highlight, HighlightKind, Product};

use super::products::form_error;
use super::{AdminUserView, FlashView, flash_view, render};
use crate::db::{HighlightRepository, ProductRepository};
use crate::error::{AppError, Result};
use crate::forms;
use crate::middleware::RequireAdminAuth;
use crate::models::{Flash, set_flash};
use crate::state::AppState;

/// Slide in the sortable list.
#[derive(Debug, Clone)]
pub struct HighlightRowView {
    pub id: i32,
    pub kind: &'static str,
    pub label: String,
    pub image_url: Option<String>,
    pub image_transform: String,
    pub link_url: Option<String>,
}

impl HighlightRowView {
    fn new(highlight: &Highlight, products: &[Product]) -> Self {
        let (label, image_url, link_url) = match &highlight.kind {
            HighlightKind::Product { product_id } => {
                let product = products.iter().find(|p| p.id == *product_id);
                (
                    product.map_or_else(|| format!("Product {product_id}"), |p| p.name.clone()),
                    product.and_then(|p| p.primary_image()).map(|i| i.url.clone()),
                    Some(format!("/products/{product_id}/edit")),
                )
            }
            HighlightKind::Image {
                image_url,
                link_url,
                title,
            } => (
                title.clone().unwrap_or_else(|| "Banner".to_string()),
                Some(image_url.clone()),
                link_url.clone(),
            ),
        };

        Self {
            id: highlight.id.as_i32(),
            kind: highlight.kind.as_str(),
            label,
            image_url,
            image_transform: highlight.frame.css_transform(),
            link_url,
        }
    }
}

/// Product option for the "feature a product" form.
#[derive(Debug, Clone)]
pub struct ProductOptionView {
    pub id: i32,
    pub name: String,
}

/// Highlights page template.
#[derive(Template)]
#[template(path = "highlights/index.html")]
pub struct HighlightsIndexTemplate {
    pub admin_user: AdminUserView,
    pub current_path: String,
    pub flash: Option<FlashView>,
    pub highlights: Vec<HighlightRowView>,
    pub products: Vec<ProductOptionView>,
}

/// Build the highlights router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/highlights", get(index).post(create))
        .route("/highlights/{id}/delete", post(delete))
}

/// Highlights page.
#[instrument(skip(admin, state, session))]
async fn index(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
) -> Result<Html<String>> {
    let pool = state.pool();
    let highlight_repo = HighlightRepository::new(pool);
    let product_repo = ProductRepository::new(pool);
    let (highlights, products) = tokio::try_join!(
        highlight_repo.list(),
        product_repo.list(),
    )?;

    let mut options: Vec<ProductOptionView> = products
        .iter()
        .map(|p| ProductOptionView {
            id: p.id.as_i32(),
            name: p.name.clone(),
        })
        .collect();
    options.sort_by_key(|o| o.name.to_lowercase());

    Ok(render(&HighlightsIndexTemplate {
        admin_user: AdminUserView::from(&admin),
        current_path: "/highlights".to_string(),
        flash: flash_view(&session).await,
        highlights: highlights
            .iter()
            .map(|h| HighlightRowView::new(h, &products))
            .collect(),
        products: options,
    }))
}

/// Add a slide at the end of the carousel.
#[instrument(skip(_admin, state, session, pairs))]
async fn create(
    RequireAdminAuth(_admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Redirect> {
    let input = forms::highlight_input(&pairs)?;

    let result = match input.validate() {
        Ok(()) => HighlightRepository::new(state.pool())
            .create(&input)
            .await
            .map_err(AppError::from),
        Err(e) => Err(AppError::from(e)),
    };

    let flash = match result {
        Ok(_) => Flash::success("Highlight added"),
        Err(e) => match form_error(&e) {
            Some(message) => Flash::error(message),
            None => return Err(e),
        },
    };
    set_flash(&session, flash).await?;
    Ok(Redirect::to("/highlights"))
}

/// Remove a slide, and its banner image when it was uploaded here.
#[instrument(skip(_admin, state, session))]
async fn delete(
    RequireAdminAuth(_admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<HighlightId>,
) -> Result<Redirect> {
    let highlight = HighlightRepository::new(state.pool()).delete(id).await?;

    if let HighlightKind::Image { image_url, .. } = &highlight.kind {
        state
            .storage()
            .delete_urls_best_effort([image_url.as_str()])
            .await;
    }

    set_flash(&session, Flash::success("Highlight removed")).await?;
    Ok(Redirect::to("/highlights"))
}

#[cfg(test)]
mod tests {
    use vitrine_core::ProductId;
    use vitrine_core::catalog::ImageFrame;

    use super::*;

    #[test]
    fn test_row_for_missing_product_falls_back_to_id() {
        let highlight = Highlight {
            id: HighlightId::new(1),
            kind: HighlightKind::Product {
                product_id: ProductId::new(42),
            },
            frame: ImageFrame::default(),
            sort_order: 0,
        };

        let row = HighlightRowView::new(&highlight, &[]);
        assert_eq!(row.label, "Product 42");
        assert_eq!(row.kind, "product");
        assert_eq!(row.image_url, None);
    }

    #[test]
    fn test_row_for_banner_uses_title() {
        let highlight = Highlight {
            id: HighlightId::new(2),
            kind: HighlightKind::Image {
                image_url: "https://cdn/banner.jpg".to_string(),
                link_url: Some("/kits/1".to_string()),
                title: Some("Dia das Mães".to_string()),
            },
            frame: ImageFrame::default(),
            sort_order: 1,
        };

        let row = HighlightRowView::new(&highlight, &[]);
        assert_eq!(row.label, "Dia das Mães");
        assert_eq!(row.link_url.as_deref(), Some("/kits/1"));
    }
}
