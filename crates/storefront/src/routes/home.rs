//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::State;
use tower_sessions::Session;
use tracing::instrument;
use vitrine_core::catalog::Product;
use vitrine_core::category_tree::{SortMode, sort_products};

use super::PageContext;
use crate::error::Result;
use crate::state::AppState;
use crate::views::{HighlightView, KitCardView, LayoutView, ProductCardView};

/// Newest products shown below the kits.
const HOME_PRODUCT_LIMIT: usize = 12;

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub layout: LayoutView,
    pub highlights: Vec<HighlightView>,
    pub kits: Vec<KitCardView>,
    pub products: Vec<ProductCardView>,
}

/// Display the home page.
#[instrument(skip(state, session))]
pub async fn home(State(state): State<AppState>, session: Session) -> Result<HomeTemplate> {
    let page = PageContext::load(&state, &session).await?;
    let currency = state.config().store.currency;
    let catalog = &page.catalog;

    let highlights = catalog
        .visible_highlights()
        .into_iter()
        .filter_map(|h| HighlightView::new(h, catalog, currency))
        .collect();

    let kits = catalog
        .kits_in_order()
        .into_iter()
        .map(|kit| KitCardView::new(kit, currency))
        .collect();

    let mut newest: Vec<&Product> = catalog.products.iter().collect();
    sort_products(&mut newest, SortMode::Newest, None);
    let products = newest
        .into_iter()
        .take(HOME_PRODUCT_LIMIT)
        .map(|p| ProductCardView::new(p, currency))
        .collect();

    Ok(HomeTemplate {
        layout: page.layout,
        highlights,
        kits,
        products,
    })
}
