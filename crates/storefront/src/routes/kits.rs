//! Kit route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Path, State};
use tower_sessions::Session;
use tracing::instrument;
use vitrine_core::KitId;
use vitrine_core::catalog::CatalogLookup;

use super::PageContext;
use crate::error::{AppError, Result};
use crate::state::AppState;
use crate::views::{KitDetailView, LayoutView};

/// Kit detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "kits/show.html")]
pub struct KitShowTemplate {
    pub layout: LayoutView,
    pub kit: KitDetailView,
}

/// Display a kit with a size choice for each of its products.
#[instrument(skip(state, session))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<KitId>,
) -> Result<KitShowTemplate> {
    let page = PageContext::load(&state, &session).await?;
    let kit = page
        .catalog
        .kit(id)
        .ok_or_else(|| AppError::NotFound(format!("kit {id}")))?;
    let kit = KitDetailView::new(kit, &page.catalog, state.config().store.currency);

    Ok(KitShowTemplate {
        layout: page.layout,
        kit,
    })
}
