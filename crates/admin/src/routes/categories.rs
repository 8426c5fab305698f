//! Category management route handlers.
//!
//! The category page lists the tree with inline rename/move forms. Each
//! category also has a drag-and-drop page for its featured product order,
//! saved through `POST /api/categories/{id}/order`.

use askama::Template;
use axum::{
    Form, Router,
    extract::{Path, State},
    response::{Html, Redirect},
    routing::{get, post},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use vitrine_core::catalog::{Category, Product};
use vitrine_core::category_tree::{CategoryTree, SortMode, sort_products};
use vitrine_core::{CategoryId, ProductId};

use super::{AdminUserView, FlashView, flash_view, render};
use crate::db::{CategoryRepository, ProductRepository};
use crate::error::{AppError, Result};
use crate::middleware::RequireAdminAuth;
use crate::models::{CategoryInput, Flash, ValidationError, set_flash};
use crate::state::AppState;

/// Category row with its indentation and the parents it may move under.
#[derive(Debug, Clone)]
pub struct CategoryRowView {
    pub id: i32,
    pub name: String,
    pub depth: usize,
    pub parent_id: Option<i32>,
    pub product_count: usize,
    pub has_custom_order: bool,
    /// Valid parents: everything except itself and its descendants.
    pub parent_options: Vec<ParentOptionView>,
}

#[derive(Debug, Clone)]
pub struct ParentOptionView {
    pub id: i32,
    pub name: String,
    pub depth: usize,
}

/// Product card on the order page.
#[derive(Debug, Clone)]
pub struct OrderItemView {
    pub id: i32,
    pub name: String,
    pub image_url: Option<String>,
    pub image_transform: String,
}

/// Category list page template.
#[derive(Template)]
#[template(path = "categories/index.html")]
pub struct CategoriesIndexTemplate {
    pub admin_user: AdminUserView,
    pub current_path: String,
    pub flash: Option<FlashView>,
    pub categories: Vec<CategoryRowView>,
    /// Every category, for the create form's parent select.
    pub all: Vec<ParentOptionView>,
}

/// Product order page template.
#[derive(Template)]
#[template(path = "categories/order.html")]
pub struct CategoryOrderTemplate {
    pub admin_user: AdminUserView,
    pub current_path: String,
    pub flash: Option<FlashView>,
    pub category_id: i32,
    pub category_name: String,
    pub items: Vec<OrderItemView>,
}

/// Category create/edit form input.
#[derive(Debug, Deserialize)]
pub struct CategoryForm {
    pub name: String,
    #[serde(default)]
    pub parent_id: String,
}

impl CategoryForm {
    fn into_input(self) -> Result<CategoryInput> {
        let parent = self.parent_id.trim();
        let parent_id = if parent.is_empty() {
            None
        } else {
            Some(
                parent
                    .parse::<CategoryId>()
                    .map_err(|_| AppError::BadRequest(format!("invalid parent_id: {parent}")))?,
            )
        };
        Ok(CategoryInput {
            name: self.name.trim().to_string(),
            parent_id,
        })
    }
}

fn rows(categories: &[Category], products: &[Product]) -> Vec<CategoryRowView> {
    let tree = CategoryTree::new(categories);
    let flat = tree.flatten();

    flat.iter()
        .map(|(depth, category)| {
            let excluded = tree.descendants(category.id);
            CategoryRowView {
                id: category.id.as_i32(),
                name: category.name.clone(),
                depth: *depth,
                parent_id: category.parent_id.map(|p| p.as_i32()),
                product_count: tree.filter_products(products, Some(category.id)).len(),
                has_custom_order: category.item_order.is_some(),
                parent_options: flat
                    .iter()
                    .filter(|(_, c)| !excluded.contains(&c.id))
                    .map(|(depth, c)| ParentOptionView {
                        id: c.id.as_i32(),
                        name: c.name.clone(),
                        depth: *depth,
                    })
                    .collect(),
            }
        })
        .collect()
}

/// Products of a category (descendants included) in their featured order.
///
/// This is the list the order page shows and the order API validates against.
#[must_use]
pub fn featured_order(categories: &[Category], products: &[Product], id: CategoryId) -> Vec<ProductId> {
    let tree = CategoryTree::new(categories);
    let mut members = tree.filter_products(products, Some(id));
    sort_products(&mut members, SortMode::Featured, tree.get(id));
    members.into_iter().map(|p| p.id).collect()
}

/// Build the categories router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/categories", get(index).post(create))
        .route("/categories/{id}", post(update))
        .route("/categories/{id}/delete", post(delete))
        .route("/categories/{id}/order", get(order_page))
}

/// Category list page.
#[instrument(skip(admin, state, session))]
async fn index(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
) -> Result<Html<String>> {
    let pool = state.pool();
    let category_repo = CategoryRepository::new(pool);
    let product_repo = ProductRepository::new(pool);
    let (categories, products) = tokio::try_join!(
        category_repo.list(),
        product_repo.list(),
    )?;

    let rows = rows(&categories, &products);
    let all = rows
        .iter()
        .map(|r| ParentOptionView {
            id: r.id,
            name: r.name.clone(),
            depth: r.depth,
        })
        .collect();

    Ok(render(&CategoriesIndexTemplate {
        admin_user: AdminUserView::from(&admin),
        current_path: "/categories".to_string(),
        flash: flash_view(&session).await,
        categories: rows,
        all,
    }))
}

/// Flash a fixable error, or propagate anything else.
async fn flash_or_fail(session: &Session, error: AppError) -> Result<Redirect> {
    match super::products::form_error(&error) {
        Some(message) => {
            set_flash(session, Flash::error(message)).await?;
            Ok(Redirect::to("/categories"))
        }
        None => Err(error),
    }
}

/// Create a category.
#[instrument(skip(_admin, state, session))]
async fn create(
    RequireAdminAuth(_admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<CategoryForm>,
) -> Result<Redirect> {
    let input = form.into_input()?;
    if let Err(e) = input.validate() {
        return flash_or_fail(&session, e.into()).await;
    }

    match CategoryRepository::new(state.pool()).create(&input).await {
        Ok(_) => {
            set_flash(&session, Flash::success(format!("Created \"{}\"", input.name))).await?;
            Ok(Redirect::to("/categories"))
        }
        Err(e) => flash_or_fail(&session, e.into()).await,
    }
}

/// Rename or move a category.
#[instrument(skip(_admin, state, session))]
async fn update(
    RequireAdminAuth(_admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<CategoryId>,
    Form(form): Form<CategoryForm>,
) -> Result<Redirect> {
    let input = form.into_input()?;
    if let Err(e) = input.validate() {
        return flash_or_fail(&session, e.into()).await;
    }

    let repo = CategoryRepository::new(state.pool());
    let categories = repo.list().await?;
    let tree = CategoryTree::new(&categories);
    if tree.get(id).is_none() {
        return Err(AppError::NotFound(format!("category {id}")));
    }
    if tree.would_create_cycle(id, input.parent_id) {
        return flash_or_fail(&session, ValidationError::CategoryCycle.into()).await;
    }

    match repo.update(id, &input).await {
        Ok(()) => {
            set_flash(&session, Flash::success(format!("Saved \"{}\"", input.name))).await?;
            Ok(Redirect::to("/categories"))
        }
        Err(e) => flash_or_fail(&session, e.into()).await,
    }
}

/// Delete a category.
#[instrument(skip(_admin, state, session))]
async fn delete(
    RequireAdminAuth(_admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<CategoryId>,
) -> Result<Redirect> {
    CategoryRepository::new(state.pool()).delete(id).await?;
    set_flash(&session, Flash::success("Category deleted")).await?;
    Ok(Redirect::to("/categories"))
}

/// Drag-and-drop product order page.
#[instrument(skip(admin, state))]
async fn order_page(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<CategoryId>,
) -> Result<Html<String>> {
    let pool = state.pool();
    let category_repo = CategoryRepository::new(pool);
    let product_repo = ProductRepository::new(pool);
    let (categories, products) = tokio::try_join!(
        category_repo.list(),
        product_repo.list(),
    )?;
    let category = categories
        .iter()
        .find(|c| c.id == id)
        .ok_or_else(|| AppError::NotFound(format!("category {id}")))?;

    let items = featured_order(&categories, &products, id)
        .into_iter()
        .filter_map(|pid| products.iter().find(|p| p.id == pid))
        .map(|p| {
            let image = p.primary_image();
            OrderItemView {
                id: p.id.as_i32(),
                name: p.name.clone(),
                image_url: image.map(|i| i.url.clone()),
                image_transform: image.map(|i| i.frame.css_transform()).unwrap_or_default(),
            }
        })
        .collect();

    Ok(render(&CategoryOrderTemplate {
        admin_user: AdminUserView::from(&admin),
        current_path: "/categories".to_string(),
        flash: None,
        category_id: id.as_i32(),
        category_name: category.name.clone(),
        items,
    }))
}
