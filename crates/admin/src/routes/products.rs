//! Product management route handlers.

use askama::Template;
use axum::{
    Form, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use tower_sessions::Session;
use tracing::instrument;

use vitrine_core::catalog::{Category, DEFAULT_BUCKET, Product, ProductImage};
use vitrine_core::category_tree::CategoryTree;
use vitrine_core::{CategoryId, CurrencyCode, Price, ProductId};

use super::{AdminUserView, FlashView, flash_view, render};
use crate::db::{CategoryRepository, ProductRepository, RepositoryError};
use crate::error::{AppError, Result};
use crate::forms;
use crate::middleware::RequireAdminAuth;
use crate::models::{CurrentAdmin, Flash, ProductInput, set_flash};
use crate::state::AppState;

// =============================================================================
// Views
// =============================================================================

/// Product row in the listing.
#[derive(Debug, Clone)]
pub struct ProductRowView {
    pub id: i32,
    pub name: String,
    pub price: String,
    pub sizes: String,
    pub stock: u32,
    pub image_url: Option<String>,
    pub categories: String,
}

impl ProductRowView {
    fn new(product: &Product, tree: &CategoryTree, currency: CurrencyCode) -> Self {
        Self {
            id: product.id.as_i32(),
            name: product.name.clone(),
            price: Price::new(product.price, currency).display(),
            sizes: product.sizes.join(", "),
            stock: product.stock.total(),
            image_url: product.primary_image().map(|i| i.url.clone()),
            categories: product
                .category_ids
                .iter()
                .filter_map(|id| tree.get(*id))
                .map(|c| c.name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

/// One image slot in the product or kit form.
#[derive(Debug, Clone)]
pub struct ImageFieldView {
    pub url: String,
    pub zoom: f32,
    pub offset_x: f32,
    pub offset_y: f32,
    pub transform: String,
}

impl From<&ProductImage> for ImageFieldView {
    fn from(image: &ProductImage) -> Self {
        Self {
            url: image.url.clone(),
            zoom: image.frame.zoom,
            offset_x: image.frame.offset_x,
            offset_y: image.frame.offset_y,
            transform: image.frame.css_transform(),
        }
    }
}

/// Category checkbox, indented by depth.
#[derive(Debug, Clone)]
pub struct CategoryOptionView {
    pub id: i32,
    pub name: String,
    pub depth: usize,
    pub selected: bool,
}

pub(crate) fn category_options(
    categories: &[Category],
    selected: &[CategoryId],
) -> Vec<CategoryOptionView> {
    CategoryTree::new(categories)
        .flatten()
        .into_iter()
        .map(|(depth, category)| CategoryOptionView {
            id: category.id.as_i32(),
            name: category.name.clone(),
            depth,
            selected: selected.contains(&category.id),
        })
        .collect()
}

/// Stock input for one size.
#[derive(Debug, Clone)]
pub struct StockFieldView {
    /// Field suffix: the size label, or `default`.
    pub bucket: String,
    pub label: String,
    pub count: i32,
}

fn stock_fields(product: &Product) -> Vec<StockFieldView> {
    if product.sizes.is_empty() {
        return vec![StockFieldView {
            bucket: DEFAULT_BUCKET.to_string(),
            label: "Quantity".to_string(),
            count: product.stock.recorded(DEFAULT_BUCKET),
        }];
    }
    product
        .sizes
        .iter()
        .map(|size| StockFieldView {
            bucket: size.clone(),
            label: size.clone(),
            count: product.stock.recorded(size),
        })
        .collect()
}

/// Values shown in the product form.
#[derive(Debug, Clone, Default)]
pub struct ProductFormView {
    pub name: String,
    pub description: String,
    pub price: String,
    pub sizes: String,
    pub images: Vec<ImageFieldView>,
    pub customizable: bool,
    pub customization_label: String,
}

impl From<&ProductInput> for ProductFormView {
    fn from(input: &ProductInput) -> Self {
        Self {
            name: input.name.clone(),
            description: input.description.clone(),
            price: input.price.to_string(),
            sizes: input.sizes.join(", "),
            images: input.images.iter().map(ImageFieldView::from).collect(),
            customizable: input.customizable,
            customization_label: input.customization_label.clone().unwrap_or_default(),
        }
    }
}

impl From<&Product> for ProductFormView {
    fn from(product: &Product) -> Self {
        Self {
            name: product.name.clone(),
            description: product.description.clone(),
            price: product.price.to_string(),
            sizes: product.sizes.join(", "),
            images: product.images.iter().map(ImageFieldView::from).collect(),
            customizable: product.customizable,
            customization_label: product.customization_label.clone().unwrap_or_default(),
        }
    }
}

// =============================================================================
// Templates
// =============================================================================

/// Product list page template.
#[derive(Template)]
#[template(path = "products/index.html")]
pub struct ProductsIndexTemplate {
    pub admin_user: AdminUserView,
    pub current_path: String,
    pub flash: Option<FlashView>,
    pub products: Vec<ProductRowView>,
}

/// Product create/edit form template.
#[derive(Template)]
#[template(path = "products/form.html")]
pub struct ProductFormTemplate {
    pub admin_user: AdminUserView,
    pub current_path: String,
    pub flash: Option<FlashView>,
    /// `None` when creating.
    pub product_id: Option<i32>,
    pub form: ProductFormView,
    pub categories: Vec<CategoryOptionView>,
    pub stock: Vec<StockFieldView>,
    pub error: Option<String>,
}

impl ProductFormTemplate {
    fn action(&self) -> String {
        self.product_id
            .map_or_else(|| "/products".to_string(), |id| format!("/products/{id}"))
    }
}

/// Build the products router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/products", get(index).post(create))
        .route("/products/new", get(new_product))
        .route("/products/{id}", post(update))
        .route("/products/{id}/edit", get(edit))
        .route("/products/{id}/delete", post(delete))
        .route("/products/{id}/stock", post(update_stock))
}

/// Form errors the admin can fix by editing the form.
pub(crate) fn form_error(error: &AppError) -> Option<String> {
    match error {
        AppError::Validation(e) => Some(capitalize(&e.to_string())),
        AppError::Database(RepositoryError::Conflict(message)) => Some(capitalize(message)),
        _ => None,
    }
}

fn capitalize(message: &str) -> String {
    let mut chars = message.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

// =============================================================================
// Handlers
// =============================================================================

/// Product list page.
#[instrument(skip(admin, state, session))]
async fn index(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
) -> Result<Html<String>> {
    let pool = state.pool();
    let product_repo = ProductRepository::new(pool);
    let category_repo = CategoryRepository::new(pool);
    let (products, categories) = tokio::try_join!(
        product_repo.list(),
        category_repo.list(),
    )?;
    let tree = CategoryTree::new(&categories);
    let currency = state.config().currency;

    Ok(render(&ProductsIndexTemplate {
        admin_user: AdminUserView::from(&admin),
        current_path: "/products".to_string(),
        flash: flash_view(&session).await,
        products: products
            .iter()
            .map(|p| ProductRowView::new(p, &tree, currency))
            .collect(),
    }))
}

/// New product form.
#[instrument(skip(admin, state))]
async fn new_product(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
) -> Result<Html<String>> {
    let categories = CategoryRepository::new(state.pool()).list().await?;

    Ok(render(&ProductFormTemplate {
        admin_user: AdminUserView::from(&admin),
        current_path: "/products".to_string(),
        flash: None,
        product_id: None,
        form: ProductFormView {
            price: "0.00".to_string(),
            ..ProductFormView::default()
        },
        categories: category_options(&categories, &[]),
        stock: vec![],
        error: None,
    }))
}

/// Re-render the form with the submitted values and an error.
async fn rejected_form(
    state: &AppState,
    admin: &CurrentAdmin,
    product_id: Option<ProductId>,
    input: &ProductInput,
    error: String,
) -> Result<Response> {
    let categories = CategoryRepository::new(state.pool()).list().await?;
    let stock = match product_id {
        Some(id) => ProductRepository::new(state.pool())
            .get(id)
            .await?
            .map(|p| stock_fields(&p))
            .unwrap_or_default(),
        None => vec![],
    };

    let page = render(&ProductFormTemplate {
        admin_user: AdminUserView::from(admin),
        current_path: "/products".to_string(),
        flash: None,
        product_id: product_id.map(|id| id.as_i32()),
        form: ProductFormView::from(input),
        categories: category_options(&categories, &input.category_ids),
        stock,
        error: Some(error),
    });
    Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response())
}

/// Create a product.
#[instrument(skip(admin, state, session, pairs))]
async fn create(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response> {
    let input = forms::product_input(&pairs)?;

    let result = match input.validate() {
        Ok(()) => ProductRepository::new(state.pool())
            .create(&input)
            .await
            .map_err(AppError::from),
        Err(e) => Err(AppError::from(e)),
    };

    match result {
        Ok(id) => {
            set_flash(&session, Flash::success("Product created. Set its stock below.")).await?;
            Ok(Redirect::to(&format!("/products/{id}/edit")).into_response())
        }
        Err(e) => match form_error(&e) {
            Some(message) => rejected_form(&state, &admin, None, &input, message).await,
            None => Err(e),
        },
    }
}

/// Edit product form.
#[instrument(skip(admin, state, session))]
async fn edit(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<ProductId>,
) -> Result<Html<String>> {
    let pool = state.pool();
    let product_repo = ProductRepository::new(pool);
    let category_repo = CategoryRepository::new(pool);
    let (product, categories) = tokio::try_join!(
        product_repo.get(id),
        category_repo.list(),
    )?;
    let product = product.ok_or_else(|| AppError::NotFound(format!("product {id}")))?;

    Ok(render(&ProductFormTemplate {
        admin_user: AdminUserView::from(&admin),
        current_path: "/products".to_string(),
        flash: flash_view(&session).await,
        product_id: Some(id.as_i32()),
        form: ProductFormView::from(&product),
        categories: category_options(&categories, &product.category_ids),
        stock: stock_fields(&product),
        error: None,
    }))
}

/// Update a product.
#[instrument(skip(admin, state, session, pairs))]
async fn update(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<ProductId>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response> {
    let input = forms::product_input(&pairs)?;
    let repo = ProductRepository::new(state.pool());

    let previous = repo
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;

    let result = match input.validate() {
        Ok(()) => repo.update(id, &input).await.map_err(AppError::from),
        Err(e) => Err(AppError::from(e)),
    };

    match result {
        Ok(()) => {
            // Images dropped from the form are no longer referenced anywhere
            let removed = previous
                .images
                .iter()
                .filter(|old| !input.images.iter().any(|new| new.url == old.url))
                .map(|image| image.url.as_str());
            state.storage().delete_urls_best_effort(removed).await;

            set_flash(&session, Flash::success("Product saved")).await?;
            Ok(Redirect::to(&format!("/products/{id}/edit")).into_response())
        }
        Err(e) => match form_error(&e) {
            Some(message) => rejected_form(&state, &admin, Some(id), &input, message).await,
            None => Err(e),
        },
    }
}

/// Delete a product and its uploaded images.
#[instrument(skip(_admin, state, session))]
async fn delete(
    RequireAdminAuth(_admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<ProductId>,
) -> Result<Redirect> {
    let product = ProductRepository::new(state.pool()).delete(id).await?;

    state
        .storage()
        .delete_urls_best_effort(product.images.iter().map(|i| i.url.as_str()))
        .await;

    set_flash(
        &session,
        Flash::success(format!("Deleted \"{}\"", product.name)),
    )
    .await?;
    Ok(Redirect::to("/products"))
}

/// Overwrite the stock counts of a product.
#[instrument(skip(_admin, state, session, pairs))]
async fn update_stock(
    RequireAdminAuth(_admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<ProductId>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Redirect> {
    let repo = ProductRepository::new(state.pool());
    let product = repo
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;

    let stock = forms::stock_levels(&pairs, &product.sizes)?;
    repo.update_stock(id, &stock).await?;

    set_flash(&session, Flash::success("Stock updated")).await?;
    Ok(Redirect::to(&format!("/products/{id}/edit")))
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;
    use vitrine_core::catalog::StockLevels;

    use super::*;
    use crate::models::ValidationError;

    fn category(id: i32, name: &str, parent: Option<i32>) -> Category {
        Category {
            id: CategoryId::new(id),
            name: name.to_string(),
            parent_id: parent.map(CategoryId::new),
            item_order: None,
        }
    }

    #[test]
    fn test_category_options_follow_tree_order() {
        let categories = vec![
            category(1, "Roupas", None),
            category(2, "Camisetas", Some(1)),
            category(3, "Acessórios", None),
        ];

        let options = category_options(&categories, &[CategoryId::new(2)]);
        let summary: Vec<(&str, usize, bool)> = options
            .iter()
            .map(|o| (o.name.as_str(), o.depth, o.selected))
            .collect();

        assert_eq!(summary.len(), 3);
        assert!(summary.contains(&("Camisetas", 1, true)));
        assert!(summary.contains(&("Roupas", 0, false)));
    }

    #[test]
    fn test_stock_fields_per_size() {
        let product = Product {
            id: ProductId::new(1),
            name: "Camiseta".to_string(),
            description: String::new(),
            price: Decimal::TEN,
            images: vec![],
            sizes: vec!["P".to_string(), "M".to_string()],
            category_ids: vec![],
            customizable: false,
            customization_label: None,
            stock: StockLevels::per_size([("P", 4)]),
            created_at: Utc::now(),
        };

        let fields = stock_fields(&product);
        let summary: Vec<(&str, i32)> = fields.iter().map(|f| (f.bucket.as_str(), f.count)).collect();
        assert_eq!(summary, vec![("P", 4), ("M", 0)]);

        let one_size = Product {
            sizes: vec![],
            stock: StockLevels::flat(7),
            ..product
        };
        let fields = stock_fields(&one_size);
        assert_eq!(fields.len(), 1);
        assert_eq!(fields.first().map(|f| f.count), Some(7));
    }

    #[test]
    fn test_form_error_only_for_fixable_problems() {
        assert_eq!(
            form_error(&AppError::Validation(ValidationError::EmptyName)),
            Some("Name is required".to_string())
        );
        assert_eq!(
            form_error(&AppError::Database(RepositoryError::Conflict(
                "unknown category".to_string()
            ))),
            Some("Unknown category".to_string())
        );
        assert_eq!(form_error(&AppError::Internal("boom".to_string())), None);
    }
}
