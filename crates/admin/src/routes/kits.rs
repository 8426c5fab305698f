//! Kit management route handlers.

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

use vitrine_core::catalog::{Kit, Product};
use vitrine_core::{CurrencyCode, KitId, Price, ProductId};

use super::products::{ImageFieldView, form_error};
use super::{AdminUserView, FlashView, flash_view, render};
use crate::db::{KitRepository, ProductRepository};
use crate::error::{AppError, Result};
use crate::forms;
use crate::middleware::RequireAdminAuth;
use crate::models::{CurrentAdmin, Flash, KitInput, set_flash};
use crate::state::AppState;

/// Kit card in the sortable list.
#[derive(Debug, Clone)]
pub struct KitRowView {
    pub id: i32,
    pub name: String,
    pub price: String,
    /// Price after discount, when a discount is set.
    pub final_price: Option<String>,
    pub products: String,
    pub image_url: Option<String>,
}

impl KitRowView {
    fn new(kit: &Kit, products: &[Product], currency: CurrencyCode) -> Self {
        Self {
            id: kit.id.as_i32(),
            name: kit.name.clone(),
            price: Price::new(kit.price, currency).display(),
            final_price: kit
                .has_discount()
                .then(|| Price::new(kit.final_price(), currency).display()),
            products: kit
                .product_ids
                .iter()
                .filter_map(|id| products.iter().find(|p| p.id == *id))
                .map(|p| p.name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            image_url: kit.primary_image().map(|i| i.url.clone()),
        }
    }
}

/// Component product choice; selected products come first in kit order.
#[derive(Debug, Clone)]
pub struct ProductChoiceView {
    pub id: i32,
    pub name: String,
    pub selected: bool,
}

fn product_choices(products: &[Product], selected: &[ProductId]) -> Vec<ProductChoiceView> {
    let chosen = selected
        .iter()
        .filter_map(|id| products.iter().find(|p| p.id == *id))
        .map(|p| ProductChoiceView {
            id: p.id.as_i32(),
            name: p.name.clone(),
            selected: true,
        });

    let mut rest: Vec<&Product> = products
        .iter()
        .filter(|p| !selected.contains(&p.id))
        .collect();
    rest.sort_by_key(|p| p.name.to_lowercase());

    chosen
        .chain(rest.into_iter().map(|p| ProductChoiceView {
            id: p.id.as_i32(),
            name: p.name.clone(),
            selected: false,
        }))
        .collect()
}

/// Values shown in the kit form.
#[derive(Debug, Clone, Default)]
pub struct KitFormView {
    pub name: String,
    pub description: String,
    pub price: String,
    pub discount_percent: String,
    pub images: Vec<ImageFieldView>,
}

impl From<&KitInput> for KitFormView {
    fn from(input: &KitInput) -> Self {
        Self {
            name: input.name.clone(),
            description: input.description.clone(),
            price: input.price.to_string(),
            discount_percent: input
                .discount_percent
                .map(|d| d.normalize().to_string())
                .unwrap_or_default(),
            images: input.images.iter().map(ImageFieldView::from).collect(),
        }
    }
}

impl From<&Kit> for KitFormView {
    fn from(kit: &Kit) -> Self {
        Self {
            name: kit.name.clone(),
            description: kit.description.clone(),
            price: kit.price.to_string(),
            discount_percent: kit
                .discount_percent
                .map(|d| d.normalize().to_string())
                .unwrap_or_default(),
            images: kit.images.iter().map(ImageFieldView::from).collect(),
        }
    }
}

/// Kit list page template.
#[derive(Template)]
#[template(path = "kits/index.html")]
pub struct KitsIndexTemplate {
    pub admin_user: AdminUserView,
    pub current_path: String,
    pub flash: Option<FlashView>,
    pub kits: Vec<KitRowView>,
}

/// Kit create/edit form template.
#[derive(Template)]
#[template(path = "kits/form.html")]
pub struct KitFormTemplate {
    pub admin_user: AdminUserView,
    pub current_path: String,
    pub flash: Option<FlashView>,
    pub kit_id: Option<i32>,
    pub form: KitFormView,
    pub products: Vec<ProductChoiceView>,
    pub error: Option<String>,
}

impl KitFormTemplate {
    fn action(&self) -> String {
        self.kit_id
            .map_or_else(|| "/kits".to_string(), |id| format!("/kits/{id}"))
    }
}

/// Build the kits router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/kits", get(index).post(create))
        .route("/kits/new", get(new_kit))
        .route("/kits/{id}", post(update))
        .route("/kits/{id}/edit", get(edit))
        .route("/kits/{id}/delete", post(delete))
}

/// Kit list page, in storefront order.
#[instrument(skip(admin, state, session))]
async fn index(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
) -> Result<Html<String>> {
    let pool = state.pool();
    let kit_repo = KitRepository::new(pool);
    let product_repo = ProductRepository::new(pool);
    let (kits, products) = tokio::try_join!(
        kit_repo.list(),
        product_repo.list(),
    )?;
    let currency = state.config().currency;

    Ok(render(&KitsIndexTemplate {
        admin_user: AdminUserView::from(&admin),
        current_path: "/kits".to_string(),
        flash: flash_view(&session).await,
        kits: kits
            .iter()
            .map(|k| KitRowView::new(k, &products, currency))
            .collect(),
    }))
}

/// New kit form.
#[instrument(skip(admin, state))]
async fn new_kit(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
) -> Result<Html<String>> {
    let products = ProductRepository::new(state.pool()).list().await?;

    Ok(render(&KitFormTemplate {
        admin_user: AdminUserView::from(&admin),
        current_path: "/kits".to_string(),
        flash: None,
        kit_id: None,
        form: KitFormView {
            price: "0.00".to_string(),
            ..KitFormView::default()
        },
        products: product_choices(&products, &[]),
        error: None,
    }))
}

async fn rejected_form(
    state: &AppState,
    admin: &CurrentAdmin,
    kit_id: Option<KitId>,
    input: &KitInput,
    error: String,
) -> Result<Response> {
    let products = ProductRepository::new(state.pool()).list().await?;

    let page = render(&KitFormTemplate {
        admin_user: AdminUserView::from(admin),
        current_path: "/kits".to_string(),
        flash: None,
        kit_id: kit_id.map(|id| id.as_i32()),
        form: KitFormView::from(input),
        products: product_choices(&products, &input.product_ids),
        error: Some(error),
    });
    Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response())
}

/// Create a kit.
#[instrument(skip(admin, state, session, pairs))]
async fn create(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response> {
    let input = forms::kit_input(&pairs)?;

    let result = match input.validate() {
        Ok(()) => KitRepository::new(state.pool())
            .create(&input)
            .await
            .map_err(AppError::from),
        Err(e) => Err(AppError::from(e)),
    };

    match result {
        Ok(_) => {
            set_flash(&session, Flash::success(format!("Created \"{}\"", input.name))).await?;
            Ok(Redirect::to("/kits").into_response())
        }
        Err(e) => match form_error(&e) {
            Some(message) => rejected_form(&state, &admin, None, &input, message).await,
            None => Err(e),
        },
    }
}

/// Edit kit form.
#[instrument(skip(admin, state))]
async fn edit(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<KitId>,
) -> Result<Html<String>> {
    let pool = state.pool();
    let kit_repo = KitRepository::new(pool);
    let product_repo = ProductRepository::new(pool);
    let (kit, products) = tokio::try_join!(
        kit_repo.get(id),
        product_repo.list(),
    )?;
    let kit = kit.ok_or_else(|| AppError::NotFound(format!("kit {id}")))?;

    Ok(render(&KitFormTemplate {
        admin_user: AdminUserView::from(&admin),
        current_path: "/kits".to_string(),
        flash: None,
        kit_id: Some(id.as_i32()),
        form: KitFormView::from(&kit),
        products: product_choices(&products, &kit.product_ids),
        error: None,
    }))
}

/// Update a kit.
#[instrument(skip(admin, state, session, pairs))]
async fn update(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<KitId>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response> {
    let input = forms::kit_input(&pairs)?;
    let repo = KitRepository::new(state.pool());
    let previous = repo
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("kit {id}")))?;

    let result = match input.validate() {
        Ok(()) => repo.update(id, &input).await.map_err(AppError::from),
        Err(e) => Err(AppError::from(e)),
    };

    match result {
        Ok(()) => {
            let removed = previous
                .images
                .iter()
                .filter(|old| !input.images.iter().any(|new| new.url == old.url))
                .map(|image| image.url.as_str());
            state.storage().delete_urls_best_effort(removed).await;

            set_flash(&session, Flash::success(format!("Saved \"{}\"", input.name))).await?;
            Ok(Redirect::to("/kits").into_response())
        }
        Err(e) => match form_error(&e) {
            Some(message) => rejected_form(&state, &admin, Some(id), &input, message).await,
            None => Err(e),
        },
    }
}

/// Delete a kit and its uploaded images.
#[instrument(skip(_admin, state, session))]
async fn delete(
    RequireAdminAuth(_admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<KitId>,
) -> Result<Redirect> {
    let kit = KitRepository::new(state.pool()).delete(id).await?;

    state
        .storage()
        .delete_urls_best_effort(kit.images.iter().map(|i| i.url.as_str()))
        .await;

    set_flash(&session, Flash::success(format!("Deleted \"{}\"", kit.name))).await?;
    Ok(Redirect::to("/kits"))
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;
    use vitrine_core::catalog::StockLevels;

    use super::*;

    fn product(id: i32, name: &str) -> Product {
        Product {
            id: ProductId::new(id),
            name: name.to_string(),
            description: String::new(),
            price: Decimal::new(3000, 2),
            images: vec![],
            sizes: vec![],
            category_ids: vec![],
            customizable: false,
            customization_label: None,
            stock: StockLevels::flat(3),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_product_choices_keep_kit_order_first() {
        let products = vec![product(1, "Caneca"), product(2, "Bolsa"), product(3, "Avental")];
        let choices = product_choices(&products, &[ProductId::new(2), ProductId::new(1)]);

        let summary: Vec<(i32, bool)> = choices.iter().map(|c| (c.id, c.selected)).collect();
        assert_eq!(summary, vec![(2, true), (1, true), (3, false)]);
    }

    #[test]
    fn test_kit_row_shows_discounted_price() {
        let kit = Kit {
            id: KitId::new(1),
            name: "Kit".to_string(),
            description: String::new(),
            price: Decimal::new(10000, 2),
            images: vec![],
            product_ids: vec![ProductId::new(1), ProductId::new(9)],
            discount_percent: Some(Decimal::TEN),
            sort_order: 0,
        };

        let row = KitRowView::new(&kit, &[product(1, "Caneca")], CurrencyCode::default());
        assert_eq!(row.products, "Caneca");
        assert!(row.final_price.is_some());
        assert_ne!(row.final_price.as_deref(), Some(row.price.as_str()));
    }
}
