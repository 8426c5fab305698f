//! Cart route handlers.
//!
//! Cart operations use HTMX for dynamic updates without full page reloads.
//! The cart itself is stored in the session and re-checked against the
//! catalog whenever it is displayed.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{AppendHeaders, IntoResponse, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;
use vitrine_core::cart::Cart;
use vitrine_core::catalog::{Catalog, KitSelection};
use vitrine_core::{KitId, ProductId};

use super::PageContext;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::models::session::{load_cart, store_cart};
use crate::state::AppState;
use crate::views::{CartView, LayoutView};

/// HTMX event fired after every cart change; the header badge listens for it.
const CART_UPDATED: (&str, &str) = ("HX-Trigger", "cart-updated");

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: ProductId,
    pub size: Option<String>,
    pub customization: Option<String>,
    pub quantity: Option<u32>,
}

/// Add-kit form data.
///
/// The form posts `kit_id`, `quantity` and one `size_<product id>` field per
/// sized product, so it is parsed from raw pairs.
#[derive(Debug, PartialEq, Eq)]
pub struct AddKitForm {
    pub kit_id: KitId,
    pub quantity: u32,
    pub selections: Vec<KitSelection>,
}

impl AddKitForm {
    /// Parse the posted key/value pairs.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` for a missing kit id or malformed values.
    pub fn from_pairs(pairs: &[(String, String)]) -> Result<Self> {
        let mut kit_id = None;
        let mut quantity = 1;
        let mut selections = Vec::new();

        for (key, value) in pairs {
            let value = value.trim();
            match key.as_str() {
                "kit_id" => {
                    kit_id = Some(value.parse::<KitId>().map_err(|_| {
                        AppError::BadRequest(format!("invalid kit id: {value}"))
                    })?);
                }
                "quantity" => {
                    quantity = value.parse::<u32>().map_err(|_| {
                        AppError::BadRequest(format!("invalid quantity: {value}"))
                    })?;
                }
                other => {
                    if let Some(raw_id) = other.strip_prefix("size_") {
                        let product_id = raw_id.parse::<ProductId>().map_err(|_| {
                            AppError::BadRequest(format!("invalid field: {other}"))
                        })?;
                        selections.push(KitSelection {
                            product_id,
                            size: Some(value.to_string()).filter(|s| !s.is_empty()),
                        });
                    }
                }
            }
        }

        let kit_id = kit_id.ok_or_else(|| AppError::BadRequest("missing kit id".to_string()))?;
        Ok(Self {
            kit_id,
            quantity,
            selections,
        })
    }
}

/// Update cart form data.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub key: String,
    pub quantity: u32,
}

/// Remove from cart form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub key: String,
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub layout: LayoutView,
    pub cart: CartView,
}

/// Cart modal fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_modal.html")]
pub struct CartModalTemplate {
    pub cart: CartView,
}

/// Cart items fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_items.html")]
pub struct CartItemsTemplate {
    pub cart: CartView,
}

/// Cart count badge fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_count.html")]
pub struct CartCountTemplate {
    pub count: u32,
}

/// Reconcile the cart with the catalog, saving it when anything changed.
pub(crate) async fn reconcile_cart(
    session: &Session,
    cart: &mut Cart,
    catalog: &Catalog,
    currency: vitrine_core::CurrencyCode,
) -> Result<CartView> {
    let adjustments = cart.reconcile(catalog);
    if !adjustments.is_empty() {
        tracing::info!(changes = adjustments.len(), "Cart reconciled with catalog");
        store_cart(session, cart).await?;
    }
    Ok(CartView::new(cart, &adjustments, currency))
}

/// Display cart page.
#[instrument(skip(state, session))]
pub async fn show(State(state): State<AppState>, session: Session) -> Result<CartShowTemplate> {
    let mut page = PageContext::load(&state, &session).await?;
    let cart = reconcile_cart(
        &session,
        &mut page.cart,
        &page.catalog,
        state.config().store.currency,
    )
    .await?;
    page.layout.cart_count = cart.item_count;

    Ok(CartShowTemplate {
        layout: page.layout,
        cart,
    })
}

/// Cart modal fragment (HTMX).
#[instrument(skip(state, session))]
pub async fn modal(State(state): State<AppState>, session: Session) -> Result<CartModalTemplate> {
    let catalog = state.catalog().snapshot().await?;
    let mut cart = load_cart(&session).await;
    let cart = reconcile_cart(&session, &mut cart, &catalog, state.config().store.currency).await?;

    Ok(CartModalTemplate { cart })
}

/// Add a product to the cart (HTMX).
///
/// Returns the count badge with an HTMX trigger so other cart widgets refresh.
#[instrument(skip(state, session))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<AddToCartForm>,
) -> Result<Response> {
    let catalog = state.catalog().snapshot().await?;
    let mut cart = load_cart(&session).await;

    let key = cart.add_product(
        catalog.as_ref(),
        form.product_id,
        form.size.as_deref(),
        form.customization.as_deref(),
        form.quantity.unwrap_or(1),
    )?;
    store_cart(&session, &cart).await?;

    add_breadcrumb(
        "cart",
        "Added product to cart",
        &[("product_id", form.product_id.to_string()), ("line", key.to_string())],
    );

    Ok((
        AppendHeaders([CART_UPDATED]),
        CartCountTemplate {
            count: cart.item_count(),
        },
    )
        .into_response())
}

/// Add a configured kit to the cart (HTMX).
#[instrument(skip(state, session, pairs))]
pub async fn add_kit(
    State(state): State<AppState>,
    session: Session,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response> {
    let form = AddKitForm::from_pairs(&pairs)?;
    let catalog = state.catalog().snapshot().await?;
    let mut cart = load_cart(&session).await;

    let key = cart.add_kit(catalog.as_ref(), form.kit_id, &form.selections, form.quantity)?;
    store_cart(&session, &cart).await?;

    add_breadcrumb(
        "cart",
        "Added kit to cart",
        &[("kit_id", form.kit_id.to_string()), ("line", key.to_string())],
    );

    Ok((
        AppendHeaders([CART_UPDATED]),
        CartCountTemplate {
            count: cart.item_count(),
        },
    )
        .into_response())
}

/// Update cart line quantity (HTMX). Zero removes the line.
#[instrument(skip(state, session))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<UpdateCartForm>,
) -> Result<Response> {
    let catalog = state.catalog().snapshot().await?;
    let mut cart = load_cart(&session).await;

    cart.update_quantity(catalog.as_ref(), &form.key.into(), form.quantity)?;
    store_cart(&session, &cart).await?;

    let cart = CartView::new(&cart, &[], state.config().store.currency);
    Ok((AppendHeaders([CART_UPDATED]), CartItemsTemplate { cart }).into_response())
}

/// Remove a cart line (HTMX).
#[instrument(skip(state, session))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RemoveFromCartForm>,
) -> Result<Response> {
    let mut cart = load_cart(&session).await;

    if cart.remove(&form.key.into()) {
        store_cart(&session, &cart).await?;
    }

    let cart = CartView::new(&cart, &[], state.config().store.currency);
    Ok((AppendHeaders([CART_UPDATED]), CartItemsTemplate { cart }).into_response())
}

/// Cart count badge (HTMX).
#[instrument(skip(session))]
pub async fn count(session: Session) -> impl IntoResponse {
    CartCountTemplate {
        count: load_cart(&session).await.item_count(),
    }
}
