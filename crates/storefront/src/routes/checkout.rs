//! Checkout route handler.
//!
//! Checkout hands the order over to the store's WhatsApp number: the cart is
//! summarized into a message and the shopper is redirected to the chat link.

use axum::{
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use tracing::instrument;
use vitrine_core::checkout::{CheckoutMessage, whatsapp_link};

use super::PageContext;
use super::cart::{CartShowTemplate, reconcile_cart};
use crate::error::{Result, add_breadcrumb};
use crate::models::session::store_cart;
use crate::state::AppState;

/// Start checkout.
///
/// If the catalog changed since the shopper last looked (prices, stock,
/// removed products) the cart page is shown again with the notices instead
/// of sending an order the shopper has not seen.
#[instrument(skip(state, session))]
pub async fn checkout(State(state): State<AppState>, session: Session) -> Result<Response> {
    let store = &state.config().store;
    let mut page = PageContext::load(&state, &session).await?;

    let cart = reconcile_cart(&session, &mut page.cart, &page.catalog, store.currency).await?;
    if !cart.notices.is_empty() {
        page.layout.cart_count = cart.item_count;
        return Ok(CartShowTemplate {
            layout: page.layout,
            cart,
        }
        .into_response());
    }

    let message = CheckoutMessage::build(&page.cart, &store.name, store.currency)?;
    let link = whatsapp_link(&store.whatsapp_phone, &message)?;

    add_breadcrumb(
        "checkout",
        "Checkout started",
        &[
            ("lines", page.cart.lines.len().to_string()),
            ("items", page.cart.item_count().to_string()),
        ],
    );
    tracing::info!(items = page.cart.item_count(), "Checkout redirected to WhatsApp");

    page.cart.clear();
    store_cart(&session, &page.cart).await?;

    Ok(Redirect::to(link.as_str()).into_response())
}
