//! Session-related types.
//!
//! The shopper's cart lives in the session; there are no shopper accounts.

use tower_sessions::Session;
use vitrine_core::cart::Cart;

/// Session keys for storefront data.
pub mod keys {
    /// Key for the serialized [`vitrine_core::cart::Cart`].
    pub const CART: &str = "cart";
}

/// Read the cart from the session.
///
/// A missing or unreadable cart is treated as empty.
pub async fn load_cart(session: &Session) -> Cart {
    match session.get::<Cart>(keys::CART).await {
        Ok(cart) => cart.unwrap_or_default(),
        Err(e) => {
            tracing::warn!("Failed to read cart from session: {e}");
            Cart::new()
        }
    }
}

/// Write the cart back to the session.
///
/// # Errors
///
/// Returns the session store error if the cart cannot be saved.
pub async fn store_cart(session: &Session, cart: &Cart) -> Result<(), tower_sessions::session::Error> {
    session.insert(keys::CART, cart).await
}
