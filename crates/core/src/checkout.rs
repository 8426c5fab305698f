//! Checkout through a WhatsApp conversation.
//!
//! There is no payment step: the storefront turns the cart into a plain-text
//! order summary and sends the shopper to `wa.me` with the message prefilled.

use std::fmt::Write as _;

use thiserror::Error;
use url::Url;

use crate::cart::Cart;
use crate::types::{CurrencyCode, Price};

/// Fewest digits accepted for the store's phone number (country code included).
const MIN_PHONE_DIGITS: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckoutError {
    #[error("the cart is empty")]
    EmptyCart,
    #[error("invalid store phone number")]
    InvalidPhone,
    #[error("could not build checkout link: {0}")]
    InvalidUrl(String),
}

/// The text sent to the store when the shopper checks out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutMessage(String);

impl CheckoutMessage {
    /// Summarize the cart, one bullet per line, followed by the subtotal.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::EmptyCart`] when there is nothing to order.
    pub fn build(
        cart: &Cart,
        store_name: &str,
        currency: CurrencyCode,
    ) -> Result<Self, CheckoutError> {
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let mut text = format!("Hello! I'd like to order from {store_name}:\n\n");
        for line in &cart.lines {
            let total = Price::new(line.line_total(), currency);
            let _ = write!(text, "- {}x {}", line.quantity, line.name);
            if !line.details.is_empty() {
                let _ = write!(text, " ({})", line.details.join("; "));
            }
            let _ = writeln!(text, ": {total}");
        }
        let _ = write!(text, "\nSubtotal: {}", cart.subtotal(currency));

        Ok(Self(text))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Reduce a phone number to its digits.
///
/// # Errors
///
/// Returns [`CheckoutError::InvalidPhone`] when fewer than eight digits remain.
pub fn normalize_phone(phone: &str) -> Result<String, CheckoutError> {
    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    if digits.len() < MIN_PHONE_DIGITS {
        return Err(CheckoutError::InvalidPhone);
    }
    Ok(digits)
}

/// Build `https://wa.me/<digits>?text=<message>`.
///
/// # Errors
///
/// Returns [`CheckoutError::InvalidPhone`] for unusable phone numbers.
pub fn whatsapp_link(phone: &str, message: &CheckoutMessage) -> Result<Url, CheckoutError> {
    let digits = normalize_phone(phone)?;
    let raw = format!(
        "https://wa.me/{digits}?text={}",
        urlencoding::encode(message.as_str())
    );
    Url::parse(&raw).map_err(|e| CheckoutError::InvalidUrl(e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::catalog::product::fixtures::{mug, shirt};
    use crate::types::ProductId;

    fn cart() -> Cart {
        let catalog = Catalog {
            products: vec![shirt(), mug()],
            ..Catalog::default()
        };
        let mut cart = Cart::new();
        cart.add_product(&catalog, ProductId::new(1), Some("G"), Some("Ana"), 2)
            .unwrap();
        cart.add_product(&catalog, ProductId::new(2), None, None, 1)
            .unwrap();
        cart
    }

    #[test]
    fn test_message_lists_lines_and_subtotal() {
        let message = CheckoutMessage::build(&cart(), "Loja Teste", CurrencyCode::BRL).unwrap();
        assert_eq!(
            message.as_str(),
            "Hello! I'd like to order from Loja Teste:\n\n\
             - 2x Camiseta (Size: G; Nome: Ana): R$ 99,80\n\
             - 1x Caneca: R$ 25,00\n\
             \nSubtotal: R$ 124,80"
        );
    }

    #[test]
    fn test_empty_cart_cannot_check_out() {
        assert_eq!(
            CheckoutMessage::build(&Cart::new(), "Loja", CurrencyCode::BRL),
            Err(CheckoutError::EmptyCart)
        );
    }

    #[test]
    fn test_normalize_phone() {
        assert_eq!(normalize_phone("+55 (11) 98765-4321").unwrap(), "5511987654321");
        assert_eq!(normalize_phone("12-34"), Err(CheckoutError::InvalidPhone));
    }

    #[test]
    fn test_whatsapp_link_encodes_message() {
        let message = CheckoutMessage::build(&cart(), "Loja", CurrencyCode::BRL).unwrap();
        let url = whatsapp_link("+55 11 98765-4321", &message).unwrap();
        assert_eq!(url.host_str(), Some("wa.me"));
        assert_eq!(url.path(), "/5511987654321");

        let text = url
            .query_pairs()
            .find(|(k, _)| k == "text")
            .map(|(_, v)| v.into_owned())
            .unwrap();
        assert_eq!(text, message.as_str());
        assert!(!url.as_str().contains(' '));
    }
}
