//! Products and purchase selection rules.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{ProductImage, StockLevels};
use crate::types::{CategoryId, ProductId};

/// Longest customization text accepted on a cart line.
pub const MAX_CUSTOMIZATION_LEN: usize = 120;

/// A sellable product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub images: Vec<ProductImage>,
    /// Size labels in display order. Empty when the product is one-size.
    pub sizes: Vec<String>,
    pub category_ids: Vec<CategoryId>,
    pub customizable: bool,
    /// Prompt shown next to the customization input, e.g. "Name on the back".
    pub customization_label: Option<String>,
    pub stock: StockLevels,
    pub created_at: DateTime<Utc>,
}

/// Why a size/customization choice cannot be added to the cart.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("please choose a size")]
    SizeRequired,
    #[error("size {0} is not offered for this product")]
    UnknownSize(String),
    #[error("this product has no sizes")]
    SizeNotApplicable,
    #[error("this product cannot be customized")]
    NotCustomizable,
    #[error("customization must be at most {max} characters")]
    CustomizationTooLong { max: usize },
}

/// A validated selection: the size (if any) and trimmed customization text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub size: Option<String>,
    pub customization: Option<String>,
}

impl Product {
    #[must_use]
    pub fn has_sizes(&self) -> bool {
        !self.sizes.is_empty()
    }

    /// Units available for the selected size, or the default bucket for
    /// one-size products.
    #[must_use]
    pub fn available(&self, size: Option<&str>) -> u32 {
        if self.has_sizes() {
            self.stock.available(size)
        } else {
            self.stock.available(None)
        }
    }

    /// True when no bucket relevant to this product has stock.
    #[must_use]
    pub fn is_sold_out(&self) -> bool {
        if self.has_sizes() {
            self.sizes
                .iter()
                .all(|s| self.stock.available(Some(s.as_str())) == 0)
        } else {
            self.stock.available(None) == 0
        }
    }

    #[must_use]
    pub fn primary_image(&self) -> Option<&ProductImage> {
        self.images.first()
    }

    /// Sizes that currently have stock, in display order.
    #[must_use]
    pub fn sizes_in_stock(&self) -> Vec<&str> {
        self.sizes
            .iter()
            .map(String::as_str)
            .filter(|s| self.stock.available(Some(*s)) > 0)
            .collect()
    }

    /// Check a shopper's size and customization choice.
    ///
    /// Blank customization is treated as none.
    ///
    /// # Errors
    ///
    /// Returns a [`SelectionError`] when the size does not fit the product or
    /// the customization is not allowed.
    pub fn validate_selection(
        &self,
        size: Option<&str>,
        customization: Option<&str>,
    ) -> Result<Selection, SelectionError> {
        let size = size.map(str::trim).filter(|s| !s.is_empty());
        let size = match (self.has_sizes(), size) {
            (true, None) => return Err(SelectionError::SizeRequired),
            (true, Some(s)) if !self.sizes.iter().any(|known| known == s) => {
                return Err(SelectionError::UnknownSize(s.to_string()));
            }
            (true, Some(s)) => Some(s.to_string()),
            (false, Some(_)) => return Err(SelectionError::SizeNotApplicable),
            (false, None) => None,
        };

        let customization = normalize_customization(customization);
        if let Some(text) = &customization {
            if !self.customizable {
                return Err(SelectionError::NotCustomizable);
            }
            if text.chars().count() > MAX_CUSTOMIZATION_LEN {
                return Err(SelectionError::CustomizationTooLong {
                    max: MAX_CUSTOMIZATION_LEN,
                });
            }
        }

        Ok(Selection {
            size,
            customization,
        })
    }
}

/// Trim customization text and map blank input to `None`.
#[must_use]
pub fn normalize_customization(text: Option<&str>) -> Option<String> {
    text.map(str::trim)
        .filter(|t| !t.is_empty())
        .map(ToString::to_string)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::TimeZone;

    use super::*;

    /// A sized, customizable shirt: P=2, M=0, G=5.
    pub fn shirt() -> Product {
        Product {
            id: ProductId::new(1),
            name: "Camiseta".to_string(),
            description: "Algodão".to_string(),
            price: Decimal::new(4990, 2),
            images: vec![ProductImage::new("https://cdn.test/shirt.jpg")],
            sizes: vec!["P".to_string(), "M".to_string(), "G".to_string()],
            category_ids: vec![CategoryId::new(10)],
            customizable: true,
            customization_label: Some("Nome".to_string()),
            stock: StockLevels::per_size([("P", 2), ("M", 0), ("G", 5)]),
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    /// A one-size mug with flat stock of 3.
    pub fn mug() -> Product {
        Product {
            id: ProductId::new(2),
            name: "Caneca".to_string(),
            description: "Cerâmica".to_string(),
            price: Decimal::new(2500, 2),
            images: Vec::new(),
            sizes: Vec::new(),
            category_ids: vec![CategoryId::new(20)],
            customizable: false,
            customization_label: None,
            stock: StockLevels::flat(3),
            created_at: Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap(),
        }
    }
}
