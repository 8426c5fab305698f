//! Validated catalog inputs from the admin forms.

use std::collections::HashSet;

use rust_decimal::Decimal;
use thiserror::Error;

use vitrine_core::catalog::{HighlightKind, ImageFrame, Kit, KitError, ProductImage};
use vitrine_core::{CategoryId, ProductId};

/// Longest name accepted for products, kits and categories.
pub const MAX_NAME_LEN: usize = 200;

/// Why a catalog form was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("name is required")]
    EmptyName,
    #[error("name must be at most {MAX_NAME_LEN} characters")]
    NameTooLong,
    #[error("price cannot be negative")]
    NegativePrice,
    #[error("size {0} is listed twice")]
    DuplicateSize(String),
    #[error("a kit needs at least one product")]
    EmptyKit,
    #[error("product {0} is listed twice in the kit")]
    DuplicateKitProduct(ProductId),
    #[error("a category cannot be its own parent or sit below its own subcategory")]
    CategoryCycle,
    #[error("image highlights need an image")]
    MissingImage,
    #[error("link must start with / or http")]
    InvalidLink,
    #[error(transparent)]
    Kit(#[from] KitError),
}

fn validate_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::EmptyName);
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::NameTooLong);
    }
    Ok(())
}

fn validate_price(price: Decimal) -> Result<(), ValidationError> {
    if price.is_sign_negative() && !price.is_zero() {
        return Err(ValidationError::NegativePrice);
    }
    Ok(())
}

/// Product create/edit form.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductInput {
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub images: Vec<ProductImage>,
    /// Size labels in display order; empty for one-size products.
    pub sizes: Vec<String>,
    pub category_ids: Vec<CategoryId>,
    pub customizable: bool,
    pub customization_label: Option<String>,
}

impl ProductInput {
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_name(&self.name)?;
        validate_price(self.price)?;

        let mut seen = HashSet::new();
        for size in &self.sizes {
            if !seen.insert(size.to_lowercase()) {
                return Err(ValidationError::DuplicateSize(size.clone()));
            }
        }
        Ok(())
    }
}

/// Kit create/edit form.
#[derive(Debug, Clone, PartialEq)]
pub struct KitInput {
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub images: Vec<ProductImage>,
    /// Component products in display order.
    pub product_ids: Vec<ProductId>,
    pub discount_percent: Option<Decimal>,
}

impl KitInput {
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_name(&self.name)?;
        validate_price(self.price)?;
        if self.product_ids.is_empty() {
            return Err(ValidationError::EmptyKit);
        }
        let mut seen = HashSet::new();
        for id in &self.product_ids {
            if !seen.insert(*id) {
                return Err(ValidationError::DuplicateKitProduct(*id));
            }
        }
        Kit::validate_discount(self.discount_percent)?;
        Ok(())
    }
}

/// Category create/edit form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryInput {
    pub name: String,
    pub parent_id: Option<CategoryId>,
}

impl CategoryInput {
    /// Cycle checks need the tree and happen in the route.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_name(&self.name)
    }
}

/// Highlight create form.
#[derive(Debug, Clone, PartialEq)]
pub struct HighlightInput {
    pub kind: HighlightKind,
    pub frame: ImageFrame,
}

impl HighlightInput {
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let HighlightKind::Image {
            image_url,
            link_url,
            ..
        } = &self.kind
        {
            if image_url.trim().is_empty() {
                return Err(ValidationError::MissingImage);
            }
            if let Some(link) = link_url
                && !(link.starts_with('/') || link.starts_with("http://") || link.starts_with("https://"))
            {
                return Err(ValidationError::InvalidLink);
            }
        }
        Ok(())
    }
}
