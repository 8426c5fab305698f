//! Product categories.

use serde::{Deserialize, Serialize};

use crate::types::{CategoryId, ProductId};

/// A node in the category hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub parent_id: Option<CategoryId>,
    /// Explicit product order for the "featured" sort inside this category.
    /// Products not listed follow, newest first.
    pub item_order: Option<Vec<ProductId>>,
}

impl Category {
    /// Position of a product in the explicit order, if listed.
    #[must_use]
    pub fn position_of(&self, product_id: ProductId) -> Option<usize> {
        self.item_order
            .as_ref()
            .and_then(|order| order.iter().position(|&id| id == product_id))
    }
}
