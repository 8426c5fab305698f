//! Catalog entities as mirrored from the store.
//!
//! The storefront loads the whole catalog into a [`Catalog`] snapshot and
//! answers every page from it; the admin reads and writes rows individually.

mod category;
mod highlight;
mod image;
mod kit;
pub(crate) mod product;
mod stock;

pub use category::Category;
pub use highlight::{Highlight, HighlightKind};
pub use image::{ImageFrame, MAX_OFFSET, MAX_ZOOM, MIN_ZOOM, ProductImage};
pub use kit::{Kit, KitError, KitSelection};
pub use product::{
    MAX_CUSTOMIZATION_LEN, Product, Selection, SelectionError, normalize_customization,
};
pub use stock::{DEFAULT_BUCKET, StockLevels};

use serde::{Deserialize, Serialize};

use crate::types::{CategoryId, KitId, ProductId};

/// Lookup of catalog entities by id.
///
/// Cart reconciliation and kit availability only need point lookups, so
/// they take this trait instead of a concrete snapshot.
pub trait CatalogLookup {
    fn product(&self, id: ProductId) -> Option<&Product>;
    fn kit(&self, id: KitId) -> Option<&Kit>;
}

/// A full read of the catalog.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    pub products: Vec<Product>,
    pub categories: Vec<Category>,
    pub kits: Vec<Kit>,
    pub highlights: Vec<Highlight>,
}

impl Catalog {
    #[must_use]
    pub fn category(&self, id: CategoryId) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }

    /// Kits in their admin-defined order.
    #[must_use]
    pub fn kits_in_order(&self) -> Vec<&Kit> {
        let mut kits: Vec<&Kit> = self.kits.iter().collect();
        kits.sort_by_key(|k| (k.sort_order, k.id.as_i32()));
        kits
    }

    /// Highlights in carousel order, skipping product slides whose product
    /// is gone.
    #[must_use]
    pub fn visible_highlights(&self) -> Vec<&Highlight> {
        let mut highlights: Vec<&Highlight> = self
            .highlights
            .iter()
            .filter(|h| match &h.kind {
                HighlightKind::Product { product_id } => self.product(*product_id).is_some(),
                HighlightKind::Image { .. } => true,
            })
            .collect();
        highlights.sort_by_key(|h| (h.sort_order, h.id.as_i32()));
        highlights
    }
}

impl CatalogLookup for Catalog {
    fn product(&self, id: ProductId) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    fn kit(&self, id: KitId) -> Option<&Kit> {
        self.kits.iter().find(|k| k.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::product::fixtures::{mug, shirt};
    use super::*;
    use crate::types::HighlightId;

    #[test]
    fn test_visible_highlights_skip_missing_products_and_sort() {
        let catalog = Catalog {
            products: vec![shirt(), mug()],
            highlights: vec![
                Highlight {
                    id: HighlightId::new(1),
                    kind: HighlightKind::Product {
                        product_id: ProductId::new(1),
                    },
                    frame: ImageFrame::default(),
                    sort_order: 2,
                },
                Highlight {
                    id: HighlightId::new(2),
                    kind: HighlightKind::Product {
                        product_id: ProductId::new(404),
                    },
                    frame: ImageFrame::default(),
                    sort_order: 0,
                },
                Highlight {
                    id: HighlightId::new(3),
                    kind: HighlightKind::Image {
                        image_url: "https://cdn/banner.jpg".to_string(),
                        link_url: None,
                        title: None,
                    },
                    frame: ImageFrame::default(),
                    sort_order: 1,
                },
            ],
            ..Catalog::default()
        };

        let ids: Vec<i32> = catalog
            .visible_highlights()
            .iter()
            .map(|h| h.id.as_i32())
            .collect();
        assert_eq!(ids, vec![3, 1]);
    }

    #[test]
    fn test_lookup() {
        let catalog = Catalog {
            products: vec![shirt()],
            ..Catalog::default()
        };
        assert!(catalog.product(ProductId::new(1)).is_some());
        assert!(catalog.product(ProductId::new(2)).is_none());
        assert!(catalog.kit(KitId::new(1)).is_none());
    }
}
