//! Home page carousel entries.

use serde::{Deserialize, Serialize};

use super::ImageFrame;
use crate::types::{HighlightId, ProductId};

/// What a carousel slide shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HighlightKind {
    /// A product card that opens the product modal.
    Product { product_id: ProductId },
    /// A standalone banner image, optionally linking somewhere.
    Image {
        image_url: String,
        link_url: Option<String>,
        title: Option<String>,
    },
}

impl HighlightKind {
    /// Discriminator stored in the `highlights.kind` column.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Product { .. } => "product",
            Self::Image { .. } => "image",
        }
    }
}

/// A slide in the home carousel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Highlight {
    pub id: HighlightId,
    pub kind: HighlightKind,
    pub frame: ImageFrame,
    pub sort_order: i32,
}
