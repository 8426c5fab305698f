//! Display data handed to templates.
//!
//! Everything is pre-formatted here (prices, CSS transforms, labels) so the
//! templates stay free of logic.

use chrono::Datelike;
use rust_decimal::Decimal;
use vitrine_core::cart::{Cart, CartAdjustment, CartLine};
use vitrine_core::catalog::{
    Catalog, CatalogLookup, Highlight, HighlightKind, ImageFrame, Kit, MAX_CUSTOMIZATION_LEN,
    Product, ProductImage,
};
use vitrine_core::category_tree::CategoryTree;
use vitrine_core::{CurrencyCode, Price};

use crate::config::StoreConfig;

/// Low-stock threshold for the "only N left" hint.
const LOW_STOCK: u32 = 3;

fn money(amount: Decimal, currency: CurrencyCode) -> String {
    Price::new(amount, currency).display()
}

// =============================================================================
// Layout
// =============================================================================

/// Header, menu and footer data shared by every full page.
#[derive(Clone)]
pub struct LayoutView {
    pub store_name: String,
    pub cart_count: u32,
    pub menu: Vec<MenuItemView>,
    pub year: i32,
}

#[derive(Clone)]
pub struct MenuItemView {
    pub id: i32,
    pub name: String,
    pub depth: usize,
}

impl LayoutView {
    #[must_use]
    pub fn new(store: &StoreConfig, tree: &CategoryTree, cart: &Cart) -> Self {
        Self {
            store_name: store.name.clone(),
            cart_count: cart.item_count(),
            menu: tree
                .flatten()
                .into_iter()
                .map(|(depth, category)| MenuItemView {
                    id: category.id.as_i32(),
                    name: category.name.clone(),
                    depth,
                })
                .collect(),
            year: chrono::Utc::now().year(),
        }
    }
}

// =============================================================================
// Images
// =============================================================================

#[derive(Clone)]
pub struct ImageView {
    pub url: String,
    pub alt: String,
    /// CSS `transform` for the zoom/pan frame.
    pub transform: String,
}

impl ImageView {
    fn new(url: &str, frame: &ImageFrame, alt: &str) -> Self {
        Self {
            url: url.to_string(),
            alt: alt.to_string(),
            transform: frame.css_transform(),
        }
    }

    fn from_image(image: &ProductImage, alt: &str) -> Self {
        Self::new(&image.url, &image.frame, alt)
    }
}

// =============================================================================
// Products
// =============================================================================

/// A product tile in a grid or carousel.
#[derive(Clone)]
pub struct ProductCardView {
    pub id: i32,
    pub name: String,
    pub price: String,
    pub image: Option<ImageView>,
    pub sold_out: bool,
}

impl ProductCardView {
    #[must_use]
    pub fn new(product: &Product, currency: CurrencyCode) -> Self {
        Self {
            id: product.id.as_i32(),
            name: product.name.clone(),
            price: money(product.price, currency),
            image: product
                .primary_image()
                .map(|image| ImageView::from_image(image, &product.name)),
            sold_out: product.is_sold_out(),
        }
    }
}

/// A size option with its stock.
#[derive(Clone)]
pub struct SizeView {
    pub label: String,
    pub available: u32,
    pub in_stock: bool,
    pub low_stock: bool,
}

impl SizeView {
    fn for_product(product: &Product) -> Vec<Self> {
        product
            .sizes
            .iter()
            .map(|size| {
                let available = product.available(Some(size.as_str()));
                Self {
                    label: size.clone(),
                    available,
                    in_stock: available > 0,
                    low_stock: available > 0 && available <= LOW_STOCK,
                }
            })
            .collect()
    }
}

/// Breadcrumb entry.
#[derive(Clone)]
pub struct CrumbView {
    pub id: i32,
    pub name: String,
}

/// Everything the product page and modal show.
#[derive(Clone)]
pub struct ProductDetailView {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub price: String,
    pub images: Vec<ImageView>,
    pub has_sizes: bool,
    pub sizes: Vec<SizeView>,
    /// Stock for one-size products.
    pub available: u32,
    pub low_stock: bool,
    pub sold_out: bool,
    pub customizable: bool,
    pub customization_label: String,
    pub customization_max: usize,
    pub breadcrumbs: Vec<CrumbView>,
}

impl ProductDetailView {
    #[must_use]
    pub fn new(product: &Product, tree: &CategoryTree, currency: CurrencyCode) -> Self {
        let available = product.available(None);
        let breadcrumbs = product
            .category_ids
            .first()
            .map(|id| {
                tree.path(*id)
                    .into_iter()
                    .map(|c| CrumbView {
                        id: c.id.as_i32(),
                        name: c.name.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            id: product.id.as_i32(),
            name: product.name.clone(),
            description: product.description.clone(),
            price: money(product.price, currency),
            images: product
                .images
                .iter()
                .map(|image| ImageView::from_image(image, &product.name))
                .collect(),
            has_sizes: product.has_sizes(),
            sizes: SizeView::for_product(product),
            available,
            low_stock: !product.has_sizes() && available > 0 && available <= LOW_STOCK,
            sold_out: product.is_sold_out(),
            customizable: product.customizable,
            customization_label: product
                .customization_label
                .clone()
                .unwrap_or_else(|| "Customization".to_string()),
            customization_max: MAX_CUSTOMIZATION_LEN,
            breadcrumbs,
        }
    }
}

// =============================================================================
// Kits
// =============================================================================

/// A kit tile on the home page.
#[derive(Clone)]
pub struct KitCardView {
    pub id: i32,
    pub name: String,
    pub price: String,
    pub final_price: String,
    pub has_discount: bool,
    pub discount_label: String,
    pub image: Option<ImageView>,
}

impl KitCardView {
    #[must_use]
    pub fn new(kit: &Kit, currency: CurrencyCode) -> Self {
        Self {
            id: kit.id.as_i32(),
            name: kit.name.clone(),
            price: money(kit.price, currency),
            final_price: money(kit.final_price(), currency),
            has_discount: kit.has_discount(),
            discount_label: kit
                .discount_percent
                .map(|d| format!("-{}%", d.normalize()))
                .unwrap_or_default(),
            image: kit
                .primary_image()
                .map(|image| ImageView::from_image(image, &kit.name)),
        }
    }
}

/// One product inside a kit, with its size choices.
#[derive(Clone)]
pub struct KitComponentView {
    pub product_id: i32,
    pub name: String,
    pub image: Option<ImageView>,
    pub has_sizes: bool,
    pub sizes: Vec<SizeView>,
    pub sold_out: bool,
}

/// Everything the kit page shows.
#[derive(Clone)]
pub struct KitDetailView {
    pub card: KitCardView,
    pub description: String,
    pub images: Vec<ImageView>,
    pub components: Vec<KitComponentView>,
    /// True when any component is missing or sold out.
    pub unavailable: bool,
}

impl KitDetailView {
    #[must_use]
    pub fn new(kit: &Kit, catalog: &Catalog, currency: CurrencyCode) -> Self {
        let components: Vec<KitComponentView> = kit
            .components(catalog)
            .into_iter()
            .map(|product| KitComponentView {
                product_id: product.id.as_i32(),
                name: product.name.clone(),
                image: product
                    .primary_image()
                    .map(|image| ImageView::from_image(image, &product.name)),
                has_sizes: product.has_sizes(),
                sizes: SizeView::for_product(product),
                sold_out: product.is_sold_out(),
            })
            .collect();
        let unavailable =
            components.len() != kit.product_ids.len() || components.iter().any(|c| c.sold_out);

        Self {
            card: KitCardView::new(kit, currency),
            description: kit.description.clone(),
            images: kit
                .images
                .iter()
                .map(|image| ImageView::from_image(image, &kit.name))
                .collect(),
            components,
            unavailable,
        }
    }
}

// =============================================================================
// Highlights
// =============================================================================

/// A carousel slide.
#[derive(Clone)]
pub struct HighlightView {
    pub title: String,
    pub image: Option<ImageView>,
    /// Product slides open the product modal instead of following a link.
    pub product_id: Option<i32>,
    pub price: Option<String>,
    pub link_url: Option<String>,
}

impl HighlightView {
    #[must_use]
    pub fn new(highlight: &Highlight, catalog: &Catalog, currency: CurrencyCode) -> Option<Self> {
        match &highlight.kind {
            HighlightKind::Product { product_id } => {
                let product = catalog.product(*product_id)?;
                Some(Self {
                    title: product.name.clone(),
                    image: product
                        .primary_image()
                        .map(|image| ImageView::new(&image.url, &highlight.frame, &product.name)),
                    product_id: Some(product.id.as_i32()),
                    price: Some(money(product.price, currency)),
                    link_url: None,
                })
            }
            HighlightKind::Image {
                image_url,
                link_url,
                title,
            } => {
                let title = title.clone().unwrap_or_default();
                Some(Self {
                    image: Some(ImageView::new(image_url, &highlight.frame, &title)),
                    title,
                    product_id: None,
                    price: None,
                    link_url: link_url.clone(),
                })
            }
        }
    }
}

// =============================================================================
// Cart
// =============================================================================

/// Cart line display data.
#[derive(Clone)]
pub struct CartLineView {
    pub key: String,
    pub name: String,
    pub details: String,
    pub quantity: u32,
    pub unit_price: String,
    pub line_total: String,
    pub image_url: Option<String>,
}

impl CartLineView {
    fn new(line: &CartLine, currency: CurrencyCode) -> Self {
        Self {
            key: line.key.to_string(),
            name: line.name.clone(),
            details: line.details.join(" · "),
            quantity: line.quantity,
            unit_price: money(line.unit_price, currency),
            line_total: money(line.line_total(), currency),
            image_url: line.image_url.clone(),
        }
    }
}

/// Cart display data.
#[derive(Clone)]
pub struct CartView {
    pub lines: Vec<CartLineView>,
    pub subtotal: String,
    pub item_count: u32,
    /// Messages about changes made while reconciling with the catalog.
    pub notices: Vec<String>,
}

impl CartView {
    #[must_use]
    pub fn new(cart: &Cart, adjustments: &[CartAdjustment], currency: CurrencyCode) -> Self {
        Self {
            lines: cart
                .lines
                .iter()
                .map(|line| CartLineView::new(line, currency))
                .collect(),
            subtotal: cart.subtotal(currency).display(),
            item_count: cart.item_count(),
            notices: adjustments.iter().map(ToString::to_string).collect(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use chrono::TimeZone;
    use vitrine_core::catalog::StockLevels;
    use vitrine_core::{CategoryId, KitId, ProductId};

    use super::*;

    fn product() -> Product {
        Product {
            id: ProductId::new(1),
            name: "Camiseta".to_string(),
            description: String::new(),
            price: Decimal::new(4990, 2),
            images: vec![ProductImage::new("https://cdn.test/a.jpg")],
            sizes: vec!["P".to_string(), "G".to_string()],
            category_ids: vec![CategoryId::new(1)],
            customizable: false,
            customization_label: None,
            stock: StockLevels::per_size([("P", 2), ("G", 0)]),
            created_at: chrono::Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_product_card_formats_price() {
        let card = ProductCardView::new(&product(), CurrencyCode::BRL);
        assert_eq!(card.price, "R$ 49,90");
        assert!(!card.sold_out);
        assert!(card.image.is_some());
    }

    #[test]
    fn test_size_views_flag_stock() {
        let sizes = SizeView::for_product(&product());
        assert!(sizes[0].in_stock && sizes[0].low_stock);
        assert!(!sizes[1].in_stock);
    }

    #[test]
    fn test_kit_card_discount_label() {
        let kit = Kit {
            id: KitId::new(1),
            name: "Kit".to_string(),
            description: String::new(),
            price: Decimal::new(10000, 2),
            images: Vec::new(),
            product_ids: Vec::new(),
            discount_percent: Some(Decimal::new(1500, 2)),
            sort_order: 0,
        };
        let card = KitCardView::new(&kit, CurrencyCode::BRL);
        assert_eq!(card.final_price, "R$ 85,00");
        assert_eq!(card.discount_label, "-15%");
        assert!(card.has_discount);
    }
}
