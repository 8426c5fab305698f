//! Read-only catalog queries.
//!
//! The whole catalog is small enough to load at once; the storefront caches
//! the result (see [`crate::services::catalog`]).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use sqlx::types::Json;
use tracing::instrument;

use vitrine_core::catalog::{
    Catalog, Category, Highlight, HighlightKind, ImageFrame, Kit, Product, ProductImage,
    StockLevels,
};
use vitrine_core::{CategoryId, HighlightId, KitId, ProductId};

use super::RepositoryError;

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: i32,
    name: String,
    description: String,
    price: Decimal,
    images: Json<Vec<ProductImage>>,
    sizes: Vec<String>,
    category_ids: Vec<i32>,
    customizable: bool,
    customization_label: Option<String>,
    stock: Json<StockLevels>,
    created_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: ProductId::new(row.id),
            name: row.name,
            description: row.description,
            price: row.price,
            images: row
                .images
                .0
                .into_iter()
                .map(|image| ProductImage {
                    frame: image.frame.clamped(),
                    ..image
                })
                .collect(),
            sizes: row.sizes,
            category_ids: row.category_ids.into_iter().map(CategoryId::new).collect(),
            customizable: row.customizable,
            customization_label: row.customization_label,
            stock: row.stock.0,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CategoryRow {
    id: i32,
    name: String,
    parent_id: Option<i32>,
    item_order: Option<Vec<i32>>,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: CategoryId::new(row.id),
            name: row.name,
            parent_id: row.parent_id.map(CategoryId::new),
            item_order: row
                .item_order
                .map(|ids| ids.into_iter().map(ProductId::new).collect()),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct KitRow {
    id: i32,
    name: String,
    description: String,
    price: Decimal,
    images: Json<Vec<ProductImage>>,
    product_ids: Vec<i32>,
    discount_percent: Option<Decimal>,
    sort_order: i32,
}

impl From<KitRow> for Kit {
    fn from(row: KitRow) -> Self {
        Self {
            id: KitId::new(row.id),
            name: row.name,
            description: row.description,
            price: row.price,
            images: row.images.0,
            product_ids: row.product_ids.into_iter().map(ProductId::new).collect(),
            discount_percent: row.discount_percent,
            sort_order: row.sort_order,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct HighlightRow {
    id: i32,
    kind: String,
    product_id: Option<i32>,
    image_url: Option<String>,
    link_url: Option<String>,
    title: Option<String>,
    frame: Json<ImageFrame>,
    sort_order: i32,
}

impl TryFrom<HighlightRow> for Highlight {
    type Error = RepositoryError;

    fn try_from(row: HighlightRow) -> Result<Self, Self::Error> {
        let kind = match (row.kind.as_str(), row.product_id, row.image_url) {
            ("product", Some(product_id), _) => HighlightKind::Product {
                product_id: ProductId::new(product_id),
            },
            ("image", _, Some(image_url)) => HighlightKind::Image {
                image_url,
                link_url: row.link_url,
                title: row.title,
            },
            (other, _, _) => {
                return Err(RepositoryError::DataCorruption(format!(
                    "highlight {} has inconsistent kind '{other}'",
                    row.id
                )));
            }
        };

        Ok(Self {
            id: HighlightId::new(row.id),
            kind,
            frame: row.frame.0.clamped(),
            sort_order: row.sort_order,
        })
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for catalog reads.
pub struct CatalogRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CatalogRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Load every product, category, kit and highlight.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    /// Returns `RepositoryError::DataCorruption` if a highlight row is inconsistent.
    #[instrument(skip(self))]
    pub async fn load(&self) -> Result<Catalog, RepositoryError> {
        let products = self.products().await?;
        let categories = self.categories().await?;
        let kits = self.kits().await?;
        let highlights = self.highlights().await?;

        tracing::debug!(
            products = products.len(),
            categories = categories.len(),
            kits = kits.len(),
            highlights = highlights.len(),
            "Catalog loaded"
        );

        Ok(Catalog {
            products,
            categories,
            kits,
            highlights,
        })
    }

    async fn products(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>(
            r"
            SELECT p.id, p.name, p.description, p.price, p.images, p.sizes,
                   COALESCE(
                       array_agg(pc.category_id ORDER BY pc.category_id)
                           FILTER (WHERE pc.category_id IS NOT NULL),
                       '{}'
                   ) AS category_ids,
                   p.customizable, p.customization_label, p.stock, p.created_at
            FROM products p
            LEFT JOIN product_categories pc ON pc.product_id = p.id
            GROUP BY p.id
            ORDER BY p.id
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn categories(&self) -> Result<Vec<Category>, RepositoryError> {
        let rows = sqlx::query_as::<_, CategoryRow>(
            r"
            SELECT id, name, parent_id, item_order
            FROM categories
            ORDER BY name, id
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn kits(&self) -> Result<Vec<Kit>, RepositoryError> {
        let rows = sqlx::query_as::<_, KitRow>(
            r"
            SELECT k.id, k.name, k.description, k.price, k.images,
                   COALESCE(
                       array_agg(kp.product_id ORDER BY kp.position, kp.product_id)
                           FILTER (WHERE kp.product_id IS NOT NULL),
                       '{}'
                   ) AS product_ids,
                   k.discount_percent, k.sort_order
            FROM kits k
            LEFT JOIN kit_products kp ON kp.kit_id = k.id
            GROUP BY k.id
            ORDER BY k.sort_order, k.id
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn highlights(&self) -> Result<Vec<Highlight>, RepositoryError> {
        let rows = sqlx::query_as::<_, HighlightRow>(
            r"
            SELECT id, kind, product_id, image_url, link_url, title, frame, sort_order
            FROM highlights
            ORDER BY sort_order, id
            ",
        )
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn highlight_row(kind: &str, product_id: Option<i32>, image_url: Option<&str>) -> HighlightRow {
        HighlightRow {
            id: 1,
            kind: kind.to_string(),
            product_id,
            image_url: image_url.map(ToString::to_string),
            link_url: None,
            title: Some("Sale".to_string()),
            frame: Json(ImageFrame {
                zoom: 9.0,
                offset_x: 0.0,
                offset_y: 0.0,
            }),
            sort_order: 0,
        }
    }

    #[test]
    fn test_highlight_row_conversion() {
        let highlight = Highlight::try_from(highlight_row("product", Some(7), None)).unwrap();
        assert_eq!(
            highlight.kind,
            HighlightKind::Product {
                product_id: ProductId::new(7)
            }
        );
        assert!((highlight.frame.zoom - vitrine_core::catalog::MAX_ZOOM).abs() < f32::EPSILON);

        let highlight = Highlight::try_from(highlight_row("image", None, Some("https://cdn/a.jpg")))
            .unwrap();
        assert!(matches!(highlight.kind, HighlightKind::Image { .. }));
    }

    #[test]
    fn test_inconsistent_highlight_is_corruption() {
        assert!(matches!(
            Highlight::try_from(highlight_row("product", None, None)),
            Err(RepositoryError::DataCorruption(_))
        ));
        assert!(matches!(
            Highlight::try_from(highlight_row("video", Some(1), None)),
            Err(RepositoryError::DataCorruption(_))
        ));
    }

    #[test]
    fn test_category_row_conversion() {
        let category = Category::from(CategoryRow {
            id: 3,
            name: "Camisetas".to_string(),
            parent_id: Some(1),
            item_order: Some(vec![5, 2]),
        });
        assert_eq!(category.parent_id, Some(CategoryId::new(1)));
        assert_eq!(category.position_of(ProductId::new(2)), Some(1));
    }
}
