//! Dashboard route handler.

use askama::Template;
use axum::{extract::State, response::Html};
use tower_sessions::Session;
use tracing::instrument;

use vitrine_core::catalog::{DEFAULT_BUCKET, Product};

use super::{AdminUserView, FlashView, flash_view, render};
use crate::db::{CategoryRepository, HighlightRepository, KitRepository, ProductRepository};
use crate::error::Result;
use crate::middleware::RequireAdminAuth;
use crate::state::AppState;

/// Stock at or below this count is flagged on the dashboard.
pub const LOW_STOCK_THRESHOLD: i32 = 2;

/// Catalog counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DashboardMetrics {
    pub products: usize,
    pub categories: usize,
    pub kits: usize,
    pub highlights: usize,
}

/// A product size that is running out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LowStockView {
    pub product_id: i32,
    pub product_name: String,
    /// `None` for one-size products.
    pub size: Option<String>,
    pub count: i32,
}

/// Dashboard template.
#[derive(Template)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub admin_user: AdminUserView,
    pub current_path: String,
    pub flash: Option<FlashView>,
    pub metrics: DashboardMetrics,
    pub low_stock: Vec<LowStockView>,
}

/// Every size bucket at or below [`LOW_STOCK_THRESHOLD`], lowest first.
#[must_use]
pub fn low_stock(products: &[Product]) -> Vec<LowStockView> {
    let mut rows: Vec<LowStockView> = products
        .iter()
        .flat_map(|product| {
            let buckets: Vec<(Option<String>, i32)> = if product.sizes.is_empty() {
                vec![(None, product.stock.recorded(DEFAULT_BUCKET))]
            } else {
                product
                    .sizes
                    .iter()
                    .map(|size| (Some(size.clone()), product.stock.recorded(size)))
                    .collect()
            };
            buckets
                .into_iter()
                .filter(|(_, count)| *count <= LOW_STOCK_THRESHOLD)
                .map(|(size, count)| LowStockView {
                    product_id: product.id.as_i32(),
                    product_name: product.name.clone(),
                    size,
                    count,
                })
        })
        .collect();

    rows.sort_by(|a, b| {
        a.count
            .cmp(&b.count)
            .then_with(|| a.product_name.cmp(&b.product_name))
    });
    rows
}

/// Dashboard page handler.
#[instrument(skip(admin, state, session))]
pub async fn dashboard(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
) -> Result<Html<String>> {
    let pool = state.pool();
    let product_repo = ProductRepository::new(pool);
    let category_repo = CategoryRepository::new(pool);
    let kit_repo = KitRepository::new(pool);
    let highlight_repo = HighlightRepository::new(pool);
    let (products, categories, kits, highlights) = tokio::try_join!(
        product_repo.list(),
        category_repo.list(),
        kit_repo.list(),
        highlight_repo.list(),
    )?;

    let template = DashboardTemplate {
        admin_user: AdminUserView::from(&admin),
        current_path: "/".to_string(),
        flash: flash_view(&session).await,
        metrics: DashboardMetrics {
            products: products.len(),
            categories: categories.len(),
            kits: kits.len(),
            highlights: highlights.len(),
        },
        low_stock: low_stock(&products),
    };

    Ok(render(&template))
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;
    use vitrine_core::ProductId;
    use vitrine_core::catalog::StockLevels;

    use super::*;

    fn product(id: i32, name: &str, sizes: &[&str], stock: StockLevels) -> Product {
        Product {
            id: ProductId::new(id),
            name: name.to_string(),
            description: String::new(),
            price: Decimal::TEN,
            images: vec![],
            sizes: sizes.iter().map(ToString::to_string).collect(),
            category_ids: vec![],
            customizable: false,
            customization_label: None,
            stock,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_low_stock_lists_buckets_lowest_first() {
        let products = vec![
            product(1, "Caneca", &[], StockLevels::flat(2)),
            product(
                2,
                "Camiseta",
                &["P", "M", "G"],
                StockLevels::per_size([("P", 5), ("M", 0)]),
            ),
            product(3, "Bolsa", &[], StockLevels::flat(9)),
        ];

        let rows = low_stock(&products);
        let summary: Vec<(&str, Option<&str>, i32)> = rows
            .iter()
            .map(|r| (r.product_name.as_str(), r.size.as_deref(), r.count))
            .collect();

        assert_eq!(
            summary,
            vec![
                ("Camiseta", Some("M"), 0),
                ("Camiseta", Some("G"), 0),
                ("Caneca", None, 2),
            ]
        );
    }
}
