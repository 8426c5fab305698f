//! Product repository.
//!
//! Products are written together with their category links inside one
//! transaction. Stock is stored as JSON keyed by size and is re-shaped
//! whenever the size list changes.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::instrument;

use vitrine_core::catalog::{Product, ProductImage, StockLevels};
use vitrine_core::{CategoryId, ProductId};

use super::{RepositoryError, map_constraint};
use crate::models::ProductInput;

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
            images: row.images.0,
            sizes: row.sizes,
            category_ids: row.category_ids.into_iter().map(CategoryId::new).collect(),
            customizable: row.customizable,
            customization_label: row.customization_label,
            stock: row.stock.0,
            created_at: row.created_at,
        }
    }
}

const SELECT_PRODUCTS: &str = r"
    SELECT p.id, p.name, p.description, p.price, p.images, p.sizes,
           COALESCE(
               array_agg(pc.category_id ORDER BY pc.category_id)
                   FILTER (WHERE pc.category_id IS NOT NULL),
               '{}'
           ) AS category_ids,
           p.customizable, p.customization_label, p.stock, p.created_at
    FROM products p
    LEFT JOIN product_categories pc ON pc.product_id = p.id
";

// =============================================================================
// Repository
// =============================================================================

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List all products, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Product>, RepositoryError> {
        let sql = format!("{SELECT_PRODUCTS} GROUP BY p.id ORDER BY p.created_at DESC, p.id DESC");
        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .fetch_all(self.pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let sql = format!("{SELECT_PRODUCTS} WHERE p.id = $1 GROUP BY p.id");
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(id.as_i32())
            .fetch_optional(self.pool)
            .await?;

        Ok(row.map(Into::into))
    }

    /// Create a product with zero stock for each of its sizes.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if a category does not exist.
    /// Returns `RepositoryError::Database` for other database errors.
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create(&self, input: &ProductInput) -> Result<ProductId, RepositoryError> {
        let stock = StockLevels::new().normalized_for(&input.sizes);
        let mut tx = self.pool.begin().await?;

        let id: i32 = sqlx::query_scalar(
            r"
            INSERT INTO products
                (name, description, price, images, sizes, customizable, customization_label, stock)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            ",
        )
        .bind(input.name.trim())
        .bind(&input.description)
        .bind(input.price)
        .bind(Json(&input.images))
        .bind(&input.sizes)
        .bind(input.customizable)
        .bind(&input.customization_label)
        .bind(Json(&stock))
        .fetch_one(&mut *tx)
        .await?;

        let id = ProductId::new(id);
        replace_categories(&mut tx, id, &input.category_ids).await?;
        tx.commit().await?;

        tracing::info!(product_id = %id, "Product created");
        Ok(id)
    }

    /// Update a product. Stock buckets follow the new size list: removed
    /// sizes are dropped and new ones start at zero.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    /// Returns `RepositoryError::Conflict` if a category does not exist.
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn update(&self, id: ProductId, input: &ProductInput) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let current: Option<Json<StockLevels>> =
            sqlx::query_scalar("SELECT stock FROM products WHERE id = $1 FOR UPDATE")
                .bind(id.as_i32())
                .fetch_optional(&mut *tx)
                .await?;
        let stock = current
            .ok_or(RepositoryError::NotFound)?
            .0
            .normalized_for(&input.sizes);

        sqlx::query(
            r"
            UPDATE products
            SET name = $2, description = $3, price = $4, images = $5, sizes = $6,
                customizable = $7, customization_label = $8, stock = $9, updated_at = now()
            WHERE id = $1
            ",
        )
        .bind(id.as_i32())
        .bind(input.name.trim())
        .bind(&input.description)
        .bind(input.price)
        .bind(Json(&input.images))
        .bind(&input.sizes)
        .bind(input.customizable)
        .bind(&input.customization_label)
        .bind(Json(&stock))
        .execute(&mut *tx)
        .await?;

        replace_categories(&mut tx, id, &input.category_ids).await?;
        tx.commit().await?;

        tracing::info!(product_id = %id, "Product updated");
        Ok(())
    }

    /// Overwrite the stock counts.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    #[instrument(skip(self, stock))]
    pub async fn update_stock(
        &self,
        id: ProductId,
        stock: &StockLevels,
    ) -> Result<(), RepositoryError> {
        let result =
            sqlx::query("UPDATE products SET stock = $2, updated_at = now() WHERE id = $1")
                .bind(id.as_i32())
                .bind(Json(stock))
                .execute(self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        tracing::info!(product_id = %id, total = stock.total(), "Stock updated");
        Ok(())
    }

    /// Delete a product and return it so its images can be cleaned up.
    ///
    /// Category links, kit links and product highlights go with it through
    /// `ON DELETE CASCADE`; explicit category orders are pruned here.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: ProductId) -> Result<Product, RepositoryError> {
        let product = self.get(id).await?.ok_or(RepositoryError::NotFound)?;
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r"
            UPDATE categories
            SET item_order = array_remove(item_order, $1)
            WHERE $1 = ANY(item_order)
            ",
        )
        .bind(id.as_i32())
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.as_i32())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::info!(product_id = %id, "Product deleted");
        Ok(product)
    }
}

async fn replace_categories(
    tx: &mut Transaction<'_, Postgres>,
    id: ProductId,
    category_ids: &[CategoryId],
) -> Result<(), RepositoryError> {
    sqlx::query("DELETE FROM product_categories WHERE product_id = $1")
        .bind(id.as_i32())
        .execute(&mut **tx)
        .await?;

    let ids: Vec<i32> = category_ids.iter().map(|c| c.as_i32()).collect();
    sqlx::query(
        r"
        INSERT INTO product_categories (product_id, category_id)
        SELECT $1, unnest($2::int[])
        ON CONFLICT DO NOTHING
        ",
    )
    .bind(id.as_i32())
    .bind(&ids)
    .execute(&mut **tx)
    .await
    .map_err(|e| map_constraint(e, "unknown category"))?;

    Ok(())
}
