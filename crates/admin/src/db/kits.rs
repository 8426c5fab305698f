//! Kit repository.
//!
//! Kit components are stored in `kit_products` with a `position` column so
//! the storefront lists them in the order the admin picked.

use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::instrument;

use vitrine_core::catalog::{Kit, ProductImage};
use vitrine_core::reorder;
use vitrine_core::{KitId, ProductId};

use super::{RepositoryError, map_constraint};
use crate::models::KitInput;

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

const SELECT_KITS: &str = r"
    SELECT k.id, k.name, k.description, k.price, k.images,
           COALESCE(
               array_agg(kp.product_id ORDER BY kp.position, kp.product_id)
                   FILTER (WHERE kp.product_id IS NOT NULL),
               '{}'
           ) AS product_ids,
           k.discount_percent, k.sort_order
    FROM kits k
    LEFT JOIN kit_products kp ON kp.kit_id = k.id
";

/// Repository for kit database operations.
pub struct KitRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> KitRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List kits in display order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Kit>, RepositoryError> {
        let sql = format!("{SELECT_KITS} GROUP BY k.id ORDER BY k.sort_order, k.id");
        let rows = sqlx::query_as::<_, KitRow>(&sql)
            .fetch_all(self.pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Get a kit by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: KitId) -> Result<Option<Kit>, RepositoryError> {
        let sql = format!("{SELECT_KITS} WHERE k.id = $1 GROUP BY k.id");
        let row = sqlx::query_as::<_, KitRow>(&sql)
            .bind(id.as_i32())
            .fetch_optional(self.pool)
            .await?;

        Ok(row.map(Into::into))
    }

    /// Create a kit at the end of the display order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if a component product does not exist.
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create(&self, input: &KitInput) -> Result<KitId, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let id: i32 = sqlx::query_scalar(
            r"
            INSERT INTO kits (name, description, price, images, discount_percent, sort_order)
            VALUES ($1, $2, $3, $4, $5, (SELECT COALESCE(MAX(sort_order) + 1, 0) FROM kits))
            RETURNING id
            ",
        )
        .bind(input.name.trim())
        .bind(&input.description)
        .bind(input.price)
        .bind(Json(&input.images))
        .bind(input.discount_percent)
        .fetch_one(&mut *tx)
        .await?;

        let id = KitId::new(id);
        replace_products(&mut tx, id, &input.product_ids).await?;
        tx.commit().await?;

        tracing::info!(kit_id = %id, "Kit created");
        Ok(id)
    }

    /// Update a kit and its component list.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the kit does not exist.
    /// Returns `RepositoryError::Conflict` if a component product does not exist.
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn update(&self, id: KitId, input: &KitInput) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r"
            UPDATE kits
            SET name = $2, description = $3, price = $4, images = $5, discount_percent = $6
            WHERE id = $1
            ",
        )
        .bind(id.as_i32())
        .bind(input.name.trim())
        .bind(&input.description)
        .bind(input.price)
        .bind(Json(&input.images))
        .bind(input.discount_percent)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        replace_products(&mut tx, id, &input.product_ids).await?;
        tx.commit().await?;

        tracing::info!(kit_id = %id, "Kit updated");
        Ok(())
    }

    /// Delete a kit and return it so its images can be cleaned up.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the kit does not exist.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: KitId) -> Result<Kit, RepositoryError> {
        let kit = self.get(id).await?.ok_or(RepositoryError::NotFound)?;

        sqlx::query("DELETE FROM kits WHERE id = $1")
            .bind(id.as_i32())
            .execute(self.pool)
            .await?;

        tracing::info!(kit_id = %id, "Kit deleted");
        Ok(kit)
    }

    /// Apply a new display order and return the stored order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Reorder` if `order` is not a permutation of
    /// the existing kits.
    #[instrument(skip(self, order), fields(items = order.len()))]
    pub async fn reorder(&self, order: &[KitId]) -> Result<Vec<KitId>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let current: Vec<(i32, i32)> =
            sqlx::query_as("SELECT id, sort_order FROM kits ORDER BY sort_order, id FOR UPDATE")
                .fetch_all(&mut *tx)
                .await?;
        let current: Vec<(KitId, i32)> = current
            .into_iter()
            .map(|(id, sort_order)| (KitId::new(id), sort_order))
            .collect();

        let updates = reorder::plan(&current, order)?;
        for update in &updates {
            sqlx::query("UPDATE kits SET sort_order = $2 WHERE id = $1")
                .bind(update.id.as_i32())
                .bind(update.sort_order)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        tracing::info!(changed = updates.len(), "Kits reordered");
        Ok(order.to_vec())
    }
}

async fn replace_products(
    tx: &mut Transaction<'_, Postgres>,
    id: KitId,
    product_ids: &[ProductId],
) -> Result<(), RepositoryError> {
    sqlx::query("DELETE FROM kit_products WHERE kit_id = $1")
        .bind(id.as_i32())
        .execute(&mut **tx)
        .await?;

    let ids: Vec<i32> = product_ids.iter().map(ProductId::as_i32).collect();
    sqlx::query(
        r"
        INSERT INTO kit_products (kit_id, product_id, position)
        SELECT $1, product_id, (ordinality - 1)::int
        FROM unnest($2::int[]) WITH ORDINALITY AS t(product_id, ordinality)
        ",
    )
    .bind(id.as_i32())
    .bind(&ids)
    .execute(&mut **tx)
    .await
    .map_err(|e| map_constraint(e, "unknown or repeated product in kit"))?;

    Ok(())
}
