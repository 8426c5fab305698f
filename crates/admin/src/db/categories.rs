//! Category repository.

use sqlx::PgPool;
use tracing::instrument;

use vitrine_core::catalog::Category;
use vitrine_core::{CategoryId, ProductId};

use super::{RepositoryError, map_constraint};
use crate::models::CategoryInput;

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

/// Repository for category database operations.
pub struct CategoryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CategoryRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List all categories by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Category>, RepositoryError> {
        let rows = sqlx::query_as::<_, CategoryRow>(
            "SELECT id, name, parent_id, item_order FROM categories ORDER BY name, id",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Get a category by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: CategoryId) -> Result<Option<Category>, RepositoryError> {
        let row = sqlx::query_as::<_, CategoryRow>(
            "SELECT id, name, parent_id, item_order FROM categories WHERE id = $1",
        )
        .bind(id.as_i32())
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Create a category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the parent does not exist.
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create(&self, input: &CategoryInput) -> Result<CategoryId, RepositoryError> {
        let id: i32 = sqlx::query_scalar(
            "INSERT INTO categories (name, parent_id) VALUES ($1, $2) RETURNING id",
        )
        .bind(input.name.trim())
        .bind(input.parent_id.map(|p| p.as_i32()))
        .fetch_one(self.pool)
        .await
        .map_err(|e| map_constraint(e, "unknown parent category"))?;

        tracing::info!(category_id = id, "Category created");
        Ok(CategoryId::new(id))
    }

    /// Rename or move a category. Cycle checks are the caller's job.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category does not exist.
    /// Returns `RepositoryError::Conflict` if the parent does not exist.
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn update(&self, id: CategoryId, input: &CategoryInput) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE categories SET name = $2, parent_id = $3 WHERE id = $1")
            .bind(id.as_i32())
            .bind(input.name.trim())
            .bind(input.parent_id.map(|p| p.as_i32()))
            .execute(self.pool)
            .await
            .map_err(|e| map_constraint(e, "unknown parent category"))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        tracing::info!(category_id = %id, "Category updated");
        Ok(())
    }

    /// Delete a category. Its subcategories move up to its parent and its
    /// products simply lose the assignment.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category does not exist.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: CategoryId) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let parent: Option<Option<i32>> =
            sqlx::query_scalar("SELECT parent_id FROM categories WHERE id = $1 FOR UPDATE")
                .bind(id.as_i32())
                .fetch_optional(&mut *tx)
                .await?;
        let parent = parent.ok_or(RepositoryError::NotFound)?;

        sqlx::query("UPDATE categories SET parent_id = $2 WHERE parent_id = $1")
            .bind(id.as_i32())
            .bind(parent)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id.as_i32())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::info!(category_id = %id, "Category deleted");
        Ok(())
    }

    /// Store the explicit product order used by the featured listing.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category does not exist.
    #[instrument(skip(self, order), fields(items = order.len()))]
    pub async fn set_item_order(
        &self,
        id: CategoryId,
        order: &[ProductId],
    ) -> Result<(), RepositoryError> {
        let ids: Vec<i32> = order.iter().map(ProductId::as_i32).collect();
        let result = sqlx::query("UPDATE categories SET item_order = $2 WHERE id = $1")
            .bind(id.as_i32())
            .bind(&ids)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        tracing::info!(category_id = %id, "Category order saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_without_order_stays_unordered() {
        let category = Category::from(CategoryRow {
            id: 3,
            name: "Camisetas".to_string(),
            parent_id: Some(1),
            item_order: None,
        });
        assert_eq!(category.parent_id, Some(CategoryId::new(1)));
        assert!(category.item_order.is_none());

        let category = Category::from(CategoryRow {
            id: 3,
            name: "Camisetas".to_string(),
            parent_id: None,
            item_order: Some(vec![8, 2]),
        });
        assert_eq!(
            category.item_order,
            Some(vec![ProductId::new(8), ProductId::new(2)])
        );
    }
}
