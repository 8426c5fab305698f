//! Highlight (home carousel) repository.

use sqlx::PgPool;
use sqlx::types::Json;
use tracing::instrument;

use vitrine_core::catalog::{Highlight, HighlightKind, ImageFrame};
use vitrine_core::reorder;
use vitrine_core::{HighlightId, ProductId};

use super::{RepositoryError, map_constraint};
use crate::models::HighlightInput;

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
            frame: row.frame.0,
            sort_order: row.sort_order,
        })
    }
}

/// Repository for highlight database operations.
pub struct HighlightRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> HighlightRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List highlights in carousel order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a row is inconsistent.
    pub async fn list(&self) -> Result<Vec<Highlight>, RepositoryError> {
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

    /// Append a highlight to the end of the carousel.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the product does not exist.
    #[instrument(skip(self, input), fields(kind = input.kind.as_str()))]
    pub async fn create(&self, input: &HighlightInput) -> Result<HighlightId, RepositoryError> {
        let (product_id, image_url, link_url, title) = match &input.kind {
            HighlightKind::Product { product_id } => (Some(product_id.as_i32()), None, None, None),
            HighlightKind::Image {
                image_url,
                link_url,
                title,
            } => (
                None,
                Some(image_url.as_str()),
                link_url.as_deref(),
                title.as_deref(),
            ),
        };

        let id: i32 = sqlx::query_scalar(
            r"
            INSERT INTO highlights (kind, product_id, image_url, link_url, title, frame, sort_order)
            VALUES ($1, $2, $3, $4, $5, $6,
                    (SELECT COALESCE(MAX(sort_order) + 1, 0) FROM highlights))
            RETURNING id
            ",
        )
        .bind(input.kind.as_str())
        .bind(product_id)
        .bind(image_url)
        .bind(link_url)
        .bind(title)
        .bind(Json(input.frame.clamped()))
        .fetch_one(self.pool)
        .await
        .map_err(|e| map_constraint(e, "unknown product"))?;

        tracing::info!(highlight_id = id, "Highlight created");
        Ok(HighlightId::new(id))
    }

    /// Delete a highlight and return it so an uploaded banner can be removed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the highlight does not exist.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: HighlightId) -> Result<Highlight, RepositoryError> {
        let row = sqlx::query_as::<_, HighlightRow>(
            r"
            DELETE FROM highlights
            WHERE id = $1
            RETURNING id, kind, product_id, image_url, link_url, title, frame, sort_order
            ",
        )
        .bind(id.as_i32())
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        tracing::info!(highlight_id = %id, "Highlight deleted");
        row.try_into()
    }

    /// Apply a new carousel order and return the stored order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Reorder` if `order` is not a permutation of
    /// the existing highlights.
    #[instrument(skip(self, order), fields(items = order.len()))]
    pub async fn reorder(&self, order: &[HighlightId]) -> Result<Vec<HighlightId>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let current: Vec<(i32, i32)> = sqlx::query_as(
            "SELECT id, sort_order FROM highlights ORDER BY sort_order, id FOR UPDATE",
        )
        .fetch_all(&mut *tx)
        .await?;
        let current: Vec<(HighlightId, i32)> = current
            .into_iter()
            .map(|(id, sort_order)| (HighlightId::new(id), sort_order))
            .collect();

        let updates = reorder::plan(&current, order)?;
        for update in &updates {
            sqlx::query("UPDATE highlights SET sort_order = $2 WHERE id = $1")
                .bind(update.id.as_i32())
                .bind(update.sort_order)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        tracing::info!(changed = updates.len(), "Highlights reordered");
        Ok(order.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(kind: &str, product_id: Option<i32>, image_url: Option<&str>) -> HighlightRow {
        HighlightRow {
            id: 1,
            kind: kind.to_string(),
            product_id,
            image_url: image_url.map(ToString::to_string),
            link_url: None,
            title: None,
            frame: Json(ImageFrame::default()),
            sort_order: 0,
        }
    }

    #[test]
    fn test_row_kinds() {
        let highlight = Highlight::try_from(row("product", Some(5), None)).unwrap_or_else(|e| {
            panic!("product row rejected: {e}");
        });
        assert_eq!(
            highlight.kind,
            HighlightKind::Product {
                product_id: ProductId::new(5)
            }
        );

        assert!(Highlight::try_from(row("image", None, Some("https://cdn/b.jpg"))).is_ok());
        assert!(matches!(
            Highlight::try_from(row("image", Some(5), None)),
            Err(RepositoryError::DataCorruption(_))
        ));
    }
}
