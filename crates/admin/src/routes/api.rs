//! JSON endpoints used by the admin scripts.
//!
//! Reorder endpoints accept either the full proposed order (`{"ids": [...]}`)
//! or a single move (`{"from": 2, "to": 0}`) and always answer with the order
//! that was stored, so the page can reconcile its list.

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, State},
    routing::post,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use vitrine_core::reorder::{self, ReorderError};
use vitrine_core::{CategoryId, HighlightId, KitId, ProductId};

use super::categories::featured_order;
use crate::db::{CategoryRepository, HighlightRepository, KitRepository, ProductRepository};
use crate::error::{AppError, Result};
use crate::middleware::RequireAdminAuth;
use crate::services::storage::MAX_UPLOAD_BYTES;
use crate::services::{StoredObject, UploadFolder};
use crate::state::AppState;

/// Room for multipart boundaries and the folder field.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Build the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/kits/reorder", post(reorder_kits))
        .route("/api/highlights/reorder", post(reorder_highlights))
        .route("/api/categories/{id}/order", post(order_category))
        .route(
            "/api/uploads",
            post(upload).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + MULTIPART_OVERHEAD)),
        )
}

/// Reorder request body.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ReorderRequest<T> {
    /// Full proposed order.
    Ids { ids: Vec<T> },
    /// Move one item from `from` to `to`.
    Move { from: usize, to: usize },
}

impl<T> ReorderRequest<T> {
    /// Whether the current order is needed to resolve this request.
    const fn is_move(&self) -> bool {
        matches!(self, Self::Move { .. })
    }

    /// Turn the request into a full proposed order.
    fn resolve(self, mut current: Vec<T>) -> std::result::Result<Vec<T>, ReorderError> {
        match self {
            Self::Ids { ids } => Ok(ids),
            Self::Move { from, to } => {
                reorder::move_item(&mut current, from, to)?;
                Ok(current)
            }
        }
    }
}

/// Stored order.
#[derive(Debug, Serialize)]
pub struct OrderResponse<T> {
    pub ids: Vec<T>,
}

/// Reorder the kit list.
#[instrument(skip(_admin, state, body))]
async fn reorder_kits(
    RequireAdminAuth(_admin): RequireAdminAuth,
    State(state): State<AppState>,
    Json(body): Json<ReorderRequest<KitId>>,
) -> Result<Json<OrderResponse<KitId>>> {
    let repo = KitRepository::new(state.pool());
    let current = if body.is_move() {
        repo.list().await?.into_iter().map(|k| k.id).collect()
    } else {
        Vec::new()
    };

    let proposed = body.resolve(current)?;
    let ids = repo.reorder(&proposed).await?;
    Ok(Json(OrderResponse { ids }))
}

/// Reorder the home carousel.
#[instrument(skip(_admin, state, body))]
async fn reorder_highlights(
    RequireAdminAuth(_admin): RequireAdminAuth,
    State(state): State<AppState>,
    Json(body): Json<ReorderRequest<HighlightId>>,
) -> Result<Json<OrderResponse<HighlightId>>> {
    let repo = HighlightRepository::new(state.pool());
    let current = if body.is_move() {
        repo.list().await?.into_iter().map(|h| h.id).collect()
    } else {
        Vec::new()
    };

    let proposed = body.resolve(current)?;
    let ids = repo.reorder(&proposed).await?;
    Ok(Json(OrderResponse { ids }))
}

/// Save the featured product order of a category.
///
/// The new order must contain exactly the products currently listed under
/// the category, descendants included.
#[instrument(skip(_admin, state, body))]
async fn order_category(
    RequireAdminAuth(_admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<CategoryId>,
    Json(body): Json<ReorderRequest<ProductId>>,
) -> Result<Json<OrderResponse<ProductId>>> {
    let pool = state.pool();
    let category_repo = CategoryRepository::new(pool);
    let product_repo = ProductRepository::new(pool);
    let (categories, products) = tokio::try_join!(
        category_repo.list(),
        product_repo.list(),
    )?;
    if !categories.iter().any(|c| c.id == id) {
        return Err(AppError::NotFound(format!("category {id}")));
    }

    let current = featured_order(&categories, &products, id);
    let proposed = body.resolve(current.clone())?;
    reorder::validate_permutation(&current, &proposed)?;

    CategoryRepository::new(pool)
        .set_item_order(id, &proposed)
        .await?;
    Ok(Json(OrderResponse { ids: proposed }))
}

fn bad_multipart(error: &axum::extract::multipart::MultipartError) -> AppError {
    AppError::BadRequest(format!("invalid upload: {}", error.body_text()))
}

/// Upload an image to object storage.
///
/// Expects a `folder` field (`products`, `kits` or `highlights`) and a
/// `file` field carrying the image with its content type.
#[instrument(skip(_admin, state, multipart))]
async fn upload(
    RequireAdminAuth(_admin): RequireAdminAuth,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<StoredObject>> {
    let mut folder = None;
    let mut file = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| bad_multipart(&e))? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "folder" => {
                let text = field.text().await.map_err(|e| bad_multipart(&e))?;
                folder = Some(text.trim().parse::<UploadFolder>().map_err(AppError::BadRequest)?);
            }
            "file" => {
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field.bytes().await.map_err(|e| bad_multipart(&e))?;
                file = Some((content_type, bytes.to_vec()));
            }
            _ => {}
        }
    }

    let folder = folder.ok_or_else(|| AppError::BadRequest("missing folder field".to_string()))?;
    let (content_type, bytes) =
        file.ok_or_else(|| AppError::BadRequest("missing file field".to_string()))?;

    let stored = state
        .storage()
        .upload_image(folder, &content_type, bytes)
        .await?;
    Ok(Json(stored))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn ids(raw: &[i32]) -> Vec<KitId> {
        raw.iter().copied().map(KitId::new).collect()
    }

    #[test]
    fn test_reorder_request_accepts_full_order() {
        let body: ReorderRequest<KitId> = serde_json::from_str(r#"{"ids":[3,1,2]}"#).unwrap();
        assert!(!body.is_move());
        assert_eq!(body.resolve(Vec::new()).unwrap(), ids(&[3, 1, 2]));
    }

    #[test]
    fn test_reorder_request_applies_single_move() {
        let body: ReorderRequest<KitId> = serde_json::from_str(r#"{"from":2,"to":0}"#).unwrap();
        assert!(body.is_move());
        assert_eq!(body.resolve(ids(&[1, 2, 3])).unwrap(), ids(&[3, 1, 2]));
    }

    #[test]
    fn test_reorder_request_rejects_move_past_end() {
        let body: ReorderRequest<KitId> = serde_json::from_str(r#"{"from":5,"to":0}"#).unwrap();
        assert_eq!(
            body.resolve(ids(&[1, 2])),
            Err(ReorderError::OutOfBounds { index: 5, len: 2 })
        );
    }

    #[test]
    fn test_upload_folder_parsing() {
        assert_eq!("kits".parse::<UploadFolder>(), Ok(UploadFolder::Kits));
        assert!("avatars".parse::<UploadFolder>().is_err());
    }

    #[test]
    fn test_order_response_shape() {
        let body = serde_json::to_value(OrderResponse { ids: ids(&[2, 1]) }).unwrap();
        assert_eq!(body, serde_json::json!({ "ids": [2, 1] }));
    }
}
