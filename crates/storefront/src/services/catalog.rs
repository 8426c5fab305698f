//! Cached catalog snapshot.
//!
//! Every page is rendered from one in-memory [`Catalog`]. The snapshot is
//! reloaded from the database at most once per minute, so admin edits show
//! up on the storefront within that window.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use sqlx::PgPool;
use tracing::instrument;
use vitrine_core::catalog::Catalog;

use crate::db::{CatalogRepository, RepositoryError};

/// How long a loaded snapshot is served before the next reload.
pub const CATALOG_TTL: Duration = Duration::from_secs(60);

type SnapshotCache = Cache<(), Arc<Catalog>>;

fn snapshot_cache() -> SnapshotCache {
    Cache::builder()
        .max_capacity(1)
        .time_to_live(CATALOG_TTL)
        .build()
}

/// Serve the cached snapshot, or run `load` once for all concurrent callers.
async fn cached(
    cache: &SnapshotCache,
    load: impl Future<Output = Result<Catalog, RepositoryError>>,
) -> Result<Arc<Catalog>, RepositoryError> {
    cache
        .try_get_with((), async move {
            let catalog = load.await?;
            tracing::debug!("Catalog cache refreshed");
            Ok::<_, RepositoryError>(Arc::new(catalog))
        })
        .await
        .map_err(RepositoryError::Shared)
}

/// Loads and caches the catalog.
#[derive(Clone)]
pub struct CatalogService {
    pool: PgPool,
    cache: SnapshotCache,
}

impl CatalogService {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            cache: snapshot_cache(),
        }
    }

    /// The current snapshot, loading it on a cache miss.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` when the catalog cannot be loaded.
    #[instrument(skip(self))]
    pub async fn snapshot(&self) -> Result<Arc<Catalog>, RepositoryError> {
        let repo = CatalogRepository::new(&self.pool);
        cached(&self.cache, repo.load()).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[tokio::test]
    async fn test_concurrent_misses_load_once() {
        let cache = snapshot_cache();
        let loads = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                let loads = Arc::clone(&loads);
                tokio::spawn(async move {
                    cached(&cache, async move {
                        loads.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Ok(Catalog::default())
                    })
                    .await
                })
            })
            .collect();

        for task in tasks {
            assert!(task.await.unwrap().is_ok());
        }
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_load_is_not_cached() {
        let cache = snapshot_cache();

        let failed = cached(&cache, async {
            Err(RepositoryError::DataCorruption("bad row".to_string()))
        })
        .await;
        assert!(matches!(failed, Err(RepositoryError::Shared(_))));

        let loaded = cached(&cache, async { Ok(Catalog::default()) }).await;
        assert!(loaded.is_ok());
    }
}
