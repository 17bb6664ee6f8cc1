use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use super::snapshot::OfferFeed;
use crate::api::CollectionList;
use crate::core::{BotError, Result};

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 10,
            delay: Duration::from_secs(1),
        }
    }
}

/// File-backed collection list with a time-to-live on the file's mtime.
pub struct CollectionCache {
    feed: Arc<OfferFeed>,
    path: PathBuf,
    ttl: Duration,
    retry: RetryPolicy,
    limit: u32,
}

impl CollectionCache {
    pub fn new(
        feed: Arc<OfferFeed>,
        path: impl Into<PathBuf>,
        ttl: Duration,
        retry: RetryPolicy,
        limit: u32,
    ) -> Self {
        Self {
            feed,
            path: path.into(),
            ttl,
            retry,
            limit,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn get_collections(&self) -> Result<CollectionList> {
        match self.read_fresh().await {
            Ok(Some(cached)) => {
                tracing::debug!("Using cached collections from {}", self.path.display());
                return Ok(cached);
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!("Failed to read collection cache {}: {}", self.path.display(), e);
            }
        }

        tracing::info!("🔄 Collection cache stale, fetching from marketplace...");
        let collections = self.fetch_with_retries().await?;

        if let Err(e) = self.persist(&collections).await {
            tracing::warn!("Failed to write collection cache {}: {}", self.path.display(), e);
        }

        Ok(collections)
    }

    async fn read_fresh(&self) -> Result<Option<CollectionList>> {
        let metadata = match tokio::fs::metadata(&self.path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        // A modification time in the future counts as fresh.
        let age = metadata.modified()?.elapsed().unwrap_or_default();
        if age >= self.ttl {
            return Ok(None);
        }

        let raw = tokio::fs::read(&self.path).await?;
        Ok(Some(serde_json::from_slice(&raw)?))
    }

    async fn fetch_with_retries(&self) -> Result<CollectionList> {
        let mut last_error = String::new();

        for attempt in 1..=self.retry.attempts {
            tracing::debug!("Collection fetch attempt {}/{}", attempt, self.retry.attempts);

            match self.feed.fetch_collections(self.limit).await {
                Ok(collections) => {
                    tracing::info!(
                        "✅ Fetched {} collections (attempt {})",
                        collections.collections.len(),
                        attempt
                    );
                    return Ok(collections);
                }
                Err(e) => {
                    tracing::warn!("Collection fetch attempt {} failed: {}", attempt, e);
                    last_error = e.to_string();
                }
            }

            if attempt < self.retry.attempts {
                tokio::time::sleep(self.retry.delay).await;
            }
        }

        Err(BotError::TransportExhausted {
            attempts: self.retry.attempts,
            last: last_error,
        })
    }

    async fn persist(&self, collections: &CollectionList) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let body = serde_json::to_vec_pretty(collections)?;
        tokio::fs::write(&self.path, body).await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::portals::MockMarketplaceTransport;
    use crate::api::{Collection, StaticCredentialProvider};
    use rust_decimal_macros::dec;

    fn list(ids: &[&str]) -> CollectionList {
        CollectionList {
            collections: ids
                .iter()
                .map(|id| Collection {
                    id: id.to_string(),
                    name: format!("name-{}", id),
                    floor_price: dec!(10),
                })
                .collect(),
        }
    }

    fn cache(transport: MockMarketplaceTransport, path: PathBuf, ttl: Duration) -> CollectionCache {
        let feed = OfferFeed::new(
            Arc::new(StaticCredentialProvider::new("t")),
            Arc::new(transport),
        );
        let retry = RetryPolicy {
            attempts: 10,
            delay: Duration::ZERO,
        };
        CollectionCache::new(Arc::new(feed), path, ttl, retry, 200)
    }

    #[tokio::test]
    async fn test_fresh_file_served_without_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("collections.json");
        std::fs::write(&path, serde_json::to_vec(&list(&["c1", "c2"])).unwrap()).unwrap();

        let mut transport = MockMarketplaceTransport::new();
        transport.expect_list_collections().times(0);

        let cache = cache(transport, path, Duration::from_secs(60));
        let collections = cache.get_collections().await.unwrap();

        assert_eq!(collections, list(&["c1", "c2"]));
    }

    #[tokio::test]
    async fn test_absent_file_fetched_once_and_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("collections.json");

        let mut transport = MockMarketplaceTransport::new();
        transport
            .expect_list_collections()
            .withf(|_, limit| *limit == 200)
            .times(1)
            .returning(|_, _| Ok(list(&["c9"])));

        let cache = cache(transport, path.clone(), Duration::from_secs(60));
        assert_eq!(cache.get_collections().await.unwrap(), list(&["c9"]));

        // second call hits the freshly written file
        assert_eq!(cache.get_collections().await.unwrap(), list(&["c9"]));

        let on_disk: CollectionList =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(on_disk, list(&["c9"]));
    }

    #[tokio::test]
    async fn test_stale_file_refetched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("collections.json");
        std::fs::write(&path, serde_json::to_vec(&list(&["old"])).unwrap()).unwrap();

        let mut transport = MockMarketplaceTransport::new();
        transport
            .expect_list_collections()
            .times(1)
            .returning(|_, _| Ok(list(&["new"])));

        let cache = cache(transport, path, Duration::ZERO);
        assert_eq!(cache.get_collections().await.unwrap(), list(&["new"]));
    }

    #[tokio::test]
    async fn test_retries_then_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let mut calls = 0;

        let mut transport = MockMarketplaceTransport::new();
        transport
            .expect_list_collections()
            .times(3)
            .returning(move |_, _| {
                calls += 1;
                if calls < 3 {
                    Err(BotError::Transport("502".to_string()))
                } else {
                    Ok(list(&["c1"]))
                }
            });

        let cache = cache(transport, dir.path().join("c.json"), Duration::from_secs(60));
        assert_eq!(cache.get_collections().await.unwrap(), list(&["c1"]));
    }

    #[tokio::test]
    async fn test_exhausted_leaves_stale_cache_intact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("collections.json");
        let stale = serde_json::to_vec(&list(&["old"])).unwrap();
        std::fs::write(&path, &stale).unwrap();

        let mut transport = MockMarketplaceTransport::new();
        transport
            .expect_list_collections()
            .times(10)
            .returning(|_, _| Err(BotError::Transport("timeout".to_string())));

        let cache = cache(transport, path.clone(), Duration::ZERO);
        let err = cache.get_collections().await.unwrap_err();

        assert!(matches!(err, BotError::TransportExhausted { attempts: 10, .. }));
        assert_eq!(std::fs::read(&path).unwrap(), stale);
    }
}
