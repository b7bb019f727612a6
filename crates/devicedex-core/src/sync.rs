//! Catalog synchronization.
//!
//! `SyncService` pulls the catalog and its image metadata from the remote
//! store, writes the snapshot, and decides on startup whether today's
//! snapshot can be used instead of the network.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::api::CatalogClient;
use crate::cache::{ImageCache, SnapshotStore};
use crate::models::{Catalog, CatalogItem, ImagesById};

/// Remote side of a sync.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn fetch_catalog(&self) -> Result<Vec<CatalogItem>>;
    async fn fetch_images(&self, ids: &[String]) -> Result<ImagesById>;
}

#[async_trait]
impl CatalogSource for CatalogClient {
    async fn fetch_catalog(&self) -> Result<Vec<CatalogItem>> {
        CatalogClient::fetch_catalog(self).await
    }

    async fn fetch_images(&self, ids: &[String]) -> Result<ImagesById> {
        CatalogClient::fetch_images(self, ids).await
    }
}

/// Where a catalog returned by [`SyncService::load_or_sync`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogOrigin {
    /// Fetched from the remote store just now.
    Remote,
    /// Today's snapshot; no network used.
    Snapshot,
    /// The remote fetch failed and an older snapshot was used.
    StaleSnapshot,
}

pub struct SyncService {
    source: Arc<dyn CatalogSource>,
    snapshot: SnapshotStore,
    images: Arc<ImageCache>,
}

impl SyncService {
    pub fn new(
        source: Arc<dyn CatalogSource>,
        snapshot: SnapshotStore,
        images: Arc<ImageCache>,
    ) -> Self {
        Self {
            source,
            snapshot,
            images,
        }
    }

    pub fn snapshot(&self) -> &SnapshotStore {
        &self.snapshot
    }

    pub fn images(&self) -> &Arc<ImageCache> {
        &self.images
    }

    /// Fetch everything from the remote store and overwrite the snapshot.
    ///
    /// The snapshot is left untouched when either fetch fails.
    pub async fn sync(&self) -> Result<Catalog> {
        info!("Starting catalog sync");
        let items = self
            .source
            .fetch_catalog()
            .await
            .context("Failed to fetch catalog")?;

        let ids: Vec<String> = items.iter().map(|item| item.id.clone()).collect();
        let images = self
            .source
            .fetch_images(&ids)
            .await
            .context("Failed to fetch image metadata")?;

        if !self.snapshot.save(&items, &images) {
            warn!("Catalog synced but snapshot could not be written");
        }
        info!(items = items.len(), "Catalog sync complete");
        Ok(Catalog::new(items, images))
    }

    /// Today's snapshot when present (unless `force`), otherwise a fresh sync,
    /// falling back to whatever snapshot is on disk if the sync fails.
    pub async fn load_or_sync(&self, force: bool) -> Result<(Catalog, CatalogOrigin)> {
        if !force && self.snapshot.has_valid_snapshot_for_today() {
            if let Some(catalog) = self.snapshot.load() {
                info!(items = catalog.items.len(), "Using today's snapshot");
                return Ok((catalog, CatalogOrigin::Snapshot));
            }
        }

        match self.sync().await {
            Ok(catalog) => Ok((catalog, CatalogOrigin::Remote)),
            Err(e) => match self.snapshot.load() {
                Some(catalog) => {
                    warn!(error = %e, "Sync failed, using stale snapshot");
                    Ok((catalog, CatalogOrigin::StaleSnapshot))
                }
                None => Err(e),
            },
        }
    }

    /// Warm the image cache for every item in the background.
    ///
    /// The task resolves to the number of images cached.
    pub fn spawn_preload(&self, catalog: &Catalog) -> JoinHandle<usize> {
        let images = Arc::clone(&self.images);
        let work: Vec<_> = catalog
            .items
            .iter()
            .filter_map(|item| {
                catalog
                    .images_for(&item.id)
                    .map(|set| (item.id.clone(), set.clone()))
            })
            .collect();

        tokio::spawn(async move {
            let mut total = 0;
            for (item_id, set) in &work {
                total += images.preload(item_id, set).await;
            }
            info!(items = work.len(), images = total, "Image preload finished");
            total
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ImageFetcher;
    use crate::models::{ColorImage, ColorImageSet};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct StubSource {
        items: Mutex<Option<Vec<CatalogItem>>>,
        images: ImagesById,
        catalog_calls: AtomicUsize,
    }

    impl StubSource {
        fn new(items: Option<Vec<CatalogItem>>, images: ImagesById) -> Arc<Self> {
            Arc::new(Self {
                items: Mutex::new(items),
                images,
                catalog_calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.catalog_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CatalogSource for StubSource {
        async fn fetch_catalog(&self) -> Result<Vec<CatalogItem>> {
            self.catalog_calls.fetch_add(1, Ordering::SeqCst);
            self.items
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| anyhow::anyhow!("connection refused"))
        }

        async fn fetch_images(&self, ids: &[String]) -> Result<ImagesById> {
            Ok(self
                .images
                .iter()
                .filter(|(id, _)| ids.contains(*id))
                .map(|(id, set)| (id.clone(), set.clone()))
                .collect())
        }
    }

    struct NoNetwork;

    #[async_trait]
    impl ImageFetcher for NoNetwork {
        async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
            Err(anyhow::anyhow!("offline: {}", url))
        }
    }

    fn items() -> Vec<CatalogItem> {
        vec![CatalogItem {
            id: "s24".to_string(),
            manufacturer: "Samsung".to_string(),
            model_name: "Galaxy S24".to_string(),
            ..Default::default()
        }]
    }

    fn images() -> ImagesById {
        let mut set = ColorImageSet::new();
        set.insert(
            "Onyx Black",
            ColorImage {
                high_res: "https://cdn.example/s24/onyx_black_high.jpg".to_string(),
                low_res: "https://cdn.example/s24/onyx_black_low.jpg".to_string(),
                hex_color: Some("#101010".to_string()),
            },
        );
        let mut images = ImagesById::new();
        images.insert("s24".to_string(), set);
        images.insert("orphan".to_string(), ColorImageSet::new());
        images
    }

    fn service(dir: &std::path::Path, source: Arc<StubSource>) -> SyncService {
        let snapshot = SnapshotStore::new(dir.to_path_buf()).unwrap();
        let cache = ImageCache::with_fetcher(dir, Arc::new(NoNetwork)).unwrap();
        SyncService::new(source, snapshot, Arc::new(cache))
    }

    #[tokio::test]
    async fn test_sync_writes_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(dir.path(), StubSource::new(Some(items()), images()));

        let catalog = svc.sync().await.unwrap();
        assert_eq!(catalog.items, items());
        assert!(catalog.images_for("s24").is_some());
        assert!(catalog.images_for("orphan").is_none());
        assert!(svc.snapshot().has_valid_snapshot_for_today());
    }

    #[tokio::test]
    async fn test_load_or_sync_prefers_todays_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let source = StubSource::new(Some(items()), images());
        let svc = service(dir.path(), source.clone());

        let (_, origin) = svc.load_or_sync(false).await.unwrap();
        assert_eq!(origin, CatalogOrigin::Remote);
        let (catalog, origin) = svc.load_or_sync(false).await.unwrap();
        assert_eq!(origin, CatalogOrigin::Snapshot);
        assert_eq!(catalog.items.len(), 1);
        assert_eq!(source.calls(), 1);

        let (_, origin) = svc.load_or_sync(true).await.unwrap();
        assert_eq!(origin, CatalogOrigin::Remote);
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_failed_sync_falls_back_to_stale_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let source = StubSource::new(None, images());
        let svc = service(dir.path(), source.clone());

        assert!(svc.load_or_sync(false).await.is_err());

        let yesterday = chrono::Local::now() - chrono::Duration::days(1);
        assert!(svc.snapshot().save_at(&items(), &images(), yesterday));

        let (catalog, origin) = svc.load_or_sync(false).await.unwrap();
        assert_eq!(origin, CatalogOrigin::StaleSnapshot);
        assert_eq!(catalog.items, items());
        // The stale snapshot is not rewritten by a failed sync
        assert!(!svc.snapshot().has_valid_snapshot_for_today());
    }

    #[tokio::test]
    async fn test_spawn_preload_survives_offline() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(dir.path(), StubSource::new(Some(items()), images()));
        let catalog = svc.sync().await.unwrap();

        let cached = svc.spawn_preload(&catalog).await.unwrap();
        assert_eq!(cached, 0);
        assert_eq!(svc.images().size_in_bytes(), 0);
    }
}
