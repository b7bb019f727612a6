use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use image::codecs::jpeg::JpegEncoder;
use tracing::{debug, info, warn};

use super::fetcher::{HttpImageFetcher, ImageFetcher};
use crate::models::{normalize_color_key, ColorImageSet, ImageTier};
use crate::utils::format_size;

/// Subdirectory of the cache root holding image files.
pub const IMAGES_DIR: &str = "images";

/// Extension of the canonical on-disk format.
const CACHE_EXT: &str = "jpg";

/// JPEG quality used when re-encoding downloads.
const JPEG_QUALITY: u8 = 90;

/// Maximum concurrent downloads while preloading one item.
const MAX_CONCURRENT_PRELOADS: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    item_id: String,
    color: String,
    tier: ImageTier,
}

impl CacheKey {
    fn new(item_id: &str, color: &str, tier: ImageTier) -> Self {
        Self {
            item_id: sanitize(item_id),
            color: sanitize(&normalize_color_key(color)),
            tier,
        }
    }

    fn file_name(&self) -> String {
        format!(
            "{}_{}_{}.{}",
            self.item_id,
            self.color,
            self.tier.as_str(),
            CACHE_EXT
        )
    }
}

/// Keep path separators out of cache file names.
fn sanitize(part: &str) -> String {
    part.replace(['/', '\\'], "_")
}

/// Where a screen should load an image from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    Local(PathBuf),
    Remote(String),
}

/// Shared download slot for one key, released on drop.
struct InFlight<'a> {
    cache: &'a ImageCache,
    key: CacheKey,
    lock: Arc<tokio::sync::Mutex<()>>,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut in_flight = self
            .cache
            .in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        // Only the last holder removes the entry; a waiter still owns a clone
        if Arc::strong_count(&self.lock) == 2
            && in_flight
                .get(&self.key)
                .is_some_and(|current| Arc::ptr_eq(current, &self.lock))
        {
            in_flight.remove(&self.key);
        }
    }
}

/// Grow-only local mirror of remote color images.
///
/// A cached file is valid when it exists with nonzero length; nothing is
/// ever checked against the remote copy. Concurrent requests for the same
/// key share one download.
pub struct ImageCache {
    root: PathBuf,
    fetcher: Arc<dyn ImageFetcher>,
    in_flight: Mutex<HashMap<CacheKey, Arc<tokio::sync::Mutex<()>>>>,
}

impl ImageCache {
    /// Create a cache under `cache_dir/images` that downloads over HTTP
    pub fn new(cache_dir: &Path) -> Result<Self> {
        Self::with_fetcher(cache_dir, Arc::new(HttpImageFetcher::new()?))
    }

    pub fn with_fetcher(cache_dir: &Path, fetcher: Arc<dyn ImageFetcher>) -> Result<Self> {
        let root = cache_dir.join(IMAGES_DIR);
        fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create image cache dir {}", root.display()))?;
        Ok(Self {
            root,
            fetcher,
            in_flight: Mutex::new(HashMap::new()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.root.join(key.file_name())
    }

    /// Local path for a cached image, if a non-empty file is present.
    pub fn resolve(&self, item_id: &str, color: &str, tier: ImageTier) -> Option<PathBuf> {
        let path = self.path_for(&CacheKey::new(item_id, color, tier));
        match fs::metadata(&path) {
            Ok(meta) if meta.is_file() && meta.len() > 0 => Some(path),
            _ => None,
        }
    }

    /// Download, re-encode and store an image unless it is already cached.
    ///
    /// Returns `None` on any network, decode or I/O failure; callers fall
    /// back to the remote URL.
    pub async fn fetch_and_cache(
        &self,
        url: &str,
        item_id: &str,
        color: &str,
        tier: ImageTier,
    ) -> Option<PathBuf> {
        if let Some(path) = self.resolve(item_id, color, tier) {
            return Some(path);
        }

        let slot = self.claim(CacheKey::new(item_id, color, tier));
        let result = {
            let _guard = slot.lock.lock().await;
            // Another task may have finished this key while we waited
            match self.resolve(item_id, color, tier) {
                Some(path) => Ok(path),
                None => self.download(url, &slot.key).await,
            }
        };
        drop(slot);

        match result {
            Ok(path) => Some(path),
            Err(e) => {
                warn!(item_id, color, %tier, error = %e, "Failed to cache image");
                None
            }
        }
    }

    /// Preferred source for an image: the cached file, a fresh download, or
    /// the remote URL itself when the download fails.
    pub async fn best_source(
        &self,
        url: Option<&str>,
        item_id: &str,
        color: &str,
        tier: ImageTier,
    ) -> Option<ImageSource> {
        if let Some(path) = self.resolve(item_id, color, tier) {
            return Some(ImageSource::Local(path));
        }
        let url = url.filter(|u| !u.is_empty())?;
        match self.fetch_and_cache(url, item_id, color, tier).await {
            Some(path) => Some(ImageSource::Local(path)),
            None => Some(ImageSource::Remote(url.to_string())),
        }
    }

    /// Warm both tiers of every color for one item. Failures are skipped.
    ///
    /// Returns how many images are cached afterwards.
    pub async fn preload(&self, item_id: &str, colors: &ColorImageSet) -> usize {
        let jobs: Vec<(String, ImageTier, String)> = colors
            .iter()
            .flat_map(|(color, image)| {
                ImageTier::ALL.into_iter().filter_map(move |tier| {
                    image
                        .url(tier)
                        .map(|url| (color.clone(), tier, url.to_string()))
                })
            })
            .collect();

        let cached = stream::iter(jobs)
            .map(|(color, tier, url)| async move {
                self.fetch_and_cache(&url, item_id, &color, tier).await
            })
            .buffer_unordered(MAX_CONCURRENT_PRELOADS)
            .fold(0, |n, result| async move { n + usize::from(result.is_some()) })
            .await;

        debug!(item_id, cached, "Preloaded item images");
        cached
    }

    /// Delete every cached image.
    pub fn clear(&self) -> bool {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return true,
            Err(e) => {
                warn!(error = %e, "Failed to read image cache dir");
                return false;
            }
        };

        let mut ok = true;
        for entry in entries.flatten() {
            let path = entry.path();
            let removed = if path.is_dir() {
                fs::remove_dir_all(&path)
            } else {
                fs::remove_file(&path)
            };
            if let Err(e) = removed {
                warn!(path = %path.display(), error = %e, "Failed to remove cached image");
                ok = false;
            }
        }
        info!(ok, "Cleared image cache");
        ok
    }

    /// Total bytes of all cached files.
    pub fn size_in_bytes(&self) -> u64 {
        fs::read_dir(&self.root)
            .map(|entries| {
                entries
                    .flatten()
                    .filter_map(|entry| entry.metadata().ok())
                    .filter(|meta| meta.is_file())
                    .map(|meta| meta.len())
                    .sum()
            })
            .unwrap_or(0)
    }

    pub fn size_formatted(&self) -> String {
        format_size(self.size_in_bytes())
    }

    /// Join or open the in-flight slot for `key`. The slot leaves the map
    /// when the last holder drops it, including on cancellation.
    fn claim(&self, key: CacheKey) -> InFlight<'_> {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        let lock = Arc::clone(in_flight.entry(key.clone()).or_default());
        InFlight {
            cache: self,
            key,
            lock,
        }
    }

    #[cfg(test)]
    fn in_flight_len(&self) -> usize {
        self.in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    async fn download(&self, url: &str, key: &CacheKey) -> Result<PathBuf> {
        let bytes = self.fetcher.fetch(url).await?;
        let path = self.path_for(key);
        let target = path.clone();
        tokio::task::spawn_blocking(move || write_canonical(&bytes, &target))
            .await
            .context("Image encode task panicked")??;
        debug!(path = %path.display(), "Cached image");
        Ok(path)
    }
}

/// Decode `bytes`, re-encode as JPEG, and move the result into place.
///
/// The data lands in a `.part` file first so a crash never leaves a
/// truncated file under the final name.
fn write_canonical(bytes: &[u8], path: &Path) -> Result<()> {
    let decoded = image::load_from_memory(bytes).context("Failed to decode image")?;
    let rgb = decoded.to_rgb8();

    let mut encoded = Vec::new();
    JpegEncoder::new_with_quality(&mut encoded, JPEG_QUALITY)
        .encode_image(&rgb)
        .context("Failed to encode image")?;

    let partial = path.with_extension(format!("{}.part", CACHE_EXT));
    fs::write(&partial, &encoded)
        .with_context(|| format!("Failed to write {}", partial.display()))?;
    if let Err(e) = fs::rename(&partial, path) {
        let _ = fs::remove_file(&partial);
        return Err(e).with_context(|| format!("Failed to move image into {}", path.display()));
    }
    Ok(())
}
