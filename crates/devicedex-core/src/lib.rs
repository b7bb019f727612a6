//! devicedex core - catalog client, models, image cache and offline snapshot.
//!
//! The UI layer builds one `SyncService` at startup from a `Config` and keeps
//! it for the life of the process:
//!
//! ```no_run
//! # async fn run() -> anyhow::Result<()> {
//! use std::sync::Arc;
//! use devicedex_core::{CatalogClient, Config, ImageCache, SnapshotStore, SyncService};
//!
//! let config = Config::load()?;
//! let cache_dir = config.cache_dir()?;
//! let service = SyncService::new(
//!     Arc::new(CatalogClient::new(&config)?),
//!     SnapshotStore::new(cache_dir.clone())?,
//!     Arc::new(ImageCache::new(&cache_dir)?),
//! );
//! let (catalog, _origin) = service.load_or_sync(false).await?;
//! service.spawn_preload(&catalog);
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod models;
pub mod sync;
pub mod utils;

pub use api::{ApiError, CatalogClient};
pub use auth::CredentialStore;
pub use cache::{ImageCache, ImageFetcher, ImageSource, SnapshotStore};
pub use config::Config;
pub use models::{Catalog, CatalogItem, ColorImage, ColorImageSet, DeviceType, ImageTier};
pub use sync::{CatalogOrigin, CatalogSource, SyncService};
