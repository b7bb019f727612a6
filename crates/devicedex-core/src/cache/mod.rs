//! Local caching module for offline data access.
//!
//! This module provides two explicitly constructed services:
//!
//! - `ImageCache`: remote color images mirrored to `images/` under the cache
//!   root, one JPEG per (item, color, tier). Grow-only; only `clear()`
//!   removes entries.
//! - `SnapshotStore`: a same-day copy of the full catalog and its image
//!   metadata, so a cold start can render without a network round trip.

pub mod fetcher;
pub mod images;
pub mod snapshot;

pub use fetcher::{HttpImageFetcher, ImageFetcher};
pub use images::{ImageCache, ImageSource};
pub use snapshot::{SnapshotStore, SyncMarker};
