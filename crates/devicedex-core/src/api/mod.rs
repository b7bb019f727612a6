//! REST client module for the remote catalog.
//!
//! This module provides the `CatalogClient` for reading the device catalog
//! and its image metadata from the document store, and for uploading color
//! images to the blob store.
//!
//! The document store limits batched lookups to 30 ids per request; the
//! client chunks larger requests transparently.

pub mod client;
pub mod error;
pub mod storage;

pub use client::{CatalogClient, MAX_BATCH_IDS};
pub use error::ApiError;
pub use storage::blob_path;
