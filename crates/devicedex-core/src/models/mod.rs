//! Data models for catalog entities.
//!
//! This module contains the data structures shared by the remote client,
//! the snapshot store and the image cache:
//!
//! - `CatalogItem`, `DeviceType`, `DeviceSpecs`: a phone, tablet or laptop
//! - `ColorImageSet`, `ColorImage`, `ImageTier`: per-color image metadata
//! - `Catalog`: an in-memory pairing of items and their image metadata

pub mod catalog;
pub mod images;
pub mod item;
mod lenient;

pub use catalog::{Catalog, ComparisonRow};
pub use images::{normalize_color_key, ColorImage, ColorImageSet, ImageTier, ImagesById};
pub use item::{CatalogItem, DeviceSpecs, DeviceType};
