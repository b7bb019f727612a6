//! In-memory view over one synced catalog.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::{CatalogItem, ColorImageSet, DeviceType, ImagesById};
use crate::utils::{cmp_ignore_case, format_price};

/// Items plus their image metadata, as produced by a sync or snapshot load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub items: Vec<CatalogItem>,
    pub images: ImagesById,
}

/// One line of a side-by-side comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComparisonRow {
    pub label: &'static str,
    pub left: String,
    pub right: String,
}

impl ComparisonRow {
    pub fn differs(&self) -> bool {
        self.left != self.right
    }
}

impl Catalog {
    pub fn new(items: Vec<CatalogItem>, images: ImagesById) -> Self {
        Self { items, images }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn find(&self, id: &str) -> Option<&CatalogItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn images_for(&self, id: &str) -> Option<&ColorImageSet> {
        self.images.get(id)
    }

    pub fn of_type(&self, device_type: DeviceType) -> impl Iterator<Item = &CatalogItem> {
        self.items
            .iter()
            .filter(move |item| item.device_type == device_type)
    }

    /// Items whose name matches `query`, optionally narrowed to one type.
    pub fn search(&self, query: &str, device_type: Option<DeviceType>) -> Vec<&CatalogItem> {
        self.items
            .iter()
            .filter(|item| device_type.map_or(true, |t| item.device_type == t))
            .filter(|item| item.matches_query(query))
            .collect()
    }

    /// Distinct manufacturers, sorted case-insensitively.
    pub fn manufacturers(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .items
            .iter()
            .map(|item| item.manufacturer.as_str())
            .filter(|name| !name.is_empty())
            .collect();
        names.sort_by(|a, b| cmp_ignore_case(a, b));
        names.dedup_by(|a, b| cmp_ignore_case(a, b) == Ordering::Equal);
        names
    }

    /// Side-by-side rows for the compare screen. `None` if either id is unknown.
    pub fn compare(&self, left_id: &str, right_id: &str) -> Option<Vec<ComparisonRow>> {
        let left = self.find(left_id)?;
        let right = self.find(right_id)?;

        let row = |label, l: &CatalogItem, r: &CatalogItem, f: fn(&CatalogItem) -> String| {
            ComparisonRow {
                label,
                left: f(l),
                right: f(r),
            }
        };

        Some(vec![
            row("Type", left, right, |i| i.device_type.to_string()),
            row("Price", left, right, |i| format_price(i.price)),
            row("RAM", left, right, |i| i.ram.clone()),
            row("Storage", left, right, |i| i.storage.clone()),
            row("Display", left, right, |i| i.specs.display.clone()),
            row("Processor", left, right, |i| i.specs.processor.clone()),
            row("Camera", left, right, |i| i.specs.camera.clone()),
            row("Battery", left, right, |i| i.specs.battery.clone()),
            row("OS", left, right, |i| i.specs.operating_system.clone()),
            row("Colors", left, right, |i| i.colors.join(", ")),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DeviceSpecs;

    fn item(id: &str, manufacturer: &str, model: &str, device_type: DeviceType) -> CatalogItem {
        CatalogItem {
            id: id.to_string(),
            manufacturer: manufacturer.to_string(),
            model_name: model.to_string(),
            device_type,
            ..Default::default()
        }
    }

    fn sample() -> Catalog {
        Catalog::new(
            vec![
                item("p1", "Google", "Pixel 9", DeviceType::Phone),
                item("p2", "apple", "iPhone 15", DeviceType::Phone),
                item("t1", "Apple", "iPad Air", DeviceType::Tablet),
                item("l1", "Lenovo", "ThinkPad X1", DeviceType::Laptop),
            ],
            ImagesById::new(),
        )
    }

    #[test]
    fn test_search_with_type_filter() {
        let catalog = sample();
        let ids: Vec<&str> = catalog
            .search("ip", Some(DeviceType::Phone))
            .iter()
            .map(|i| i.id.as_str())
            .collect();
        assert_eq!(ids, vec!["p2"]);
        assert_eq!(catalog.search("", None).len(), 4);
        assert_eq!(catalog.of_type(DeviceType::Laptop).count(), 1);
    }

    #[test]
    fn test_manufacturers_deduped() {
        let catalog = sample();
        assert_eq!(catalog.manufacturers(), vec!["apple", "Google", "Lenovo"]);
    }

    #[test]
    fn test_manufacturers_deduped_beyond_ascii() {
        let catalog = Catalog::new(
            vec![
                item("a", "Énergie", "E1", DeviceType::Phone),
                item("b", "énergie", "E2", DeviceType::Phone),
                item("c", "Acer", "Swift", DeviceType::Laptop),
            ],
            ImagesById::new(),
        );
        assert_eq!(catalog.manufacturers(), vec!["Acer", "Énergie"]);
    }

    #[test]
    fn test_compare() {
        let mut catalog = sample();
        catalog.items[0].specs = DeviceSpecs {
            battery: "4700 mAh".to_string(),
            ..Default::default()
        };
        catalog.items[0].price = 799.0;
        catalog.items[1].price = 799.0;

        let rows = catalog.compare("p1", "p2").unwrap();
        let price = rows.iter().find(|r| r.label == "Price").unwrap();
        assert!(!price.differs());
        let battery = rows.iter().find(|r| r.label == "Battery").unwrap();
        assert!(battery.differs());
        assert!(catalog.compare("p1", "missing").is_none());
    }
}
