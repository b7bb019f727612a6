//! Domain model for a single catalog entry.
//!
//! Remote documents are frequently incomplete or mistyped, so every field
//! defaults (string to "", number to 0, list to empty) instead of failing
//! the record.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::lenient;

/// Kind of device a catalog entry describes.
///
/// Reads any tag [`DeviceType::from_tag`] accepts; unknown or missing tags
/// are treated as phones.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    #[default]
    Phone,
    Tablet,
    Laptop,
}

impl DeviceType {
    pub fn label(&self) -> &'static str {
        match self {
            DeviceType::Phone => "Phone",
            DeviceType::Tablet => "Tablet",
            DeviceType::Laptop => "Laptop",
        }
    }

    /// Parse a loosely formatted type tag ("Phone", "tablets", "LAPTOP").
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_lowercase().trim_end_matches('s') {
            "phone" => Some(DeviceType::Phone),
            "tablet" => Some(DeviceType::Tablet),
            "laptop" => Some(DeviceType::Laptop),
            _ => None,
        }
    }
}

impl<'de> Deserialize<'de> for DeviceType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(tag) => DeviceType::from_tag(&tag).unwrap_or_default(),
            _ => DeviceType::default(),
        })
    }
}

impl std::fmt::Display for DeviceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Hardware specifications shown on the detail and compare screens.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(default, rename_all = "camelCase")]
pub struct DeviceSpecs {
    #[serde(deserialize_with = "lenient::string")]
    pub camera: String,
    #[serde(deserialize_with = "lenient::string")]
    pub battery: String,
    #[serde(deserialize_with = "lenient::string")]
    pub display: String,
    #[serde(deserialize_with = "lenient::string")]
    pub processor: String,
    #[serde(alias = "os", deserialize_with = "lenient::string")]
    pub operating_system: String,
}

/// A phone, tablet or laptop in the catalog.
///
/// `id` is stable across syncs and doubles as the key into the image
/// metadata collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(default, rename_all = "camelCase")]
pub struct CatalogItem {
    #[serde(deserialize_with = "lenient::string")]
    pub id: String,
    #[serde(deserialize_with = "lenient::string")]
    pub manufacturer: String,
    #[serde(alias = "model", deserialize_with = "lenient::string")]
    pub model_name: String,
    #[serde(deserialize_with = "lenient::string")]
    pub ram: String,
    #[serde(deserialize_with = "lenient::string")]
    pub storage: String,
    #[serde(deserialize_with = "lenient::number")]
    pub price: f64,
    #[serde(deserialize_with = "lenient::string_list")]
    pub colors: Vec<String>,
    #[serde(deserialize_with = "lenient::or_default")]
    pub specs: DeviceSpecs,
    #[serde(alias = "type")]
    pub device_type: DeviceType,
}

impl CatalogItem {
    /// "Manufacturer Model", skipping whichever half is missing.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.manufacturer, self.model_name)
            .trim()
            .to_string()
    }

    /// "8GB / 256GB" style memory summary for list cards.
    pub fn memory_summary(&self) -> String {
        match (self.ram.is_empty(), self.storage.is_empty()) {
            (false, false) => format!("{} / {}", self.ram, self.storage),
            (false, true) => self.ram.clone(),
            (true, false) => self.storage.clone(),
            (true, true) => String::new(),
        }
    }

    /// Case-insensitive match against manufacturer and model name.
    pub fn matches_query(&self, query: &str) -> bool {
        let query = query.trim();
        if query.is_empty() {
            return true;
        }
        crate::utils::contains_ignore_case(&self.display_name(), query)
    }
}
