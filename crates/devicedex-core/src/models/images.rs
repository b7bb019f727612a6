//! Per-color image metadata for catalog items.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use super::lenient;

/// Image metadata keyed by `CatalogItem::id`.
pub type ImagesById = HashMap<String, ColorImageSet>;

/// Resolution tier of a cached or uploaded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "lowercase")]
pub enum ImageTier {
    High,
    Low,
}

impl ImageTier {
    pub const ALL: [ImageTier; 2] = [ImageTier::High, ImageTier::Low];

    /// Suffix used in cache file names and blob paths.
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageTier::High => "high",
            ImageTier::Low => "low",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "high" | "hi" => Some(ImageTier::High),
            "low" | "lo" => Some(ImageTier::Low),
            _ => None,
        }
    }
}

impl std::fmt::Display for ImageTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lowercase a color name and fold spaces into underscores.
///
/// Used for file names and blob paths, so "Titanium Blue" and
/// "titanium_blue" land on the same key.
pub fn normalize_color_key(color: &str) -> String {
    color.trim().to_lowercase().replace(' ', "_")
}

/// Both resolutions of one color plus an optional swatch override.
///
/// `hex_color` keeps `Some("")` distinct from `None`: an empty override was
/// set explicitly by an admin and must survive a snapshot round trip.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(default, rename_all = "camelCase")]
pub struct ColorImage {
    #[serde(deserialize_with = "lenient::string")]
    pub high_res: String,
    #[serde(deserialize_with = "lenient::string")]
    pub low_res: String,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::optional_string"
    )]
    pub hex_color: Option<String>,
}

impl ColorImage {
    /// URL for a tier, `None` when that tier was never uploaded.
    pub fn url(&self, tier: ImageTier) -> Option<&str> {
        let url = match tier {
            ImageTier::High => &self.high_res,
            ImageTier::Low => &self.low_res,
        };
        if url.is_empty() {
            None
        } else {
            Some(url.as_str())
        }
    }
}

/// All color variants of one catalog item, keyed by color name as stored
/// remotely.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(transparent)]
pub struct ColorImageSet {
    #[serde(deserialize_with = "lenient::map_values")]
    colors: BTreeMap<String, ColorImage>,
}

impl ColorImageSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, color: impl Into<String>, image: ColorImage) {
        self.colors.insert(color.into(), image);
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ColorImage)> {
        self.colors.iter()
    }

    /// Look up a color by name.
    ///
    /// Tries, in order: case-insensitive exact match, the input with spaces
    /// turned into underscores, then the input with underscores turned into
    /// spaces. Other punctuation (hyphens) is not folded.
    pub fn get(&self, color: &str) -> Option<&ColorImage> {
        self.find_key(color).map(|key| &self.colors[key])
    }

    /// Stored key matching `color` under the same rules as [`get`](Self::get).
    pub fn find_key(&self, color: &str) -> Option<&str> {
        let candidates = [
            color.to_string(),
            color.replace(' ', "_"),
            color.replace('_', " "),
        ];
        candidates.iter().find_map(|candidate| {
            self.colors
                .keys()
                .find(|key| key.to_lowercase() == candidate.to_lowercase())
                .map(String::as_str)
        })
    }
}

impl FromIterator<(String, ColorImage)> for ColorImageSet {
    fn from_iter<I: IntoIterator<Item = (String, ColorImage)>>(iter: I) -> Self {
        Self {
            colors: iter.into_iter().collect(),
        }
    }
}
