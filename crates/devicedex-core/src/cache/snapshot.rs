use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDate, TimeZone};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::models::{Catalog, CatalogItem, ImagesById};
use crate::utils::format_time_since;

const ITEMS_FILE: &str = "catalog_items.json";
const IMAGES_FILE: &str = "catalog_images.json";
const MARKER_FILE: &str = "sync_marker.json";

/// Day format stored in the marker; compared as a string.
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Record of the last successful snapshot write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncMarker {
    /// Local calendar day of the sync, `YYYY-MM-DD`.
    pub last_sync_date: String,
    /// Milliseconds since the Unix epoch.
    pub last_sync_timestamp: i64,
}

impl SyncMarker {
    fn at(now: DateTime<Local>) -> Self {
        Self {
            last_sync_date: now.format(DATE_FORMAT).to_string(),
            last_sync_timestamp: now.timestamp_millis(),
        }
    }

    pub fn synced_at(&self) -> Option<DateTime<Local>> {
        Local.timestamp_millis_opt(self.last_sync_timestamp).single()
    }

    pub fn is_for_day(&self, day: NaiveDate) -> bool {
        self.last_sync_date == day.format(DATE_FORMAT).to_string()
    }
}

/// Same-day copy of the full catalog, for offline cold starts.
///
/// The marker is written only after both data files, so an interrupted
/// save reads back as "no valid snapshot" on the next launch.
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create snapshot dir {}", dir.display()))?;
        Ok(Self { dir })
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    fn data_files_exist(&self) -> bool {
        self.path(ITEMS_FILE).exists() && self.path(IMAGES_FILE).exists()
    }

    /// Read the sync marker, if one was written.
    pub fn marker(&self) -> Option<SyncMarker> {
        match read_json::<SyncMarker>(&self.path(MARKER_FILE)) {
            Ok(marker) => marker,
            Err(e) => {
                debug!(error = %e, "Failed to read sync marker");
                None
            }
        }
    }

    pub fn has_valid_snapshot_for_today(&self) -> bool {
        self.has_valid_snapshot_on(Local::now().date_naive())
    }

    /// True when the marker names `day` and both data files are present.
    pub fn has_valid_snapshot_on(&self, day: NaiveDate) -> bool {
        self.marker().is_some_and(|m| m.is_for_day(day)) && self.data_files_exist()
    }

    /// Overwrite the snapshot with `items` and `images`.
    pub fn save(&self, items: &[CatalogItem], images: &ImagesById) -> bool {
        self.save_at(items, images, Local::now())
    }

    pub fn save_at(&self, items: &[CatalogItem], images: &ImagesById, now: DateTime<Local>) -> bool {
        match self.try_save(items, images, now) {
            Ok(()) => {
                info!(items = items.len(), images = images.len(), "Saved catalog snapshot");
                true
            }
            Err(e) => {
                warn!(error = %e, "Failed to save catalog snapshot");
                false
            }
        }
    }

    fn try_save(&self, items: &[CatalogItem], images: &ImagesById, now: DateTime<Local>) -> Result<()> {
        // Drop the old marker first so a torn overwrite is never reported valid
        remove_if_exists(&self.path(MARKER_FILE))?;
        write_json(&self.path(ITEMS_FILE), &items)?;
        write_json(&self.path(IMAGES_FILE), images)?;
        write_json(&self.path(MARKER_FILE), &SyncMarker::at(now))?;
        Ok(())
    }

    /// Load the snapshot regardless of its age. `None` if either file is missing
    /// or unreadable.
    pub fn load(&self) -> Option<Catalog> {
        let items = read_json::<Vec<CatalogItem>>(&self.path(ITEMS_FILE));
        let images = read_json::<ImagesById>(&self.path(IMAGES_FILE));
        match (items, images) {
            (Ok(Some(items)), Ok(Some(images))) => {
                debug!(items = items.len(), "Loaded catalog snapshot");
                Some(Catalog::new(items, images))
            }
            (Err(e), _) | (_, Err(e)) => {
                warn!(error = %e, "Failed to load catalog snapshot");
                None
            }
            _ => None,
        }
    }

    /// Remove both data files and the marker.
    pub fn clear(&self) -> bool {
        let mut ok = true;
        for name in [MARKER_FILE, ITEMS_FILE, IMAGES_FILE] {
            if let Err(e) = remove_if_exists(&self.path(name)) {
                warn!(file = name, error = %e, "Failed to remove snapshot file");
                ok = false;
            }
        }
        ok
    }

    pub fn last_synced_at(&self) -> Option<DateTime<Local>> {
        self.marker().and_then(|m| m.synced_at())
    }

    /// "Just now", "N min ago", "N hr ago", "N days ago", or "Never".
    pub fn time_since_sync(&self) -> String {
        self.time_since_sync_at(Local::now())
    }

    pub fn time_since_sync_at(&self, now: DateTime<Local>) -> String {
        match self.last_synced_at() {
            Some(synced) => format_time_since(now - synced),
            None => "Never".to_string(),
        }
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let value = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(Some(value))
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let contents = serde_json::to_string_pretty(value)?;
    fs::write(path, contents).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("Failed to remove {}", path.display())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ColorImage, ColorImageSet, DeviceSpecs, DeviceType};
    use chrono::Duration;

    fn local(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Local> {
        let naive = NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap();
        Local.from_local_datetime(&naive).earliest().unwrap()
    }

    fn sample_items() -> Vec<CatalogItem> {
        vec![
            CatalogItem {
                id: "px9".to_string(),
                manufacturer: "Google".to_string(),
                model_name: "Pixel 9".to_string(),
                ram: "12GB".to_string(),
                storage: "256GB".to_string(),
                price: 799.99,
                colors: vec!["Obsidian".to_string(), "Porcelain".to_string()],
                specs: DeviceSpecs {
                    camera: "50MP + 48MP".to_string(),
                    battery: "4700 mAh".to_string(),
                    display: "6.3\" OLED".to_string(),
                    processor: "Tensor G4".to_string(),
                    operating_system: "Android 15".to_string(),
                },
                device_type: DeviceType::Phone,
            },
            CatalogItem {
                id: "mba".to_string(),
                manufacturer: "Apple".to_string(),
                model_name: "MacBook Air".to_string(),
                device_type: DeviceType::Laptop,
                ..Default::default()
            },
        ]
    }

    fn sample_images() -> ImagesById {
        let mut set = ColorImageSet::new();
        set.insert(
            "Obsidian",
            ColorImage {
                high_res: "https://cdn.example/px9/obsidian_high.jpg".to_string(),
                low_res: "https://cdn.example/px9/obsidian_low.jpg".to_string(),
                hex_color: Some(String::new()),
            },
        );
        set.insert(
            "Porcelain",
            ColorImage {
                high_res: "https://cdn.example/px9/porcelain_high.jpg".to_string(),
                low_res: String::new(),
                hex_color: None,
            },
        );
        let mut images = ImagesById::new();
        images.insert("px9".to_string(), set);
        images
    }

    fn store() -> (tempfile::TempDir, SnapshotStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().to_path_buf()).unwrap();
        (dir, store)
    }

    #[test]
    fn test_round_trip() {
        let (_dir, store) = store();
        assert!(store.load().is_none());

        let items = sample_items();
        let images = sample_images();
        assert!(store.save(&items, &images));

        let loaded = store.load().unwrap();
        assert_eq!(loaded.items, items);
        assert_eq!(loaded.images, images);
        let set = loaded.images_for("px9").unwrap();
        assert_eq!(set.get("obsidian").unwrap().hex_color, Some(String::new()));
        assert_eq!(set.get("porcelain").unwrap().hex_color, None);
    }

    #[test]
    fn test_valid_only_same_day() {
        let (_dir, store) = store();
        let late = local(2026, 3, 14, 23, 59, 59);
        assert!(store.save_at(&sample_items(), &sample_images(), late));

        assert!(store.has_valid_snapshot_on(late.date_naive()));
        let next_day = NaiveDate::from_ymd_opt(2026, 3, 15).unwrap();
        assert!(!store.has_valid_snapshot_on(next_day));
        // Still loadable for a stale fallback
        assert!(store.load().is_some());
    }

    #[test]
    fn test_today_snapshot_is_valid() {
        let (_dir, store) = store();
        assert!(!store.has_valid_snapshot_for_today());
        assert!(store.save(&sample_items(), &sample_images()));
        assert!(store.has_valid_snapshot_for_today());
    }

    #[test]
    fn test_missing_data_file_invalidates() {
        let (dir, store) = store();
        assert!(store.save(&sample_items(), &sample_images()));
        fs::remove_file(dir.path().join(IMAGES_FILE)).unwrap();
        assert!(!store.has_valid_snapshot_for_today());
        assert!(store.load().is_none());
    }

    #[test]
    fn test_failed_save_leaves_no_marker() {
        let (dir, store) = store();
        assert!(store.save(&sample_items(), &sample_images()));

        // A directory where the images file belongs makes the write fail
        fs::remove_file(dir.path().join(IMAGES_FILE)).unwrap();
        fs::create_dir(dir.path().join(IMAGES_FILE)).unwrap();

        assert!(!store.save(&sample_items(), &sample_images()));
        assert!(store.marker().is_none());
        assert!(!store.has_valid_snapshot_for_today());
    }

    #[test]
    fn test_load_tolerates_missing_fields() {
        let (dir, store) = store();
        fs::write(
            dir.path().join(ITEMS_FILE),
            r#"[{"id": "x1", "manufacturer": "Nokia"}, {}]"#,
        )
        .unwrap();
        fs::write(
            dir.path().join(IMAGES_FILE),
            r#"{"x1": {"Blue": {"highRes": "https://cdn.example/x1.jpg"}}}"#,
        )
        .unwrap();

        let catalog = store.load().unwrap();
        assert_eq!(catalog.items.len(), 2);
        assert_eq!(catalog.items[0].model_name, "");
        assert_eq!(catalog.items[1].id, "");
        let blue = catalog.images["x1"].get("blue").unwrap();
        assert_eq!(blue.low_res, "");
        assert_eq!(blue.hex_color, None);
    }

    #[test]
    fn test_load_tolerates_mistyped_fields() {
        let (dir, store) = store();
        fs::write(
            dir.path().join(ITEMS_FILE),
            r#"[
                {"id": "x1", "manufacturer": null, "price": "349.99", "type": "Phone"},
                {"id": "x2", "colors": "Blue", "specs": [], "type": "Laptops"}
            ]"#,
        )
        .unwrap();
        fs::write(
            dir.path().join(IMAGES_FILE),
            r#"{"x1": {"Blue": {"highRes": null}}, "x2": null}"#,
        )
        .unwrap();

        let catalog = store.load().unwrap();
        assert_eq!(catalog.items.len(), 2);
        assert_eq!(catalog.items[0].manufacturer, "");
        assert_eq!(catalog.items[0].price, 349.99);
        assert_eq!(catalog.items[0].device_type, DeviceType::Phone);
        assert!(catalog.items[1].colors.is_empty());
        assert_eq!(catalog.items[1].specs, DeviceSpecs::default());
        assert_eq!(catalog.items[1].device_type, DeviceType::Laptop);
        assert_eq!(catalog.images["x1"].get("blue").unwrap().high_res, "");
        assert!(catalog.images["x2"].is_empty());
    }

    #[test]
    fn test_clear() {
        let (dir, store) = store();
        assert!(store.save(&sample_items(), &sample_images()));
        assert!(store.clear());
        assert!(store.load().is_none());
        assert!(store.marker().is_none());
        assert!(!dir.path().join(ITEMS_FILE).exists());
        assert!(store.clear());
    }

    #[test]
    fn test_time_since_sync() {
        let (_dir, store) = store();
        let synced = local(2026, 3, 14, 10, 0, 0);
        assert_eq!(store.time_since_sync_at(synced), "Never");

        assert!(store.save_at(&sample_items(), &sample_images(), synced));
        assert_eq!(
            store.time_since_sync_at(synced + Duration::seconds(59)),
            "Just now"
        );
        assert_eq!(
            store.time_since_sync_at(synced + Duration::seconds(60)),
            "1 min ago"
        );
        assert_eq!(
            store.time_since_sync_at(synced + Duration::seconds(3600)),
            "1 hr ago"
        );
        assert_eq!(
            store.time_since_sync_at(synced + Duration::days(3)),
            "3 days ago"
        );
    }
}
