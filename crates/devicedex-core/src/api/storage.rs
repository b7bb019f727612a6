//! Blob store naming for uploaded color images.

use crate::models::{normalize_color_key, ImageTier};

/// Object path for one color/tier image:
/// `{root}/{item_id}/{color_normalized}_{tier}.{ext}`.
pub fn blob_path(root: &str, item_id: &str, color: &str, tier: ImageTier, ext: &str) -> String {
    format!(
        "{}/{}/{}_{}.{}",
        root.trim_end_matches('/'),
        item_id,
        normalize_color_key(color),
        tier.as_str(),
        ext.trim_start_matches('.').to_lowercase()
    )
}

/// MIME type sent with an upload, by file extension.
pub fn content_type_for(ext: &str) -> &'static str {
    match ext.trim_start_matches('.').to_lowercase().as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}
