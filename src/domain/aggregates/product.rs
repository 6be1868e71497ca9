//! Product catalog entity and media normalization.
//!
//! The backing store has accumulated three generations of image columns: a
//! legacy single `image_url`, an `images` column holding either a bare URL
//! string or JSON text, and natively stored JSON arrays. [`normalize_media`]
//! folds all of them into one canonical ordered list.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Catalog ordering rank when the store carries none. Lower sorts earlier.
pub const DEFAULT_PRIORITY: i32 = 999;

/// Extensions rendered through a video player rather than an `<img>` tag.
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm", "ogv", "mov", "m4v"];

/// Allow-list for cart thumbnails; anything else never becomes an `<img>`.
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "avif"];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

/// One display-media entry, tagged by URL extension.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaUrl {
    pub url: String,
    pub kind: MediaKind,
}

impl MediaUrl {
    fn tag(url: String) -> Self {
        let kind = match extension(&url) {
            Some(ext) if VIDEO_EXTENSIONS.contains(&ext.as_str()) => MediaKind::Video,
            _ => MediaKind::Image,
        };
        Self { url, kind }
    }
}

/// Catalog entity. Created and mutated only by the external store; read-only
/// to this service.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub stock: u32,
    /// Never null; absent media is an empty list (consumers render a
    /// placeholder, never an error).
    pub media: Vec<MediaUrl>,
    pub priority: i32,
    pub created_at: DateTime<Utc>,
}

/// Raw catalog row as fetched from the store, before media normalization.
#[derive(Clone, Debug)]
pub struct RawProduct {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub stock: i32,
    pub image_url: Option<String>,
    pub images: Option<serde_json::Value>,
    pub priority: Option<i32>,
    pub created_at: DateTime<Utc>,
}

impl Product {
    pub fn from_raw(raw: RawProduct) -> Self {
        let media = normalize_media(raw.images.as_ref(), raw.image_url.as_deref());
        Self {
            id: raw.id,
            name: raw.name,
            description: raw.description,
            price: raw.price,
            stock: raw.stock.max(0) as u32,
            media,
            priority: raw.priority.unwrap_or(DEFAULT_PRIORITY),
            created_at: raw.created_at,
        }
    }

    pub fn is_in_stock(&self) -> bool { self.stock > 0 }

    /// Strict thumbnail for cart display: first URL whose extension is in
    /// the image allow-list, or none.
    pub fn cart_thumbnail(&self) -> Option<&str> {
        self.media.iter().map(|m| m.url.as_str()).find(|url| {
            matches!(extension(url), Some(ext) if IMAGE_EXTENSIONS.contains(&ext.as_str()))
        })
    }
}

/// Folds the ambiguous raw `images` representation into a canonical ordered
/// media list. Malformed input never raises; it degrades to the most
/// conservative non-empty-or-empty result.
pub fn normalize_media(
    images: Option<&serde_json::Value>,
    legacy_image_url: Option<&str>,
) -> Vec<MediaUrl> {
    let candidates: Vec<serde_json::Value> = match images {
        Some(serde_json::Value::String(s)) => match serde_json::from_str(s) {
            // JSON text holding an array is the modern shape; any other
            // parse result means the column held a bare URL.
            Ok(serde_json::Value::Array(entries)) => entries,
            _ => vec![serde_json::Value::String(s.clone())],
        },
        Some(serde_json::Value::Array(entries)) => entries.clone(),
        _ => Vec::new(),
    };

    let mut media: Vec<MediaUrl> = candidates
        .iter()
        .filter_map(|entry| entry.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| MediaUrl::tag(s.to_string()))
        .collect();

    if media.is_empty() {
        if let Some(url) = legacy_image_url.map(str::trim).filter(|s| !s.is_empty()) {
            media.push(MediaUrl::tag(url.to_string()));
        }
    }

    media
}

/// Lowercased extension of a URL path, ignoring query string and fragment.
fn extension(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let (_, ext) = path.rsplit_once('.')?;
    if ext.is_empty() || ext.contains('/') {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn urls(media: &[MediaUrl]) -> Vec<&str> {
        media.iter().map(|m| m.url.as_str()).collect()
    }

    #[test]
    fn absent_and_null_yield_empty_list() {
        assert!(normalize_media(None, None).is_empty());
        assert!(normalize_media(Some(&serde_json::Value::Null), None).is_empty());
        assert!(normalize_media(Some(&json!("")), None).is_empty());
    }

    #[test]
    fn single_url_string_becomes_one_element_list() {
        let media = normalize_media(Some(&json!("https://cdn.example.com/a.jpg")), None);
        assert_eq!(urls(&media), vec!["https://cdn.example.com/a.jpg"]);
        assert_eq!(media[0].kind, MediaKind::Image);
    }

    #[test]
    fn json_text_array_is_parsed() {
        let media = normalize_media(Some(&json!(r#"["/a.jpg", "/b.png"]"#)), None);
        assert_eq!(urls(&media), vec!["/a.jpg", "/b.png"]);
    }

    #[test]
    fn unparseable_json_text_is_treated_as_bare_url() {
        let media = normalize_media(Some(&json!(r#"["broken"#)), None);
        assert_eq!(urls(&media), vec![r#"["broken"#]);
    }

    #[test]
    fn native_array_keeps_order_and_drops_blanks() {
        let media = normalize_media(Some(&json!(["  /a.jpg ", "", "   ", "/b.webp", 7])), None);
        assert_eq!(urls(&media), vec!["/a.jpg", "/b.webp"]);
    }

    #[test]
    fn normalizing_canonical_list_is_identity() {
        let canonical = json!(["/a.jpg", "/b.png", "/clip.mp4"]);
        let once = normalize_media(Some(&canonical), None);
        let again_input = json!(once.iter().map(|m| m.url.clone()).collect::<Vec<_>>());
        let twice = normalize_media(Some(&again_input), None);
        assert_eq!(once, twice);
    }

    #[test]
    fn legacy_image_url_fallback_applies_only_when_empty() {
        let media = normalize_media(Some(&json!([])), Some("/legacy.jpg"));
        assert_eq!(urls(&media), vec!["/legacy.jpg"]);

        let media = normalize_media(Some(&json!(["/a.jpg"])), Some("/legacy.jpg"));
        assert_eq!(urls(&media), vec!["/a.jpg"]);

        assert!(normalize_media(None, Some("   ")).is_empty());
    }

    #[test]
    fn video_extensions_are_tagged() {
        let media = normalize_media(Some(&json!(["/clip.MP4?v=2", "/a.jpg"])), None);
        assert_eq!(media[0].kind, MediaKind::Video);
        assert_eq!(media[1].kind, MediaKind::Image);
    }

    #[test]
    fn cart_thumbnail_skips_videos_and_unknown_extensions() {
        let raw = RawProduct {
            id: Uuid::new_v4(),
            name: "Lamp".into(),
            description: None,
            price: Decimal::new(450, 0),
            stock: 3,
            image_url: None,
            images: Some(json!(["/clip.mp4", "/page.html", "/real.png"])),
            priority: None,
            created_at: Utc::now(),
        };
        let product = Product::from_raw(raw);
        assert_eq!(product.cart_thumbnail(), Some("/real.png"));
        assert_eq!(product.priority, DEFAULT_PRIORITY);
    }

    #[test]
    fn all_videos_yield_no_thumbnail() {
        let media = normalize_media(Some(&json!(["/a.mp4", "/b.webm"])), None);
        let product = Product {
            id: Uuid::new_v4(),
            name: "Clip".into(),
            description: None,
            price: Decimal::ONE,
            stock: 1,
            media,
            priority: DEFAULT_PRIORITY,
            created_at: Utc::now(),
        };
        assert_eq!(product.cart_thumbnail(), None);
    }
}
