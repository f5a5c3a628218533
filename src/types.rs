//! Core types shared by the discovery pipeline and the catalog

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fmt;

/// Default duration for records whose post page gives no hint
pub const DEFAULT_DURATION: &str = "00:00";

/// A content post discovered on a listing page.
///
/// Transient: produced by the listing parser and consumed by the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostCandidate {
    /// Absolute URL of the post page
    pub url: String,
    /// Cleaned display title, at most 150 characters
    pub title: String,
    /// Absolute thumbnail URL, or empty
    pub thumbnail_url: String,
}

/// Which resolution strategy produced an embed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EmbedTier {
    /// An `<iframe>` whose host is a known video player
    KnownHostIframe,
    /// A player URL or media file found in the raw page source
    MarkupPattern,
    /// A `<video><source src>` element
    DirectMedia,
    /// Any non-advertising iframe (opt-in per site)
    UnlistedIframe,
    /// The post page itself (opt-in per site)
    PageUrl,
}

impl EmbedTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::KnownHostIframe => "known_host_iframe",
            Self::MarkupPattern => "markup_pattern",
            Self::DirectMedia => "direct_media",
            Self::UnlistedIframe => "unlisted_iframe",
            Self::PageUrl => "page_url",
        }
    }
}

impl fmt::Display for EmbedTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated embed URL for a post
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedResult {
    /// Absolute http(s) URL of the player, media file, or post page
    pub embed_url: String,
    /// Strategy that accepted the URL
    pub tier: EmbedTier,
}

/// A persisted catalog entry.
///
/// Field order and names follow the on-disk format. Optional fields exist so
/// that records written by older tools survive a load/save cycle untouched;
/// records created by this crate always fill them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoRecord {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default = "default_duration")]
    pub duration: String,
    pub embed_url: String,
    #[serde(default)]
    pub thumbnail_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploaded_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub views: Option<u64>,
    /// Fields written by other tools, kept verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_duration() -> String {
    DEFAULT_DURATION.to_string()
}

impl VideoRecord {
    /// Tags as a slice-like iterator, empty for legacy records
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().flatten().map(String::as_str)
    }

    /// View count, treating a missing counter as zero
    pub fn views(&self) -> u64 {
        self.views.unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_serializes_in_catalog_field_order() {
        let record = VideoRecord {
            id: "site-abc".to_string(),
            title: "Title".to_string(),
            description: "Video from site".to_string(),
            category: "Site".to_string(),
            duration: DEFAULT_DURATION.to_string(),
            embed_url: "https://streamtape.com/e/1".to_string(),
            thumbnail_url: String::new(),
            tags: Some(["site".to_string()].into_iter().collect()),
            uploaded_at: Some("2026-01-01T00:00:00.000Z".to_string()),
            views: Some(0),
            extra: Map::new(),
        };

        let json = serde_json::to_string(&record).unwrap();
        let keys = [
            "\"id\"", "\"title\"", "\"description\"", "\"category\"", "\"duration\"",
            "\"embedUrl\"", "\"thumbnailUrl\"", "\"tags\"", "\"uploadedAt\"", "\"views\"",
        ];
        let positions: Vec<usize> = keys.iter().map(|k| json.find(k).unwrap()).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "unexpected order: {}", json);
    }

    #[test]
    fn legacy_record_round_trips_without_invented_fields() {
        let raw = r#"{"id":"vid-1","title":"Old","description":"d","thumbnailUrl":"","embedUrl":"https://x.test/e","category":"Viral","duration":"10:00","url":"https://x.test/p"}"#;
        let record: VideoRecord = serde_json::from_str(raw).unwrap();

        assert!(record.tags.is_none());
        assert!(record.uploaded_at.is_none());
        assert_eq!(record.views(), 0);
        assert_eq!(record.extra.get("url").and_then(|v| v.as_str()), Some("https://x.test/p"));

        let written: Value = serde_json::to_value(&record).unwrap();
        let object = written.as_object().unwrap();
        assert!(!object.contains_key("tags"));
        assert!(!object.contains_key("views"));
        assert!(!object.contains_key("uploadedAt"));
        assert_eq!(object.get("url").and_then(|v| v.as_str()), Some("https://x.test/p"));
    }

    #[test]
    fn missing_duration_defaults() {
        let raw = r#"{"id":"a","title":"t","embedUrl":"https://x.test/e"}"#;
        let record: VideoRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(record.duration, DEFAULT_DURATION);
    }
}
