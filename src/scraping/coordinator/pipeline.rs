//! Record construction from a resolved post

use serde_json::Map;
use std::collections::BTreeSet;

use crate::config::SiteProfile;
use crate::scraping::listing::{clean_title, MAX_TITLE_CHARS, MIN_TITLE_CHARS};
use crate::scraping::post_meta::PostMetadata;
use crate::types::{EmbedResult, PostCandidate, VideoRecord, DEFAULT_DURATION};
use crate::util::truncate_chars;

/// Build the catalog record for a resolved post
pub fn to_record(
    site: &SiteProfile,
    candidate: &PostCandidate,
    embed: &EmbedResult,
    metadata: PostMetadata,
    id: String,
    uploaded_at: &str,
) -> VideoRecord {
    let thumbnail_url = if candidate.thumbnail_url.is_empty() {
        metadata.thumbnail_url.unwrap_or_default()
    } else {
        candidate.thumbnail_url.clone()
    };

    let title = metadata
        .heading
        .as_deref()
        .filter(|_| site.title_from_heading)
        .map(|heading| {
            let cleaned = clean_title(heading, &site.title_strip_phrases);
            truncate_chars(&cleaned, MAX_TITLE_CHARS).trim_end().to_string()
        })
        .filter(|title| title.chars().count() > MIN_TITLE_CHARS)
        .unwrap_or_else(|| candidate.title.clone());

    let category = metadata
        .category
        .filter(|_| site.category_from_post)
        .unwrap_or_else(|| site.category.clone());

    let mut tags: BTreeSet<String> = site
        .tags
        .iter()
        .map(|tag| tag.trim().to_lowercase())
        .filter(|tag| !tag.is_empty())
        .collect();
    tags.insert(site.name.to_lowercase());
    if site.category_from_post {
        tags.insert(category.to_lowercase());
    }

    VideoRecord {
        id,
        title,
        description: site.description(),
        category,
        duration: metadata
            .duration
            .unwrap_or_else(|| DEFAULT_DURATION.to_string()),
        embed_url: embed.embed_url.clone(),
        thumbnail_url,
        tags: Some(tags),
        uploaded_at: Some(uploaded_at.to_string()),
        views: Some(0),
        extra: Map::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EmbedTier;

    fn site() -> SiteProfile {
        let mut site = SiteProfile::new(
            "ViralKand",
            "https://viralkand.com",
            vec!["https://viralkand.com/".to_string()],
            vec!["article".to_string()],
            "Viral",
        );
        site.tags = vec!["Desi".to_string(), " ".to_string(), "viralkand".to_string()];
        site
    }

    fn embed() -> EmbedResult {
        EmbedResult {
            embed_url: "https://streamtape.com/e/abc".to_string(),
            tier: EmbedTier::KnownHostIframe,
        }
    }

    #[test]
    fn test_record_defaults() {
        let candidate = PostCandidate {
            url: "https://viralkand.com/post-1/".to_string(),
            title: "Post one".to_string(),
            thumbnail_url: String::new(),
        };

        let record = to_record(
            &site(),
            &candidate,
            &embed(),
            PostMetadata::default(),
            "viralkand-abc".to_string(),
            "2026-10-18T00:00:00Z",
        );

        assert_eq!(record.description, "Video from ViralKand");
        assert_eq!(record.category, "Viral");
        assert_eq!(record.duration, "00:00");
        assert_eq!(record.thumbnail_url, "");
        assert_eq!(record.views, Some(0));
        assert_eq!(record.uploaded_at.as_deref(), Some("2026-10-18T00:00:00Z"));
        assert_eq!(record.tags().collect::<Vec<_>>(), vec!["desi", "viralkand"]);
    }

    #[test]
    fn test_card_thumbnail_wins_over_page_metadata() {
        let metadata = PostMetadata {
            thumbnail_url: Some("https://viralkand.com/og.jpg".to_string()),
            duration: Some("02:00".to_string()),
            ..Default::default()
        };
        let mut candidate = PostCandidate {
            url: "https://viralkand.com/post-1/".to_string(),
            title: "Post one".to_string(),
            thumbnail_url: "https://cdn.test/card.jpg".to_string(),
        };

        let record = to_record(&site(), &candidate, &embed(), metadata.clone(), "x".into(), "t");
        assert_eq!(record.thumbnail_url, "https://cdn.test/card.jpg");
        assert_eq!(record.duration, "02:00");

        candidate.thumbnail_url.clear();
        let record = to_record(&site(), &candidate, &embed(), metadata, "x".into(), "t");
        assert_eq!(record.thumbnail_url, "https://viralkand.com/og.jpg");
    }

    #[test]
    fn test_post_heading_and_category_are_opt_in() {
        let metadata = PostMetadata {
            heading: Some("Full Heading Title - ViralKand".to_string()),
            category: Some("Desi Bhabhi".to_string()),
            ..Default::default()
        };
        let candidate = PostCandidate {
            url: "https://viralkand.com/post-1/".to_string(),
            title: "Card title".to_string(),
            thumbnail_url: String::new(),
        };

        let record = to_record(&site(), &candidate, &embed(), metadata.clone(), "x".into(), "t");
        assert_eq!(record.title, "Card title");
        assert_eq!(record.category, "Viral");

        let mut site = site();
        site.title_from_heading = true;
        site.category_from_post = true;
        site.title_strip_phrases = vec!["ViralKand".to_string()];
        let record = to_record(&site, &candidate, &embed(), metadata, "x".into(), "t");
        assert_eq!(record.title, "Full Heading Title");
        assert_eq!(record.category, "Desi Bhabhi");
        assert!(record.tags().any(|tag| tag == "desi bhabhi"));
    }

    #[test]
    fn test_short_heading_keeps_card_title() {
        let metadata = PostMetadata {
            heading: Some("Hi".to_string()),
            ..Default::default()
        };
        let candidate = PostCandidate {
            url: "https://viralkand.com/post-1/".to_string(),
            title: "Card title".to_string(),
            thumbnail_url: String::new(),
        };
        let mut site = site();
        site.title_from_heading = true;

        let record = to_record(&site, &candidate, &embed(), metadata, "x".into(), "t");
        assert_eq!(record.title, "Card title");
        assert_eq!(record.category, "Viral");
    }
}
