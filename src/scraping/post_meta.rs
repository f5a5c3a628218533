//! Post page metadata: preview image, duration, heading and category link

use scraper::{Html, Selector};
use url::Url;

use crate::util::collapse_whitespace;

/// Meta names carrying a preview image, in preference order
const THUMBNAIL_META: &[&str] = &["og:image", "og:image:secure_url", "twitter:image"];

/// Meta names carrying a duration, in preference order
const DURATION_META: &[&str] = &["video:duration", "og:video:duration"];

/// Metadata recovered from a post page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostMetadata {
    /// Absolute preview image URL
    pub thumbnail_url: Option<String>,
    /// Duration formatted as "MM:SS", or "HH:MM" from one hour up
    pub duration: Option<String>,
    /// Text of the first `<h1>`, whitespace collapsed
    pub heading: Option<String>,
    /// Text of the first `rel="category"` link
    pub category: Option<String>,
}

impl PostMetadata {
    /// Read metadata from an already-parsed post page
    pub fn from_document(document: &Html, post_url: &Url) -> Self {
        let thumbnail_url = THUMBNAIL_META
            .iter()
            .filter_map(|name| meta_content(document, name))
            .filter(|content| !content.starts_with("data:"))
            .find_map(|content| {
                post_url
                    .join(&content)
                    .ok()
                    .filter(|url| url.scheme() == "http" || url.scheme() == "https")
            })
            .map(String::from);

        let duration = DURATION_META
            .iter()
            .filter_map(|name| meta_content(document, name))
            .chain(itemprop_duration(document))
            .find_map(|raw| parse_duration(&raw))
            .map(format_duration);

        Self {
            thumbnail_url,
            duration,
            heading: first_text(document, "h1"),
            category: first_text(document, "a[rel~='category']"),
        }
    }

    pub fn extract(html: &str, post_url: &Url) -> Self {
        Self::from_document(&Html::parse_document(html), post_url)
    }
}

/// Get meta content by property or name
fn meta_content(document: &Html, name: &str) -> Option<String> {
    for attr in ["property", "name"] {
        let Ok(selector) = Selector::parse(&format!("meta[{}='{}']", attr, name)) else {
            continue;
        };
        for elem in document.select(&selector) {
            if let Some(content) = elem.value().attr("content") {
                let trimmed = content.trim();
                if !trimmed.is_empty() {
                    return Some(trimmed.to_string());
                }
            }
        }
    }
    None
}

fn first_text(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .map(|elem| collapse_whitespace(&elem.text().collect::<String>()))
        .find(|text| !text.is_empty())
}

fn itemprop_duration(document: &Html) -> Option<String> {
    let selector = Selector::parse("[itemprop='duration'][content]").ok()?;
    document
        .select(&selector)
        .filter_map(|elem| elem.value().attr("content"))
        .map(|content| content.trim().to_string())
        .find(|content| !content.is_empty())
}

/// Parse a duration in seconds, "MM:SS"/"HH:MM:SS", or ISO 8601 ("PT1H2M3S")
pub fn parse_duration(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if raw.bytes().all(|b| b.is_ascii_digit()) {
        return raw.parse().ok();
    }

    if raw.contains(':') {
        let parts: Vec<&str> = raw.split(':').collect();
        if parts.len() > 3 {
            return None;
        }
        let mut total = 0u64;
        for part in parts {
            let value: u64 = part.trim().parse().ok()?;
            total = total.checked_mul(60)?.checked_add(value)?;
        }
        return Some(total);
    }

    let upper = raw.to_ascii_uppercase();
    let rest = upper.strip_prefix("PT")?;
    let mut total = 0u64;
    let mut number = String::new();
    for c in rest.chars() {
        match c {
            '0'..='9' => number.push(c),
            // Fractional seconds are dropped
            '.' => number.push(c),
            'H' | 'M' | 'S' => {
                let value: f64 = number.parse().ok()?;
                let unit = match c {
                    'H' => 3600.0,
                    'M' => 60.0,
                    _ => 1.0,
                };
                let secs = value * unit;
                if !secs.is_finite() || secs >= u64::MAX as f64 {
                    return None;
                }
                total = total.checked_add(secs as u64)?;
                number.clear();
            }
            _ => return None,
        }
    }
    if !number.is_empty() {
        return None;
    }
    Some(total)
}

/// Format seconds as "MM:SS", or "HH:MM" from one hour up (seconds dropped)
pub fn format_duration(total_secs: u64) -> String {
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    if hours > 0 {
        format!("{:02}:{:02}", hours, minutes)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}
