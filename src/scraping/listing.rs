//! Listing page parsing
//!
//! Turns a listing page into post candidates: the first selector that matches
//! any card wins, each card contributes its first link, and taxonomy or
//! pagination links are dropped.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use url::Url;

use crate::config::SiteProfile;
use crate::types::PostCandidate;
use crate::util::{collapse_whitespace, truncate_chars};

/// Longest title kept, in characters
pub const MAX_TITLE_CHARS: usize = 150;

/// Titles this short (in characters) are discarded
pub const MIN_TITLE_CHARS: usize = 3;

/// Characters trimmed from both ends of a cleaned title
const TITLE_TRIM_CHARS: &[char] = &['-', '|', '–', '—', ':'];

/// Removes a site's self-references from titles
pub struct TitleCleaner {
    patterns: Vec<Regex>,
}

impl TitleCleaner {
    pub fn new(phrases: &[String]) -> Self {
        let patterns = phrases
            .iter()
            .filter(|p| !p.trim().is_empty())
            .filter_map(|p| match Regex::new(&format!("(?i){}", regex::escape(p))) {
                Ok(r) => Some(r),
                Err(e) => {
                    tracing::warn!("Invalid title phrase '{}': {}", p, e);
                    None
                }
            })
            .collect();
        Self { patterns }
    }

    /// Strip phrases, collapse whitespace and trim separators
    pub fn clean(&self, raw: &str) -> String {
        let mut title = raw.to_string();
        for pattern in &self.patterns {
            title = pattern.replace_all(&title, " ").into_owned();
        }
        collapse_whitespace(&title)
            .trim_matches(|c: char| c.is_whitespace() || TITLE_TRIM_CHARS.contains(&c))
            .to_string()
    }
}

/// Clean a title with a one-off set of phrases
pub fn clean_title(raw: &str, phrases: &[String]) -> String {
    TitleCleaner::new(phrases).clean(raw)
}

/// Selectors used inside each card
struct CardSelectors {
    anchor: Selector,
    heading: Selector,
    image: Selector,
}

impl CardSelectors {
    fn new() -> Option<Self> {
        Some(Self {
            anchor: Selector::parse("a[href]").ok()?,
            heading: Selector::parse("h1, h2, h3, h4").ok()?,
            image: Selector::parse("img").ok()?,
        })
    }
}

/// Listing page parser
#[derive(Debug, Clone)]
pub struct ListingParser {
    max_per_page: usize,
}

impl ListingParser {
    /// Create a parser emitting at most `max_per_page` candidates per page
    pub fn new(max_per_page: usize) -> Self {
        Self { max_per_page }
    }

    /// Extract post candidates in document order, de-duplicated by URL.
    pub fn parse(&self, html: &str, profile: &SiteProfile) -> Vec<PostCandidate> {
        let base = match profile.base() {
            Ok(base) => base,
            Err(e) => {
                tracing::warn!("Site '{}' has invalid base URL: {}", profile.name, e);
                return Vec::new();
            }
        };
        let Some(selectors) = CardSelectors::new() else {
            return Vec::new();
        };

        let cap = profile.max_posts_per_page.unwrap_or(self.max_per_page);
        let cleaner = TitleCleaner::new(&profile.title_strip_phrases);
        let document = Html::parse_document(html);
        let cards = select_cards(&document, &profile.selectors);

        let mut seen = HashSet::new();
        let mut candidates = Vec::new();

        for card in cards {
            if candidates.len() >= cap {
                break;
            }
            let Some(candidate) = candidate_from_card(card, &selectors, &base, profile, &cleaner)
            else {
                continue;
            };
            if seen.insert(candidate.url.clone()) {
                candidates.push(candidate);
            }
        }

        candidates
    }
}

/// Cards for the first selector with at least one match
fn select_cards<'a>(document: &'a Html, selectors: &[String]) -> Vec<ElementRef<'a>> {
    for css in selectors {
        let selector = match Selector::parse(css) {
            Ok(s) => s,
            Err(_) => {
                tracing::warn!("Skipping invalid card selector '{}'", css);
                continue;
            }
        };
        let cards: Vec<ElementRef<'a>> = document.select(&selector).collect();
        if !cards.is_empty() {
            tracing::debug!(selector = css.as_str(), cards = cards.len(), "card selector matched");
            return cards;
        }
    }
    Vec::new()
}

fn candidate_from_card(
    card: ElementRef<'_>,
    selectors: &CardSelectors,
    base: &Url,
    profile: &SiteProfile,
    cleaner: &TitleCleaner,
) -> Option<PostCandidate> {
    let anchor = if card.value().name() == "a" && card.value().attr("href").is_some() {
        card
    } else {
        card.select(&selectors.anchor).next()?
    };

    let href = anchor.value().attr("href")?.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }
    if profile.excluded_paths.iter().any(|p| href.contains(p.as_str())) {
        return None;
    }

    let url = base.join(href).ok()?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }

    let title = resolve_title(card, anchor, selectors, cleaner)?;
    let thumbnail_url = resolve_thumbnail(card, selectors, base).unwrap_or_default();

    Some(PostCandidate {
        url: url.to_string(),
        title,
        thumbnail_url,
    })
}

/// Title from the anchor's `title`, then the card's first heading, then the
/// anchor text. The first source that survives cleaning wins.
fn resolve_title(
    card: ElementRef<'_>,
    anchor: ElementRef<'_>,
    selectors: &CardSelectors,
    cleaner: &TitleCleaner,
) -> Option<String> {
    let from_attr = anchor.value().attr("title").map(|t| t.to_string());
    let from_heading = card
        .select(&selectors.heading)
        .next()
        .map(|h| h.text().collect::<String>());
    let from_anchor = Some(anchor.text().collect::<String>());

    let title = [from_attr, from_heading, from_anchor]
        .into_iter()
        .flatten()
        .map(|raw| cleaner.clean(&raw))
        .find(|cleaned| !cleaned.is_empty())?;

    let title = truncate_chars(&title, MAX_TITLE_CHARS).trim_end().to_string();
    if title.chars().count() <= MIN_TITLE_CHARS {
        return None;
    }
    Some(title)
}

/// Thumbnail from lazy-load attributes first, ignoring inline placeholders
fn resolve_thumbnail(card: ElementRef<'_>, selectors: &CardSelectors, base: &Url) -> Option<String> {
    let img = card.select(&selectors.image).next()?;
    ["data-src", "data-lazy-src", "src"]
        .iter()
        .filter_map(|attr| img.value().attr(attr))
        .map(str::trim)
        .find(|src| !src.is_empty() && !src.starts_with("data:"))
        .and_then(|src| base.join(src).ok())
        .map(|url| url.to_string())
}
