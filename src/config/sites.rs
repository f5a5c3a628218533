//! Per-site profiles
//!
//! A profile is data, not code: every site runs through the same pipeline and
//! differs only in the selectors, identity policy and fallbacks listed here.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::scraping::dedup::DedupKey;
use crate::scraping::identity::IdentityBasis;
use crate::scraping::resolver::EmbedFallback;

/// Path fragments that mark taxonomy or pagination links rather than posts
pub const DEFAULT_EXCLUDED_PATHS: &[&str] = &["/tag/", "/category/", "/page/", "/author/"];

/// Static configuration for one source site
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteProfile {
    /// Short site name, also used for default tags and id prefix
    pub name: String,
    /// Base URL used to resolve relative links and as the referrer
    pub base_url: String,
    /// Listing pages, processed in order
    pub listing_pages: Vec<String>,
    /// Card selectors, tried in order until one matches
    pub selectors: Vec<String>,
    /// Display category for records from this site
    pub category: String,
    /// Record description (defaults to "Video from <name>")
    #[serde(default)]
    pub description: Option<String>,
    /// Extra tags for records from this site
    #[serde(default)]
    pub tags: Vec<String>,
    /// Prefix for record ids (defaults to the site name)
    #[serde(default)]
    pub id_prefix: Option<String>,
    /// How record ids are derived
    #[serde(default)]
    pub identity: IdentityBasis,
    /// Which field is checked against the catalog before adding a record
    #[serde(default)]
    pub dedup_key: DedupKey,
    /// What to do when no player is found on a post page
    #[serde(default)]
    pub embed_fallback: EmbedFallback,
    /// Send the base URL as Referer on post requests
    #[serde(default = "default_true")]
    pub send_referer: bool,
    /// Accept any non-advertising iframe when no known player matches
    #[serde(default)]
    pub accept_unlisted_iframes: bool,
    /// Self-references removed from titles (case-insensitive)
    #[serde(default)]
    pub title_strip_phrases: Vec<String>,
    /// Prefer the post page's `<h1>` over the listing card title
    #[serde(default)]
    pub title_from_heading: bool,
    /// Take the category from the post page's `rel="category"` link
    #[serde(default)]
    pub category_from_post: bool,
    /// Links containing any of these are not posts
    #[serde(default = "default_excluded_paths")]
    pub excluded_paths: Vec<String>,
    /// Per-site override of the per-page candidate cap
    #[serde(default)]
    pub max_posts_per_page: Option<usize>,
}

fn default_true() -> bool {
    true
}

fn default_excluded_paths() -> Vec<String> {
    DEFAULT_EXCLUDED_PATHS.iter().map(|s| s.to_string()).collect()
}

impl SiteProfile {
    /// Create a profile with default policies
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        listing_pages: Vec<String>,
        selectors: Vec<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            listing_pages,
            selectors,
            category: category.into(),
            description: None,
            tags: Vec::new(),
            id_prefix: None,
            identity: IdentityBasis::default(),
            dedup_key: DedupKey::default(),
            embed_fallback: EmbedFallback::default(),
            send_referer: true,
            accept_unlisted_iframes: false,
            title_strip_phrases: Vec::new(),
            title_from_heading: false,
            category_from_post: false,
            excluded_paths: default_excluded_paths(),
            max_posts_per_page: None,
        }
    }

    /// Parsed base URL
    pub fn base(&self) -> Result<Url, url::ParseError> {
        Url::parse(&self.base_url)
    }

    pub fn id_prefix(&self) -> &str {
        self.id_prefix.as_deref().unwrap_or(&self.name)
    }

    pub fn description(&self) -> String {
        self.description
            .clone()
            .unwrap_or_else(|| format!("Video from {}", self.name))
    }

    /// Validate this profile, appending problems to `errors`
    pub(super) fn collect_errors(&self, errors: &mut Vec<String>) {
        let label = if self.name.trim().is_empty() {
            errors.push("site name must not be empty".to_string());
            "<unnamed>"
        } else {
            self.name.as_str()
        };

        if let Err(e) = self.base() {
            errors.push(format!("site '{}': invalid base_url '{}': {}", label, self.base_url, e));
        }

        if self.listing_pages.is_empty() {
            errors.push(format!("site '{}': no listing pages configured", label));
        }
        for page in &self.listing_pages {
            if let Err(e) = Url::parse(page) {
                errors.push(format!("site '{}': invalid listing page '{}': {}", label, page, e));
            }
        }

        if self.selectors.is_empty() {
            errors.push(format!("site '{}': at least one selector is required", label));
        }
        for selector in &self.selectors {
            if scraper::Selector::parse(selector).is_err() {
                errors.push(format!("site '{}': invalid selector '{}'", label, selector));
            }
        }

        if self.max_posts_per_page == Some(0) {
            errors.push(format!("site '{}': max_posts_per_page must be positive", label));
        }
    }
}
