//! Coordinator types: configuration, results, and statistics

use std::time::Duration;
use thiserror::Error;

use crate::scraping::{
    dedup::DedupKey,
    fetcher::FetchError,
    politeness::PolitenessConfig,
};
use crate::types::{EmbedTier, VideoRecord};

/// Configuration for one pipeline run
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Candidates taken from one listing page (sites may override)
    pub max_posts_per_page: usize,
    /// Post pages fetched per run, across all sites
    pub max_posts_per_run: usize,
    /// Politeness configuration
    pub politeness: PolitenessConfig,
}

impl CoordinatorConfig {
    pub fn from_config(config: &crate::config::ScrapingConfig) -> Self {
        Self {
            max_posts_per_page: config.max_posts_per_page,
            max_posts_per_run: config.max_posts_per_run,
            politeness: PolitenessConfig::from_config(config),
        }
    }
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self::from_config(&crate::config::ScrapingConfig::default())
    }
}

/// Conditions that make a whole run meaningless
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("No sites configured")]
    NoSites,
    #[error("No listing pages configured")]
    NoListingPages,
    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] FetchError),
}

/// A record found during a run that was not known before it
#[derive(Debug, Clone)]
pub struct Discovery {
    pub record: VideoRecord,
    /// Site the record came from
    pub site: String,
    /// Strategy that produced the embed URL
    pub tier: EmbedTier,
    /// Key the site's records are de-duplicated by
    pub dedup_key: DedupKey,
}

/// Result of one pipeline run
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// New records in traversal order
    pub discoveries: Vec<Discovery>,
    pub stats: ScrapingStats,
    pub duration: Duration,
}

impl RunReport {
    pub fn records(&self) -> impl Iterator<Item = &VideoRecord> {
        self.discoveries.iter().map(|d| &d.record)
    }
}

/// Statistics from the scraping coordinator
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScrapingStats {
    /// Sites processed
    pub sites_processed: u64,
    /// Listing pages fetched with a 2xx response
    pub listing_pages_fetched: u64,
    /// Listing pages that failed (transport error or non-2xx)
    pub listing_failures: u64,
    /// Candidates found on listing pages
    pub candidates_found: u64,
    /// Post pages requested
    pub posts_visited: u64,
    /// Candidates or records skipped as already known
    pub known_skipped: u64,
    /// Candidates skipped because no id could be derived
    pub unidentified_skipped: u64,
    /// Post pages that failed (transport error or non-2xx)
    pub post_failures: u64,
    /// Post pages where an embed was resolved
    pub embeds_resolved: u64,
    /// Post pages where no embed was found
    pub embeds_missing: u64,
    /// Records discovered this run
    pub new_records: u64,
    /// Whether the per-run visit cap stopped the run early
    pub run_cap_reached: bool,
}
