//! Fetching, politeness, caps and resolver host rules

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::DEFAULT_USER_AGENT;

/// Network and traversal limits for a run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapingConfig {
    /// User agent string sent with every request
    pub user_agent: String,
    /// Request timeout (seconds)
    pub request_timeout_secs: u64,
    /// Connection timeout (seconds)
    pub connect_timeout_secs: u64,
    /// Largest response body accepted (bytes)
    pub max_content_size: usize,
    /// Delay between requests to the same host (milliseconds)
    pub politeness_delay_ms: u64,
    /// Upper bound for 429 backoff (seconds)
    pub max_backoff_secs: u64,
    /// Maximum candidates taken from one listing page
    pub max_posts_per_page: usize,
    /// Maximum post pages fetched in one run
    pub max_posts_per_run: usize,
}

impl Default for ScrapingConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout_secs: 30,
            connect_timeout_secs: 10,
            max_content_size: 10 * 1024 * 1024, // 10 MB
            politeness_delay_ms: 1500,
            max_backoff_secs: 60,
            max_posts_per_page: 10,
            max_posts_per_run: 60,
        }
    }
}

/// Known player hosts and advertising/tracking tokens used by the embed resolver
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Substrings identifying video player hosts
    pub allow_hosts: Vec<String>,
    /// Substrings identifying advertising or tracking URLs
    pub block_tokens: Vec<String>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        let allow_hosts = [
            "streamtape", "dood", "mixdrop", "streamlare", "vidoza", "upstream", "voe",
            "filemoon", "fembed", "streamsb", "videovard", "streamwish", "mp4upload",
            "sendvid", "mmsbaba",
        ];
        let block_tokens = [
            "doubleclick", "googlesyndication", "adserver", "adsystem", "adservice",
            "banner", "popup", "popunder", "tracking", "tracker", "analytics", "pixel",
            "affiliate", "promo", "impression",
        ];
        Self {
            allow_hosts: allow_hosts.iter().map(|s| s.to_string()).collect(),
            block_tokens: block_tokens.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Catalog location
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Path of the JSON catalog file
    pub path: PathBuf,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/videos.json"),
        }
    }
}
