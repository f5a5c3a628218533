//! Configuration for vidcrawl

mod logging;
mod scraping;
mod sites;

pub use logging::{LogFormat, LogLevel, LoggingConfig};
pub use scraping::{CatalogConfig, ResolverConfig, ScrapingConfig};
pub use sites::{SiteProfile, DEFAULT_EXCLUDED_PATHS};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Default user agent for all HTTP requests
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Starter configuration written by `vidcrawl init`
pub const STARTER_CONFIG: &str = r#"# vidcrawl configuration

[scraping]
request_timeout_secs = 30
politeness_delay_ms = 1500
max_posts_per_page = 10
max_posts_per_run = 60

[catalog]
path = "data/videos.json"

[logging]
format = "text"
level = "info"

[[sites]]
name = "viralkand"
base_url = "https://viralkand.com/"
listing_pages = ["https://viralkand.com/", "https://viralkand.com/page/2/"]
selectors = ["article.post", "article"]
category = "Viral"
tags = ["viral"]
title_strip_phrases = ["Viral video from viralkand.com", "- viralkand.com", "| viralkand"]
identity = "embed_hash"
dedup_key = "embed_url"
embed_fallback = "none"

[[sites]]
name = "desibf"
base_url = "https://desibf.com/"
listing_pages = ["https://desibf.com/", "https://desibf.com/page/2/", "https://desibf.com/page/3/"]
selectors = ["article"]
category = "Desi"
tags = ["desi"]
embed_fallback = "post_url"
"#;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Fetching and traversal limits
    #[serde(default)]
    pub scraping: ScrapingConfig,
    /// Embed resolver host rules
    #[serde(default)]
    pub resolver: ResolverConfig,
    /// Catalog location
    #[serde(default)]
    pub catalog: CatalogConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Site profiles, processed in order
    #[serde(default)]
    pub sites: Vec<SiteProfile>,
}

impl Config {
    /// Load and validate configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path.display(), e))?;
        Self::from_toml(&content)
            .map_err(|e| anyhow::anyhow!("Invalid config file '{}': {}", path.display(), e))
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate all configuration fields.
    ///
    /// Collects all validation errors and reports them together.
    pub fn validate(&self) -> Result<()> {
        let mut errors: Vec<String> = Vec::new();

        if self.scraping.request_timeout_secs == 0 {
            errors.push("request_timeout_secs must be positive".to_string());
        }
        if self.scraping.max_posts_per_page == 0 {
            errors.push("max_posts_per_page must be positive".to_string());
        }
        if self.scraping.max_posts_per_run == 0 {
            errors.push("max_posts_per_run must be positive".to_string());
        }
        if self.scraping.user_agent.trim().is_empty() {
            errors.push("user_agent must not be empty".to_string());
        }
        if self.resolver.allow_hosts.iter().any(|h| h.trim().is_empty()) {
            errors.push("resolver allow_hosts must not contain empty entries".to_string());
        }
        if self.resolver.block_tokens.iter().any(|t| t.trim().is_empty()) {
            errors.push("resolver block_tokens must not contain empty entries".to_string());
        }
        if self.catalog.path.as_os_str().is_empty() {
            errors.push("catalog path must not be empty".to_string());
        }

        if self.sites.is_empty() {
            errors.push("at least one site must be configured".to_string());
        }
        let mut names = HashSet::new();
        for site in &self.sites {
            if !site.name.is_empty() && !names.insert(site.name.as_str()) {
                errors.push(format!("duplicate site name '{}'", site.name));
            }
            site.collect_errors(&mut errors);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            anyhow::bail!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            );
        }
    }
}
