//! Allow/block host rules

use url::Url;

use crate::config::ResolverConfig;

/// Known player hosts and advertising/tracking tokens, matched as
/// case-insensitive substrings.
#[derive(Debug, Clone)]
pub struct HostRules {
    allow: Vec<String>,
    block: Vec<String>,
}

impl HostRules {
    pub fn new(allow: &[String], block: &[String]) -> Self {
        let lower = |tokens: &[String]| -> Vec<String> {
            tokens
                .iter()
                .map(|t| t.trim().to_lowercase())
                .filter(|t| !t.is_empty())
                .collect()
        };
        Self {
            allow: lower(allow),
            block: lower(block),
        }
    }

    pub fn from_config(config: &ResolverConfig) -> Self {
        Self::new(&config.allow_hosts, &config.block_tokens)
    }

    /// Known player host tokens
    pub fn allow_tokens(&self) -> &[String] {
        &self.allow
    }

    /// Whether the URL's host or path contains an advertising/tracking token
    pub fn is_blocked(&self, url: &Url) -> bool {
        let haystack = format!(
            "{}{}",
            url.host_str().unwrap_or_default().to_lowercase(),
            url.path().to_lowercase()
        );
        self.block.iter().any(|token| haystack.contains(token.as_str()))
    }

    /// Whether the URL's host contains a known player token
    pub fn is_known_player(&self, url: &Url) -> bool {
        let host = url.host_str().unwrap_or_default().to_lowercase();
        self.allow.iter().any(|token| host.contains(token.as_str()))
    }
}

impl Default for HostRules {
    fn default() -> Self {
        Self::from_config(&ResolverConfig::default())
    }
}
