//! Embed resolution
//!
//! Finds the playable embed URL on a post page. Strategies run in a fixed
//! order and the first one that yields an absolute http(s) URL wins:
//!
//! 1. iframe on a known player host (blocked tokens are rejected first)
//! 2. player URL or `"file"` stream found in raw markup or scripts
//! 3. `<video><source src>` direct media
//! 4. any non-advertising iframe (opt-in per site)
//! 5. the post URL itself (opt-in per site)

mod hosts;
mod normalize;

pub use hosts::HostRules;
pub use normalize::normalize_embed_url;

use regex::Regex;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use super::post_meta::PostMetadata;
use crate::config::{ResolverConfig, SiteProfile};
use crate::types::{EmbedResult, EmbedTier};

/// What to record when no player is found on a post page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbedFallback {
    /// Skip the post
    #[default]
    None,
    /// Use the post page URL as the embed URL
    PostUrl,
}

/// Per-site switches for the optional strategies
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolvePolicy {
    pub accept_unlisted_iframes: bool,
    pub fallback: EmbedFallback,
}

impl ResolvePolicy {
    pub fn for_site(profile: &SiteProfile) -> Self {
        Self {
            accept_unlisted_iframes: profile.accept_unlisted_iframes,
            fallback: profile.embed_fallback,
        }
    }
}

const STRATEGY_CHAIN: [EmbedTier; 5] = [
    EmbedTier::KnownHostIframe,
    EmbedTier::MarkupPattern,
    EmbedTier::DirectMedia,
    EmbedTier::UnlistedIframe,
    EmbedTier::PageUrl,
];

/// Attributes that may carry an iframe's source, lazy-loaders included
const IFRAME_SOURCE_ATTRS: &[&str] = &["src", "data-src", "data-lazy-src"];

/// Embed resolution plus page metadata, from a single parse
#[derive(Debug, Clone, Default)]
pub struct PostInspection {
    pub embed: Option<EmbedResult>,
    pub metadata: PostMetadata,
}

/// Resolves the embed URL of a post page
pub struct EmbedResolver {
    rules: HostRules,
    /// Raw-markup patterns, tried in order
    markup_patterns: Vec<Regex>,
}

impl EmbedResolver {
    pub fn new(config: &ResolverConfig) -> Self {
        Self::with_rules(HostRules::from_config(config))
    }

    pub fn with_rules(rules: HostRules) -> Self {
        let markup_patterns = build_markup_patterns(&rules);
        Self {
            rules,
            markup_patterns,
        }
    }

    pub fn rules(&self) -> &HostRules {
        &self.rules
    }

    /// Resolve the embed URL of a post page
    pub fn resolve(
        &self,
        html: &str,
        post_url: &str,
        site_base: &Url,
        policy: ResolvePolicy,
    ) -> Option<EmbedResult> {
        let document = Html::parse_document(html);
        self.resolve_document(&document, html, post_url, site_base, policy)
    }

    /// Resolve the embed URL and read page metadata in one pass
    pub fn inspect(
        &self,
        html: &str,
        post_url: &Url,
        site_base: &Url,
        policy: ResolvePolicy,
    ) -> PostInspection {
        let document = Html::parse_document(html);
        let embed = self.resolve_document(&document, html, post_url.as_str(), site_base, policy);
        let metadata = PostMetadata::from_document(&document, post_url);
        PostInspection { embed, metadata }
    }

    fn resolve_document(
        &self,
        document: &Html,
        html: &str,
        post_url: &str,
        site_base: &Url,
        policy: ResolvePolicy,
    ) -> Option<EmbedResult> {
        let iframes = iframe_sources(document);

        for tier in STRATEGY_CHAIN {
            let found = match tier {
                EmbedTier::KnownHostIframe => self.known_host_iframe(&iframes),
                EmbedTier::MarkupPattern => self.markup_pattern(html),
                EmbedTier::DirectMedia => direct_media(document),
                EmbedTier::UnlistedIframe if policy.accept_unlisted_iframes => {
                    self.unlisted_iframe(&iframes, site_base)
                }
                EmbedTier::PageUrl if policy.fallback == EmbedFallback::PostUrl => {
                    normalize_embed_url(post_url)
                }
                _ => None,
            };

            if let Some(embed_url) = found {
                debug!(post = %post_url, tier = %tier, embed = %embed_url, "Resolved embed");
                return Some(EmbedResult { embed_url, tier });
            }
        }

        debug!(post = %post_url, "No embed found");
        None
    }

    fn known_host_iframe(&self, iframes: &[Url]) -> Option<String> {
        for url in iframes {
            if self.rules.is_blocked(url) {
                debug!(iframe = %url, "Skipping advertising iframe");
                continue;
            }
            if self.rules.is_known_player(url) {
                return Some(url.to_string());
            }
        }
        None
    }

    fn markup_pattern(&self, html: &str) -> Option<String> {
        for pattern in &self.markup_patterns {
            let Some(captures) = pattern.captures(html) else {
                continue;
            };
            let Some(matched) = captures.get(1).or_else(|| captures.get(0)) else {
                continue;
            };
            let Some(normalized) = normalize_embed_url(matched.as_str()) else {
                continue;
            };
            match Url::parse(&normalized) {
                Ok(url) if !self.rules.is_blocked(&url) => return Some(normalized),
                _ => continue,
            }
        }
        None
    }

    fn unlisted_iframe(&self, iframes: &[Url], site_base: &Url) -> Option<String> {
        let own_host = site_base.host_str().map(bare_host);
        iframes
            .iter()
            .filter(|url| !self.rules.is_blocked(url))
            .find(|url| url.host_str().map(bare_host) != own_host)
            .map(|url| url.to_string())
    }
}

impl Default for EmbedResolver {
    fn default() -> Self {
        Self::new(&ResolverConfig::default())
    }
}

fn build_markup_patterns(rules: &HostRules) -> Vec<Regex> {
    let mut sources = Vec::new();

    if !rules.allow_tokens().is_empty() {
        let hosts = rules
            .allow_tokens()
            .iter()
            .map(|token| regex::escape(token))
            .collect::<Vec<_>>()
            .join("|");
        sources.push(format!(
            r#"(?i)https?:(?:\\?/){{2}}[^/\\\s"'<>]*(?:{})[^\s"'<>]*"#,
            hosts
        ));
    }
    sources.push(r#"(?i)"file"\s*:\s*"([^"]+\.m3u8[^"]*)""#.to_string());
    sources.push(r#"(?i)"file"\s*:\s*"([^"]+\.mp4[^"]*)""#.to_string());

    sources
        .into_iter()
        .filter_map(|source| match Regex::new(&source) {
            Ok(regex) => Some(regex),
            Err(e) => {
                warn!("Invalid embed pattern '{}': {}", source, e);
                None
            }
        })
        .collect()
}

/// Absolute iframe sources in document order
fn iframe_sources(document: &Html) -> Vec<Url> {
    let Ok(selector) = Selector::parse("iframe") else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|iframe| {
            IFRAME_SOURCE_ATTRS
                .iter()
                .filter_map(|attr| iframe.value().attr(attr))
                .filter_map(normalize_embed_url)
                .find_map(|normalized| Url::parse(&normalized).ok())
        })
        .collect()
}

fn direct_media(document: &Html) -> Option<String> {
    let Ok(selector) = Selector::parse("video source[src], video[src]") else {
        return None;
    };

    document
        .select(&selector)
        .filter_map(|elem| elem.value().attr("src"))
        .find_map(normalize_embed_url)
}

fn bare_host(host: &str) -> String {
    let host = host.to_lowercase();
    host.strip_prefix("www.").map(str::to_string).unwrap_or(host)
}

#[cfg(test)]
mod tests {
    use super::*;

    const POST: &str = "https://desibf.com/2024/05/some-post/";

    fn base() -> Url {
        Url::parse("https://desibf.com").unwrap()
    }

    fn resolve(html: &str, policy: ResolvePolicy) -> Option<EmbedResult> {
        EmbedResolver::default().resolve(html, POST, &base(), policy)
    }

    #[test]
    fn test_ad_iframe_before_player() {
        let html = r#"<body>
            <iframe src="https://ad.doubleclick.net/ddm/adi/N1234"></iframe>
            <iframe src="https://streamtape.com/e/abc123"></iframe>
        </body>"#;

        let result = resolve(html, ResolvePolicy::default()).unwrap();
        assert_eq!(result.embed_url, "https://streamtape.com/e/abc123");
        assert_eq!(result.tier, EmbedTier::KnownHostIframe);
    }

    #[test]
    fn test_player_before_ad_iframe() {
        let html = r#"<body>
            <iframe src="https://streamtape.com/e/abc123"></iframe>
            <iframe src="https://ad.doubleclick.net/ddm/adi/N1234"></iframe>
        </body>"#;

        let result = resolve(html, ResolvePolicy::default()).unwrap();
        assert_eq!(result.embed_url, "https://streamtape.com/e/abc123");
    }

    #[test]
    fn test_block_wins_over_allow() {
        let html = r#"<iframe src="https://streamtape.com/banner/300x250"></iframe>"#;
        assert_eq!(resolve(html, ResolvePolicy::default()), None);
    }

    #[test]
    fn test_lazy_iframe_source() {
        let html = r#"<iframe src="about:blank" data-src="https://dood.watch/e/lazy1"></iframe>"#;
        let result = resolve(html, ResolvePolicy::default()).unwrap();
        assert_eq!(result.embed_url, "https://dood.watch/e/lazy1");
        assert_eq!(result.tier, EmbedTier::KnownHostIframe);
    }

    #[test]
    fn test_escaped_player_url_in_script() {
        let html = r#"<div id="player"></div>
            <script>var cfg = {"url":"https:\/\/dood.watch\/e\/xyz789"};</script>"#;

        let result = resolve(html, ResolvePolicy::default()).unwrap();
        assert_eq!(result.embed_url, "https://dood.watch/e/xyz789");
        assert_eq!(result.tier, EmbedTier::MarkupPattern);
    }

    #[test]
    fn test_stream_file_in_script() {
        let html = r#"<script>
            jwplayer("p").setup({"file":"https:\/\/cdn.test\/hls\/master.m3u8?t=1","image":"x.jpg"});
        </script>"#;

        let result = resolve(html, ResolvePolicy::default()).unwrap();
        assert_eq!(result.embed_url, "https://cdn.test/hls/master.m3u8?t=1");
        assert_eq!(result.tier, EmbedTier::MarkupPattern);
    }

    #[test]
    fn test_relative_stream_file_is_skipped() {
        let html = r#"<script>setup({"file":"/videos/a.mp4"});</script>"#;
        assert_eq!(resolve(html, ResolvePolicy::default()), None);
    }

    #[test]
    fn test_direct_media() {
        let html = r#"<video controls>
            <source src="https://media.test/v/clip.mp4" type="video/mp4">
        </video>"#;

        let result = resolve(html, ResolvePolicy::default()).unwrap();
        assert_eq!(result.embed_url, "https://media.test/v/clip.mp4");
        assert_eq!(result.tier, EmbedTier::DirectMedia);

        let relative = r#"<video><source src="/v/clip.mp4"></video>"#;
        assert_eq!(resolve(relative, ResolvePolicy::default()), None);
    }

    #[test]
    fn test_known_iframe_outranks_markup() {
        let html = r#"<iframe src="https://voe.sx/e/first"></iframe>
            <script>setup({"file":"https://cdn.test/a.m3u8"});</script>"#;

        let result = resolve(html, ResolvePolicy::default()).unwrap();
        assert_eq!(result.embed_url, "https://voe.sx/e/first");
        assert_eq!(result.tier, EmbedTier::KnownHostIframe);
    }

    #[test]
    fn test_protocol_relative_known_host() {
        let rules = HostRules::new(&["player.example.com".to_string()], &[]);
        let resolver = EmbedResolver::with_rules(rules);
        let html = r#"<iframe src="//player.example.com/e/1"></iframe>"#;

        let result = resolver
            .resolve(html, POST, &base(), ResolvePolicy::default())
            .unwrap();
        assert_eq!(result.embed_url, "https://player.example.com/e/1");
        assert_eq!(result.tier, EmbedTier::KnownHostIframe);
    }

    #[test]
    fn test_unlisted_iframe_opt_in() {
        let html = r#"<iframe src="https://ads.adserver.test/x"></iframe>
            <iframe src="https://www.desibf.com/widget"></iframe>
            <iframe src="//player.example.com/e/1"></iframe>"#;

        assert_eq!(resolve(html, ResolvePolicy::default()), None);

        let policy = ResolvePolicy {
            accept_unlisted_iframes: true,
            ..Default::default()
        };
        let result = resolve(html, policy).unwrap();
        assert_eq!(result.embed_url, "https://player.example.com/e/1");
        assert_eq!(result.tier, EmbedTier::UnlistedIframe);
    }

    #[test]
    fn test_post_url_fallback() {
        let html = "<p>No player here</p>";
        assert_eq!(resolve(html, ResolvePolicy::default()), None);

        let policy = ResolvePolicy {
            fallback: EmbedFallback::PostUrl,
            ..Default::default()
        };
        let result = resolve(html, policy).unwrap();
        assert_eq!(result.embed_url, POST);
        assert_eq!(result.tier, EmbedTier::PageUrl);
    }

    #[test]
    fn test_inspect_returns_metadata() {
        let html = r#"<html><head>
            <meta property="og:image" content="https://desibf.com/thumb.jpg">
            <meta property="video:duration" content="65">
        </head><body><iframe src="https://mixdrop.co/e/q1"></iframe></body></html>"#;

        let post = Url::parse(POST).unwrap();
        let inspection =
            EmbedResolver::default().inspect(html, &post, &base(), ResolvePolicy::default());
        assert_eq!(
            inspection.embed.map(|e| e.embed_url).as_deref(),
            Some("https://mixdrop.co/e/q1")
        );
        assert_eq!(
            inspection.metadata.thumbnail_url.as_deref(),
            Some("https://desibf.com/thumb.jpg")
        );
        assert_eq!(inspection.metadata.duration.as_deref(), Some("01:05"));
    }

    #[test]
    fn test_fallback_serde() {
        #[derive(Deserialize)]
        struct Wrapper {
            fallback: EmbedFallback,
        }
        let parsed: Wrapper = toml::from_str(r#"fallback = "post_url""#).unwrap();
        assert_eq!(parsed.fallback, EmbedFallback::PostUrl);
        let parsed: Wrapper = toml::from_str(r#"fallback = "none""#).unwrap();
        assert_eq!(parsed.fallback, EmbedFallback::None);
    }
}
