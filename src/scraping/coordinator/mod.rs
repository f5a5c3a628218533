//! Scraping coordinator running the discovery pipeline
//!
//! A run walks the configured sites in order. For each listing page it parses
//! post candidates, fetches each post page, resolves the embed, derives a
//! stable id and keeps the records the catalog does not already know.
//! Failures stay local to the page or post they happen on; only a run with
//! nothing to do is an error.

mod pipeline;
mod types;

pub use pipeline::to_record;
pub use types::*;

use chrono::{SecondsFormat, Utc};
use std::time::Instant;
use tracing::{debug, info, warn};
use url::Url;

use super::{
    dedup::{DedupIndex, DedupKey},
    fetcher::{FetchConfig, FetchEngine, FetchError, FetchRequest, FetchResult, Fetcher},
    identity::{Identifier, IdentityBasis},
    listing::ListingParser,
    politeness::{PolitenessController, PolitenessStats},
    resolver::{EmbedResolver, ResolvePolicy},
};

use crate::config::{Config, SiteProfile};
use crate::types::PostCandidate;

/// Mutable state of one run
struct RunState {
    /// Known records plus everything discovered so far
    index: DedupIndex,
    discoveries: Vec<Discovery>,
    /// Post pages fetched so far
    visits: usize,
}

/// Per-site context shared by all candidates of a site
struct SiteContext<'a> {
    site: &'a SiteProfile,
    base: Url,
    identifier: Identifier,
    policy: ResolvePolicy,
}

/// Scraping coordinator managing the discovery pipeline
pub struct ScrapingCoordinator<F: Fetcher> {
    config: CoordinatorConfig,
    fetcher: F,
    politeness: PolitenessController,
    listing: ListingParser,
    resolver: EmbedResolver,
    stats: ScrapingStats,
}

impl ScrapingCoordinator<FetchEngine> {
    /// Create a coordinator fetching over HTTP
    pub fn from_config(config: &Config) -> Result<Self, PipelineError> {
        let fetcher = FetchEngine::new(FetchConfig::from_config(&config.scraping))?;
        Ok(Self::new(
            CoordinatorConfig::from_config(&config.scraping),
            fetcher,
            EmbedResolver::new(&config.resolver),
        ))
    }
}

impl<F: Fetcher> ScrapingCoordinator<F> {
    pub fn new(config: CoordinatorConfig, fetcher: F, resolver: EmbedResolver) -> Self {
        let politeness = PolitenessController::new(config.politeness.clone());
        let listing = ListingParser::new(config.max_posts_per_page);
        Self {
            config,
            fetcher,
            politeness,
            listing,
            resolver,
            stats: ScrapingStats::default(),
        }
    }

    /// Statistics of the most recent run
    pub fn stats(&self) -> &ScrapingStats {
        &self.stats
    }

    pub fn politeness_stats(&self) -> PolitenessStats {
        self.politeness.stats()
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Run the pipeline once over `sites`.
    ///
    /// `known` holds the records already in the catalog. The report lists
    /// only records absent from it, in traversal order.
    pub async fn run(
        &mut self,
        sites: &[SiteProfile],
        known: &DedupIndex,
    ) -> Result<RunReport, PipelineError> {
        if sites.is_empty() {
            return Err(PipelineError::NoSites);
        }
        if sites.iter().all(|site| site.listing_pages.is_empty()) {
            return Err(PipelineError::NoListingPages);
        }

        let start = Instant::now();
        self.stats = ScrapingStats::default();
        let mut run = RunState {
            index: known.clone(),
            discoveries: Vec::new(),
            visits: 0,
        };

        for site in sites {
            if self.stats.run_cap_reached {
                break;
            }
            self.scrape_site(site, &mut run).await;
        }

        let duration = start.elapsed();
        info!(
            "Run complete: {} candidates, {} embeds resolved, {} new records in {:?}",
            self.stats.candidates_found, self.stats.embeds_resolved, self.stats.new_records, duration
        );

        Ok(RunReport {
            discoveries: run.discoveries,
            stats: self.stats.clone(),
            duration,
        })
    }

    async fn scrape_site(&mut self, site: &SiteProfile, run: &mut RunState) {
        let base = match site.base() {
            Ok(base) => base,
            Err(e) => {
                warn!(site = %site.name, "Skipping site with invalid base URL '{}': {}", site.base_url, e);
                return;
            }
        };
        self.stats.sites_processed += 1;

        let ctx = SiteContext {
            site,
            base,
            identifier: Identifier::new(site.identity, site.id_prefix()),
            policy: ResolvePolicy::for_site(site),
        };
        let before = run.discoveries.len();

        'pages: for page in &site.listing_pages {
            let Some(candidates) = self.fetch_listing(site, page).await else {
                continue;
            };

            for candidate in &candidates {
                if run.visits >= self.config.max_posts_per_run {
                    info!(
                        "Reached the limit of {} post pages per run",
                        self.config.max_posts_per_run
                    );
                    self.stats.run_cap_reached = true;
                    break 'pages;
                }

                if let Some(discovery) = self.process_candidate(&ctx, candidate, run).await {
                    run.index.insert(&discovery.record);
                    run.discoveries.push(discovery);
                    self.stats.new_records += 1;
                }
            }
        }

        info!(
            site = %site.name,
            "Site complete: {} new records",
            run.discoveries.len() - before
        );
    }

    /// Fetch and parse one listing page. `None` when the page is unusable.
    async fn fetch_listing(&mut self, site: &SiteProfile, page: &str) -> Option<Vec<PostCandidate>> {
        let url = match Url::parse(page) {
            Ok(url) => url,
            Err(e) => {
                warn!(site = %site.name, "Invalid listing page '{}': {}", page, e);
                self.stats.listing_failures += 1;
                return None;
            }
        };

        info!(site = %site.name, page = %url, "Fetching listing page");
        let response = match self.fetch(FetchRequest::new(url.clone())).await {
            Ok(response) if response.is_success() => response,
            Ok(response) => {
                warn!(page = %url, status = response.status_code, "Listing page returned an error status");
                self.stats.listing_failures += 1;
                return None;
            }
            Err(e) => {
                warn!(page = %url, "Failed to fetch listing page: {}", e);
                self.stats.listing_failures += 1;
                return None;
            }
        };
        self.stats.listing_pages_fetched += 1;

        let candidates = self.listing.parse(&response.body, site);
        self.stats.candidates_found += candidates.len() as u64;
        if candidates.is_empty() {
            warn!(page = %url, "No post candidates found");
        } else {
            debug!(page = %url, count = candidates.len(), "Parsed post candidates");
        }
        Some(candidates)
    }

    /// Take one candidate through fetch, resolution, identity and dedup
    async fn process_candidate(
        &mut self,
        ctx: &SiteContext<'_>,
        candidate: &PostCandidate,
        run: &mut RunState,
    ) -> Option<Discovery> {
        let site = ctx.site;

        // Slug ids are known before fetching, so known posts cost no request
        if ctx.identifier.basis() == IdentityBasis::UrlSlug {
            let Some(id) = ctx.identifier.for_post(&candidate.url) else {
                debug!(post = %candidate.url, "No slug in post URL, skipping");
                self.stats.unidentified_skipped += 1;
                return None;
            };
            if site.dedup_key == DedupKey::Id && run.index.contains_id(&id) {
                debug!(post = %candidate.url, id = %id, "Already in catalog");
                self.stats.known_skipped += 1;
                return None;
            }
        }

        let post_url = match Url::parse(&candidate.url) {
            Ok(url) => url,
            Err(e) => {
                warn!(post = %candidate.url, "Invalid post URL: {}", e);
                self.stats.post_failures += 1;
                return None;
            }
        };

        let mut request = FetchRequest::new(post_url.clone());
        if site.send_referer {
            request = request.with_referer(ctx.base.as_str());
        }

        run.visits += 1;
        self.stats.posts_visited += 1;
        let response = match self.fetch(request).await {
            Ok(response) if response.is_success() => response,
            Ok(response) => {
                warn!(post = %post_url, status = response.status_code, "Post page returned an error status");
                self.stats.post_failures += 1;
                return None;
            }
            Err(e) => {
                warn!(post = %post_url, "Failed to fetch post page: {}", e);
                self.stats.post_failures += 1;
                return None;
            }
        };

        let inspection = self
            .resolver
            .inspect(&response.body, &post_url, &ctx.base, ctx.policy);
        let Some(embed) = inspection.embed else {
            debug!(post = %post_url, "No embed found, skipping");
            self.stats.embeds_missing += 1;
            return None;
        };
        self.stats.embeds_resolved += 1;

        let Some(id) = ctx.identifier.identify(&candidate.url, &embed.embed_url) else {
            self.stats.unidentified_skipped += 1;
            return None;
        };

        let uploaded_at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let record = to_record(site, candidate, &embed, inspection.metadata, id, &uploaded_at);

        if run.index.is_known(&record, site.dedup_key) {
            debug!(post = %post_url, id = %record.id, "Already in catalog");
            self.stats.known_skipped += 1;
            return None;
        }

        info!(site = %site.name, id = %record.id, tier = %embed.tier, "New record: {}", record.title);
        Some(Discovery {
            record,
            site: site.name.clone(),
            tier: embed.tier,
            dedup_key: site.dedup_key,
        })
    }

    /// Fetch with per-host politeness applied around the request
    async fn fetch(&mut self, request: FetchRequest) -> Result<FetchResult, FetchError> {
        let host = request.host().to_string();
        self.politeness.wait_turn(&host).await;

        let result = self.fetcher.fetch(&request).await;
        match &result {
            Ok(response) if response.is_rate_limited() => {
                warn!(host = %host, "Rate limited (429), backing off");
                self.politeness.record_429(&host, None);
            }
            Ok(_) => self.politeness.record_success(&host),
            Err(_) => self.politeness.record_error(&host),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scraping::politeness::PolitenessConfig;
    use crate::types::EmbedTier;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    /// In-memory fetcher serving canned pages; unknown URLs get a 404
    #[derive(Default)]
    struct StubFetcher {
        pages: HashMap<String, (u16, String)>,
        requests: Mutex<Vec<FetchRequest>>,
    }

    impl StubFetcher {
        fn page(mut self, url: &str, body: &str) -> Self {
            self.pages.insert(url.to_string(), (200, body.to_string()));
            self
        }

        fn status(mut self, url: &str, status: u16) -> Self {
            self.pages.insert(url.to_string(), (status, String::new()));
            self
        }

        fn requested(&self) -> Vec<String> {
            self.requests
                .lock()
                .unwrap()
                .iter()
                .map(|r| r.url.to_string())
                .collect()
        }

        fn referer_for(&self, url: &str) -> Option<String> {
            self.requests
                .lock()
                .unwrap()
                .iter()
                .find(|r| r.url.as_str() == url)
                .and_then(|r| r.referer.clone())
        }
    }

    #[async_trait]
    impl Fetcher for StubFetcher {
        async fn fetch(&self, request: &FetchRequest) -> Result<FetchResult, FetchError> {
            self.requests.lock().unwrap().push(request.clone());
            let (status_code, body) = self
                .pages
                .get(request.url.as_str())
                .cloned()
                .unwrap_or((404, String::new()));
            Ok(FetchResult {
                final_url: request.url.clone(),
                status_code,
                body,
                fetch_duration: Duration::ZERO,
            })
        }
    }

    const LISTING: &str = "https://viralkand.com/";

    fn listing_html(slugs: &[&str]) -> String {
        let cards: String = slugs
            .iter()
            .map(|slug| {
                format!(
                    r#"<article><a href="/{slug}/"><img src="/thumbs/{slug}.jpg"></a><h2>Title for {slug}</h2></article>"#
                )
            })
            .collect();
        format!("<html><body>{}</body></html>", cards)
    }

    fn post_html(player: &str) -> String {
        format!(
            r#"<html><body>
                <iframe src="https://ad.doubleclick.net/ddm/adi/1"></iframe>
                <iframe src="https://streamtape.com/e/{player}"></iframe>
            </body></html>"#
        )
    }

    fn site() -> SiteProfile {
        SiteProfile::new(
            "viralkand",
            "https://viralkand.com",
            vec![LISTING.to_string()],
            vec!["article".to_string()],
            "Viral",
        )
    }

    fn config(max_per_run: usize) -> CoordinatorConfig {
        CoordinatorConfig {
            max_posts_per_page: 10,
            max_posts_per_run: max_per_run,
            politeness: PolitenessConfig {
                delay: Duration::ZERO,
                max_backoff: Duration::from_secs(1),
            },
        }
    }

    fn stub_coordinator(fetcher: StubFetcher) -> ScrapingCoordinator<StubFetcher> {
        ScrapingCoordinator::new(config(60), fetcher, EmbedResolver::default())
    }

    fn two_post_fetcher() -> StubFetcher {
        StubFetcher::default()
            .page(LISTING, &listing_html(&["post-a", "post-b"]))
            .page("https://viralkand.com/post-a/", &post_html("aaa"))
            .page("https://viralkand.com/post-b/", &post_html("bbb"))
    }

    #[tokio::test]
    async fn test_run_requires_sites_and_pages() {
        let mut coordinator = stub_coordinator(StubFetcher::default());
        let known = DedupIndex::new();

        assert!(matches!(
            coordinator.run(&[], &known).await,
            Err(PipelineError::NoSites)
        ));

        let mut empty = site();
        empty.listing_pages.clear();
        assert!(matches!(
            coordinator.run(&[empty], &known).await,
            Err(PipelineError::NoListingPages)
        ));
    }

    #[tokio::test]
    async fn test_run_discovers_in_document_order() {
        let mut coordinator = stub_coordinator(two_post_fetcher());
        let report = coordinator.run(&[site()], &DedupIndex::new()).await.unwrap();

        let embeds: Vec<&str> = report.records().map(|r| r.embed_url.as_str()).collect();
        assert_eq!(
            embeds,
            vec!["https://streamtape.com/e/aaa", "https://streamtape.com/e/bbb"]
        );

        let first = &report.discoveries[0];
        assert_eq!(first.tier, EmbedTier::KnownHostIframe);
        assert_eq!(first.site, "viralkand");
        assert!(first.record.id.starts_with("viralkand-"));
        assert_eq!(first.record.id.len(), "viralkand-".len() + 16);
        assert_eq!(first.record.title, "Title for post-a");
        assert_eq!(first.record.thumbnail_url, "https://viralkand.com/thumbs/post-a.jpg");
        assert!(first.record.uploaded_at.as_deref().unwrap().ends_with('Z'));

        let stats = &report.stats;
        assert_eq!(stats.listing_pages_fetched, 1);
        assert_eq!(stats.candidates_found, 2);
        assert_eq!(stats.posts_visited, 2);
        assert_eq!(stats.embeds_resolved, 2);
        assert_eq!(stats.new_records, 2);
    }

    #[tokio::test]
    async fn test_known_records_are_not_rediscovered() {
        let mut coordinator = stub_coordinator(two_post_fetcher());
        let first = coordinator.run(&[site()], &DedupIndex::new()).await.unwrap();

        let known = DedupIndex::from_records(first.records());
        let second = coordinator.run(&[site()], &known).await.unwrap();

        assert!(second.discoveries.is_empty());
        assert_eq!(second.stats.known_skipped, 2);
    }

    #[tokio::test]
    async fn test_same_embed_twice_in_one_run() {
        let fetcher = StubFetcher::default()
            .page(LISTING, &listing_html(&["post-a", "post-b"]))
            .page("https://viralkand.com/post-a/", &post_html("same"))
            .page("https://viralkand.com/post-b/", &post_html("same"));

        let mut coordinator = stub_coordinator(fetcher);
        let report = coordinator.run(&[site()], &DedupIndex::new()).await.unwrap();

        assert_eq!(report.discoveries.len(), 1);
        assert_eq!(report.stats.known_skipped, 1);
    }

    #[tokio::test]
    async fn test_failures_are_isolated() {
        let mut broken = site();
        broken.name = "broken".to_string();
        broken.listing_pages = vec!["https://broken.test/".to_string()];
        broken.base_url = "https://broken.test".to_string();

        let fetcher = StubFetcher::default()
            .status("https://broken.test/", 500)
            .page(LISTING, &listing_html(&["missing", "post-b"]))
            .page("https://viralkand.com/post-b/", &post_html("bbb"));

        let mut coordinator = stub_coordinator(fetcher);
        let report = coordinator
            .run(&[broken, site()], &DedupIndex::new())
            .await
            .unwrap();

        assert_eq!(report.discoveries.len(), 1);
        assert_eq!(report.stats.listing_failures, 1);
        assert_eq!(report.stats.post_failures, 1);
        assert_eq!(report.stats.sites_processed, 2);
    }

    #[tokio::test]
    async fn test_missing_embed_is_skipped() {
        let fetcher = StubFetcher::default()
            .page(LISTING, &listing_html(&["post-a", "post-b"]))
            .page("https://viralkand.com/post-a/", "<p>No player</p>")
            .page("https://viralkand.com/post-b/", &post_html("bbb"));

        let mut coordinator = stub_coordinator(fetcher);
        let report = coordinator.run(&[site()], &DedupIndex::new()).await.unwrap();

        assert_eq!(report.discoveries.len(), 1);
        assert_eq!(report.stats.embeds_missing, 1);
    }

    #[tokio::test]
    async fn test_known_slug_skips_fetch() {
        let mut slug_site = site();
        slug_site.identity = IdentityBasis::UrlSlug;
        slug_site.dedup_key = DedupKey::Id;

        let mut coordinator = stub_coordinator(two_post_fetcher());
        let first = coordinator.run(&[slug_site.clone()], &DedupIndex::new()).await.unwrap();
        let ids: Vec<&str> = first.records().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["viralkand-post-a", "viralkand-post-b"]);

        let known = DedupIndex::from_records(first.records().take(1));
        let mut coordinator = stub_coordinator(two_post_fetcher());
        let second = coordinator.run(&[slug_site], &known).await.unwrap();

        assert_eq!(second.discoveries.len(), 1);
        assert_eq!(second.stats.posts_visited, 1);
        assert!(!coordinator
            .fetcher()
            .requested()
            .contains(&"https://viralkand.com/post-a/".to_string()));
    }

    #[tokio::test]
    async fn test_run_cap_stops_run() {
        let mut coordinator =
            ScrapingCoordinator::new(config(1), two_post_fetcher(), EmbedResolver::default());
        let report = coordinator.run(&[site()], &DedupIndex::new()).await.unwrap();

        assert_eq!(report.discoveries.len(), 1);
        assert_eq!(report.stats.posts_visited, 1);
        assert!(report.stats.run_cap_reached);
    }

    #[tokio::test]
    async fn test_referer_sent_on_post_requests() {
        let mut coordinator = stub_coordinator(two_post_fetcher());
        coordinator.run(&[site()], &DedupIndex::new()).await.unwrap();

        let fetcher = coordinator.fetcher();
        assert_eq!(fetcher.referer_for(LISTING), None);
        assert_eq!(
            fetcher.referer_for("https://viralkand.com/post-a/").as_deref(),
            Some("https://viralkand.com/")
        );
    }
}
