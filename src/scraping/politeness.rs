//! Per-host rate limiting
//!
//! Enforces a fixed delay between successive requests to the same host and
//! backs off exponentially after 429 responses. This is backpressure toward
//! the source site, not a correctness mechanism.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::config::ScrapingConfig;

/// Decision about whether a request may go out now
#[derive(Debug, Clone, PartialEq)]
pub enum FetchDecision {
    /// Request is allowed
    Allowed,
    /// Must wait for the specified duration
    WaitFor(Duration),
    /// Rate limited until the specified instant
    RateLimited(Instant),
}

/// Per-host state for rate limiting
#[derive(Debug, Clone, Default)]
pub struct DomainState {
    /// When the last request to this host completed
    pub last_fetch: Option<Instant>,
    /// Number of consecutive 429 responses
    pub consecutive_429s: u32,
    /// Backoff until this time (if rate limited)
    pub backoff_until: Option<Instant>,
    /// Number of requests sent
    pub fetch_count: u64,
}

/// Configuration for the politeness controller
#[derive(Debug, Clone)]
pub struct PolitenessConfig {
    /// Delay between requests to the same host
    pub delay: Duration,
    /// Upper bound for 429 backoff
    pub max_backoff: Duration,
}

impl Default for PolitenessConfig {
    fn default() -> Self {
        Self::from_config(&ScrapingConfig::default())
    }
}

impl PolitenessConfig {
    pub fn from_config(config: &ScrapingConfig) -> Self {
        Self {
            delay: Duration::from_millis(config.politeness_delay_ms),
            max_backoff: Duration::from_secs(config.max_backoff_secs),
        }
    }
}

/// Politeness controller tracking per-host request timing
pub struct PolitenessController {
    domain_state: HashMap<String, DomainState>,
    config: PolitenessConfig,
}

impl PolitenessController {
    pub fn new(config: PolitenessConfig) -> Self {
        Self {
            domain_state: HashMap::new(),
            config,
        }
    }

    /// Check whether a request to `hostname` may go out now
    pub fn check(&mut self, hostname: &str) -> FetchDecision {
        let delay = self.config.delay;
        let state = self.domain_state.entry(hostname.to_string()).or_default();

        if let Some(backoff_until) = state.backoff_until {
            if Instant::now() < backoff_until {
                return FetchDecision::RateLimited(backoff_until);
            }
            state.backoff_until = None;
        }

        match state.last_fetch.map(|last| last.elapsed()) {
            Some(elapsed) if elapsed < delay => FetchDecision::WaitFor(delay.saturating_sub(elapsed)),
            _ => FetchDecision::Allowed,
        }
    }

    /// Sleep until a request to `hostname` is allowed. Returns the time waited.
    pub async fn wait_turn(&mut self, hostname: &str) -> Duration {
        let start = Instant::now();
        loop {
            match self.check(hostname) {
                FetchDecision::Allowed => break,
                FetchDecision::WaitFor(duration) => {
                    tracing::trace!(host = hostname, ?duration, "politeness delay");
                    tokio::time::sleep(duration).await;
                }
                FetchDecision::RateLimited(until) => {
                    let now = Instant::now();
                    if until > now {
                        tracing::debug!(host = hostname, wait = ?(until - now), "backing off after 429");
                        tokio::time::sleep(until - now).await;
                    }
                }
            }
        }
        start.elapsed()
    }

    /// Record a completed request (any non-429 status)
    pub fn record_success(&mut self, hostname: &str) {
        let state = self.domain_state.entry(hostname.to_string()).or_default();
        state.last_fetch = Some(Instant::now());
        state.consecutive_429s = 0;
        state.fetch_count += 1;
    }

    /// Record a 429 (Too Many Requests) response
    pub fn record_429(&mut self, hostname: &str, retry_after: Option<Duration>) {
        let max_backoff = self.config.max_backoff;
        let base = self.config.delay.max(Duration::from_secs(1));
        let state = self.domain_state.entry(hostname.to_string()).or_default();

        state.consecutive_429s += 1;
        state.last_fetch = Some(Instant::now());
        state.fetch_count += 1;

        // Exponential backoff from the base delay: 1x, 2x, 4x, 8x
        let backoff = retry_after
            .unwrap_or_else(|| base * 2u32.pow(state.consecutive_429s.min(4) - 1))
            .min(max_backoff);
        state.backoff_until = Some(Instant::now() + backoff);
    }

    /// Record a transport failure (connection failure, timeout, etc.)
    pub fn record_error(&mut self, hostname: &str) {
        let state = self.domain_state.entry(hostname.to_string()).or_default();
        state.last_fetch = Some(Instant::now());
        state.fetch_count += 1;
    }

    /// Get statistics
    pub fn stats(&self) -> PolitenessStats {
        let now = Instant::now();
        PolitenessStats {
            domains_tracked: self.domain_state.len(),
            rate_limited_domains: self
                .domain_state
                .values()
                .filter(|s| s.backoff_until.is_some_and(|b| now < b))
                .count(),
            total_fetches: self.domain_state.values().map(|s| s.fetch_count).sum(),
        }
    }
}

/// Statistics from the politeness controller
#[derive(Debug, Clone)]
pub struct PolitenessStats {
    pub domains_tracked: usize,
    pub rate_limited_domains: usize,
    pub total_fetches: u64,
}
