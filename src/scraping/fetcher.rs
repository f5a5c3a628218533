//! HTTP fetching for listing and post pages
//!
//! The pipeline talks to the network through the [`Fetcher`] trait so the
//! HTTP boundary can be swapped for a stub in tests. [`FetchEngine`] is the
//! reqwest-backed implementation. Non-2xx responses are returned as a
//! [`FetchResult`] for the caller to branch on; only transport failures
//! become a [`FetchError`]. No retries happen here.

use async_trait::async_trait;
use std::time::{Duration, Instant};
use thiserror::Error;
use url::Url;

use crate::config::ScrapingConfig;

/// Errors that can occur during fetching
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Timeout after {0:?}")]
    Timeout(Duration),
    #[error("Connection failed: {0}")]
    Connect(String),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Content too large: {0} bytes")]
    ContentTooLarge(usize),
    #[error("Invalid header value: {0}")]
    InvalidHeader(String),
}

/// A single GET request
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: Url,
    /// Referer header, for sites that reject requests without one
    pub referer: Option<String>,
    /// Per-request timeout overriding the client default
    pub timeout: Option<Duration>,
}

impl FetchRequest {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            referer: None,
            timeout: None,
        }
    }

    pub fn with_referer(mut self, referer: impl Into<String>) -> Self {
        self.referer = Some(referer.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Hostname used for per-host rate limiting
    pub fn host(&self) -> &str {
        self.url.host_str().unwrap_or_default()
    }
}

/// Result of a completed HTTP exchange (any status)
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// The fetched URL (may differ from request due to redirects)
    pub final_url: Url,
    /// HTTP status code
    pub status_code: u16,
    /// Response body as text
    pub body: String,
    /// Time taken to fetch
    pub fetch_duration: Duration,
}

impl FetchResult {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    pub fn is_rate_limited(&self) -> bool {
        self.status_code == 429
    }
}

/// Capability to fetch a page as text
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResult, FetchError>;
}

/// Configuration for the fetch engine
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string
    pub user_agent: String,
    /// Request timeout
    pub timeout: Duration,
    /// Connection timeout
    pub connect_timeout: Duration,
    /// Maximum response size (bytes)
    pub max_content_size: usize,
    /// Maximum redirects to follow
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self::from_config(&ScrapingConfig::default())
    }
}

impl FetchConfig {
    pub fn from_config(config: &ScrapingConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            timeout: Duration::from_secs(config.request_timeout_secs),
            connect_timeout: Duration::from_secs(config.connect_timeout_secs),
            max_content_size: config.max_content_size,
            max_redirects: 10,
        }
    }
}

/// reqwest-backed fetcher
pub struct FetchEngine {
    http_client: reqwest::Client,
    config: FetchConfig,
}

impl FetchEngine {
    /// Create a new fetch engine
    pub fn new(config: FetchConfig) -> Result<Self, FetchError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .user_agent(&config.user_agent)
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self { http_client, config })
    }

    /// Get configuration
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    fn classify(&self, err: reqwest::Error, timeout: Duration) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout(timeout)
        } else if err.is_connect() {
            FetchError::Connect(err.to_string())
        } else {
            FetchError::Http(err)
        }
    }
}

#[async_trait]
impl Fetcher for FetchEngine {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResult, FetchError> {
        let start = Instant::now();
        let timeout = request.timeout.unwrap_or(self.config.timeout);

        let mut builder = self
            .http_client
            .get(request.url.as_str())
            .timeout(timeout)
            .header(
                reqwest::header::ACCEPT,
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .header(reqwest::header::ACCEPT_LANGUAGE, "en-US,en;q=0.5");

        if let Some(referer) = &request.referer {
            let value = reqwest::header::HeaderValue::from_str(referer)
                .map_err(|_| FetchError::InvalidHeader(referer.clone()))?;
            builder = builder.header(reqwest::header::REFERER, value);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| self.classify(e, timeout))?;

        let status = response.status();
        let final_url = response.url().clone();

        if let Some(len) = response.content_length() {
            if len as usize > self.config.max_content_size {
                return Err(FetchError::ContentTooLarge(len as usize));
            }
        }

        let body = response.text().await.map_err(|e| self.classify(e, timeout))?;

        if body.len() > self.config.max_content_size {
            return Err(FetchError::ContentTooLarge(body.len()));
        }

        tracing::debug!(
            url = %request.url,
            status = status.as_u16(),
            bytes = body.len(),
            "fetched"
        );

        Ok(FetchResult {
            final_url,
            status_code: status.as_u16(),
            body,
            fetch_duration: start.elapsed(),
        })
    }
}
