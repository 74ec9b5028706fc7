//! Page fetching
//!
//! The crawl core only sees the [`Fetcher`] trait. [`HttpFetcher`] is the
//! reqwest-backed implementation, optionally routed through a caching proxy.
//! Transport failures never surface as errors: they come back as a
//! [`FetchResult`] with a status of [`TRANSPORT_FAILURE_STATUS`] or above.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::config::CrawlerConfig;

/// Status reported when no HTTP response was obtained
pub const TRANSPORT_FAILURE_STATUS: u16 = 600;

/// Status reported when the response body exceeded the size limit
pub const TOO_LARGE_STATUS: u16 = 601;

/// Errors that can occur inside the HTTP fetcher
#[derive(Debug, Error)]
enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Content too large: {0} bytes")]
    ContentTooLarge(usize),
}

/// Outcome of fetching one URL
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// HTTP status code (>= 600 for transport failures)
    pub status: u16,
    /// The fetched URL (may differ from request due to redirects)
    pub final_url: Url,
    /// Raw response body
    pub body: Option<Vec<u8>>,
}

impl FetchResult {
    /// A successful response
    pub fn ok(final_url: Url, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            final_url,
            body: Some(body.into()),
        }
    }

    /// A response without usable content
    pub fn failed(url: &Url, status: u16) -> Self {
        Self {
            status,
            final_url: url.clone(),
            body: None,
        }
    }

    /// Whether the status indicates a page worth mining
    pub fn has_content(&self) -> bool {
        self.status != 204 && self.status < 400
    }
}

/// Fetches pages; implementations must not fail, only report a status
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> FetchResult;
}

/// Configuration for the HTTP fetcher
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string
    pub user_agent: String,
    /// Request timeout
    pub timeout: Duration,
    /// Maximum response size (bytes)
    pub max_content_size: usize,
    /// Caching proxy endpoint
    pub cache_server: Option<Url>,
}

impl FetchConfig {
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            timeout: Duration::from_secs(config.request_timeout_secs),
            max_content_size: config.max_content_size,
            cache_server: config
                .cache_server
                .as_deref()
                .and_then(|s| Url::parse(s).ok()),
        }
    }
}

/// Fetch statistics
#[derive(Debug, Default)]
pub struct FetchStats {
    /// Total fetch attempts
    pub total_fetches: AtomicU64,
    /// Responses with a content-bearing status
    pub successes: AtomicU64,
    /// Error statuses and transport failures
    pub failures: AtomicU64,
}

/// reqwest-backed fetcher
pub struct HttpFetcher {
    http_client: reqwest::Client,
    config: FetchConfig,
    stats: FetchStats,
}

impl HttpFetcher {
    /// Create a new HTTP fetcher
    pub fn new(config: FetchConfig) -> Result<Self, reqwest::Error> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(Duration::from_secs(10))
            .redirect(reqwest::redirect::Policy::limited(10))
            .user_agent(&config.user_agent)
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self {
            http_client,
            config,
            stats: FetchStats::default(),
        })
    }

    /// Get fetch statistics
    pub fn stats(&self) -> &FetchStats {
        &self.stats
    }

    async fn fetch_http(&self, url: &Url) -> Result<FetchResult, FetchError> {
        let request = match &self.config.cache_server {
            Some(cache) => self.http_client.get(cache.as_str()).query(&[
                ("q", url.as_str()),
                ("u", self.config.user_agent.as_str()),
            ]),
            None => self.http_client.get(url.as_str()),
        };

        let response = request.send().await?;
        let status = response.status().as_u16();
        let final_url = if self.config.cache_server.is_some() {
            url.clone()
        } else {
            response.url().clone()
        };

        if let Some(len) = response.content_length() {
            if len as usize > self.config.max_content_size {
                return Err(FetchError::ContentTooLarge(len as usize));
            }
        }

        let body = response.bytes().await?;
        if body.len() > self.config.max_content_size {
            return Err(FetchError::ContentTooLarge(body.len()));
        }

        Ok(FetchResult {
            status,
            final_url,
            body: Some(body.to_vec()),
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> FetchResult {
        self.stats.total_fetches.fetch_add(1, Ordering::Relaxed);

        let result = match self.fetch_http(url).await {
            Ok(result) => result,
            Err(FetchError::ContentTooLarge(size)) => {
                tracing::warn!("Skipping {}: content too large ({} bytes)", url, size);
                FetchResult::failed(url, TOO_LARGE_STATUS)
            }
            Err(e) => {
                tracing::warn!("Fetch of {} failed: {}", url, e);
                FetchResult::failed(url, TRANSPORT_FAILURE_STATUS)
            }
        };

        if result.has_content() {
            self.stats.successes.fetch_add(1, Ordering::Relaxed);
        } else {
            self.stats.failures.fetch_add(1, Ordering::Relaxed);
        }

        result
    }
}
