//! Crawler, deduplication, and page parsing configuration

use serde::{Deserialize, Serialize};

use super::DEFAULT_USER_AGENT;

/// Worker pool and politeness configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Number of concurrent workers
    pub workers: usize,
    /// Delay every worker sleeps after each fetch (milliseconds)
    pub time_delay_ms: u64,
    /// Maximum concurrent in-flight fetches per domain
    pub per_domain_concurrency: usize,
    /// In-flight count above which an admitted worker backs off for `time_delay_ms`
    pub soft_inflight_threshold: usize,
    /// User agent string (also used to select robots.txt groups)
    pub user_agent: String,
    /// Optional caching proxy; requests are routed through it when set
    pub cache_server: Option<String>,
    /// Seed URLs
    pub seeds: Vec<String>,
    /// Request timeout (seconds)
    pub request_timeout_secs: u64,
    /// Maximum response body size (bytes)
    pub max_content_size: usize,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            time_delay_ms: 500,
            per_domain_concurrency: 2,
            soft_inflight_threshold: 1,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            cache_server: None,
            seeds: vec![
                "https://www.ics.uci.edu".to_string(),
                "https://www.cs.uci.edu".to_string(),
                "https://www.informatics.uci.edu".to_string(),
                "https://www.stat.uci.edu".to_string(),
            ],
            request_timeout_secs: 30,
            max_content_size: 10 * 1024 * 1024,
        }
    }
}

/// Content deduplication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    /// SimHash fingerprint width in bits (at most 256)
    pub fingerprint_bits: usize,
    /// Fraction of equal bits at or above which two pages are near-duplicates
    pub similarity_threshold: f64,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            fingerprint_bits: 256,
            similarity_threshold: 0.95,
        }
    }
}

/// A strategy for turning a raw response body into text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextDecoding {
    /// Strict UTF-8; fails on invalid sequences
    Utf8,
    /// ISO-8859-1; every byte maps to the code point of the same value
    Latin1,
}

/// Page parsing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParsingConfig {
    /// Decoding strategies, tried in order
    pub decoders: Vec<TextDecoding>,
}

impl Default for ParsingConfig {
    fn default() -> Self {
        Self {
            decoders: vec![TextDecoding::Utf8, TextDecoding::Latin1],
        }
    }
}
