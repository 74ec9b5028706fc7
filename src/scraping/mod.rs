//! Crawl coordination and content deduplication
//!
//! This module implements a scoped, polite, deduplicating crawler. Workers pull
//! URLs from a frontier, fetch them under a per-domain politeness throttle,
//! mine the page for in-scope links, and fold its text into shared statistics
//! unless the duplicate index has seen the same or nearly the same content.
//!
//! Key components:
//! - `UrlScopeFilter`: scheme, domain, extension, query, trap, and robots checks
//! - `RobotsCache`: per-host memoized robots.txt policies
//! - `DuplicateIndex`: checksum + SimHash duplicate detection
//! - `PageProcessor`: link extraction, dedup, and statistics folding
//! - `PolitenessThrottle`: per-domain admission gates and backoff
//! - `Crawler`: the worker pool

pub mod coordinator;
pub mod dedup;
pub mod error;
pub mod extractor;
pub mod fetcher;
pub mod frontier;
pub mod politeness;
pub mod robots;
pub mod stats;
pub mod tokenizer;
pub mod trap_detection;

pub use coordinator::{
    CrawlSummary, Crawler, PageProcessor, ProcessOutcome, ProcessResult, Rejection, ScopeDecision,
    UrlScopeFilter, WorkerState,
};
pub use dedup::{ContentFingerprint, DuplicateIndex, DuplicateStatus, SimHash};
pub use error::CrawlError;
pub use fetcher::{FetchResult, Fetcher, HttpFetcher};
pub use frontier::{Frontier, MemoryFrontier};
pub use politeness::{PolitenessThrottle, ThrottlePermit};
pub use robots::{RobotsCache, RobotsPolicy};
pub use stats::{CrawlReport, CrawlStatistics};
pub use trap_detection::TrapKind;

use url::Url;

/// Normalize a URL for identity comparison: drop the fragment, keep
/// scheme, host, path, and query as the parser canonicalized them.
pub fn normalize_url(url: &Url) -> Url {
    let mut normalized = url.clone();
    normalized.set_fragment(None);
    normalized
}

/// Drop everything from the first `#` onward
pub fn defragment(link: &str) -> &str {
    link.split('#').next().unwrap_or_default()
}

/// Parse a possibly relative link against `base` into a normalized URL
pub fn parse_link(link: &str, base: Option<&Url>) -> Result<Url, CrawlError> {
    let link = defragment(link.trim());
    let parsed = match base {
        Some(base) => base.join(link),
        None => Url::parse(link),
    };
    parsed
        .map(|url| normalize_url(&url))
        .map_err(|e| CrawlError::malformed(link, e))
}

/// Domain key used for politeness: the URL's host
pub fn domain_of(url: &Url) -> String {
    url.host_str().unwrap_or_default().to_string()
}
