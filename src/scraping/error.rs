//! Crawl error taxonomy
//!
//! None of these are fatal to a crawl run. They are logged where they occur and
//! converted into "ineligible" or "no content" outcomes at the page boundary.

use thiserror::Error;

/// Errors raised while scoping, fetching, or processing a page
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Malformed URL '{url}': {reason}")]
    MalformedUrl { url: String, reason: String },
    #[error("Failed to parse page {url}: {reason}")]
    ParseFailure { url: String, reason: String },
    #[error("Failed to fetch robots.txt for {host}: {reason}")]
    RobotsFetchFailure { host: String, reason: String },
    #[error("Fetch of {url} failed with status {status}")]
    FetchFailure { url: String, status: u16 },
}

impl CrawlError {
    pub(crate) fn malformed(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::MalformedUrl {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn parse(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::ParseFailure {
            url: url.into(),
            reason: reason.to_string(),
        }
    }
}
