//! Coordinator types: worker states, processing results, and run summaries

use std::fmt;
use std::time::Duration;
use url::Url;

use crate::scraping::{dedup::DuplicateStatus, politeness::ThrottleStats, stats::CrawlReport};

/// Where a worker is in its crawl loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    Dequeuing,
    Throttled,
    Fetching,
    Processing,
    Publishing,
    Stopped,
}

impl WorkerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerState::Idle => "idle",
            WorkerState::Dequeuing => "dequeuing",
            WorkerState::Throttled => "throttled",
            WorkerState::Fetching => "fetching",
            WorkerState::Processing => "processing",
            WorkerState::Publishing => "publishing",
            WorkerState::Stopped => "stopped",
        }
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the page processor did with one fetch result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Status 204 or an error status; nothing mined
    NoContent { status: u16 },
    /// Body could not be decoded or parsed
    ParseFailed,
    /// Content already seen; links kept, statistics untouched
    Duplicate(DuplicateStatus),
    /// New content folded into the statistics
    Processed { tokens: usize },
}

/// Result of processing a single URL
#[derive(Debug)]
pub struct ProcessResult {
    /// The URL that was processed
    pub url: Url,
    pub outcome: ProcessOutcome,
    /// In-scope links found on the page, in document order
    pub discovered_urls: Vec<Url>,
    /// Processing duration
    pub duration: Duration,
}

impl ProcessResult {
    pub(super) fn empty(url: &Url, outcome: ProcessOutcome, duration: Duration) -> Self {
        Self {
            url: url.clone(),
            outcome,
            discovered_urls: Vec::new(),
            duration,
        }
    }
}

/// Pages handled by one worker before it stopped
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkerReport {
    pub worker_id: usize,
    pub pages_handled: u64,
}

/// Everything known about a finished crawl run
#[derive(Debug, Clone)]
pub struct CrawlSummary {
    pub report: CrawlReport,
    pub workers: Vec<WorkerReport>,
    pub throttle: ThrottleStats,
    /// Hosts whose robots.txt policy was resolved
    pub robots_hosts: usize,
    pub elapsed: Duration,
}

impl CrawlSummary {
    /// Pages handled across all workers
    pub fn pages_handled(&self) -> u64 {
        self.workers.iter().map(|w| w.pages_handled).sum()
    }
}
