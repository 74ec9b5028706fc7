//! Crawl coordinator running the worker pool
//!
//! Each worker independently loops: dequeue from the frontier, wait for the
//! domain's politeness gate, fetch, process the page, publish the discovered
//! links, mark the URL complete, then sleep the inter-request delay. Workers
//! stop when the frontier reports exhaustion.

mod pipeline;
mod types;
mod url_filter;

pub use pipeline::PageProcessor;
pub use types::*;
pub use url_filter::{Rejection, ScopeDecision, UrlScopeFilter};

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::Config;

use super::{
    dedup::DuplicateIndex,
    domain_of,
    fetcher::Fetcher,
    frontier::Frontier,
    politeness::{PolitenessThrottle, ThrottleConfig},
    robots::RobotsCache,
    stats::{CrawlStatistics, DEFAULT_TOP_WORDS},
};

/// Worker pool driving a crawl to completion
pub struct Crawler {
    workers: usize,
    time_delay: Duration,
    frontier: Arc<dyn Frontier>,
    fetcher: Arc<dyn Fetcher>,
    throttle: Arc<PolitenessThrottle>,
    processor: Arc<PageProcessor>,
    robots: Arc<RobotsCache>,
}

impl Crawler {
    /// Create a crawler; robots.txt is fetched through the same `fetcher`
    pub fn new(config: &Config, fetcher: Arc<dyn Fetcher>, frontier: Arc<dyn Frontier>) -> Self {
        let robots = Arc::new(RobotsCache::new(
            Arc::clone(&fetcher),
            config.crawler.user_agent.clone(),
        ));
        let filter = Arc::new(UrlScopeFilter::new(&config.scope).with_robots(Arc::clone(&robots)));
        let dedup = Arc::new(DuplicateIndex::new(
            config.dedup.fingerprint_bits,
            config.dedup.similarity_threshold,
        ));
        let stats = Arc::new(CrawlStatistics::new(config.scope.primary_domain.clone()));
        let processor = Arc::new(PageProcessor::new(config, filter, dedup, stats));

        Self {
            workers: config.crawler.workers.max(1),
            time_delay: Duration::from_millis(config.crawler.time_delay_ms),
            frontier,
            fetcher,
            throttle: Arc::new(PolitenessThrottle::new(ThrottleConfig::from_config(
                &config.crawler,
            ))),
            processor,
            robots,
        }
    }

    /// Shared statistics, readable while the crawl runs
    pub fn stats(&self) -> &Arc<CrawlStatistics> {
        self.processor.stats()
    }

    /// Run every worker until the frontier is exhausted
    pub async fn run(&self) -> CrawlSummary {
        let start = Instant::now();
        tracing::info!(
            "Starting crawl with {} workers (delay {:?})",
            self.workers,
            self.time_delay
        );

        let handles: Vec<_> = (0..self.workers)
            .map(|id| {
                let worker = Worker {
                    id,
                    state: WorkerState::Idle,
                    time_delay: self.time_delay,
                    frontier: Arc::clone(&self.frontier),
                    fetcher: Arc::clone(&self.fetcher),
                    throttle: Arc::clone(&self.throttle),
                    processor: Arc::clone(&self.processor),
                };
                tokio::spawn(worker.run())
            })
            .collect();

        let mut workers = Vec::with_capacity(handles.len());
        for (id, result) in futures::future::join_all(handles).await.into_iter().enumerate() {
            match result {
                Ok(report) => workers.push(report),
                Err(e) => {
                    tracing::error!("Worker {} terminated abnormally: {}", id, e);
                    workers.push(WorkerReport {
                        worker_id: id,
                        pages_handled: 0,
                    });
                }
            }
        }

        let summary = CrawlSummary {
            report: self.stats().report(DEFAULT_TOP_WORDS),
            workers,
            throttle: self.throttle.stats(),
            robots_hosts: self.robots.len(),
            elapsed: start.elapsed(),
        };

        tracing::info!(
            "Crawl finished in {:.1}s: {} pages handled, {} unique pages, {} duplicates",
            summary.elapsed.as_secs_f64(),
            summary.pages_handled(),
            summary.report.unique_pages,
            summary.report.duplicate_pages
        );

        summary
    }
}

struct Worker {
    id: usize,
    state: WorkerState,
    time_delay: Duration,
    frontier: Arc<dyn Frontier>,
    fetcher: Arc<dyn Fetcher>,
    throttle: Arc<PolitenessThrottle>,
    processor: Arc<PageProcessor>,
}

impl Worker {
    async fn run(mut self) -> WorkerReport {
        let mut pages_handled = 0;

        loop {
            self.transition(WorkerState::Dequeuing);
            let Some(url) = self.frontier.next_url().await else {
                break;
            };

            self.transition(WorkerState::Throttled);
            let permit = self.throttle.acquire(&domain_of(&url)).await;

            self.transition(WorkerState::Fetching);
            let fetched = self.fetcher.fetch(&url).await;
            self.throttle.release(permit);

            self.transition(WorkerState::Processing);
            let result = self.processor.process(&url, &fetched).await;

            self.transition(WorkerState::Publishing);
            for link in result.discovered_urls {
                self.frontier.add_url(link).await;
            }
            self.frontier.mark_complete(&url).await;
            pages_handled += 1;

            tracing::debug!(
                "Worker {} finished {} ({:?} in {:?})",
                self.id,
                url,
                result.outcome,
                result.duration
            );

            self.transition(WorkerState::Idle);
            tokio::time::sleep(self.time_delay).await;
        }

        self.transition(WorkerState::Stopped);
        WorkerReport {
            worker_id: self.id,
            pages_handled,
        }
    }

    fn transition(&mut self, next: WorkerState) {
        tracing::trace!("Worker {}: {} -> {}", self.id, self.state, next);
        self.state = next;
    }
}
