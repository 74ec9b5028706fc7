//! Page processing: link mining, scope filtering, deduplication, and
//! statistics folding for one fetched page

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use url::Url;

use crate::config::{Config, TextDecoding};
use crate::scraping::{
    dedup::{ContentFingerprint, DuplicateIndex},
    defragment,
    extractor::{parse_page, ParsedPage},
    fetcher::FetchResult,
    parse_link,
    stats::CrawlStatistics,
    tokenizer::tokenize,
    CrawlError,
};

use super::{ProcessOutcome, ProcessResult, UrlScopeFilter};

/// Turns fetch results into outbound links and statistics
pub struct PageProcessor {
    filter: Arc<UrlScopeFilter>,
    dedup: Arc<DuplicateIndex>,
    stats: Arc<CrawlStatistics>,
    decoders: Vec<TextDecoding>,
    fingerprint_bits: usize,
}

impl PageProcessor {
    pub fn new(
        config: &Config,
        filter: Arc<UrlScopeFilter>,
        dedup: Arc<DuplicateIndex>,
        stats: Arc<CrawlStatistics>,
    ) -> Self {
        Self {
            filter,
            dedup,
            stats,
            decoders: config.parsing.decoders.clone(),
            fingerprint_bits: config.dedup.fingerprint_bits,
        }
    }

    pub fn stats(&self) -> &Arc<CrawlStatistics> {
        &self.stats
    }

    pub fn dedup(&self) -> &Arc<DuplicateIndex> {
        &self.dedup
    }

    /// Process one fetch result and return the in-scope links it contains.
    ///
    /// Never fails: every error is logged and becomes an empty outcome.
    pub async fn process(&self, url: &Url, result: &FetchResult) -> ProcessResult {
        let start = Instant::now();

        if !result.has_content() {
            let failure = CrawlError::FetchFailure {
                url: url.to_string(),
                status: result.status,
            };
            tracing::debug!("{}", failure);
            self.stats.record_failure();
            return ProcessResult::empty(
                url,
                ProcessOutcome::NoContent {
                    status: result.status,
                },
                start.elapsed(),
            );
        }

        // HTML parsing is CPU-bound, keep it off the async workers
        let owned = result.clone();
        let decoders = self.decoders.clone();
        let parsed = tokio::task::spawn_blocking(move || parse_page(&owned, &decoders))
            .await
            .unwrap_or_else(|e| Err(CrawlError::parse(url.as_str(), e)));

        let page = match parsed {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!("{}", e);
                self.stats.record_failure();
                return ProcessResult::empty(url, ProcessOutcome::ParseFailed, start.elapsed());
            }
        };

        let discovered_urls = self.scoped_links(&page, &result.final_url).await;

        let tokens = tokenize(&page.text);
        let fingerprint =
            ContentFingerprint::from_tokens(&page.text, &tokens, self.fingerprint_bits);
        let status = self.dedup.register_and_check(&fingerprint);
        self.stats.fold_page(url, &discovered_urls, &status, &tokens);

        let outcome = if status.is_duplicate() {
            tracing::debug!("{} is a duplicate ({:?}), statistics skipped", url, status);
            ProcessOutcome::Duplicate(status)
        } else {
            ProcessOutcome::Processed {
                tokens: tokens.len(),
            }
        };

        tracing::debug!(
            "Processed {} - {} tokens, {} in-scope links",
            url,
            tokens.len(),
            discovered_urls.len()
        );

        ProcessResult {
            url: url.clone(),
            outcome,
            discovered_urls,
            duration: start.elapsed(),
        }
    }

    async fn scoped_links(&self, page: &ParsedPage, base: &Url) -> Vec<Url> {
        let mut seen = HashSet::new();
        let mut links = Vec::new();

        for raw in &page.links {
            // Fragment-only links point back at the page itself
            if defragment(raw.trim()).is_empty() {
                continue;
            }

            let link = match parse_link(raw, Some(base)) {
                Ok(link) => link,
                Err(e) => {
                    tracing::warn!("Skipping link on {}: {}", base, e);
                    continue;
                }
            };

            if !seen.insert(link.as_str().to_string()) {
                continue;
            }

            let decision = self.filter.evaluate(&link).await;
            if decision.is_accepted() {
                links.push(link);
            } else {
                tracing::trace!("Out of scope {}: {:?}", link, decision);
            }
        }

        links
    }
}
