//! Crawl statistics aggregation
//!
//! [`CrawlStatistics`] is the single shared aggregate every worker folds into.
//! Each public method is one atomic fold: it takes the lock once and performs
//! its whole read-modify-write under it.

use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use url::Url;

use super::dedup::DuplicateStatus;
use super::tokenizer::is_stop_word;

/// Number of words listed in the default report
pub const DEFAULT_TOP_WORDS: usize = 50;

#[derive(Debug, Default)]
struct StatsState {
    /// Insertion-ordered so ties keep first-seen order
    word_frequency: IndexMap<String, u64>,
    max_word_count: usize,
    max_word_url: Option<String>,
    subdomain_counts: HashMap<String, u64>,
    unique_pages: HashSet<String>,
    pages_processed: u64,
    exact_duplicates: u64,
    near_duplicates: u64,
    failed_pages: u64,
}

impl StatsState {
    fn fold_tokens(&mut self, url: &Url, tokens: &[String], subdomain: Option<String>) {
        if tokens.len() > self.max_word_count {
            self.max_word_count = tokens.len();
            self.max_word_url = Some(url.as_str().to_string());
        }

        for token in tokens.iter().filter(|t| !is_stop_word(t.as_str())) {
            *self.word_frequency.entry(token.clone()).or_insert(0) += 1;
        }

        if let Some(key) = subdomain {
            *self.subdomain_counts.entry(key).or_insert(0) += 1;
        }
    }
}

/// Process-wide crawl statistics
#[derive(Debug)]
pub struct CrawlStatistics {
    primary_domain: String,
    state: Mutex<StatsState>,
}

impl CrawlStatistics {
    /// Create statistics tracking subdomains of `primary_domain`
    pub fn new(primary_domain: impl Into<String>) -> Self {
        Self {
            primary_domain: primary_domain.into().trim_start_matches('.').to_lowercase(),
            state: Mutex::new(StatsState::default()),
        }
    }

    /// Fold one parsed page in a single transaction.
    ///
    /// The page's in-scope links join the unique-page set. A duplicate only
    /// bumps its counter; a unique page contributes its tokens, longest-page
    /// candidacy and subdomain. Returns how many links were new.
    pub fn fold_page(
        &self,
        url: &Url,
        links: &[Url],
        status: &DuplicateStatus,
        tokens: &[String],
    ) -> usize {
        let subdomain = self.subdomain_key(url);

        let mut state = self.state.lock();
        let new_links = links
            .iter()
            .filter(|link| state.unique_pages.insert(link.as_str().to_string()))
            .count();

        state.pages_processed += 1;
        match status {
            DuplicateStatus::Exact => state.exact_duplicates += 1,
            DuplicateStatus::Near { .. } => state.near_duplicates += 1,
            DuplicateStatus::Unique => state.fold_tokens(url, tokens, subdomain),
        }

        new_links
    }

    /// Count a page that yielded no content
    pub fn record_failure(&self) {
        self.state.lock().failed_pages += 1;
    }

    pub fn unique_page_count(&self) -> usize {
        self.state.lock().unique_pages.len()
    }

    /// Largest token count seen so far and the page it came from
    pub fn max_word(&self) -> (usize, Option<String>) {
        let state = self.state.lock();
        (state.max_word_count, state.max_word_url.clone())
    }

    /// Frequency of one word
    pub fn word_count(&self, word: &str) -> u64 {
        self.state.lock().word_frequency.get(word).copied().unwrap_or(0)
    }

    /// Pages counted for one `scheme://host` subdomain key
    pub fn subdomain_count(&self, key: &str) -> u64 {
        self.state.lock().subdomain_counts.get(key).copied().unwrap_or(0)
    }

    /// Total exact and near duplicates
    pub fn duplicate_count(&self) -> u64 {
        let state = self.state.lock();
        state.exact_duplicates + state.near_duplicates
    }

    /// Consistent snapshot of the statistics
    pub fn report(&self, top_n: usize) -> CrawlReport {
        let state = self.state.lock();

        let mut words: Vec<(&String, &u64)> = state.word_frequency.iter().collect();
        // Stable: equal counts stay in first-seen order
        words.sort_by(|a, b| b.1.cmp(a.1));
        let top_words = words
            .into_iter()
            .take(top_n)
            .map(|(word, &count)| WordCount {
                word: word.clone(),
                count,
            })
            .collect();

        let subdomains: BTreeMap<&String, &u64> = state.subdomain_counts.iter().collect();

        CrawlReport {
            unique_pages: state.unique_pages.len(),
            top_words,
            longest_page: state.max_word_url.as_ref().map(|url| LongestPage {
                url: url.clone(),
                word_count: state.max_word_count,
            }),
            subdomains: subdomains
                .into_iter()
                .map(|(subdomain, &pages)| SubdomainCount {
                    subdomain: subdomain.clone(),
                    pages,
                })
                .collect(),
            pages_processed: state.pages_processed,
            exact_duplicates: state.exact_duplicates,
            near_duplicates: state.near_duplicates,
            duplicate_pages: state.exact_duplicates + state.near_duplicates,
            failed_pages: state.failed_pages,
        }
    }

    /// `scheme://host` if the host is a subdomain of the primary domain
    fn subdomain_key(&self, url: &Url) -> Option<String> {
        let host = url.host_str()?.to_lowercase();
        let under_primary = host
            .strip_suffix(self.primary_domain.as_str())
            .is_some_and(|prefix| prefix.ends_with('.'));
        under_primary.then(|| format!("{}://{}", url.scheme(), host))
    }
}

/// A word and its frequency
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WordCount {
    pub word: String,
    pub count: u64,
}

/// Page with the most tokens
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LongestPage {
    pub url: String,
    pub word_count: usize,
}

/// Pages crawled under one subdomain
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubdomainCount {
    pub subdomain: String,
    pub pages: u64,
}

/// Final crawl report
#[derive(Debug, Clone, Serialize)]
pub struct CrawlReport {
    pub unique_pages: usize,
    pub top_words: Vec<WordCount>,
    pub longest_page: Option<LongestPage>,
    pub subdomains: Vec<SubdomainCount>,
    pub pages_processed: u64,
    pub exact_duplicates: u64,
    pub near_duplicates: u64,
    pub duplicate_pages: u64,
    pub failed_pages: u64,
}

impl fmt::Display for CrawlReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Unique pages found: {}", self.unique_pages)?;
        match &self.longest_page {
            Some(page) => writeln!(f, "Longest page: {} ({} words)", page.url, page.word_count)?,
            None => writeln!(f, "Longest page: none")?,
        }
        writeln!(
            f,
            "Pages processed: {} ({} failed)",
            self.pages_processed, self.failed_pages
        )?;
        writeln!(
            f,
            "Duplicate pages: {} ({} exact, {} near)",
            self.duplicate_pages, self.exact_duplicates, self.near_duplicates
        )?;

        writeln!(f, "\nTop {} words:", self.top_words.len())?;
        for (rank, entry) in self.top_words.iter().enumerate() {
            writeln!(f, "  {:>2}. {:<20} {}", rank + 1, entry.word, entry.count)?;
        }

        writeln!(f, "\nSubdomains ({}):", self.subdomains.len())?;
        for entry in &self.subdomains {
            writeln!(f, "  {}, {}", entry.subdomain, entry.pages)?;
        }
        Ok(())
    }
}
