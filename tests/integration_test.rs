//! Integration tests for scopecrawl
//!
//! These drive the full worker pool against a scripted in-process fetcher and
//! the in-memory frontier. No network access.

use async_trait::async_trait;
use parking_lot::Mutex;
use scopecrawl::{
    config::Config,
    scraping::{
        dedup::{ContentFingerprint, DuplicateIndex, DuplicateStatus},
        tokenizer::tokenize,
        CrawlSummary, Crawler, FetchResult, Fetcher, MemoryFrontier, ScopeDecision,
        UrlScopeFilter,
    },
};
use std::collections::HashMap;
use std::sync::Arc;
use url::Url;

/// Serves scripted pages; unknown URLs (robots.txt included) are 404
#[derive(Default)]
struct ScriptedFetcher {
    pages: HashMap<String, String>,
    fetched: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    fn page(mut self, url: &str, body: impl Into<String>) -> Self {
        self.pages.insert(url.to_string(), body.into());
        self
    }

    fn was_fetched(&self, url: &str) -> bool {
        self.fetched.lock().iter().any(|u| u == url)
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, url: &Url) -> FetchResult {
        self.fetched.lock().push(url.to_string());
        match self.pages.get(url.as_str()) {
            Some(body) => FetchResult::ok(url.clone(), body.clone()),
            None => FetchResult::failed(url, 404),
        }
    }
}

fn config(workers: usize) -> Config {
    let mut config = Config::default();
    config.crawler.workers = workers;
    config.crawler.time_delay_ms = 0;
    config
}

async fn crawl(fetcher: Arc<ScriptedFetcher>, seed: &str, workers: usize) -> (Crawler, CrawlSummary) {
    let frontier = Arc::new(MemoryFrontier::with_seeds([Url::parse(seed).unwrap()]));
    let crawler = Crawler::new(&config(workers), fetcher, frontier);
    let summary = crawler.run().await;
    (crawler, summary)
}

/// 41 distinct tokens repeated ten times
fn heavy_paragraph() -> String {
    let words: Vec<String> = (0..41).map(|i| format!("term{}", i)).collect();
    vec![words.join(" "); 10].join(" ")
}

#[tokio::test]
async fn test_same_body_under_two_urls_counted_once() {
    let fetcher = Arc::new(
        ScriptedFetcher::default()
            .page(
                "https://www.ics.uci.edu/",
                r#"<p>department home</p><a href="/a">first</a><a href="/b">second</a>"#,
            )
            .page("https://www.ics.uci.edu/a", "<p>mirrored lecture notes</p>")
            .page("https://www.ics.uci.edu/b", "<p>mirrored lecture notes</p>"),
    );

    let (crawler, summary) = crawl(fetcher, "https://www.ics.uci.edu/", 1).await;

    assert_eq!(summary.report.exact_duplicates, 1);
    assert_eq!(summary.report.near_duplicates, 0);
    assert_eq!(crawler.stats().word_count("mirrored"), 1);
    assert_eq!(crawler.stats().word_count("lecture"), 1);
    // Home page and one of the mirrors; the duplicate adds no subdomain tally
    assert_eq!(crawler.stats().subdomain_count("https://www.ics.uci.edu"), 2);
}

#[tokio::test]
async fn test_timestamp_footer_is_near_duplicate() {
    let paragraph = heavy_paragraph();
    let fetcher = Arc::new(
        ScriptedFetcher::default()
            .page(
                "https://www.cs.uci.edu/",
                r#"<p>computing news index</p><a href="/v1">v1</a><a href="/v2">v2</a>"#,
            )
            .page("https://www.cs.uci.edu/v1", format!("<p>{}</p>", paragraph))
            .page(
                "https://www.cs.uci.edu/v2",
                format!("<p>{}</p><footer>Last updated 2024-01-15 10:30</footer>", paragraph),
            ),
    );

    let (crawler, summary) = crawl(fetcher, "https://www.cs.uci.edu/", 1).await;

    assert_eq!(summary.report.near_duplicates, 1);
    assert_eq!(summary.report.exact_duplicates, 0);
    assert_eq!(crawler.stats().word_count("term7"), 10);
}

#[tokio::test]
async fn test_robots_disallow_is_respected() {
    let fetcher = Arc::new(
        ScriptedFetcher::default()
            .page(
                "https://www.ics.uci.edu/robots.txt",
                "User-agent: *\nDisallow: /private\n",
            )
            .page(
                "https://www.ics.uci.edu/",
                r#"<a href="/private/grades">grades</a><a href="/public">public</a>"#,
            )
            .page("https://www.ics.uci.edu/public", "<p>open to everyone</p>"),
    );

    let (_, summary) = crawl(fetcher.clone(), "https://www.ics.uci.edu/", 2).await;

    assert!(fetcher.was_fetched("https://www.ics.uci.edu/public"));
    assert!(!fetcher.was_fetched("https://www.ics.uci.edu/private/grades"));
    assert_eq!(summary.report.unique_pages, 1);
    assert_eq!(summary.robots_hosts, 1);
}

#[tokio::test]
async fn test_traps_and_blocked_links_never_fetched() {
    let home = r#"
        <a href="/news?share=facebook">share</a>
        <a href="/event/2020-open-house">event</a>
        <a href="/events/page/2">recent</a>
        <a href="/events/page/7">older</a>
        <a href="/slides/intro.pdf">slides</a>
        <a href="https://www.example.com/">elsewhere</a>
        <a href="mailto:office@ics.uci.edu">mail</a>
    "#;
    let fetcher = Arc::new(
        ScriptedFetcher::default()
            .page("https://www.ics.uci.edu/", home)
            .page("https://www.ics.uci.edu/events/page/7", "<p>archived events</p>"),
    );

    let (_, summary) = crawl(fetcher.clone(), "https://www.ics.uci.edu/", 3).await;

    let fetched = fetcher.fetched.lock().clone();
    assert_eq!(
        fetched
            .iter()
            .filter(|u| !u.ends_with("/robots.txt"))
            .cloned()
            .collect::<Vec<_>>(),
        vec![
            "https://www.ics.uci.edu/".to_string(),
            "https://www.ics.uci.edu/events/page/7".to_string(),
        ]
    );
    assert_eq!(summary.report.unique_pages, 1);
}

#[tokio::test]
async fn test_longest_page_matches_its_token_count() {
    let long_body = "<p>one two three four five six seven eight nine ten</p>";
    let fetcher = Arc::new(
        ScriptedFetcher::default()
            .page(
                "https://www.stat.uci.edu/",
                r#"<p>statistics</p><a href="/long">x</a><a href="/short">y</a>"#,
            )
            .page("https://www.stat.uci.edu/long", long_body)
            .page("https://www.stat.uci.edu/short", "<p>brief note</p>"),
    );

    let (crawler, summary) = crawl(fetcher, "https://www.stat.uci.edu/", 2).await;

    let longest = summary.report.longest_page.expect("pages were processed");
    assert_eq!(longest.url, "https://www.stat.uci.edu/long");
    assert_eq!(longest.word_count, tokenize("one two three four five six seven eight nine ten").len());
    assert_eq!(crawler.stats().max_word().0, longest.word_count);
    // stat.uci.edu is not under the primary domain
    assert!(summary.report.subdomains.is_empty());
}

#[tokio::test]
async fn test_share_query_rejected_by_scope_filter() {
    let filter = UrlScopeFilter::new(&Config::default().scope);
    let url = Url::parse("https://www.ics.uci.edu/page?share=1").unwrap();
    assert!(!filter.check(&url).is_accepted());
    assert!(!filter.evaluate(&url).await.is_accepted());

    let ok = Url::parse("https://x.ics.uci.edu/events/page/9").unwrap();
    assert_eq!(filter.check(&ok), ScopeDecision::Accepted);
}

#[tokio::test]
async fn test_concurrent_registration_loses_nothing() {
    let index = Arc::new(DuplicateIndex::new(256, 0.95));

    let handles: Vec<_> = (0..32)
        .map(|i| {
            let index = Arc::clone(&index);
            tokio::spawn(async move {
                // Distinct checksums; zero weights give identical all-zero simhashes
                let text = "x".repeat(i + 1);
                let fingerprint = ContentFingerprint::from_tokens(&text, &[], 256);
                index.register_and_check(&fingerprint)
            })
        })
        .collect();

    let mut unique = 0;
    let mut near = 0;
    for handle in handles {
        match handle.await.unwrap() {
            DuplicateStatus::Unique => unique += 1,
            DuplicateStatus::Near { distance } => {
                assert_eq!(distance, 0);
                near += 1;
            }
            DuplicateStatus::Exact => panic!("checksums are distinct"),
        }
    }

    assert_eq!(unique, 1);
    assert_eq!(near, 31);
    assert_eq!(index.checksum_count(), 32);
    assert_eq!(index.fingerprint_count(), 1);
}
