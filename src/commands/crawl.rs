use anyhow::{Context, Result};
use scopecrawl::{
    config::Config,
    scraping::{
        fetcher::FetchConfig, parse_link, Crawler, HttpFetcher, MemoryFrontier, UrlScopeFilter,
    },
};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};
use url::Url;

pub async fn run_crawl(
    mut config: Config,
    seeds: Vec<String>,
    workers: Option<usize>,
    json: bool,
) -> Result<()> {
    if !seeds.is_empty() {
        config.crawler.seeds = seeds;
    }
    if let Some(workers) = workers {
        config.crawler.workers = workers;
    }
    config.validate()?;

    let seeds: Vec<Url> = config
        .crawler
        .seeds
        .iter()
        .map(|s| parse_link(s, None).with_context(|| format!("Invalid seed URL '{}'", s)))
        .collect::<Result<_>>()?;

    if seeds.is_empty() {
        anyhow::bail!("No seed URLs configured");
    }

    let filter = UrlScopeFilter::new(&config.scope);
    for seed in &seeds {
        if !filter.check(seed).is_accepted() {
            warn!("Seed {} is outside the crawl scope; it will still be fetched", seed);
        }
    }

    info!(
        "Seed URLs: {:?}",
        seeds.iter().map(|u| u.as_str()).collect::<Vec<_>>()
    );
    if let Some(cache) = &config.crawler.cache_server {
        info!("Fetching through cache server {}", cache);
    }

    let fetcher = Arc::new(
        HttpFetcher::new(FetchConfig::from_config(&config.crawler))
            .context("Failed to create HTTP client")?,
    );
    let frontier = Arc::new(MemoryFrontier::with_seeds(seeds));

    let crawler = Crawler::new(&config, fetcher.clone(), frontier);
    let summary = crawler.run().await;

    let fetch_stats = fetcher.stats();
    info!(
        "Fetches: {} total, {} successful, {} failed; robots.txt resolved for {} hosts",
        fetch_stats.total_fetches.load(Ordering::Relaxed),
        fetch_stats.successes.load(Ordering::Relaxed),
        fetch_stats.failures.load(Ordering::Relaxed),
        summary.robots_hosts
    );
    info!(
        "Politeness: {} domains, {} admissions, {} backoffs",
        summary.throttle.domains_tracked, summary.throttle.admissions, summary.throttle.backoffs
    );

    if json {
        println!("{}", serde_json::to_string_pretty(&summary.report)?);
    } else {
        print!("{}", summary.report);
    }

    Ok(())
}
