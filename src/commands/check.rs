use anyhow::Result;
use scopecrawl::{
    config::Config,
    scraping::{parse_link, ScopeDecision, UrlScopeFilter},
};

/// Print the offline scope decision for each URL
pub fn check_urls(config: &Config, urls: &[String]) -> Result<()> {
    let filter = UrlScopeFilter::new(&config.scope);

    for raw in urls {
        match parse_link(raw, None) {
            Ok(url) => match filter.check(&url) {
                ScopeDecision::Accepted => println!("accept  {}", url),
                ScopeDecision::Rejected(reason) => println!("reject  {}  ({})", url, reason),
            },
            Err(e) => println!("error   {}", e),
        }
    }

    Ok(())
}
