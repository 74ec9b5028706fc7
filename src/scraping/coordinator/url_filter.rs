//! URL scope filtering based on scheme, domain allow-list, blocked
//! extensions and query keys, crawl trap detection, and robots.txt

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use url::Url;

use crate::config::ScopeConfig;
use crate::scraping::{
    parse_link,
    robots::RobotsCache,
    trap_detection::{detect_trap, TrapDetectorConfig, TrapKind},
    CrawlError,
};

/// Reason a URL is out of scope
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    Scheme(String),
    NoHost,
    NoRegistrableSuffix,
    DomainNotAllowed(String),
    BlockedExtension(String),
    BlockedQuery(String),
    Trap(TrapKind),
    Robots,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::Scheme(s) => write!(f, "scheme '{}' not crawled", s),
            Rejection::NoHost => write!(f, "no host"),
            Rejection::NoRegistrableSuffix => write!(f, "host has no registrable suffix"),
            Rejection::DomainNotAllowed(d) => write!(f, "domain '{}' not allowed", d),
            Rejection::BlockedExtension(e) => write!(f, "blocked extension '.{}'", e),
            Rejection::BlockedQuery(k) => write!(f, "blocked query key '{}'", k),
            Rejection::Trap(kind) => write!(f, "crawl trap: {}", kind),
            Rejection::Robots => write!(f, "disallowed by robots.txt"),
        }
    }
}

/// Scope decision for one URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeDecision {
    Accepted,
    Rejected(Rejection),
}

impl ScopeDecision {
    pub fn is_accepted(&self) -> bool {
        matches!(self, ScopeDecision::Accepted)
    }
}

/// Decides which URLs are eligible for crawling
pub struct UrlScopeFilter {
    allowed_domains: HashSet<String>,
    blocked_extensions: HashSet<String>,
    blocked_query_keys: HashSet<String>,
    trap_detector: TrapDetectorConfig,
    robots: Option<Arc<RobotsCache>>,
}

impl UrlScopeFilter {
    /// Create a filter without robots.txt checks
    pub fn new(config: &ScopeConfig) -> Self {
        let lower = |items: &[String]| -> HashSet<String> {
            items
                .iter()
                .map(|s| s.trim_start_matches('.').to_lowercase())
                .collect()
        };

        Self {
            allowed_domains: lower(&config.allowed_domains),
            blocked_extensions: lower(&config.blocked_extensions),
            blocked_query_keys: lower(&config.blocked_query_keys),
            trap_detector: TrapDetectorConfig::from_scope(config),
            robots: None,
        }
    }

    /// Also require robots.txt permission
    pub fn with_robots(mut self, robots: Arc<RobotsCache>) -> Self {
        self.robots = Some(robots);
        self
    }

    /// All checks that need no network access, first failure wins
    pub fn check(&self, url: &Url) -> ScopeDecision {
        match self.first_rejection(url) {
            Some(rejection) => ScopeDecision::Rejected(rejection),
            None => ScopeDecision::Accepted,
        }
    }

    /// Full decision including robots.txt
    pub async fn evaluate(&self, url: &Url) -> ScopeDecision {
        let decision = self.check(url);
        if !decision.is_accepted() {
            return decision;
        }

        if let Some(robots) = &self.robots {
            if !robots.can_fetch(url).await {
                return ScopeDecision::Rejected(Rejection::Robots);
            }
        }

        ScopeDecision::Accepted
    }

    /// Parse and evaluate a raw link; unparsable input is a `MalformedUrl` error
    pub async fn is_in_scope(&self, link: &str) -> Result<bool, CrawlError> {
        let url = parse_link(link, None)?;
        Ok(self.evaluate(&url).await.is_accepted())
    }

    fn first_rejection(&self, url: &Url) -> Option<Rejection> {
        let scheme = url.scheme();
        if scheme != "http" && scheme != "https" {
            return Some(Rejection::Scheme(scheme.to_string()));
        }

        let host = match url.host_str() {
            Some(host) if !host.is_empty() => host.to_lowercase(),
            _ => return Some(Rejection::NoHost),
        };

        let suffix = match host.split_once('.') {
            Some((_, suffix)) if !suffix.is_empty() => suffix,
            _ => return Some(Rejection::NoRegistrableSuffix),
        };
        if !self.allowed_domains.contains(suffix) {
            return Some(Rejection::DomainNotAllowed(suffix.to_string()));
        }

        if let Some(ext) = self.blocked_extension(url) {
            return Some(Rejection::BlockedExtension(ext));
        }

        if let Some(key) = url
            .query_pairs()
            .map(|(key, _)| key.to_lowercase())
            .find(|key| self.blocked_query_keys.contains(key))
        {
            return Some(Rejection::BlockedQuery(key));
        }

        detect_trap(url, &self.trap_detector).map(Rejection::Trap)
    }

    fn blocked_extension(&self, url: &Url) -> Option<String> {
        let path = urlencoding::decode(url.path())
            .map(|p| p.into_owned())
            .unwrap_or_else(|_| url.path().to_string())
            .to_lowercase();

        let file_name = path.rsplit('/').next().unwrap_or_default();
        let (_, ext) = file_name.rsplit_once('.')?;
        self.blocked_extensions
            .contains(ext)
            .then(|| ext.to_string())
    }
}
