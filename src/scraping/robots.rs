//! robots.txt policies
//!
//! Each host's robots.txt is fetched once, on first reference, and the parsed
//! policy is kept for the rest of the run. A failed or non-2xx fetch settles on
//! the permissive (allow-all) policy.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::OnceCell;
use url::Url;

use super::error::CrawlError;
use super::fetcher::Fetcher;

/// Parsed robots.txt rules for our user agent
#[derive(Debug, Clone, Default)]
pub struct RobotsPolicy {
    /// Parsed disallow patterns for our user agent
    disallow_patterns: Vec<String>,
    /// Parsed allow patterns for our user agent
    allow_patterns: Vec<String>,
}

impl RobotsPolicy {
    /// Parse robots.txt content for the given user agent
    pub fn parse(content: &str, user_agent: &str) -> Self {
        let mut disallow = Vec::new();
        let mut allow = Vec::new();

        let ua_lower = user_agent.to_lowercase();
        let mut current_agent_applies = false;
        let mut found_specific_agent = false;

        for line in content.lines() {
            // Strip trailing comments
            let line = line.split('#').next().unwrap_or_default().trim();
            if line.is_empty() {
                continue;
            }

            if let Some((directive, value)) = line.split_once(':') {
                let directive = directive.trim().to_lowercase();
                let value = value.trim();

                match directive.as_str() {
                    "user-agent" => {
                        let agent = value.to_lowercase();
                        if agent == "*" {
                            // Wildcard matches if we haven't found a specific match
                            current_agent_applies = !found_specific_agent;
                        } else if !agent.is_empty() && ua_lower.contains(&agent) {
                            if !found_specific_agent {
                                // Specific rules replace anything collected for `*`
                                disallow.clear();
                                allow.clear();
                            }
                            current_agent_applies = true;
                            found_specific_agent = true;
                        } else {
                            current_agent_applies = false;
                        }
                    }
                    "disallow" if current_agent_applies => {
                        if !value.is_empty() {
                            disallow.push(value.to_string());
                        }
                    }
                    "allow" if current_agent_applies => {
                        if !value.is_empty() {
                            allow.push(value.to_string());
                        }
                    }
                    _ => {}
                }
            }
        }

        Self {
            disallow_patterns: disallow,
            allow_patterns: allow,
        }
    }

    /// A policy that allows everything
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Check if a path is allowed. Longest match wins; allow wins ties.
    pub fn is_allowed(&self, path: &str) -> bool {
        let longest = |patterns: &[String]| {
            patterns
                .iter()
                .filter(|p| Self::path_matches(path, p))
                .map(|p| p.len())
                .max()
                .unwrap_or(0)
        };

        longest(&self.allow_patterns) >= longest(&self.disallow_patterns)
    }

    /// Check a full URL (path plus query) against the policy
    pub fn can_fetch(&self, url: &Url) -> bool {
        match url.query() {
            Some(query) => self.is_allowed(&format!("{}?{}", url.path(), query)),
            None => self.is_allowed(url.path()),
        }
    }

    /// Check if a path matches a robots.txt pattern
    fn path_matches(path: &str, pattern: &str) -> bool {
        if pattern.is_empty() {
            return false;
        }

        let (pattern, must_end_match) = match pattern.strip_suffix('$') {
            Some(stripped) => (stripped, true),
            None => (pattern, false),
        };

        if pattern.contains('*') {
            let parts: Vec<&str> = pattern.split('*').collect();
            let last = parts.len() - 1;
            let mut pos = 0;

            for (i, part) in parts.iter().enumerate() {
                if part.is_empty() {
                    continue;
                }

                // An anchored final literal has to be the path's suffix
                let found = if i == last && must_end_match {
                    path[pos..].rfind(part)
                } else {
                    path[pos..].find(part)
                };

                match found {
                    Some(found_pos) => {
                        if i == 0 && found_pos != 0 {
                            // First part must match at start
                            return false;
                        }
                        pos += found_pos + part.len();
                    }
                    None => return false,
                }
            }

            if must_end_match {
                return pattern.ends_with('*') || pos == path.len();
            }

            return true;
        }

        if must_end_match {
            return path == pattern;
        }

        path.starts_with(pattern)
    }
}

/// Per-host, lazily populated robots.txt cache
///
/// Concurrent first references to the same host share one fetch. Entries are
/// never invalidated within a run.
pub struct RobotsCache {
    policies: DashMap<String, Arc<OnceCell<RobotsPolicy>>>,
    fetcher: Arc<dyn Fetcher>,
    user_agent: String,
}

impl RobotsCache {
    pub fn new(fetcher: Arc<dyn Fetcher>, user_agent: impl Into<String>) -> Self {
        Self {
            policies: DashMap::new(),
            fetcher,
            user_agent: user_agent.into(),
        }
    }

    /// Whether `url` may be fetched under its host's robots.txt
    pub async fn can_fetch(&self, url: &Url) -> bool {
        match url.host_str() {
            Some(host) => self.policy(host).await.can_fetch(url),
            None => false,
        }
    }

    /// Get (fetching on first use) the policy for a host
    pub async fn policy(&self, host: &str) -> RobotsPolicy {
        // Clone the cell out so the map shard lock is not held across the fetch
        let cell = self
            .policies
            .entry(host.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();

        cell.get_or_init(|| async {
            match self.fetch_policy(host).await {
                Ok(policy) => policy,
                Err(e) => {
                    tracing::warn!("{}; falling back to allow-all", e);
                    RobotsPolicy::allow_all()
                }
            }
        })
        .await
        .clone()
    }

    /// Number of hosts with a settled policy
    pub fn len(&self) -> usize {
        self.policies.iter().filter(|e| e.value().initialized()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    async fn fetch_policy(&self, host: &str) -> Result<RobotsPolicy, CrawlError> {
        let failure = |reason: String| CrawlError::RobotsFetchFailure {
            host: host.to_string(),
            reason,
        };

        let robots_url = Url::parse(&format!("https://{}/robots.txt", host))
            .map_err(|e| failure(e.to_string()))?;

        tracing::debug!("Fetching {}", robots_url);
        let response = self.fetcher.fetch(&robots_url).await;

        if !(200..300).contains(&response.status) {
            return Err(failure(format!("status {}", response.status)));
        }

        let body = response.body.unwrap_or_default();
        let content = String::from_utf8(body).map_err(|e| failure(e.to_string()))?;

        Ok(RobotsPolicy::parse(&content, &self.user_agent))
    }
}
