//! Configuration for scopecrawl

mod logging;
mod scope;
mod scraping;

pub use logging::{LogFormat, LogLevel, LoggingConfig};
pub use scope::ScopeConfig;
pub use scraping::{CrawlerConfig, DedupConfig, ParsingConfig, TextDecoding};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::scraping::dedup::MAX_FINGERPRINT_BITS;

/// Default user agent for all HTTP requests (pages and robots.txt)
pub const DEFAULT_USER_AGENT: &str = "scopecrawl/0.1 (+polite research crawler)";

/// Main configuration, loaded once at startup
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Worker pool and politeness
    #[serde(default)]
    pub crawler: CrawlerConfig,
    /// URL scope filter
    #[serde(default)]
    pub scope: ScopeConfig,
    /// Content deduplication
    #[serde(default)]
    pub dedup: DedupConfig,
    /// Page parsing
    #[serde(default)]
    pub parsing: ParsingConfig,
    /// Logging
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file and validate it.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path.display(), e))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config file '{}': {}", path.display(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate all configuration fields.
    ///
    /// Collects all validation errors and reports them together.
    pub fn validate(&self) -> Result<()> {
        let mut errors: Vec<String> = Vec::new();

        // Crawler validation
        if self.crawler.workers == 0 {
            errors.push("workers must be positive".to_string());
        }
        if self.crawler.per_domain_concurrency == 0 {
            errors.push("per_domain_concurrency must be positive".to_string());
        }
        if self.crawler.user_agent.trim().is_empty() {
            errors.push("user_agent must not be empty".to_string());
        }
        if self.crawler.max_content_size == 0 {
            errors.push("max_content_size must be positive".to_string());
        }
        if let Some(cache) = &self.crawler.cache_server {
            if url::Url::parse(cache).is_err() {
                errors.push(format!("cache_server '{}' is not a valid URL", cache));
            }
        }

        // Scope validation
        if self.scope.allowed_domains.is_empty() {
            errors.push("allowed_domains must list at least one domain".to_string());
        }
        if self.scope.primary_domain.trim().is_empty() {
            errors.push("primary_domain must not be empty".to_string());
        }
        if self.scope.pagination_segment.contains('/') {
            errors.push("pagination_segment must be a single path segment".to_string());
        }

        // Dedup validation
        if self.dedup.fingerprint_bits == 0 || self.dedup.fingerprint_bits > MAX_FINGERPRINT_BITS {
            errors.push(format!(
                "fingerprint_bits must be between 1 and {}",
                MAX_FINGERPRINT_BITS
            ));
        }
        if self.dedup.similarity_threshold <= 0.0 || self.dedup.similarity_threshold > 1.0 {
            errors.push("similarity_threshold must be between 0.0 (exclusive) and 1.0".to_string());
        }

        // Parsing validation
        if self.parsing.decoders.is_empty() {
            errors.push("decoders must list at least one text decoding".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            anyhow::bail!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn valid_config() -> Config {
        Config::default()
    }

    #[test]
    fn default_config_passes_validation() {
        assert!(valid_config().validate().is_ok(), "default config should be valid");
    }

    #[test]
    fn validate_rejects_zero_workers() {
        let mut cfg = valid_config();
        cfg.crawler.workers = 0;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("workers must be positive"));
    }

    #[test]
    fn validate_rejects_zero_domain_concurrency() {
        let mut cfg = valid_config();
        cfg.crawler.per_domain_concurrency = 0;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("per_domain_concurrency must be positive"));
    }

    #[test]
    fn validate_rejects_oversized_fingerprint() {
        let mut cfg = valid_config();
        cfg.dedup.fingerprint_bits = 512;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("fingerprint_bits must be between 1 and 256"));
    }

    #[test]
    fn validate_rejects_similarity_out_of_range() {
        let mut cfg = valid_config();
        cfg.dedup.similarity_threshold = 1.5;
        assert!(cfg.validate().is_err());

        cfg.dedup.similarity_threshold = 0.0;
        assert!(cfg.validate().is_err());

        cfg.dedup.similarity_threshold = 1.0;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_scope_and_decoders() {
        let mut cfg = valid_config();
        cfg.scope.allowed_domains.clear();
        cfg.parsing.decoders.clear();
        let msg = cfg.validate().unwrap_err().to_string();
        assert!(msg.contains("allowed_domains must list at least one domain"));
        assert!(msg.contains("decoders must list at least one text decoding"));
    }

    #[test]
    fn validate_rejects_bad_cache_server() {
        let mut cfg = valid_config();
        cfg.crawler.cache_server = Some("not a url".to_string());
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("cache_server"));
    }

    #[test]
    fn load_partial_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[crawler]
workers = 8
time_delay_ms = 250

[dedup]
similarity_threshold = 0.9

[parsing]
decoders = ["utf8"]
"#
        )
        .unwrap();

        let cfg = Config::load(file.path()).unwrap();
        assert_eq!(cfg.crawler.workers, 8);
        assert_eq!(cfg.crawler.time_delay_ms, 250);
        assert_eq!(cfg.crawler.per_domain_concurrency, 2);
        assert_eq!(cfg.dedup.fingerprint_bits, 256);
        assert!((cfg.dedup.similarity_threshold - 0.9).abs() < f64::EPSILON);
        assert_eq!(cfg.parsing.decoders, vec![TextDecoding::Utf8]);
        assert_eq!(cfg.scope.pagination_threshold, 5);
    }

    #[test]
    fn load_reports_invalid_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[crawler]\nworkers = 0").unwrap();

        let err = Config::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("workers must be positive"));
    }

    #[test]
    fn default_config_round_trips_through_toml() {
        let text = toml::to_string_pretty(&Config::default()).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.scope.allowed_domains, Config::default().scope.allowed_domains);
    }
}
