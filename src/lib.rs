//! scopecrawl: a scoped, polite, deduplicating web crawler
//!
//! Workers pull URLs from a frontier, fetch them under per-domain politeness
//! limits, keep only links inside an allow-listed set of domains, and fold
//! page text into crawl statistics unless the page is an exact or near
//! duplicate of something already seen.
//!
//! - `config`: TOML configuration and validation
//! - `scraping`: scope filter, robots cache, fingerprinting, duplicate index,
//!   page processor, politeness throttle, and the worker pool

pub mod config;
pub mod scraping;

pub use config::Config;
