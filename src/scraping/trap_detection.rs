//! Crawl trap detection
//!
//! Detects URL patterns that indicate crawl traps:
//! - Extremely long URLs
//! - Excessive path depth (e.g., /a/b/c/d/e/f/g/h)
//! - Repetitive path patterns (e.g., /a/b/a/b/a/b)
//! - Configured trap segments (e.g., /event/...)
//! - Shallow pagination indices (e.g., /page/3)

use std::fmt;
use url::Url;

use crate::config::ScopeConfig;

/// Configuration for crawl trap detection
#[derive(Debug, Clone)]
pub struct TrapDetectorConfig {
    /// Maximum URL path depth (number of segments)
    pub max_path_depth: usize,
    /// Maximum URL length in characters
    pub max_url_length: usize,
    /// Maximum number of repeated path segments
    pub max_repeated_segments: usize,
    /// Lower-cased path segments that mark a trap
    pub trap_segments: Vec<String>,
    /// Lower-cased segment preceding a page index
    pub pagination_segment: String,
    /// Page indices at or below this are traps
    pub pagination_threshold: u32,
}

impl Default for TrapDetectorConfig {
    fn default() -> Self {
        Self::from_scope(&ScopeConfig::default())
    }
}

impl TrapDetectorConfig {
    pub fn from_scope(scope: &ScopeConfig) -> Self {
        Self {
            max_path_depth: scope.max_path_depth,
            max_url_length: scope.max_url_length,
            max_repeated_segments: scope.max_repeated_segments,
            trap_segments: scope.trap_segments.iter().map(|s| s.to_lowercase()).collect(),
            pagination_segment: scope.pagination_segment.to_lowercase(),
            pagination_threshold: scope.pagination_threshold,
        }
    }
}

/// Why a URL was judged to be a trap
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrapKind {
    TooLong,
    TooDeep,
    Repetitive,
    Segment(String),
    Pagination(u32),
}

impl fmt::Display for TrapKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrapKind::TooLong => write!(f, "URL too long"),
            TrapKind::TooDeep => write!(f, "path too deep"),
            TrapKind::Repetitive => write!(f, "repetitive path"),
            TrapKind::Segment(s) => write!(f, "trap segment '{}'", s),
            TrapKind::Pagination(n) => write!(f, "shallow pagination index {}", n),
        }
    }
}

/// Detect if a URL is likely a crawl trap
pub fn detect_trap(url: &Url, config: &TrapDetectorConfig) -> Option<TrapKind> {
    if url.as_str().len() > config.max_url_length {
        return Some(TrapKind::TooLong);
    }

    let segments: Vec<String> = url
        .path()
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|s| s.to_lowercase())
        .collect();
    let segments: Vec<&str> = segments.iter().map(String::as_str).collect();

    if segments.len() > config.max_path_depth {
        return Some(TrapKind::TooDeep);
    }

    if let Some(segment) = segments
        .iter()
        .find(|s| config.trap_segments.iter().any(|t| t == *s))
    {
        return Some(TrapKind::Segment(segment.to_string()));
    }

    if let Some(index) = shallow_page_index(&segments, config) {
        return Some(TrapKind::Pagination(index));
    }

    if has_repetitive_pattern(&segments, config.max_repeated_segments) {
        return Some(TrapKind::Repetitive);
    }

    None
}

fn shallow_page_index(segments: &[&str], config: &TrapDetectorConfig) -> Option<u32> {
    segments
        .windows(2)
        .filter(|pair| pair[0] == config.pagination_segment)
        .filter_map(|pair| pair[1].parse::<u32>().ok())
        .find(|&index| index <= config.pagination_threshold)
}

fn has_repetitive_pattern(segments: &[&str], max_repeats: usize) -> bool {
    if segments.len() < 4 {
        return false;
    }

    for window_size in 1..=segments.len() / 2 {
        let mut repeat_count = 0;
        for i in 0..segments.len().saturating_sub(window_size) {
            if segments[i] == segments[i + window_size] {
                repeat_count += 1;
                if repeat_count >= max_repeats {
                    return true;
                }
            }
        }
    }

    false
}
