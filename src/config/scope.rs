//! Crawl scope configuration: which URLs are eligible at all

use serde::{Deserialize, Serialize};

/// URL scope configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScopeConfig {
    /// Domains whose direct subdomains may be crawled (matched against the host minus its first label)
    pub allowed_domains: Vec<String>,
    /// Domain whose subdomains are tallied in the report
    pub primary_domain: String,
    /// File extensions that are never crawled (case-insensitive, without the dot)
    pub blocked_extensions: Vec<String>,
    /// Query keys that mark share/action URLs
    pub blocked_query_keys: Vec<String>,
    /// Path segments that mark trap pages (exact, case-insensitive)
    pub trap_segments: Vec<String>,
    /// Path segment introducing a page index
    pub pagination_segment: String,
    /// Page indices at or below this value are rejected
    pub pagination_threshold: u32,
    /// Maximum URL length in characters
    pub max_url_length: usize,
    /// Maximum URL path depth (number of segments)
    pub max_path_depth: usize,
    /// Maximum number of repeated path segments
    pub max_repeated_segments: usize,
}

impl Default for ScopeConfig {
    fn default() -> Self {
        Self {
            allowed_domains: vec![
                "ics.uci.edu".to_string(),
                "cs.uci.edu".to_string(),
                "informatics.uci.edu".to_string(),
                "stat.uci.edu".to_string(),
            ],
            primary_domain: "ics.uci.edu".to_string(),
            blocked_extensions: default_blocked_extensions(),
            blocked_query_keys: vec![
                "share".to_string(),
                "action".to_string(),
                "do".to_string(),
                "replytocom".to_string(),
                "ical".to_string(),
            ],
            trap_segments: vec!["event".to_string()],
            pagination_segment: "page".to_string(),
            pagination_threshold: 5,
            max_url_length: 2048,
            max_path_depth: 15,
            max_repeated_segments: 3,
        }
    }
}

fn default_blocked_extensions() -> Vec<String> {
    [
        "css", "js", "bmp", "gif", "jpg", "jpeg", "ico", "png", "tif", "tiff", "mid", "mp2",
        "mp3", "mp4", "wav", "avi", "mov", "mpeg", "ram", "m4v", "mkv", "ogg", "ogv", "pdf",
        "ps", "eps", "tex", "ppt", "pptx", "doc", "docx", "xls", "xlsx", "names", "data", "dat",
        "exe", "bz2", "tar", "msi", "bin", "7z", "psd", "dmg", "iso", "epub", "dll", "cnf",
        "tgz", "sha1", "thmx", "mso", "arff", "rtf", "jar", "csv", "rm", "smil", "wmv", "swf",
        "wma", "zip", "rar", "gz",
    ]
    .iter()
    .map(|ext| ext.to_string())
    .collect()
}
