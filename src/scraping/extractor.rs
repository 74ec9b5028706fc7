//! Link and text extraction from fetched pages
//!
//! The body is decoded with the first configured strategy that succeeds, then
//! parsed with `scraper`. Anchors yield raw `href` values; the text view is
//! every text node outside `<script>` and `<style>`, joined by spaces.

use scraper::{Html, Selector};

use crate::config::TextDecoding;
use crate::scraping::{fetcher::FetchResult, CrawlError};

/// Links and text mined from one page
#[derive(Debug, Clone, Default)]
pub struct ParsedPage {
    /// Raw `href` values in document order
    pub links: Vec<String>,
    /// Plain-text view of the page
    pub text: String,
}

impl TextDecoding {
    /// Decode `bytes`, or `None` if they are not valid for this strategy
    pub fn decode(&self, bytes: &[u8]) -> Option<String> {
        match self {
            TextDecoding::Utf8 => std::str::from_utf8(bytes).ok().map(str::to_string),
            TextDecoding::Latin1 => Some(bytes.iter().map(|&b| b as char).collect()),
        }
    }
}

/// Try each decoding in order and return the first success
pub fn decode_body(bytes: &[u8], decoders: &[TextDecoding]) -> Option<String> {
    decoders.iter().find_map(|decoder| {
        let decoded = decoder.decode(bytes);
        if decoded.is_none() {
            tracing::trace!("{:?} decoding failed, trying next", decoder);
        }
        decoded
    })
}

/// Parse a fetch result into links and text
pub fn parse_page(result: &FetchResult, decoders: &[TextDecoding]) -> Result<ParsedPage, CrawlError> {
    let url = result.final_url.as_str();
    let body = result
        .body
        .as_deref()
        .ok_or_else(|| CrawlError::parse(url, "response has no body"))?;

    let html = decode_body(body, decoders)
        .ok_or_else(|| CrawlError::parse(url, "no configured text decoding accepted the body"))?;

    Ok(parse_html(&html))
}

/// Extract links and the text view from decoded HTML
pub fn parse_html(html: &str) -> ParsedPage {
    let document = Html::parse_document(html);

    let links = match Selector::parse("a[href]") {
        Ok(selector) => document
            .select(&selector)
            .filter_map(|a| a.value().attr("href"))
            .map(|href| href.trim().to_string())
            .filter(|href| !href.is_empty())
            .collect(),
        Err(_) => Vec::new(),
    };

    let mut text = String::new();
    for node in document.root_element().descendants() {
        let Some(text_node) = node.value().as_text() else {
            continue;
        };

        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .map(|e| matches!(e.name(), "script" | "style" | "noscript"))
                .unwrap_or(false)
        });
        if hidden {
            continue;
        }

        let t = text_node.trim();
        if !t.is_empty() {
            if !text.is_empty() {
                text.push(' ');
            }
            text.push_str(t);
        }
    }

    ParsedPage { links, text }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    const DECODERS: [TextDecoding; 2] = [TextDecoding::Utf8, TextDecoding::Latin1];

    #[test]
    fn test_extract_links_and_text() {
        let html = r#"
            <html>
            <head><title>Lab</title><style>body { color: red; }</style></head>
            <body>
                <h1>Vision Lab</h1>
                <p>We study <a href="/people#faculty">people</a> and
                   <a href="https://www.cs.uci.edu/">other things</a>.</p>
                <a name="anchor-only">no href</a>
                <script>var tracking = "ignored";</script>
            </body>
            </html>
        "#;

        let page = parse_html(html);
        assert_eq!(page.links, vec!["/people#faculty", "https://www.cs.uci.edu/"]);
        assert!(page.text.contains("Vision Lab"));
        assert!(page.text.contains("people"));
        assert!(!page.text.contains("tracking"));
        assert!(!page.text.contains("color"));
    }

    #[test]
    fn test_decode_falls_back_to_latin1() {
        let bytes = b"caf\xe9";
        assert_eq!(decode_body(bytes, &[TextDecoding::Utf8]), None);
        assert_eq!(decode_body(bytes, &DECODERS).as_deref(), Some("café"));
    }

    #[test]
    fn test_decode_prefers_first_strategy() {
        let bytes = "naïve".as_bytes();
        assert_eq!(decode_body(bytes, &DECODERS).as_deref(), Some("naïve"));
    }

    #[test]
    fn test_missing_body_is_parse_failure() {
        let url = Url::parse("https://www.ics.uci.edu/").unwrap();
        let result = FetchResult {
            status: 200,
            final_url: url,
            body: None,
        };
        assert!(matches!(
            parse_page(&result, &DECODERS),
            Err(CrawlError::ParseFailure { .. })
        ));
    }

    #[test]
    fn test_undecodable_body_is_parse_failure() {
        let url = Url::parse("https://www.ics.uci.edu/").unwrap();
        let result = FetchResult::ok(url, vec![0xff, 0xfe, 0x00]);
        assert!(matches!(
            parse_page(&result, &[TextDecoding::Utf8]),
            Err(CrawlError::ParseFailure { .. })
        ));
    }

    #[test]
    fn test_empty_document() {
        let page = parse_html("");
        assert!(page.links.is_empty());
        assert!(page.text.is_empty());
    }
}
