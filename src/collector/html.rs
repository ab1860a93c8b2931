//! HTML parser for extracting link targets
//!
//! This module handles parsing a built HTML document to extract:
//! - Link targets (from `<a href>` tags)
//! - Remote image sources (from `<img src>` tags pointing at `scheme://`)
//! - The source line each target was written on

use scraper::{Html, Selector};

/// A link target found in a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedLink {
    /// The attribute value, unresolved
    pub uri: String,

    /// 1-based line of the attribute in the source text
    pub lineno: Option<u32>,
}

/// Parses HTML content and extracts link targets in document order
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` tags, whatever the target (policy is applied when
///   the link is checked)
/// - `<img src="...">` tags whose source contains `://`
///
/// **Exclude:**
/// - `<a>` tags without `href`
/// - Local images (`<img src="_static/logo.png">`)
///
/// # Arguments
///
/// * `html` - The HTML content to parse
///
/// # Returns
///
/// The targets in the order they appear in the document
///
/// # Example
///
/// ```
/// use sumi_linkcheck::collector::extract_links;
///
/// let html = "<html><body>\n<a href=\"https://example.com/\">x</a></body></html>";
/// let links = extract_links(html);
/// assert_eq!(links[0].uri, "https://example.com/");
/// assert_eq!(links[0].lineno, Some(2));
/// ```
pub fn extract_links(html: &str) -> Vec<ExtractedLink> {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("a[href], img[src]") else {
        return Vec::new();
    };

    let mut locator = LineLocator::new(html);
    let mut links = Vec::new();

    for element in document.select(&selector) {
        let element = element.value();
        let target = match element.name() {
            "a" => element.attr("href"),
            "img" => element.attr("src").filter(|src| src.contains("://")),
            _ => None,
        };

        if let Some(uri) = target {
            links.push(ExtractedLink {
                uri: uri.to_string(),
                lineno: locator.locate(uri),
            });
        }
    }

    links
}

/// Recovers line numbers by searching the raw text for attribute values
///
/// Searches resume after the previous match, so repeated values map to
/// successive occurrences.
struct LineLocator<'a> {
    source: &'a str,
    cursor: usize,
    line: u32,
}

impl<'a> LineLocator<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            cursor: 0,
            line: 1,
        }
    }

    fn locate(&mut self, value: &str) -> Option<u32> {
        let rest = &self.source[self.cursor..];

        // Values are unescaped by the parser; try the common escaped form too
        let offset = rest
            .find(value)
            .map(|offset| (offset, value.len()))
            .or_else(|| {
                let escaped = value.replace('&', "&amp;");
                rest.find(&escaped).map(|offset| (offset, escaped.len()))
            });

        let (offset, len) = offset?;
        let found = self.cursor + offset;
        self.line += self.source[self.cursor..found].matches('\n').count() as u32;
        self.cursor = found + len;
        Some(self.line)
    }
}
