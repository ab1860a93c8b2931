//! Anchor verification over a streamed response body
//!
//! The body is consumed chunk by chunk. Each start tag is isolated as soon
//! as it is complete and its attributes are parsed with `scraper`; the scan
//! stops at the first tag whose `id` or `name` equals the anchor.

use reqwest::Response;
use scraper::{Html, Node};

/// Bytes handed to the scanner per step
pub const CHUNK_SIZE: usize = 4096;

/// Incremental scanner for `id`/`name` attributes in HTML start tags
///
/// Holds no parser state across calls other than plain strings, so it can
/// live across `.await` points while the body streams in.
#[derive(Debug)]
pub struct AnchorScanner {
    anchor: String,

    /// Trailing bytes of an incomplete UTF-8 sequence
    pending: Vec<u8>,

    /// Decoded text not yet scanned (starts at a partial construct, if any)
    buffer: String,

    /// Closing tag to look for while inside `<script>` or `<style>`
    raw_text_end: Option<&'static str>,

    found: bool,
}

impl AnchorScanner {
    pub fn new(anchor: impl Into<String>) -> Self {
        Self {
            anchor: anchor.into(),
            pending: Vec::new(),
            buffer: String::new(),
            raw_text_end: None,
            found: false,
        }
    }

    /// Returns true once the anchor has been seen
    pub fn found(&self) -> bool {
        self.found
    }

    /// Feeds the next slice of the body; returns true if the anchor is found
    pub fn feed(&mut self, bytes: &[u8]) -> bool {
        if self.found {
            return true;
        }
        self.decode(bytes);
        self.scan();
        self.found
    }

    /// Flushes any undecodable trailing bytes at end of stream
    pub fn finish(&mut self) -> bool {
        if !self.found && !self.pending.is_empty() {
            let rest = std::mem::take(&mut self.pending);
            self.buffer.push_str(&String::from_utf8_lossy(&rest));
            self.scan();
        }
        self.found
    }

    fn decode(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);

        let mut start = 0;
        loop {
            match std::str::from_utf8(&self.pending[start..]) {
                Ok(text) => {
                    self.buffer.push_str(text);
                    self.pending.clear();
                    return;
                }
                Err(e) => {
                    let valid = start + e.valid_up_to();
                    // The prefix up to `valid` was just checked
                    self.buffer
                        .push_str(&String::from_utf8_lossy(&self.pending[start..valid]));
                    match e.error_len() {
                        Some(len) => {
                            self.buffer.push(char::REPLACEMENT_CHARACTER);
                            start = valid + len;
                        }
                        None => {
                            // Incomplete sequence at the end; wait for more
                            self.pending.drain(..valid);
                            return;
                        }
                    }
                }
            }
        }
    }

    fn scan(&mut self) {
        let mut pos = 0;

        while pos < self.buffer.len() {
            if let Some(close) = self.raw_text_end {
                let lower = self.buffer[pos..].to_ascii_lowercase();
                match lower.find(close) {
                    Some(offset) => {
                        self.raw_text_end = None;
                        pos += offset;
                    }
                    None => {
                        let keep = floor_char_boundary(
                            &self.buffer,
                            self.buffer.len().saturating_sub(close.len() - 1).max(pos),
                        );
                        self.buffer.drain(..keep);
                        return;
                    }
                }
            }

            let Some(offset) = self.buffer[pos..].find('<') else {
                self.buffer.clear();
                return;
            };
            let open = pos + offset;
            let rest = &self.buffer[open..];

            let skip_to = if rest.starts_with("<!--") {
                rest[4..].find("-->").map(|end| open + 4 + end + 3)
            } else if rest.len() < 4 && "<!--".starts_with(rest) {
                None
            } else if rest.starts_with("<!") || rest.starts_with("</") || rest.starts_with("<?") {
                rest.find('>').map(|end| open + end + 1)
            } else if rest[1..].starts_with(|c: char| c.is_ascii_alphabetic()) {
                match tag_end(rest) {
                    Some(end) => {
                        let body = rest[1..end].to_string();
                        if self.check_tag(&body) {
                            self.found = true;
                            return;
                        }
                        Some(open + end + 1)
                    }
                    None => None,
                }
            } else if rest.len() == 1 {
                None
            } else {
                Some(open + 1)
            };

            match skip_to {
                Some(next) => pos = next,
                None => {
                    // Incomplete construct; keep it for the next chunk
                    self.buffer.drain(..open);
                    return;
                }
            }
        }

        self.buffer.clear();
    }

    /// Inspects one start tag body (between `<` and `>`)
    fn check_tag(&mut self, body: &str) -> bool {
        let name_end = body
            .find(|c: char| c.is_ascii_whitespace() || c == '/')
            .unwrap_or(body.len());
        let name = body[..name_end].to_ascii_lowercase();
        let attrs = &body[name_end..];

        if !body.ends_with('/') {
            self.raw_text_end = match name.as_str() {
                "script" => Some("</script"),
                "style" => Some("</style"),
                _ => None,
            };
        }

        let lower = attrs.to_ascii_lowercase();
        if !lower.contains("id") && !lower.contains("name") {
            return false;
        }

        attrs_match(attrs.trim_end_matches('/'), &self.anchor)
    }
}

/// Parses `attrs` as the attributes of a dummy element and compares
/// `id` and `name` with `anchor`
fn attrs_match(attrs: &str, anchor: &str) -> bool {
    let fragment = Html::parse_fragment(&format!("<div {}></div>", attrs));
    let found = fragment
        .tree
        .values()
        .filter_map(Node::as_element)
        .find(|element| element.name() == "div")
        .map_or(false, |element| {
            element.attr("id") == Some(anchor) || element.attr("name") == Some(anchor)
        });
    found
}

/// Finds the `>` closing a start tag, skipping quoted attribute values
fn tag_end(tag: &str) -> Option<usize> {
    let mut quote = None;
    for (index, c) in tag.char_indices().skip(1) {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => quote = Some(c),
            None if c == '>' => return Some(index),
            None => {}
        }
    }
    None
}

fn floor_char_boundary(text: &str, mut index: usize) -> usize {
    while index > 0 && !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

/// Reads `response` until `anchor` is found or the body ends
///
/// The anchor is compared after percent-decoding. Reading stops at the
/// first matching tag; the rest of the body is never downloaded.
///
/// # Returns
///
/// * `Ok(true)` - A start tag carries the anchor as `id` or `name`
/// * `Ok(false)` - The body ended without a match
/// * `Err(reqwest::Error)` - The body could not be read
pub async fn check_anchor(mut response: Response, anchor: &str) -> Result<bool, reqwest::Error> {
    let decoded = urlencoding::decode(anchor)
        .map(|cow| cow.into_owned())
        .unwrap_or_else(|_| anchor.to_string());
    let mut scanner = AnchorScanner::new(decoded);

    while let Some(chunk) = response.chunk().await? {
        for piece in chunk.chunks(CHUNK_SIZE) {
            if scanner.feed(piece) {
                tracing::trace!("Anchor '{}' found in {}", anchor, response.url());
                return Ok(true);
            }
        }
    }

    Ok(scanner.finish())
}
