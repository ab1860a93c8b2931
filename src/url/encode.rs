use regex::Regex;
use std::sync::OnceLock;
use url::Url;

/// Matches `scheme://` and protocol-relative `//` prefixes
fn uri_prefix() -> &'static Regex {
    static URI_RE: OnceLock<Regex> = OnceLock::new();
    URI_RE.get_or_init(|| Regex::new(r"^([a-z]+:)?//").expect("static regex is valid"))
}

/// Returns true for targets that are never checked: empty, fragment-only,
/// `mailto:` and `tel:` links
pub fn is_unchecked_target(uri: &str) -> bool {
    uri.is_empty() || uri.starts_with('#') || uri.starts_with("mailto:") || uri.starts_with("tel:")
}

/// Returns true if `uri` uses the http or https scheme
pub fn is_http(uri: &str) -> bool {
    uri.starts_with("http:") || uri.starts_with("https:")
}

/// Returns true if `uri` has a scheme followed by `//` or is protocol-relative
///
/// Anything that fails this test is treated as a path relative to the
/// referencing document.
pub fn looks_like_uri(uri: &str) -> bool {
    uri_prefix().is_match(uri)
}

/// Splits `uri` at the first `#` into the request part and the fragment
///
/// # Examples
///
/// ```
/// use sumi_linkcheck::url::split_fragment;
///
/// assert_eq!(split_fragment("https://a/x#sec"), ("https://a/x", Some("sec")));
/// assert_eq!(split_fragment("https://a/x"), ("https://a/x", None));
/// ```
pub fn split_fragment(uri: &str) -> (&str, Option<&str>) {
    match uri.split_once('#') {
        Some((base, fragment)) => (base, Some(fragment)),
        None => (uri, None),
    }
}

/// Percent-encodes a non-ASCII URI so it can be sent on the wire
///
/// ASCII input is returned unchanged. Parseable URLs go through the URL
/// parser, which punycodes the host and percent-encodes path and query;
/// anything else has its non-ASCII characters percent-encoded in place.
pub fn encode_uri(uri: &str) -> String {
    if uri.is_ascii() {
        return uri.to_string();
    }

    if let Ok(url) = Url::parse(uri) {
        return url.to_string();
    }

    uri.chars()
        .map(|c| {
            if c.is_ascii() {
                c.to_string()
            } else {
                urlencoding::encode(c.encode_utf8(&mut [0; 4])).into_owned()
            }
        })
        .collect()
}
