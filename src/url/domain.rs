use url::Url;

/// Extracts the network location (`host[:port]`) from a URL
///
/// The netloc keys the per-host rate-limit table, so two URLs on the same
/// host but different ports are throttled independently. The host is
/// lowercased by the URL parser.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use sumi_linkcheck::url::extract_netloc;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_netloc(&url), "example.com");
///
/// let url = Url::parse("http://localhost:8080/").unwrap();
/// assert_eq!(extract_netloc(&url), "localhost:8080");
/// ```
pub fn extract_netloc(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    }
}

/// Parses `uri` and returns its netloc, or `None` if it does not parse
pub fn netloc_of(uri: &str) -> Option<String> {
    Url::parse(uri).ok().map(|url| extract_netloc(&url))
}

/// Returns `scheme://netloc` for a URL
pub fn origin_of(url: &Url) -> String {
    format!("{}://{}", url.scheme(), extract_netloc(url))
}
