use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// Default per-attempt network timeout when none is configured
pub const DEFAULT_TIMEOUT_SECS: f64 = 5.0;

/// Main configuration structure for Sumi-Linkcheck
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub linkcheck: LinkcheckConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub source: SourceConfig,
}

/// Link checking behaviour
#[derive(Debug, Clone, Deserialize)]
pub struct LinkcheckConfig {
    /// URIs matching any of these regexes are never checked
    #[serde(default)]
    pub ignore: Vec<String>,

    /// Credentials attached to requests whose URI matches `pattern`
    #[serde(default)]
    pub auth: Vec<AuthEntry>,

    /// Extra request headers keyed by `scheme://netloc`, full URI, or `*`
    #[serde(rename = "request-headers", default)]
    pub request_headers: BTreeMap<String, BTreeMap<String, String>>,

    /// Maximum network attempts per URI before it is reported broken
    #[serde(default = "default_retries")]
    pub retries: u32,

    /// Per-attempt timeout in seconds
    #[serde(default)]
    pub timeout: Option<f64>,

    /// Number of concurrent workers
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Whether `#fragment` targets are verified in the response body
    #[serde(default = "default_true")]
    pub anchors: bool,

    /// Fragments matching any of these regexes are not verified
    #[serde(rename = "anchors-ignore", default = "default_anchors_ignore")]
    pub anchors_ignore: Vec<String>,

    /// Ceiling for the rate-limit backoff, in seconds
    #[serde(rename = "rate-limit-timeout", default = "default_rate_limit_timeout")]
    pub rate_limit_timeout: f64,
}

impl LinkcheckConfig {
    /// Returns the per-attempt timeout, falling back to the default
    ///
    /// Values validation would reject fall back to the default.
    pub fn timeout(&self) -> Duration {
        self.timeout
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
            .unwrap_or_else(|| Duration::from_secs_f64(DEFAULT_TIMEOUT_SECS))
    }

    /// Returns the rate-limit ceiling as a duration
    ///
    /// Values validation would reject fall back to the default.
    pub fn max_delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.rate_limit_timeout)
            .unwrap_or_else(|_| Duration::from_secs_f64(default_rate_limit_timeout()))
    }
}

impl Default for LinkcheckConfig {
    fn default() -> Self {
        Self {
            ignore: Vec::new(),
            auth: Vec::new(),
            request_headers: BTreeMap::new(),
            retries: default_retries(),
            timeout: None,
            workers: default_workers(),
            anchors: true,
            anchors_ignore: default_anchors_ignore(),
            rate_limit_timeout: default_rate_limit_timeout(),
        }
    }
}

/// Basic-auth credentials for URIs matching a pattern
#[derive(Debug, Clone, Deserialize)]
pub struct AuthEntry {
    /// Regex matched against the start of the URI
    pub pattern: String,

    pub username: String,

    #[serde(default)]
    pub password: Option<String>,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the checker
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the checker
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the checker
    #[serde(rename = "contact-url", default)]
    pub contact_url: Option<String>,

    /// Email address for contact
    #[serde(rename = "contact-email", default)]
    pub contact_email: Option<String>,
}

impl UserAgentConfig {
    /// Formats the User-Agent header value
    ///
    /// Format: `Name/Version (+ContactURL; ContactEmail)`, with the
    /// parenthesised part omitted when no contact details are configured.
    pub fn header_value(&self) -> String {
        let contact: Vec<String> = [
            self.contact_url.as_ref().map(|u| format!("+{}", u)),
            self.contact_email.clone(),
        ]
        .into_iter()
        .flatten()
        .collect();

        if contact.is_empty() {
            format!("{}/{}", self.crawler_name, self.crawler_version)
        } else {
            format!(
                "{}/{} ({})",
                self.crawler_name,
                self.crawler_version,
                contact.join("; ")
            )
        }
    }
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "Sumi-Linkcheck".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: None,
            contact_email: None,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory receiving `output.txt` and `output.json`
    pub directory: String,

    /// Buffer report lines and sort them before writing
    #[serde(rename = "sort-entries", default = "default_true")]
    pub sort_entries: bool,
}

/// Where the checked documents live
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Root directory that docnames are relative to
    pub directory: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            directory: ".".to_string(),
        }
    }
}

fn default_retries() -> u32 {
    1
}

fn default_workers() -> usize {
    5
}

fn default_true() -> bool {
    true
}

fn default_anchors_ignore() -> Vec<String> {
    // Anchors starting with ! are commonly generated client-side
    vec!["^!".to_string()]
}

fn default_rate_limit_timeout() -> f64 {
    300.0
}
