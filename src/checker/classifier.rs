//! Per-hyperlink classification
//!
//! `CheckContext` owns everything one run shares between workers: the HTTP
//! client, the memoized outcomes, the rate-limit table, and the compiled
//! configuration. `CheckContext::check` is the state machine that turns one
//! hyperlink into a `LinkStatus`.

use crate::checker::anchor::check_anchor;
use crate::checker::fetcher::{self, build_http_client, FetchError, RequestSpec};
use crate::checker::hyperlink::Hyperlink;
use crate::config::{AuthEntry, Config};
use crate::state::{LinkCache, LinkStatus, RateLimiter, WorkingInfo};
use crate::url::{
    encode_uri, extract_netloc, is_http, is_unchecked_target, looks_like_uri, origin_of,
    split_fragment, PatternSet,
};
use crate::{ConfigError, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT};
use reqwest::Client;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use url::Url;

/// `Accept` header sent with every request unless overridden
pub const DEFAULT_ACCEPT: &str = "text/html,application/xhtml+xml;q=0.9,*/*;q=0.8";

/// Shared state and settings for one checking run
#[derive(Debug)]
pub struct CheckContext {
    /// Root that docnames are resolved against for local targets
    pub source_dir: PathBuf,

    pub client: Client,

    /// Outcomes memoized for this run
    pub cache: LinkCache,

    /// Per-host throttle records
    pub rate_limiter: RateLimiter,

    ignore: PatternSet,
    anchors_ignore: PatternSet,
    auth_patterns: PatternSet,
    auth: Vec<AuthEntry>,

    /// Extra headers keyed by `scheme://netloc`, `scheme://netloc/`, URI or `*`
    request_headers: HashMap<String, HeaderMap>,

    retries: u32,
    check_anchors: bool,
}

impl CheckContext {
    /// Builds a fresh context, including its HTTP client, from `config`
    pub fn new(config: &Config) -> Result<Self> {
        let client = build_http_client(&config.user_agent, config.linkcheck.timeout())?;
        Self::with_client(config, client)
    }

    /// Builds a fresh context around an existing client
    pub fn with_client(config: &Config, client: Client) -> Result<Self> {
        let linkcheck = &config.linkcheck;

        let request_headers = linkcheck
            .request_headers
            .iter()
            .map(|(key, headers)| Ok((key.clone(), build_header_map(headers)?)))
            .collect::<std::result::Result<HashMap<_, _>, ConfigError>>()?;

        Ok(Self {
            source_dir: PathBuf::from(&config.source.directory),
            client,
            cache: LinkCache::new(),
            rate_limiter: RateLimiter::new(linkcheck.max_delay()),
            ignore: PatternSet::new(&linkcheck.ignore)?,
            anchors_ignore: PatternSet::new(&linkcheck.anchors_ignore)?,
            auth_patterns: PatternSet::new(linkcheck.auth.iter().map(|a| a.pattern.as_str()))?,
            auth: linkcheck.auth.clone(),
            request_headers,
            retries: linkcheck.retries.max(1),
            check_anchors: linkcheck.anchors,
        })
    }

    /// Returns true if `uri` matches an ignore pattern and is never checked
    pub fn is_ignored(&self, uri: &str) -> bool {
        self.ignore.is_match(uri)
    }

    /// Classifies one hyperlink
    ///
    /// # Classification Order
    ///
    /// 1. Empty, fragment-only, `mailto:` or `tel:` targets are `Unchecked`
    /// 2. Other non-HTTP URIs (`ftp://`, `//host`) are `Unchecked`
    /// 3. Anything else without a scheme is a path relative to the document:
    ///    `Local` if it exists, `Broken` otherwise
    /// 4. Memoized outcomes are replayed without touching the network
    /// 5. Up to `retries` network attempts, stopping at the first outcome
    ///    that is not `Broken`
    pub async fn check(&self, link: &Hyperlink) -> LinkStatus {
        let uri = link.uri.as_str();

        if is_unchecked_target(uri) {
            return LinkStatus::Unchecked;
        }

        if !is_http(uri) {
            if looks_like_uri(uri) {
                return LinkStatus::Unchecked;
            }
            let status = self.check_local(uri, link.docname.as_deref());
            // Existing local targets are not memoized; missing ones are
            if status.is_broken() {
                self.cache.record(uri, &status);
            }
            return status;
        }

        if let Some(status) = self.cache.lookup(uri) {
            return status;
        }

        let mut status = self.check_uri(uri).await;
        for attempt in 2..=self.retries {
            if status.ends_retries() {
                break;
            }
            tracing::debug!("Retrying {} (attempt {}/{})", uri, attempt, self.retries);
            status = self.check_uri(uri).await;
        }

        self.cache.record(uri, &status);
        status
    }

    /// Resolves a relative target against the directory of its document
    fn check_local(&self, uri: &str, docname: Option<&str>) -> LinkStatus {
        let (target, _) = split_fragment(uri);
        let base = match docname {
            Some(docname) => self
                .source_dir
                .join(docname)
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| self.source_dir.clone()),
            None => self.source_dir.clone(),
        };

        if base.join(target).exists() {
            LinkStatus::Local
        } else {
            LinkStatus::broken("Local file not found")
        }
    }

    /// Performs one network attempt for `uri`
    async fn check_uri(&self, uri: &str) -> LinkStatus {
        let (req_part, fragment) = split_fragment(uri);
        let anchor = fragment.filter(|f| !f.is_empty() && !self.anchors_ignore.is_match(f));

        let url = match Url::parse(&encode_uri(req_part)) {
            Ok(url) => url,
            Err(e) => return LinkStatus::broken(e.to_string()),
        };
        let request = RequestSpec {
            headers: self.headers_for(&url, uri),
            auth: self.auth_for(uri),
            url,
        };

        let reached = match anchor {
            Some(anchor) if self.check_anchors => self.get_with_anchor(&request, anchor).await,
            _ => self.head_or_get(&request).await,
        };
        let (final_url, redirect_code) = match reached {
            Ok(reached) => reached,
            Err(status) => return status,
        };

        // A good answer cancels any remembered throttle
        self.rate_limiter.clear(&extract_netloc(&request.url));

        if final_url.as_str().trim_end_matches('/') == request.url.as_str().trim_end_matches('/') {
            return LinkStatus::Working(WorkingInfo::Fresh);
        }

        let mut target = final_url.to_string();
        if let Some(anchor) = anchor {
            target.push('#');
            target.push_str(anchor);
        }
        LinkStatus::Redirected {
            target,
            code: redirect_code,
        }
    }

    /// Streams the body with GET and looks for `anchor`
    async fn get_with_anchor(
        &self,
        request: &RequestSpec<'_>,
        anchor: &str,
    ) -> std::result::Result<(Url, u16), LinkStatus> {
        let fetched = fetcher::get(&self.client, request)
            .await
            .map_err(|e| self.classify_error(e))?;
        let redirect_code = fetched.last_redirect_code();
        let final_url = fetched.final_url;

        match check_anchor(fetched.response, anchor).await {
            Ok(true) => Ok((final_url, redirect_code)),
            Ok(false) => Err(LinkStatus::broken(format!("Anchor '{}' not found", anchor))),
            Err(e) => Err(LinkStatus::broken(e.to_string())),
        }
    }

    /// Tries HEAD first and falls back to GET for servers that reject it
    ///
    /// A 429 or a transport failure is final; every other HTTP error and a
    /// redirect loop get a second chance with GET.
    async fn head_or_get(
        &self,
        request: &RequestSpec<'_>,
    ) -> std::result::Result<(Url, u16), LinkStatus> {
        let fetched = match fetcher::head(&self.client, request).await {
            Ok(fetched) => Ok(fetched),
            Err(e @ FetchError::Status { code: 429, .. }) | Err(e @ FetchError::Transport(_)) => {
                Err(e)
            }
            Err(e) => {
                tracing::trace!("HEAD {} failed ({}), trying GET", request.url, e);
                fetcher::get(&self.client, request).await
            }
        };

        fetched
            .map(|fetched| {
                let redirect_code = fetched.last_redirect_code();
                (fetched.final_url, redirect_code)
            })
            .map_err(|e| self.classify_error(e))
    }

    /// Maps a failed request onto a classification
    ///
    /// | Failure | Classification |
    /// |---------|----------------|
    /// | 401 | `Working` (unauthorized) |
    /// | 429 | `RateLimited`, or `Broken` past the backoff ceiling |
    /// | 503 | `Ignored` |
    /// | other status, redirect loop, transport | `Broken` |
    fn classify_error(&self, error: FetchError) -> LinkStatus {
        match &error {
            FetchError::Status { code: 401, .. } => LinkStatus::Working(WorkingInfo::Unauthorized),
            FetchError::Status {
                code: 429,
                url,
                retry_after,
                ..
            } => {
                let netloc = extract_netloc(url);
                match self.rate_limiter.limit_rate(&netloc, retry_after.as_deref()) {
                    Some(next_check) => LinkStatus::RateLimited { next_check },
                    None => LinkStatus::broken(error.to_string()),
                }
            }
            FetchError::Status { code: 503, .. } => LinkStatus::ignored(error.to_string()),
            _ => LinkStatus::broken(error.to_string()),
        }
    }

    /// Returns the default headers merged with the first configured match
    ///
    /// Candidates, in order: `scheme://netloc`, `scheme://netloc/`, the full
    /// URI, `*`.
    fn headers_for(&self, url: &Url, uri: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(DEFAULT_ACCEPT));

        let origin = origin_of(url);
        let candidates = [origin.clone(), format!("{}/", origin), uri.to_string(), "*".to_string()];

        if let Some(extra) = candidates
            .iter()
            .find_map(|candidate| self.request_headers.get(candidate))
        {
            for (name, value) in extra {
                headers.insert(name.clone(), value.clone());
            }
        }

        headers
    }

    /// Returns the credentials of the first auth entry matching `uri`
    fn auth_for(&self, uri: &str) -> Option<&AuthEntry> {
        self.auth_patterns
            .first_match(uri)
            .and_then(|index| self.auth.get(index))
    }
}

fn build_header_map(
    headers: &std::collections::BTreeMap<String, String>,
) -> std::result::Result<HeaderMap, ConfigError> {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ConfigError::Validation(format!("Invalid header name '{}': {}", name, e)))?;
        let value = HeaderValue::from_str(value).map_err(|e| {
            ConfigError::Validation(format!("Invalid value for header '{}': {}", name, e))
        })?;
        map.insert(name, value);
    }
    Ok(map)
}
