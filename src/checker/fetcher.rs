//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the checker, including:
//! - Building HTTP clients with proper user agent strings
//! - HEAD and streaming GET requests
//! - Manual redirect following with a recorded status history
//! - Mapping failures to explicit `FetchError` values

use crate::config::{AuthEntry, UserAgentConfig};
use crate::url::extract_netloc;
use reqwest::header::{HeaderMap, LOCATION, RETRY_AFTER};
use reqwest::{redirect::Policy, Client, Method, Response, StatusCode};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Maximum redirect hops before a request is abandoned
pub const MAX_REDIRECTS: usize = 30;

/// A request to send, with everything resolved from configuration
#[derive(Debug, Clone)]
pub struct RequestSpec<'a> {
    /// Encoded target without fragment
    pub url: Url,

    /// Headers to send on every hop
    pub headers: HeaderMap,

    /// Basic-auth credentials, only sent to the original host
    pub auth: Option<&'a AuthEntry>,
}

/// A successful response after following redirects
#[derive(Debug)]
pub struct Fetched {
    /// Final URL after redirects
    pub final_url: Url,

    /// Status of each redirect response, in order
    pub history: Vec<StatusCode>,

    /// The final response, body not yet read
    pub response: Response,
}

impl Fetched {
    /// Status code of the last redirect, or 0 if none was followed
    pub fn last_redirect_code(&self) -> u16 {
        self.history.last().map_or(0, |status| status.as_u16())
    }
}

/// Why a request did not produce a successful response
#[derive(Debug, Error)]
pub enum FetchError {
    /// The server answered with a 4xx or 5xx status
    #[error("{message}")]
    Status {
        code: u16,
        message: String,
        url: Url,
        retry_after: Option<String>,
    },

    /// The redirect chain was longer than `MAX_REDIRECTS`
    #[error("Exceeded {0} redirects.")]
    TooManyRedirects(usize),

    /// DNS, connection, TLS, timeout, or protocol failure
    #[error("{0}")]
    Transport(String),
}

impl FetchError {
    fn from_status(status: StatusCode, url: &Url, response: &Response) -> Self {
        let kind = if status.is_client_error() {
            "Client"
        } else {
            "Server"
        };
        let reason = status.canonical_reason().unwrap_or("Unknown");
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        Self::Status {
            code: status.as_u16(),
            message: format!(
                "{} {} Error: {} for url: {}",
                status.as_u16(),
                kind,
                reason,
                url
            ),
            url: url.clone(),
            retry_after,
        }
    }

    fn from_transport(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Transport(format!("Request timeout: {}", error))
        } else {
            Self::Transport(error.to_string())
        }
    }

    /// The HTTP status code, if the server answered
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Builds an HTTP client with proper configuration
///
/// Redirects are not followed by the client; `fetch` follows them itself
/// so the status of every hop is known.
///
/// # Arguments
///
/// * `config` - The user agent configuration
/// * `timeout` - Deadline for each request
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use sumi_linkcheck::config::UserAgentConfig;
/// use sumi_linkcheck::checker::build_http_client;
///
/// let client = build_http_client(&UserAgentConfig::default(), Duration::from_secs(5)).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .timeout(timeout)
        .connect_timeout(timeout)
        .redirect(Policy::none()) // Handle redirects manually
        .gzip(true)
        .brotli(true)
        .build()
}

/// Sends a HEAD request, following redirects
pub async fn head(client: &Client, spec: &RequestSpec<'_>) -> Result<Fetched, FetchError> {
    fetch(client, Method::HEAD, spec).await
}

/// Sends a GET request, following redirects; the body is left unread
pub async fn get(client: &Client, spec: &RequestSpec<'_>) -> Result<Fetched, FetchError> {
    fetch(client, Method::GET, spec).await
}

/// Sends a request and follows redirects up to `MAX_REDIRECTS` hops
///
/// # Request Flow
///
/// | Response | Action |
/// |----------|--------|
/// | 3xx with Location | Record status, resolve Location, repeat |
/// | 4xx / 5xx | `FetchError::Status` |
/// | anything else | `Ok(Fetched)` |
/// | transport failure | `FetchError::Transport` |
async fn fetch(
    client: &Client,
    method: Method,
    spec: &RequestSpec<'_>,
) -> Result<Fetched, FetchError> {
    let origin = extract_netloc(&spec.url);
    let mut url = spec.url.clone();
    let mut history = Vec::new();

    loop {
        let mut request = client
            .request(method.clone(), url.clone())
            .headers(spec.headers.clone());
        if let Some(auth) = spec.auth {
            // Credentials never follow a redirect to another host
            if extract_netloc(&url) == origin {
                request = request.basic_auth(&auth.username, auth.password.as_ref());
            }
        }

        let response = request.send().await.map_err(FetchError::from_transport)?;
        let status = response.status();

        if status.is_redirection() {
            let location = response
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);

            if let Some(location) = location {
                if history.len() >= MAX_REDIRECTS {
                    return Err(FetchError::TooManyRedirects(MAX_REDIRECTS));
                }

                let next = url.join(&location).map_err(|e| {
                    FetchError::Transport(format!(
                        "Invalid redirect location '{}' from {}: {}",
                        location, url, e
                    ))
                })?;
                tracing::trace!("{} {} -> {}", status.as_u16(), url, next);
                history.push(status);
                url = next;
                continue;
            }
        }

        if status.is_client_error() || status.is_server_error() {
            return Err(FetchError::from_status(status, &url, &response));
        }

        return Ok(Fetched {
            final_url: url,
            history,
            response,
        });
    }
}
