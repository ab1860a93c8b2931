//! Sumi-Linkcheck: an external hyperlink verifier for documentation trees
//!
//! This crate validates the hyperlinks of a document corpus against the live
//! network, classifies every outcome, honours server-imposed rate limits,
//! retries transient failures, and writes a deterministic report.

pub mod checker;
pub mod collector;
pub mod config;
pub mod output;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for Sumi-Linkcheck operations
#[derive(Debug, Error)]
pub enum SumiError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("Collection error: {0}")]
    Collect(#[from] collector::CollectError),

    #[error("Unexpected status '{status}' reported for {uri}")]
    UnexpectedStatus { uri: String, status: String },

    #[error("All workers exited with {remaining} results outstanding")]
    WorkersExited { remaining: usize },

    #[error("Worker stopped before shutdown with {remaining} results outstanding: {reason}")]
    WorkerFailed { remaining: usize, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid pattern '{pattern}': {message}")]
    Pattern { pattern: String, message: String },
}

/// Result type alias for Sumi-Linkcheck operations
pub type Result<T> = std::result::Result<T, SumiError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use checker::{run_linkcheck, CheckResult, Coordinator, Hyperlink, RunOutcome};
pub use config::Config;
pub use state::{LinkCache, LinkStatus, RateLimiter};
