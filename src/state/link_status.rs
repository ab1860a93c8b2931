/// Link status definitions for classifying check outcomes
///
/// This module defines every outcome a hyperlink can have after a check.
use std::fmt;
use tokio::time::Instant;

/// Extra detail carried by a working link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkingInfo {
    /// Checked against the network in this attempt
    Fresh,
    /// Answered from the cache of known-good URIs
    Cached,
    /// Server answered 401; the link is reachable
    Unauthorized,
}

impl WorkingInfo {
    /// The info string written to the reports
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fresh => "",
            Self::Cached => "old",
            Self::Unauthorized => " - unauthorized",
        }
    }
}

/// Classification of one hyperlink after one check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkStatus {
    // ===== Skipped by policy =====
    /// Not attempted: empty, fragment-only, mailto/tel, or unsupported scheme
    Unchecked,

    /// Explicitly not a failure: matched an ignore rule or the server
    /// answered 503
    Ignored { reason: String },

    // ===== Success =====
    /// Network check succeeded
    Working(WorkingInfo),

    /// Relative target resolved to an existing local file
    Local,

    /// Network check succeeded at a different final URL
    Redirected { target: String, code: u16 },

    // ===== Transient =====
    /// Host answered 429; the link re-enters the scheduler at `next_check`
    RateLimited { next_check: Instant },

    // ===== Failure =====
    /// Terminal failure with a human-readable reason
    Broken { reason: String },
}

impl LinkStatus {
    pub fn broken(reason: impl Into<String>) -> Self {
        Self::Broken {
            reason: reason.into(),
        }
    }

    pub fn ignored(reason: impl Into<String>) -> Self {
        Self::Ignored {
            reason: reason.into(),
        }
    }

    /// The status name used in reports and logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::Unchecked => "unchecked",
            Self::Ignored { .. } => "ignored",
            Self::Working(_) => "working",
            Self::Local => "local",
            Self::Redirected { .. } => "redirected",
            Self::RateLimited { .. } => "rate-limited",
            Self::Broken { .. } => "broken",
        }
    }

    /// The free-form detail written as `info` in the JSON report
    pub fn info(&self) -> &str {
        match self {
            Self::Working(info) => info.as_str(),
            Self::Broken { reason } | Self::Ignored { reason } => reason,
            Self::Redirected { target, .. } => target,
            Self::Unchecked | Self::Local | Self::RateLimited { .. } => "",
        }
    }

    /// The HTTP code written as `code`; only redirects carry one
    pub fn code(&self) -> u16 {
        match self {
            Self::Redirected { code, .. } => *code,
            _ => 0,
        }
    }

    /// Returns true if this outcome is final for the run
    ///
    /// Only `RateLimited` is transient; every other status is reported.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::RateLimited { .. })
    }

    /// Returns true if this outcome fails the run
    pub fn is_broken(&self) -> bool {
        matches!(self, Self::Broken { .. })
    }

    /// Returns true if the retry loop should stop at this outcome
    pub fn ends_retries(&self) -> bool {
        !self.is_broken()
    }
}

impl fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Describes a redirect status code the way the reports phrase it
pub fn redirect_text(code: u16) -> &'static str {
    match code {
        301 | 308 => "permanently",
        302 => "with Found",
        303 => "with See Other",
        307 => "temporarily",
        _ => "with unknown code",
    }
}
