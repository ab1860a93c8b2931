//! Hyperlinks awaiting a check and the results handed back for reporting

use crate::state::LinkStatus;
use tokio::time::Instant;

/// A single extracted reference awaiting validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hyperlink {
    /// Earliest time the link may be checked; `None` means immediately
    pub due_at: Option<Instant>,

    /// The link target as written in the document
    pub uri: String,

    /// Document the link was found in, relative to the source directory
    pub docname: Option<String>,

    /// Line of the link within the document
    pub lineno: Option<u32>,
}

impl Hyperlink {
    /// Creates a hyperlink that is due immediately
    pub fn new(uri: impl Into<String>, docname: Option<String>, lineno: Option<u32>) -> Self {
        Self {
            due_at: None,
            uri: uri.into(),
            docname,
            lineno,
        }
    }

    /// Returns a copy of this hyperlink due at `at`
    pub fn due(self, at: Instant) -> Self {
        Self {
            due_at: Some(at),
            ..self
        }
    }

    /// Returns true if the link may be checked at `now`
    pub fn is_due(&self, now: Instant) -> bool {
        self.due_at.map_or(true, |due| due <= now)
    }
}

/// The outcome of checking one hyperlink, handed from a worker to the
/// coordinator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    pub uri: String,
    pub docname: Option<String>,
    pub lineno: Option<u32>,
    pub status: LinkStatus,
}

impl CheckResult {
    pub fn new(link: &Hyperlink, status: LinkStatus) -> Self {
        Self {
            uri: link.uri.clone(),
            docname: link.docname.clone(),
            lineno: link.lineno,
            status,
        }
    }

    pub fn info(&self) -> &str {
        self.status.info()
    }

    pub fn code(&self) -> u16 {
        self.status.code()
    }
}
