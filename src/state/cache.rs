use crate::state::link_status::{LinkStatus, WorkingInfo};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// A memoized outcome; one entry per URI keeps the good, broken and
/// redirected sets disjoint
#[derive(Debug, Clone, PartialEq, Eq)]
enum Memo {
    Good,
    Broken(String),
    Redirected(String, u16),
}

/// Outcomes memoized for the lifetime of one run
///
/// Repeat occurrences of a URI are answered from here instead of the
/// network. Each write replaces the whole entry under the lock, so readers
/// never see a half-written value.
#[derive(Debug, Default)]
pub struct LinkCache {
    entries: Mutex<HashMap<String, Memo>>,
}

impl LinkCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the memoized classification for `uri`
    ///
    /// Good URIs come back as `Working(Cached)`; broken and redirected URIs
    /// replay the stored reason or target.
    pub fn lookup(&self, uri: &str) -> Option<LinkStatus> {
        self.lock().get(uri).map(|memo| match memo {
            Memo::Good => LinkStatus::Working(WorkingInfo::Cached),
            Memo::Broken(reason) => LinkStatus::broken(reason.clone()),
            Memo::Redirected(target, code) => LinkStatus::Redirected {
                target: target.clone(),
                code: *code,
            },
        })
    }

    /// Memoizes a final classification
    ///
    /// Only working, broken and redirected outcomes are stored; everything
    /// else (notably rate-limited) is left to be checked again.
    pub fn record(&self, uri: &str, status: &LinkStatus) {
        let memo = match status {
            LinkStatus::Working(_) => Memo::Good,
            LinkStatus::Broken { reason } => Memo::Broken(reason.clone()),
            LinkStatus::Redirected { target, code } => Memo::Redirected(target.clone(), *code),
            _ => return,
        };
        self.lock().insert(uri.to_string(), memo);
    }

    /// Returns true if `uri` is known to be good
    pub fn is_good(&self, uri: &str) -> bool {
        matches!(self.lock().get(uri), Some(Memo::Good))
    }

    /// Returns the broken URIs with their reasons, sorted by URI
    pub fn broken(&self) -> Vec<(String, String)> {
        let mut broken: Vec<(String, String)> = self
            .lock()
            .iter()
            .filter_map(|(uri, memo)| match memo {
                Memo::Broken(reason) => Some((uri.clone(), reason.clone())),
                _ => None,
            })
            .collect();
        broken.sort();
        broken
    }

    /// Returns true if any URI has been memoized as broken
    pub fn has_broken(&self) -> bool {
        self.lock().values().any(|memo| matches!(memo, Memo::Broken(_)))
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Memo>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}
