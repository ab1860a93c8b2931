use crate::{UrlError, UrlResult};
use regex::Regex;

/// An ordered set of regexes matched against the start of a string
///
/// Every pattern is anchored at the beginning of the candidate but not at
/// the end, so `^https://example` and `https://example` behave the same and
/// both match `https://example.com/page`.
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    patterns: Vec<Regex>,
}

impl PatternSet {
    /// Compiles every pattern, failing on the first invalid one
    pub fn new<I, S>(patterns: I) -> UrlResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| compile_anchored(p.as_ref()))
            .collect::<UrlResult<Vec<_>>>()?;

        Ok(Self { patterns })
    }

    /// Returns true if any pattern matches the start of `candidate`
    pub fn is_match(&self, candidate: &str) -> bool {
        self.first_match(candidate).is_some()
    }

    /// Returns the index of the first pattern that matches `candidate`
    pub fn first_match(&self, candidate: &str) -> Option<usize> {
        self.patterns.iter().position(|re| re.is_match(candidate))
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

fn compile_anchored(pattern: &str) -> UrlResult<Regex> {
    Regex::new(&format!("^(?:{})", pattern)).map_err(|e| UrlError::Pattern {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })
}
