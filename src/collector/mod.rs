//! Hyperlink collection
//!
//! Produces the deduplicated, first-seen-wins list of hyperlinks a run
//! checks, either by walking a directory of built HTML documents or by
//! reading a JSON-lines manifest.

mod html;
mod manifest;

pub use html::{extract_links, ExtractedLink};
pub use manifest::load_manifest;

use crate::checker::Hyperlink;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while collecting hyperlinks
#[derive(Debug, Error)]
pub enum CollectError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid manifest entry at {path}:{line}: {message}")]
    Manifest {
        path: PathBuf,
        line: usize,
        message: String,
    },
}

/// Hyperlinks in insertion order, keeping only the first per URI
#[derive(Debug, Default)]
pub struct HyperlinkSet {
    links: Vec<Hyperlink>,
    seen: HashSet<String>,
}

impl HyperlinkSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `link` unless its URI was already seen; returns true if added
    pub fn insert(&mut self, link: Hyperlink) -> bool {
        if !self.seen.insert(link.uri.clone()) {
            return false;
        }
        self.links.push(link);
        true
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn into_vec(self) -> Vec<Hyperlink> {
        self.links
    }
}

/// Collects hyperlinks from every `.html`/`.htm` file under `dir`
///
/// Documents are visited in sorted path order. Docnames are the paths
/// relative to `dir`, with `/` separators.
///
/// # Returns
///
/// * `Ok(Vec<Hyperlink>)` - Unique hyperlinks in traversal order
/// * `Err(CollectError)` - A directory or document could not be read
pub fn collect_documents(dir: &Path) -> Result<Vec<Hyperlink>, CollectError> {
    let mut documents = Vec::new();
    find_documents(dir, &mut documents)?;
    documents.sort();

    let mut links = HyperlinkSet::new();
    for path in &documents {
        let html = fs::read_to_string(path).map_err(|source| CollectError::Io {
            path: path.clone(),
            source,
        })?;
        let docname = docname_for(dir, path);

        let extracted = extract_links(&html);
        tracing::debug!("{}: {} links", docname, extracted.len());
        for link in extracted {
            links.insert(Hyperlink::new(link.uri, Some(docname.clone()), link.lineno));
        }
    }

    tracing::info!(
        "Collected {} unique links from {} documents",
        links.len(),
        documents.len()
    );
    Ok(links.into_vec())
}

fn find_documents(dir: &Path, documents: &mut Vec<PathBuf>) -> Result<(), CollectError> {
    let entries = fs::read_dir(dir).map_err(|source| CollectError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    for entry in entries {
        let path = entry
            .map_err(|source| CollectError::Io {
                path: dir.to_path_buf(),
                source,
            })?
            .path();

        if path.is_dir() {
            find_documents(&path, documents)?;
        } else if matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("html") | Some("htm")
        ) {
            documents.push(path);
        }
    }

    Ok(())
}

fn docname_for(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
