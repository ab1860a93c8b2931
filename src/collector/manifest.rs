//! JSON-lines link manifest
//!
//! Each non-blank line is an object such as
//! `{"uri": "https://example.com/", "docname": "index.html", "lineno": 4}`;
//! `docname` and `lineno` may be omitted or null.

use crate::checker::Hyperlink;
use crate::collector::{CollectError, HyperlinkSet};
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct ManifestEntry {
    uri: String,
    #[serde(default)]
    docname: Option<String>,
    #[serde(default)]
    lineno: Option<u32>,
}

/// Reads a manifest, keeping the first entry for each URI
pub fn load_manifest(path: &Path) -> Result<Vec<Hyperlink>, CollectError> {
    let content = fs::read_to_string(path).map_err(|source| CollectError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_manifest(&content, path)
}

fn parse_manifest(content: &str, path: &Path) -> Result<Vec<Hyperlink>, CollectError> {
    let mut links = HyperlinkSet::new();

    for (index, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        let entry: ManifestEntry =
            serde_json::from_str(line).map_err(|e| CollectError::Manifest {
                path: path.to_path_buf(),
                line: index + 1,
                message: e.to_string(),
            })?;
        links.insert(Hyperlink::new(entry.uri, entry.docname, entry.lineno));
    }

    Ok(links.into_vec())
}
