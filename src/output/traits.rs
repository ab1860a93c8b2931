//! Report writer trait and shared line buffering
//!
//! This module defines the trait interface for report writers and the
//! buffered line sink both report formats write through.

use crate::checker::CheckResult;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to format output: {0}")]
    Format(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Trait for report writers
///
/// The coordinator hands every terminal result to each writer as it
/// arrives, then calls `finish` once after the last one.
pub trait ReportWriter: Send {
    /// Records one result
    ///
    /// # Arguments
    ///
    /// * `result` - A terminal check result
    fn record(&mut self, result: &CheckResult) -> OutputResult<()>;

    /// Writes anything buffered and flushes the destination
    fn finish(&mut self) -> OutputResult<()>;
}

/// Ordering key for report lines: document, line, URI
pub type EntryKey = (String, u32, String);

/// Returns the sort key for a result
pub fn entry_key(result: &CheckResult) -> EntryKey {
    (
        result.docname.clone().unwrap_or_default(),
        result.lineno.unwrap_or(0),
        result.uri.clone(),
    )
}

/// A line-oriented file that either streams lines or buffers and sorts them
#[derive(Debug)]
pub struct LineSink {
    path: PathBuf,
    writer: BufWriter<File>,
    sort: bool,
    pending: Vec<(EntryKey, String)>,
}

impl LineSink {
    /// Creates (truncating) the file at `path`
    pub fn create(path: &Path, sort: bool) -> OutputResult<Self> {
        let file = File::create(path).map_err(|source| OutputError::Write {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
            sort,
            pending: Vec::new(),
        })
    }

    /// Adds one line (without its newline)
    pub fn push(&mut self, key: EntryKey, line: String) -> OutputResult<()> {
        if self.sort {
            self.pending.push((key, line));
            Ok(())
        } else {
            self.write_line(&line)
        }
    }

    /// Writes the buffered lines in key order and flushes
    pub fn finish(&mut self) -> OutputResult<()> {
        let mut pending = std::mem::take(&mut self.pending);
        // Stable, so duplicates keep arrival order
        pending.sort_by(|a, b| a.0.cmp(&b.0));
        for (_, line) in &pending {
            self.write_line(line)?;
        }

        self.writer.flush().map_err(|source| OutputError::Write {
            path: self.path.clone(),
            source,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_line(&mut self, line: &str) -> OutputResult<()> {
        writeln!(self.writer, "{}", line).map_err(|source| OutputError::Write {
            path: self.path.clone(),
            source,
        })
    }
}
