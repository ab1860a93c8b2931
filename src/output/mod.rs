//! Output module for link check reports
//!
//! This module handles:
//! - Writing the line-oriented text report (`output.txt`)
//! - Writing the structured JSON-lines report (`output.json`)
//! - Recording and printing run statistics

mod json;
pub mod stats;
mod text;
mod traits;

pub use json::{JsonReport, LinkStat, JSON_REPORT};
pub use stats::{print_statistics, RunStats};
pub use text::{format_entry, TextReport, TEXT_REPORT};
pub use traits::{entry_key, EntryKey, LineSink, OutputError, OutputResult, ReportWriter};

use crate::config::OutputConfig;
use std::path::Path;

/// Creates the output directory and opens both reports in it
///
/// # Arguments
///
/// * `config` - The output configuration
///
/// # Returns
///
/// * `Ok(Vec<Box<dyn ReportWriter>>)` - The text and JSON reports
/// * `Err(OutputError)` - The directory or a file could not be created
pub fn open_reports(config: &OutputConfig) -> OutputResult<Vec<Box<dyn ReportWriter>>> {
    let directory = Path::new(&config.directory);
    std::fs::create_dir_all(directory).map_err(|source| OutputError::Write {
        path: directory.to_path_buf(),
        source,
    })?;

    Ok(vec![
        Box::new(TextReport::create(directory, config.sort_entries)?),
        Box::new(JsonReport::create(directory, config.sort_entries)?),
    ])
}
