//! Line-oriented text report (`output.txt`)
//!
//! Only broken, local and redirected results produce a line:
//!
//! ```text
//! guide/index.html:12: [broken] https://example.com/gone: 404 Client Error: Not Found for url: https://example.com/gone
//! guide/index.html:14: [local] ../install.html
//! guide/index.html:20: [redirected permanently] https://example.com/old to https://example.com/new
//! ```

use crate::checker::CheckResult;
use crate::output::traits::{entry_key, LineSink, OutputResult, ReportWriter};
use crate::state::{redirect_text, LinkStatus};
use std::path::Path;

/// File name of the text report inside the output directory
pub const TEXT_REPORT: &str = "output.txt";

#[derive(Debug)]
pub struct TextReport {
    sink: LineSink,
}

impl TextReport {
    /// Creates `output.txt` in `directory`
    pub fn create(directory: &Path, sort: bool) -> OutputResult<Self> {
        Ok(Self {
            sink: LineSink::create(&directory.join(TEXT_REPORT), sort)?,
        })
    }
}

/// Formats the report line for `result`, if it gets one
pub fn format_entry(result: &CheckResult) -> Option<String> {
    let (what, detail) = match &result.status {
        LinkStatus::Broken { reason } => ("broken".to_string(), format!("{}: {}", result.uri, reason)),
        LinkStatus::Local => ("local".to_string(), result.uri.clone()),
        LinkStatus::Redirected { target, code } => (
            format!("redirected {}", redirect_text(*code)),
            format!("{} to {}", result.uri, target),
        ),
        _ => return None,
    };

    Some(format!(
        "{}:{}: [{}] {}",
        result.docname.as_deref().unwrap_or_default(),
        result.lineno.unwrap_or(0),
        what,
        detail
    ))
}

impl ReportWriter for TextReport {
    fn record(&mut self, result: &CheckResult) -> OutputResult<()> {
        match format_entry(result) {
            Some(line) => self.sink.push(entry_key(result), line),
            None => Ok(()),
        }
    }

    fn finish(&mut self) -> OutputResult<()> {
        self.sink.finish()
    }
}
