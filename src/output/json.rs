//! Structured report (`output.json`), one JSON object per line
//!
//! Every terminal result gets a record, including unchecked and cached ones.

use crate::checker::CheckResult;
use crate::output::traits::{entry_key, LineSink, OutputResult, ReportWriter};
use crate::state::{redirect_text, LinkStatus};
use serde::Serialize;
use std::path::Path;

/// File name of the JSON report inside the output directory
pub const JSON_REPORT: &str = "output.json";

/// One record of the JSON report
#[derive(Debug, Serialize)]
pub struct LinkStat<'a> {
    pub filename: Option<&'a str>,
    pub lineno: Option<u32>,
    pub status: &'a str,
    pub code: u16,
    pub uri: &'a str,
    pub info: &'a str,

    /// Redirect wording, only present for redirects
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<&'static str>,
}

impl<'a> From<&'a CheckResult> for LinkStat<'a> {
    fn from(result: &'a CheckResult) -> Self {
        let text = match &result.status {
            LinkStatus::Redirected { code, .. } => Some(redirect_text(*code)),
            _ => None,
        };

        Self {
            filename: result.docname.as_deref(),
            lineno: result.lineno,
            status: result.status.name(),
            code: result.code(),
            uri: &result.uri,
            info: result.info(),
            text,
        }
    }
}

#[derive(Debug)]
pub struct JsonReport {
    sink: LineSink,
}

impl JsonReport {
    /// Creates `output.json` in `directory`
    pub fn create(directory: &Path, sort: bool) -> OutputResult<Self> {
        Ok(Self {
            sink: LineSink::create(&directory.join(JSON_REPORT), sort)?,
        })
    }
}

impl ReportWriter for JsonReport {
    fn record(&mut self, result: &CheckResult) -> OutputResult<()> {
        let line = serde_json::to_string(&LinkStat::from(result))?;
        self.sink.push(entry_key(result), line)
    }

    fn finish(&mut self) -> OutputResult<()> {
        self.sink.finish()
    }
}
