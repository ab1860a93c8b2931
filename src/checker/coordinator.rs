//! Checker coordinator - main run orchestration logic
//!
//! This module contains the aggregation loop that coordinates a run:
//! - Starting and stopping the worker pool
//! - Short-circuiting ignored links into synthetic results
//! - Receiving exactly one result per scheduled link
//! - Logging each result and feeding the reports

use crate::checker::classifier::CheckContext;
use crate::checker::hyperlink::{CheckResult, Hyperlink};
use crate::checker::scheduler::Scheduler;
use crate::checker::worker::run_worker;
use crate::config::{Config, OutputConfig};
use crate::output::{open_reports, ReportWriter, RunStats};
use crate::state::{redirect_text, LinkStatus, WorkingInfo};
use crate::{Result, SumiError};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::task::JoinSet;

/// What a finished run produced
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub stats: RunStats,

    /// Whether any link ended up broken
    pub broken: bool,
}

impl RunOutcome {
    /// Process exit status for this outcome: 1 if anything broke, else 0
    pub fn exit_code(&self) -> u8 {
        u8::from(self.broken)
    }
}

/// Main checker coordinator structure
pub struct Coordinator {
    ctx: Arc<CheckContext>,
    scheduler: Arc<Scheduler>,
    workers: usize,
    output: OutputConfig,
}

impl Coordinator {
    /// Creates a new coordinator with a fresh per-run context
    ///
    /// # Arguments
    ///
    /// * `config` - The checker configuration
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Successfully created coordinator
    /// * `Err(SumiError)` - The HTTP client or a pattern failed to build
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self::with_context(config, CheckContext::new(config)?))
    }

    /// Creates a coordinator around an existing context
    pub fn with_context(config: &Config, ctx: CheckContext) -> Self {
        Self {
            ctx: Arc::new(ctx),
            scheduler: Arc::new(Scheduler::new()),
            workers: config.linkcheck.workers.max(1),
            output: config.output.clone(),
        }
    }

    /// Returns the shared run context
    pub fn context(&self) -> &CheckContext {
        &self.ctx
    }

    /// Checks every hyperlink and writes the reports
    ///
    /// This is the core run logic that:
    /// 1. Starts the worker pool and opens the reports
    /// 2. Schedules every link that is not ignored
    /// 3. Receives one result per scheduled link
    /// 4. Finalizes the reports
    /// 5. Sends one shutdown item per live worker and waits for them
    ///
    /// A worker that stops before shutdown fails the run with
    /// `SumiError::WorkerFailed`.
    pub async fn run(&self, hyperlinks: Vec<Hyperlink>) -> Result<RunOutcome> {
        let (tx, rx) = mpsc::unbounded_channel();

        let mut workers = JoinSet::new();
        for id in 0..self.workers {
            workers.spawn(run_worker(
                id,
                Arc::clone(&self.ctx),
                Arc::clone(&self.scheduler),
                tx.clone(),
            ));
        }
        // Only workers hold senders, so a closed channel means they all exited
        drop(tx);

        self.drive(hyperlinks, rx, workers).await
    }

    async fn drive(
        &self,
        hyperlinks: Vec<Hyperlink>,
        rx: UnboundedReceiver<CheckResult>,
        mut workers: JoinSet<()>,
    ) -> Result<RunOutcome> {
        let outcome = match open_reports(&self.output) {
            Ok(mut reports) => {
                self.aggregate(hyperlinks, rx, &mut workers, &mut reports)
                    .await
            }
            Err(e) => Err(e.into()),
        };

        self.scheduler.shutdown(workers.len());
        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                tracing::error!("Worker task failed: {}", e);
            }
        }

        outcome
    }

    async fn aggregate(
        &self,
        hyperlinks: Vec<Hyperlink>,
        mut rx: UnboundedReceiver<CheckResult>,
        workers: &mut JoinSet<()>,
        reports: &mut [Box<dyn ReportWriter>],
    ) -> Result<RunOutcome> {
        let mut stats = RunStats::new();
        let mut scheduled = 0usize;

        for link in hyperlinks {
            if self.ctx.is_ignored(&link.uri) {
                let result = CheckResult::new(&link, LinkStatus::ignored(""));
                process_result(&result, reports, &mut stats)?;
            } else {
                self.scheduler.schedule(link);
                scheduled += 1;
            }
        }
        tracing::debug!("Scheduled {} links on {} workers", scheduled, self.workers);

        let mut received = 0usize;
        while received < scheduled {
            let remaining = scheduled - received;
            tokio::select! {
                result = rx.recv() => {
                    let result = result.ok_or(SumiError::WorkersExited { remaining })?;
                    received += 1;
                    process_result(&result, reports, &mut stats)?;
                }
                // Workers only return after a shutdown item, which is not
                // sent until every result is in
                Some(joined) = workers.join_next() => {
                    let reason = match joined {
                        Ok(()) => "exited early".to_string(),
                        Err(e) => e.to_string(),
                    };
                    tracing::error!("Worker stopped mid-run: {}", reason);
                    return Err(SumiError::WorkerFailed { remaining, reason });
                }
            }
        }

        for report in reports.iter_mut() {
            report.finish()?;
        }

        stats.throttled_hosts = self.ctx.rate_limiter.throttled_hosts();
        Ok(RunOutcome {
            broken: stats.broken() > 0,
            stats,
        })
    }
}

/// Logs one result and hands it to every report
///
/// Returns `SumiError::UnexpectedStatus` for a rate-limited result, which
/// workers must never send.
fn process_result(
    result: &CheckResult,
    reports: &mut [Box<dyn ReportWriter>],
    stats: &mut RunStats,
) -> Result<()> {
    let uri = &result.uri;
    let location = result
        .lineno
        .map(|line| format!("(line {:4}) ", line))
        .unwrap_or_default();

    match &result.status {
        LinkStatus::Unchecked => tracing::debug!("-unchecked- {}", uri),
        LinkStatus::Working(WorkingInfo::Cached) => tracing::debug!("{}ok (cached) {}", location, uri),
        LinkStatus::Ignored { reason } if reason.is_empty() => {
            tracing::info!("{}-ignored- {}", location, uri)
        }
        LinkStatus::Ignored { reason } => tracing::info!("{}-ignored- {}: {}", location, uri, reason),
        LinkStatus::Local => tracing::info!("{}-local-   {}", location, uri),
        LinkStatus::Working(info) => tracing::info!("{}ok        {}{}", location, uri, info.as_str()),
        LinkStatus::Broken { reason } => tracing::warn!(
            "{}broken    {} - {} ({})",
            location,
            uri,
            reason,
            result.docname.as_deref().unwrap_or("?")
        ),
        LinkStatus::Redirected { target, code } => tracing::info!(
            "{}redirect  {} - {} to {}",
            location,
            uri,
            redirect_text(*code),
            target
        ),
        LinkStatus::RateLimited { .. } => {
            return Err(SumiError::UnexpectedStatus {
                uri: uri.clone(),
                status: result.status.name().to_string(),
            })
        }
    }

    for report in reports.iter_mut() {
        report.record(result)?;
    }
    stats.record(&result.status);
    Ok(())
}

/// Runs a complete check over `hyperlinks` with a fresh context
///
/// # Arguments
///
/// * `config` - The checker configuration
/// * `hyperlinks` - Deduplicated links in traversal order
///
/// # Returns
///
/// * `Ok(RunOutcome)` - Every link was classified and reported
/// * `Err(SumiError)` - The run could not complete
pub async fn run_linkcheck(config: &Config, hyperlinks: Vec<Hyperlink>) -> Result<RunOutcome> {
    let coordinator = Coordinator::new(config)?;
    tracing::info!(
        "Checking {} links with {} workers",
        hyperlinks.len(),
        coordinator.workers
    );
    coordinator.run(hyperlinks).await
}
