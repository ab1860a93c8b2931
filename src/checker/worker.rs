//! Worker loop
//!
//! Each worker repeatedly takes the earliest item from the scheduler,
//! defers it if it or its host is not yet due, classifies it, and sends the
//! result to the coordinator. Rate-limited links go back to the scheduler
//! instead of to the coordinator.

use crate::checker::classifier::CheckContext;
use crate::checker::hyperlink::{CheckResult, Hyperlink};
use crate::checker::scheduler::{QueueItem, Scheduler};
use crate::state::LinkStatus;
use crate::url::netloc_of;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::Instant;

/// How long a worker sleeps before putting back an item that is not due
pub const QUEUE_POLL: Duration = Duration::from_secs(1);

/// Runs one worker until it takes a shutdown item or the result channel
/// closes
pub async fn run_worker(
    id: usize,
    ctx: Arc<CheckContext>,
    scheduler: Arc<Scheduler>,
    results: UnboundedSender<CheckResult>,
) {
    tracing::debug!("Worker {} started", id);

    loop {
        let link = match scheduler.take().await {
            QueueItem::Shutdown => break,
            QueueItem::Work(link) => link,
        };

        if let Some(due_at) = pending_until(&ctx, &link) {
            // Sleep before putting the item back so other workers are not
            // woken just to defer it again
            tokio::time::sleep(QUEUE_POLL).await;
            scheduler.reschedule(link, due_at);
            continue;
        }

        let status = ctx.check(&link).await;
        if let LinkStatus::RateLimited { next_check } = status {
            tracing::info!("-rate limited-   {} | sleeping...", link.uri);
            scheduler.reschedule(link, next_check);
            continue;
        }

        if results.send(CheckResult::new(&link, status)).is_err() {
            tracing::debug!("Result channel closed, worker {} stopping", id);
            break;
        }
    }

    tracing::debug!("Worker {} stopped", id);
}

/// Returns the time `link` must wait for, if it is not due yet
///
/// The host's latest throttle record takes precedence over the time the
/// item was queued with, since another worker may have been throttled
/// while this item waited.
fn pending_until(ctx: &CheckContext, link: &Hyperlink) -> Option<Instant> {
    let due_at = netloc_of(&link.uri)
        .and_then(|netloc| ctx.rate_limiter.next_check(&netloc))
        .or(link.due_at)?;

    (due_at > Instant::now()).then_some(due_at)
}
