//! Scheduler for ordering pending link checks
//!
//! This module handles:
//! - A time-ordered priority queue of hyperlinks awaiting a check
//! - Deferred re-insertion of rate-limited and not-yet-due links
//! - Blocking hand-off to workers via a counting semaphore
//! - Cooperative shutdown through per-worker shutdown items

use crate::checker::hyperlink::Hyperlink;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::Semaphore;
use tokio::time::Instant;

/// An entry in the work queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueItem {
    /// Tells the worker that takes it to stop
    Shutdown,

    /// A hyperlink to check
    Work(Hyperlink),
}

impl QueueItem {
    fn work_key(link: &Hyperlink) -> (Option<Instant>, &str, Option<&str>, Option<u32>) {
        (
            link.due_at,
            link.uri.as_str(),
            link.docname.as_deref(),
            link.lineno,
        )
    }
}

// Implement ordering traits for priority queue
// Items that should be taken first compare greatest (are popped first from BinaryHeap):
// shutdown before any work, then earliest due time, then (uri, docname, lineno)
impl Ord for QueueItem {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Shutdown, Self::Shutdown) => Ordering::Equal,
            (Self::Shutdown, Self::Work(_)) => Ordering::Greater,
            (Self::Work(_), Self::Shutdown) => Ordering::Less,
            // Reverse comparison so earlier keys come first
            (Self::Work(a), Self::Work(b)) => Self::work_key(b).cmp(&Self::work_key(a)),
        }
    }
}

impl PartialOrd for QueueItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Time-ordered queue shared by the coordinator and all workers
///
/// The semaphore holds one permit per queued item, so `take` suspends
/// without spinning while the queue is empty and wakes exactly one waiter
/// per inserted item.
#[derive(Debug)]
pub struct Scheduler {
    /// Pending items
    queue: Mutex<BinaryHeap<QueueItem>>,

    /// One permit per item in `queue`
    available: Semaphore,
}

impl Scheduler {
    /// Creates an empty scheduler
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(BinaryHeap::new()),
            available: Semaphore::new(0),
        }
    }

    /// Adds a hyperlink to the queue; never blocks
    pub fn schedule(&self, link: Hyperlink) {
        self.push(QueueItem::Work(link));
    }

    /// Puts a hyperlink back so it is taken no earlier than `due_at`
    ///
    /// Ordering against the rest of the queue follows from the new due time
    /// and the hyperlink's own identity, so nothing else loses its place.
    pub fn reschedule(&self, link: Hyperlink, due_at: Instant) {
        tracing::trace!(
            "Rescheduling {} in {:?}",
            link.uri,
            due_at.saturating_duration_since(Instant::now())
        );
        self.push(QueueItem::Work(link.due(due_at)));
    }

    /// Queues one shutdown item per worker
    pub fn shutdown(&self, workers: usize) {
        for _ in 0..workers {
            self.push(QueueItem::Shutdown);
        }
    }

    /// Takes the earliest item, waiting until one is available
    pub async fn take(&self) -> QueueItem {
        loop {
            match self.available.acquire().await {
                Ok(permit) => permit.forget(),
                // The semaphore is never closed; treat it as a stop signal if it is
                Err(_) => return QueueItem::Shutdown,
            }

            if let Some(item) = self.lock().pop() {
                return item;
            }
        }
    }

    /// Takes the earliest item if one is queued
    pub fn try_take(&self) -> Option<QueueItem> {
        let permit = self.available.try_acquire().ok()?;
        permit.forget();
        self.lock().pop()
    }

    /// Returns the number of queued items
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns whether the queue is empty
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn push(&self, item: QueueItem) {
        self.lock().push(item);
        self.available.add_permits(1);
    }

    fn lock(&self) -> MutexGuard<'_, BinaryHeap<QueueItem>> {
        self.queue.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}
