//! Checker module for validating hyperlinks against the network
//!
//! This module contains the core checking logic, including:
//! - The time-ordered work scheduler and the worker pool
//! - HTTP fetching with manual redirect following
//! - Anchor verification over streamed bodies
//! - Per-link classification and overall run coordination

mod anchor;
mod classifier;
mod coordinator;
mod fetcher;
mod hyperlink;
mod scheduler;
mod worker;

pub use anchor::{check_anchor, AnchorScanner, CHUNK_SIZE};
pub use classifier::{CheckContext, DEFAULT_ACCEPT};
pub use coordinator::{run_linkcheck, Coordinator, RunOutcome};
pub use fetcher::{build_http_client, get, head, FetchError, Fetched, RequestSpec, MAX_REDIRECTS};
pub use hyperlink::{CheckResult, Hyperlink};
pub use scheduler::{QueueItem, Scheduler};
pub use worker::{run_worker, QUEUE_POLL};
