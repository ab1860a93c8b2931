//! State module for tracking link check outcomes
//!
//! This module provides the shared state of a link check run.
//!
//! # Components
//!
//! - `LinkStatus`: the classification of one hyperlink after one attempt
//! - `RateLimiter`: per-host throttle records derived from 429 responses
//! - `LinkCache`: memoized outcomes so repeated URIs are checked once

mod cache;
mod link_status;
mod rate_limit;

// Re-export main types
pub use cache::LinkCache;
pub use link_status::{redirect_text, LinkStatus, WorkingInfo};
pub use rate_limit::{compute_backoff, RateLimit, RateLimiter, RetryAfter, DEFAULT_DELAY};
