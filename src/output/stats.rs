//! Run statistics
//!
//! This module counts the outcomes of a run and prints them once the run
//! is over.

use crate::state::{LinkStatus, WorkingInfo};
use std::collections::HashMap;

/// Link check statistics summary
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    /// Total number of results received
    pub total: u64,

    /// Count of results by status name
    pub by_status: HashMap<&'static str, u64>,

    /// Working results answered from the cache
    pub cached: u64,

    /// Working results that required authentication
    pub unauthorized: u64,

    /// Hosts still throttled when the run ended
    pub throttled_hosts: Vec<String>,
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one terminal result
    pub fn record(&mut self, status: &LinkStatus) {
        self.total += 1;
        *self.by_status.entry(status.name()).or_insert(0) += 1;

        match status {
            LinkStatus::Working(WorkingInfo::Cached) => self.cached += 1,
            LinkStatus::Working(WorkingInfo::Unauthorized) => self.unauthorized += 1,
            _ => {}
        }
    }

    /// Returns the number of results with the given status name
    pub fn count(&self, status: &str) -> u64 {
        self.by_status.get(status).copied().unwrap_or(0)
    }

    pub fn broken(&self) -> u64 {
        self.count("broken")
    }
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &RunStats) {
    println!("=== Link Check Statistics ===\n");

    println!("Overview:");
    println!("  Total links checked: {}", stats.total);
    println!("  Answered from cache: {}", stats.cached);
    println!("  Behind authentication: {}", stats.unauthorized);
    println!();

    println!("Links by Status:");
    // Sort states by count (descending), then name for ties
    let mut status_counts: Vec<_> = stats.by_status.iter().collect();
    status_counts.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));

    for (status, count) in status_counts {
        let percentage = if stats.total > 0 {
            (*count as f64 / stats.total as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", status, count, percentage);
    }
    println!();

    if !stats.throttled_hosts.is_empty() {
        println!("Rate Limited Hosts ({}):", stats.throttled_hosts.len());
        for host in &stats.throttled_hosts {
            println!("  - {}", host);
        }
        println!();
    }

    if stats.broken() == 0 {
        println!("No broken links found.");
    } else {
        println!("Broken: {} / {} links", stats.broken(), stats.total);
    }
}
