//! Configuration module for Sumi-Linkcheck
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use sumi_linkcheck::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("linkcheck.toml")).unwrap();
//! println!("Checking with {} workers", config.linkcheck.workers);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    AuthEntry, Config, LinkcheckConfig, OutputConfig, SourceConfig, UserAgentConfig,
    DEFAULT_TIMEOUT_SECS,
};

// Re-export parser functions
pub use parser::{hash_config, load_config, load_config_with_hash, parse_config};
