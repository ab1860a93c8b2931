//! URL handling module for Sumi-Linkcheck
//!
//! This module provides the small URI utilities the checker needs: netloc
//! extraction for rate-limit bookkeeping, URI-shape tests used to skip
//! unsupported schemes, regex pattern sets for the ignore/auth rules, and
//! encoding of non-ASCII targets before dispatch.

mod domain;
mod encode;
mod matcher;

// Re-export main functions
pub use domain::{extract_netloc, netloc_of, origin_of};
pub use encode::{encode_uri, is_http, is_unchecked_target, looks_like_uri, split_fragment};
pub use matcher::PatternSet;
