//! Progress view caching.
//!
//! This module provides the `ProgressViewCache` for keeping recently built
//! progress views in memory, keyed by enrollment id. Views are considered
//! stale after 5 minutes and are dropped as soon as a lesson completion
//! changes the enrollment they were built from.

pub mod manager;

pub use manager::{CachedData, ProgressViewCache};
