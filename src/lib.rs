//! Fim: File Integrity Monitoring with Signed Baselines
//!
//! Periodically hashes a monitored directory tree, compares the result against
//! a cryptographically sealed baseline, reports additions/deletions/changes to
//! a collector, and re-seals the new baseline. A baseline that fails
//! verification is never trusted and never overwritten.

pub mod baseline;
pub mod cli;
pub mod config;
pub mod diff;
pub mod error;
pub mod hasher;
pub mod logging;
pub mod monitor;
pub mod reporter;
pub mod seal;
pub mod store;
pub mod types;
pub mod walker;
