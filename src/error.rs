//! Error types for the file integrity monitoring system.
//!
//! The taxonomy separates fatal cycle errors (tamper, key material, storage)
//! from recoverable per-file conditions, which are carried as data in the
//! snapshot rather than as errors. A failed verification is never silently
//! mapped to an empty baseline: that would manufacture a flood of false
//! "new file" alerts and mask the tampering itself.

use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors for a monitoring cycle. Any of these halts the cycle before
/// a new baseline is persisted.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// The stored baseline failed signature verification. The existing
    /// baseline must not be trusted for diffing and must not be overwritten;
    /// operator intervention (an explicit re-init) is required.
    #[error("baseline tamper detected: {0}")]
    TamperDetected(String),

    /// Key material missing or malformed. Signing/verifying cannot proceed
    /// safely, so this is treated with the same severity as tampering.
    #[error("key load failed: {0}")]
    KeyLoad(String),

    /// Baseline or tag file unreadable/unwritable.
    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// Baseline bytes could not be serialized or parsed.
    #[error("baseline encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    /// A path could not be expressed relative to the monitored root.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("configuration error: {0}")]
    Config(String),
}

/// A single file that was listed during the walk but could not be read.
///
/// Distinct from "deleted": deleted means absent from the listing, while this
/// means present but unreadable (e.g. removed between listing and hashing).
/// Recorded and surfaced, never aborts the cycle.
#[derive(Debug, Clone)]
pub struct FileReadError {
    pub path: PathBuf,
    pub reason: String,
}

impl std::fmt::Display for FileReadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.reason)
    }
}
