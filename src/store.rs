//! Durable baseline storage and filesystem snapshots
//!
//! The baseline lives in a single canonical-JSON file with a sidecar tag
//! file. Saves are atomic from a reader's perspective: content is written to
//! a temporary file in the same directory and renamed over the target, so a
//! crash mid-save leaves either the old baseline or the new one, never a
//! hybrid.

use crate::baseline::{Baseline, FileRecord};
use crate::error::{FileReadError, MonitorError};
use crate::hasher;
use crate::walker::{Walker, WalkerConfig};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Write bytes to `path` atomically via a sibling temp file and rename.
pub fn atomic_write(path: &Path, bytes: &[u8]) -> Result<(), MonitorError> {
    let file_name = path
        .file_name()
        .ok_or_else(|| MonitorError::InvalidPath(format!("{}", path.display())))?;
    let mut tmp_name = std::ffi::OsString::from(".");
    tmp_name.push(file_name);
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    fs::write(&tmp_path, bytes)?;
    if let Err(e) = fs::rename(&tmp_path, path) {
        // Leave no stray temp file behind on a failed rename.
        let _ = fs::remove_file(&tmp_path);
        return Err(MonitorError::Storage(e));
    }
    Ok(())
}

/// Result of walking and hashing the monitored tree.
///
/// Files that were listed but could not be read are recorded separately;
/// they are absent from the baseline and surfaced to the operator, distinct
/// from deleted files.
#[derive(Debug)]
pub struct Snapshot {
    pub baseline: Baseline,
    pub unreadable: Vec<FileReadError>,
}

/// Durable mapping from file path to last-known digest.
pub struct BaselineStore {
    path: PathBuf,
}

impl BaselineStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored baseline bytes exactly as persisted.
    ///
    /// Returns `None` when no baseline exists yet (first run, not an error).
    /// The raw bytes are what the integrity tag was computed over, so
    /// verification must happen against these bytes, never against a
    /// re-serialization.
    pub fn load_bytes(&self) -> Result<Option<Vec<u8>>, MonitorError> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(MonitorError::Storage(e)),
        }
    }

    /// Load the stored baseline, or an empty baseline when none exists.
    pub fn load(&self) -> Result<Baseline, MonitorError> {
        match self.load_bytes()? {
            Some(bytes) => Baseline::from_bytes(&bytes),
            None => Ok(Baseline::empty()),
        }
    }

    /// Persist the baseline atomically, returning the exact bytes written so
    /// the caller can sign them.
    pub fn save(&self, baseline: &Baseline) -> Result<Vec<u8>, MonitorError> {
        let bytes = baseline.canonical_bytes()?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        atomic_write(&self.path, &bytes)?;
        debug!(
            path = %self.path.display(),
            files = baseline.len(),
            "baseline persisted"
        );
        Ok(bytes)
    }
}

/// Walk the monitored tree and hash every regular file into a fresh baseline.
///
/// A file that disappears or turns unreadable at any point after listing
/// (stat or hashing) is recorded in `unreadable` and skipped; the walk
/// continues. Only a missing or unreadable root is fatal.
pub fn snapshot(root: &Path, config: &WalkerConfig) -> Result<Snapshot, MonitorError> {
    let walked = Walker::with_config(root.to_path_buf(), config.clone()).walk()?;

    let mut baseline = Baseline::empty();
    let mut unreadable = walked.unreadable;

    for entry in walked.entries {
        let rel = relative_key(root, &entry.path)?;
        match hasher::digest_file(&entry.path) {
            Ok(digest) => {
                baseline.insert(
                    rel,
                    FileRecord {
                        digest,
                        size: entry.size,
                        modified: entry.modified,
                    },
                );
            }
            Err(e) => {
                warn!(path = %entry.path.display(), "file unreadable during snapshot: {}", e);
                unreadable.push(FileReadError {
                    path: entry.path,
                    reason: e.to_string(),
                });
            }
        }
    }

    debug!(
        files = baseline.len(),
        unreadable = unreadable.len(),
        "snapshot complete"
    );
    Ok(Snapshot {
        baseline,
        unreadable,
    })
}

/// Express a walked path relative to the monitored root, `/`-separated.
///
/// Keys stay stable across hosts and across absolute/relative root spellings.
fn relative_key(root: &Path, path: &Path) -> Result<String, MonitorError> {
    let rel = path.strip_prefix(root).map_err(|_| {
        MonitorError::InvalidPath(format!(
            "{} is outside monitored root {}",
            path.display(),
            root.display()
        ))
    })?;

    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        return Err(MonitorError::InvalidPath(format!("{}", path.display())));
    }
    Ok(parts.join("/"))
}
