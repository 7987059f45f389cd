//! Filesystem walker for the monitored directory tree
//!
//! Collects regular files only. Symbolic links are not followed by default:
//! following links makes walks non-deterministic (cycles, targets outside the
//! monitored root), and the baseline must be reproducible.

use crate::error::{FileReadError, MonitorError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use tracing::warn;
use walkdir::{DirEntry, WalkDir};

/// A regular file found during the walk, with auxiliary metadata.
#[derive(Debug, Clone)]
pub struct FileEntry {
    pub path: PathBuf,
    pub size: u64,
    /// Modification time as unix seconds. Diagnostic only; never a
    /// comparison key.
    pub modified: i64,
}

/// Walker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkerConfig {
    /// Whether to follow symbolic links (default: false for determinism)
    #[serde(default)]
    pub follow_symlinks: bool,
    /// Directory/file names to ignore (matched against path components)
    #[serde(default = "default_ignore_patterns")]
    pub ignore_patterns: Vec<String>,
    /// Maximum depth to traverse (None = unlimited)
    #[serde(default)]
    pub max_depth: Option<usize>,
}

fn default_ignore_patterns() -> Vec<String> {
    vec![".git".to_string()]
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self {
            follow_symlinks: false,
            ignore_patterns: default_ignore_patterns(),
            max_depth: None,
        }
    }
}

/// Result of a walk: the regular files found, plus entries that were listed
/// but could not be read or stat'd and were skipped.
#[derive(Debug)]
pub struct WalkOutcome {
    pub entries: Vec<FileEntry>,
    pub unreadable: Vec<FileReadError>,
}

/// Filesystem walker
pub struct Walker {
    root: PathBuf,
    config: WalkerConfig,
}

impl Walker {
    /// Create a new walker for the given root path
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            config: WalkerConfig::default(),
        }
    }

    /// Create a walker with custom configuration
    pub fn with_config(root: PathBuf, config: WalkerConfig) -> Self {
        Self { root, config }
    }

    /// Walk the monitored tree and collect every regular file.
    ///
    /// Returns entries sorted by path for determinism. Only a missing or
    /// unreadable root is a `Storage` error: there is nothing meaningful to
    /// diff against. An entry that vanishes or turns unreadable mid-walk
    /// (listing races with deletion) is recorded and skipped, never fatal.
    pub fn walk(&self) -> Result<WalkOutcome, MonitorError> {
        let mut entries = Vec::new();
        let mut unreadable = Vec::new();

        let walker = WalkDir::new(&self.root)
            .follow_links(self.config.follow_symlinks)
            .max_depth(self.config.max_depth.unwrap_or(usize::MAX));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => {
                    return Err(MonitorError::Storage(std::io::Error::new(
                        std::io::ErrorKind::Other,
                        format!("failed to walk {}: {}", self.root.display(), e),
                    )));
                }
                Err(e) => {
                    let path = e
                        .path()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| self.root.clone());
                    warn!(path = %path.display(), "entry unreadable during walk: {}", e);
                    unreadable.push(FileReadError {
                        path,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            if self.should_ignore(&entry) {
                continue;
            }

            // The entry can be unlinked between directory listing and the
            // stat call.
            let metadata = match entry.metadata() {
                Ok(metadata) => metadata,
                Err(e) => {
                    warn!(
                        path = %entry.path().display(),
                        "metadata unavailable during walk: {}", e
                    );
                    unreadable.push(FileReadError {
                        path: entry.path().to_path_buf(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            if !metadata.is_file() {
                continue;
            }

            let modified = metadata
                .modified()
                .ok()
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map(|d| d.as_secs() as i64)
                .unwrap_or(0);

            entries.push(FileEntry {
                path: entry.path().to_path_buf(),
                size: metadata.len(),
                modified,
            });
        }

        entries.sort_by(|a, b| a.path.cmp(&b.path));
        unreadable.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(WalkOutcome {
            entries,
            unreadable,
        })
    }

    /// Check if an entry should be ignored based on ignore patterns
    fn should_ignore(&self, entry: &DirEntry) -> bool {
        for pattern in &self.config.ignore_patterns {
            for component in entry.path().components() {
                if let std::path::Component::Normal(name) = component {
                    if name.to_string_lossy() == pattern.as_str() {
                        return true;
                    }
                }
            }
        }
        false
    }
}
