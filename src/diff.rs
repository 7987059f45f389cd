//! Diff engine: classify files as new, deleted, or modified
//!
//! Pure function over two baselines. Comparison is by digest only; size and
//! mtime are diagnostic fields and never influence classification, so clock
//! skew or metadata-only churn cannot produce false results. O(n) in total
//! file count via map lookups.

use crate::baseline::Baseline;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;

/// Changes between the trusted baseline and the current snapshot.
///
/// Produced once per cycle and handed to the reporter; the core retains no
/// history of reports.
#[derive(Debug, Clone, Serialize)]
pub struct DiffReport {
    pub new: BTreeSet<String>,
    pub deleted: BTreeSet<String>,
    pub changed: BTreeSet<String>,
    pub timestamp: DateTime<Utc>,
}

impl DiffReport {
    pub fn is_empty(&self) -> bool {
        self.new.is_empty() && self.deleted.is_empty() && self.changed.is_empty()
    }

    pub fn total_changes(&self) -> usize {
        self.new.len() + self.deleted.len() + self.changed.len()
    }
}

/// Compare a current snapshot against the trusted baseline.
///
/// - in `current` but not `baseline` → new
/// - in both with differing digest → changed
/// - in `baseline` but not `current` → deleted
///
/// A path present in both with an identical digest is unchanged and omitted.
pub fn diff(baseline: &Baseline, current: &Baseline) -> DiffReport {
    let mut new = BTreeSet::new();
    let mut changed = BTreeSet::new();
    let mut deleted = BTreeSet::new();

    for (path, record) in current.iter() {
        match baseline.get(path) {
            None => {
                new.insert(path.clone());
            }
            Some(prior) if prior.digest != record.digest => {
                changed.insert(path.clone());
            }
            Some(_) => {}
        }
    }

    for (path, _) in baseline.iter() {
        if !current.contains(path) {
            deleted.insert(path.clone());
        }
    }

    DiffReport {
        new,
        deleted,
        changed,
        timestamp: Utc::now(),
    }
}
