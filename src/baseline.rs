//! Baseline snapshot model and canonical serialization
//!
//! A baseline is the last trusted state of the monitored tree: one record per
//! regular file, keyed by the file's path relative to the monitored root.
//! Records are immutable once captured; the whole baseline is replaced on
//! each successful cycle, never patched in place.
//!
//! Canonical bytes: the integrity tag is computed over the serialized
//! baseline, so serialization must be deterministic. Field order is fixed by
//! the struct definitions and paths iterate in lexicographic order via
//! `BTreeMap`, so re-serializing unchanged content always yields byte-identical
//! input to the tag function.

use crate::error::MonitorError;
use crate::types::{hex_digest, Digest};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Baseline format version, bumped on incompatible layout changes.
const BASELINE_VERSION: u32 = 1;

/// State of a single file at capture time.
///
/// `size` and `modified` are diagnostic fields only; change detection
/// compares digests exclusively, so metadata-only churn and clock skew can
/// never produce false results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    #[serde(with = "hex_digest")]
    pub digest: Digest,
    pub size: u64,
    /// Modification time as unix seconds
    pub modified: i64,
}

/// The last trusted snapshot of the monitored tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Baseline {
    version: u32,
    /// Relative path (forward slashes) to file record. `BTreeMap` gives
    /// path uniqueness and stable lexicographic iteration.
    records: BTreeMap<String, FileRecord>,
}

impl Baseline {
    /// Create an empty baseline (first-run state).
    pub fn empty() -> Self {
        Self {
            version: BASELINE_VERSION,
            records: BTreeMap::new(),
        }
    }

    /// Insert a record, replacing any previous record for the same path.
    pub fn insert(&mut self, path: String, record: FileRecord) {
        self.records.insert(path, record);
    }

    pub fn get(&self, path: &str) -> Option<&FileRecord> {
        self.records.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.records.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate records in lexicographic path order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &FileRecord)> {
        self.records.iter()
    }

    /// Serialize to canonical bytes.
    ///
    /// This is the exact byte sequence that gets persisted and signed.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>, MonitorError> {
        let mut bytes = serde_json::to_vec_pretty(self)?;
        bytes.push(b'\n');
        Ok(bytes)
    }

    /// Parse a baseline from stored bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, MonitorError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
