//! Report submission to the external collector
//!
//! The collector is a thin storage-and-render endpoint outside this crate.
//! Delivery is best-effort: a failure is logged and surfaced in the cycle
//! summary, but it never blocks baseline persistence and is not retried
//! within the cycle.

use crate::diff::DiffReport;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeSet;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Delivery failure. Logged by the caller, never fatal to the cycle.
#[derive(Debug, Error)]
#[error("report delivery failed: {0}")]
pub struct ReportError(pub String);

/// Receiving end of a diff report.
#[async_trait]
pub trait Reporter: Send + Sync {
    /// Submit a report. Any acknowledged receipt is success.
    async fn submit(&self, report: &DiffReport) -> Result<(), ReportError>;
}

/// Wire payload: `{"new": [...], "deleted": [...], "changed": [...]}`.
#[derive(Serialize)]
struct ReportPayload<'a> {
    new: &'a BTreeSet<String>,
    deleted: &'a BTreeSet<String>,
    changed: &'a BTreeSet<String>,
}

/// HTTP reporter posting JSON to the collector's report endpoint.
pub struct HttpReporter {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpReporter {
    pub fn new(endpoint: String, timeout: Duration) -> Result<Self, ReportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ReportError(format!("failed to build http client: {}", e)))?;
        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl Reporter for HttpReporter {
    async fn submit(&self, report: &DiffReport) -> Result<(), ReportError> {
        let payload = ReportPayload {
            new: &report.new,
            deleted: &report.deleted,
            changed: &report.changed,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ReportError(format!("{}: {}", self.endpoint, e)))?;

        if !response.status().is_success() {
            return Err(ReportError(format!(
                "{} answered {}",
                self.endpoint,
                response.status()
            )));
        }

        debug!(endpoint = %self.endpoint, changes = report.total_changes(), "report delivered");
        Ok(())
    }
}
