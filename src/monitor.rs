//! Monitoring cycle orchestration
//!
//! One cycle is a run-to-completion unit:
//!
//! ```text
//! Idle -> VerifyingBaseline -> Snapshotting -> Diffing -> Reporting -> Persisting -> Idle
//!                 \-> AlertingTamper -> halt (no snapshot, no persist)
//! ```
//!
//! The stored baseline is only trusted after its tag verifies against the
//! exact stored bytes. On verification failure the cycle stops before any
//! state is mutated: the tampered baseline is neither diffed against nor
//! overwritten, and recovery requires an explicit operator re-init. A missing
//! baseline is the first-run case and diffs against empty, but only when the
//! tag sidecar is also absent: a surviving tag means a baseline was sealed
//! here before and its deletion is treated as tamper. Report delivery is
//! best-effort and never blocks persistence; the new baseline is saved and
//! re-sealed in the same step so no cycle ever starts from an unsigned or
//! stale-signed baseline.

use crate::config::FimConfig;
use crate::diff::{diff, DiffReport};
use crate::error::{FileReadError, MonitorError};
use crate::reporter::{HttpReporter, Reporter};
use crate::seal::{self, Seal, StoredTag};
use crate::store::{atomic_write, snapshot, BaselineStore};
use crate::walker::WalkerConfig;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// What happened to the report of a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportDelivery {
    /// Nothing to send (empty diff) or no collector configured
    Skipped,
    Delivered,
    /// Collector unreachable or refused; logged, cycle still completed
    Failed(String),
}

/// Outcome of one completed cycle. Tamper and fatal errors travel on the
/// `Err` path of [`Monitor::run_cycle`] instead.
#[derive(Debug)]
pub struct CycleSummary {
    pub report: DiffReport,
    pub unreadable: Vec<FileReadError>,
    pub delivery: ReportDelivery,
    pub first_run: bool,
    /// Files in the newly persisted baseline
    pub baseline_files: usize,
}

impl CycleSummary {
    /// A clean cycle found no changes and read every listed file.
    pub fn is_clean(&self) -> bool {
        self.report.is_empty() && self.unreadable.is_empty()
    }
}

/// Outcome of an explicit baseline (re-)initialization.
#[derive(Debug)]
pub struct InitSummary {
    pub baseline_files: usize,
    pub unreadable: Vec<FileReadError>,
}

/// The monitoring agent: verifies, snapshots, diffs, reports, persists.
pub struct Monitor {
    root: PathBuf,
    walker: WalkerConfig,
    store: BaselineStore,
    tag_path: PathBuf,
    seal: Box<dyn Seal>,
    reporter: Option<Box<dyn Reporter>>,
}

impl Monitor {
    /// Build a monitor from validated configuration, loading key material.
    pub fn new(config: &FimConfig) -> Result<Self, MonitorError> {
        config.validate()?;
        let seal = seal::build_seal(&config.sealing)?;

        let reporter: Option<Box<dyn Reporter>> = match &config.report.url {
            Some(url) => {
                let http = HttpReporter::new(
                    url.clone(),
                    Duration::from_secs(config.report.timeout_secs),
                )
                .map_err(|e| MonitorError::Config(e.to_string()))?;
                Some(Box::new(http))
            }
            None => None,
        };

        Ok(Self::from_parts(
            config.monitor.root.clone(),
            config.walker.clone(),
            BaselineStore::new(config.baseline.path.clone()),
            config.baseline.tag_path.clone(),
            seal,
            reporter,
        ))
    }

    /// Assemble a monitor from explicit parts. Test seam and the constructor
    /// `new` delegates here.
    pub fn from_parts(
        root: PathBuf,
        walker: WalkerConfig,
        store: BaselineStore,
        tag_path: PathBuf,
        seal: Box<dyn Seal>,
        reporter: Option<Box<dyn Reporter>>,
    ) -> Self {
        Self {
            root,
            walker,
            store,
            tag_path,
            seal,
            reporter,
        }
    }

    /// Capture, persist and seal a fresh baseline without consulting the
    /// previous one.
    ///
    /// This is the explicit trust bootstrap: first provisioning, and the only
    /// sanctioned recovery path after tamper detection.
    pub fn init_baseline(&self) -> Result<InitSummary, MonitorError> {
        info!(root = %self.root.display(), "capturing fresh baseline");
        let snap = snapshot(&self.root, &self.walker)?;
        self.persist_and_seal(&snap.baseline)?;
        info!(
            files = snap.baseline.len(),
            unreadable = snap.unreadable.len(),
            "baseline created and sealed"
        );
        Ok(InitSummary {
            baseline_files: snap.baseline.len(),
            unreadable: snap.unreadable,
        })
    }

    /// Run one monitoring cycle.
    ///
    /// Errors are fatal to the cycle: `TamperDetected` when the stored
    /// baseline fails verification (nothing is snapshotted or persisted),
    /// `KeyLoad`/`Storage` when signing or persistence cannot proceed.
    pub async fn run_cycle(&self) -> Result<CycleSummary, MonitorError> {
        debug!(phase = "verifying", "cycle started");
        let (prior, first_run) = match self.store.load_bytes()? {
            None => {
                if self.tag_path.exists() {
                    error!(
                        tag = %self.tag_path.display(),
                        "baseline file is missing but its integrity tag survives; \
                         halting cycle, re-init required"
                    );
                    return Err(MonitorError::TamperDetected(format!(
                        "{} is missing but {} exists; a baseline was previously sealed here",
                        self.store.path().display(),
                        self.tag_path.display()
                    )));
                }
                info!("no baseline found; first run, diffing against empty");
                (crate::baseline::Baseline::empty(), true)
            }
            Some(bytes) => {
                if !seal::verify_stored(self.seal.as_ref(), &bytes, &self.tag_path) {
                    error!(
                        baseline = %self.store.path().display(),
                        "baseline failed verification; halting cycle, re-init required"
                    );
                    return Err(MonitorError::TamperDetected(format!(
                        "{} does not match its integrity tag",
                        self.store.path().display()
                    )));
                }
                debug!("baseline verified");
                (crate::baseline::Baseline::from_bytes(&bytes)?, false)
            }
        };

        debug!(phase = "snapshotting");
        let snap = snapshot(&self.root, &self.walker)?;

        debug!(phase = "diffing");
        let report = diff(&prior, &snap.baseline);

        debug!(phase = "reporting");
        let delivery = self.deliver(&report).await;

        debug!(phase = "persisting");
        self.persist_and_seal(&snap.baseline)?;

        if report.is_empty() {
            info!(files = snap.baseline.len(), "cycle complete, no changes");
        } else {
            info!(
                new = report.new.len(),
                deleted = report.deleted.len(),
                changed = report.changed.len(),
                "cycle complete, changes found"
            );
        }

        Ok(CycleSummary {
            report,
            unreadable: snap.unreadable,
            delivery,
            first_run,
            baseline_files: snap.baseline.len(),
        })
    }

    /// Run cycles forever on a fixed interval.
    ///
    /// Cycles are awaited sequentially, so two cycles can never overlap on
    /// the same baseline store. Returns the first fatal error (tamper, key,
    /// storage), which requires operator intervention.
    pub async fn run_watch(&self, interval: Duration) -> Result<(), MonitorError> {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        info!(interval_secs = interval.as_secs(), "watch mode started");

        loop {
            ticker.tick().await;
            self.run_cycle().await?;
        }
    }

    /// Send the report if there is anything to send and a collector is
    /// configured. Failure is logged and surfaced, never propagated.
    async fn deliver(&self, report: &DiffReport) -> ReportDelivery {
        if report.is_empty() {
            debug!("empty report, nothing to deliver");
            return ReportDelivery::Skipped;
        }
        let reporter = match &self.reporter {
            Some(reporter) => reporter,
            None => {
                debug!("no collector configured, report not delivered");
                return ReportDelivery::Skipped;
            }
        };
        match reporter.submit(report).await {
            Ok(()) => ReportDelivery::Delivered,
            Err(e) => {
                warn!("report delivery failed, continuing cycle: {}", e);
                ReportDelivery::Failed(e.to_string())
            }
        }
    }

    /// Persist the baseline and re-seal it in one step, keeping baseline and
    /// tag mutually consistent.
    fn persist_and_seal(&self, baseline: &crate::baseline::Baseline) -> Result<(), MonitorError> {
        let bytes = self.store.save(baseline)?;
        let tag = self.seal.sign(&bytes)?;
        let stored = StoredTag {
            scheme: self.seal.scheme(),
            bytes: tag,
        };
        atomic_write(&self.tag_path, stored.encode().as_bytes())?;
        Ok(())
    }
}
