//! End-to-end monitoring cycle tests over real temp directories.

use async_trait::async_trait;
use ed25519_dalek::SigningKey;
use fim::baseline::Baseline;
use fim::diff::DiffReport;
use fim::error::MonitorError;
use fim::monitor::{Monitor, ReportDelivery};
use fim::reporter::{ReportError, Reporter};
use fim::seal::{Ed25519Seal, HmacSeal, Seal};
use fim::store::BaselineStore;
use fim::walker::WalkerConfig;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Records every submitted report; optionally refuses them all.
struct RecordingReporter {
    submissions: Arc<Mutex<Vec<DiffReport>>>,
    fail: bool,
}

#[async_trait]
impl Reporter for RecordingReporter {
    async fn submit(&self, report: &DiffReport) -> Result<(), ReportError> {
        self.submissions.lock().unwrap().push(report.clone());
        if self.fail {
            Err(ReportError("collector is down".to_string()))
        } else {
            Ok(())
        }
    }
}

struct Harness {
    dir: TempDir,
    submissions: Arc<Mutex<Vec<DiffReport>>>,
}

impl Harness {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("monitored")).unwrap();
        Self {
            dir,
            submissions: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn root(&self) -> std::path::PathBuf {
        self.dir.path().join("monitored")
    }

    fn baseline_path(&self) -> std::path::PathBuf {
        self.dir.path().join("baseline.json")
    }

    fn tag_path(&self) -> std::path::PathBuf {
        self.dir.path().join("baseline.sig")
    }

    fn monitor_with(&self, seal: Box<dyn Seal>, fail_reports: bool) -> Monitor {
        Monitor::from_parts(
            self.root(),
            WalkerConfig::default(),
            BaselineStore::new(self.baseline_path()),
            self.tag_path(),
            seal,
            Some(Box::new(RecordingReporter {
                submissions: self.submissions.clone(),
                fail: fail_reports,
            })),
        )
    }

    fn hmac_monitor(&self) -> Monitor {
        self.monitor_with(
            Box::new(HmacSeal::new(b"integration-secret".to_vec()).unwrap()),
            false,
        )
    }

    fn write(&self, name: &str, content: &str) {
        let path = self.root().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }
}

fn paths(set: &std::collections::BTreeSet<String>) -> Vec<&str> {
    set.iter().map(String::as_str).collect()
}

#[tokio::test]
async fn add_modify_delete_are_classified_exactly() {
    let h = Harness::new();
    let monitor = h.hmac_monitor();

    h.write("a.txt", "one");
    h.write("b.txt", "two");
    h.write("sub/c.txt", "three");
    monitor.run_cycle().await.unwrap();

    h.write("a.txt", "one changed");
    fs::remove_file(h.root().join("b.txt")).unwrap();
    h.write("d.txt", "four");

    let summary = monitor.run_cycle().await.unwrap();
    assert_eq!(paths(&summary.report.new), vec!["d.txt"]);
    assert_eq!(paths(&summary.report.deleted), vec!["b.txt"]);
    assert_eq!(paths(&summary.report.changed), vec!["a.txt"]);
}

#[tokio::test]
async fn idempotent_cycle_yields_empty_report() {
    let h = Harness::new();
    let monitor = h.hmac_monitor();
    h.write("a.txt", "stable");

    monitor.run_cycle().await.unwrap();
    let second = monitor.run_cycle().await.unwrap();
    assert!(second.report.is_empty());
    // Empty reports are not submitted to the collector.
    assert_eq!(h.submissions.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn delivery_failure_does_not_block_persistence() {
    let h = Harness::new();
    let monitor = h.monitor_with(
        Box::new(HmacSeal::new(b"integration-secret".to_vec()).unwrap()),
        true, // every submission fails
    );
    h.write("a.txt", "one");

    let summary = monitor.run_cycle().await.unwrap();
    assert!(matches!(summary.delivery, ReportDelivery::Failed(_)));

    // Baseline and tag were still persisted and the next cycle trusts them.
    assert!(h.baseline_path().exists());
    assert!(h.tag_path().exists());
    let second = monitor.run_cycle().await.unwrap();
    assert!(second.report.is_empty());
}

#[tokio::test]
async fn persisted_baseline_parses_and_matches_tree() {
    let h = Harness::new();
    let monitor = h.hmac_monitor();
    h.write("x.txt", "payload");
    h.write("sub/y.txt", "payload");

    let summary = monitor.run_cycle().await.unwrap();
    assert_eq!(summary.baseline_files, 2);

    let stored = Baseline::from_bytes(&fs::read(h.baseline_path()).unwrap()).unwrap();
    assert!(stored.contains("x.txt"));
    assert!(stored.contains("sub/y.txt"));
    assert_eq!(stored.len(), 2);
}

#[tokio::test]
async fn baseline_signed_with_other_key_is_tamper() {
    // Scenario: baseline sealed under key K1, verification configured with
    // K2's public key. Verify must return false, the cycle must halt, and no
    // snapshot may be persisted.
    let h = Harness::new();

    let k1 = SigningKey::from_bytes(&[1; 32]);
    let k2 = SigningKey::from_bytes(&[2; 32]);
    write_keypair(h.dir.path(), "k1", &k1);
    write_keypair(h.dir.path(), "k2", &k2);

    let signer = h.monitor_with(
        Box::new(
            Ed25519Seal::from_key_files(Some(&h.dir.path().join("k1.priv")), None).unwrap(),
        ),
        false,
    );
    h.write("a.txt", "content");
    signer.run_cycle().await.unwrap();
    let baseline_before = fs::read(h.baseline_path()).unwrap();

    let verifier = h.monitor_with(
        Box::new(
            Ed25519Seal::from_key_files(None, Some(&h.dir.path().join("k2.pub"))).unwrap(),
        ),
        false,
    );
    h.write("b.txt", "would be new");

    let result = verifier.run_cycle().await;
    assert!(matches!(result, Err(MonitorError::TamperDetected(_))));

    // No snapshot persisted, no report sent for the halted cycle.
    assert_eq!(fs::read(h.baseline_path()).unwrap(), baseline_before);
    assert_eq!(h.submissions.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn corrupted_tag_file_is_tamper() {
    let h = Harness::new();
    let monitor = h.hmac_monitor();
    h.write("a.txt", "content");
    monitor.run_cycle().await.unwrap();

    fs::write(h.tag_path(), "hmac-sha256:deadbeef\n").unwrap();
    assert!(matches!(
        monitor.run_cycle().await,
        Err(MonitorError::TamperDetected(_))
    ));
}

#[cfg(unix)]
#[tokio::test]
async fn unreadable_listed_file_is_recorded_not_fatal() {
    use std::os::unix::fs::PermissionsExt;

    let h = Harness::new();
    let monitor = h.hmac_monitor();
    h.write("good.txt", "fine");
    h.write("locked.txt", "cannot read me");
    let locked = h.root().join("locked.txt");
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
    if fs::read(&locked).is_ok() {
        // Running with CAP_DAC_OVERRIDE (e.g. as root); nothing to test here.
        return;
    }

    let summary = monitor.run_cycle().await.unwrap();
    assert!(summary.report.new.contains("good.txt"));
    assert_eq!(summary.unreadable.len(), 1);
    assert!(summary.unreadable[0].path.ends_with("locked.txt"));
    // Unreadable is distinct from deleted and absent from the baseline.
    assert!(!summary.report.deleted.contains("locked.txt"));
    let stored = Baseline::from_bytes(&fs::read(h.baseline_path()).unwrap()).unwrap();
    assert!(!stored.contains("locked.txt"));
}

fn write_keypair(dir: &Path, name: &str, key: &SigningKey) {
    fs::write(dir.join(format!("{}.priv", name)), hex::encode(key.to_bytes())).unwrap();
    fs::write(
        dir.join(format!("{}.pub", name)),
        hex::encode(key.verifying_key().to_bytes()),
    )
    .unwrap();
}
