//! Configuration
//!
//! One explicit configuration struct, constructed at startup from a TOML file
//! plus CLI overrides and passed down to every component. No ambient globals:
//! paths, keys and the collector URL all flow through here.

use crate::error::MonitorError;
use crate::logging::LoggingConfig;
use crate::seal::SealScheme;
use crate::walker::WalkerConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FimConfig {
    /// What to monitor and how often
    #[serde(default)]
    pub monitor: MonitorConfig,

    /// Where the baseline and its tag live
    #[serde(default)]
    pub baseline: BaselineConfig,

    /// Tamper-evidence scheme and key material
    #[serde(default)]
    pub sealing: SealingConfig,

    /// Collector submission
    #[serde(default)]
    pub report: ReportConfig,

    /// Filesystem walk options
    #[serde(default)]
    pub walker: WalkerConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Directory tree to monitor
    #[serde(default)]
    pub root: PathBuf,

    /// Seconds between cycles in watch mode
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

fn default_interval_secs() -> u64 {
    60
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::new(),
            interval_secs: default_interval_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaselineConfig {
    /// Canonical serialized baseline
    #[serde(default = "default_baseline_path")]
    pub path: PathBuf,

    /// Sidecar integrity tag
    #[serde(default = "default_tag_path")]
    pub tag_path: PathBuf,
}

fn default_baseline_path() -> PathBuf {
    PathBuf::from("baseline.json")
}

fn default_tag_path() -> PathBuf {
    PathBuf::from("baseline.sig")
}

impl Default for BaselineConfig {
    fn default() -> Self {
        Self {
            path: default_baseline_path(),
            tag_path: default_tag_path(),
        }
    }
}

/// Key material is supplied via files referenced here, never inline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SealingConfig {
    #[serde(default = "default_scheme")]
    pub scheme: SealScheme,

    /// Shared secret file (hmac-sha256 scheme)
    #[serde(default)]
    pub secret_file: Option<PathBuf>,

    /// Hex-encoded 32-byte private key file (ed25519 scheme)
    #[serde(default)]
    pub private_key: Option<PathBuf>,

    /// Hex-encoded 32-byte public key file (ed25519 scheme)
    #[serde(default)]
    pub public_key: Option<PathBuf>,
}

fn default_scheme() -> SealScheme {
    SealScheme::HmacSha256
}

impl Default for SealingConfig {
    fn default() -> Self {
        Self {
            scheme: default_scheme(),
            secret_file: None,
            private_key: None,
            public_key: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Collector report endpoint, e.g. `http://127.0.0.1:5000/report`.
    /// When unset, reports are logged locally only.
    #[serde(default)]
    pub url: Option<String>,

    /// Per-submission timeout
    #[serde(default = "default_report_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_report_timeout_secs() -> u64 {
    10
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout_secs: default_report_timeout_secs(),
        }
    }
}

impl FimConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, MonitorError> {
        let text = fs::read_to_string(path).map_err(|e| {
            MonitorError::Config(format!("cannot read config {}: {}", path.display(), e))
        })?;
        toml::from_str(&text).map_err(|e| {
            MonitorError::Config(format!("cannot parse config {}: {}", path.display(), e))
        })
    }

    /// Validate coherence before a monitor is built from this config.
    pub fn validate(&self) -> Result<(), MonitorError> {
        let mut problems = Vec::new();

        if self.monitor.root.as_os_str().is_empty() {
            problems.push("monitor.root is not set".to_string());
        }
        if self.monitor.interval_secs == 0 {
            problems.push("monitor.interval_secs must be at least 1".to_string());
        }
        if self.baseline.path == self.baseline.tag_path {
            problems.push("baseline.path and baseline.tag_path must differ".to_string());
        }

        match self.sealing.scheme {
            SealScheme::HmacSha256 => {
                if self.sealing.secret_file.is_none() {
                    problems.push(
                        "sealing.scheme = hmac-sha256 requires sealing.secret_file".to_string(),
                    );
                }
            }
            SealScheme::Ed25519 => {
                if self.sealing.private_key.is_none() && self.sealing.public_key.is_none() {
                    problems.push(
                        "sealing.scheme = ed25519 requires sealing.private_key or sealing.public_key"
                            .to_string(),
                    );
                }
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(MonitorError::Config(problems.join("; ")))
        }
    }
}
