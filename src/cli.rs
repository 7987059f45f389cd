//! CLI definitions and presentation
//!
//! Clap types plus the plain-text rendering of cycle results. Logs go to
//! stderr; these renderings are the stdout surface.

use crate::config::FimConfig;
use crate::error::MonitorError;
use crate::monitor::{CycleSummary, InitSummary, ReportDelivery};
use clap::{Parser, Subcommand};
use owo_colors::OwoColorize;
use std::fmt::Write as _;
use std::path::PathBuf;

/// fim - file integrity monitoring with signed baselines
#[derive(Parser)]
#[command(name = "fim")]
#[command(about = "File integrity monitoring with cryptographically signed baselines")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path (default: ./fim.toml if present)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Monitored root directory (overrides the config file)
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Capture, sign and persist a fresh baseline (explicit trust bootstrap;
    /// also the recovery path after tamper detection)
    Init,
    /// Run one monitoring cycle: verify, snapshot, diff, report, persist
    Check,
    /// Run cycles on a fixed interval until a fatal error
    Watch {
        /// Seconds between cycles (overrides the config file)
        #[arg(long)]
        interval_secs: Option<u64>,
    },
}

/// Resolve configuration: explicit `--config`, else `./fim.toml` if present,
/// else defaults. CLI flags override the file.
pub fn load_config(cli: &Cli) -> Result<FimConfig, MonitorError> {
    let mut config = match &cli.config {
        Some(path) => FimConfig::load(path)?,
        None => {
            let default_path = PathBuf::from("fim.toml");
            if default_path.exists() {
                FimConfig::load(&default_path)?
            } else {
                FimConfig::default()
            }
        }
    };

    if let Some(root) = &cli.root {
        config.monitor.root = root.clone();
    }
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    if let Some(format) = &cli.log_format {
        config.logging.format = format.clone();
    }

    Ok(config)
}

/// Render a completed cycle for stdout.
pub fn render_summary(summary: &CycleSummary) -> String {
    let mut out = String::new();

    if summary.first_run {
        let _ = writeln!(out, "first run: baseline created from current tree");
    }

    if summary.report.is_empty() {
        let _ = writeln!(
            out,
            "no changes ({} files in baseline)",
            summary.baseline_files
        );
    } else {
        for path in &summary.report.new {
            let _ = writeln!(out, "  {} {}", "new".green(), path);
        }
        for path in &summary.report.deleted {
            let _ = writeln!(out, "  {} {}", "deleted".red(), path);
        }
        for path in &summary.report.changed {
            let _ = writeln!(out, "  {} {}", "changed".yellow(), path);
        }
        let _ = writeln!(
            out,
            "{} change(s) against baseline of {} file(s)",
            summary.report.total_changes(),
            summary.baseline_files
        );
    }

    for unreadable in &summary.unreadable {
        let _ = writeln!(out, "  {} {}", "unreadable".red(), unreadable);
    }

    if let ReportDelivery::Failed(reason) = &summary.delivery {
        let _ = writeln!(out, "report not delivered: {}", reason);
    }

    out.trim_end().to_string()
}

/// Render the result of an explicit baseline initialization.
pub fn render_init(summary: &InitSummary) -> String {
    let mut out = format!(
        "baseline created and signed ({} files)",
        summary.baseline_files
    );
    for unreadable in &summary.unreadable {
        let _ = write!(out, "\n  {} {}", "unreadable".red(), unreadable);
    }
    out
}
