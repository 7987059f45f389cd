//! Fim CLI Binary
//!
//! Exit codes: 0 clean cycle, 1 changes found, 2 tamper detected or fatal
//! error. Tamper and key failures never fall through to a success code.

use anyhow::Context;
use clap::Parser;
use fim::cli::{self, Cli, Commands};
use fim::logging::init_logging;
use fim::monitor::Monitor;
use std::process;
use std::time::Duration;
use tracing::error;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match cli::load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(2);
        }
    };

    if let Err(e) = init_logging(Some(&config.logging)) {
        eprintln!("failed to initialize logging: {}", e);
        process::exit(2);
    }

    match run(&cli, config).await {
        Ok(code) => process::exit(code),
        Err(e) => {
            error!("{:#}", e);
            eprintln!("{:#}", e);
            process::exit(2);
        }
    }
}

async fn run(cli: &Cli, config: fim::config::FimConfig) -> anyhow::Result<i32> {
    let monitor = Monitor::new(&config).context("failed to build monitor")?;

    match &cli.command {
        Commands::Init => {
            let summary = monitor.init_baseline()?;
            println!("{}", cli::render_init(&summary));
            Ok(0)
        }
        Commands::Check => {
            let summary = monitor.run_cycle().await?;
            println!("{}", cli::render_summary(&summary));
            Ok(if summary.report.is_empty() { 0 } else { 1 })
        }
        Commands::Watch { interval_secs } => {
            let interval = Duration::from_secs(
                interval_secs.unwrap_or(config.monitor.interval_secs),
            );
            monitor.run_watch(interval).await?;
            Ok(0)
        }
    }
}
