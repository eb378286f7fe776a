//! Main application entry point (CLI binary).
//!
//! This is a thin wrapper around the `geo_loader` library that handles:
//! - Command-line argument parsing
//! - Environment variable loading (.env file)
//! - Logger initialization
//! - Ctrl-C handling and user-facing output
//!
//! All core functionality is implemented in the library crate.

use anyhow::{Context, Result};
use clap::Parser;
use std::process;
use tokio_util::sync::CancellationToken;

use geo_loader::initialization::init_logger_with;
use geo_loader::{cancel_on_ctrl_c, run_gateway, run_history, run_load, Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine; REDIS_URL etc. may come from the environment.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_logger_with(cli.log_level.clone().into(), cli.log_format.clone())
        .context("Failed to initialize logger")?;

    let cancel = CancellationToken::new();
    let signal_task = cancel_on_ctrl_c(cancel.clone());

    let result = match cli.command {
        Command::Load(config) => run_load(config, cancel.clone()).await.map(|summary| {
            let report = &summary.report;
            println!(
                "{} {} record{} ({} imported, {} skipped, {} stored, {} errors) in {:.1}s",
                if report.cancelled { "Cancelled after" } else { "Processed" },
                report.total_records(),
                if report.total_records() == 1 { "" } else { "s" },
                report.accepted(),
                report.dedup.skipped(),
                report.stored(),
                report.errors().total(),
                report.elapsed.as_secs_f64()
            );
            if let Some(db_path) = &summary.db_path {
                println!("Results saved in {} (run {})", db_path.display(), summary.run_id);
            }
        }),
        Command::Serve(config) => run_gateway(config, cancel.clone()).await,
        Command::Runs(config) => run_history(&config).await.map(|runs| {
            if runs.is_empty() {
                println!("No completed runs in {}", config.db_path.display());
            }
            for run in runs {
                println!(
                    "{}: {} records ({} stored, {} failed){} in {:.1}s - {}",
                    run.run_id,
                    run.total_records,
                    run.stored_records,
                    run.failed_records,
                    if run.cancelled { ", cancelled" } else { "" },
                    run.elapsed_seconds.unwrap_or(0.0),
                    run.source_path.as_deref().unwrap_or("-")
                );
            }
        }),
    };
    signal_task.abort();

    if let Err(e) = result {
        eprintln!("geo_loader error: {:#}", e);
        process::exit(1);
    }
    Ok(())
}
