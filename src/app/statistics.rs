//! Statistics printing and database updates.

use anyhow::{Context, Result};
use log::info;
use strum::IntoEnumIterator;

use crate::error_handling::{ErrorCounts, ErrorType};
use crate::pipeline::LoadReport;
use crate::storage::{update_run_stats, RunStats};

/// Saves the run's counters to `load_runs`, then prints the final statistics.
pub async fn print_and_save_final_statistics(
    pool: &sqlx::SqlitePool,
    run_id: &str,
    report: &LoadReport,
) -> Result<()> {
    let errors = report.errors();
    let stats = RunStats {
        run_id,
        total_records: report.total_records() as i64,
        accepted_records: report.accepted() as i64,
        stored_records: report.stored() as i64,
        failed_records: errors.total() as i64,
        cancelled: report.cancelled,
        elapsed_seconds: report.elapsed.as_secs_f64(),
    };
    update_run_stats(pool, &stats)
        .await
        .context("Failed to update run statistics")?;

    print_load_statistics(report);
    Ok(())
}

/// Prints the error breakdown and a one-line summary of the load.
pub fn print_load_statistics(report: &LoadReport) {
    print_error_statistics(&report.errors());
    info!(
        "{} {} record{} ({} imported, {} skipped, {} stored) in {:.1}s",
        if report.cancelled { "Cancelled after" } else { "Processed" },
        report.total_records(),
        if report.total_records() == 1 { "" } else { "s" },
        report.accepted(),
        report.dedup.skipped(),
        report.stored(),
        report.elapsed.as_secs_f64()
    );
}

/// Prints the non-zero error counts to the log.
pub fn print_error_statistics(errors: &ErrorCounts) {
    let total_errors = errors.total();
    if total_errors == 0 {
        return;
    }

    info!("Error Counts ({} total):", total_errors);
    for error_type in ErrorType::iter() {
        let count = errors.get(error_type);
        if count > 0 {
            info!("   {}: {}", error_type.as_str(), count);
        }
    }
}
