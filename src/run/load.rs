//! Load entry point: CSV file -> deduplication -> store.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use log::info;
use tokio_util::sync::CancellationToken;

use crate::app::{
    print_and_save_final_statistics, print_load_statistics, shutdown_gracefully,
    spawn_progress_logger,
};
use crate::config::{LoadConfig, StoreBackend};
use crate::initialization::{init_cache, init_store};
use crate::pipeline::{LoadReport, Loader, LoaderConfig};
use crate::source::CsvSource;
use crate::storage::{insert_run_metadata, RunMetadata};

/// Results of a load run.
#[derive(Debug, Clone)]
pub struct LoadSummary {
    /// Run identifier (format: `load_<timestamp_millis>`)
    pub run_id: String,
    /// Path to the SQLite database, when records were stored in one
    pub db_path: Option<PathBuf>,
    /// Per-stage counters of the run
    pub report: LoadReport,
}

/// Runs a load with the provided configuration.
///
/// Every startup step (configuration, cache connection, database, input
/// file) is checked before the pipeline starts; a failure there is returned.
/// Once running, record-level failures are only counted.
///
/// # Example
///
/// ```no_run
/// use geo_loader::{run_load, LoadConfig};
/// use std::path::PathBuf;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = LoadConfig {
///     file: PathBuf::from("data_dump.csv"),
///     ..Default::default()
/// };
/// let summary = run_load(config, CancellationToken::new()).await?;
/// println!("Stored {} records", summary.report.stored());
/// # Ok(())
/// # }
/// ```
pub async fn run_load(config: LoadConfig, cancel: CancellationToken) -> Result<LoadSummary> {
    config.validate().context("Invalid load configuration")?;

    tokio::fs::metadata(&config.file)
        .await
        .with_context(|| format!("Failed to open input file {}", config.file.display()))?;

    let cache = init_cache(&config)
        .await
        .context("Failed to initialize deduplication cache")?;
    let stores = init_store(&config)
        .await
        .context("Failed to initialize store")?;

    let start_time_epoch = Utc::now().timestamp_millis();
    let run_id = format!("load_{}", start_time_epoch);
    info!("Starting run: {}", run_id);

    if let Some(sqlite) = &stores.sqlite {
        let source_path = config.file.to_string_lossy();
        insert_run_metadata(
            sqlite.pool(),
            &RunMetadata {
                run_id: &run_id,
                start_time_ms: start_time_epoch,
                version: env!("CARGO_PKG_VERSION"),
                source_path: Some(&*source_path),
            },
        )
        .await
        .context("Failed to insert run metadata")?;
    }

    let source = CsvSource::new(&config.file)
        .with_batch_size(config.batch_size)
        .with_channel_capacity(config.channel_capacity)
        .with_headers(!config.no_header);
    let loader = Loader::new(
        Arc::new(source),
        cache,
        Arc::clone(&stores.store),
        LoaderConfig {
            workers: config.workers,
            channel_capacity: config.channel_capacity,
        },
    );

    let background = cancel.child_token();
    let logging_task = spawn_progress_logger(
        loader.progress(),
        config.progress_interval(),
        background.clone(),
    );

    let result = loader.load(cancel.clone()).await;
    shutdown_gracefully(background, Some(logging_task)).await;
    let report = result
        .with_context(|| format!("Failed to read input file {}", config.file.display()))?;

    match &stores.sqlite {
        Some(sqlite) => {
            print_and_save_final_statistics(sqlite.pool(), &run_id, &report).await?
        }
        None => print_load_statistics(&report),
    }

    Ok(LoadSummary {
        run_id,
        db_path: (config.store == StoreBackend::Sqlite).then(|| config.db_path.clone()),
        report,
    })
}
