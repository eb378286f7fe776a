//! Run history entry point.

use anyhow::{Context, Result};

use crate::config::RunsConfig;
use crate::initialization::open_sqlite_store;
use crate::storage::{query_run_history, RunSummary};

/// Returns the most recent completed load runs recorded in the database.
pub async fn run_history(config: &RunsConfig) -> Result<Vec<RunSummary>> {
    let store = open_sqlite_store(&config.db_path).await?;
    query_run_history(store.pool(), Some(config.limit))
        .await
        .context("Failed to query run history")
}
