//! Load run history.
//!
//! Each load records a row in `load_runs` at start and fills in its counters
//! when the pipeline has drained.

use sqlx::{Row, SqlitePool};

use crate::error_handling::DatabaseError;

/// Metadata for a load run, recorded at start.
pub struct RunMetadata<'a> {
    /// Run identifier (`load_<millis>`)
    pub run_id: &'a str,
    /// Milliseconds since Unix epoch
    pub start_time_ms: i64,
    /// Crate version that ran the load
    pub version: &'a str,
    /// Input file, if any
    pub source_path: Option<&'a str>,
}

/// Statistics for a completed load run, recorded at end.
pub struct RunStats<'a> {
    /// Run to update
    pub run_id: &'a str,
    /// Records read from the source
    pub total_records: i64,
    /// Records forwarded by deduplication
    pub accepted_records: i64,
    /// Records the store inserted
    pub stored_records: i64,
    /// Failures of every kind
    pub failed_records: i64,
    /// Whether the load was interrupted
    pub cancelled: bool,
    /// Wall time of the load
    pub elapsed_seconds: f64,
}

/// Inserts or replaces run metadata in the `load_runs` table.
pub async fn insert_run_metadata(
    pool: &SqlitePool,
    meta: &RunMetadata<'_>,
) -> Result<(), DatabaseError> {
    sqlx::query(
        "INSERT INTO load_runs (run_id, version, source_path, start_time_ms)
         VALUES (?, ?, ?, ?)
         ON CONFLICT(run_id) DO UPDATE SET
             version=excluded.version,
             source_path=excluded.source_path,
             start_time_ms=excluded.start_time_ms",
    )
    .bind(meta.run_id)
    .bind(meta.version)
    .bind(meta.source_path)
    .bind(meta.start_time_ms)
    .execute(pool)
    .await
    .map_err(DatabaseError::SqlError)?;

    Ok(())
}

/// Updates run statistics when a load completes.
pub async fn update_run_stats(pool: &SqlitePool, stats: &RunStats<'_>) -> Result<(), DatabaseError> {
    let end_time_ms = chrono::Utc::now().timestamp_millis();

    sqlx::query(
        "UPDATE load_runs
         SET end_time_ms = ?, total_records = ?, accepted_records = ?, stored_records = ?,
             failed_records = ?, cancelled = ?, elapsed_seconds = ?
         WHERE run_id = ?",
    )
    .bind(end_time_ms)
    .bind(stats.total_records)
    .bind(stats.accepted_records)
    .bind(stats.stored_records)
    .bind(stats.failed_records)
    .bind(stats.cancelled)
    .bind(stats.elapsed_seconds)
    .bind(stats.run_id)
    .execute(pool)
    .await
    .map_err(DatabaseError::SqlError)?;

    Ok(())
}

/// Summary of a completed load run, suitable for displaying run history.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Unique identifier for this run (e.g., "load_1765150444953").
    pub run_id: String,
    /// Application version that ran this load.
    pub version: Option<String>,
    /// Input file of the load.
    pub source_path: Option<String>,
    /// Start time as milliseconds since Unix epoch.
    pub start_time_ms: i64,
    /// End time as milliseconds since Unix epoch.
    pub end_time_ms: Option<i64>,
    /// Records read from the source
    pub total_records: i64,
    /// Records forwarded by deduplication
    pub accepted_records: i64,
    /// Records the store inserted
    pub stored_records: i64,
    /// Failures of every kind
    pub failed_records: i64,
    /// Whether the load was interrupted.
    pub cancelled: bool,
    /// Wall time, once the load finished
    pub elapsed_seconds: Option<f64>,
}

/// Query run history from the database.
///
/// Returns completed runs, most recent first.
///
/// # Example
///
/// ```no_run
/// use geo_loader::query_run_history;
/// use sqlx::SqlitePool;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = SqlitePool::connect("sqlite:./geo_loader.db").await?;
/// for run in query_run_history(&pool, Some(10)).await? {
///     println!("Run {}: {} records, {} stored", run.run_id, run.total_records, run.stored_records);
/// }
/// # Ok(())
/// # }
/// ```
pub async fn query_run_history(
    pool: &SqlitePool,
    limit: Option<usize>,
) -> Result<Vec<RunSummary>, DatabaseError> {
    let mut query = "SELECT run_id, version, source_path, start_time_ms, end_time_ms, total_records,
                accepted_records, stored_records, failed_records, cancelled, elapsed_seconds
         FROM load_runs
         WHERE end_time_ms IS NOT NULL
         ORDER BY start_time_ms DESC"
        .to_string();
    if let Some(limit) = limit {
        query.push_str(&format!(" LIMIT {limit}"));
    }

    let rows = sqlx::query(&query)
        .fetch_all(pool)
        .await
        .map_err(DatabaseError::SqlError)?;

    Ok(rows
        .into_iter()
        .map(|row| RunSummary {
            run_id: row.get("run_id"),
            version: row.get("version"),
            source_path: row.get("source_path"),
            start_time_ms: row.get("start_time_ms"),
            end_time_ms: row.get("end_time_ms"),
            total_records: row.get("total_records"),
            accepted_records: row.get("accepted_records"),
            stored_records: row.get("stored_records"),
            failed_records: row.get("failed_records"),
            cancelled: row.get("cancelled"),
            elapsed_seconds: row.get("elapsed_seconds"),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_helpers::create_test_pool;

    fn meta(run_id: &str, start_time_ms: i64) -> RunMetadata<'_> {
        RunMetadata {
            run_id,
            start_time_ms,
            version: "0.1.0",
            source_path: Some("data_dump.csv"),
        }
    }

    fn stats(run_id: &str) -> RunStats<'_> {
        RunStats {
            run_id,
            total_records: 10,
            accepted_records: 8,
            stored_records: 8,
            failed_records: 2,
            cancelled: false,
            elapsed_seconds: 1.5,
        }
    }

    #[tokio::test]
    async fn test_run_lifecycle() {
        let pool = create_test_pool().await;
        insert_run_metadata(&pool, &meta("load_1", 1704067200000))
            .await
            .expect("insert run");

        // Unfinished runs are not listed
        assert!(query_run_history(&pool, None)
            .await
            .expect("history")
            .is_empty());

        update_run_stats(&pool, &stats("load_1"))
            .await
            .expect("update run");

        let runs = query_run_history(&pool, None).await.expect("history");
        assert_eq!(runs.len(), 1);
        let run = &runs[0];
        assert_eq!(run.run_id, "load_1");
        assert_eq!(run.source_path.as_deref(), Some("data_dump.csv"));
        assert_eq!(run.total_records, 10);
        assert_eq!(run.stored_records, 8);
        assert_eq!(run.failed_records, 2);
        assert!(!run.cancelled);
        assert_eq!(run.elapsed_seconds, Some(1.5));
        assert!(run.end_time_ms.is_some());
    }

    #[tokio::test]
    async fn test_history_is_most_recent_first_and_limited() {
        let pool = create_test_pool().await;
        for (run_id, start) in [("load_a", 1000), ("load_b", 3000), ("load_c", 2000)] {
            insert_run_metadata(&pool, &meta(run_id, start))
                .await
                .expect("insert run");
            update_run_stats(&pool, &stats(run_id))
                .await
                .expect("update run");
        }

        let runs = query_run_history(&pool, Some(2)).await.expect("history");
        let ids: Vec<&str> = runs.iter().map(|r| r.run_id.as_str()).collect();
        assert_eq!(ids, vec!["load_b", "load_c"]);
    }
}
