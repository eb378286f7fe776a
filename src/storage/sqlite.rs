//! SQLite-backed record store.

use std::sync::Arc;

use async_trait::async_trait;
use log::debug;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

use super::{RecordSearch, RecordStore};
use crate::config::SQLITE_ROWS_PER_INSERT;
use crate::error_handling::StoreError;
use crate::models::GeoRecord;

/// Durable store writing to the `geo_records` table.
///
/// The `UNIQUE(ip)` constraint makes inserts idempotent: a record whose IP is
/// already stored is skipped and not counted as inserted.
#[derive(Clone)]
pub struct SqliteStore {
    pool: Arc<SqlitePool>,
}

impl SqliteStore {
    /// Store writing through `pool`; the schema must already be migrated.
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        SqliteStore { pool }
    }

    /// Underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Number of stored records.
    pub async fn count(&self) -> Result<i64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM geo_records")
            .fetch_one(self.pool.as_ref())
            .await?;
        Ok(count)
    }
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn insert(&self, records: &[GeoRecord]) -> Result<usize, StoreError> {
        if records.is_empty() {
            return Ok(0);
        }

        let imported_at_ms = chrono::Utc::now().timestamp_millis();
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0usize;

        for chunk in records.chunks(SQLITE_ROWS_PER_INSERT) {
            let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
                "INSERT INTO geo_records (ip, country_code, country, city, latitude, longitude, mystery_value, imported_at_ms) ",
            );
            builder.push_values(chunk, |mut row, record| {
                row.push_bind(record.ip.clone())
                    .push_bind(record.country_code.clone())
                    .push_bind(record.country.clone())
                    .push_bind(record.city.clone())
                    .push_bind(record.latitude)
                    .push_bind(record.longitude)
                    .push_bind(record.mystery_value)
                    .push_bind(imported_at_ms);
            });
            builder.push(" ON CONFLICT(ip) DO NOTHING");

            let result = builder.build().execute(&mut *tx).await?;
            inserted += result.rows_affected() as usize;
        }

        tx.commit().await?;

        if inserted < records.len() {
            debug!(
                "Skipped {} already stored records out of {}",
                records.len() - inserted,
                records.len()
            );
        }
        Ok(inserted)
    }
}

#[async_trait]
impl RecordSearch for SqliteStore {
    async fn by_ip(&self, ip: &str) -> Result<Option<GeoRecord>, StoreError> {
        let row = sqlx::query(
            "SELECT ip, country_code, country, city, latitude, longitude, mystery_value
             FROM geo_records WHERE ip = ?",
        )
        .bind(ip)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.map(|row| record_from_row(&row)))
    }
}

fn record_from_row(row: &SqliteRow) -> GeoRecord {
    GeoRecord {
        ip: row.get("ip"),
        country_code: row.get("country_code"),
        country: row.get("country"),
        city: row.get("city"),
        latitude: row.get("latitude"),
        longitude: row.get("longitude"),
        mystery_value: row.get("mystery_value"),
    }
}
