//! Shared test helpers for storage module tests.

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use crate::models::GeoRecord;
use crate::storage::run_migrations;

/// Creates an in-memory database pool with migrations applied.
///
/// The pool holds a single connection: every SQLite `:memory:` connection is
/// its own database.
pub async fn create_test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create test database pool");
    run_migrations(&pool)
        .await
        .expect("Failed to run migrations");
    pool
}

/// Creates a fully populated record for `ip`.
pub fn create_test_record(ip: &str) -> GeoRecord {
    GeoRecord {
        ip: ip.to_string(),
        country_code: "SI".to_string(),
        country: "Nepal".to_string(),
        city: "DuBuquemouth".to_string(),
        latitude: -84.875,
        longitude: 7.206,
        mystery_value: 7823011346,
    }
}
