//! Configuration constants.
//!
//! Defaults for the CLI options and fixed limits used by the pipeline and its
//! backends.

use std::time::Duration;

/// Default SQLite database path.
pub const DB_PATH: &str = "./geo_loader.db";

/// Default number of records per batch emitted by a source.
pub const DEFAULT_BATCH_SIZE: usize = 400;

/// Default number of persistence workers.
pub const DEFAULT_WORKERS: usize = 5;

/// Default capacity of the channels between stages.
///
/// A capacity of one keeps the hand-off close to a rendezvous so a fast
/// producer blocks on a slow consumer.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1;

/// Interval between progress log lines during a load, in seconds.
pub const LOGGING_INTERVAL: u64 = 5;

/// Default retention of keys in the deduplication cache: one week.
pub const CACHE_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Default Redis connection URL.
pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379/0";

/// Default bound on connecting to Redis at startup.
pub const REDIS_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Namespace prepended to every key written to Redis.
pub const REDIS_KEY_PREFIX: &str = "geo:ip:";

/// Default bind address of the lookup gateway.
pub const DEFAULT_HTTP_ADDR: &str = "127.0.0.1:8000";

/// Columns of a CSV row, in order.
pub const CSV_COLUMNS: [&str; 7] = [
    "ip",
    "country_code",
    "country",
    "city",
    "latitude",
    "longitude",
    "mystery_value",
];

/// Rows per multi-row INSERT statement.
///
/// Seven bound parameters per row keeps each statement well under SQLite's
/// bound-parameter limit.
pub const SQLITE_ROWS_PER_INSERT: usize = 500;
