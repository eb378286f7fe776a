//! Configuration types and CLI options.
//!
//! This module defines enums and structs used for command-line argument parsing
//! and configuration. `LoadConfig` and `GatewayConfig` double as clap argument
//! groups so the binary and the library share one definition.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::constants::{
    CACHE_TTL, DB_PATH, DEFAULT_BATCH_SIZE, DEFAULT_CHANNEL_CAPACITY, DEFAULT_HTTP_ADDR,
    DEFAULT_REDIS_URL, DEFAULT_WORKERS, LOGGING_INTERVAL, REDIS_CONNECT_TIMEOUT,
};

/// Logging level for the application.
///
/// Controls the verbosity of log output, from most restrictive (Error) to most
/// verbose (Trace).
#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and informational messages
    Info,
    /// All messages except trace
    Debug,
    /// All messages including trace
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
///
/// Controls how log messages are formatted:
/// - `Plain`: Human-readable format with colors (default)
/// - `Json`: Structured JSON format for machine parsing
#[derive(Clone, Debug, ValueEnum)]
pub enum LogFormat {
    /// Human-readable format with colors (default)
    Plain,
    /// Structured JSON format for machine parsing
    Json,
}

/// Deduplication cache backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum CacheBackend {
    /// In-process map; deduplicates within a single run only
    Memory,
    /// Redis; deduplicates across runs and processes
    Redis,
}

/// Durable store backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StoreBackend {
    /// SQLite database file
    Sqlite,
    /// In-process list, discarded on exit
    Memory,
}

/// Options for a load run.
///
/// # Examples
///
/// ```no_run
/// use geo_loader::LoadConfig;
/// use std::path::PathBuf;
///
/// let config = LoadConfig {
///     file: PathBuf::from("data_dump.csv"),
///     workers: 8,
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone, Args)]
pub struct LoadConfig {
    /// CSV file to import
    #[arg(value_parser)]
    pub file: PathBuf,

    /// Database path (SQLite file)
    #[arg(long, value_parser, default_value = DB_PATH)]
    pub db_path: PathBuf,

    /// Records per batch
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,

    /// Number of concurrent store workers
    #[arg(long, default_value_t = DEFAULT_WORKERS)]
    pub workers: usize,

    /// Capacity of the channels between pipeline stages
    #[arg(long, default_value_t = DEFAULT_CHANNEL_CAPACITY)]
    pub channel_capacity: usize,

    /// Deduplication cache backend: memory|redis
    #[arg(long, value_enum, default_value_t = CacheBackend::Memory)]
    pub cache: CacheBackend,

    /// Redis connection URL (used with --cache redis)
    #[arg(long, default_value = DEFAULT_REDIS_URL)]
    pub redis_url: String,

    /// Seconds a key stays in the cache (0 keeps keys forever).
    /// Defaults to one week for Redis and no expiry in memory.
    #[arg(long)]
    pub cache_ttl_secs: Option<u64>,

    /// Seconds to wait for the Redis connection at startup
    #[arg(long, default_value_t = REDIS_CONNECT_TIMEOUT.as_secs())]
    pub redis_connect_timeout_secs: u64,

    /// Durable store backend: sqlite|memory
    #[arg(long, value_enum, default_value_t = StoreBackend::Sqlite)]
    pub store: StoreBackend,

    /// Input has no header row
    #[arg(long)]
    pub no_header: bool,

    /// Seconds between progress log lines
    #[arg(long, default_value_t = LOGGING_INTERVAL)]
    pub progress_interval_secs: u64,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::from("data_dump.csv"),
            db_path: PathBuf::from(DB_PATH),
            batch_size: DEFAULT_BATCH_SIZE,
            workers: DEFAULT_WORKERS,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            cache: CacheBackend::Memory,
            redis_url: DEFAULT_REDIS_URL.to_string(),
            cache_ttl_secs: None,
            redis_connect_timeout_secs: REDIS_CONNECT_TIMEOUT.as_secs(),
            store: StoreBackend::Sqlite,
            no_header: false,
            progress_interval_secs: LOGGING_INTERVAL,
        }
    }
}

impl LoadConfig {
    /// Rejects settings that would stall or starve the pipeline.
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        anyhow::ensure!(self.batch_size > 0, "--batch-size must be at least 1");
        anyhow::ensure!(self.workers > 0, "--workers must be at least 1");
        anyhow::ensure!(
            self.channel_capacity > 0,
            "--channel-capacity must be at least 1"
        );
        Ok(())
    }

    /// Cache retention, or `None` when keys never expire.
    ///
    /// Without `--cache-ttl-secs`, Redis keys live for a week and in-memory
    /// keys live as long as the process.
    pub fn cache_ttl(&self) -> Option<Duration> {
        match (self.cache_ttl_secs, self.cache) {
            (Some(0), _) => None,
            (Some(secs), _) => Some(Duration::from_secs(secs)),
            (None, CacheBackend::Redis) => Some(CACHE_TTL),
            (None, CacheBackend::Memory) => None,
        }
    }

    /// Bound on connecting to Redis (never zero).
    pub fn redis_connect_timeout(&self) -> Duration {
        Duration::from_secs(self.redis_connect_timeout_secs.max(1))
    }

    /// Interval between progress log lines (never zero).
    pub fn progress_interval(&self) -> Duration {
        Duration::from_secs(self.progress_interval_secs.max(1))
    }
}

/// Options for the lookup gateway.
#[derive(Debug, Clone, Args)]
pub struct GatewayConfig {
    /// Database path (SQLite file)
    #[arg(long, value_parser, default_value = DB_PATH)]
    pub db_path: PathBuf,

    /// Address to listen on
    #[arg(long, default_value = DEFAULT_HTTP_ADDR)]
    pub http_addr: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DB_PATH),
            http_addr: DEFAULT_HTTP_ADDR.to_string(),
        }
    }
}

/// Options for listing past load runs.
#[derive(Debug, Clone, Args)]
pub struct RunsConfig {
    /// Database path (SQLite file)
    #[arg(long, value_parser, default_value = DB_PATH)]
    pub db_path: PathBuf,

    /// Maximum number of runs to show
    #[arg(long, default_value_t = 10)]
    pub limit: usize,
}

/// Command-line interface.
///
/// # Examples
///
/// ```bash
/// # Import a CSV dump into ./geo_loader.db
/// geo_loader load data_dump.csv
///
/// # Deduplicate across runs with Redis and use more store workers
/// geo_loader load data_dump.csv --cache redis --workers 10
///
/// # Serve lookups from the imported data
/// geo_loader serve --http-addr 0.0.0.0:8000
/// ```
#[derive(Debug, Parser)]
#[command(
    name = "geo_loader",
    about = "Imports geo-IP records into a SQLite database and serves lookups."
)]
pub struct Cli {
    /// Log level: error|warn|info|debug|trace
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    /// Log format: plain|json
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Plain)]
    pub log_format: LogFormat,

    /// Action to run
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands of the CLI.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Import, deduplicate and store records from a CSV file
    Load(LoadConfig),
    /// Serve `GET /geo?ip=...` lookups from the database
    Serve(GatewayConfig),
    /// Show recent load runs
    Runs(RunsConfig),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_conversion() {
        assert_eq!(
            log::LevelFilter::from(LogLevel::Error),
            log::LevelFilter::Error
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Warn),
            log::LevelFilter::Warn
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Info),
            log::LevelFilter::Info
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Debug),
            log::LevelFilter::Debug
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Trace),
            log::LevelFilter::Trace
        );
    }

    #[test]
    fn test_load_config_default() {
        let config = LoadConfig::default();
        assert_eq!(config.batch_size, 400);
        assert_eq!(config.workers, 5);
        assert_eq!(config.cache, CacheBackend::Memory);
        assert_eq!(config.store, StoreBackend::Sqlite);
        assert_eq!(config.db_path, PathBuf::from("./geo_loader.db"));
        assert_eq!(config.cache_ttl(), None, "in-memory keys never expire by default");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_config_validation() {
        let config = LoadConfig {
            workers: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = LoadConfig {
            batch_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = LoadConfig {
            channel_capacity: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_ttl_disables_expiry() {
        let config = LoadConfig {
            cache: CacheBackend::Redis,
            cache_ttl_secs: Some(0),
            ..Default::default()
        };
        assert_eq!(config.cache_ttl(), None);
    }

    #[test]
    fn test_cache_ttl_defaults_per_backend() {
        let redis = LoadConfig {
            cache: CacheBackend::Redis,
            ..Default::default()
        };
        assert_eq!(redis.cache_ttl(), Some(CACHE_TTL));

        let memory = LoadConfig {
            cache_ttl_secs: Some(60),
            ..Default::default()
        };
        assert_eq!(memory.cache_ttl(), Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_redis_connect_timeout_never_zero() {
        let config = LoadConfig {
            redis_connect_timeout_secs: 0,
            ..Default::default()
        };
        assert_eq!(config.redis_connect_timeout(), Duration::from_secs(1));
        assert_eq!(
            LoadConfig::default().redis_connect_timeout(),
            REDIS_CONNECT_TIMEOUT
        );
    }

    #[test]
    fn test_progress_interval_never_zero() {
        let config = LoadConfig {
            progress_interval_secs: 0,
            ..Default::default()
        };
        assert_eq!(config.progress_interval(), Duration::from_secs(1));
    }
}
