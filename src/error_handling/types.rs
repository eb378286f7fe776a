//! Error type definitions.
//!
//! This module defines the error enums returned by the pipeline's collaborators
//! and the `ErrorType` taxonomy used for failure counting.

use std::path::PathBuf;

use log::SetLoggerError;
use strum_macros::EnumIter as EnumIterMacro;
use thiserror::Error;

/// Error types for initialization failures.
#[derive(Error, Debug)]
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] SetLoggerError),
}

/// Error types for database operations.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Error creating the database file.
    #[error("Database file creation error: {0}")]
    FileCreationError(String),

    /// SQL execution error.
    #[error("SQL error: {0}")]
    SqlError(#[from] sqlx::Error),

    /// Schema migration error.
    #[error("Migration error: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),
}

/// Errors raised by a record source.
///
/// `Open` is fatal and surfaces from `import` before any stage starts. Every
/// other variant describes one malformed row and travels on the error channel.
#[derive(Error, Debug)]
pub enum SourceError {
    /// The underlying input could not be opened.
    #[error("Failed to open {}: {source}", .path.display())]
    Open {
        /// Input that failed to open
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// The CSV reader failed on a row.
    #[error("CSV read error: {0}")]
    Read(#[from] csv_async::Error),

    /// A row has fewer columns than a record needs.
    #[error("Line {line}: missing column '{column}'")]
    MissingColumn {
        /// Line of the row in the input
        line: u64,
        /// First column the row lacks
        column: &'static str,
    },

    /// A numeric column could not be parsed.
    #[error("Line {line}: invalid value '{value}' for column '{column}'")]
    InvalidField {
        /// Line of the row in the input
        line: u64,
        /// Column holding the bad value
        column: &'static str,
        /// Raw field text
        value: String,
    },
}

/// Errors raised by a deduplication cache backend.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Redis command or connection failure.
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// The backend could not serve the request.
    #[error("Cache unavailable: {0}")]
    Unavailable(String),
}

/// Errors raised by a durable store backend.
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQL execution error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The backend could not serve the request.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Failure classes counted by the pipeline stages.
///
/// None of these abort a load; each is resolved locally by the stage that
/// detects it and reported in the final statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum ErrorType {
    /// Row reported by the source as unparseable.
    MalformedRecord,
    /// Record with an empty key, dropped by deduplication.
    InvalidRecord,
    /// Records dropped because the cache lookup for their batch failed.
    CacheReadFailure,
    /// Records whose keys could not be committed to the cache.
    CacheWriteFailure,
    /// Records the store did not insert.
    StoreInsertFailure,
}

impl std::fmt::Display for ErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ErrorType {
    /// Human-readable label used in the final statistics.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::MalformedRecord => "Malformed record",
            ErrorType::InvalidRecord => "Invalid record (empty ip)",
            ErrorType::CacheReadFailure => "Cache read failure",
            ErrorType::CacheWriteFailure => "Cache write failure",
            ErrorType::StoreInsertFailure => "Store insert failure",
        }
    }
}
