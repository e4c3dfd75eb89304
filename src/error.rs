//! Error types for fx-history

use chrono::NaiveDate;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for fx-history
#[derive(Error, Debug)]
pub enum FxError {
    #[error("No rates found for {currency} between {start} and {end}")]
    NotFound {
        currency: String,
        start: NaiveDate,
        end: NaiveDate,
    },

    #[error("Range {start}..{end} for {currency} exceeds the {max_days}-day request limit")]
    RangeTooLarge {
        currency: String,
        start: NaiveDate,
        end: NaiveDate,
        max_days: i64,
    },

    #[error("Transport error while fetching {currency}: {message}")]
    Transport { currency: String, message: String },

    #[error("Division undefined: zero denominator on {date}")]
    DivisionUndefined { date: NaiveDate },

    #[error("Storage unavailable at {}: {reason}", path.display())]
    StorageUnavailable { path: PathBuf, reason: String },

    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("Corrupt history in {}: {reason}", path.display())]
    CorruptHistory { path: PathBuf, reason: String },

    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    #[error("Empty series for column {0}")]
    EmptySeries(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl FxError {
    pub(crate) fn storage(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        FxError::StorageUnavailable {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn corrupt(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        FxError::CorruptHistory {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// Result type alias for fx-history operations
pub type Result<T> = std::result::Result<T, FxError>;
