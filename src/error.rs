//! Error types for rusty-fxrates

use chrono::NaiveDate;
use thiserror::Error;

/// Main error type for rusty-fxrates
#[derive(Error, Debug)]
pub enum FxError {
    /// Upstream feed unavailable or returned something unusable.
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// Observation cannot be placed in the history (no usable date).
    #[error("Schema error: {0}")]
    Schema(String),

    /// A single rate value could not be used; the cell is recorded as missing.
    #[error("Validation error for {currency} on {date}: {reason}")]
    Validation {
        date: NaiveDate,
        currency: String,
        reason: String,
    },

    #[error("Missing base currency column: {currency} is not present in the history")]
    MissingBaseCurrency { currency: String },

    #[error("Storage error at {path}: {reason}")]
    Storage { path: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl FxError {
    /// Build a storage error for `path`
    pub fn storage(path: impl AsRef<std::path::Path>, reason: impl ToString) -> Self {
        FxError::Storage {
            path: path.as_ref().display().to_string(),
            reason: reason.to_string(),
        }
    }

    /// Whether this error must terminate the current run.
    ///
    /// Schema and validation problems are recovered in-band (observation
    /// dropped, cell coerced to missing); everything else is structural.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, FxError::Schema(_) | FxError::Validation { .. })
    }
}

/// Result type alias for rusty-fxrates operations
pub type Result<T> = std::result::Result<T, FxError>;
