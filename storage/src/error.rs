use chrono::{DateTime, Utc};
use thiserror::Error;

/// Storage layer errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StorageError {
    /// Append would not advance the series clock
    #[error("Out-of-order bar for {symbol}: {timestamp} is not after last stored {last}")]
    OutOfOrder {
        symbol: String,
        timestamp: DateTime<Utc>,
        last: DateTime<Utc>,
    },

    /// Bar violates OHLCV invariants
    #[error("Invalid bar: {0}")]
    InvalidBar(String),

    /// No series has ever been created for the symbol
    #[error("Unknown symbol: {0}")]
    UnknownSymbol(String),

    /// Replacement target does not exist
    #[error("No bar for {symbol} at {timestamp}")]
    BarNotFound {
        symbol: String,
        timestamp: DateTime<Utc>,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::SerializationError(err.to_string())
    }
}

impl From<serde_yaml::Error> for StorageError {
    fn from(err: serde_yaml::Error) -> Self {
        StorageError::ConfigError(err.to_string())
    }
}

/// Result type for storage operations
pub type Result<T> = std::result::Result<T, StorageError>;
