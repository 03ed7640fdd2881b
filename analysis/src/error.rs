//! Error types for the analysis engine

use ag_risk::RiskError;
use ag_storage::StorageError;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Main error type for analysis operations
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// A single aligned value was requested before the indicator warmed up
    #[error("Insufficient data for {indicator}: need {required} bars, have {available}")]
    InsufficientData {
        indicator: String,
        required: usize,
        available: usize,
    },

    /// Symbol has never been stored
    #[error("Unknown symbol: {0}")]
    UnknownSymbol(String),

    /// Symbol exists but has no bars at or before the requested time
    #[error("No bars for {symbol} at or before {}", describe_as_of(.as_of))]
    EmptySeries {
        symbol: String,
        as_of: Option<DateTime<Utc>>,
    },

    /// No bar at the requested timestamp
    #[error("No bar for {symbol} at {timestamp}")]
    BarNotFound {
        symbol: String,
        timestamp: DateTime<Utc>,
    },

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Storage layer error
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Risk metric error
    #[error("Risk error: {0}")]
    Risk(#[from] RiskError),

    /// YAML parsing error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A blocking analysis task panicked or was cancelled
    #[error("Analysis task failed: {0}")]
    TaskFailed(String),
}

fn describe_as_of(as_of: &Option<DateTime<Utc>>) -> String {
    match as_of {
        Some(t) => t.to_rfc3339(),
        None => "the latest bar".to_string(),
    }
}

/// Result type for analysis operations
pub type Result<T> = std::result::Result<T, AnalysisError>;
