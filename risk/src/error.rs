//! Error types for risk metrics

use thiserror::Error;

/// Errors that can occur in risk calculations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RiskError {
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Alignment error: {observations} overlapping return observation(s), need at least 2")]
    Alignment { observations: usize },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Division by zero in calculation: {0}")]
    DivisionByZero(String),

    #[error("Non-positive reference price {price} at index {index}")]
    NonPositivePrice { index: usize, price: f64 },

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<serde_yaml::Error> for RiskError {
    fn from(err: serde_yaml::Error) -> Self {
        RiskError::ConfigError(err.to_string())
    }
}

impl From<serde_json::Error> for RiskError {
    fn from(err: serde_json::Error) -> Self {
        RiskError::ConfigError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RiskError>;
