//! # ag-risk: Return-based risk metrics over OHLCV series
//!
//! This library computes the risk side of a symbol analysis from the bars
//! held by `ag-storage`.
//!
//! ## Core Components
//!
//! - **RiskMetrics**: applies a [`RiskConfig`] and produces a [`RiskSnapshot`]
//! - **metrics**: the pure functions (volatility, beta, ATR, drawdown)
//! - **RiskConfig**: YAML/JSON configuration with validated defaults
//!
//! Volatility uses the *sample* standard deviation of simple returns. This is
//! deliberately different from the population deviation used by Bollinger
//! Bands in `ag-analysis`.
//!
//! ## Example Usage
//!
//! ```rust
//! use ag_risk::{metrics, RiskMetrics};
//!
//! let closes = [100.0, 102.0, 101.0, 103.0, 104.0, 102.5];
//! let vol = metrics::volatility(&closes, 5).unwrap();
//! assert!(vol > 0.0);
//!
//! let risk = RiskMetrics::from_yaml("volatility_window: 5").unwrap();
//! let (per_period, annualized) = risk.volatility(&closes).unwrap();
//! assert_eq!(per_period, vol);
//! assert!(annualized.unwrap() > vol);
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod metrics;

pub use config::RiskConfig;
pub use engine::{RiskMetrics, RiskSnapshot};
pub use error::{Result, RiskError};
pub use metrics::{BetaEstimate, VolatilityRating};
