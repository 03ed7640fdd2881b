//! # ag-analysis: Technical Analysis and Recommendations
//!
//! Indicator computation, volume and price-action analysis, and a rule-based
//! composite recommendation over the bar series held by `ag-storage`.
//!
//! ## Core Components
//!
//! - **AnalysisEngine**: Orchestrates a full analysis of one symbol or many
//! - **Indicators**: Streaming SMA, EMA, RSI, MACD, Bollinger Bands, ROC, Stochastic
//! - **IndicatorCache**: Incremental indicator state keyed by series revision
//! - **RecommendationEngine**: Weighted rule table producing BUY / HOLD / SELL
//! - **Alerts**: Price and volume alert conditions
//!
//! ## Example Usage
//!
//! ```
//! use ag_analysis::{AnalysisEngine, Signal};
//! use ag_storage::{Bar, TimeSeriesStore};
//! use chrono::{Duration, TimeZone, Utc};
//! use std::sync::Arc;
//!
//! let store = Arc::new(TimeSeriesStore::default());
//! let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
//! for i in 0..60 {
//!     let close = 100.0 + (i as f64 * 0.3).sin();
//!     let bar = Bar::new(start + Duration::days(i), close, close + 1.0, close - 1.0, close, 1_000).unwrap();
//!     store.append("AAPL", bar).unwrap();
//! }
//!
//! let engine = AnalysisEngine::with_defaults(store);
//! let result = engine.analyze("AAPL", None).unwrap();
//! assert!((-1.0..=1.0).contains(&result.score));
//! println!("{}", result.summary());
//! # let _ = Signal::Hold;
//! ```

pub mod alerts;
pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod types;

// Include signals module from parent directory
#[path = "../signals/mod.rs"]
pub mod signals_impl;
pub mod signals {
    pub use super::signals_impl::*;
}

// Re-export main types
pub use alerts::{check_alerts, Alert, AlertRule};
pub use cache::{CacheStats, IndicatorCache};
pub use config::{
    AnalysisConfig, CacheConfig, IndicatorConfig, PriceActionConfig, RecommendationConfig, VolumeConfig,
    VolumeModifier,
};
pub use engine::AnalysisEngine;
pub use error::{AnalysisError, Result};
pub use signals::{
    Condition, Factor, FactorRules, IndicatorEngine, PriceAction, RecommendationEngine, Rule,
    RuleTable, Trend, VolumeAnalysis, VolumeTrend,
};
pub use types::{
    AnalysisSnapshot, Indicator, IndicatorKind, IndicatorResult, IndicatorValue,
    RecommendationResult, RsiSmoothing, Signal, TechnicalReadings,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Install a fmt subscriber filtered by `RUST_LOG`, defaulting to info for this crate
pub fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("ag_analysis=info"));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}
