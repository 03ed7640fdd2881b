//! Indicator and signal framework

pub mod technical;
pub mod momentum;
pub mod volume;
pub mod price_action;
pub mod composite;

pub use technical::{
    SimpleMovingAverage,
    ExponentialMovingAverage,
    RelativeStrengthIndex,
    BollingerBands,
    MovingAverageConvergenceDivergence,
};

pub use momentum::{
    RateOfChange,
    StochasticOscillator,
};

pub use volume::{
    VolumeAnalysis,
    VolumeAnalyzer,
    VolumeTrend,
};

pub use price_action::{
    LevelKind,
    PriceAction,
    PriceActionAnalyzer,
    PriceChanges,
    PriceLevel,
    Trend,
};

pub use composite::{
    Condition,
    Factor,
    FactorRules,
    RecommendationEngine,
    Rule,
    RuleTable,
};

use crate::types::{IndicatorKind, IndicatorValue};
use ag_storage::Bar;
use chrono::{DateTime, Utc};

/// Batch indicator computation
///
/// Folds the streaming form of an indicator over a series. Leading bars
/// before warm-up produce no point.
pub struct IndicatorEngine;

impl IndicatorEngine {
    pub fn compute(kind: &IndicatorKind, bars: &[Bar]) -> Vec<(DateTime<Utc>, IndicatorValue)> {
        let mut indicator = kind.build();
        bars.iter()
            .filter_map(|bar| indicator.update(bar).map(|value| (bar.timestamp, value)))
            .collect()
    }

    /// Value at the last bar, if warmed up
    pub fn latest(kind: &IndicatorKind, bars: &[Bar]) -> Option<IndicatorValue> {
        let mut indicator = kind.build();
        bars.iter().fold(None, |_, bar| indicator.update(bar))
    }
}
