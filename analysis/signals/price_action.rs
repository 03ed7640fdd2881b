//! Price action: support/resistance levels, trend and price changes
//!
//! The trend classifier is a best-effort heuristic comparing two SMAs and
//! their slopes. It is not a forecast.

use crate::config::PriceActionConfig;
use crate::signals::SimpleMovingAverage;
use ag_storage::Bar;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Trend classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Uptrend,
    Downtrend,
    Sideways,
}

impl Trend {
    /// +1 / 0 / -1
    pub fn score(&self) -> f64 {
        match self {
            Trend::Uptrend => 1.0,
            Trend::Sideways => 0.0,
            Trend::Downtrend => -1.0,
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trend::Uptrend => write!(f, "uptrend"),
            Trend::Downtrend => write!(f, "downtrend"),
            Trend::Sideways => write!(f, "sideways"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelKind {
    Support,
    Resistance,
}

/// Merged cluster of local extrema
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceLevel {
    /// Mean price of the merged touches
    pub price: f64,
    /// Number of merged touches
    pub strength: usize,
    pub kind: LevelKind,
}

/// Percent change of the last close over several horizons
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceChanges {
    pub one_bar: Option<f64>,
    pub five_bar: Option<f64>,
    pub thirty_bar: Option<f64>,
}

/// Price action readings at the last bar of a series
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceAction {
    /// Support levels, nearest first
    pub support: Vec<PriceLevel>,
    /// Resistance levels, nearest first
    pub resistance: Vec<PriceLevel>,
    pub nearest_support: Option<PriceLevel>,
    pub nearest_resistance: Option<PriceLevel>,
    pub trend: Option<Trend>,
    pub changes: PriceChanges,
    /// Highest high of the series
    pub high: Option<f64>,
    /// Lowest low of the series
    pub low: Option<f64>,
    pub range: Option<f64>,
}

/// Price action analyzer
#[derive(Debug, Clone, Default)]
pub struct PriceActionAnalyzer {
    config: PriceActionConfig,
}

impl PriceActionAnalyzer {
    pub fn new(config: PriceActionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PriceActionConfig {
        &self.config
    }

    pub fn analyze(&self, bars: &[Bar]) -> PriceAction {
        let Some(last) = bars.last() else {
            return PriceAction::default();
        };

        let (support, resistance) = self.levels(bars, last.close);
        let high = bars.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
        let low = bars.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);

        PriceAction {
            nearest_support: support.first().copied(),
            nearest_resistance: resistance.first().copied(),
            support,
            resistance,
            trend: self.trend(bars),
            changes: PriceChanges {
                one_bar: percent_change(bars, 1),
                five_bar: percent_change(bars, 5),
                thirty_bar: percent_change(bars, 30),
            },
            high: Some(high),
            low: Some(low),
            range: Some(high - low),
        }
    }

    /// Support and resistance levels relative to `close`, nearest first
    ///
    /// Levels at exactly the close count as support.
    pub fn levels(&self, bars: &[Bar], close: f64) -> (Vec<PriceLevel>, Vec<PriceLevel>) {
        let mut support = Vec::new();
        let mut resistance = Vec::new();

        let extrema = local_extrema(bars, self.config.pivot_window);
        for (price, strength) in merge_levels(extrema, self.config.level_tolerance) {
            if price <= close {
                support.push(PriceLevel {
                    price,
                    strength,
                    kind: LevelKind::Support,
                });
            } else {
                resistance.push(PriceLevel {
                    price,
                    strength,
                    kind: LevelKind::Resistance,
                });
            }
        }

        // merge_levels yields ascending prices
        support.reverse();
        (support, resistance)
    }

    /// Short vs long SMA with both slopes; needs `long_sma + 1` bars
    pub fn trend(&self, bars: &[Bar]) -> Option<Trend> {
        let (short_period, long_period) = (self.config.short_sma, self.config.long_sma);
        if bars.len() < long_period + 1 {
            return None;
        }

        let mut short = SimpleMovingAverage::new(short_period);
        let mut long = SimpleMovingAverage::new(long_period);
        let mut previous = None;

        let tail = &bars[bars.len() - long_period - 1..];
        for (i, bar) in tail.iter().enumerate() {
            if i == tail.len() - 1 {
                previous = short.value().zip(long.value());
            }
            short.push(bar.close);
            long.push(bar.close);
        }

        let (short_prev, long_prev) = previous?;
        let (short_now, long_now) = short.value().zip(long.value())?;

        if short_now > long_now && short_now > short_prev && long_now > long_prev {
            Some(Trend::Uptrend)
        } else if short_now < long_now && short_now < short_prev && long_now < long_prev {
            Some(Trend::Downtrend)
        } else {
            Some(Trend::Sideways)
        }
    }
}

/// Prices of local maxima (highs) and minima (lows) over +/- `window` bars
///
/// Only bars with a full neighbourhood on both sides qualify.
pub fn local_extrema(bars: &[Bar], window: usize) -> Vec<f64> {
    let mut extrema = Vec::new();
    if window == 0 || bars.len() < 2 * window + 1 {
        return extrema;
    }

    for i in window..bars.len() - window {
        let neighbourhood = &bars[i - window..=i + window];
        let bar = &bars[i];

        if neighbourhood.iter().all(|b| b.high <= bar.high) {
            extrema.push(bar.high);
        }
        if neighbourhood.iter().all(|b| b.low >= bar.low) {
            extrema.push(bar.low);
        }
    }

    extrema
}

/// Cluster prices within `tolerance` (fraction) of the running cluster mean
///
/// Returns (mean price, touches) in ascending price order.
pub fn merge_levels(mut prices: Vec<f64>, tolerance: f64) -> Vec<(f64, usize)> {
    prices.retain(|p| p.is_finite());
    prices.sort_by(|a, b| a.total_cmp(b));

    let mut levels: Vec<(f64, usize)> = Vec::new();
    for price in prices {
        match levels.last_mut() {
            Some((mean, count)) if (price - *mean).abs() <= tolerance * mean.abs() => {
                *mean = (*mean * *count as f64 + price) / (*count + 1) as f64;
                *count += 1;
            }
            _ => levels.push((price, 1)),
        }
    }

    levels
}

/// Percent change of the last close against the close `bars_back` bars earlier
pub fn percent_change(bars: &[Bar], bars_back: usize) -> Option<f64> {
    if bars.len() < bars_back + 1 {
        return None;
    }
    let current = bars[bars.len() - 1].close;
    let reference = bars[bars.len() - 1 - bars_back].close;
    if reference <= 0.0 {
        return None;
    }
    Some((current - reference) / reference * 100.0)
}
