//! Core types for the analysis engine

use crate::error::{AnalysisError, Result};
use crate::signals::{
    BollingerBands, ExponentialMovingAverage, MovingAverageConvergenceDivergence, PriceAction,
    RateOfChange, RelativeStrengthIndex, SimpleMovingAverage, StochasticOscillator,
    VolumeAnalysis,
};
use ag_risk::RiskSnapshot;
use ag_storage::Bar;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// RSI averaging method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RsiSmoothing {
    /// Wilder's running average: `avg = (prev * (n - 1) + current) / n`
    #[default]
    Wilder,
    /// Plain mean of the trailing n changes
    Simple,
}

/// Indicator and its parameters
///
/// Serialized with a `type` tag, e.g. `{type: Rsi, period: 14}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", deny_unknown_fields)]
pub enum IndicatorKind {
    Sma {
        period: usize,
    },
    Ema {
        period: usize,
    },
    Rsi {
        period: usize,
        #[serde(default)]
        smoothing: RsiSmoothing,
    },
    Macd {
        fast: usize,
        slow: usize,
        signal: usize,
    },
    Bollinger {
        period: usize,
        k: f64,
    },
    Roc {
        period: usize,
    },
    Stochastic {
        period: usize,
    },
}

impl IndicatorKind {
    /// Bars needed before the first value is produced
    pub fn warmup(&self) -> usize {
        match *self {
            IndicatorKind::Sma { period }
            | IndicatorKind::Ema { period }
            | IndicatorKind::Bollinger { period, .. }
            | IndicatorKind::Stochastic { period } => period,
            IndicatorKind::Rsi { period, .. } | IndicatorKind::Roc { period } => period + 1,
            IndicatorKind::Macd { slow, signal, .. } => slow + signal - 1,
        }
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(AnalysisError::InvalidParameter(msg));
        match *self {
            IndicatorKind::Sma { period }
            | IndicatorKind::Ema { period }
            | IndicatorKind::Rsi { period, .. }
            | IndicatorKind::Roc { period }
            | IndicatorKind::Stochastic { period } => {
                if period == 0 {
                    return invalid(format!("{}: period must be positive", self));
                }
            }
            IndicatorKind::Macd { fast, slow, signal } => {
                if fast == 0 || signal == 0 {
                    return invalid(format!("{}: periods must be positive", self));
                }
                if fast >= slow {
                    return invalid(format!("{}: fast period must be below slow", self));
                }
            }
            IndicatorKind::Bollinger { period, k } => {
                if period == 0 {
                    return invalid(format!("{}: period must be positive", self));
                }
                if !k.is_finite() || k <= 0.0 {
                    return invalid(format!("{}: band width must be positive", self));
                }
            }
        }
        Ok(())
    }

    /// Fresh streaming state for this indicator
    pub fn build(&self) -> Box<dyn Indicator> {
        match *self {
            IndicatorKind::Sma { period } => Box::new(SimpleMovingAverage::new(period)),
            IndicatorKind::Ema { period } => Box::new(ExponentialMovingAverage::new(period)),
            IndicatorKind::Rsi { period, smoothing } => {
                Box::new(RelativeStrengthIndex::with_smoothing(period, smoothing))
            }
            IndicatorKind::Macd { fast, slow, signal } => {
                Box::new(MovingAverageConvergenceDivergence::new(fast, slow, signal))
            }
            IndicatorKind::Bollinger { period, k } => Box::new(BollingerBands::new(period, k)),
            IndicatorKind::Roc { period } => Box::new(RateOfChange::new(period)),
            IndicatorKind::Stochastic { period } => Box::new(StochasticOscillator::new(period)),
        }
    }
}

impl fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorKind::Sma { period } => write!(f, "SMA({})", period),
            IndicatorKind::Ema { period } => write!(f, "EMA({})", period),
            IndicatorKind::Rsi {
                period,
                smoothing: RsiSmoothing::Wilder,
            } => write!(f, "RSI({})", period),
            IndicatorKind::Rsi {
                period,
                smoothing: RsiSmoothing::Simple,
            } => write!(f, "RSI({},simple)", period),
            IndicatorKind::Macd { fast, slow, signal } => {
                write!(f, "MACD({},{},{})", fast, slow, signal)
            }
            IndicatorKind::Bollinger { period, k } => write!(f, "BB({},{})", period, k),
            IndicatorKind::Roc { period } => write!(f, "ROC({})", period),
            IndicatorKind::Stochastic { period } => write!(f, "STOCH({})", period),
        }
    }
}

/// Value produced by an indicator at one bar
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorValue {
    Single(f64),
    Macd {
        line: f64,
        signal: f64,
        histogram: f64,
    },
    Bands {
        upper: f64,
        middle: f64,
        lower: f64,
    },
}

impl IndicatorValue {
    pub fn single(&self) -> Option<f64> {
        match self {
            IndicatorValue::Single(v) => Some(*v),
            _ => None,
        }
    }
}

/// Indicator value aligned to a bar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorResult {
    pub symbol: String,
    pub kind: IndicatorKind,
    pub timestamp: DateTime<Utc>,
    pub value: IndicatorValue,
}

/// Streaming indicator
///
/// Fed one bar at a time in series order; returns `None` until warmed up.
/// Batch results are produced by folding `update` over a series, so the
/// incremental and batch paths cannot disagree.
pub trait Indicator: Send {
    fn kind(&self) -> IndicatorKind;

    fn warmup(&self) -> usize {
        self.kind().warmup()
    }

    fn update(&mut self, bar: &Bar) -> Option<IndicatorValue>;
}

/// Discrete recommendation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Signal {
    Buy,
    Hold,
    Sell,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Buy => write!(f, "BUY"),
            Signal::Hold => write!(f, "HOLD"),
            Signal::Sell => write!(f, "SELL"),
        }
    }
}

/// MACD reading with the previous histogram for crossover detection
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacdReading {
    pub line: f64,
    pub signal: f64,
    pub histogram: f64,
    pub previous_histogram: Option<f64>,
}

impl MacdReading {
    pub fn crossed_above(&self) -> bool {
        matches!(self.previous_histogram, Some(prev) if prev <= 0.0 && self.histogram > 0.0)
    }

    pub fn crossed_below(&self) -> bool {
        matches!(self.previous_histogram, Some(prev) if prev >= 0.0 && self.histogram < 0.0)
    }
}

/// Bollinger reading with %B
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandsReading {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
    /// (close - lower) / (upper - lower); 0.5 when the bands collapse
    pub percent_b: f64,
}

impl BandsReading {
    pub fn new(upper: f64, middle: f64, lower: f64, close: f64) -> Self {
        let width = upper - lower;
        let percent_b = if width > f64::EPSILON {
            (close - lower) / width
        } else {
            0.5
        };
        Self {
            upper,
            middle,
            lower,
            percent_b,
        }
    }
}

/// Latest indicator readings at the analysis timestamp
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TechnicalReadings {
    /// Period -> SMA
    pub sma: BTreeMap<usize, f64>,
    /// Period -> EMA
    pub ema: BTreeMap<usize, f64>,
    pub rsi: Option<f64>,
    pub macd: Option<MacdReading>,
    pub bollinger: Option<BandsReading>,
    /// Rate of change in percent
    pub roc: Option<f64>,
    /// Stochastic %K
    pub stochastic: Option<f64>,
    /// Percent distance of the close from the longest configured SMA
    #[serde(default)]
    pub price_vs_sma: Option<f64>,
}

/// Everything the recommendation is computed from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSnapshot {
    pub symbol: String,
    /// Timestamp of the last bar included
    pub timestamp: DateTime<Utc>,
    /// Series revision the readings were computed from
    pub revision: u64,
    pub bars: usize,
    pub close: f64,
    pub previous_close: Option<f64>,
    pub technical: TechnicalReadings,
    pub volume: VolumeAnalysis,
    pub price_action: PriceAction,
    pub risk: RiskSnapshot,
    /// Reading name -> reason it is missing
    pub unavailable: BTreeMap<String, String>,
}

/// Scored recommendation for one symbol at one timestamp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationResult {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub close: f64,
    /// Composite score in [-1, 1]
    pub score: f64,
    pub signal: Signal,
    /// Factor -> weight x sub-score (plus `volume` for the volume modifier)
    pub contributions: BTreeMap<String, f64>,
    /// Factor -> raw reading the rules were applied to
    pub readings: BTreeMap<String, f64>,
    /// Factor -> reason it was not scored
    pub skipped: BTreeMap<String, String>,
    pub explanation: String,
}

impl RecommendationResult {
    /// One-line human-readable summary
    pub fn summary(&self) -> String {
        let trend = match self.readings.get("trend") {
            Some(t) if *t > 0.0 => "up",
            Some(t) if *t < 0.0 => "down",
            Some(_) => "sideways",
            None => "n/a",
        };
        let rsi = self
            .readings
            .get("rsi")
            .map(|r| format!("{:.1}", r))
            .unwrap_or_else(|| "n/a".to_string());

        format!(
            "{} @ {:.2}: {} (score {:+.3}, trend {}, RSI {})",
            self.symbol, self.close, self.signal, self.score, trend, rsi
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warmup() {
        assert_eq!(IndicatorKind::Sma { period: 20 }.warmup(), 20);
        assert_eq!(
            IndicatorKind::Rsi {
                period: 14,
                smoothing: RsiSmoothing::Wilder
            }
            .warmup(),
            15
        );
        assert_eq!(
            IndicatorKind::Macd {
                fast: 12,
                slow: 26,
                signal: 9
            }
            .warmup(),
            34
        );
        assert_eq!(IndicatorKind::Roc { period: 10 }.warmup(), 11);
    }

    #[test]
    fn test_labels() {
        assert_eq!(IndicatorKind::Ema { period: 12 }.to_string(), "EMA(12)");
        assert_eq!(
            IndicatorKind::Bollinger { period: 20, k: 2.0 }.to_string(),
            "BB(20,2)"
        );
        assert_eq!(
            IndicatorKind::Rsi {
                period: 14,
                smoothing: RsiSmoothing::Simple
            }
            .to_string(),
            "RSI(14,simple)"
        );
    }

    #[test]
    fn test_kind_from_yaml() {
        let kind: IndicatorKind = serde_yaml::from_str("type: Rsi\nperiod: 9\n").unwrap();
        assert_eq!(
            kind,
            IndicatorKind::Rsi {
                period: 9,
                smoothing: RsiSmoothing::Wilder
            }
        );

        // Unknown parameters are an error, not silently ignored
        let parse = |yaml: &str| serde_yaml::from_str::<IndicatorKind>(yaml);
        assert!(parse("type: Rsi\nperiod: 9\nsmooth: Simple\n").is_err());
        assert!(parse("type: Sma\nperiod: 9\nk: 2.0\n").is_err());
    }

    #[test]
    fn test_validate() {
        assert!(IndicatorKind::Sma { period: 0 }.validate().is_err());
        assert!(IndicatorKind::Macd {
            fast: 26,
            slow: 12,
            signal: 9
        }
        .validate()
        .is_err());
        assert!(IndicatorKind::Bollinger { period: 20, k: 0.0 }.validate().is_err());
        assert!(IndicatorKind::Stochastic { period: 14 }.validate().is_ok());
    }

    #[test]
    fn test_percent_b_collapsed_bands() {
        let bands = BandsReading::new(10.0, 10.0, 10.0, 10.0);
        assert_eq!(bands.percent_b, 0.5);

        let bands = BandsReading::new(12.0, 10.0, 8.0, 13.0);
        assert_eq!(bands.percent_b, 1.25);
    }

    #[test]
    fn test_macd_crossover() {
        let reading = MacdReading {
            line: 1.0,
            signal: 0.8,
            histogram: 0.2,
            previous_histogram: Some(-0.1),
        };
        assert!(reading.crossed_above());
        assert!(!reading.crossed_below());
    }
}
