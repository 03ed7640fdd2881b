//! Return-based risk metrics
//!
//! Implements:
//! - Volatility: sample standard deviation of simple returns
//! - Beta: Cov(asset, benchmark) / Var(benchmark) over aligned returns
//! - Average True Range
//! - Maximum Drawdown: largest peak-to-trough decline of closes
//!
//! Returns are always simple returns `close[t] / close[t-1] - 1`.

use crate::error::{Result, RiskError};
use ag_storage::Bar;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::cmp::Ordering;
use std::fmt;

/// Simple close-to-close returns
///
/// A zero or negative reference close has no defined return and is an error.
pub fn simple_returns(closes: &[f64]) -> Result<Vec<f64>> {
    closes
        .windows(2)
        .enumerate()
        .map(|(i, w)| {
            if w[0] <= 0.0 {
                Err(RiskError::NonPositivePrice {
                    index: i,
                    price: w[0],
                })
            } else {
                Ok(w[1] / w[0] - 1.0)
            }
        })
        .collect()
}

/// Sample standard deviation of the trailing `window` returns
///
/// Needs `window + 1` closes.
pub fn volatility(closes: &[f64], window: usize) -> Result<f64> {
    if window < 2 {
        return Err(RiskError::InvalidParameter(format!(
            "volatility window must be at least 2, got {}",
            window
        )));
    }
    if closes.len() < window + 1 {
        return Err(RiskError::InsufficientData(format!(
            "volatility over {} returns needs {} closes, have {}",
            window,
            window + 1,
            closes.len()
        )));
    }

    let returns = simple_returns(&closes[closes.len() - window - 1..])?;
    Ok(returns.iter().std_dev())
}

/// Scale a per-period volatility to an annual figure
pub fn annualize(volatility: f64, periods_per_year: f64) -> f64 {
    volatility * periods_per_year.sqrt()
}

/// Beta estimate with the data it was computed from
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BetaEstimate {
    /// Cov(asset, benchmark) / Var(benchmark)
    pub beta: f64,
    /// Pearson correlation (None when the asset returns have no variance)
    pub correlation: Option<f64>,
    /// Number of aligned return observations used
    pub observations: usize,
}

/// Closes of both series on their common timestamps, in time order
pub fn align_closes(asset: &[Bar], benchmark: &[Bar]) -> Vec<(f64, f64)> {
    let mut aligned = Vec::with_capacity(asset.len().min(benchmark.len()));
    let (mut i, mut j) = (0, 0);

    while i < asset.len() && j < benchmark.len() {
        match asset[i].timestamp.cmp(&benchmark[j].timestamp) {
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
            Ordering::Equal => {
                aligned.push((asset[i].close, benchmark[j].close));
                i += 1;
                j += 1;
            }
        }
    }

    aligned
}

/// Beta of `asset` against `benchmark`
///
/// Both series are first aligned on common timestamps so each return pair
/// spans the same interval; the trailing `window` aligned returns are used.
/// Fewer than two overlapping observations is an alignment failure.
pub fn beta(asset: &[Bar], benchmark: &[Bar], window: usize) -> Result<BetaEstimate> {
    if window < 2 {
        return Err(RiskError::InvalidParameter(format!(
            "beta window must be at least 2, got {}",
            window
        )));
    }

    let aligned = align_closes(asset, benchmark);
    let observations = aligned.len().saturating_sub(1).min(window);
    if observations < 2 {
        return Err(RiskError::Alignment { observations });
    }

    let tail = &aligned[aligned.len() - observations - 1..];
    let asset_closes: Vec<f64> = tail.iter().map(|(a, _)| *a).collect();
    let bench_closes: Vec<f64> = tail.iter().map(|(_, b)| *b).collect();

    let asset_returns = simple_returns(&asset_closes)?;
    let bench_returns = simple_returns(&bench_closes)?;

    let covariance = asset_returns.iter().covariance(bench_returns.iter());
    let bench_variance = bench_returns.iter().variance();

    if bench_variance == 0.0 {
        return Err(RiskError::DivisionByZero(
            "Benchmark return variance is zero".to_string(),
        ));
    }

    let asset_std = asset_returns.iter().std_dev();
    let correlation = if asset_std > 0.0 {
        Some(covariance / (asset_std * bench_variance.sqrt()))
    } else {
        None
    };

    Ok(BetaEstimate {
        beta: covariance / bench_variance,
        correlation,
        observations,
    })
}

/// Mean true range over the trailing `period` bars
///
/// True range uses the previous close, so `period + 1` bars are required.
pub fn average_true_range(bars: &[Bar], period: usize) -> Result<f64> {
    if period == 0 {
        return Err(RiskError::InvalidParameter(
            "ATR period must be positive".to_string(),
        ));
    }
    if bars.len() < period + 1 {
        return Err(RiskError::InsufficientData(format!(
            "ATR({}) needs {} bars, have {}",
            period,
            period + 1,
            bars.len()
        )));
    }

    let tail = &bars[bars.len() - period - 1..];
    let total: f64 = tail
        .windows(2)
        .map(|w| {
            let prev_close = w[0].close;
            let bar = &w[1];
            (bar.high - bar.low)
                .max((bar.high - prev_close).abs())
                .max((bar.low - prev_close).abs())
        })
        .sum();

    Ok(total / period as f64)
}

/// Largest peak-to-trough decline as a fraction (<= 0)
pub fn max_drawdown(closes: &[f64]) -> Result<f64> {
    let Some(&first) = closes.first() else {
        return Err(RiskError::InsufficientData("No closes".to_string()));
    };

    let mut peak = first;
    let mut max_dd = 0.0;

    for &close in closes {
        if close > peak {
            peak = close;
        }
        if peak > 0.0 {
            let drawdown = (close - peak) / peak;
            if drawdown < max_dd {
                max_dd = drawdown;
            }
        }
    }

    Ok(max_dd)
}

/// Qualitative band for annualized volatility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolatilityRating {
    VeryLow,
    Low,
    Moderate,
    High,
    VeryHigh,
}

impl VolatilityRating {
    pub fn from_annualized(annualized: f64) -> Self {
        if annualized > 0.4 {
            VolatilityRating::VeryHigh
        } else if annualized > 0.3 {
            VolatilityRating::High
        } else if annualized > 0.2 {
            VolatilityRating::Moderate
        } else if annualized > 0.1 {
            VolatilityRating::Low
        } else {
            VolatilityRating::VeryLow
        }
    }
}

impl fmt::Display for VolatilityRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VolatilityRating::VeryLow => write!(f, "very low"),
            VolatilityRating::Low => write!(f, "low"),
            VolatilityRating::Moderate => write!(f, "moderate"),
            VolatilityRating::High => write!(f, "high"),
            VolatilityRating::VeryHigh => write!(f, "very high"),
        }
    }
}
