//! Risk snapshot evaluation
//!
//! `RiskMetrics` applies a [`RiskConfig`] to a bar series and collects every
//! metric it can compute. Metrics that lack data are reported in
//! `unavailable` instead of failing the whole snapshot.

use crate::config::RiskConfig;
use crate::error::Result;
use crate::metrics::{self, BetaEstimate, VolatilityRating};
use ag_storage::Bar;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Risk readings for one series at its last bar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskSnapshot {
    /// Per-period sample volatility of simple returns
    pub volatility: Option<f64>,
    /// Volatility scaled by sqrt(periods_per_year)
    pub annualized_volatility: Option<f64>,
    pub rating: Option<VolatilityRating>,
    pub beta: Option<BetaEstimate>,
    pub atr: Option<f64>,
    /// Largest peak-to-trough decline of closes (<= 0)
    pub max_drawdown: Option<f64>,
    /// Metric name -> reason it could not be computed
    pub unavailable: BTreeMap<String, String>,
}

/// Risk metric evaluator
#[derive(Debug, Clone, Default)]
pub struct RiskMetrics {
    config: RiskConfig,
}

impl RiskMetrics {
    /// Create an evaluator from a validated configuration
    pub fn new(config: RiskConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Load configuration from YAML
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(Self {
            config: RiskConfig::from_yaml(yaml)?,
        })
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    /// Per-period and (if enabled) annualized volatility
    pub fn volatility(&self, closes: &[f64]) -> Result<(f64, Option<f64>)> {
        let vol = metrics::volatility(closes, self.config.volatility_window)?;
        let annualized = self
            .config
            .annualize
            .then(|| metrics::annualize(vol, self.config.periods_per_year));
        Ok((vol, annualized))
    }

    pub fn beta(&self, asset: &[Bar], benchmark: &[Bar]) -> Result<BetaEstimate> {
        metrics::beta(asset, benchmark, self.config.beta_window)
    }

    pub fn atr(&self, bars: &[Bar]) -> Result<f64> {
        metrics::average_true_range(bars, self.config.atr_period)
    }

    /// Compute every metric for `bars`
    ///
    /// Beta is only attempted when a benchmark series is supplied.
    pub fn snapshot(&self, bars: &[Bar], benchmark: Option<&[Bar]>) -> RiskSnapshot {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let mut unavailable = BTreeMap::new();

        let (volatility, annualized_volatility) = match self.volatility(&closes) {
            Ok((vol, annualized)) => (Some(vol), annualized),
            Err(e) => {
                unavailable.insert("volatility".to_string(), e.to_string());
                (None, None)
            }
        };

        // Rating needs an annual figure even when the caller disabled reporting it
        let rating = volatility.map(|vol| {
            VolatilityRating::from_annualized(metrics::annualize(
                vol,
                self.config.periods_per_year,
            ))
        });

        let beta = match benchmark {
            Some(benchmark) => record(&mut unavailable, "beta", self.beta(bars, benchmark)),
            None => {
                let reason = match &self.config.benchmark {
                    Some(symbol) => format!("no bars for benchmark {}", symbol),
                    None => "no benchmark configured".to_string(),
                };
                unavailable.insert("beta".to_string(), reason);
                None
            }
        };

        let atr = record(&mut unavailable, "atr", self.atr(bars));
        let max_drawdown = record(
            &mut unavailable,
            "max_drawdown",
            metrics::max_drawdown(&closes),
        );

        RiskSnapshot {
            volatility,
            annualized_volatility,
            rating,
            beta,
            atr,
            max_drawdown,
            unavailable,
        }
    }
}

fn record<T>(
    unavailable: &mut BTreeMap<String, String>,
    name: &str,
    result: Result<T>,
) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            unavailable.insert(name.to_string(), e.to_string());
            None
        }
    }
}
