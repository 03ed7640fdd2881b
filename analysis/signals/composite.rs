//! Rule-table scoring and weighted composite recommendation
//!
//! Each factor reading is scored by the first matching rule of its factor,
//! multiplied by the factor weight and summed. The rule table is plain data
//! (YAML/JSON), so it can be inspected and replaced without code changes.

use crate::config::RecommendationConfig;
use crate::error::{AnalysisError, Result};
use crate::types::{AnalysisSnapshot, RecommendationResult, Signal};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Scored input to the composite
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Factor {
    Rsi,
    Macd,
    Bollinger,
    Trend,
    /// Percent distance of the close from the longest SMA
    PriceVsSma,
    Momentum,
    /// Stochastic %K
    Stochastic,
    Volatility,
}

impl Factor {
    pub const ALL: [Factor; 8] = [
        Factor::Rsi,
        Factor::Macd,
        Factor::Bollinger,
        Factor::Trend,
        Factor::PriceVsSma,
        Factor::Momentum,
        Factor::Stochastic,
        Factor::Volatility,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Factor::Rsi => "rsi",
            Factor::Macd => "macd",
            Factor::Bollinger => "bollinger",
            Factor::Trend => "trend",
            Factor::PriceVsSma => "price_vs_sma",
            Factor::Momentum => "momentum",
            Factor::Stochastic => "stochastic",
            Factor::Volatility => "volatility",
        }
    }

    /// Snapshot reading key whose absence explains a missing factor
    fn source(&self) -> &'static str {
        match self {
            Factor::Rsi => "rsi",
            Factor::Macd => "macd",
            Factor::Bollinger => "bollinger",
            Factor::Trend => "trend",
            Factor::PriceVsSma => "price_vs_sma",
            Factor::Momentum => "roc",
            Factor::Stochastic => "stochastic",
            Factor::Volatility => "volatility",
        }
    }
}

impl fmt::Display for Factor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Rule predicate over a factor reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", deny_unknown_fields)]
pub enum Condition {
    Above { value: f64 },
    AtLeast { value: f64 },
    Below { value: f64 },
    AtMost { value: f64 },
    /// Inclusive on both ends
    Between { low: f64, high: f64 },
    Always,
}

impl Condition {
    pub fn matches(&self, reading: f64) -> bool {
        match *self {
            Condition::Above { value } => reading > value,
            Condition::AtLeast { value } => reading >= value,
            Condition::Below { value } => reading < value,
            Condition::AtMost { value } => reading <= value,
            Condition::Between { low, high } => reading >= low && reading <= high,
            Condition::Always => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Rule {
    pub when: Condition,
    /// Sub-score in [-1, 1]
    pub score: f64,
    pub label: String,
}

impl Rule {
    fn new(when: Condition, score: f64, label: &str) -> Self {
        Self {
            when,
            score,
            label: label.to_string(),
        }
    }
}

/// Weight and ordered rules of one factor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FactorRules {
    pub weight: f64,
    pub rules: Vec<Rule>,
}

/// Factor -> weighted rules; first matching rule wins
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleTable {
    pub factors: BTreeMap<Factor, FactorRules>,
}

impl Default for RuleTable {
    fn default() -> Self {
        use Condition::*;

        let mut factors = BTreeMap::new();
        factors.insert(
            Factor::Rsi,
            FactorRules {
                weight: 0.20,
                rules: vec![
                    Rule::new(Above { value: 70.0 }, -1.0, "overbought"),
                    Rule::new(Below { value: 30.0 }, 1.0, "oversold"),
                    Rule::new(Between { low: 45.0, high: 55.0 }, 0.0, "neutral"),
                    Rule::new(Below { value: 45.0 }, 0.5, "leaning oversold"),
                    Rule::new(Always, -0.5, "leaning overbought"),
                ],
            },
        );
        factors.insert(
            Factor::Macd,
            FactorRules {
                weight: 0.15,
                rules: vec![
                    Rule::new(AtLeast { value: 1.5 }, 1.0, "bullish crossover"),
                    Rule::new(AtLeast { value: 0.5 }, 0.5, "above signal line"),
                    Rule::new(AtMost { value: -1.5 }, -1.0, "bearish crossover"),
                    Rule::new(AtMost { value: -0.5 }, -0.5, "below signal line"),
                    Rule::new(Always, 0.0, "on signal line"),
                ],
            },
        );
        factors.insert(
            Factor::Bollinger,
            FactorRules {
                weight: 0.10,
                rules: vec![
                    Rule::new(Above { value: 1.0 }, -1.0, "above upper band"),
                    Rule::new(Below { value: 0.0 }, 1.0, "below lower band"),
                    Rule::new(Above { value: 0.8 }, -0.5, "near upper band"),
                    Rule::new(Below { value: 0.2 }, 0.5, "near lower band"),
                    Rule::new(Always, 0.0, "inside bands"),
                ],
            },
        );
        factors.insert(
            Factor::Trend,
            FactorRules {
                weight: 0.20,
                rules: vec![
                    Rule::new(Above { value: 0.5 }, 1.0, "uptrend"),
                    Rule::new(Below { value: -0.5 }, -1.0, "downtrend"),
                    Rule::new(Always, 0.0, "sideways"),
                ],
            },
        );
        factors.insert(
            Factor::Momentum,
            FactorRules {
                weight: 0.10,
                rules: vec![
                    Rule::new(Above { value: 10.0 }, 1.0, "very strong momentum"),
                    Rule::new(Above { value: 5.0 }, 0.5, "strong momentum"),
                    Rule::new(Above { value: -5.0 }, 0.0, "neutral momentum"),
                    Rule::new(Above { value: -10.0 }, -0.5, "weak momentum"),
                    Rule::new(Always, -1.0, "very weak momentum"),
                ],
            },
        );
        factors.insert(
            Factor::PriceVsSma,
            FactorRules {
                weight: 0.10,
                rules: vec![
                    Rule::new(Above { value: 5.0 }, 1.0, "well above long SMA"),
                    Rule::new(Below { value: -5.0 }, -1.0, "well below long SMA"),
                    Rule::new(Always, 0.0, "near long SMA"),
                ],
            },
        );
        factors.insert(
            Factor::Stochastic,
            FactorRules {
                weight: 0.10,
                rules: vec![
                    Rule::new(Above { value: 80.0 }, -1.0, "overbought"),
                    Rule::new(Below { value: 20.0 }, 1.0, "oversold"),
                    Rule::new(Always, 0.0, "neutral"),
                ],
            },
        );
        factors.insert(
            Factor::Volatility,
            FactorRules {
                weight: 0.05,
                rules: vec![
                    Rule::new(Above { value: 0.6 }, -0.5, "very high volatility"),
                    Rule::new(Always, 0.0, "normal volatility"),
                ],
            },
        );

        Self { factors }
    }
}

impl RuleTable {
    /// Load a rule table from YAML
    ///
    /// # Example
    ///
    /// ```
    /// use ag_analysis::RuleTable;
    ///
    /// let yaml = r#"
    /// trend:
    ///   weight: 1.0
    ///   rules:
    ///     - when: { type: Above, value: 0.5 }
    ///       score: 1.0
    ///       label: uptrend
    ///     - when: { type: Always }
    ///       score: 0.0
    ///       label: no trend
    /// "#;
    ///
    /// let table = RuleTable::from_yaml(yaml).unwrap();
    /// assert_eq!(table.evaluate(ag_analysis::Factor::Trend, 1.0).unwrap().label, "uptrend");
    /// ```
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let table: RuleTable = serde_yaml::from_str(yaml)?;
        table.validate()?;
        Ok(table)
    }

    pub fn weight(&self, factor: Factor) -> f64 {
        self.factors.get(&factor).map_or(0.0, |f| f.weight)
    }

    /// First rule of `factor` whose condition matches `reading`
    pub fn evaluate(&self, factor: Factor, reading: f64) -> Option<&Rule> {
        self.factors
            .get(&factor)?
            .rules
            .iter()
            .find(|rule| rule.when.matches(reading))
    }

    /// Weights non-negative and summing to 1, scores in [-1, 1]
    pub fn validate(&self) -> Result<()> {
        if self.factors.is_empty() {
            return Err(AnalysisError::ConfigError(
                "rule table has no factors".to_string(),
            ));
        }

        let mut total = 0.0;
        for (factor, entry) in &self.factors {
            if !entry.weight.is_finite() || entry.weight < 0.0 {
                return Err(AnalysisError::ConfigError(format!(
                    "{}: weight must be non-negative, got {}",
                    factor, entry.weight
                )));
            }
            total += entry.weight;

            for rule in &entry.rules {
                if !(-1.0..=1.0).contains(&rule.score) {
                    return Err(AnalysisError::ConfigError(format!(
                        "{} rule '{}': score {} outside [-1, 1]",
                        factor, rule.label, rule.score
                    )));
                }
                if let Condition::Between { low, high } = rule.when {
                    if low > high {
                        return Err(AnalysisError::ConfigError(format!(
                            "{} rule '{}': empty range [{}, {}]",
                            factor, rule.label, low, high
                        )));
                    }
                }
            }
        }

        if (total - 1.0).abs() > 1e-9 {
            return Err(AnalysisError::ConfigError(format!(
                "factor weights must sum to 1, got {}",
                total
            )));
        }

        Ok(())
    }
}

/// Factor readings extracted from a snapshot
///
/// Returns (readings, skipped reasons). A factor is skipped when its source
/// reading is missing from the snapshot.
pub fn factor_readings(
    snapshot: &AnalysisSnapshot,
) -> (BTreeMap<Factor, f64>, BTreeMap<Factor, String>) {
    let mut readings = BTreeMap::new();
    let mut skipped = BTreeMap::new();

    for factor in Factor::ALL {
        let reading = match factor {
            Factor::Rsi => snapshot.technical.rsi,
            Factor::Macd => snapshot.technical.macd.map(|m| {
                if m.crossed_above() {
                    2.0
                } else if m.crossed_below() {
                    -2.0
                } else if m.histogram > 0.0 {
                    1.0
                } else if m.histogram < 0.0 {
                    -1.0
                } else {
                    0.0
                }
            }),
            Factor::Bollinger => snapshot.technical.bollinger.map(|b| b.percent_b),
            Factor::Trend => snapshot.price_action.trend.map(|t| t.score()),
            Factor::PriceVsSma => snapshot.technical.price_vs_sma,
            Factor::Momentum => snapshot.technical.roc,
            Factor::Stochastic => snapshot.technical.stochastic,
            Factor::Volatility => snapshot.risk.annualized_volatility,
        };

        match reading {
            Some(value) => {
                readings.insert(factor, value);
            }
            None => {
                let reason = snapshot
                    .unavailable
                    .get(factor.source())
                    .cloned()
                    .unwrap_or_else(|| format!("no {} reading", factor.source()));
                skipped.insert(factor, reason);
            }
        }
    }

    (readings, skipped)
}

/// Weighted composite recommendation
#[derive(Debug, Clone, Default)]
pub struct RecommendationEngine {
    config: RecommendationConfig,
}

impl RecommendationEngine {
    pub fn new(config: RecommendationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &RecommendationConfig {
        &self.config
    }

    /// Score a snapshot
    ///
    /// Pure: the same snapshot and configuration always yield the same result.
    pub fn recommend(&self, snapshot: &AnalysisSnapshot) -> RecommendationResult {
        let table = &self.config.rules;
        let (readings, factor_skips) = factor_readings(snapshot);

        let mut contributions = BTreeMap::new();
        let mut skipped = BTreeMap::new();
        let mut notes = Vec::new();
        let mut composite = 0.0;

        for factor in Factor::ALL {
            if !table.factors.contains_key(&factor) {
                continue;
            }
            if let Some(reason) = factor_skips.get(&factor) {
                skipped.insert(factor.to_string(), reason.clone());
                continue;
            }
            let Some(&reading) = readings.get(&factor) else {
                continue;
            };

            let (score, label) = match table.evaluate(factor, reading) {
                Some(rule) => (rule.score, rule.label.as_str()),
                None => (0.0, "no matching rule"),
            };
            let contribution = table.weight(factor) * score;
            composite += contribution;
            contributions.insert(factor.to_string(), contribution);
            notes.push(format!("{}: {} ({:+.3})", factor, label, contribution));
        }

        let modifier = &self.config.volume_modifier;
        if modifier.enabled && snapshot.volume.is_spike && composite != 0.0 {
            let direction = snapshot
                .previous_close
                .map_or(0.0, |prev| snapshot.close - prev);
            let confirms = direction * composite > 0.0;
            let factor = if confirms {
                modifier.amplify
            } else {
                modifier.dampen
            };
            let adjusted = composite * factor;
            contributions.insert("volume".to_string(), adjusted - composite);
            notes.push(format!(
                "volume: spike {} the move (x{})",
                if confirms { "confirms" } else { "contradicts" },
                factor
            ));
            composite = adjusted;
        }

        let score = composite.clamp(-1.0, 1.0);
        let signal = if score >= self.config.buy_threshold {
            Signal::Buy
        } else if score <= self.config.sell_threshold {
            Signal::Sell
        } else {
            Signal::Hold
        };

        for (factor, reason) in &skipped {
            notes.push(format!("{}: skipped ({})", factor, reason));
        }

        RecommendationResult {
            symbol: snapshot.symbol.clone(),
            timestamp: snapshot.timestamp,
            close: snapshot.close,
            score,
            signal,
            contributions,
            readings: readings
                .into_iter()
                .map(|(factor, value)| (factor.to_string(), value))
                .collect(),
            skipped,
            explanation: format!("{} {:+.3}: {}", signal, score, notes.join("; ")),
        }
    }
}
