//! Analysis configuration
//!
//! Every section has documented defaults and rejects unknown keys. Load with
//! [`AnalysisConfig::from_yaml`], [`AnalysisConfig::from_json`] or
//! [`AnalysisConfig::from_file`].

use crate::alerts::AlertRule;
use crate::cache::DEFAULT_MAX_ENTRIES;
use crate::error::{AnalysisError, Result};
use crate::signals::RuleTable;
use crate::types::{IndicatorKind, RsiSmoothing};
use ag_risk::RiskConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub indicators: IndicatorConfig,
    #[serde(default)]
    pub volume: VolumeConfig,
    #[serde(default)]
    pub price_action: PriceActionConfig,
    #[serde(default)]
    pub risk: RiskConfig,
    #[serde(default)]
    pub recommendation: RecommendationConfig,
    /// Alert conditions checked by `AnalysisEngine::check_alerts`
    #[serde(default)]
    pub alerts: Vec<AlertRule>,
    #[serde(default)]
    pub cache: CacheConfig,
}

impl AnalysisConfig {
    /// Load configuration from a YAML string
    ///
    /// # Example
    ///
    /// ```
    /// use ag_analysis::AnalysisConfig;
    ///
    /// let yaml = r#"
    /// indicators:
    ///   rsi_period: 9
    ///   rsi_smoothing: simple
    /// recommendation:
    ///   buy_threshold: 0.4
    /// "#;
    ///
    /// let config = AnalysisConfig::from_yaml(yaml).unwrap();
    /// assert_eq!(config.indicators.rsi_period, 9);
    /// assert_eq!(config.indicators.macd_slow, 26);
    /// ```
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: AnalysisConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let config: AnalysisConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file; `.json` files are parsed as JSON, anything else as YAML
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&content),
            _ => Self::from_yaml(&content),
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.indicators.validate()?;
        self.volume.validate()?;
        self.price_action.validate()?;
        self.risk.validate()?;
        self.recommendation.validate()?;
        self.cache.validate()?;
        Ok(())
    }
}

/// Indicator cache bound
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// Cached (symbol, indicator) entries before LRU eviction (default 1024)
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

fn default_max_entries() -> usize {
    DEFAULT_MAX_ENTRIES
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
        }
    }
}

impl CacheConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_entries == 0 {
            return Err(AnalysisError::ConfigError(
                "cache.max_entries must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Indicator periods
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IndicatorConfig {
    /// SMA periods reported in the snapshot (default [20, 50])
    #[serde(default = "default_sma_periods")]
    pub sma_periods: Vec<usize>,

    /// EMA periods reported in the snapshot (default [12, 26])
    #[serde(default = "default_ema_periods")]
    pub ema_periods: Vec<usize>,

    #[serde(default = "default_rsi_period")]
    pub rsi_period: usize,

    #[serde(default)]
    pub rsi_smoothing: RsiSmoothing,

    #[serde(default = "default_macd_fast")]
    pub macd_fast: usize,

    #[serde(default = "default_macd_slow")]
    pub macd_slow: usize,

    #[serde(default = "default_macd_signal")]
    pub macd_signal: usize,

    #[serde(default = "default_bollinger_period")]
    pub bollinger_period: usize,

    /// Band width in standard deviations (default 2)
    #[serde(default = "default_bollinger_k")]
    pub bollinger_k: f64,

    /// Rate-of-change period used for the momentum factor (default 10)
    #[serde(default = "default_roc_period")]
    pub roc_period: usize,

    #[serde(default = "default_stochastic_period")]
    pub stochastic_period: usize,
}

fn default_sma_periods() -> Vec<usize> {
    vec![20, 50]
}

fn default_ema_periods() -> Vec<usize> {
    vec![12, 26]
}

fn default_rsi_period() -> usize {
    14
}

fn default_macd_fast() -> usize {
    12
}

fn default_macd_slow() -> usize {
    26
}

fn default_macd_signal() -> usize {
    9
}

fn default_bollinger_period() -> usize {
    20
}

fn default_bollinger_k() -> f64 {
    2.0
}

fn default_roc_period() -> usize {
    10
}

fn default_stochastic_period() -> usize {
    14
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            sma_periods: default_sma_periods(),
            ema_periods: default_ema_periods(),
            rsi_period: default_rsi_period(),
            rsi_smoothing: RsiSmoothing::default(),
            macd_fast: default_macd_fast(),
            macd_slow: default_macd_slow(),
            macd_signal: default_macd_signal(),
            bollinger_period: default_bollinger_period(),
            bollinger_k: default_bollinger_k(),
            roc_period: default_roc_period(),
            stochastic_period: default_stochastic_period(),
        }
    }
}

impl IndicatorConfig {
    pub fn rsi(&self) -> IndicatorKind {
        IndicatorKind::Rsi {
            period: self.rsi_period,
            smoothing: self.rsi_smoothing,
        }
    }

    pub fn macd(&self) -> IndicatorKind {
        IndicatorKind::Macd {
            fast: self.macd_fast,
            slow: self.macd_slow,
            signal: self.macd_signal,
        }
    }

    pub fn bollinger(&self) -> IndicatorKind {
        IndicatorKind::Bollinger {
            period: self.bollinger_period,
            k: self.bollinger_k,
        }
    }

    pub fn roc(&self) -> IndicatorKind {
        IndicatorKind::Roc {
            period: self.roc_period,
        }
    }

    pub fn stochastic(&self) -> IndicatorKind {
        IndicatorKind::Stochastic {
            period: self.stochastic_period,
        }
    }

    /// Every indicator the snapshot reports
    pub fn kinds(&self) -> Vec<IndicatorKind> {
        let mut kinds: Vec<IndicatorKind> = self
            .sma_periods
            .iter()
            .map(|&period| IndicatorKind::Sma { period })
            .chain(
                self.ema_periods
                    .iter()
                    .map(|&period| IndicatorKind::Ema { period }),
            )
            .collect();
        kinds.extend([
            self.rsi(),
            self.macd(),
            self.bollinger(),
            self.roc(),
            self.stochastic(),
        ]);
        kinds
    }

    pub fn validate(&self) -> Result<()> {
        for kind in self.kinds() {
            kind.validate()?;
        }
        Ok(())
    }
}

/// Volume analysis windows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VolumeConfig {
    /// Bars in the trailing average, excluding the current bar (default 20)
    #[serde(default = "default_average_window")]
    pub average_window: usize,

    /// Bars per window in the trend comparison (default 5)
    #[serde(default = "default_short_window")]
    pub short_window: usize,

    /// Relative change treated as flat (default 0.05)
    #[serde(default = "default_flat_tolerance")]
    pub flat_tolerance: f64,

    /// Relative volume at which a bar counts as a spike (default 1.5)
    #[serde(default = "default_spike_threshold")]
    pub spike_threshold: f64,
}

fn default_average_window() -> usize {
    20
}

fn default_short_window() -> usize {
    5
}

fn default_flat_tolerance() -> f64 {
    0.05
}

fn default_spike_threshold() -> f64 {
    1.5
}

impl Default for VolumeConfig {
    fn default() -> Self {
        Self {
            average_window: default_average_window(),
            short_window: default_short_window(),
            flat_tolerance: default_flat_tolerance(),
            spike_threshold: default_spike_threshold(),
        }
    }
}

impl VolumeConfig {
    pub fn validate(&self) -> Result<()> {
        if self.average_window == 0 || self.short_window == 0 {
            return Err(AnalysisError::ConfigError(
                "volume windows must be positive".to_string(),
            ));
        }
        if !(self.flat_tolerance >= 0.0) {
            return Err(AnalysisError::ConfigError(format!(
                "flat_tolerance must be non-negative, got {}",
                self.flat_tolerance
            )));
        }
        if !(self.spike_threshold > 0.0) {
            return Err(AnalysisError::ConfigError(format!(
                "spike_threshold must be positive, got {}",
                self.spike_threshold
            )));
        }
        Ok(())
    }
}

/// Support/resistance and trend settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PriceActionConfig {
    /// Bars on each side a pivot must dominate (default 5)
    #[serde(default = "default_pivot_window")]
    pub pivot_window: usize,

    /// Fraction of price within which pivots merge into one level (default 0.01)
    #[serde(default = "default_level_tolerance")]
    pub level_tolerance: f64,

    #[serde(default = "default_short_sma")]
    pub short_sma: usize,

    #[serde(default = "default_long_sma")]
    pub long_sma: usize,
}

fn default_pivot_window() -> usize {
    5
}

fn default_level_tolerance() -> f64 {
    0.01
}

fn default_short_sma() -> usize {
    10
}

fn default_long_sma() -> usize {
    20
}

impl Default for PriceActionConfig {
    fn default() -> Self {
        Self {
            pivot_window: default_pivot_window(),
            level_tolerance: default_level_tolerance(),
            short_sma: default_short_sma(),
            long_sma: default_long_sma(),
        }
    }
}

impl PriceActionConfig {
    pub fn validate(&self) -> Result<()> {
        if self.pivot_window == 0 {
            return Err(AnalysisError::ConfigError(
                "pivot_window must be positive".to_string(),
            ));
        }
        if !(self.level_tolerance >= 0.0) {
            return Err(AnalysisError::ConfigError(format!(
                "level_tolerance must be non-negative, got {}",
                self.level_tolerance
            )));
        }
        if self.short_sma == 0 || self.short_sma >= self.long_sma {
            return Err(AnalysisError::ConfigError(format!(
                "need 0 < short_sma < long_sma, got {} and {}",
                self.short_sma, self.long_sma
            )));
        }
        Ok(())
    }
}

/// Volume confirmation of the composite
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VolumeModifier {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Multiplier when the spike bar moved with the composite (default 1.25)
    #[serde(default = "default_amplify")]
    pub amplify: f64,

    /// Multiplier otherwise (default 0.75)
    #[serde(default = "default_dampen")]
    pub dampen: f64,
}

fn default_true() -> bool {
    true
}

fn default_amplify() -> f64 {
    1.25
}

fn default_dampen() -> f64 {
    0.75
}

impl Default for VolumeModifier {
    fn default() -> Self {
        Self {
            enabled: true,
            amplify: default_amplify(),
            dampen: default_dampen(),
        }
    }
}

/// Thresholds, volume modifier and rule table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecommendationConfig {
    /// Composite at or above which the signal is Buy (default 0.3)
    #[serde(default = "default_buy_threshold")]
    pub buy_threshold: f64,

    /// Composite at or below which the signal is Sell (default -0.3)
    #[serde(default = "default_sell_threshold")]
    pub sell_threshold: f64,

    #[serde(default)]
    pub volume_modifier: VolumeModifier,

    #[serde(default)]
    pub rules: RuleTable,
}

fn default_buy_threshold() -> f64 {
    0.3
}

fn default_sell_threshold() -> f64 {
    -0.3
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self {
            buy_threshold: default_buy_threshold(),
            sell_threshold: default_sell_threshold(),
            volume_modifier: VolumeModifier::default(),
            rules: RuleTable::default(),
        }
    }
}

impl RecommendationConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.sell_threshold < self.buy_threshold) {
            return Err(AnalysisError::ConfigError(format!(
                "sell_threshold {} must be below buy_threshold {}",
                self.sell_threshold, self.buy_threshold
            )));
        }
        let modifier = &self.volume_modifier;
        if !(modifier.amplify > 0.0) || !(modifier.dampen > 0.0) {
            return Err(AnalysisError::ConfigError(
                "volume modifier factors must be positive".to_string(),
            ));
        }
        self.rules.validate()
    }
}
