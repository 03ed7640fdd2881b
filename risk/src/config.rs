//! Risk metric configuration
//!
//! Loaded from YAML or JSON the same way policy documents are, with every
//! field defaulted and unknown keys rejected.

use crate::error::{Result, RiskError};
use serde::{Deserialize, Serialize};

/// Window sizes and scaling for risk metrics
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RiskConfig {
    /// Number of trailing returns used for volatility (default 20)
    #[serde(default = "default_volatility_window")]
    pub volatility_window: usize,

    /// Report annualized volatility alongside the per-period figure
    #[serde(default = "default_annualize")]
    pub annualize: bool,

    /// Trading periods per year used for annualization (default 252)
    #[serde(default = "default_periods_per_year")]
    pub periods_per_year: f64,

    /// Number of trailing aligned returns used for beta (default 60)
    #[serde(default = "default_beta_window")]
    pub beta_window: usize,

    /// Average true range period (default 14)
    #[serde(default = "default_atr_period")]
    pub atr_period: usize,

    /// Benchmark symbol for beta (None = beta not computed)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub benchmark: Option<String>,
}

fn default_volatility_window() -> usize {
    20
}

fn default_annualize() -> bool {
    true
}

fn default_periods_per_year() -> f64 {
    252.0
}

fn default_beta_window() -> usize {
    60
}

fn default_atr_period() -> usize {
    14
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            volatility_window: default_volatility_window(),
            annualize: default_annualize(),
            periods_per_year: default_periods_per_year(),
            beta_window: default_beta_window(),
            atr_period: default_atr_period(),
            benchmark: None,
        }
    }
}

impl RiskConfig {
    /// Load configuration from a YAML string
    ///
    /// # Example
    ///
    /// ```
    /// use ag_risk::RiskConfig;
    ///
    /// let yaml = r#"
    /// volatility_window: 30
    /// benchmark: SPY
    /// "#;
    ///
    /// let config = RiskConfig::from_yaml(yaml).unwrap();
    /// assert_eq!(config.volatility_window, 30);
    /// assert_eq!(config.beta_window, 60);
    /// ```
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: RiskConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let config: RiskConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check window sizes and scaling
    pub fn validate(&self) -> Result<()> {
        if self.volatility_window < 2 {
            return Err(RiskError::InvalidParameter(format!(
                "volatility_window must be at least 2, got {}",
                self.volatility_window
            )));
        }
        if self.beta_window < 2 {
            return Err(RiskError::InvalidParameter(format!(
                "beta_window must be at least 2, got {}",
                self.beta_window
            )));
        }
        if self.atr_period == 0 {
            return Err(RiskError::InvalidParameter(
                "atr_period must be positive".to_string(),
            ));
        }
        if !self.periods_per_year.is_finite() || self.periods_per_year <= 0.0 {
            return Err(RiskError::InvalidParameter(format!(
                "periods_per_year must be positive, got {}",
                self.periods_per_year
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RiskConfig::default();
        assert_eq!(config.volatility_window, 20);
        assert_eq!(config.periods_per_year, 252.0);
        assert!(config.annualize);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_yaml_uses_defaults() {
        let config = RiskConfig::from_yaml("{}").unwrap();
        assert_eq!(config, RiskConfig::default());
    }

    #[test]
    fn test_json() {
        let config = RiskConfig::from_json(r#"{"annualize": false, "atr_period": 10}"#).unwrap();
        assert!(!config.annualize);
        assert_eq!(config.atr_period, 10);
    }

    #[test]
    fn test_rejects_unknown_keys() {
        assert!(RiskConfig::from_yaml("volatility: 20\n").is_err());
    }

    #[test]
    fn test_rejects_bad_windows() {
        assert!(RiskConfig::from_yaml("volatility_window: 1\n").is_err());
        assert!(RiskConfig::from_yaml("periods_per_year: 0\n").is_err());
    }
}
