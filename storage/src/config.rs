use crate::error::{Result, StorageError};
use serde::{Deserialize, Serialize};

/// Time-series store configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// History retention configuration
    #[serde(default)]
    pub retention: RetentionConfig,
}

/// History retention configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetentionConfig {
    /// Maximum bars kept per symbol (None = unbounded)
    #[serde(default)]
    pub max_bars_per_symbol: Option<usize>,
}

impl StoreConfig {
    /// Load configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: StoreConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that cannot be honoured
    pub fn validate(&self) -> Result<()> {
        if self.retention.max_bars_per_symbol == Some(0) {
            return Err(StorageError::ConfigError(
                "retention.max_bars_per_symbol must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_unbounded() {
        let config = StoreConfig::default();
        assert_eq!(config.retention.max_bars_per_symbol, None);
    }

    #[test]
    fn test_from_yaml() {
        let yaml = r#"
retention:
  max_bars_per_symbol: 500
"#;
        let config = StoreConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.retention.max_bars_per_symbol, Some(500));
    }

    #[test]
    fn test_rejects_unknown_keys() {
        let yaml = r#"
retention:
  max_bars: 500
"#;
        assert!(StoreConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_rejects_zero_cap() {
        let yaml = r#"
retention:
  max_bars_per_symbol: 0
"#;
        assert!(matches!(
            StoreConfig::from_yaml(yaml),
            Err(StorageError::ConfigError(_))
        ));
    }
}
