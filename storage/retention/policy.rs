use crate::config::RetentionConfig;
use crate::types::Bar;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Bounded-history policy applied on the append path
#[derive(Debug, Clone, Default)]
pub struct RetentionPolicy {
    config: RetentionConfig,
}

impl RetentionPolicy {
    /// Create new retention policy
    pub fn new(config: RetentionConfig) -> Self {
        Self { config }
    }

    /// Number of oldest bars that must go for a series of `len` bars
    pub fn excess(&self, len: usize) -> usize {
        match self.config.max_bars_per_symbol {
            Some(max) if len > max => len - max,
            _ => 0,
        }
    }

    /// Trim the oldest bars beyond the cap, returning how many were removed
    pub fn enforce(&self, symbol: &str, bars: &mut Vec<Bar>) -> usize {
        let excess = self.excess(bars.len());
        if excess > 0 {
            bars.drain(..excess);
            info!(symbol, removed = excess, "Retention cap trimmed oldest bars");
        }
        excess
    }

    /// Drop every bar strictly before `cutoff`
    pub fn truncate_before(
        symbol: &str,
        bars: &mut Vec<Bar>,
        cutoff: DateTime<Utc>,
    ) -> RetentionReport {
        let removed = bars.partition_point(|b| b.timestamp < cutoff);
        bars.drain(..removed);

        info!(symbol, removed, cutoff = %cutoff, "Truncated series history");

        RetentionReport {
            symbol: symbol.to_string(),
            removed,
            remaining: bars.len(),
            cutoff,
        }
    }
}

/// Outcome of an explicit truncation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetentionReport {
    pub symbol: String,
    pub removed: usize,
    pub remaining: usize,
    pub cutoff: DateTime<Utc>,
}

/// Store-wide size statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageStats {
    pub symbols: usize,
    pub total_bars: usize,
    pub max_bars_per_symbol: Option<usize>,
}
