use crate::error::{Result, StorageError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One OHLCV observation for a symbol
///
/// Construct with [`Bar::new`] to get invariant checking; the fields stay
/// public so analyzers can read them without accessors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl Bar {
    /// Create a validated bar
    pub fn new(
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: u64,
    ) -> Result<Self> {
        let bar = Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        };
        bar.validate()?;
        Ok(bar)
    }

    /// Check price sanity and the high/low envelope
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(StorageError::InvalidBar(format!(
                    "{} must be finite and non-negative, got {}",
                    name, value
                )));
            }
        }

        if self.high < self.open.max(self.close).max(self.low) {
            return Err(StorageError::InvalidBar(format!(
                "high {} below max(open, close, low) at {}",
                self.high, self.timestamp
            )));
        }

        if self.low > self.open.min(self.close).min(self.high) {
            return Err(StorageError::InvalidBar(format!(
                "low {} above min(open, close, high) at {}",
                self.low, self.timestamp
            )));
        }

        Ok(())
    }

    /// High minus low
    pub fn range(&self) -> f64 {
        self.high - self.low
    }
}

/// Bar tagged with its symbol, the shape ingestion files use
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BarRecord {
    pub symbol: String,
    #[serde(flatten)]
    pub bar: Bar,
}

/// Immutable copy of a symbol's committed bars
///
/// `revision` only moves on non-append mutations (replace, truncate,
/// retention trims), so a consumer that saw revision `r` with `n` bars can
/// treat a later snapshot with the same revision as `n` old bars plus new ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesSnapshot {
    pub symbol: String,
    pub revision: u64,
    pub bars: Vec<Bar>,
}

impl SeriesSnapshot {
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    /// Bars with timestamp <= `as_of`
    pub fn until(&self, as_of: DateTime<Utc>) -> &[Bar] {
        let end = self.bars.partition_point(|b| b.timestamp <= as_of);
        &self.bars[..end]
    }

    /// Closing prices in series order
    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }
}
