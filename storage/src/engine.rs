use crate::config::StoreConfig;
use crate::error::{Result, StorageError};
use crate::retention::{RetentionPolicy, RetentionReport, StorageStats};
use crate::types::{Bar, SeriesSnapshot};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Default)]
struct SeriesData {
    bars: Vec<Bar>,
    revision: u64,
}

/// Per-symbol OHLCV store
///
/// Each symbol's series sits behind its own `RwLock`: appends to one symbol
/// serialize on the write lock while readers of any symbol copy committed
/// bars under the read lock, so a reader never sees a half-written bar.
/// Different symbols never contend beyond the map shard.
pub struct TimeSeriesStore {
    series: DashMap<String, Arc<RwLock<SeriesData>>>,
    retention: RetentionPolicy,
    config: StoreConfig,
}

impl Default for TimeSeriesStore {
    fn default() -> Self {
        let config = StoreConfig::default();
        Self {
            series: DashMap::new(),
            retention: RetentionPolicy::new(config.retention.clone()),
            config,
        }
    }
}

impl TimeSeriesStore {
    /// Create a store with a validated configuration
    pub fn new(config: StoreConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            series: DashMap::new(),
            retention: RetentionPolicy::new(config.retention.clone()),
            config,
        })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn entry(&self, symbol: &str) -> Arc<RwLock<SeriesData>> {
        if let Some(existing) = self.series.get(symbol) {
            return existing.value().clone();
        }
        self.series
            .entry(symbol.to_string())
            .or_default()
            .value()
            .clone()
    }

    fn existing(&self, symbol: &str) -> Option<Arc<RwLock<SeriesData>>> {
        self.series.get(symbol).map(|s| s.value().clone())
    }

    /// Append a bar to the end of a symbol's series
    ///
    /// Fails with [`StorageError::OutOfOrder`] when the bar does not come
    /// strictly after the last stored bar; the series is left untouched.
    pub fn append(&self, symbol: &str, bar: Bar) -> Result<()> {
        bar.validate()?;

        let series = self.entry(symbol);
        let mut data = series.write();
        check_follows(symbol, data.bars.last(), &bar)?;

        data.bars.push(bar);
        if self.retention.enforce(symbol, &mut data.bars) > 0 {
            data.revision += 1;
        }

        Ok(())
    }

    /// Append several bars atomically: either all are committed or none
    pub fn append_batch(&self, symbol: &str, bars: &[Bar]) -> Result<usize> {
        if bars.is_empty() {
            return Ok(0);
        }

        for bar in bars {
            bar.validate()?;
        }
        for pair in bars.windows(2) {
            if pair[1].timestamp <= pair[0].timestamp {
                warn!(symbol, timestamp = %pair[1].timestamp, "Rejected out-of-order batch");
                return Err(StorageError::OutOfOrder {
                    symbol: symbol.to_string(),
                    timestamp: pair[1].timestamp,
                    last: pair[0].timestamp,
                });
            }
        }

        // The batch is internally ordered, so only a stored bar can conflict
        // with it and a rejected batch never creates a series
        let series = self.entry(symbol);
        let mut data = series.write();
        check_follows(symbol, data.bars.last(), &bars[0])?;

        data.bars.extend_from_slice(bars);
        if self.retention.enforce(symbol, &mut data.bars) > 0 {
            data.revision += 1;
        }

        debug!(symbol, count = bars.len(), "Appended batch");
        Ok(bars.len())
    }

    /// Replace the bar stored at `bar.timestamp`
    ///
    /// This is the only way to correct history. It bumps the series revision,
    /// which invalidates every cached value derived from the old data.
    pub fn replace(&self, symbol: &str, bar: Bar) -> Result<Bar> {
        bar.validate()?;

        let series = self
            .existing(symbol)
            .ok_or_else(|| StorageError::UnknownSymbol(symbol.to_string()))?;
        let mut data = series.write();

        let idx = data
            .bars
            .binary_search_by(|b| b.timestamp.cmp(&bar.timestamp))
            .map_err(|_| StorageError::BarNotFound {
                symbol: symbol.to_string(),
                timestamp: bar.timestamp,
            })?;

        let previous = std::mem::replace(&mut data.bars[idx], bar);
        data.revision += 1;

        debug!(symbol, timestamp = %bar.timestamp, "Replaced bar");
        Ok(previous)
    }

    /// Explicit history truncation: drop bars strictly before `cutoff`
    pub fn truncate_before(&self, symbol: &str, cutoff: DateTime<Utc>) -> Result<RetentionReport> {
        let series = self
            .existing(symbol)
            .ok_or_else(|| StorageError::UnknownSymbol(symbol.to_string()))?;
        let mut data = series.write();

        let report = RetentionPolicy::truncate_before(symbol, &mut data.bars, cutoff);
        if report.removed > 0 {
            data.revision += 1;
        }
        Ok(report)
    }

    /// Bars in the half-open interval `[start, end)`
    ///
    /// Unknown symbols yield an empty vector; "no data" is not an error here.
    pub fn get_series(
        &self,
        symbol: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Vec<Bar> {
        let Some(series) = self.existing(symbol) else {
            return Vec::new();
        };
        let data = series.read();

        let lo = start
            .map(|s| data.bars.partition_point(|b| b.timestamp < s))
            .unwrap_or(0);
        let hi = end
            .map(|e| data.bars.partition_point(|b| b.timestamp < e))
            .unwrap_or(data.bars.len());

        if lo >= hi {
            return Vec::new();
        }
        data.bars[lo..hi].to_vec()
    }

    /// Full copy of a symbol's series with its revision, `None` if unknown
    pub fn snapshot(&self, symbol: &str) -> Option<SeriesSnapshot> {
        let series = self.existing(symbol)?;
        let data = series.read();
        Some(SeriesSnapshot {
            symbol: symbol.to_string(),
            revision: data.revision,
            bars: data.bars.clone(),
        })
    }

    /// Current revision of a symbol's series
    pub fn revision(&self, symbol: &str) -> Option<u64> {
        self.existing(symbol).map(|s| s.read().revision)
    }

    pub fn last_bar(&self, symbol: &str) -> Option<Bar> {
        self.existing(symbol).and_then(|s| s.read().bars.last().copied())
    }

    /// Number of bars stored for a symbol (0 if unknown)
    pub fn len(&self, symbol: &str) -> usize {
        self.existing(symbol).map(|s| s.read().bars.len()).unwrap_or(0)
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.series.contains_key(symbol)
    }

    /// Known symbols, sorted
    pub fn symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self.series.iter().map(|e| e.key().clone()).collect();
        symbols.sort();
        symbols
    }

    pub fn stats(&self) -> StorageStats {
        let total_bars = self
            .series
            .iter()
            .map(|e| e.value().read().bars.len())
            .sum();
        StorageStats {
            symbols: self.series.len(),
            total_bars,
            max_bars_per_symbol: self.config.retention.max_bars_per_symbol,
        }
    }
}

/// `bar` must come strictly after `last`
fn check_follows(symbol: &str, last: Option<&Bar>, bar: &Bar) -> Result<()> {
    match last {
        Some(last) if bar.timestamp <= last.timestamp => {
            warn!(
                symbol,
                timestamp = %bar.timestamp,
                last = %last.timestamp,
                "Rejected out-of-order bar"
            );
            Err(StorageError::OutOfOrder {
                symbol: symbol.to_string(),
                timestamp: bar.timestamp,
                last: last.timestamp,
            })
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetentionConfig;
    use chrono::{Duration, TimeZone};

    fn day(i: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::days(i)
    }

    fn bar(i: i64, close: f64) -> Bar {
        Bar::new(day(i), close, close + 1.0, close - 1.0, close, 1_000).unwrap()
    }

    #[test]
    fn test_append_and_get() {
        let store = TimeSeriesStore::default();
        for i in 0..5 {
            store.append("AAPL", bar(i, 100.0 + i as f64)).unwrap();
        }

        assert_eq!(store.len("AAPL"), 5);
        let series = store.get_series("AAPL", None, None);
        assert_eq!(series.len(), 5);
        assert_eq!(series[4].close, 104.0);
    }

    #[test]
    fn test_out_of_order_leaves_store_unchanged() {
        let store = TimeSeriesStore::default();
        store.append("AAPL", bar(0, 100.0)).unwrap();
        store.append("AAPL", bar(1, 101.0)).unwrap();

        let duplicate = store.append("AAPL", bar(1, 999.0));
        assert!(matches!(duplicate, Err(StorageError::OutOfOrder { .. })));

        let time_travel = store.append("AAPL", bar(0, 999.0));
        assert!(matches!(time_travel, Err(StorageError::OutOfOrder { .. })));

        let series = store.get_series("AAPL", None, None);
        assert_eq!(series.len(), 2);
        assert_eq!(series[1].close, 101.0);
    }

    #[test]
    fn test_unknown_symbol_is_empty_not_error() {
        let store = TimeSeriesStore::default();
        assert!(store.get_series("NOPE", None, None).is_empty());
        assert!(store.snapshot("NOPE").is_none());
        assert!(!store.contains("NOPE"));
    }

    #[test]
    fn test_half_open_interval() {
        let store = TimeSeriesStore::default();
        for i in 0..10 {
            store.append("AAPL", bar(i, 100.0)).unwrap();
        }

        let slice = store.get_series("AAPL", Some(day(2)), Some(day(5)));
        assert_eq!(slice.len(), 3);
        assert_eq!(slice[0].timestamp, day(2));
        assert_eq!(slice[2].timestamp, day(4));

        assert!(store.get_series("AAPL", Some(day(5)), Some(day(5))).is_empty());
        assert_eq!(store.get_series("AAPL", Some(day(8)), None).len(), 2);
    }

    #[test]
    fn test_gaps_are_preserved() {
        let store = TimeSeriesStore::default();
        store.append("AAPL", bar(0, 100.0)).unwrap();
        store.append("AAPL", bar(3, 101.0)).unwrap();
        store.append("AAPL", bar(4, 102.0)).unwrap();

        let series = store.get_series("AAPL", None, None);
        assert_eq!(series.len(), 3);
        assert_eq!(series[1].timestamp, day(3));
    }

    #[test]
    fn test_batch_is_atomic() {
        let store = TimeSeriesStore::default();
        store.append("AAPL", bar(0, 100.0)).unwrap();

        let bad = vec![bar(1, 101.0), bar(3, 103.0), bar(2, 102.0)];
        assert!(store.append_batch("AAPL", &bad).is_err());
        assert_eq!(store.len("AAPL"), 1);

        let good = vec![bar(1, 101.0), bar(2, 102.0)];
        assert_eq!(store.append_batch("AAPL", &good).unwrap(), 2);
        assert_eq!(store.len("AAPL"), 3);
    }

    #[test]
    fn test_rejected_batch_does_not_create_symbol() {
        let store = TimeSeriesStore::default();

        let reversed = vec![bar(2, 102.0), bar(1, 101.0)];
        assert!(matches!(
            store.append_batch("NEW", &reversed),
            Err(StorageError::OutOfOrder { .. })
        ));

        assert!(!store.contains("NEW"));
        assert!(store.symbols().is_empty());
        assert!(store.snapshot("NEW").is_none());
    }

    #[test]
    fn test_zero_retention_cap_rejected() {
        let config = StoreConfig {
            retention: RetentionConfig {
                max_bars_per_symbol: Some(0),
            },
        };
        assert!(matches!(
            TimeSeriesStore::new(config),
            Err(StorageError::ConfigError(_))
        ));
    }

    #[test]
    fn test_replace_bumps_revision() {
        let store = TimeSeriesStore::default();
        for i in 0..3 {
            store.append("AAPL", bar(i, 100.0)).unwrap();
        }
        assert_eq!(store.revision("AAPL"), Some(0));

        let previous = store.replace("AAPL", bar(1, 150.0)).unwrap();
        assert_eq!(previous.close, 100.0);
        assert_eq!(store.revision("AAPL"), Some(1));
        assert_eq!(store.get_series("AAPL", None, None)[1].close, 150.0);

        assert!(matches!(
            store.replace("AAPL", bar(7, 1.0)),
            Err(StorageError::BarNotFound { .. })
        ));
        assert!(matches!(
            store.replace("MSFT", bar(1, 1.0)),
            Err(StorageError::UnknownSymbol(_))
        ));
    }

    #[test]
    fn test_appends_do_not_bump_revision() {
        let store = TimeSeriesStore::default();
        store.append("AAPL", bar(0, 100.0)).unwrap();
        store.append("AAPL", bar(1, 100.0)).unwrap();
        assert_eq!(store.revision("AAPL"), Some(0));
    }

    #[test]
    fn test_truncate_before() {
        let store = TimeSeriesStore::default();
        for i in 0..6 {
            store.append("AAPL", bar(i, 100.0)).unwrap();
        }

        let report = store.truncate_before("AAPL", day(4)).unwrap();
        assert_eq!(report.removed, 4);
        assert_eq!(store.len("AAPL"), 2);
        assert_eq!(store.revision("AAPL"), Some(1));

        // Still append-only after truncation
        assert!(store.append("AAPL", bar(3, 1.0)).is_err());
        assert!(store.append("AAPL", bar(6, 1.0)).is_ok());
    }

    #[test]
    fn test_retention_cap() {
        let store = TimeSeriesStore::new(StoreConfig {
            retention: RetentionConfig {
                max_bars_per_symbol: Some(3),
            },
        })
        .unwrap();
        for i in 0..5 {
            store.append("AAPL", bar(i, 100.0 + i as f64)).unwrap();
        }

        let series = store.get_series("AAPL", None, None);
        assert_eq!(series.len(), 3);
        assert_eq!(series[0].close, 102.0);
        assert!(store.revision("AAPL").unwrap() > 0);
    }

    #[test]
    fn test_symbols_sorted_and_stats() {
        let store = TimeSeriesStore::default();
        store.append("MSFT", bar(0, 1.0)).unwrap();
        store.append("AAPL", bar(0, 1.0)).unwrap();
        store.append("AAPL", bar(1, 1.0)).unwrap();

        assert_eq!(store.symbols(), vec!["AAPL".to_string(), "MSFT".to_string()]);
        let stats = store.stats();
        assert_eq!(stats.symbols, 2);
        assert_eq!(stats.total_bars, 3);
    }
}
