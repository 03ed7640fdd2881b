//! Analysis engine
//!
//! Reads immutable series snapshots from a shared [`TimeSeriesStore`],
//! computes technical, volume, price-action and risk readings, and scores
//! them with the [`RecommendationEngine`].

use crate::alerts::{self, Alert};
use crate::cache::{IndicatorCache, Point};
use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, Result};
use crate::signals::{PriceActionAnalyzer, RecommendationEngine, VolumeAnalyzer};
use crate::types::{
    AnalysisSnapshot, BandsReading, IndicatorKind, IndicatorResult, IndicatorValue, MacdReading,
    RecommendationResult, TechnicalReadings,
};
use ag_risk::RiskMetrics;
use ag_storage::{SeriesSnapshot, TimeSeriesStore};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Entry point for symbol analysis
pub struct AnalysisEngine {
    store: Arc<TimeSeriesStore>,
    config: AnalysisConfig,
    cache: IndicatorCache,
}

impl AnalysisEngine {
    /// Create an engine over `store` with a validated configuration
    pub fn new(store: Arc<TimeSeriesStore>, config: AnalysisConfig) -> Result<Self> {
        config.validate()?;
        let cache = IndicatorCache::with_capacity(config.cache.max_entries);
        Ok(Self {
            store,
            config,
            cache,
        })
    }

    pub fn with_defaults(store: Arc<TimeSeriesStore>) -> Self {
        Self {
            store,
            config: AnalysisConfig::default(),
            cache: IndicatorCache::new(),
        }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<TimeSeriesStore> {
        &self.store
    }

    pub fn cache(&self) -> &IndicatorCache {
        &self.cache
    }

    /// Recommendation for `symbol` using bars at or before `as_of`
    pub fn analyze(
        &self,
        symbol: &str,
        as_of: Option<DateTime<Utc>>,
    ) -> Result<RecommendationResult> {
        self.analyze_with(symbol, as_of, &self.config)
    }

    /// Recommendation with a per-call configuration
    pub fn analyze_with(
        &self,
        symbol: &str,
        as_of: Option<DateTime<Utc>>,
        config: &AnalysisConfig,
    ) -> Result<RecommendationResult> {
        let snapshot = self.snapshot_with(symbol, as_of, config)?;
        let engine = RecommendationEngine::new(config.recommendation.clone())?;
        let result = engine.recommend(&snapshot);

        debug!(
            symbol = %symbol,
            timestamp = %result.timestamp,
            score = result.score,
            signal = %result.signal,
            skipped = result.skipped.len(),
            "Analysis complete"
        );

        Ok(result)
    }

    /// Readings the recommendation is computed from
    pub fn snapshot(
        &self,
        symbol: &str,
        as_of: Option<DateTime<Utc>>,
    ) -> Result<AnalysisSnapshot> {
        self.snapshot_with(symbol, as_of, &self.config)
    }

    pub fn snapshot_with(
        &self,
        symbol: &str,
        as_of: Option<DateTime<Utc>>,
        config: &AnalysisConfig,
    ) -> Result<AnalysisSnapshot> {
        config.validate()?;

        let series = self
            .store
            .snapshot(symbol)
            .ok_or_else(|| AnalysisError::UnknownSymbol(symbol.to_string()))?;
        let bars = match as_of {
            Some(t) => series.until(t),
            None => &series.bars[..],
        };
        let last = *bars.last().ok_or_else(|| AnalysisError::EmptySeries {
            symbol: symbol.to_string(),
            as_of,
        })?;

        let mut unavailable = BTreeMap::new();
        let technical = self.technical_readings(&series, bars.len(), last.timestamp, config, &mut unavailable);

        let volume_analyzer = VolumeAnalyzer::new(config.volume.clone());
        let volume = volume_analyzer.analyze(bars);
        if volume.average.is_none() {
            unavailable.insert(
                "volume_average".to_string(),
                format!(
                    "needs {} bars, have {}",
                    config.volume.average_window + 1,
                    bars.len()
                ),
            );
        }
        if volume.trend.is_none() {
            unavailable.insert(
                "volume_trend".to_string(),
                format!(
                    "needs {} bars, have {}",
                    config.volume.short_window * 2,
                    bars.len()
                ),
            );
        }

        let price_action = PriceActionAnalyzer::new(config.price_action.clone()).analyze(bars);
        if price_action.trend.is_none() {
            unavailable.insert(
                "trend".to_string(),
                format!(
                    "needs {} bars, have {}",
                    config.price_action.long_sma + 1,
                    bars.len()
                ),
            );
        }

        let risk_metrics = RiskMetrics::new(config.risk.clone())?;
        let benchmark = config
            .risk
            .benchmark
            .as_deref()
            .and_then(|b| self.store.snapshot(b))
            .map(|b| b.until(last.timestamp).to_vec());
        let risk = risk_metrics.snapshot(bars, benchmark.as_deref());
        for (metric, reason) in &risk.unavailable {
            unavailable.insert(metric.clone(), reason.clone());
        }

        Ok(AnalysisSnapshot {
            symbol: symbol.to_string(),
            timestamp: last.timestamp,
            revision: series.revision,
            bars: bars.len(),
            close: last.close,
            previous_close: bars.len().checked_sub(2).map(|i| bars[i].close),
            technical,
            volume,
            price_action,
            risk,
            unavailable,
        })
    }

    fn technical_readings(
        &self,
        series: &SeriesSnapshot,
        available: usize,
        until: DateTime<Utc>,
        config: &AnalysisConfig,
        unavailable: &mut BTreeMap<String, String>,
    ) -> TechnicalReadings {
        let indicators = &config.indicators;
        let close = series.until(until).last().map_or(0.0, |b| b.close);
        let mut readings = TechnicalReadings::default();

        let mut latest = |kind: IndicatorKind, name: String, n: usize| -> Vec<Point> {
            let points = self.cache.latest(series, &kind, until, n);
            if points.is_empty() {
                let reason = AnalysisError::InsufficientData {
                    indicator: kind.to_string(),
                    required: kind.warmup(),
                    available,
                };
                unavailable.insert(name, reason.to_string());
            }
            points
        };

        for &period in &indicators.sma_periods {
            let points = latest(IndicatorKind::Sma { period }, format!("sma_{}", period), 1);
            if let Some(v) = points.last().and_then(|(_, v)| v.single()) {
                readings.sma.insert(period, v);
            }
        }
        for &period in &indicators.ema_periods {
            let points = latest(IndicatorKind::Ema { period }, format!("ema_{}", period), 1);
            if let Some(v) = points.last().and_then(|(_, v)| v.single()) {
                readings.ema.insert(period, v);
            }
        }

        readings.rsi = single(latest(indicators.rsi(), "rsi".to_string(), 1));
        readings.roc = single(latest(indicators.roc(), "roc".to_string(), 1));
        readings.stochastic = single(latest(indicators.stochastic(), "stochastic".to_string(), 1));

        let macd = latest(indicators.macd(), "macd".to_string(), 2);
        readings.macd = match macd.as_slice() {
            [.., previous, (_, IndicatorValue::Macd { line, signal, histogram })] => {
                let previous_histogram = match previous.1 {
                    IndicatorValue::Macd { histogram, .. } => Some(histogram),
                    _ => None,
                };
                Some(MacdReading {
                    line: *line,
                    signal: *signal,
                    histogram: *histogram,
                    previous_histogram,
                })
            }
            [(_, IndicatorValue::Macd { line, signal, histogram })] => Some(MacdReading {
                line: *line,
                signal: *signal,
                histogram: *histogram,
                previous_histogram: None,
            }),
            _ => None,
        };

        let bands = latest(indicators.bollinger(), "bollinger".to_string(), 1);
        readings.bollinger = match bands.last() {
            Some((_, IndicatorValue::Bands { upper, middle, lower })) => {
                Some(BandsReading::new(*upper, *middle, *lower, close))
            }
            _ => None,
        };

        // Position against the longest configured SMA
        if let Some(&longest) = indicators.sma_periods.iter().max() {
            match readings.sma.get(&longest) {
                Some(&sma) if sma != 0.0 => {
                    readings.price_vs_sma = Some((close - sma) / sma * 100.0);
                }
                _ => {
                    let reason = unavailable
                        .get(&format!("sma_{}", longest))
                        .cloned()
                        .unwrap_or_else(|| format!("SMA({}) is zero", longest));
                    unavailable.insert("price_vs_sma".to_string(), reason);
                }
            }
        } else {
            unavailable.insert(
                "price_vs_sma".to_string(),
                "no SMA periods configured".to_string(),
            );
        }

        readings
    }

    /// Full indicator series for `symbol`, warm-up omitted
    ///
    /// Unknown symbols yield an empty series.
    pub fn indicator_series(
        &self,
        symbol: &str,
        kind: &IndicatorKind,
    ) -> Result<Vec<IndicatorResult>> {
        kind.validate()?;
        let Some(series) = self.store.snapshot(symbol) else {
            return Ok(Vec::new());
        };
        let Some(last) = series.last().copied() else {
            return Ok(Vec::new());
        };

        Ok(self
            .cache
            .points(&series, kind, last.timestamp)
            .into_iter()
            .map(|(timestamp, value)| IndicatorResult {
                symbol: symbol.to_string(),
                kind: *kind,
                timestamp,
                value,
            })
            .collect())
    }

    /// Indicator value aligned to the bar at `timestamp`
    pub fn indicator_at(
        &self,
        symbol: &str,
        kind: &IndicatorKind,
        timestamp: DateTime<Utc>,
    ) -> Result<IndicatorResult> {
        kind.validate()?;
        let series = self
            .store
            .snapshot(symbol)
            .ok_or_else(|| AnalysisError::UnknownSymbol(symbol.to_string()))?;

        let position = series
            .bars
            .binary_search_by(|b| b.timestamp.cmp(&timestamp))
            .map_err(|_| AnalysisError::BarNotFound {
                symbol: symbol.to_string(),
                timestamp,
            })?;

        let points = self.cache.latest(&series, kind, timestamp, 1);
        match points.last() {
            Some((ts, value)) if *ts == timestamp => Ok(IndicatorResult {
                symbol: symbol.to_string(),
                kind: *kind,
                timestamp,
                value: *value,
            }),
            _ => Err(AnalysisError::InsufficientData {
                indicator: kind.to_string(),
                required: kind.warmup(),
                available: position + 1,
            }),
        }
    }

    /// Alerts triggered at the analysis timestamp
    pub fn check_alerts(&self, symbol: &str, as_of: Option<DateTime<Utc>>) -> Result<Vec<Alert>> {
        let snapshot = self.snapshot(symbol, as_of)?;
        Ok(alerts::check_alerts(&snapshot, &self.config.alerts))
    }

    /// Analyze many symbols in parallel, one blocking task each
    ///
    /// Results are returned in input order.
    pub async fn analyze_all(
        self: &Arc<Self>,
        symbols: &[String],
        as_of: Option<DateTime<Utc>>,
    ) -> Vec<Result<RecommendationResult>> {
        info!(symbols = symbols.len(), "Starting batch analysis");

        let handles: Vec<_> = symbols
            .iter()
            .map(|symbol| {
                let engine = Arc::clone(self);
                let symbol = symbol.clone();
                tokio::task::spawn_blocking(move || engine.analyze(&symbol, as_of))
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            results.push(match handle.await {
                Ok(result) => result,
                Err(e) => Err(AnalysisError::TaskFailed(e.to_string())),
            });
        }

        let failed = results.iter().filter(|r| r.is_err()).count();
        info!(
            symbols = symbols.len(),
            failed,
            "Batch analysis complete"
        );

        results
    }
}

fn single(points: Vec<Point>) -> Option<f64> {
    points.last().and_then(|(_, v)| v.single())
}
