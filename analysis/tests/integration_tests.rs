//! Integration tests for the analysis engine
//!
//! Indicator properties are checked against hand computations over series
//! held in an `ag-storage` store; recommendation tests run the full path
//! from stored bars to a scored result.

use ag_analysis::{
    AnalysisConfig, AnalysisEngine, AnalysisError, IndicatorEngine, IndicatorKind,
    IndicatorValue, Signal,
};
use ag_storage::{Bar, StorageError, TimeSeriesStore};
use approx::assert_relative_eq;
use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use std::sync::Arc;

fn day(i: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::days(i)
}

fn bar(i: i64, close: f64, volume: u64) -> Bar {
    Bar::new(day(i), close, close + 1.0, close - 1.0, close, volume).unwrap()
}

fn bars(closes: &[f64]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| bar(i as i64, c, 1_000_000))
        .collect()
}

fn store_with(symbol: &str, closes: &[f64]) -> Arc<TimeSeriesStore> {
    let store = Arc::new(TimeSeriesStore::default());
    store.append_batch(symbol, &bars(closes)).unwrap();
    store
}

fn rising(n: usize) -> Vec<f64> {
    (0..n).map(|i| 101.0 + i as f64).collect()
}

/// Closes compounding from 100 by each return in turn
fn compounded(returns: &[f64]) -> Vec<f64> {
    let mut closes = vec![100.0];
    for r in returns {
        let last = closes[closes.len() - 1];
        closes.push(last * (1.0 + r));
    }
    closes
}

fn market_returns(n: usize) -> Vec<f64> {
    (0..n).map(|i| 0.01 * (i as f64 * 0.7).sin()).collect()
}

fn benchmark_config(symbol: &str) -> AnalysisConfig {
    let mut config = AnalysisConfig::default();
    config.risk.benchmark = Some(symbol.to_string());
    config
}

fn singles(kind: &IndicatorKind, bars: &[Bar]) -> Vec<f64> {
    IndicatorEngine::compute(kind, bars)
        .into_iter()
        .filter_map(|(_, v)| v.single())
        .collect()
}

#[test]
fn test_ema_recursion() {
    let closes: Vec<f64> = (0..40).map(|i| 50.0 + (i as f64 * 0.4).cos() * 3.0).collect();
    let values = singles(&IndicatorKind::Ema { period: 5 }, &bars(&closes));

    assert_eq!(values.len(), 36);
    let seed: f64 = closes[..5].iter().sum::<f64>() / 5.0;
    assert_relative_eq!(values[0], seed, epsilon = 1e-9);

    let alpha = 2.0 / 6.0;
    for i in 1..values.len() {
        let expected = alpha * closes[i + 4] + (1.0 - alpha) * values[i - 1];
        assert_relative_eq!(values[i], expected, epsilon = 1e-9);
    }
}

#[test]
fn test_rsi_extremes() {
    let kind = IndicatorKind::Rsi {
        period: 14,
        smoothing: Default::default(),
    };

    let up = singles(&kind, &bars(&rising(30)));
    assert!(up.iter().all(|&v| v == 100.0));

    let falling: Vec<f64> = (0..30).map(|i| 200.0 - i as f64).collect();
    let down = singles(&kind, &bars(&falling));
    assert!(down.iter().all(|&v| v == 0.0));

    let flat = singles(&kind, &bars(&[100.0; 30]));
    assert_eq!(flat.len(), 16);
    assert!(flat.iter().all(|&v| v == 50.0));
}

#[test]
fn test_macd_and_bollinger_identities() {
    let closes: Vec<f64> = (0..80).map(|i| 100.0 + (i as f64 * 0.3).sin() * 5.0).collect();
    let series = bars(&closes);

    let macd = IndicatorEngine::compute(
        &IndicatorKind::Macd {
            fast: 12,
            slow: 26,
            signal: 9,
        },
        &series,
    );
    assert_eq!(macd.len(), 80 - 33);
    assert_eq!(macd[0].0, series[33].timestamp);
    for (_, value) in &macd {
        match value {
            IndicatorValue::Macd {
                line,
                signal,
                histogram,
            } => assert_relative_eq!(*histogram, line - signal, epsilon = 1e-9),
            other => panic!("unexpected value {:?}", other),
        }
    }

    let sma = singles(&IndicatorKind::Sma { period: 20 }, &series);
    let bands = IndicatorEngine::compute(&IndicatorKind::Bollinger { period: 20, k: 2.0 }, &series);
    assert_eq!(bands.len(), sma.len());
    for ((_, value), middle_sma) in bands.iter().zip(&sma) {
        match value {
            IndicatorValue::Bands {
                upper,
                middle,
                lower,
            } => {
                assert_relative_eq!(*middle, *middle_sma, epsilon = 1e-9);
                assert_relative_eq!(upper - middle, middle - lower, epsilon = 1e-9);
                assert!(lower <= middle && middle <= upper);
            }
            other => panic!("unexpected value {:?}", other),
        }
    }
}

#[test]
fn test_rising_scenario() {
    let store = store_with("UP", &rising(30));
    let engine = AnalysisEngine::with_defaults(store);

    let sma = engine
        .indicator_at("UP", &IndicatorKind::Sma { period: 5 }, day(29))
        .unwrap();
    assert_eq!(sma.value, IndicatorValue::Single(128.0));

    let result = engine.analyze("UP", None).unwrap();
    assert_eq!(result.close, 130.0);
    assert_eq!(result.readings["rsi"], 100.0);
    assert_eq!(result.readings["trend"], 1.0);
    assert_ne!(result.signal, Signal::Sell);
    assert!(result.explanation.starts_with("HOLD"));
}

#[test]
fn test_analyze_is_deterministic() {
    let closes: Vec<f64> = (0..120).map(|i| 80.0 + (i as f64 * 0.15).sin() * 10.0).collect();
    let store = store_with("WAVE", &closes);

    let first = AnalysisEngine::with_defaults(store.clone())
        .analyze("WAVE", None)
        .unwrap();
    let engine = AnalysisEngine::with_defaults(store);
    let second = engine.analyze("WAVE", None).unwrap();
    let third = engine.analyze("WAVE", None).unwrap();

    assert_eq!(first, second);
    assert_eq!(second, third);
    assert!(first.score >= -1.0 && first.score <= 1.0);
}

#[test]
fn test_as_of_matches_truncated_history() {
    let closes: Vec<f64> = (0..90).map(|i| 60.0 + (i as f64 * 0.2).cos() * 4.0).collect();

    let full = AnalysisEngine::with_defaults(store_with("X", &closes));
    // Warm the cache with the full series first
    full.analyze("X", None).unwrap();
    let historical = full.analyze("X", Some(day(59))).unwrap();

    let truncated = AnalysisEngine::with_defaults(store_with("X", &closes[..60]));
    let expected = truncated.analyze("X", None).unwrap();

    assert_eq!(historical, expected);
    assert_eq!(historical.timestamp, day(59));
}

#[test]
fn test_out_of_order_append_leaves_store_unchanged() {
    let store = store_with("UP", &rising(30));
    let engine = AnalysisEngine::with_defaults(store.clone());
    let before = engine.analyze("UP", None).unwrap();

    let err = store.append("UP", bar(10, 999.0, 5)).unwrap_err();
    assert!(matches!(err, StorageError::OutOfOrder { .. }));
    assert_eq!(store.len("UP"), 30);

    assert_eq!(engine.analyze("UP", None).unwrap(), before);
}

#[test]
fn test_short_history_reports_what_it_can() {
    let store = store_with("NEW", &[10.0, 11.0, 10.5]);
    let engine = AnalysisEngine::with_defaults(store);

    let snapshot = engine.snapshot("NEW", None).unwrap();
    assert_eq!(snapshot.bars, 3);
    assert_eq!(snapshot.volume.current, 1_000_000);
    assert_eq!(snapshot.price_action.high, Some(12.0));
    assert_eq!(snapshot.price_action.low, Some(9.0));
    assert!(snapshot.technical.rsi.is_none());
    assert!(snapshot.unavailable["rsi"].contains("RSI(14)"));

    let result = engine.analyze("NEW", None).unwrap();
    assert!(result.skipped.contains_key("rsi"));
    assert!(result.skipped.contains_key("macd"));
    assert_eq!(result.signal, Signal::Hold);
    assert_eq!(result.score, 0.0);
}

#[test]
fn test_per_call_config() {
    let store = store_with("UP", &rising(30));
    let engine = AnalysisEngine::with_defaults(store);

    let mut config = AnalysisConfig::default();
    config.indicators.rsi_period = 5;
    config.indicators.sma_periods = vec![3];
    let snapshot = engine.snapshot_with("UP", None, &config).unwrap();

    assert_eq!(snapshot.technical.sma.get(&3), Some(&129.0));
    assert!(snapshot.technical.sma.get(&20).is_none());
    assert_eq!(snapshot.technical.rsi, Some(100.0));
}

#[tokio::test]
async fn test_analyze_all_keeps_input_order() {
    let store = Arc::new(TimeSeriesStore::default());
    store.append_batch("UP", &bars(&rising(40))).unwrap();
    let falling: Vec<f64> = (0..40).map(|i| 300.0 - i as f64).collect();
    store.append_batch("DOWN", &bars(&falling)).unwrap();

    let engine = Arc::new(AnalysisEngine::with_defaults(store));
    let symbols = vec!["UP".to_string(), "NOPE".to_string(), "DOWN".to_string()];
    let results = engine.analyze_all(&symbols, None).await;

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].as_ref().unwrap().symbol, "UP");
    assert!(matches!(results[1], Err(AnalysisError::UnknownSymbol(_))));
    assert_eq!(results[2].as_ref().unwrap().symbol, "DOWN");
    assert_eq!(results[2].as_ref().unwrap().readings["trend"], -1.0);
}

#[test]
fn test_alerts_from_config() {
    let yaml = r#"
alerts:
  - type: PriceAbove
    target: 125.0
  - type: PriceBelow
    target: 50.0
"#;
    let config = AnalysisConfig::from_yaml(yaml).unwrap();
    let engine = AnalysisEngine::new(store_with("UP", &rising(30)), config).unwrap();

    let alerts = engine.check_alerts("UP", None).unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].value, 130.0);
    assert!(engine.check_alerts("UP", Some(day(10))).unwrap().is_empty());
}

#[test]
fn test_beta_against_stored_benchmark() {
    let market = market_returns(39);
    let levered: Vec<f64> = market[..29].iter().map(|r| 2.0 * r).collect();

    let store = store_with("LEV", &compounded(&levered));
    store.append_batch("MKT", &bars(&compounded(&market))).unwrap();
    let engine = AnalysisEngine::new(store, benchmark_config("MKT")).unwrap();

    let snapshot = engine.snapshot("LEV", None).unwrap();
    let beta = snapshot.risk.beta.unwrap();
    assert_relative_eq!(beta.beta, 2.0, epsilon = 1e-9);
    assert_eq!(beta.observations, 29);
    assert!(!snapshot.unavailable.contains_key("beta"));
}

#[test]
fn test_as_of_cuts_benchmark() {
    let market = market_returns(39);
    let levered: Vec<f64> = market[..29].iter().map(|r| 2.0 * r).collect();

    let store = store_with("LEV", &compounded(&levered));
    store.append_batch("MKT", &bars(&compounded(&market))).unwrap();
    let engine = AnalysisEngine::new(store, benchmark_config("MKT")).unwrap();

    let historical = engine.snapshot("LEV", Some(day(19))).unwrap();
    assert_eq!(historical.risk.beta.unwrap().observations, 19);

    // Same answer as a store that never held the later bars of either series
    let truncated = store_with("LEV", &compounded(&levered)[..20]);
    truncated
        .append_batch("MKT", &bars(&compounded(&market)[..20]))
        .unwrap();
    let expected = AnalysisEngine::new(truncated, benchmark_config("MKT"))
        .unwrap()
        .snapshot("LEV", None)
        .unwrap();
    assert_eq!(historical.risk, expected.risk);
}

#[test]
fn test_benchmark_after_as_of_has_no_overlap() {
    let store = store_with("UP", &rising(30));
    let late: Vec<Bar> = (50..60).map(|i| bar(i, 400.0 + i as f64, 10)).collect();
    store.append_batch("LATE", &late).unwrap();
    let engine = AnalysisEngine::new(store, benchmark_config("LATE")).unwrap();

    let snapshot = engine.snapshot("UP", None).unwrap();
    assert!(snapshot.risk.beta.is_none());
    assert!(snapshot.unavailable["beta"].contains("0 overlapping"));
}

#[test]
fn test_missing_benchmark_reason() {
    let store = store_with("UP", &rising(30));
    let engine = AnalysisEngine::new(store.clone(), benchmark_config("SPY")).unwrap();

    let snapshot = engine.snapshot("UP", None).unwrap();
    assert!(snapshot.risk.beta.is_none());
    assert_eq!(snapshot.unavailable["beta"], "no bars for benchmark SPY");
    assert_eq!(snapshot.risk.unavailable["beta"], "no bars for benchmark SPY");

    let unconfigured = AnalysisEngine::with_defaults(store);
    let snapshot = unconfigured.snapshot("UP", None).unwrap();
    assert_eq!(snapshot.unavailable["beta"], "no benchmark configured");
}

#[test]
fn test_price_vs_long_sma() {
    let store = store_with("UP", &rising(30));
    let engine = AnalysisEngine::with_defaults(store);

    // Default periods are [20, 50]; 30 bars cannot warm SMA(50)
    let snapshot = engine.snapshot("UP", None).unwrap();
    assert!(snapshot.technical.price_vs_sma.is_none());
    assert!(snapshot.unavailable["price_vs_sma"].contains("SMA(50)"));
    let result = engine.analyze("UP", None).unwrap();
    assert!(result.skipped["price_vs_sma"].contains("SMA(50)"));

    let mut config = AnalysisConfig::default();
    config.indicators.sma_periods = vec![3, 10];
    let snapshot = engine.snapshot_with("UP", None, &config).unwrap();
    // SMA(10) of 121..=130 is 125.5
    assert_relative_eq!(
        snapshot.technical.price_vs_sma.unwrap(),
        (130.0 - 125.5) / 125.5 * 100.0,
        epsilon = 1e-9
    );
    assert!(!snapshot.unavailable.contains_key("price_vs_sma"));
}

#[test]
fn test_bounded_cache_gives_same_answers() {
    let closes: Vec<f64> = (0..60).map(|i| 50.0 + (i as f64 * 0.25).sin() * 3.0).collect();
    let mut config = AnalysisConfig::default();
    config.cache.max_entries = 3;

    let bounded = AnalysisEngine::new(store_with("W", &closes), config).unwrap();
    let first = bounded.analyze("W", None).unwrap();
    let second = bounded.analyze("W", None).unwrap();

    let stats = bounded.cache().stats();
    assert!(stats.entries <= 3);
    assert!(stats.evictions > 0);
    assert_eq!(first, second);
    assert_eq!(
        first,
        AnalysisEngine::with_defaults(store_with("W", &closes))
            .analyze("W", None)
            .unwrap()
    );
}

proptest! {
    #[test]
    fn prop_sma_is_window_mean(
        closes in prop::collection::vec(1.0f64..1000.0, 10..80),
        period in 1usize..10,
    ) {
        let values = singles(&IndicatorKind::Sma { period }, &bars(&closes));
        prop_assert_eq!(values.len(), closes.len() - period + 1);

        for (i, value) in values.iter().enumerate() {
            let mean = closes[i..i + period].iter().sum::<f64>() / period as f64;
            prop_assert!((value - mean).abs() < 1e-6);
        }
    }

    #[test]
    fn prop_rsi_in_range(closes in prop::collection::vec(1.0f64..500.0, 16..100)) {
        let kind = IndicatorKind::Rsi { period: 14, smoothing: Default::default() };
        for value in singles(&kind, &bars(&closes)) {
            prop_assert!((0.0..=100.0).contains(&value));
        }
    }

    #[test]
    fn prop_score_bounded(closes in prop::collection::vec(5.0f64..500.0, 1..80)) {
        let engine = AnalysisEngine::with_defaults(store_with("P", &closes));
        let result = engine.analyze("P", None).unwrap();
        prop_assert!(result.score >= -1.0 && result.score <= 1.0);
    }
}
