//! Integration tests for risk metrics
//!
//! These tests run the metrics against series held in an `ag-storage` store,
//! the way the analysis layer consumes them.

use ag_risk::{metrics, RiskConfig, RiskError, RiskMetrics, VolatilityRating};
use ag_storage::{Bar, TimeSeriesStore};
use approx::assert_relative_eq;
use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;

fn day(i: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap() + Duration::days(i)
}

fn bar(i: i64, close: f64) -> Bar {
    Bar::new(day(i), close, close * 1.01, close * 0.99, close, 10_000).unwrap()
}

fn load(store: &TimeSeriesStore, symbol: &str, closes: &[f64]) {
    for (i, &close) in closes.iter().enumerate() {
        store.append(symbol, bar(i as i64, close)).unwrap();
    }
}

fn wave(n: usize, base: f64, amplitude: f64) -> Vec<f64> {
    (0..n)
        .map(|i| base + amplitude * (i as f64 * 0.7).sin())
        .collect()
}

#[test]
fn test_snapshot_from_store() {
    let store = TimeSeriesStore::default();
    load(&store, "AAPL", &wave(80, 150.0, 4.0));
    load(&store, "SPY", &wave(80, 450.0, 6.0));

    let config = RiskConfig::from_yaml("benchmark: SPY\n").unwrap();
    let risk = RiskMetrics::new(config).unwrap();

    let asset = store.get_series("AAPL", None, None);
    let benchmark = store.get_series("SPY", None, None);
    let snapshot = risk.snapshot(&asset, Some(&benchmark));

    assert!(snapshot.unavailable.is_empty(), "{:?}", snapshot.unavailable);
    let beta = snapshot.beta.unwrap();
    assert_eq!(beta.observations, 60);
    assert!(beta.beta > 0.0);
    assert!(snapshot.max_drawdown.unwrap() < 0.0);
}

#[test]
fn test_beta_uses_only_common_timestamps() {
    let asset: Vec<Bar> = (0..40).map(|i| bar(i, 100.0 + (i % 4) as f64)).collect();
    // Benchmark trades every other day
    let benchmark: Vec<Bar> = (0..40)
        .filter(|i| i % 2 == 0)
        .map(|i| bar(i, 200.0 + (i % 8) as f64))
        .collect();

    let estimate = metrics::beta(&asset, &benchmark, 60).unwrap();
    assert_eq!(estimate.observations, 19);
    assert_eq!(metrics::align_closes(&asset, &benchmark).len(), 20);
}

#[test]
fn test_disjoint_series_fail_alignment() {
    let asset: Vec<Bar> = (0..10).map(|i| bar(i, 100.0 + i as f64)).collect();
    let benchmark: Vec<Bar> = (20..30).map(|i| bar(i, 100.0 + i as f64)).collect();

    assert_eq!(
        metrics::beta(&asset, &benchmark, 60).unwrap_err(),
        RiskError::Alignment { observations: 0 }
    );
}

#[test]
fn test_volatility_window_counts_returns() {
    let closes = wave(21, 100.0, 2.0);
    assert!(metrics::volatility(&closes, 20).is_ok());
    assert!(matches!(
        metrics::volatility(&closes[1..], 20),
        Err(RiskError::InsufficientData(_))
    ));
}

#[test]
fn test_calm_series_rates_low() {
    let closes: Vec<f64> = (0..30).map(|i| 100.0 + 0.01 * (i % 2) as f64).collect();
    let snapshot = RiskMetrics::default().snapshot(
        &closes
            .iter()
            .enumerate()
            .map(|(i, &c)| bar(i as i64, c))
            .collect::<Vec<_>>(),
        None,
    );
    assert_eq!(snapshot.rating, Some(VolatilityRating::VeryLow));
}

#[test]
fn test_annualized_matches_manual_scaling() {
    let closes = wave(40, 50.0, 1.5);
    let risk = RiskMetrics::default();
    let (vol, annualized) = risk.volatility(&closes).unwrap();
    assert_relative_eq!(annualized.unwrap(), vol * 252.0_f64.sqrt(), epsilon = 1e-12);
}

proptest! {
    #[test]
    fn prop_volatility_non_negative(closes in prop::collection::vec(1.0f64..1000.0, 21..60)) {
        let vol = metrics::volatility(&closes, 20).unwrap();
        prop_assert!(vol >= 0.0);
    }

    #[test]
    fn prop_volatility_scale_invariant(
        closes in prop::collection::vec(1.0f64..1000.0, 21..40),
        scale in 0.1f64..100.0,
    ) {
        let scaled: Vec<f64> = closes.iter().map(|c| c * scale).collect();
        let a = metrics::volatility(&closes, 20).unwrap();
        let b = metrics::volatility(&scaled, 20).unwrap();
        prop_assert!((a - b).abs() <= 1e-9 * a.max(1.0));
    }

    #[test]
    fn prop_drawdown_bounded(closes in prop::collection::vec(0.5f64..500.0, 1..100)) {
        let dd = metrics::max_drawdown(&closes).unwrap();
        prop_assert!(dd <= 0.0 && dd > -1.0);
    }
}
