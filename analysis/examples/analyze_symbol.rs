//! Analyze a synthetic symbol and print the recommendation
//!
//! Run with: cargo run -p ag-analysis --example analyze_symbol

use ag_analysis::{AnalysisConfig, AnalysisEngine};
use ag_storage::{Bar, TimeSeriesStore};
use chrono::{Duration, TimeZone, Utc};
use std::sync::Arc;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    ag_analysis::init_tracing();

    let store = Arc::new(TimeSeriesStore::default());
    let start = Utc
        .with_ymd_and_hms(2024, 1, 2, 0, 0, 0)
        .single()
        .ok_or("invalid start date")?;

    for i in 0..120 {
        let ts = start + Duration::days(i);
        let close = 150.0 + 12.0 * (i as f64 * 0.08).sin() + 0.1 * i as f64;
        let volume = if i == 119 { 90_000_000 } else { 40_000_000 };
        store.append("AAPL", Bar::new(ts, close - 0.5, close + 1.0, close - 1.5, close, volume)?)?;

        let market = 450.0 + 6.0 * (i as f64 * 0.08).sin();
        store.append("SPY", Bar::new(ts, market, market + 2.0, market - 2.0, market, 80_000_000)?)?;
    }

    let config = AnalysisConfig::from_yaml(
        r#"
risk:
  benchmark: SPY
alerts:
  - type: VolumeSpike
    multiple: 2.0
"#,
    )?;
    let engine = AnalysisEngine::new(store, config)?;

    let snapshot = engine.snapshot("AAPL", None)?;
    println!("=== AAPL @ {} ===", snapshot.timestamp.date_naive());
    println!("Close:       {:.2}", snapshot.close);
    if let Some(rsi) = snapshot.technical.rsi {
        println!("RSI(14):     {:.1}", rsi);
    }
    if let Some(macd) = snapshot.technical.macd {
        println!("MACD:        {:.3} / {:.3} (hist {:+.3})", macd.line, macd.signal, macd.histogram);
    }
    if let Some(support) = snapshot.price_action.nearest_support {
        println!("Support:     {:.2} ({} touches)", support.price, support.strength);
    }
    if let Some(resistance) = snapshot.price_action.nearest_resistance {
        println!("Resistance:  {:.2} ({} touches)", resistance.price, resistance.strength);
    }
    if let Some(beta) = snapshot.risk.beta {
        println!("Beta:        {:.3}", beta.beta);
    }

    let result = engine.analyze("AAPL", None)?;
    println!("\n{}", result.summary());
    for (factor, contribution) in &result.contributions {
        println!("  {:<12} {:+.3}", factor, contribution);
    }
    for (factor, reason) in &result.skipped {
        println!("  {:<12} skipped: {}", factor, reason);
    }

    for alert in engine.check_alerts("AAPL", None)? {
        println!("ALERT {}", alert.message);
    }

    Ok(())
}
