//! Print a risk snapshot for a synthetic asset against a synthetic benchmark
//!
//! Run with: cargo run -p ag-risk --example risk_report

use ag_risk::{RiskConfig, RiskMetrics};
use ag_storage::{Bar, TimeSeriesStore};
use chrono::{Duration, TimeZone, Utc};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let store = TimeSeriesStore::default();
    let start = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0)
        .single()
        .ok_or("invalid start date")?;

    for i in 0..120 {
        let ts = start + Duration::days(i);
        let market = 450.0 + 8.0 * (i as f64 * 0.3).sin();
        let asset = 180.0 + 5.0 * (i as f64 * 0.3).sin() - 0.05 * i as f64;

        store.append("SPY", Bar::new(ts, market, market + 2.0, market - 2.0, market, 80_000_000)?)?;
        store.append("AAPL", Bar::new(ts, asset, asset + 1.5, asset - 1.5, asset, 50_000_000)?)?;
    }

    let config = RiskConfig::from_yaml(
        r#"
volatility_window: 20
beta_window: 60
benchmark: SPY
"#,
    )?;
    let risk = RiskMetrics::new(config)?;

    let asset = store.get_series("AAPL", None, None);
    let benchmark = store.get_series("SPY", None, None);
    let snapshot = risk.snapshot(&asset, Some(&benchmark));

    println!("=== AAPL risk vs SPY ===");
    if let (Some(vol), Some(annual)) = (snapshot.volatility, snapshot.annualized_volatility) {
        println!("Volatility:  {:.4} daily, {:.2}% annualized", vol, annual * 100.0);
    }
    if let Some(rating) = snapshot.rating {
        println!("Rating:      {}", rating);
    }
    if let Some(beta) = snapshot.beta {
        println!("Beta:        {:.3} ({} observations)", beta.beta, beta.observations);
    }
    if let Some(atr) = snapshot.atr {
        println!("ATR(14):     {:.2}", atr);
    }
    if let Some(dd) = snapshot.max_drawdown {
        println!("Max drawdown {:.2}%", dd * 100.0);
    }
    for (metric, reason) in &snapshot.unavailable {
        println!("Unavailable: {} ({})", metric, reason);
    }

    Ok(())
}
