use ag_storage::{Bar, StorageError, StoreConfig, TimeSeriesStore};
use chrono::{Duration, TimeZone, Utc};
use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    println!("=== Bar Ingestion Example ===\n");

    // Keep at most one trading year per symbol
    let config = StoreConfig::from_yaml("retention:\n  max_bars_per_symbol: 252\n")?;
    let store = TimeSeriesStore::new(config)?;

    // Example 1: Append daily bars
    println!("1. Appending 300 daily bars for AAPL...");
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    for i in 0..300 {
        let close = 180.0 + (i as f64 * 0.1).sin() * 5.0;
        let bar = Bar::new(
            start + Duration::days(i),
            close - 0.5,
            close + 1.0,
            close - 1.0,
            close,
            50_000_000 + (i as u64 * 1_000),
        )?;
        store.append("AAPL", bar)?;
    }
    println!("   ✓ Stored {} bars (retention cap applied)\n", store.len("AAPL"));

    // Example 2: Duplicates are rejected and the store is unchanged
    println!("2. Re-appending the last bar...");
    if let Some(last) = store.last_bar("AAPL") {
        match store.append("AAPL", last) {
            Err(StorageError::OutOfOrder { timestamp, .. }) => {
                println!("   ✓ Rejected duplicate at {}\n", timestamp)
            }
            other => println!("   ✗ Unexpected result: {:?}\n", other),
        }
    }

    // Example 3: Range query
    println!("3. Querying one week...");
    let from = start + Duration::days(200);
    let week = store.get_series("AAPL", Some(from), Some(from + Duration::days(7)));
    for bar in &week {
        println!("   {} close={:.2} volume={}", bar.timestamp.date_naive(), bar.close, bar.volume);
    }

    println!("\nStats: {:?}", store.stats());
    Ok(())
}
