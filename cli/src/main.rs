use ag_analysis::{AnalysisConfig, AnalysisEngine};
use ag_storage::{Bar, BarRecord, TimeSeriesStore};
use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[clap(name = "ag-analyze", about = "Technical analysis and recommendations for stored bars")]
struct Args {
    /// JSON array of {symbol, timestamp, open, high, low, close, volume}
    #[clap(short, long)]
    bars: PathBuf,

    /// Analysis configuration (YAML, or JSON by extension)
    #[clap(short, long)]
    config: Option<PathBuf>,

    /// Symbol to analyze; repeat for several (default: every loaded symbol)
    #[clap(short, long = "symbol")]
    symbols: Vec<String>,

    /// Only use bars at or before this RFC 3339 timestamp
    #[clap(long)]
    as_of: Option<DateTime<Utc>>,

    /// Pretty-print JSON output
    #[clap(long)]
    pretty: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout stays machine-readable
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            AnalysisConfig::from_file(path)
                .with_context(|| format!("failed to load config {}", path.display()))?
        }
        None => AnalysisConfig::default(),
    };

    let store = Arc::new(TimeSeriesStore::default());
    let loaded = load_bars(&store, &args.bars)?;
    info!(bars = loaded, symbols = store.symbols().len(), "Loaded bars");

    let symbols = if args.symbols.is_empty() {
        store.symbols()
    } else {
        args.symbols.clone()
    };

    let engine = Arc::new(AnalysisEngine::new(store, config)?);
    let results = engine.analyze_all(&symbols, args.as_of).await;

    let mut failures = 0;
    for (symbol, result) in symbols.iter().zip(results) {
        match result {
            Ok(result) => {
                let json = if args.pretty {
                    serde_json::to_string_pretty(&result)?
                } else {
                    serde_json::to_string(&result)?
                };
                println!("{}", json);
                report_alerts(&engine, symbol, args.as_of);
            }
            Err(e) => {
                error!(symbol = %symbol, "Analysis failed: {}", e);
                failures += 1;
            }
        }
    }

    if failures > 0 {
        bail!("{} of {} symbols failed", failures, symbols.len());
    }
    Ok(())
}

/// Log triggered alerts for `symbol`
///
/// A failed check is logged and skipped so the remaining symbols still
/// report. Returns the number of alerts, or None when the check failed.
fn report_alerts(
    engine: &AnalysisEngine,
    symbol: &str,
    as_of: Option<DateTime<Utc>>,
) -> Option<usize> {
    match engine.check_alerts(symbol, as_of) {
        Ok(alerts) => {
            for alert in &alerts {
                warn!(symbol = %alert.symbol, value = alert.value, "ALERT {}", alert.message);
            }
            Some(alerts.len())
        }
        Err(e) => {
            error!(symbol = %symbol, "Alert check failed: {}", e);
            None
        }
    }
}

/// Read bar records and append them per symbol in timestamp order
fn load_bars(store: &TimeSeriesStore, path: &Path) -> Result<usize> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read bars {}", path.display()))?;
    let records: Vec<BarRecord> = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse bars {}", path.display()))?;

    let mut by_symbol: BTreeMap<String, Vec<Bar>> = BTreeMap::new();
    for record in records {
        by_symbol.entry(record.symbol).or_default().push(record.bar);
    }

    let mut total = 0;
    for (symbol, mut bars) in by_symbol {
        bars.sort_by_key(|b| b.timestamp);
        total += store
            .append_batch(&symbol, &bars)
            .with_context(|| format!("failed to load bars for {}", symbol))?;
    }
    Ok(total)
}
