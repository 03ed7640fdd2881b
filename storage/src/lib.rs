//! In-memory OHLCV time-series storage for ag-botkit
//!
//! This crate owns the per-symbol bar history every analysis component reads
//! from. It enforces strict timestamp ordering on ingestion and hands out
//! immutable snapshots to readers.
//!
//! # Features
//!
//! - Append-only per-symbol series with strict timestamp ordering
//! - Half-open range queries; unknown symbols read as empty
//! - Explicit corrections (`replace`) and truncation, tracked by a revision counter
//! - Optional retention cap on bars per symbol
//! - Single writer per symbol, concurrent readers
//!
//! # Example
//!
//! ```
//! use ag_storage::{Bar, TimeSeriesStore};
//! use chrono::{TimeZone, Utc};
//!
//! let store = TimeSeriesStore::default();
//! let ts = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
//! let bar = Bar::new(ts, 100.0, 101.5, 99.0, 101.0, 1_200_000).unwrap();
//!
//! store.append("AAPL", bar).unwrap();
//! assert!(store.append("AAPL", bar).is_err()); // duplicates are rejected
//! assert_eq!(store.get_series("AAPL", None, None).len(), 1);
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod types;

// Include retention module from parent directory
#[path = "../retention/mod.rs"]
pub mod retention_impl;
pub mod retention {
    pub use super::retention_impl::*;
}

// Re-export main types
pub use config::{RetentionConfig, StoreConfig};
pub use engine::TimeSeriesStore;
pub use error::{Result, StorageError};
pub use retention::{RetentionPolicy, RetentionReport, StorageStats};
pub use types::{Bar, BarRecord, SeriesSnapshot};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
