//! Incremental indicator cache
//!
//! Entries are keyed by (symbol, indicator label) and remember the series
//! revision and how many bars they consumed. A snapshot with the same
//! revision and more bars only feeds the new bars; any other revision
//! rebuilds the entry from scratch.
//!
//! The cache holds at most `max_entries` entries. Inserting past the cap
//! evicts the least recently used entry; `invalidate` and `clear` drop
//! entries explicitly.

use crate::types::{Indicator, IndicatorKind, IndicatorValue};
use ag_storage::SeriesSnapshot;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Indicator point aligned to a bar timestamp
pub type Point = (DateTime<Utc>, IndicatorValue);

/// Default entry cap
pub const DEFAULT_MAX_ENTRIES: usize = 1024;

struct CacheEntry {
    revision: u64,
    consumed: usize,
    state: Box<dyn Indicator>,
    points: Vec<Point>,
}

impl CacheEntry {
    fn new(kind: &IndicatorKind, revision: u64) -> Self {
        Self {
            revision,
            consumed: 0,
            state: kind.build(),
            points: Vec::new(),
        }
    }
}

struct Slot {
    last_used: AtomicU64,
    entry: Mutex<CacheEntry>,
}

/// Cache counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    /// Entries built or rebuilt from the first bar
    pub rebuilds: u64,
    /// Updates that only fed newly appended bars
    pub incremental_updates: u64,
    /// Entries dropped to stay under the cap
    pub evictions: u64,
}

/// Streaming indicator state per (symbol, indicator)
pub struct IndicatorCache {
    entries: DashMap<(String, String), Arc<Slot>>,
    max_entries: usize,
    clock: AtomicU64,
    rebuilds: AtomicU64,
    incremental_updates: AtomicU64,
    evictions: AtomicU64,
}

impl Default for IndicatorCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_MAX_ENTRIES)
    }
}

impl IndicatorCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache holding at most `max_entries` entries (at least one)
    pub fn with_capacity(max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            max_entries: max_entries.max(1),
            clock: AtomicU64::new(0),
            rebuilds: AtomicU64::new(0),
            incremental_updates: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.max_entries
    }

    /// Points with timestamp <= `until`, bringing the entry up to date first
    pub fn points(
        &self,
        snapshot: &SeriesSnapshot,
        kind: &IndicatorKind,
        until: DateTime<Utc>,
    ) -> Vec<Point> {
        self.with_points(snapshot, kind, until, |points| points.to_vec())
    }

    /// The last `n` points with timestamp <= `until`
    pub fn latest(
        &self,
        snapshot: &SeriesSnapshot,
        kind: &IndicatorKind,
        until: DateTime<Utc>,
        n: usize,
    ) -> Vec<Point> {
        self.with_points(snapshot, kind, until, |points| {
            points[points.len().saturating_sub(n)..].to_vec()
        })
    }

    fn with_points<T>(
        &self,
        snapshot: &SeriesSnapshot,
        kind: &IndicatorKind,
        until: DateTime<Utc>,
        f: impl FnOnce(&[Point]) -> T,
    ) -> T {
        let key = (snapshot.symbol.clone(), kind.to_string());
        let existing = self.entries.get(&key).map(|slot| Arc::clone(slot.value()));
        let slot = match existing {
            Some(slot) => slot,
            None => {
                self.make_room();
                self.entries
                    .entry(key)
                    .or_insert_with(|| {
                        Arc::new(Slot {
                            last_used: AtomicU64::new(0),
                            entry: Mutex::new(CacheEntry::new(kind, snapshot.revision)),
                        })
                    })
                    .clone()
            }
        };
        slot.last_used
            .store(self.clock.fetch_add(1, Ordering::Relaxed), Ordering::Relaxed);

        let mut entry = slot.entry.lock();
        self.refresh(&mut entry, snapshot, kind);

        // Indicators are causal: a prefix of the points is the answer for
        // any earlier cut-off.
        let end = entry.points.partition_point(|(ts, _)| *ts <= until);
        f(&entry.points[..end])
    }

    fn refresh(&self, entry: &mut CacheEntry, snapshot: &SeriesSnapshot, kind: &IndicatorKind) {
        if entry.revision != snapshot.revision {
            debug!(
                symbol = %snapshot.symbol,
                indicator = %kind,
                old_revision = entry.revision,
                new_revision = snapshot.revision,
                "Series revised, rebuilding indicator"
            );
            *entry = CacheEntry::new(kind, snapshot.revision);
        }

        // An older snapshot of the same revision is a prefix of what we hold
        if snapshot.len() <= entry.consumed {
            return;
        }

        if entry.consumed == 0 {
            self.rebuilds.fetch_add(1, Ordering::Relaxed);
        } else {
            self.incremental_updates.fetch_add(1, Ordering::Relaxed);
        }

        for bar in &snapshot.bars[entry.consumed..] {
            if let Some(value) = entry.state.update(bar) {
                entry.points.push((bar.timestamp, value));
            }
        }
        entry.consumed = snapshot.len();
    }

    /// Evict least recently used entries until one more fits
    ///
    /// Concurrent inserts may briefly overshoot the cap by one per thread.
    fn make_room(&self) {
        while self.entries.len() >= self.max_entries {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|slot| slot.value().last_used.load(Ordering::Relaxed))
                .map(|slot| slot.key().clone());
            let Some(key) = oldest else {
                break;
            };
            if self.entries.remove(&key).is_some() {
                self.evictions.fetch_add(1, Ordering::Relaxed);
                debug!(symbol = %key.0, indicator = %key.1, "Evicted indicator cache entry");
            }
        }
    }

    /// Drop every entry for `symbol`
    pub fn invalidate(&self, symbol: &str) {
        self.entries.retain(|(s, _), _| s != symbol);
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            rebuilds: self.rebuilds.load(Ordering::Relaxed),
            incremental_updates: self.incremental_updates.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}
