//! In-memory raw price series cache.
//!
//! One entry per instrument code, append-only: concurrent chunk tasks
//! write through a single logically atomic insert-or-append operation and
//! never rewrite history. A code belongs to exactly one chunk per run, so
//! per-code mutation is single-writer by construction; the lock only
//! protects the shared code index.

use std::collections::HashMap;
use std::sync::Arc;

use crate::{DEven, InsCode, PriceRecord};

#[derive(Debug, Default, Clone)]
struct SeriesEntry {
    records: Vec<PriceRecord>,
    last_deven: DEven,
}

#[derive(Debug, Default)]
struct CacheInner {
    map: HashMap<InsCode, SeriesEntry>,
}

/// Shared, append-only cache of per-code daily series.
#[derive(Debug, Clone, Default)]
pub struct RawSeriesCache {
    inner: Arc<tokio::sync::RwLock<CacheInner>>,
}

impl RawSeriesCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace a code's entry wholesale. Used to load persisted history
    /// before a run; the records must already be in ascending date order.
    pub async fn seed(&self, code: InsCode, records: Vec<PriceRecord>) {
        let last_deven = records.last().map(|r| r.deven).unwrap_or(DEven::ZERO);
        let mut inner = self.inner.write().await;
        inner.map.insert(
            code,
            SeriesEntry {
                records,
                last_deven,
            },
        );
    }

    /// Atomic insert-or-append. Rows at or before the entry's last cached
    /// date are dropped, which keeps re-delivered deltas idempotent and the
    /// per-code series strictly ascending.
    pub async fn append(&self, code: InsCode, rows: Vec<PriceRecord>) {
        let mut inner = self.inner.write().await;
        let entry = inner.map.entry(code).or_default();
        for row in rows {
            if entry.last_deven == DEven::ZERO || row.deven > entry.last_deven {
                entry.last_deven = row.deven;
                entry.records.push(row);
            }
        }
    }

    /// Last cached trading date for a code; `None` when the code has never
    /// been seen.
    pub async fn last_deven(&self, code: InsCode) -> Option<DEven> {
        let inner = self.inner.read().await;
        inner.map.get(&code).map(|entry| entry.last_deven)
    }

    /// Snapshot of one code's series.
    pub async fn series(&self, code: InsCode) -> Vec<PriceRecord> {
        let inner = self.inner.read().await;
        inner
            .map
            .get(&code)
            .map(|entry| entry.records.clone())
            .unwrap_or_default()
    }

    /// Records strictly newer than `after` for one code. Used to pick out
    /// freshly synchronized rows for persistence.
    pub async fn records_after(&self, code: InsCode, after: DEven) -> Vec<PriceRecord> {
        let inner = self.inner.read().await;
        inner
            .map
            .get(&code)
            .map(|entry| {
                entry
                    .records
                    .iter()
                    .filter(|record| record.deven > after)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Series of several codes concatenated in the given (chain) order.
    pub async fn merged(&self, codes: &[InsCode]) -> Vec<PriceRecord> {
        let inner = self.inner.read().await;
        let mut merged = Vec::new();
        for code in codes {
            if let Some(entry) = inner.map.get(code) {
                merged.extend(entry.records.iter().cloned());
            }
        }
        merged
    }

    pub async fn len(&self) -> usize {
        let inner = self.inner.read().await;
        inner.map.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
