//! Abstract archive interface.
//!
//! The core reads and writes persisted state through [`SeriesStore`];
//! the CSV-file implementation lives in its own crate, and
//! [`MemoryStore`] backs tests and ephemeral runs.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::{DEven, InsCode, Instrument, PriceRecord, ShareEvent, StoreError};

/// Marker key for the feed's last-possible-trading-date value.
pub const MARKER_LAST_POSSIBLE_DEVEN: &str = "last_possible_deven";
/// Marker key for the highest share-event id already archived.
pub const MARKER_LAST_SHARE_ID: &str = "last_share_id";
/// Marker key for the date of the last instrument-table refresh.
pub const MARKER_INSTRUMENTS_DEVEN: &str = "instruments_deven";

/// Persistence contract for the archive: instrument table, share-event
/// history, per-code price series, and small named markers.
///
/// Series appends must preserve ascending date order per code; callers
/// only hand over rows newer than the stored tail.
pub trait SeriesStore: Send + Sync {
    fn load_instruments(&self) -> Result<Vec<Instrument>, StoreError>;
    fn save_instruments(&self, instruments: &[Instrument]) -> Result<(), StoreError>;

    fn load_share_events(&self) -> Result<Vec<ShareEvent>, StoreError>;
    fn save_share_events(&self, events: &[ShareEvent]) -> Result<(), StoreError>;

    fn load_series(&self, code: InsCode) -> Result<Vec<PriceRecord>, StoreError>;
    fn append_series(&self, code: InsCode, records: &[PriceRecord]) -> Result<(), StoreError>;

    /// Date of the newest archived record for a code, `None` when the code
    /// has no series yet.
    fn last_deven(&self, code: InsCode) -> Result<Option<DEven>, StoreError> {
        Ok(self.load_series(code)?.last().map(|record| record.deven))
    }

    fn marker(&self, name: &str) -> Result<Option<String>, StoreError>;
    fn set_marker(&self, name: &str, value: &str) -> Result<(), StoreError>;
}

#[derive(Debug, Default)]
struct MemoryInner {
    instruments: Vec<Instrument>,
    share_events: Vec<ShareEvent>,
    series: HashMap<InsCode, Vec<PriceRecord>>,
    markers: HashMap<String, String>,
}

/// Volatile archive for tests and one-shot runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SeriesStore for MemoryStore {
    fn load_instruments(&self) -> Result<Vec<Instrument>, StoreError> {
        Ok(self.lock().instruments.clone())
    }

    fn save_instruments(&self, instruments: &[Instrument]) -> Result<(), StoreError> {
        self.lock().instruments = instruments.to_vec();
        Ok(())
    }

    fn load_share_events(&self) -> Result<Vec<ShareEvent>, StoreError> {
        Ok(self.lock().share_events.clone())
    }

    fn save_share_events(&self, events: &[ShareEvent]) -> Result<(), StoreError> {
        self.lock().share_events = events.to_vec();
        Ok(())
    }

    fn load_series(&self, code: InsCode) -> Result<Vec<PriceRecord>, StoreError> {
        Ok(self.lock().series.get(&code).cloned().unwrap_or_default())
    }

    fn append_series(&self, code: InsCode, records: &[PriceRecord]) -> Result<(), StoreError> {
        self.lock()
            .series
            .entry(code)
            .or_default()
            .extend_from_slice(records);
        Ok(())
    }

    fn marker(&self, name: &str) -> Result<Option<String>, StoreError> {
        Ok(self.lock().markers.get(name).cloned())
    }

    fn set_marker(&self, name: &str, value: &str) -> Result<(), StoreError> {
        self.lock().markers.insert(name.to_owned(), value.to_owned());
        Ok(())
    }
}
