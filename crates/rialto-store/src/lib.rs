//! # Rialto Store
//!
//! CSV-file archive backend implementing [`SeriesStore`]. Layout under
//! the configured root directory:
//!
//! ```text
//! instruments.csv       instrument table, one row per code
//! shares.csv            share-event history
//! series/<code>.csv     daily price series, one file per code
//! markers.json          small named markers (sync bookkeeping)
//! ```
//!
//! Series files are append-only: the store only ever adds rows newer
//! than the existing tail, matching the synchronizer's delta semantics.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use rialto_core::{DEven, InsCode, Instrument, PriceRecord, SeriesStore, ShareEvent, StoreError};
use serde::de::DeserializeOwned;
use serde::Serialize;

const INSTRUMENTS_FILE: &str = "instruments.csv";
const SHARES_FILE: &str = "shares.csv";
const SERIES_DIR: &str = "series";
const MARKERS_FILE: &str = "markers.json";

/// File-backed archive rooted at a data directory.
#[derive(Debug, Clone)]
pub struct CsvStore {
    root: PathBuf,
}

impl CsvStore {
    /// Open (and create if needed) an archive under `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(root.join(SERIES_DIR))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn series_path(&self, code: InsCode) -> PathBuf {
        self.root.join(SERIES_DIR).join(format!("{code}.csv"))
    }

    fn load_rows<T: DeserializeOwned>(&self, path: &Path) -> Result<Vec<T>, StoreError> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        let mut reader = csv::Reader::from_reader(file);
        reader
            .deserialize()
            .map(|row| row.map_err(|e| csv_error(path, e)))
            .collect()
    }

    fn save_rows<T: Serialize>(&self, path: &Path, rows: &[T]) -> Result<(), StoreError> {
        let mut writer = csv::Writer::from_writer(File::create(path)?);
        for row in rows {
            writer.serialize(row).map_err(|e| csv_error(path, e))?;
        }
        writer.flush()?;
        Ok(())
    }

    fn load_markers(&self) -> Result<HashMap<String, String>, StoreError> {
        let path = self.root.join(MARKERS_FILE);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(err) => return Err(err.into()),
        };
        serde_json::from_str(&raw)
            .map_err(|e| StoreError::Corrupt(format!("{}: {e}", path.display())))
    }

    fn save_markers(&self, markers: &HashMap<String, String>) -> Result<(), StoreError> {
        let path = self.root.join(MARKERS_FILE);
        let raw = serde_json::to_string_pretty(markers)
            .map_err(|e| StoreError::Corrupt(format!("{}: {e}", path.display())))?;
        fs::write(path, raw)?;
        Ok(())
    }
}

fn csv_error(path: &Path, error: csv::Error) -> StoreError {
    if !error.is_io_error() {
        return StoreError::Corrupt(format!("{}: {error}", path.display()));
    }
    match error.into_kind() {
        csv::ErrorKind::Io(io) => StoreError::Io(io),
        other => StoreError::Corrupt(format!("{}: {other:?}", path.display())),
    }
}

impl SeriesStore for CsvStore {
    fn load_instruments(&self) -> Result<Vec<Instrument>, StoreError> {
        self.load_rows(&self.root.join(INSTRUMENTS_FILE))
    }

    fn save_instruments(&self, instruments: &[Instrument]) -> Result<(), StoreError> {
        self.save_rows(&self.root.join(INSTRUMENTS_FILE), instruments)
    }

    fn load_share_events(&self) -> Result<Vec<ShareEvent>, StoreError> {
        self.load_rows(&self.root.join(SHARES_FILE))
    }

    fn save_share_events(&self, events: &[ShareEvent]) -> Result<(), StoreError> {
        self.save_rows(&self.root.join(SHARES_FILE), events)
    }

    fn load_series(&self, code: InsCode) -> Result<Vec<PriceRecord>, StoreError> {
        self.load_rows(&self.series_path(code))
    }

    fn append_series(&self, code: InsCode, records: &[PriceRecord]) -> Result<(), StoreError> {
        if records.is_empty() {
            return Ok(());
        }
        let path = self.series_path(code);
        let fresh = !path.exists();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(fresh)
            .from_writer(file);
        for record in records {
            writer.serialize(record).map_err(|e| csv_error(&path, e))?;
        }
        writer.flush()?;
        tracing::debug!(code = %code, rows = records.len(), "appended series rows");
        Ok(())
    }

    fn last_deven(&self, code: InsCode) -> Result<Option<DEven>, StoreError> {
        Ok(self.load_series(code)?.last().map(|record| record.deven))
    }

    fn marker(&self, name: &str) -> Result<Option<String>, StoreError> {
        Ok(self.load_markers()?.get(name).cloned())
    }

    fn set_marker(&self, name: &str, value: &str) -> Result<(), StoreError> {
        let mut markers = self.load_markers()?;
        markers.insert(name.to_owned(), value.to_owned());
        self.save_markers(&markers)
    }
}
