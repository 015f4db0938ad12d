//! High-level archive facade.
//!
//! Wires the feed adapter, staleness oracle, synchronizer, adjustment
//! engine and series store into the two flows callers actually use:
//! refreshing the instrument tables and producing adjusted history for a
//! set of display symbols.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::adjust::{adjust, AdjustedRecord};
use crate::cache::RawSeriesCache;
use crate::feed::{InstrumentSharesReply, SyncEntry, TsetmcFeed};
use crate::reconcile::{build_chains, SymbolChain};
use crate::settings::Settings;
use crate::staleness::{marker_is_stale, should_update, LastPossibleOracle};
use crate::store::{
    SeriesStore, MARKER_INSTRUMENTS_DEVEN, MARKER_LAST_POSSIBLE_DEVEN, MARKER_LAST_SHARE_ID,
};
use crate::sync::{SyncOutcome, Synchronizer};
use crate::{DEven, InsCode, Instrument, ShareEvent, StoreError, SyncError};

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Sync(#[from] SyncError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("instrument refresh failed: {0}")]
    Feed(#[from] crate::FeedError),
}

/// Outcome of an instrument-table refresh.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstrumentsRefresh {
    pub instruments: usize,
    pub share_events: usize,
    /// Feed tables were busy server-side; the archive is untouched.
    pub busy: bool,
    /// Tables were already fresh, no feed call issued.
    pub skipped: bool,
}

/// Per-symbol slice of a history request.
#[derive(Debug, Clone, PartialEq)]
pub enum SymbolReport {
    Series {
        symbol: String,
        codes: Vec<InsCode>,
        records: Vec<AdjustedRecord>,
    },
    UnknownSymbol {
        symbol: String,
    },
}

/// Overall result of a history or price-update request.
#[derive(Debug, Clone, Default)]
pub struct HistoryReport {
    pub outcome: SyncOutcome,
    pub symbols: Vec<SymbolReport>,
    pub warnings: Vec<String>,
}

/// Facade over the whole archive.
pub struct HistoryService {
    feed: Arc<TsetmcFeed>,
    store: Arc<dyn SeriesStore>,
    cache: RawSeriesCache,
    settings: Settings,
}

impl HistoryService {
    pub fn new(feed: Arc<TsetmcFeed>, store: Arc<dyn SeriesStore>, settings: Settings) -> Self {
        Self {
            feed,
            store,
            cache: RawSeriesCache::new(),
            settings,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Staleness-gated refresh of the instrument table and share-event
    /// history. A busy feed leaves the archive untouched.
    pub async fn refresh_instruments(&self) -> Result<InstrumentsRefresh, ServiceError> {
        let now = time::OffsetDateTime::now_local()
            .unwrap_or_else(|_| time::OffsetDateTime::now_utc());
        self.refresh_instruments_at(now).await
    }

    /// [`Self::refresh_instruments`] with an injected clock.
    pub async fn refresh_instruments_at(
        &self,
        now: time::OffsetDateTime,
    ) -> Result<InstrumentsRefresh, ServiceError> {
        let stored_deven = self.marker_deven(MARKER_INSTRUMENTS_DEVEN)?;
        if !marker_is_stale(stored_deven, now) {
            return Ok(InstrumentsRefresh {
                skipped: true,
                ..InstrumentsRefresh::default()
            });
        }

        let last_share_id = self.marker_u64(MARKER_LAST_SHARE_ID)?;
        let reply = self
            .feed
            .instruments_and_shares(stored_deven, last_share_id)
            .await?;

        let (delta_instruments, delta_shares) = match reply {
            InstrumentSharesReply::Busy => {
                tracing::warn!("instrument tables busy server-side, keeping archive as is");
                return Ok(InstrumentsRefresh {
                    busy: true,
                    ..InstrumentsRefresh::default()
                });
            }
            InstrumentSharesReply::Data {
                instruments,
                shares,
            } => (instruments, shares),
        };

        // Merge by code: a re-delivered instrument replaces its old row.
        let mut by_code: HashMap<InsCode, Instrument> = self
            .store
            .load_instruments()?
            .into_iter()
            .map(|instrument| (instrument.ins_code, instrument))
            .collect();
        for instrument in delta_instruments {
            by_code.insert(instrument.ins_code, instrument);
        }
        let mut merged: Vec<Instrument> = by_code.into_values().collect();
        merged.sort_by_key(|instrument| instrument.ins_code);

        let mut events = self.store.load_share_events()?;
        let max_known = events.iter().map(|event| event.id).max().unwrap_or(0);
        let mut fresh: Vec<ShareEvent> = delta_shares
            .into_iter()
            .filter(|event| event.id > max_known)
            .collect();
        fresh.sort_by_key(|event| event.id);
        let refresh = InstrumentsRefresh {
            instruments: merged.len(),
            share_events: fresh.len(),
            ..InstrumentsRefresh::default()
        };
        events.extend(fresh);

        self.store.save_instruments(&merged)?;
        self.store.save_share_events(&events)?;
        let today = DEven::from_date(now.date());
        self.store
            .set_marker(MARKER_INSTRUMENTS_DEVEN, &today.to_string())?;
        let last_id = events.iter().map(|event| event.id).max().unwrap_or(0);
        self.store
            .set_marker(MARKER_LAST_SHARE_ID, &last_id.to_string())?;

        tracing::info!(
            instruments = refresh.instruments,
            share_events = refresh.share_events,
            "instrument tables refreshed"
        );
        Ok(refresh)
    }

    /// Bring the requested symbols' series up to date without producing
    /// output series.
    pub async fn update_prices(&self, symbols: &[String]) -> Result<HistoryReport, ServiceError> {
        self.run(symbols, false).await
    }

    /// Update and return adjusted history for the requested symbols.
    pub async fn history(&self, symbols: &[String]) -> Result<HistoryReport, ServiceError> {
        self.run(symbols, true).await
    }

    async fn run(&self, symbols: &[String], produce: bool) -> Result<HistoryReport, ServiceError> {
        let mut report = HistoryReport::default();

        let refresh = self.refresh_instruments().await?;
        if refresh.busy {
            report
                .warnings
                .push("instrument tables busy server-side; using archived tables".to_owned());
        }

        let instruments = self.store.load_instruments()?;
        let chains = build_chains(&instruments, &self.settings.chain);
        let resolved = resolve_symbols(
            &instruments,
            &chains,
            symbols,
            self.settings.merge_similar_symbols,
        );

        // One oracle consultation gates the whole run.
        let stored_marker = self.marker_deven(MARKER_LAST_POSSIBLE_DEVEN)?;
        let oracle = LastPossibleOracle::new(Arc::clone(&self.feed));
        let marker = oracle.resolve(stored_marker).await.map_err(ServiceError::from)?;
        if marker != stored_marker {
            self.store
                .set_marker(MARKER_LAST_POSSIBLE_DEVEN, &marker.to_string())?;
        }

        let by_code: HashMap<InsCode, &Instrument> = instruments
            .iter()
            .map(|instrument| (instrument.ins_code, instrument))
            .collect();

        // Seed the cache from the archive and collect the outdated codes.
        let mut worklist = Vec::new();
        let mut stored_tails: HashMap<InsCode, DEven> = HashMap::new();
        for (_, codes) in resolved.iter().filter_map(|(s, c)| c.as_ref().map(|c| (s, c))) {
            for &code in codes {
                if stored_tails.contains_key(&code) {
                    continue;
                }
                let archived = self.store.load_series(code)?;
                let tail = archived.last().map(|record| record.deven).unwrap_or(DEven::ZERO);
                stored_tails.insert(code, tail);
                self.cache.seed(code, archived).await;

                if should_update(tail, marker) {
                    let flag = by_code.get(&code).map(|i| i.price_flag()).unwrap_or(1);
                    worklist.push(SyncEntry {
                        ins_code: code,
                        last_deven: tail,
                        flag,
                    });
                }
            }
        }

        let synchronizer = Synchronizer::new(
            Arc::clone(&self.feed) as Arc<dyn crate::feed::PriceFeed>,
            self.cache.clone(),
        )
        .with_chunk_size(self.settings.chunk_size)
        .with_retry(self.settings.retry.clone());
        report.outcome = synchronizer.sync(worklist).await;

        // Persist only the freshly appended rows.
        for &code in &report.outcome.succeeded {
            let tail = stored_tails.get(&code).copied().unwrap_or(DEven::ZERO);
            let fresh = self.cache.records_after(code, tail).await;
            if !fresh.is_empty() {
                self.store.append_series(code, &fresh)?;
            }
        }
        if !report.outcome.failed.is_empty() {
            report.warnings.push(format!(
                "{} instrument(s) failed to synchronize",
                report.outcome.failed.len()
            ));
        }

        if produce {
            let share_events = self.store.load_share_events()?;
            for (symbol, codes) in resolved {
                match codes {
                    None => report.symbols.push(SymbolReport::UnknownSymbol { symbol }),
                    Some(codes) => {
                        let merged = self.cache.merged(&codes).await;
                        let adjusted = adjust(
                            self.settings.adjustment,
                            merged,
                            &share_events,
                            &codes,
                            &self.settings.adjust,
                        );
                        let records = self.filter_records(adjusted);
                        report.symbols.push(SymbolReport::Series {
                            symbol,
                            codes,
                            records,
                        });
                    }
                }
            }
        } else {
            for (symbol, codes) in resolved {
                if codes.is_none() {
                    report.symbols.push(SymbolReport::UnknownSymbol { symbol });
                }
            }
        }

        Ok(report)
    }

    /// Start-date floor and zero-volume filtering, applied after
    /// adjustment so multipliers see the full series.
    fn filter_records(&self, records: Vec<AdjustedRecord>) -> Vec<AdjustedRecord> {
        records
            .into_iter()
            .filter(|adjusted| {
                if let Some(floor) = self.settings.start_date {
                    if adjusted.record.deven < floor {
                        return false;
                    }
                }
                self.settings.days_without_trade || !adjusted.record.is_untraded()
            })
            .collect()
    }

    fn marker_deven(&self, name: &str) -> Result<DEven, StoreError> {
        match self.store.marker(name)? {
            None => Ok(DEven::ZERO),
            Some(value) => DEven::parse(&value)
                .map_err(|e| StoreError::Corrupt(format!("marker {name}: {e}"))),
        }
    }

    fn marker_u64(&self, name: &str) -> Result<u64, StoreError> {
        match self.store.marker(name)? {
            None => Ok(0),
            Some(value) => value
                .trim()
                .parse::<u64>()
                .map_err(|_| StoreError::Corrupt(format!("marker {name}: {value:?}"))),
        }
    }
}

/// Map each requested display symbol to the codes backing it: the whole
/// rename chain when merging is on, the exact instrument otherwise.
/// `None` marks an unknown symbol.
fn resolve_symbols(
    instruments: &[Instrument],
    chains: &BTreeMap<String, SymbolChain>,
    symbols: &[String],
    merge_similar: bool,
) -> Vec<(String, Option<Vec<InsCode>>)> {
    symbols
        .iter()
        .map(|symbol| {
            let hit = instruments
                .iter()
                .find(|instrument| instrument.symbol == *symbol);
            let codes = hit.map(|instrument| {
                if merge_similar {
                    chains
                        .get(instrument.root_symbol())
                        .map(|chain| chain.codes.clone())
                        .unwrap_or_else(|| vec![instrument.ins_code])
                } else {
                    vec![instrument.ins_code]
                }
            });
            (symbol.clone(), codes)
        })
        .collect()
}
