//! # Rialto Core
//!
//! Core engine of the Rialto daily-trading archive: an incrementally
//! updated local mirror of a remote exchange feed that only supports
//! coarse, chunked, delta-style queries.
//!
//! ## Overview
//!
//! - **Strict domain types** for trading dates, instrument codes, rows
//! - **Staleness oracle** encoding the exchange's trading calendar
//! - **Symbol reconciler** rebuilding rename chains from the instrument table
//! - **Batch synchronizer** fanning chunked feed calls out concurrently
//! - **Adjustment engine** producing back-adjusted price series
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adjust`] | Back-adjustment of price series (conditions 0–3) |
//! | [`cache`] | Shared in-memory raw series cache |
//! | [`domain`] | Domain types ([`DEven`], [`InsCode`], rows) |
//! | [`error`] | Error taxonomy |
//! | [`feed`] | Remote feed adapter and [`feed::PriceFeed`] seam |
//! | [`http`] | HTTP transport abstraction |
//! | [`reconcile`] | Symbol rename chains |
//! | [`retry`] | Per-chunk retry backoff |
//! | [`service`] | High-level archive facade |
//! | [`settings`] | Runtime configuration |
//! | [`staleness`] | Trading-calendar staleness rules |
//! | [`store`] | Abstract archive interface |
//! | [`sync`] | Chunked, concurrent synchronization |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use rialto_core::http::ReqwestHttpClient;
//! use rialto_core::feed::TsetmcFeed;
//! use rialto_core::service::HistoryService;
//! use rialto_core::store::MemoryStore;
//! use rialto_core::Settings;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let feed = Arc::new(TsetmcFeed::new(Arc::new(ReqwestHttpClient::new())));
//!     let service = HistoryService::new(feed, Arc::new(MemoryStore::new()), Settings::default());
//!     let report = service.history(&["فولاد".to_owned()]).await?;
//!     println!("{} symbol(s) resolved", report.symbols.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Per-chunk transport and protocol trouble is retried and, once
//! exhausted, reported through [`sync::SyncOutcome::failed`] without
//! failing the run. Only an unavailable last-possible-date oracle aborts
//! a synchronization ([`SyncError::OracleUnavailable`]).

pub mod adjust;
pub mod cache;
pub mod domain;
pub mod error;
pub mod feed;
pub mod http;
pub mod reconcile;
pub mod retry;
pub mod service;
pub mod settings;
pub mod staleness;
pub mod store;
pub mod sync;

pub use adjust::{AdjustConfig, AdjustedRecord, AdjustmentCondition};
pub use cache::RawSeriesCache;
pub use domain::{DEven, InsCode, Instrument, PriceRecord, ShareEvent};
pub use error::{FeedError, StoreError, SyncError, ValidationError};
pub use reconcile::{ChainConfig, SymbolChain};
pub use retry::{Backoff, RetryConfig};
pub use service::{HistoryReport, HistoryService, ServiceError, SymbolReport};
pub use settings::Settings;
pub use store::{MemoryStore, SeriesStore};
pub use sync::{SyncOutcome, Synchronizer};
