//! Runtime configuration.

use crate::adjust::{AdjustConfig, AdjustmentCondition};
use crate::reconcile::ChainConfig;
use crate::retry::RetryConfig;
use crate::DEven;

/// Explicit configuration consumed across the crate. Construct with
/// struct-update syntax over [`Settings::default`].
#[derive(Debug, Clone)]
pub struct Settings {
    /// Back-adjustment basis applied to returned series.
    pub adjustment: AdjustmentCondition,
    /// Resolve a requested symbol to its whole rename chain instead of the
    /// root instrument alone.
    pub merge_similar_symbols: bool,
    /// Oldest date returned to callers; earlier records stay archived but
    /// are filtered from results.
    pub start_date: Option<DEven>,
    /// Keep zero-volume rows in returned series.
    pub days_without_trade: bool,
    /// Instrument codes per closing-prices request.
    pub chunk_size: usize,
    /// Per-chunk retry budget and backoff cadence.
    pub retry: RetryConfig,
    pub chain: ChainConfig,
    pub adjust: AdjustConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            adjustment: AdjustmentCondition::Raw,
            merge_similar_symbols: true,
            start_date: None,
            days_without_trade: false,
            chunk_size: 50,
            retry: RetryConfig::default(),
            chain: ChainConfig::default(),
            adjust: AdjustConfig::default(),
        }
    }
}
