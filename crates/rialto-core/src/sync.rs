//! Chunked, concurrent price synchronization.
//!
//! The worklist of outdated codes is cut into chunks; every chunk is one
//! feed call, retried on its own with exponential backoff while other
//! chunks proceed. A chunk that exhausts its retries reports its whole
//! code set as failed; the run itself always completes.

use std::sync::Arc;

use tokio::task::JoinSet;

use crate::cache::RawSeriesCache;
use crate::feed::{PriceFeed, SyncEntry};
use crate::retry::RetryConfig;
use crate::{FeedError, InsCode, PriceRecord};

/// Result of one synchronization run. Partial failure is expected; the
/// caller decides whether to re-queue `failed`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncOutcome {
    pub succeeded: Vec<InsCode>,
    pub failed: Vec<InsCode>,
}

impl SyncOutcome {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Fans the worklist out over the feed and lands rows in the shared
/// cache.
pub struct Synchronizer {
    feed: Arc<dyn PriceFeed>,
    cache: RawSeriesCache,
    chunk_size: usize,
    retry: RetryConfig,
}

impl Synchronizer {
    pub fn new(feed: Arc<dyn PriceFeed>, cache: RawSeriesCache) -> Self {
        Self {
            feed,
            cache,
            chunk_size: 50,
            retry: RetryConfig::default(),
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Fetch deltas for every entry in `worklist`. Chunks run
    /// concurrently; a chunk's retries are sequential with itself. Each
    /// input code lands in exactly one of the outcome's two sets.
    pub async fn sync(&self, worklist: Vec<SyncEntry>) -> SyncOutcome {
        let mut tasks = JoinSet::new();
        for chunk in worklist.chunks(self.chunk_size) {
            let chunk = chunk.to_vec();
            let feed = Arc::clone(&self.feed);
            let cache = self.cache.clone();
            let retry = self.retry.clone();
            tasks.spawn(async move { fetch_chunk(feed, cache, retry, chunk).await });
        }

        let mut outcome = SyncOutcome::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((codes, true)) => outcome.succeeded.extend(codes),
                Ok((codes, false)) => outcome.failed.extend(codes),
                Err(err) => tracing::error!(error = %err, "chunk task aborted"),
            }
        }
        outcome.succeeded.sort();
        outcome.failed.sort();
        outcome
    }
}

/// One chunk's retry loop. Returns the chunk's codes and whether its rows
/// landed in the cache.
async fn fetch_chunk(
    feed: Arc<dyn PriceFeed>,
    cache: RawSeriesCache,
    retry: RetryConfig,
    entries: Vec<SyncEntry>,
) -> (Vec<InsCode>, bool) {
    let codes: Vec<InsCode> = entries.iter().map(|entry| entry.ins_code).collect();

    let mut attempt = 0u32;
    loop {
        match fetch_once(feed.as_ref(), &cache, &entries).await {
            Ok(()) => return (codes, true),
            Err(err) if attempt >= retry.max_retries => {
                tracing::warn!(
                    codes = codes.len(),
                    attempts = attempt + 1,
                    error = %err,
                    "chunk failed, retries exhausted"
                );
                return (codes, false);
            }
            Err(err) => {
                let delay = retry.delay_for_attempt(attempt);
                tracing::debug!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "chunk attempt failed, backing off"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

async fn fetch_once(
    feed: &dyn PriceFeed,
    cache: &RawSeriesCache,
    entries: &[SyncEntry],
) -> Result<(), FeedError> {
    let body = feed.closing_prices(entries.to_vec()).await?;
    let segments = parse_chunk_response(entries, &body)?;
    for (entry, rows) in entries.iter().zip(segments) {
        if !rows.is_empty() {
            cache.append(entry.ins_code, rows).await;
        }
    }
    Ok(())
}

/// Validate and decode one chunk reply: empty means every requested code
/// is already current; otherwise the body must stay inside the protocol's
/// character set and split on `@` into exactly one segment per requested
/// code, each segment `;`-joined 11-field rows in strictly ascending date
/// order for the matching code.
fn parse_chunk_response(
    entries: &[SyncEntry],
    body: &str,
) -> Result<Vec<Vec<PriceRecord>>, FeedError> {
    let body = body.trim();
    if body.is_empty() {
        return Ok(vec![Vec::new(); entries.len()]);
    }

    if !body
        .bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b',' | b';' | b'@' | b'-'))
    {
        return Err(FeedError::protocol("chunk reply outside protocol alphabet"));
    }

    let segments: Vec<&str> = body.split('@').collect();
    if segments.len() != entries.len() {
        return Err(FeedError::protocol(format!(
            "chunk reply has {} segments for {} requested codes",
            segments.len(),
            entries.len()
        )));
    }

    entries
        .iter()
        .zip(segments)
        .map(|(entry, segment)| decode_segment(entry, segment))
        .collect()
}

fn decode_segment(entry: &SyncEntry, segment: &str) -> Result<Vec<PriceRecord>, FeedError> {
    let mut rows = Vec::new();
    for raw in segment.split(';').filter(|raw| !raw.is_empty()) {
        let row = PriceRecord::parse_row(raw).map_err(FeedError::from)?;
        if row.ins_code != entry.ins_code {
            return Err(FeedError::protocol(format!(
                "segment for {} carries a row for {}",
                entry.ins_code, row.ins_code
            )));
        }
        if let Some(last) = rows.last().map(|r: &PriceRecord| r.deven) {
            if row.deven <= last {
                return Err(FeedError::protocol(format!(
                    "rows for {} are not strictly ascending",
                    entry.ins_code
                )));
            }
        }
        rows.push(row);
    }
    Ok(rows)
}
