//! Trading-calendar staleness rules.
//!
//! Decides whether an archived date is stale relative to the feed's
//! last-possible-trading-date marker. The rules encode the exchange's
//! calendar: sessions settle after 16:00 local time, the weekend is
//! Thursday/Friday, and weekend re-polling is suppressed unless the last
//! known trading day was the pre-weekend Wednesday.

use std::sync::Arc;

use time::{OffsetDateTime, Weekday};

use crate::feed::TsetmcFeed;
use crate::{DEven, FeedError, SyncError};

/// Hour after which a session's records are final.
pub const TRADING_SESSION_END_HOUR: u8 = 16;

/// Minimum calendar days between refreshes of the same series.
pub const UPDATE_INTERVAL_DAYS: i64 = 1;

/// Core calendar rules, shared by the cache-staleness and marker-staleness
/// checks. Assumes `cached` is synced and not ahead of `last_possible`.
fn refresh_due(cached: DEven, last_possible: DEven, now: OffsetDateTime) -> bool {
    let days_passed = match cached.days_until(last_possible) {
        Some(days) => days.abs(),
        // Either date fails to resolve on the calendar: refresh rather
        // than silently freeze the archive.
        None => return true,
    };

    let today = DEven::from_date(now.date());
    let today_is_last_possible = today == last_possible;

    // The session-end gate only bites on the marker's own day; earlier
    // days are settled by definition.
    let session_end_passed = !today_is_last_possible || now.hour() > TRADING_SESSION_END_HOUR;

    // Thursday/Friday weekend: skip re-polling unless the last trading day
    // was Wednesday or the archive has fallen further behind than one
    // weekend can explain.
    let weekend = matches!(now.weekday(), Weekday::Thursday | Weekday::Friday);
    let suppressed = weekend
        && last_possible.weekday() != Some(Weekday::Wednesday)
        && days_passed <= 3;

    let interval_ok = days_passed >= UPDATE_INTERVAL_DAYS || today_is_last_possible;

    interval_ok && session_end_passed && !suppressed
}

/// Whether a series cached through `cached` needs refreshing, given the
/// feed's marker `last_possible`, at instant `now`.
pub fn should_update_at(cached: DEven, last_possible: DEven, now: OffsetDateTime) -> bool {
    if cached.is_never_synced() {
        return true;
    }
    // The cache cannot be ahead of the server; treat as current.
    if cached > last_possible {
        return false;
    }
    refresh_due(cached, last_possible, now)
}

fn local_now() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

/// [`should_update_at`] against the local clock.
pub fn should_update(cached: DEven, last_possible: DEven) -> bool {
    should_update_at(cached, last_possible, local_now())
}

/// Whether a stored last-possible marker should itself be re-fetched.
/// Uses today as the reference point; the skew guard of
/// [`should_update_at`] does not apply because an old marker must never
/// suppress its own refresh.
pub fn marker_is_stale(marker: DEven, now: OffsetDateTime) -> bool {
    marker.is_never_synced() || refresh_due(DEven::from_date(now.date()), marker, now)
}

/// Cache-backed resolver for the feed's last-possible-trading-date marker.
///
/// A failed or malformed reply is [`SyncError::OracleUnavailable`], which
/// callers treat as fatal before issuing any price chunk.
pub struct LastPossibleOracle {
    feed: Arc<TsetmcFeed>,
}

impl LastPossibleOracle {
    pub fn new(feed: Arc<TsetmcFeed>) -> Self {
        Self { feed }
    }

    /// Resolve the marker, reusing `stored` when it is still fresh at
    /// `now`. Returns the (possibly refreshed) marker; the caller persists
    /// it.
    pub async fn resolve_at(
        &self,
        stored: DEven,
        now: OffsetDateTime,
    ) -> Result<DEven, SyncError> {
        if !marker_is_stale(stored, now) {
            return Ok(stored);
        }
        let body = self.feed.last_possible_deven().await?;
        Ok(parse_marker(&body)?)
    }

    pub async fn resolve(&self, stored: DEven) -> Result<DEven, SyncError> {
        self.resolve_at(stored, local_now()).await
    }
}

/// Decode a marker reply: exactly two `;`-separated fields, each empty or
/// an 8-digit date, first non-empty wins.
pub fn parse_marker(body: &str) -> Result<DEven, FeedError> {
    let body = body.trim();
    let mut fields = body.split(';');
    let (first, second) = match (fields.next(), fields.next(), fields.next()) {
        (Some(first), Some(second), None) => (first, second),
        _ => {
            return Err(FeedError::protocol(format!(
                "malformed last-possible marker: {body:?}"
            )))
        }
    };

    let valid = |field: &str| field.is_empty() || (field.len() == 8 && field.bytes().all(|b| b.is_ascii_digit()));
    if !valid(first) || !valid(second) || (first.is_empty() && second.is_empty()) {
        return Err(FeedError::protocol(format!(
            "malformed last-possible marker: {body:?}"
        )));
    }

    let chosen = if first.is_empty() { second } else { first };
    DEven::parse(chosen).map_err(|e| FeedError::protocol(format!("marker date: {e}")))
}
