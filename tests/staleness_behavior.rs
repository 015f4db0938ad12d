//! Behavior tests for the trading-calendar staleness rules and the
//! last-possible-date oracle.

use std::sync::Arc;

use rialto_core::feed::TsetmcFeed;
use rialto_core::staleness::{should_update_at, LastPossibleOracle};
use rialto_core::{DEven, SyncError};
use rialto_tests::{deven, ScriptedHttp};
use time::macros::datetime;

// =============================================================================
// Calendar rules
// =============================================================================

#[test]
fn never_synced_series_is_always_stale() {
    let now = datetime!(2023-01-02 09:00 UTC);
    assert!(should_update_at(DEven::ZERO, deven("20230101"), now));
}

#[test]
fn same_day_update_is_gated_on_session_end() {
    let marker = deven("20230101");
    assert!(!should_update_at(marker, marker, datetime!(2023-01-01 16:00 UTC)));
    assert!(should_update_at(marker, marker, datetime!(2023-01-01 17:00 UTC)));
}

#[test]
fn cache_ahead_of_the_marker_is_never_stale() {
    // Clock skew: the archive claims a newer date than the server offers.
    let now = datetime!(2023-01-02 18:00 UTC);
    assert!(!should_update_at(deven("20230103"), deven("20230101"), now));
}

#[test]
fn weekend_re_polling_is_suppressed_for_short_gaps() {
    // 2023-01-05 and 2023-01-06 are the Thursday/Friday weekend; the last
    // trading day was Tuesday, so there is nothing new to fetch.
    for now in [
        datetime!(2023-01-05 12:00 UTC),
        datetime!(2023-01-06 12:00 UTC),
    ] {
        assert!(!should_update_at(deven("20230102"), deven("20230103"), now));
    }
}

#[test]
fn wednesday_session_is_fetched_over_the_weekend() {
    let now = datetime!(2023-01-05 12:00 UTC);
    assert!(should_update_at(deven("20230103"), deven("20230104"), now));
}

#[test]
fn large_gaps_override_weekend_suppression() {
    let now = datetime!(2023-01-06 12:00 UTC);
    assert!(should_update_at(deven("20221220"), deven("20230103"), now));
}

// =============================================================================
// Oracle: marker reuse and fatal failure
// =============================================================================

#[tokio::test]
async fn fresh_marker_is_reused_without_a_feed_call() {
    let http = ScriptedHttp::new();
    let feed = Arc::new(TsetmcFeed::new(http.clone()).with_base_url("http://feed.test/api"));
    let oracle = LastPossibleOracle::new(feed);

    // Marker from today, before session end: still fresh.
    let stored = deven("20230110");
    let now = datetime!(2023-01-10 12:00 UTC);
    let resolved = oracle.resolve_at(stored, now).await.expect("resolves");

    assert_eq!(resolved, stored);
    assert_eq!(http.calls_for("LastPossibleDeven"), 0);
}

#[tokio::test]
async fn stale_marker_is_refreshed_from_the_feed() {
    let http = ScriptedHttp::new().script("LastPossibleDeven", "20230110;20230109");
    let feed = Arc::new(TsetmcFeed::new(http.clone()).with_base_url("http://feed.test/api"));
    let oracle = LastPossibleOracle::new(feed);

    let resolved = oracle
        .resolve_at(DEven::ZERO, datetime!(2023-01-10 18:00 UTC))
        .await
        .expect("resolves");

    assert_eq!(resolved, deven("20230110"));
    assert_eq!(http.calls_for("LastPossibleDeven"), 1);
}

#[tokio::test]
async fn empty_first_field_falls_back_to_the_second() {
    let http = ScriptedHttp::new().script("LastPossibleDeven", ";20230109");
    let feed = Arc::new(TsetmcFeed::new(http).with_base_url("http://feed.test/api"));
    let oracle = LastPossibleOracle::new(feed);

    let resolved = oracle
        .resolve_at(DEven::ZERO, datetime!(2023-01-10 18:00 UTC))
        .await
        .expect("resolves");
    assert_eq!(resolved, deven("20230109"));
}

#[tokio::test]
async fn malformed_marker_reply_is_fatal() {
    let http = ScriptedHttp::new().script("LastPossibleDeven", "<html>maintenance</html>");
    let feed = Arc::new(TsetmcFeed::new(http).with_base_url("http://feed.test/api"));
    let oracle = LastPossibleOracle::new(feed);

    let err = oracle
        .resolve_at(DEven::ZERO, datetime!(2023-01-10 18:00 UTC))
        .await
        .expect_err("must fail");
    assert!(matches!(err, SyncError::OracleUnavailable(_)));
}
