//! Behavior tests for instrument parsing and symbol rename chains.

use std::sync::Arc;

use rialto_core::feed::{InstrumentsReply, TsetmcFeed};
use rialto_core::reconcile::{build_chains, ChainConfig};
use rialto_core::{DEven, InsCode, Instrument, ValidationError};
use rialto_tests::{instrument, instrument_row, ScriptedHttp};

// =============================================================================
// Chain reconciliation
// =============================================================================

#[test]
fn renamed_generations_reconcile_in_root_first_order() {
    let instruments = vec![
        instrument(30, "X-ق2", Some("X")),
        instrument(10, "X", None),
        instrument(20, "X-ق1", Some("X")),
    ];

    let chains = build_chains(&instruments, &ChainConfig::default());
    let chain = chains.get("X").expect("chain for X");
    assert_eq!(chain.codes, vec![InsCode(10), InsCode(20), InsCode(30)]);
}

#[test]
fn every_instrument_lands_in_exactly_one_chain() {
    let instruments = vec![
        instrument(1, "A", None),
        instrument(2, "B", None),
        instrument(3, "B-ق1", Some("B")),
    ];

    let chains = build_chains(&instruments, &ChainConfig::default());
    assert_eq!(chains.len(), 2);
    assert!(chains.get("A").expect("chain A").is_degenerate());

    let total: usize = chains.values().map(|chain| chain.codes.len()).sum();
    assert_eq!(total, instruments.len());
}

#[test]
fn unparseable_suffix_sorts_last_instead_of_failing() {
    let instruments = vec![
        instrument(3, "X-قديم", Some("X")),
        instrument(2, "X-ق1", Some("X")),
        instrument(1, "X", None),
    ];

    let chains = build_chains(&instruments, &ChainConfig::default());
    let chain = chains.get("X").expect("chain");
    assert_eq!(chain.codes, vec![InsCode(1), InsCode(2), InsCode(3)]);
}

// =============================================================================
// Instrument row parsing
// =============================================================================

#[test]
fn eighteen_field_rows_parse_without_an_original_symbol() {
    let parsed = Instrument::parse_row(&instrument_row(7, "فولاد", None)).expect("parses");
    assert_eq!(parsed.ins_code, InsCode(7));
    assert_eq!(parsed.symbol, "فولاد");
    assert_eq!(parsed.symbol_original, None);
}

#[test]
fn nineteenth_field_carries_the_rename_origin() {
    let parsed =
        Instrument::parse_row(&instrument_row(8, "فولاد-ق1", Some("فولاد"))).expect("parses");
    assert_eq!(parsed.symbol_original.as_deref(), Some("فولاد"));
    assert_eq!(parsed.root_symbol(), "فولاد");
}

#[test]
fn short_rows_are_rejected() {
    let err = Instrument::parse_row("1,2,3,4").expect_err("must fail");
    assert!(matches!(err, ValidationError::FieldCount { .. }));
}

// =============================================================================
// Instrument feed replies
// =============================================================================

#[tokio::test]
async fn busy_marker_and_empty_body_are_distinct_replies() {
    let http = ScriptedHttp::new().script("Instrument", "*").script("Instrument", "");
    let feed = TsetmcFeed::new(http).with_base_url("http://feed.test/api");

    assert_eq!(
        feed.instruments(DEven::ZERO).await.expect("reply"),
        InstrumentsReply::Busy
    );
    assert_eq!(
        feed.instruments(DEven::ZERO).await.expect("reply"),
        InstrumentsReply::Current
    );
}

#[tokio::test]
async fn instrument_rows_decode_from_the_delta_reply() {
    let body = format!(
        "{};{}",
        instrument_row(1, "X", None),
        instrument_row(2, "X-ق1", Some("X"))
    );
    let http = ScriptedHttp::new().script("Instrument", &body);
    let feed = TsetmcFeed::new(http).with_base_url("http://feed.test/api");

    match feed.instruments(DEven::ZERO).await.expect("reply") {
        InstrumentsReply::Rows(rows) => {
            assert_eq!(rows.len(), 2);
            let chains = build_chains(&rows, &ChainConfig::default());
            assert_eq!(
                chains.get("X").expect("chain").codes,
                vec![InsCode(1), InsCode(2)]
            );
        }
        other => panic!("unexpected reply: {other:?}"),
    }
}
