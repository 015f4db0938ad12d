//! Domain types for the daily-trading archive.
//!
//! All wire-facing types parse strictly at construction: a row either
//! becomes a fully-populated record or a [`crate::ValidationError`],
//! never a partially-filled object.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`DEven`] | 8-digit yyyymmdd trading-day key |
//! | [`InsCode`] | Stable numeric instrument identifier |
//! | [`Instrument`] | Instrument identity incl. rename origin |
//! | [`ShareEvent`] | Capital-structure change row |
//! | [`PriceRecord`] | One daily trading record |

mod deven;
mod instrument;
mod price;

pub use deven::DEven;
pub use instrument::{InsCode, Instrument, ShareEvent};
pub use price::PriceRecord;
