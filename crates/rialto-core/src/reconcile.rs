//! Symbol rename reconciliation.
//!
//! An instrument keeps its numeric code across renames but changes its
//! display symbol; the exchange marks a renamed listing by carrying the
//! original symbol in the instrument row and suffixing the new symbol
//! with `<marker><N>` where `N` is the rename generation. Chains rebuild
//! wholesale from the full instrument table on every refresh.

use std::collections::BTreeMap;

use crate::{InsCode, Instrument};

/// Reconciliation knobs.
#[derive(Debug, Clone)]
pub struct ChainConfig {
    /// Suffix marker separating a renamed symbol from its generation
    /// number.
    pub rename_marker: String,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            rename_marker: "-ق".to_owned(),
        }
    }
}

/// Ordered rename chain of what a user considers one symbol. The root
/// (current listing) comes first, older generations follow by ascending
/// generation number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolChain {
    pub root: String,
    pub codes: Vec<InsCode>,
}

impl SymbolChain {
    pub fn is_degenerate(&self) -> bool {
        self.codes.len() == 1
    }
}

/// Generation sort key. The root is generation 1; a renamed member takes
/// the numeric suffix after the marker. An unparseable suffix sorts last.
fn generation(instrument: &Instrument, marker: &str) -> u32 {
    if instrument.symbol_original.is_none() {
        return 1;
    }
    let parsed = instrument
        .symbol
        .rfind(marker)
        .map(|pos| &instrument.symbol[pos + marker.len()..])
        .and_then(|suffix| suffix.parse::<u32>().ok());
    match parsed {
        // Generations start counting after the root.
        Some(n) => n.saturating_add(1),
        None => {
            tracing::warn!(
                symbol = %instrument.symbol,
                code = %instrument.ins_code,
                "renamed instrument has no parseable generation suffix"
            );
            u32::MAX
        }
    }
}

/// Group instruments into rename chains keyed by root symbol. Every
/// instrument lands in exactly one chain; unrenamed instruments produce
/// degenerate single-member chains.
pub fn build_chains(
    instruments: &[Instrument],
    config: &ChainConfig,
) -> BTreeMap<String, SymbolChain> {
    let mut groups: BTreeMap<String, Vec<(u32, InsCode)>> = BTreeMap::new();

    for instrument in instruments {
        let root = instrument.root_symbol().to_owned();
        let key = (generation(instrument, &config.rename_marker), instrument.ins_code);
        groups.entry(root).or_default().push(key);
    }

    groups
        .into_iter()
        .map(|(root, mut members)| {
            members.sort();
            let codes = members.into_iter().map(|(_, code)| code).collect();
            let chain = SymbolChain {
                root: root.clone(),
                codes,
            };
            (root, chain)
        })
        .collect()
}
