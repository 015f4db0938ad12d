use std::collections::HashMap;

use rialto_core::reconcile::{build_chains, ChainConfig};
use rialto_core::{InsCode, SeriesStore};
use serde_json::json;

use crate::cli::{ChainsArgs, Cli};
use crate::error::CliError;
use crate::output::CommandResult;

use super::open_store;

pub fn run(cli: &Cli, args: &ChainsArgs) -> Result<CommandResult, CliError> {
    let store = open_store(cli)?;
    let instruments = store.load_instruments()?;
    let symbols: HashMap<InsCode, &str> = instruments
        .iter()
        .map(|instrument| (instrument.ins_code, instrument.symbol.as_str()))
        .collect();

    let chains = build_chains(&instruments, &ChainConfig::default());

    let mut table = Vec::new();
    let mut rows = Vec::new();
    for (root, chain) in &chains {
        if args.merged_only && chain.is_degenerate() {
            continue;
        }
        let members: Vec<String> = chain
            .codes
            .iter()
            .map(|code| {
                let symbol = symbols.get(code).copied().unwrap_or("?");
                format!("{symbol} ({code})")
            })
            .collect();
        table.push(format!("{root}: {}", members.join(" -> ")));
        rows.push(json!({
            "root": root,
            "codes": chain.codes.iter().map(|c| c.value()).collect::<Vec<_>>(),
        }));
    }

    Ok(CommandResult::new(json!({ "chains": rows }), table))
}
