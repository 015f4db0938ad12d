use rialto_core::SeriesStore;
use serde_json::json;

use crate::cli::{Cli, InstrumentsArgs};
use crate::error::CliError;
use crate::output::CommandResult;

use super::open_store;

pub fn run(cli: &Cli, args: &InstrumentsArgs) -> Result<CommandResult, CliError> {
    let store = open_store(cli)?;
    let mut instruments = store.load_instruments()?;
    if let Some(filter) = &args.filter {
        instruments.retain(|instrument| instrument.symbol.contains(filter.as_str()));
    }
    instruments.sort_by(|a, b| a.symbol.cmp(&b.symbol));

    let mut table = vec![format!(
        "{:<16} {:>20} {:>6} {:>10}",
        "symbol", "code", "market", "listed"
    )];
    for instrument in &instruments {
        table.push(format!(
            "{:<16} {:>20} {:>6} {:>10}",
            instrument.symbol,
            instrument.ins_code.value(),
            instrument.market_code,
            instrument.first_deven.to_string(),
        ));
    }

    let data = json!({ "instruments": instruments });
    Ok(CommandResult::new(data, table))
}
