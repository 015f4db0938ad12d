use serde_json::json;

use rialto_core::{AdjustmentCondition, DEven, Settings, SymbolReport};

use crate::cli::{Cli, HistoryArgs};
use crate::error::CliError;
use crate::output::CommandResult;

use super::service;

pub async fn run(cli: &Cli, args: &HistoryArgs) -> Result<CommandResult, CliError> {
    let adjustment = AdjustmentCondition::try_from(args.adjust)
        .map_err(|value| CliError::InvalidArgument(format!("adjustment condition {value}")))?;
    let start_date = match &args.start_date {
        None => None,
        Some(raw) => Some(DEven::parse(raw)?),
    };

    let settings = Settings {
        adjustment,
        start_date,
        days_without_trade: args.days_without_trade,
        merge_similar_symbols: args.merge,
        ..Settings::default()
    };
    let service = service(cli, settings)?;

    let report = service.history(&args.symbols).await?;

    let mut symbols = Vec::new();
    let mut table = Vec::new();
    for entry in &report.symbols {
        match entry {
            SymbolReport::UnknownSymbol { symbol } => {
                symbols.push(json!({ "symbol": symbol, "error": "unknown symbol" }));
                table.push(format!("{symbol}: unknown symbol"));
            }
            SymbolReport::Series {
                symbol,
                codes,
                records,
            } => {
                symbols.push(json!({
                    "symbol": symbol,
                    "codes": codes.iter().map(|c| c.value()).collect::<Vec<_>>(),
                    "records": records,
                }));
                table.push(format!("{symbol} ({} record(s))", records.len()));
                table.push(format!(
                    "{:<10} {:>12} {:>12} {:>14}",
                    "date", "close", "adj close", "volume"
                ));
                for adjusted in records {
                    table.push(format!(
                        "{:<10} {:>12.0} {:>12.0} {:>14.0}",
                        adjusted.record.deven.to_string(),
                        adjusted.record.p_closing,
                        adjusted.adj_close,
                        adjusted.record.q_tot_tran,
                    ));
                }
            }
        }
    }

    let data = json!({
        "symbols": symbols,
        "failed": report.outcome.failed.iter().map(|c| c.value()).collect::<Vec<_>>(),
    });

    Ok(CommandResult::new(data, table).with_warnings(report.warnings))
}
