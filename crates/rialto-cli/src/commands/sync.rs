use serde_json::json;

use rialto_core::{RetryConfig, Settings};

use crate::cli::{Cli, SyncArgs};
use crate::error::CliError;
use crate::output::CommandResult;

use super::service;

pub async fn run(cli: &Cli, args: &SyncArgs) -> Result<CommandResult, CliError> {
    let settings = Settings {
        merge_similar_symbols: args.merge,
        chunk_size: args.chunk_size,
        retry: RetryConfig {
            max_retries: args.retries,
            ..RetryConfig::default()
        },
        ..Settings::default()
    };
    let service = service(cli, settings)?;

    let refresh = service.refresh_instruments().await?;
    let report = service.update_prices(&args.symbols).await?;

    let unknown: Vec<&str> = report
        .symbols
        .iter()
        .filter_map(|symbol| match symbol {
            rialto_core::SymbolReport::UnknownSymbol { symbol } => Some(symbol.as_str()),
            _ => None,
        })
        .collect();

    let data = json!({
        "instruments": refresh.instruments,
        "share_events": refresh.share_events,
        "instruments_busy": refresh.busy,
        "synchronized": report.outcome.succeeded.len(),
        "failed": report.outcome.failed.iter().map(|c| c.value()).collect::<Vec<_>>(),
        "unknown_symbols": unknown,
    });

    let mut table = vec![format!(
        "synchronized {} instrument(s), {} failed",
        report.outcome.succeeded.len(),
        report.outcome.failed.len()
    )];
    if refresh.busy {
        table.push("instrument tables busy server-side, archive left as is".to_owned());
    } else if !refresh.skipped {
        table.push(format!(
            "instrument table refreshed: {} instrument(s), {} new share event(s)",
            refresh.instruments, refresh.share_events
        ));
    }
    for symbol in &unknown {
        table.push(format!("unknown symbol: {symbol}"));
    }

    Ok(CommandResult::new(data, table).with_warnings(report.warnings))
}
