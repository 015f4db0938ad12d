mod chains;
mod history;
mod instruments;
mod sync;

use std::sync::Arc;

use rialto_core::feed::TsetmcFeed;
use rialto_core::http::ReqwestHttpClient;
use rialto_core::{HistoryService, Settings};
use rialto_store::CsvStore;

use crate::cli::{Cli, Command};
use crate::error::CliError;
use crate::output::CommandResult;

pub async fn run(cli: &Cli) -> Result<CommandResult, CliError> {
    match &cli.command {
        Command::Sync(args) => sync::run(cli, args).await,
        Command::History(args) => history::run(cli, args).await,
        Command::Instruments(args) => instruments::run(cli, args),
        Command::Chains(args) => chains::run(cli, args),
    }
}

fn open_store(cli: &Cli) -> Result<Arc<CsvStore>, CliError> {
    Ok(Arc::new(CsvStore::open(&cli.data_dir)?))
}

fn service(cli: &Cli, settings: Settings) -> Result<HistoryService, CliError> {
    let store = open_store(cli)?;
    let feed = Arc::new(TsetmcFeed::new(Arc::new(ReqwestHttpClient::new())));
    Ok(HistoryService::new(feed, store, settings))
}
