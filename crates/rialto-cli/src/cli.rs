//! CLI argument definitions for Rialto.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `sync` | Refresh instrument tables and synchronize prices |
//! | `history` | Print adjusted daily series for symbols |
//! | `instruments` | List archived instruments |
//! | `chains` | Show reconciled symbol rename chains |
//!
//! # Examples
//!
//! ```bash
//! # Bring two symbols up to date
//! rialto sync فولاد فملی
//!
//! # Split-adjusted history as pretty JSON
//! rialto history فولاد --adjust 2 --format json --pretty
//!
//! # Every chain with more than one listing
//! rialto chains --merged-only
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Local daily-trading archive for exchange-listed instruments.
#[derive(Debug, Parser)]
#[command(name = "rialto", version, about = "Incremental daily trading archive")]
pub struct Cli {
    /// Output format for results.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Archive root directory.
    #[arg(long, global = true, default_value = ".rialto")]
    pub data_dir: PathBuf,

    /// Verbose logging (debug-level tracing to stderr).
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Refresh instrument tables and synchronize daily prices.
    Sync(SyncArgs),
    /// Print adjusted daily series for the given symbols.
    History(HistoryArgs),
    /// List instruments known to the archive.
    Instruments(InstrumentsArgs),
    /// Show reconciled symbol rename chains.
    Chains(ChainsArgs),
}

#[derive(Debug, Args)]
pub struct SyncArgs {
    /// Display symbols to synchronize.
    #[arg(required = true)]
    pub symbols: Vec<String>,

    /// Instrument codes per feed request.
    #[arg(long, default_value_t = 50)]
    pub chunk_size: usize,

    /// Retries per chunk before giving up on it.
    #[arg(long, default_value_t = 3)]
    pub retries: u32,

    /// Resolve each symbol to its whole rename chain.
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub merge: bool,
}

#[derive(Debug, Args)]
pub struct HistoryArgs {
    /// Display symbols to report.
    #[arg(required = true)]
    pub symbols: Vec<String>,

    /// Adjustment basis: 0 raw, 1 dividends+splits, 2 splits, 3 dividends.
    #[arg(long, default_value_t = 0)]
    pub adjust: u8,

    /// Oldest date to include (yyyymmdd).
    #[arg(long)]
    pub start_date: Option<String>,

    /// Keep zero-volume sessions in the output.
    #[arg(long, default_value_t = false)]
    pub days_without_trade: bool,

    /// Resolve each symbol to its whole rename chain.
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub merge: bool,
}

#[derive(Debug, Args)]
pub struct InstrumentsArgs {
    /// Only list instruments whose symbol contains this text.
    #[arg(long)]
    pub filter: Option<String>,
}

#[derive(Debug, Args)]
pub struct ChainsArgs {
    /// Only show chains with more than one listing.
    #[arg(long, default_value_t = false)]
    pub merged_only: bool,
}
