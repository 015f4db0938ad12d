//! Result rendering.

use serde_json::Value;

use crate::cli::OutputFormat;
use crate::error::CliError;

/// What a command produced: structured data plus a pre-formatted table
/// view of the same information.
pub struct CommandResult {
    pub data: Value,
    pub table: Vec<String>,
    pub warnings: Vec<String>,
}

impl CommandResult {
    pub fn new(data: Value, table: Vec<String>) -> Self {
        Self {
            data,
            table,
            warnings: Vec::new(),
        }
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings.extend(warnings);
        self
    }
}

pub fn render(result: &CommandResult, format: OutputFormat, pretty: bool) -> Result<(), CliError> {
    match format {
        OutputFormat::Json => {
            let rendered = if pretty {
                serde_json::to_string_pretty(&result.data)?
            } else {
                serde_json::to_string(&result.data)?
            };
            println!("{rendered}");
        }
        OutputFormat::Table => {
            for line in &result.table {
                println!("{line}");
            }
        }
    }
    for warning in &result.warnings {
        eprintln!("warning: {warning}");
    }
    Ok(())
}
