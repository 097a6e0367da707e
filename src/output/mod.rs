mod cli;
mod json;

pub use cli::{print_cli_table, render_table, render_usage_table};
pub use json::{print_json, to_json_string};

use crate::model::{GlobalUsage, ScanResult};
use anyhow::Result;

/// Output format for scan results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable table format
    Table,
    /// JSON format for programmatic use
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown format: {}. Use 'table' or 'json'", s)),
        }
    }
}

pub fn print_result(result: &ScanResult, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => print_cli_table(result),
        OutputFormat::Json => print_json(result),
    }
}

/// Format result to string for file output
pub fn format_result_to_string(result: &ScanResult, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => to_json_string(result),
        OutputFormat::Table => Ok(render_table(result, false)),
    }
}

/// Format a usage map from `prscan analyze`.
pub fn format_usage_to_string(usage: &GlobalUsage, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => to_json_string(usage),
        OutputFormat::Table => Ok(render_usage_table(usage)),
    }
}
