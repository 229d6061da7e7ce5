use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::data::TimeBase;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Infer protobuf schemas from spreadsheet headers and export rows as protobuf data",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Generate the .proto, compile it, and write the sheet's rows as .data and .txt
    Export(ExportArgs),
    /// Print the schema inferred from a sheet's header rows without writing files
    Inspect(InspectArgs),
}

#[derive(Debug, Args)]
pub struct ExportArgs {
    /// Sheet to export; repeat to export several sheets from the same workbook
    #[arg(short = 's', long = "sheet", required = true, action = clap::ArgAction::Append)]
    pub sheets: Vec<String>,
    /// Workbook (.xlsx, .xls, .ods) or delimited text file (.csv, .tsv)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// YAML export configuration
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,
    /// Root directory for the relative output directories of the configuration
    #[arg(short = 'o', long = "out-dir")]
    pub out_dir: Option<PathBuf>,
    /// Override the proto package name
    #[arg(long)]
    pub package: Option<String>,
    /// Time zone used to convert DateTime cells (local or utc)
    #[arg(long, value_parser = parse_timezone)]
    pub timezone: Option<TimeBase>,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of a delimited input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct InspectArgs {
    /// Sheet whose header rows are inspected
    #[arg(short = 's', long = "sheet")]
    pub sheet: String,
    /// Workbook (.xlsx, .xls, .ods) or delimited text file (.csv, .tsv)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// YAML export configuration (for common types and previous bindings)
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,
    /// Root directory for the relative output directories of the configuration
    #[arg(short = 'o', long = "out-dir")]
    pub out_dir: Option<PathBuf>,
    /// Print the generated proto text instead of the field table
    #[arg(long, conflicts_with = "json")]
    pub proto: bool,
    /// Print the field table as JSON
    #[arg(long)]
    pub json: bool,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of a delimited input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}

pub fn parse_timezone(value: &str) -> Result<TimeBase, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "local" => Ok(TimeBase::Local),
        "utc" => Ok(TimeBase::Utc),
        other => Err(format!("Unknown time zone '{other}' (expected local or utc)")),
    }
}
