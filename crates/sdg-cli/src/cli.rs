//! CLI argument definitions for the SDG data client.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "sdg",
    version,
    about = "SDG data client - fetch indicator data from the UNICEF warehouse",
    long_about = "Fetch SDG indicator observations from the UNICEF SDMX warehouse.\n\n\
                  Resolves each indicator to the dataflow that carries it (with\n\
                  fallbacks), pages through large responses, and normalizes the\n\
                  result into a tabular shape."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for debug, -vv for trace, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Metadata directory (default: SDG_METADATA_DIR or the bundled copy).
    #[arg(long = "metadata-dir", value_name = "DIR", global = true)]
    pub metadata_dir: Option<PathBuf>,

    /// Client configuration file (TOML).
    #[arg(long = "config", value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Fetch observations for one or more indicators.
    Fetch(FetchArgs),

    /// List the cached indicator catalog.
    Indicators,

    /// Search the catalog by code or name.
    Search(SearchArgs),

    /// Refresh metadata from the structure API and write a vintage.
    Sync,

    /// Report metadata health (sources, staleness, vintages).
    Doctor(DoctorArgs),
}

#[derive(Parser)]
pub struct FetchArgs {
    /// Indicator code(s), e.g. CME_MRY0T4.
    #[arg(value_name = "INDICATOR", required = true)]
    pub indicators: Vec<String>,

    /// Query this dataflow first instead of resolving one.
    #[arg(long = "dataflow", value_name = "DATAFLOW")]
    pub dataflow: Option<String>,

    /// Restrict to ISO3 country codes (repeatable).
    #[arg(long = "country", value_name = "ISO3")]
    pub countries: Vec<String>,

    /// First year to include (4-digit).
    #[arg(long = "start-year", value_name = "YYYY")]
    pub start_year: Option<i32>,

    /// Last year to include (4-digit).
    #[arg(long = "end-year", value_name = "YYYY")]
    pub end_year: Option<i32>,

    /// Disaggregation filter DIMENSION=CODE, or DIMENSION=ALL to drop the
    /// totals default (repeatable).
    #[arg(long = "dim", value_name = "DIMENSION=CODE")]
    pub dimensions: Vec<String>,

    /// Output shape.
    #[arg(long = "shape", value_enum, default_value = "long")]
    pub shape: ShapeArg,

    /// Write CSV to this path instead of printing a table.
    #[arg(long = "output", value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Print rows as JSON instead of a table.
    #[arg(long = "json")]
    pub json: bool,
}

#[derive(Parser)]
pub struct SearchArgs {
    /// Term matched against indicator codes and names.
    #[arg(value_name = "TERM")]
    pub term: String,
}

#[derive(Parser)]
pub struct DoctorArgs {
    /// Print the report as JSON.
    #[arg(long = "json")]
    pub json: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ShapeArg {
    /// One row per observation.
    Long,
    /// Years as columns.
    Wide,
    /// Indicator codes as columns.
    WideByIndicator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
