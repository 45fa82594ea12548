//! Command-line parsing for the hotel KPI extractor.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the extraction code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{FIRST_YEAR, LAST_YEAR};

/// Default document written by `kpi generate`.
pub const DEFAULT_OUTPUT: &str = "jhr_11year_kpi.yaml";
/// Default directory holding the yearly workbooks.
pub const DEFAULT_DATA_DIR: &str = "data";

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "kpi", version, about = "Hotel REIT monthly KPI extractor (occupancy, ADR, RevPAR, sales)")]
pub struct Cli {
    /// Debug-level logging (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Regenerate the KPI document from local workbooks.
    Generate(GenerateArgs),
    /// Download the yearly workbooks from the IR library.
    Download(DownloadArgs),
    /// Print a summary table and occupancy trend of a generated document.
    Report(ReportArgs),
    /// Dump the sheets of one workbook with the detector's view of each.
    Inspect(InspectArgs),
}

/// Where workbooks live and which years to process.
#[derive(Debug, Args, Clone)]
pub struct SourceArgs {
    /// Directory holding `jhr_<year>_hotel_performance.xlsx` files.
    #[arg(long, env = "KPI_DATA_DIR", default_value = DEFAULT_DATA_DIR)]
    pub data_dir: PathBuf,

    /// Restrict to these years (repeatable). Defaults to every published year.
    #[arg(long = "year", value_name = "YEAR", value_parser = clap::value_parser!(i32).range(FIRST_YEAR as i64..=LAST_YEAR as i64))]
    pub years: Vec<i32>,
}

#[derive(Debug, Args, Clone)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// YAML document to write.
    #[arg(short, long, env = "KPI_OUTPUT", default_value = DEFAULT_OUTPUT)]
    pub output: PathBuf,
}

#[derive(Debug, Args, Clone)]
pub struct DownloadArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Re-download files that already exist locally.
    #[arg(long)]
    pub force: bool,

    /// Regenerate the document after downloading.
    #[arg(long)]
    pub generate: bool,

    /// YAML document to write with `--generate`.
    #[arg(short, long, env = "KPI_OUTPUT", default_value = DEFAULT_OUTPUT)]
    pub output: PathBuf,
}

#[derive(Debug, Args, Clone)]
pub struct ReportArgs {
    /// Document produced by `kpi generate`.
    #[arg(short, long, env = "KPI_OUTPUT", default_value = DEFAULT_OUTPUT)]
    pub input: PathBuf,

    /// Skip the occupancy trend plot.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,
}

#[derive(Debug, Args, Clone)]
pub struct InspectArgs {
    /// Workbook to inspect.
    pub file: PathBuf,

    /// Rows to dump per sheet.
    #[arg(long, default_value_t = 15)]
    pub rows: usize,

    /// Year used for the detector report (defaults to the year in the file name).
    #[arg(long)]
    pub year: Option<i32>,
}
