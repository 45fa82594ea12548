//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments (after loading `.env`)
//! - sets up logging
//! - runs extraction or downloads through `pipeline`
//! - prints reports/plots and maps failed years onto the exit status

use std::path::{Path, PathBuf};

use clap::Parser;
use regex::Regex;
use tracing_subscriber::{fmt, EnvFilter};

use crate::cli::{Command, DownloadArgs, GenerateArgs, InspectArgs, ReportArgs, SourceArgs};
use crate::domain::{RunConfig, LAST_YEAR};
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `kpi` binary.
pub fn run() -> Result<(), AppError> {
    // A missing .env is fine; variables may come from the environment.
    dotenvy::dotenv().ok();

    // We want `kpi` and `kpi --data-dir X` to behave like `kpi generate ...`.
    //
    // Clap requires a subcommand name, so we do a small, explicit rewrite of the
    // argv list before parsing.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);
    init_tracing(cli.verbose);

    match cli.command {
        Command::Generate(args) => handle_generate(args, cli.verbose),
        Command::Download(args) => handle_download(args, cli.verbose),
        Command::Report(args) => handle_report(args),
        Command::Inspect(args) => handle_inspect(args),
    }
}

/// Logs go to stderr so stdout carries only reports.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // Keep a subscriber installed earlier in the process.
    let _ = fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .try_init();
}

fn handle_generate(args: GenerateArgs, verbose: bool) -> Result<(), AppError> {
    let config = run_config_from_args(&args.source, Some(args.output.clone()), verbose);
    generate(&config)
}

fn generate(config: &RunConfig) -> Result<(), AppError> {
    if let Some(path) = &config.output {
        pipeline::check_output_path(path)?;
    }
    let output = pipeline::run_generate(config)?;

    println!("{}", crate::report::format_year_table(&crate::report::year_rows(&output.document)));
    println!("{}", crate::report::format_run_outcome(&output, config.output.as_deref()));
    if config.verbose && !output.diagnostics.is_empty() {
        println!("{}", crate::report::format_diagnostics(&output.diagnostics));
    }

    if output.is_complete() {
        Ok(())
    } else {
        Err(failed_years_error(&output.failed_years()))
    }
}

fn handle_download(args: DownloadArgs, verbose: bool) -> Result<(), AppError> {
    let output = args.generate.then(|| args.output.clone());
    let config = run_config_from_args(&args.source, output, verbose);
    if !config.data_dir.exists() {
        std::fs::create_dir_all(&config.data_dir).map_err(|e| {
            AppError::new(
                2,
                format!("Failed to create data directory '{}': {e}", config.data_dir.display()),
            )
        })?;
    }

    let run = pipeline::run_download(&config, args.force)?;
    println!("{}", crate::report::format_download_summary(&run));

    let unrecoverable = run.unrecoverable();
    if args.generate {
        // Regenerate even after partial download failures; reused files still count.
        generate(&config)?;
    }
    if unrecoverable.is_empty() {
        Ok(())
    } else {
        Err(failed_years_error(&unrecoverable))
    }
}

fn handle_report(args: ReportArgs) -> Result<(), AppError> {
    let document = crate::io::read_document(&args.input)?;

    println!("{}", crate::report::format_year_table(&crate::report::year_rows(&document)));
    if !args.no_plot {
        println!("{}", crate::plot::render_occupancy_plot(&document, args.width, args.height));
    }
    Ok(())
}

fn handle_inspect(args: InspectArgs) -> Result<(), AppError> {
    let year = args
        .year
        .or_else(|| year_from_file_name(&args.file))
        .unwrap_or(LAST_YEAR);
    let dataset =
        crate::io::read_workbook(&args.file, year).map_err(|e| AppError::new(2, e.to_string()))?;

    let dumps = crate::report::dump_sheets(&dataset, args.rows);
    println!("{}", crate::report::format_inspect(&dataset.source, &dumps));

    match crate::extract::detect(&dataset) {
        Ok(table) => println!(
            "Detected {} on sheet '{}' (sales unit {:?}) for {year}",
            table.variant, table.sheet.name, table.sales_unit
        ),
        Err(err) => println!("No layout detected for {year}: {err}"),
    }
    Ok(())
}

pub fn run_config_from_args(source: &SourceArgs, output: Option<PathBuf>, verbose: bool) -> RunConfig {
    let mut years = if source.years.is_empty() {
        RunConfig::default_years()
    } else {
        source.years.clone()
    };
    years.sort_unstable();
    years.dedup();

    RunConfig {
        data_dir: source.data_dir.clone(),
        output,
        years,
        verbose,
    }
}

fn failed_years_error(years: &[i32]) -> AppError {
    let list: Vec<String> = years.iter().map(i32::to_string).collect();
    AppError::new(3, format!("Failed years: {}", list.join(", ")))
}

/// Four-digit year embedded in a workbook file name (`jhr_2019_hotel_performance.xlsx`).
fn year_from_file_name(path: &Path) -> Option<i32> {
    let stem = path.file_stem()?.to_str()?;
    let re = Regex::new(r"(?:^|[^0-9])(20[0-9]{2})(?:[^0-9]|$)").ok()?;
    re.captures(stem)?.get(1)?.as_str().parse().ok()
}

/// Rewrite argv so `kpi` defaults to `kpi generate`.
///
/// Rules:
/// - `kpi`                      -> `kpi generate`
/// - `kpi --data-dir X ...`     -> `kpi generate --data-dir X ...`
/// - `kpi --help/--version/-h`  -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("generate".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "generate" | "download" | "report" | "inspect");
    if is_subcommand {
        return argv;
    }

    // If the first token is a flag, treat it as "generate flags".
    if arg1.starts_with('-') {
        argv.insert(1, "generate".to_string());
        return argv;
    }

    // Otherwise, leave as-is.
    argv
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bare_invocation_means_generate() {
        assert_eq!(rewrite_args(argv(&["kpi"])), argv(&["kpi", "generate"]));
        assert_eq!(
            rewrite_args(argv(&["kpi", "--data-dir", "d", "-v"])),
            argv(&["kpi", "generate", "--data-dir", "d", "-v"])
        );
    }

    #[test]
    fn subcommands_and_help_are_untouched() {
        for args in [
            &["kpi", "--help"][..],
            &["kpi", "-V"][..],
            &["kpi", "download", "--force"][..],
            &["kpi", "inspect", "x.xlsx"][..],
        ] {
            assert_eq!(rewrite_args(argv(args)), argv(args));
        }
    }

    #[test]
    fn rewritten_args_parse() {
        let cli = crate::cli::Cli::try_parse_from(rewrite_args(argv(&["kpi", "--year", "2019"]))).unwrap();
        let Command::Generate(args) = cli.command else {
            panic!("expected generate");
        };
        let config = run_config_from_args(&args.source, Some(args.output.clone()), cli.verbose);
        assert_eq!(config.years, vec![2019]);
        assert_eq!(config.output, Some(PathBuf::from(crate::cli::DEFAULT_OUTPUT)));
    }

    #[test]
    fn config_defaults_to_every_year_sorted_and_deduplicated() {
        let source = SourceArgs {
            data_dir: PathBuf::from("data"),
            years: Vec::new(),
        };
        let config = run_config_from_args(&source, None, false);
        assert_eq!(config.years.first(), Some(&2015));
        assert_eq!(config.years.last(), Some(&2025));
        assert_eq!(config.years.len(), 11);

        let source = SourceArgs {
            years: vec![2024, 2019, 2024],
            ..source
        };
        assert_eq!(run_config_from_args(&source, None, false).years, vec![2019, 2024]);
    }

    #[test]
    fn inspect_year_comes_from_the_file_name() {
        assert_eq!(
            year_from_file_name(Path::new("data/jhr_2019_hotel_performance.xlsx")),
            Some(2019)
        );
        assert_eq!(year_from_file_name(Path::new("book.xlsx")), None);
    }
}
