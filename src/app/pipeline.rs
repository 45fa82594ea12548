//! Shared pipeline logic used by the `generate` and `download` commands.
//!
//! Per year: read workbook -> detect layout -> extract -> aggregate -> assemble.
//! A failing year is recorded and the loop moves on; the caller decides the
//! exit status from the collected failures.

use std::path::Path;
use std::thread;
use std::time::Duration;

use tracing::{error, info, instrument, warn};

use crate::assemble::{build_year, Assembler};
use crate::data::{discover_workbook_urls, DownloadFailure, DownloadOutcome, LibraryClient};
use crate::domain::{KpiDocument, RunConfig, YearRecord};
use crate::error::{AppError, Diagnostic, ExtractError};
use crate::extract::{detect, extract, YearDataset};
use crate::io::source_path;

/// Pause between consecutive downloads.
pub const DOWNLOAD_PAUSE: Duration = Duration::from_secs(2);

/// One successfully processed year.
#[derive(Debug, Clone)]
pub struct YearOutcome {
    pub record: YearRecord,
    pub diagnostics: Vec<Diagnostic>,
}

/// A year that could not be extracted.
#[derive(Debug, Clone)]
pub struct YearFailure {
    pub year: i32,
    pub error: ExtractError,
}

/// All computed outputs of a single `kpi generate` run.
#[derive(Debug, Clone, Default)]
pub struct RunOutput {
    pub document: KpiDocument,
    pub failures: Vec<YearFailure>,
    pub diagnostics: Vec<Diagnostic>,
}

impl RunOutput {
    pub fn failed_years(&self) -> Vec<i32> {
        self.failures.iter().map(|f| f.year).collect()
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Detect, extract and assemble one year's workbook.
pub fn process_year(dataset: &YearDataset) -> Result<YearOutcome, ExtractError> {
    let table = detect(dataset)?;
    let extraction = extract(&table);
    let (record, diagnostics) = build_year(&table, extraction);
    Ok(YearOutcome { record, diagnostics })
}

/// Fold loaded (or failed-to-load) years into one run output.
pub fn assemble_years(
    loaded: impl IntoIterator<Item = (i32, Result<YearDataset, ExtractError>)>,
) -> RunOutput {
    let mut assembler = Assembler::new();
    let mut failures = Vec::new();
    let mut diagnostics = Vec::new();

    for (year, dataset) in loaded {
        info!(year, "processing year");
        match dataset.and_then(|d| process_year(&d)) {
            Ok(outcome) => {
                for d in &outcome.diagnostics {
                    warn!(diagnostic = %d, "diagnostic");
                }
                diagnostics.extend(outcome.diagnostics);
                assembler.push(outcome.record);
            }
            Err(err) => {
                error!(year, error = %err, "year skipped");
                failures.push(YearFailure { year, error: err });
            }
        }
    }

    RunOutput {
        document: assembler.finish(),
        failures,
        diagnostics,
    }
}

/// Regenerate the document from the workbooks in `config.data_dir`.
///
/// The document is written only when at least one year was extracted, so a
/// run against an empty directory never clobbers a previous document.
pub fn run_generate(config: &RunConfig) -> Result<RunOutput, AppError> {
    if !config.data_dir.is_dir() {
        return Err(AppError::new(
            2,
            format!("Data directory '{}' does not exist.", config.data_dir.display()),
        ));
    }

    let output = assemble_years(
        config
            .years
            .iter()
            .map(|&year| (year, crate::io::load_year(&config.data_dir, year))),
    );

    match &config.output {
        Some(path) if !output.document.years.is_empty() => {
            crate::io::write_document(path, &output.document)?;
            info!(path = %path.display(), years = output.document.years.len(), "document written");
        }
        Some(path) => warn!(path = %path.display(), "no year extracted; document not written"),
        None => {}
    }

    Ok(output)
}

/// Per-year results of a download run.
#[derive(Debug, Clone, Default)]
pub struct DownloadRun {
    pub saved: Vec<(i32, DownloadOutcome)>,
    pub failures: Vec<DownloadFailure>,
}

impl DownloadRun {
    /// Years left without any usable local workbook.
    pub fn unrecoverable(&self) -> Vec<i32> {
        self.failures
            .iter()
            .filter(|f| f.reused_local.is_none())
            .map(|f| f.year)
            .collect()
    }
}

/// Fetch the IR library page and download every configured year.
///
/// An unreachable library page fails every year's download but not the run:
/// local workbooks stay usable and `unrecoverable` names the years without one.
pub fn run_download(config: &RunConfig, force: bool) -> Result<DownloadRun, AppError> {
    let client = LibraryClient::from_env()?;
    Ok(download_all(&client, config, force, DOWNLOAD_PAUSE))
}

fn download_all(client: &LibraryClient, config: &RunConfig, force: bool, pause: Duration) -> DownloadRun {
    match client.fetch_library_page() {
        Ok(html) => download_years(client, &html, config, force, pause),
        Err(err) => {
            error!(error = %err, "library page unavailable; keeping local workbooks");
            library_unavailable(config, &err.to_string())
        }
    }
}

/// One failure per year, each pointing at the local file that remains, if any.
fn library_unavailable(config: &RunConfig, message: &str) -> DownloadRun {
    let failures = config
        .years
        .iter()
        .map(|&year| DownloadFailure {
            year,
            message: message.to_string(),
            reused_local: source_path(&config.data_dir, year),
        })
        .collect();
    DownloadRun {
        saved: Vec::new(),
        failures,
    }
}

#[instrument(level = "info", skip(client, html, config), fields(years = config.years.len()))]
fn download_years(
    client: &LibraryClient,
    html: &str,
    config: &RunConfig,
    force: bool,
    pause: Duration,
) -> DownloadRun {
    let urls = discover_workbook_urls(html, client.library_url(), &config.years);
    let mut run = DownloadRun::default();

    for &year in &config.years {
        let Some(url) = urls.get(&year) else {
            let failure = DownloadFailure {
                year,
                message: "no workbook link on the library page".to_string(),
                reused_local: source_path(&config.data_dir, year),
            };
            error!(%failure, "download skipped");
            run.failures.push(failure);
            continue;
        };

        match client.download_year(year, url, &config.data_dir, force) {
            Ok(outcome) => {
                let fetched = matches!(outcome, DownloadOutcome::Downloaded { .. });
                run.saved.push((year, outcome));
                if fetched {
                    thread::sleep(pause);
                }
            }
            Err(failure) => {
                error!(%failure, "download failed");
                run.failures.push(failure);
            }
        }
    }

    run
}

/// Whether `path` looks like a writable document location.
pub fn check_output_path(path: &Path) -> Result<(), AppError> {
    if path.is_dir() {
        return Err(AppError::new(
            2,
            format!("Output path '{}' is a directory.", path.display()),
        ));
    }
    Ok(())
}
