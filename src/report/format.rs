//! Formatted terminal output.
//!
//! Formatting lives in one place so the pipeline stays free of presentation
//! and output changes stay localized.

use std::path::Path;

use crate::app::pipeline::{DownloadRun, RunOutput};
use crate::data::DownloadOutcome;
use crate::error::Diagnostic;

use super::{SheetDump, YearRow};

/// Widest cell shown by `kpi inspect`.
const INSPECT_CELL_WIDTH: usize = 14;

/// Format the per-year summary table.
pub fn format_year_table(rows: &[YearRow]) -> String {
    let mut out = String::new();
    out.push_str(
        format!(
            "{:<6} {:<20} {:>6} {:>8} {:>8} {:>10} {:<8}\n",
            "year", "variant", "months", "occ%", "adr", "sales_mil", "partial"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(
        format!(
            "{:-<6} {:-<20} {:-<6} {:-<8} {:-<8} {:-<10} {:-<8}\n",
            "", "", "", "", "", "", ""
        )
        .trim_end(),
    );
    out.push('\n');

    for r in rows {
        let partial = match (r.partial_year, r.partial_months) {
            (false, 0) => String::new(),
            (true, 0) => "year".to_string(),
            (false, n) => format!("{n}m"),
            (true, n) => format!("year,{n}m"),
        };
        out.push_str(
            format!(
                "{:<6} {:<20} {:>6} {:>8} {:>8} {:>10} {:<8}\n",
                r.year,
                r.variant.tag(),
                r.months,
                fmt_opt_pct(r.occupancy_avg_pct),
                fmt_opt(r.adr_avg_jpy),
                fmt_opt(r.sales_total_annual_mil_jpy),
                partial,
            )
            .trim_end(),
        );
        out.push('\n');
    }

    out
}

/// Format the end-of-run status of `kpi generate`.
pub fn format_run_outcome(output: &RunOutput, path: Option<&Path>) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Years extracted: {} | failed: {} | diagnostics: {}\n",
        output.document.years.len(),
        output.failures.len(),
        output.diagnostics.len()
    ));
    if let Some(path) = path.filter(|_| !output.document.years.is_empty()) {
        out.push_str(&format!("Document: {}\n", path.display()));
    }
    for f in &output.failures {
        out.push_str(&format!("  FAILED {}: {}\n", f.year, f.error));
    }
    out
}

/// Format every diagnostic of a run, one per line (`kpi -v generate`).
pub fn format_diagnostics(diagnostics: &[Diagnostic]) -> String {
    let mut out = String::new();
    out.push_str(&format!("Diagnostics ({}):\n", diagnostics.len()));
    for d in diagnostics {
        out.push_str(&format!("  {d}\n"));
    }
    out
}

/// Format the per-year results of `kpi download`.
pub fn format_download_summary(run: &DownloadRun) -> String {
    let mut out = String::new();
    for (year, outcome) in &run.saved {
        match outcome {
            DownloadOutcome::Downloaded { path, bytes } => {
                out.push_str(&format!("{year}: downloaded {} ({bytes} bytes)\n", path.display()));
            }
            DownloadOutcome::Existing(path) => {
                out.push_str(&format!("{year}: kept existing {}\n", path.display()));
            }
        }
    }
    for f in &run.failures {
        match &f.reused_local {
            Some(path) => out.push_str(&format!(
                "{}: download failed ({}); using local {}\n",
                f.year,
                f.message,
                path.display()
            )),
            None => out.push_str(&format!("{}: download failed ({}); no local file\n", f.year, f.message)),
        }
    }
    out
}

/// Format the sheet dumps of `kpi inspect`.
pub fn format_inspect(source: &Path, dumps: &[SheetDump]) -> String {
    let mut out = String::new();
    out.push_str(&format!("=== {} ({} sheets) ===\n", source.display(), dumps.len()));

    for d in dumps {
        let s = &d.signature;
        out.push_str(&format!(
            "\n[{}] rows={} hotel_blocks={} kpi_rows={} era_labels={} layout={}\n",
            d.name,
            s.row_count,
            s.hotel_blocks,
            s.kpi_rows,
            s.era_year_labels,
            d.variant.map(|v| v.tag()).unwrap_or("-"),
        ));
        for (i, row) in d.rows.iter().enumerate() {
            let cells: Vec<String> = row.iter().map(|c| truncate(c, INSPECT_CELL_WIDTH)).collect();
            out.push_str(format!("{:>4} | {}\n", i + 1, cells.join(" | ")).trim_end());
            out.push('\n');
        }
    }

    out
}

fn fmt_opt(v: Option<u64>) -> String {
    v.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

fn fmt_opt_pct(v: Option<f64>) -> String {
    v.map(|v| format!("{v:.1}")).unwrap_or_else(|| "-".to_string())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::pipeline::YearFailure;
    use crate::data::DownloadFailure;
    use crate::domain::{KpiDocument, Variant};
    use crate::error::ExtractError;

    fn row(year: i32, partial_year: bool, partial_months: usize) -> YearRow {
        YearRow {
            year,
            variant: Variant::ModernAggregated,
            months: 12,
            occupancy_avg_pct: Some(84.4),
            adr_avg_jpy: Some(15123),
            sales_total_annual_mil_jpy: None,
            partial_year,
            partial_months,
        }
    }

    #[test]
    fn year_table_layout() {
        let txt = format_year_table(&[row(2024, false, 0), row(2025, true, 2)]);
        let lines: Vec<&str> = txt.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("year   variant"));
        assert!(lines[1].starts_with("------ ---"));
        assert_eq!(
            lines[2],
            "2024   modern_aggregated        12     84.4    15123          -"
        );
        assert!(lines[3].ends_with("year,2m"));
    }

    #[test]
    fn run_outcome_lists_failed_years() {
        let output = RunOutput {
            document: KpiDocument::default(),
            failures: vec![YearFailure {
                year: 2018,
                error: ExtractError::UnrecognizedFormat {
                    sheets: vec!["注意".into()],
                },
            }],
            diagnostics: Vec::new(),
        };
        let txt = format_run_outcome(&output, Some(Path::new("kpi.yaml")));
        assert!(txt.starts_with("Years extracted: 0 | failed: 1 | diagnostics: 0\n"));
        assert!(!txt.contains("Document:"));
        assert!(txt.contains("FAILED 2018: unrecognized workbook format (sheets: 注意)"));
    }

    #[test]
    fn diagnostics_are_listed_one_per_line() {
        let txt = format_diagnostics(&[Diagnostic::PartialReporting {
            year: 2021,
            month: 2,
            reporting: 2,
            expected: 3,
        }]);
        assert_eq!(txt, "Diagnostics (1):\n  2021-02: partial reporting (2/3 hotels)\n");
    }

    #[test]
    fn download_summary_mentions_reuse() {
        let run = DownloadRun {
            saved: vec![(2024, DownloadOutcome::Existing("data/jhr_2024_hotel_performance.xlsx".into()))],
            failures: vec![DownloadFailure {
                year: 2017,
                message: "timeout".into(),
                reused_local: Some("data/jhr_2017_hotel_performance.xls".into()),
            }],
        };
        let txt = format_download_summary(&run);
        assert!(txt.contains("2024: kept existing data/jhr_2024_hotel_performance.xlsx"));
        assert!(txt.contains("2017: download failed (timeout); using local data/jhr_2017_hotel_performance.xls"));
    }

    #[test]
    fn truncate_marks_cut_text() {
        assert_eq!(truncate("客室稼働率", 14), "客室稼働率");
        assert_eq!(truncate("abcdefghij", 5), "abcd.");
    }
}
