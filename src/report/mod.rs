//! Reporting utilities: per-year summary rows and workbook sheet dumps.

use crate::domain::{KpiDocument, Variant};
use crate::extract::grid::format_number;
use crate::extract::{Cell, Signature, YearDataset};

mod format;

pub use format::*;

/// One line of the year summary table.
#[derive(Debug, Clone, PartialEq)]
pub struct YearRow {
    pub year: i32,
    pub variant: Variant,
    pub months: usize,
    pub occupancy_avg_pct: Option<f64>,
    pub adr_avg_jpy: Option<u64>,
    pub sales_total_annual_mil_jpy: Option<u64>,
    pub partial_year: bool,
    /// Months aggregated over a subset of hotels.
    pub partial_months: usize,
}

/// Summary rows in year order.
pub fn year_rows(document: &KpiDocument) -> Vec<YearRow> {
    document
        .years
        .values()
        .map(|r| YearRow {
            year: r.year,
            variant: r.variant,
            months: r.months.len(),
            occupancy_avg_pct: r.summary.occupancy_avg_pct,
            adr_avg_jpy: r.summary.adr_avg_jpy,
            sales_total_annual_mil_jpy: r.summary.sales_total_annual_mil_jpy,
            partial_year: r.partial,
            partial_months: r.partial_months().len(),
        })
        .collect()
}

/// What `kpi inspect` shows for one sheet.
#[derive(Debug, Clone)]
pub struct SheetDump {
    pub name: String,
    pub signature: Signature,
    pub variant: Option<Variant>,
    /// Leading rows as display text, trailing empty cells removed.
    pub rows: Vec<Vec<String>>,
}

/// Dump the first `max_rows` rows of every sheet with its detector signature.
pub fn dump_sheets(dataset: &YearDataset, max_rows: usize) -> Vec<SheetDump> {
    dataset
        .sheets
        .iter()
        .map(|sheet| {
            let signature = Signature::of(sheet);
            let rows = (0..sheet.grid.row_count().min(max_rows))
                .map(|r| {
                    let mut cells: Vec<String> = sheet.grid.row(r).iter().map(cell_text).collect();
                    while cells.last().is_some_and(|c| c.is_empty()) {
                        cells.pop();
                    }
                    cells
                })
                .collect();
            SheetDump {
                name: sheet.name.clone(),
                variant: signature.classify(),
                signature,
                rows,
            }
        })
        .collect()
}

fn cell_text(cell: &Cell) -> String {
    match cell {
        Cell::Empty => String::new(),
        Cell::Number(v) => format_number(*v),
        Cell::Text(s) => s.trim().to_string(),
        Cell::Formula(f) => f.clone(),
    }
}
