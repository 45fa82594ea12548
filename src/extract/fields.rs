//! Per-month KPI extraction from a detected table.
//!
//! Columns come from the variant's fixed `Layout`; rows are anchored by the KPI
//! label cell and the year label cell. A row with an empty label continues the
//! KPI of the last labelled row.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::domain::{CellRef, HotelContribution, Kpi, MonthlyRecord};
use crate::error::Diagnostic;
use crate::extract::grid::Grid;
use crate::extract::normalize::{occupancy_pct, sales_mil_jpy, whole_millions, yen};
use crate::extract::variant::{
    kpi_from_label, DetectedTable, Layout, SalesUnit, HOTEL_BLOCK_MARKER, ROOM_COUNT_LABEL,
};

/// Year-row labels that compare years rather than report one.
const COMPARISON_MARKERS: [&str; 4] = ["比", "差", "増減", "%"];

/// Extracted values of one year, before aggregation.
#[derive(Debug, Clone, PartialEq)]
pub enum Extracted {
    /// Already portfolio-level (modern layout).
    Portfolio(BTreeMap<u32, MonthlyRecord>),
    /// One entry per reporting hotel per month.
    PerHotel {
        /// Hotels with at least one value in the target year.
        expected_hotels: usize,
        months: BTreeMap<u32, Vec<HotelContribution>>,
    },
}

impl Extracted {
    pub fn months(&self) -> Vec<u32> {
        match self {
            Extracted::Portfolio(m) => m.keys().copied().collect(),
            Extracted::PerHotel { months, .. } => months.keys().copied().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub values: Extracted,
    pub diagnostics: Vec<Diagnostic>,
}

/// Values gathered for one block (one hotel, or the whole portfolio table).
#[derive(Debug, Default)]
struct Block {
    name: String,
    rooms: Option<u32>,
    months: BTreeMap<u32, HotelContribution>,
}

impl Block {
    fn named(name: String) -> Self {
        Self {
            name,
            ..Self::default()
        }
    }

    fn slot(&mut self, month: u32) -> &mut HotelContribution {
        let name = &self.name;
        let rooms = self.rooms;
        self.months.entry(month).or_insert_with(|| HotelContribution {
            hotel: name.clone(),
            rooms,
            ..HotelContribution::default()
        })
    }
}

/// Whether a year-column label refers to `year`.
///
/// Accepts `2019年`, `2019`, `平成31年` and `令和元年` style labels and rejects
/// comparison rows such as `前年比`.
pub fn year_matches(label: &str, year: i32) -> bool {
    if COMPARISON_MARKERS.iter().any(|m| label.contains(m)) {
        return false;
    }
    year_labels(year).iter().any(|pattern| contains_standalone(label, pattern))
}

fn year_labels(year: i32) -> Vec<String> {
    let mut out = vec![format!("{year}年")];
    if (1989..=2019).contains(&year) {
        let n = year - 1988;
        out.push(if n == 1 { "平成元年".to_string() } else { format!("平成{n}年") });
    }
    if year >= 2019 {
        let n = year - 2018;
        out.push(if n == 1 { "令和元年".to_string() } else { format!("令和{n}年") });
    }
    out
}

/// `pattern` occurs in `label` and is not glued to a preceding digit.
fn contains_standalone(label: &str, pattern: &str) -> bool {
    label.match_indices(pattern).any(|(i, _)| {
        !label[..i]
            .chars()
            .next_back()
            .is_some_and(|c| c.is_ascii_digit())
    }) || label.trim() == pattern.trim_end_matches('年')
}

/// Extract every month's values for the detected table's year.
pub fn extract(table: &DetectedTable<'_>) -> Extraction {
    let layout = table.layout();
    let grid = &table.sheet.grid;
    let per_hotel = table.variant.is_per_hotel();

    let mut diagnostics = Vec::new();
    let mut blocks: Vec<Block> = Vec::new();
    if !per_hotel {
        blocks.push(Block::named(table.sheet.name.clone()));
    }

    let mut current_kpi: Option<Kpi> = None;
    let mut sales_unit = table.sales_unit;

    for row in 0..grid.row_count() {
        if let Some(label) = grid.label(row, layout.label_col) {
            if label.contains(HOTEL_BLOCK_MARKER) {
                current_kpi = None;
                if per_hotel {
                    blocks.push(Block::named(hotel_name(grid, row, layout, &label)));
                }
                continue;
            }
            if label.contains(ROOM_COUNT_LABEL) {
                current_kpi = None;
                if let Some(block) = blocks.last_mut() {
                    block.rooms = first_positive_number(grid, row, layout.label_col + 1);
                }
                continue;
            }
            current_kpi = kpi_from_label(&label);
            if current_kpi == Some(Kpi::Sales) {
                sales_unit = SalesUnit::from_label(&label).unwrap_or(table.sales_unit);
            }
        }

        let Some(kpi) = current_kpi else {
            continue;
        };
        let Some(year_label) = grid.label(row, layout.year_col) else {
            continue;
        };
        if !year_matches(&year_label, table.year) {
            continue;
        }
        let Some(block) = blocks.last_mut() else {
            debug!(row, "KPI row before the first hotel block; skipped");
            continue;
        };

        read_month_cells(grid, row, layout, kpi, sales_unit, table.year, block, &mut diagnostics);
    }

    let values = if per_hotel {
        per_hotel_months(blocks)
    } else {
        let block = blocks.pop().unwrap_or_default();
        Extracted::Portfolio(portfolio_months(block))
    };

    Extraction { values, diagnostics }
}

#[allow(clippy::too_many_arguments)]
fn read_month_cells(
    grid: &Grid,
    row: usize,
    layout: &Layout,
    kpi: Kpi,
    sales_unit: SalesUnit,
    year: i32,
    block: &mut Block,
    diagnostics: &mut Vec<Diagnostic>,
) {
    for month in 1..=12u32 {
        let cell = CellRef::new(row, layout.month_col(month));
        let raw = grid.resolve(cell);

        let stored = match kpi {
            Kpi::Occupancy => occupancy_pct(&raw).map(|v| {
                v.map(|v| set_once(&mut block.slot(month).occupancy_pct, v))
            }),
            Kpi::Adr => yen(&raw).map(|v| v.map(|v| set_once(&mut block.slot(month).adr_jpy, v))),
            Kpi::Revpar => yen(&raw).map(|v| v.map(|v| set_once(&mut block.slot(month).revpar_jpy, v))),
            Kpi::Sales => sales_mil_jpy(&raw, sales_unit)
                .map(|v| v.map(|v| set_once(&mut block.slot(month).sales_mil_jpy, v))),
        };

        match stored {
            Ok(Some(false)) => debug!(year, month, ?kpi, %cell, "duplicate row for KPI; keeping first"),
            Ok(_) => {}
            Err(error) => {
                let diagnostic = Diagnostic::InvalidNumeric { year, kpi, cell, error };
                warn!(%diagnostic, "cell dropped");
                diagnostics.push(diagnostic);
            }
        }
    }
}

/// Store `value` unless the slot is already filled. Returns whether it was stored.
fn set_once<T>(slot: &mut Option<T>, value: T) -> bool {
    if slot.is_some() {
        return false;
    }
    *slot = Some(value);
    true
}

fn hotel_name(grid: &Grid, row: usize, layout: &Layout, marker_label: &str) -> String {
    (layout.label_col + 1..grid.row(row).len())
        .find_map(|col| grid.label(row, col))
        .unwrap_or_else(|| marker_label.to_string())
}

fn first_positive_number(grid: &Grid, row: usize, from_col: usize) -> Option<u32> {
    (from_col..grid.row(row).len()).find_map(|col| match grid.resolve(CellRef::new(row, col)) {
        crate::extract::grid::CellValue::Number(v) if v > 0.0 => Some(v.round() as u32),
        _ => None,
    })
}

fn per_hotel_months(blocks: Vec<Block>) -> Extracted {
    let mut expected_hotels = 0;
    let mut months: BTreeMap<u32, Vec<HotelContribution>> = BTreeMap::new();

    for block in blocks {
        let reported: Vec<(u32, HotelContribution)> = block
            .months
            .into_iter()
            .filter(|(_, c)| c.has_any())
            .collect();
        if reported.is_empty() {
            continue;
        }
        expected_hotels += 1;
        for (month, contribution) in reported {
            months.entry(month).or_default().push(contribution);
        }
    }

    Extracted::PerHotel {
        expected_hotels,
        months,
    }
}

fn portfolio_months(block: Block) -> BTreeMap<u32, MonthlyRecord> {
    block
        .months
        .into_iter()
        .filter(|(_, c)| c.has_any())
        .map(|(month, c)| {
            let record = MonthlyRecord {
                month,
                occupancy_pct: c.occupancy_pct,
                adr_jpy: c.adr_jpy,
                revpar_jpy: c.revpar_jpy,
                sales_total_mil_jpy: c.sales_mil_jpy.map(whole_millions),
                ..MonthlyRecord::default()
            };
            (month, record)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::fixtures;
    use crate::extract::variant::detect;

    fn extracted(dataset: &crate::extract::grid::YearDataset) -> Extraction {
        let table = detect(dataset).unwrap();
        extract(&table)
    }

    #[test]
    fn year_label_forms() {
        assert!(year_matches("2024年", 2024));
        assert!(year_matches("2024", 2024));
        assert!(year_matches("平成28年", 2016));
        assert!(year_matches("平成31年", 2019));
        assert!(year_matches("令和元年", 2019));
        assert!(year_matches("令和3年", 2021));
        assert!(!year_matches("2023年", 2024));
        assert!(!year_matches("前年比", 2024));
        assert!(!year_matches("2024年前年比", 2024));
        assert!(!year_matches("12024年", 2024));
    }

    #[test]
    fn modern_yields_every_present_month_only() {
        let ex = extracted(&fixtures::modern_dataset());
        let Extracted::Portfolio(months) = &ex.values else {
            panic!("expected portfolio values");
        };
        assert_eq!(months.keys().copied().collect::<Vec<_>>(), (1..=12).collect::<Vec<_>>());

        let jan = &months[&1];
        assert_eq!(jan.occupancy_pct, Some(87.2));
        assert_eq!(jan.adr_jpy, Some(9168));
        assert_eq!(jan.revpar_jpy, Some(7990));
        assert_eq!(jan.sales_total_mil_jpy, Some(46));
        assert!(ex.diagnostics.is_empty());
    }

    #[test]
    fn modern_partial_year_has_no_invented_months() {
        let ex = extracted(&fixtures::modern_partial_dataset());
        assert_eq!(ex.values.months(), vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn covid_reads_hotel_blocks_and_continuation_rows() {
        let ex = extracted(&fixtures::covid_dataset());
        let Extracted::PerHotel { expected_hotels, months } = &ex.values else {
            panic!("expected per-hotel values");
        };
        assert_eq!(*expected_hotels, 3);
        assert_eq!(months.keys().copied().collect::<Vec<_>>(), vec![1, 2, 3]);

        let jan = &months[&1];
        assert_eq!(jan.len(), 3);
        // Hotel B's ADR label sits on the prior-year row; the 2021 row continues it.
        let hotel_b = jan.iter().find(|c| c.hotel == "ホテルB").unwrap();
        assert_eq!(hotel_b.adr_jpy, Some(8000));
        assert_eq!(hotel_b.rooms, Some(100));

        assert_eq!(months[&2].len(), 2);
    }

    #[test]
    fn transitional_resolves_references_and_ditto_marks() {
        let ex = extracted(&fixtures::transitional_dataset());
        let Extracted::PerHotel { months, .. } = &ex.values else {
            panic!("expected per-hotel values");
        };
        let march = &months[&3];
        let x = march.iter().find(|c| c.hotel == "ホテルX").unwrap();
        assert_eq!(x.adr_jpy, Some(14000));
        assert_eq!(x.revpar_jpy, Some(11900));
        let y = march.iter().find(|c| c.hotel == "ホテルY").unwrap();
        assert_eq!(y.occupancy_pct, Some(60.0));
    }

    #[test]
    fn legacy_scales_thousands_and_skips_prior_year_rows() {
        let ex = extracted(&fixtures::legacy_dataset());
        let Extracted::PerHotel { months, .. } = &ex.values else {
            panic!("expected per-hotel values");
        };
        assert_eq!(months.keys().copied().collect::<Vec<_>>(), vec![1, 2]);
        let l1 = months[&1].iter().find(|c| c.hotel == "ホテルL1").unwrap();
        assert_eq!(l1.occupancy_pct, Some(85.3));
        assert_eq!(l1.sales_mil_jpy, Some(250.0));
        let l2_feb = months[&2].iter().find(|c| c.hotel == "ホテルL2").unwrap();
        assert_eq!(l2_feb.sales_mil_jpy, None);
    }

    #[test]
    fn invalid_cells_become_diagnostics_not_values() {
        let ex = extracted(&fixtures::modern_with_bad_cell_dataset());
        let Extracted::Portfolio(months) = &ex.values else {
            panic!("expected portfolio values");
        };
        assert_eq!(months[&1].adr_jpy, None);
        assert_eq!(months[&1].occupancy_pct, Some(87.2));
        assert_eq!(ex.diagnostics.len(), 1);
        assert!(matches!(
            &ex.diagnostics[0],
            Diagnostic::InvalidNumeric { kpi: Kpi::Adr, cell, .. } if *cell == CellRef::new(4, 2)
        ));
    }
}
