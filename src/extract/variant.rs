//! Workbook layout detection.
//!
//! Each `Variant` owns a fixed `Layout` (coordinate table, unit scale, weighting
//! policy). Detection never looks at the year number: it computes a structural
//! `Signature` per sheet and classifies it.

use std::ops::RangeInclusive;

use tracing::{debug, info};

use crate::domain::{Kpi, Variant};
use crate::error::ExtractError;
use crate::extract::grid::{Sheet, YearDataset};

/// Label cell that opens a per-hotel block.
pub const HOTEL_BLOCK_MARKER: &str = "物件番号";
/// Label of the room-count row inside a hotel block.
pub const ROOM_COUNT_LABEL: &str = "客室数";
/// Sheet-name marker of the variable-rent portfolio tables.
pub const PORTFOLIO_SHEET_MARKER: &str = "変動賃料等導入";
/// Sheet-name marker of the HMJ group hotel tables.
pub const GROUP_SHEET_MARKER: &str = "HMJ";
/// Sheets carrying usage notes instead of data.
const NOTES_SHEET_MARKER: &str = "注意";

const STRICT_OCCUPANCY_LABEL: &str = "客室稼働率";
const LOOSE_OCCUPANCY_LABEL: &str = "稼働率";
const SALES_LABEL: &str = "売上";
/// Sales sub-lines that must not be mistaken for the total.
const SALES_BREAKDOWN_MARKERS: [&str; 5] = ["宿泊", "料飲", "その他", "客室", "内訳"];

/// Unit of the sales figures in a sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SalesUnit {
    Yen,
    Thousands,
    Millions,
}

impl SalesUnit {
    /// Raw values per million yen.
    pub fn per_million(self) -> f64 {
        match self {
            SalesUnit::Yen => 1_000_000.0,
            SalesUnit::Thousands => 1_000.0,
            SalesUnit::Millions => 1.0,
        }
    }

    /// Unit named in a row label such as `売上高(百万円)`.
    pub fn from_label(label: &str) -> Option<Self> {
        if label.contains("百万") {
            Some(SalesUnit::Millions)
        } else if label.contains("千円") {
            Some(SalesUnit::Thousands)
        } else if label.contains('円') {
            Some(SalesUnit::Yen)
        } else {
            None
        }
    }
}

/// How per-hotel occupancy and ADR are combined into a portfolio figure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Weighting {
    /// Weight by room count (occupancy) and sold room-nights (ADR).
    RoomCount,
    /// Plain mean across reporting hotels.
    Unweighted,
}

/// Fixed coordinate table and conventions of one layout.
#[derive(Debug, Clone)]
pub struct Layout {
    /// Column holding KPI labels and hotel-block markers.
    pub label_col: usize,
    /// Column holding the year label of each data row.
    pub year_col: usize,
    /// Column of January; month `m` lives at `first_month_col + m - 1`.
    pub first_month_col: usize,
    /// Smallest sheet that can hold one complete table of this layout.
    pub min_rows: usize,
    pub default_sales_unit: SalesUnit,
    pub weighting: Weighting,
    /// Years this layout was published for; informational.
    pub nominal_years: RangeInclusive<i32>,
}

impl Layout {
    pub fn month_col(&self, month: u32) -> usize {
        self.first_month_col + month as usize - 1
    }
}

static LEGACY_INDIVIDUAL: Layout = Layout {
    label_col: 0,
    year_col: 1,
    first_month_col: 2,
    min_rows: 5,
    default_sales_unit: SalesUnit::Thousands,
    weighting: Weighting::Unweighted,
    nominal_years: 2015..=2018,
};

static TRANSITIONAL_2019: Layout = Layout {
    label_col: 0,
    year_col: 1,
    first_month_col: 2,
    min_rows: 5,
    default_sales_unit: SalesUnit::Millions,
    weighting: Weighting::RoomCount,
    nominal_years: 2019..=2019,
};

static COVID_INDIVIDUAL: Layout = Layout {
    label_col: 0,
    year_col: 1,
    first_month_col: 2,
    min_rows: 5,
    default_sales_unit: SalesUnit::Millions,
    weighting: Weighting::RoomCount,
    nominal_years: 2020..=2023,
};

static MODERN_AGGREGATED: Layout = Layout {
    label_col: 0,
    year_col: 1,
    first_month_col: 2,
    min_rows: 4,
    default_sales_unit: SalesUnit::Millions,
    weighting: Weighting::Unweighted,
    nominal_years: 2024..=2025,
};

impl Variant {
    pub fn layout(self) -> &'static Layout {
        match self {
            Variant::LegacyIndividual => &LEGACY_INDIVIDUAL,
            Variant::Transitional2019 => &TRANSITIONAL_2019,
            Variant::CovidIndividual => &COVID_INDIVIDUAL,
            Variant::ModernAggregated => &MODERN_AGGREGATED,
        }
    }
}

/// Map a row label onto the KPI it introduces.
pub fn kpi_from_label(label: &str) -> Option<Kpi> {
    if label.contains(LOOSE_OCCUPANCY_LABEL) {
        return Some(Kpi::Occupancy);
    }
    let upper = label.to_ascii_uppercase();
    if upper.contains("REVPAR") {
        return Some(Kpi::Revpar);
    }
    if upper.contains("ADR") {
        return Some(Kpi::Adr);
    }
    if label.contains(SALES_LABEL) && !SALES_BREAKDOWN_MARKERS.iter().any(|m| label.contains(m)) {
        return Some(Kpi::Sales);
    }
    None
}

/// Structural features of one sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
    pub sheet: String,
    pub row_count: usize,
    pub hotel_blocks: usize,
    pub kpi_rows: usize,
    pub strict_occupancy_label: bool,
    pub loose_occupancy_label: bool,
    pub era_year_labels: bool,
    pub portfolio_sheet: bool,
    /// Unit named by the first sales label, if any.
    pub sales_unit: Option<SalesUnit>,
}

impl Signature {
    /// All layouts share the label/year columns, so one scan serves every rule.
    pub fn of(sheet: &Sheet) -> Self {
        let grid = &sheet.grid;
        let label_col = MODERN_AGGREGATED.label_col;
        let year_col = MODERN_AGGREGATED.year_col;

        let mut sig = Signature {
            sheet: sheet.name.clone(),
            row_count: grid.row_count(),
            hotel_blocks: 0,
            kpi_rows: 0,
            strict_occupancy_label: false,
            loose_occupancy_label: false,
            era_year_labels: false,
            portfolio_sheet: sheet.name.contains(PORTFOLIO_SHEET_MARKER),
            sales_unit: None,
        };

        for row in 0..grid.row_count() {
            if let Some(year_label) = grid.label(row, year_col) {
                if year_label.contains("平成") {
                    sig.era_year_labels = true;
                }
            }

            let Some(label) = grid.label(row, label_col) else {
                continue;
            };
            if label.contains(HOTEL_BLOCK_MARKER) {
                sig.hotel_blocks += 1;
                continue;
            }
            let Some(kpi) = kpi_from_label(&label) else {
                continue;
            };
            sig.kpi_rows += 1;
            match kpi {
                Kpi::Occupancy if label.contains(STRICT_OCCUPANCY_LABEL) => sig.strict_occupancy_label = true,
                Kpi::Occupancy => sig.loose_occupancy_label = true,
                Kpi::Sales if sig.sales_unit.is_none() => sig.sales_unit = SalesUnit::from_label(&label),
                _ => {}
            }
        }

        sig
    }

    /// Apply the detection rules; first match wins.
    pub fn classify(&self) -> Option<Variant> {
        if self.kpi_rows == 0 {
            return None;
        }

        let candidate = if self.hotel_blocks == 0 {
            if self.strict_occupancy_label {
                Variant::ModernAggregated
            } else {
                return None;
            }
        } else if self.portfolio_sheet {
            Variant::Transitional2019
        } else if self.era_year_labels || (self.loose_occupancy_label && !self.strict_occupancy_label) {
            Variant::LegacyIndividual
        } else {
            Variant::CovidIndividual
        };

        if self.row_count < candidate.layout().min_rows {
            return None;
        }
        Some(candidate)
    }
}

/// The sheet chosen for a year, with its variant and effective sales unit.
#[derive(Debug, Clone)]
pub struct DetectedTable<'a> {
    pub year: i32,
    pub variant: Variant,
    pub sheet: &'a Sheet,
    pub signature: Signature,
    pub sales_unit: SalesUnit,
}

impl DetectedTable<'_> {
    pub fn layout(&self) -> &'static Layout {
        self.variant.layout()
    }
}

/// Detect which layout a year's workbook uses and pick its data sheet.
pub fn detect(dataset: &YearDataset) -> Result<DetectedTable<'_>, ExtractError> {
    for sheet in sheets_by_priority(&dataset.sheets) {
        let signature = Signature::of(sheet);
        let Some(variant) = signature.classify() else {
            debug!(year = dataset.year, sheet = %sheet.name, ?signature, "sheet matches no layout");
            continue;
        };

        let layout = variant.layout();
        if !layout.nominal_years.contains(&dataset.year) {
            debug!(
                year = dataset.year,
                variant = %variant,
                "layout detected outside its nominal years"
            );
        }
        let sales_unit = signature.sales_unit.unwrap_or(layout.default_sales_unit);
        info!(year = dataset.year, variant = %variant, sheet = %sheet.name, "layout detected");

        return Ok(DetectedTable {
            year: dataset.year,
            variant,
            sheet,
            signature,
            sales_unit,
        });
    }

    Err(ExtractError::UnrecognizedFormat {
        sheets: dataset.sheets.iter().map(|s| s.name.clone()).collect(),
    })
}

/// Portfolio sheets first, then HMJ group sheets, then everything else.
fn sheets_by_priority(sheets: &[Sheet]) -> Vec<&Sheet> {
    let mut ordered: Vec<&Sheet> = sheets
        .iter()
        .filter(|s| !s.name.contains(NOTES_SHEET_MARKER))
        .collect();
    ordered.sort_by_key(|s| {
        if s.name.contains(PORTFOLIO_SHEET_MARKER) {
            0
        } else if s.name.contains(GROUP_SHEET_MARKER) {
            1
        } else {
            2
        }
    });
    ordered
}
