//! Shared domain types.
//!
//! These types are intentionally kept small and free of I/O so they can be:
//!
//! - produced by any layout variant's extractor
//! - folded by the aggregator and assembler
//! - mapped onto the serialized document shape

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// First and last calendar year covered by the published workbooks.
pub const FIRST_YEAR: i32 = 2015;
pub const LAST_YEAR: i32 = 2025;

/// Known workbook layouts across the publication history.
///
/// Detection is structural (see `extract::variant::detect`); the nominal year
/// ranges below are informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    /// 2015–2018: per-hotel blocks on the HMJ group sheet, era year labels.
    LegacyIndividual,
    /// 2019: per-hotel blocks on the variable-rent portfolio sheet.
    #[serde(rename = "transitional_2019")]
    Transitional2019,
    /// 2020–2023: per-hotel blocks on the HMJ group sheet, western year labels.
    CovidIndividual,
    /// 2024 onward: one portfolio-level table, already aggregated.
    ModernAggregated,
}

impl Variant {
    pub const ALL: [Variant; 4] = [
        Variant::LegacyIndividual,
        Variant::Transitional2019,
        Variant::CovidIndividual,
        Variant::ModernAggregated,
    ];

    /// Stable tag used in the document and in logs.
    pub fn tag(self) -> &'static str {
        match self {
            Variant::LegacyIndividual => "legacy_individual",
            Variant::Transitional2019 => "transitional_2019",
            Variant::CovidIndividual => "covid_individual",
            Variant::ModernAggregated => "modern_aggregated",
        }
    }

    /// Whether the layout lists hotels individually (and needs aggregation).
    pub fn is_per_hotel(self) -> bool {
        !matches!(self, Variant::ModernAggregated)
    }
}

impl std::fmt::Display for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// The four KPIs tracked per month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Kpi {
    Occupancy,
    Adr,
    Revpar,
    Sales,
}

impl Kpi {
    /// Field name in the serialized document.
    pub fn field_name(self) -> &'static str {
        match self {
            Kpi::Occupancy => "occupancy_pct",
            Kpi::Adr => "adr_jpy",
            Kpi::Revpar => "revpar_jpy",
            Kpi::Sales => "sales_total_mil_jpy",
        }
    }
}

/// Sheet bounds of the xlsx format (`XFD1048576`).
const MAX_COLUMN_LETTERS: usize = 3;
const MAX_SHEET_ROWS: usize = 1_048_576;

/// Zero-based cell coordinates within one sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellRef {
    pub row: usize,
    pub col: usize,
}

impl CellRef {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Parse an A1-style reference (`D12`, `$D$12`, `Sheet1!D12` is rejected).
    pub fn parse_a1(s: &str) -> Option<Self> {
        let s = s.trim().replace('$', "");
        let split = s.find(|c: char| c.is_ascii_digit())?;
        let (letters, digits) = s.split_at(split);
        if letters.is_empty()
            || letters.len() > MAX_COLUMN_LETTERS
            || !letters.chars().all(|c| c.is_ascii_alphabetic())
        {
            return None;
        }
        let row: usize = digits.parse().ok()?;
        if row == 0 || row > MAX_SHEET_ROWS {
            return None;
        }
        let mut col = 0usize;
        for c in letters.chars() {
            col = col * 26 + (c.to_ascii_uppercase() as usize - 'A' as usize + 1);
        }
        Some(Self::new(row - 1, col - 1))
    }
}

impl std::fmt::Display for CellRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut letters = Vec::new();
        let mut n = self.col + 1;
        while n > 0 {
            let rem = (n - 1) % 26;
            letters.push((b'A' + rem as u8) as char);
            n = (n - 1) / 26;
        }
        let col: String = letters.into_iter().rev().collect();
        write!(f, "{col}{}", self.row + 1)
    }
}

/// Raw per-hotel values for one month, already normalized to canonical units.
///
/// Only the aggregator consumes these; they never reach the document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HotelContribution {
    pub hotel: String,
    /// Guest room count, when the hotel block lists one.
    pub rooms: Option<u32>,
    pub occupancy_pct: Option<f64>,
    pub adr_jpy: Option<u64>,
    pub revpar_jpy: Option<u64>,
    /// Sales in millions of yen, unrounded (summed before rounding).
    pub sales_mil_jpy: Option<f64>,
}

impl HotelContribution {
    pub fn has_any(&self) -> bool {
        self.occupancy_pct.is_some()
            || self.adr_jpy.is_some()
            || self.revpar_jpy.is_some()
            || self.sales_mil_jpy.is_some()
    }
}

/// Auxiliary quality data attached to a month.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MonthQuality {
    /// Fewer hotels reported than the sheet lists.
    pub partial: bool,
    pub reporting_hotels: Option<usize>,
    pub expected_hotels: Option<usize>,
}

/// Portfolio-level KPIs for one calendar month.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MonthlyRecord {
    /// 1–12.
    pub month: u32,
    pub occupancy_pct: Option<f64>,
    pub adr_jpy: Option<u64>,
    pub revpar_jpy: Option<u64>,
    pub sales_total_mil_jpy: Option<u64>,
    pub quality: MonthQuality,
}

impl MonthlyRecord {
    pub fn new(month: u32) -> Self {
        Self {
            month,
            ..Self::default()
        }
    }

    /// Two-digit key used in the document (`"01"`..`"12"`).
    pub fn month_key(&self) -> String {
        format!("{:02}", self.month)
    }

    pub fn is_empty(&self) -> bool {
        self.occupancy_pct.is_none()
            && self.adr_jpy.is_none()
            && self.revpar_jpy.is_none()
            && self.sales_total_mil_jpy.is_none()
    }
}

/// Derived yearly statistics over the months present.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnnualSummary {
    pub occupancy_avg_pct: Option<f64>,
    pub adr_avg_jpy: Option<u64>,
    pub sales_total_annual_mil_jpy: Option<u64>,
}

/// One year's assembled records.
#[derive(Debug, Clone, PartialEq)]
pub struct YearRecord {
    pub year: i32,
    pub variant: Variant,
    pub sheet: String,
    pub months: BTreeMap<u32, MonthlyRecord>,
    pub summary: AnnualSummary,
    /// Fewer than twelve months present.
    pub partial: bool,
}

impl YearRecord {
    pub fn partial_months(&self) -> Vec<u32> {
        self.months
            .values()
            .filter(|m| m.quality.partial)
            .map(|m| m.month)
            .collect()
    }
}

/// The multi-year record set; the only persisted artifact.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KpiDocument {
    pub years: BTreeMap<i32, YearRecord>,
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus env defaults).
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub data_dir: PathBuf,
    /// Where the document is written; `None` skips writing.
    pub output: Option<PathBuf>,
    pub years: Vec<i32>,
    /// Debug-level logging unless `RUST_LOG` says otherwise.
    pub verbose: bool,
}

impl RunConfig {
    pub fn default_years() -> Vec<i32> {
        (FIRST_YEAR..=LAST_YEAR).collect()
    }
}
