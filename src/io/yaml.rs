//! The KPI document on disk.
//!
//! Shape (one entry per year, keys sorted):
//!
//! ```yaml
//! 2024:
//!   monthly_data:
//!     '01':
//!       occupancy_pct: 87.2
//!       adr_jpy: 9168
//!       revpar_jpy: 7990
//!       sales_total_mil_jpy: 46
//!   annual_summary:
//!     occupancy_avg_pct: 87.2
//!     adr_avg_jpy: 9168
//!     sales_total_annual_mil_jpy: 46
//!   data_quality:
//!     source_variant: modern_aggregated
//!     sheet: 変動賃料等導入28ホテル
//!     months_present: 1
//!     partial_year: true
//!     partial_months: []
//! ```
//!
//! Output is a pure function of the `KpiDocument`: no timestamps, `BTreeMap`
//! ordering and fixed struct field order.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::{AnnualSummary, KpiDocument, MonthQuality, MonthlyRecord, Variant, YearRecord};
use crate::error::AppError;

#[derive(Debug, Serialize, Deserialize)]
struct MonthDoc {
    occupancy_pct: Option<f64>,
    adr_jpy: Option<u64>,
    revpar_jpy: Option<u64>,
    sales_total_mil_jpy: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SummaryDoc {
    occupancy_avg_pct: Option<f64>,
    adr_avg_jpy: Option<u64>,
    sales_total_annual_mil_jpy: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize)]
struct QualityDoc {
    source_variant: Variant,
    sheet: String,
    months_present: usize,
    partial_year: bool,
    partial_months: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct YearDoc {
    monthly_data: BTreeMap<String, MonthDoc>,
    annual_summary: SummaryDoc,
    data_quality: QualityDoc,
}

fn month_key(month: u32) -> String {
    format!("{month:02}")
}

impl From<&YearRecord> for YearDoc {
    fn from(record: &YearRecord) -> Self {
        let monthly_data = record
            .months
            .values()
            .map(|m| {
                let doc = MonthDoc {
                    occupancy_pct: m.occupancy_pct,
                    adr_jpy: m.adr_jpy,
                    revpar_jpy: m.revpar_jpy,
                    sales_total_mil_jpy: m.sales_total_mil_jpy,
                };
                (m.month_key(), doc)
            })
            .collect();

        YearDoc {
            monthly_data,
            annual_summary: SummaryDoc {
                occupancy_avg_pct: record.summary.occupancy_avg_pct,
                adr_avg_jpy: record.summary.adr_avg_jpy,
                sales_total_annual_mil_jpy: record.summary.sales_total_annual_mil_jpy,
            },
            data_quality: QualityDoc {
                source_variant: record.variant,
                sheet: record.sheet.clone(),
                months_present: record.months.len(),
                partial_year: record.partial,
                partial_months: record.partial_months().into_iter().map(month_key).collect(),
            },
        }
    }
}

impl YearDoc {
    fn into_record(self, year: i32) -> Result<YearRecord, AppError> {
        let partial: Vec<u32> = self
            .data_quality
            .partial_months
            .iter()
            .map(|k| parse_month_key(year, k))
            .collect::<Result<_, _>>()?;

        let mut months = BTreeMap::new();
        for (key, doc) in self.monthly_data {
            let month = parse_month_key(year, &key)?;
            months.insert(
                month,
                MonthlyRecord {
                    month,
                    occupancy_pct: doc.occupancy_pct,
                    adr_jpy: doc.adr_jpy,
                    revpar_jpy: doc.revpar_jpy,
                    sales_total_mil_jpy: doc.sales_total_mil_jpy,
                    quality: MonthQuality {
                        partial: partial.contains(&month),
                        ..MonthQuality::default()
                    },
                },
            );
        }

        Ok(YearRecord {
            year,
            variant: self.data_quality.source_variant,
            sheet: self.data_quality.sheet,
            months,
            summary: AnnualSummary {
                occupancy_avg_pct: self.annual_summary.occupancy_avg_pct,
                adr_avg_jpy: self.annual_summary.adr_avg_jpy,
                sales_total_annual_mil_jpy: self.annual_summary.sales_total_annual_mil_jpy,
            },
            partial: self.data_quality.partial_year,
        })
    }
}

fn parse_month_key(year: i32, key: &str) -> Result<u32, AppError> {
    key.parse::<u32>()
        .ok()
        .filter(|m| (1..=12).contains(m))
        .ok_or_else(|| AppError::new(2, format!("Invalid month key '{key}' in year {year}")))
}

/// Render the document as YAML.
pub fn to_yaml_string(document: &KpiDocument) -> Result<String, AppError> {
    let docs: BTreeMap<i32, YearDoc> = document
        .years
        .iter()
        .map(|(year, record)| (*year, YearDoc::from(record)))
        .collect();
    serde_yaml::to_string(&docs).map_err(|e| AppError::new(2, format!("Failed to serialize KPI document: {e}")))
}

/// Write the document, replacing any previous file.
pub fn write_document(path: &Path, document: &KpiDocument) -> Result<(), AppError> {
    let yaml = to_yaml_string(document)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| AppError::new(2, format!("Failed to create '{}': {e}", parent.display())))?;
    }
    fs::write(path, yaml).map_err(|e| AppError::new(2, format!("Failed to write '{}': {e}", path.display())))
}

/// Parse a document produced by `to_yaml_string`.
pub fn parse_document(yaml: &str) -> Result<KpiDocument, AppError> {
    let docs: BTreeMap<i32, YearDoc> =
        serde_yaml::from_str(yaml).map_err(|e| AppError::new(2, format!("Invalid KPI document: {e}")))?;
    let years = docs
        .into_iter()
        .map(|(year, doc)| doc.into_record(year).map(|r| (year, r)))
        .collect::<Result<_, _>>()?;
    Ok(KpiDocument { years })
}

/// Read a document from disk.
pub fn read_document(path: &Path) -> Result<KpiDocument, AppError> {
    let yaml = fs::read_to_string(path)
        .map_err(|e| AppError::new(2, format!("Failed to open KPI document '{}': {e}", path.display())))?;
    parse_document(&yaml)
}
