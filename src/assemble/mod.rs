//! Year records and the multi-year document.

use std::collections::BTreeMap;

use tracing::{info, warn};

use crate::aggregate::aggregate_month;
use crate::domain::{AnnualSummary, KpiDocument, MonthlyRecord, YearRecord};
use crate::error::Diagnostic;
use crate::extract::normalize::round1;
use crate::extract::{DetectedTable, Extracted, Extraction};

/// Annual statistics over the months present.
///
/// Each field is computed over the months where that KPI exists, so a partial
/// year is summarized over exactly the months it has.
pub fn summarize(months: &BTreeMap<u32, MonthlyRecord>) -> AnnualSummary {
    let occupancy: Vec<f64> = months.values().filter_map(|m| m.occupancy_pct).collect();
    let adr: Vec<u64> = months.values().filter_map(|m| m.adr_jpy).collect();
    let sales: Vec<u64> = months.values().filter_map(|m| m.sales_total_mil_jpy).collect();

    AnnualSummary {
        occupancy_avg_pct: (!occupancy.is_empty())
            .then(|| round1(occupancy.iter().sum::<f64>() / occupancy.len() as f64)),
        adr_avg_jpy: (!adr.is_empty())
            .then(|| (adr.iter().sum::<u64>() as f64 / adr.len() as f64).round() as u64),
        sales_total_annual_mil_jpy: (!sales.is_empty()).then(|| sales.iter().sum()),
    }
}

/// Compare RevPAR against `ADR × occupancy / 100`.
///
/// The allowance is one yen plus the spread a one-decimal occupancy can hide
/// (±0.05 points of ADR).
pub fn check_revpar(year: i32, record: &MonthlyRecord) -> Option<Diagnostic> {
    let (Some(revpar), Some(adr), Some(occ)) = (record.revpar_jpy, record.adr_jpy, record.occupancy_pct) else {
        return None;
    };
    let implied = adr as f64 * occ / 100.0;
    let tolerance = 1.0 + adr as f64 * 0.05 / 100.0;
    if (revpar as f64 - implied).abs() <= tolerance {
        return None;
    }
    Some(Diagnostic::RevparMismatch {
        year,
        month: record.month,
        revpar_jpy: revpar,
        implied_jpy: implied.round() as u64,
    })
}

/// Turn one year's extraction into a `YearRecord`.
///
/// Diagnostics from extraction are passed through; aggregation and the RevPAR
/// check add their own.
pub fn build_year(table: &DetectedTable<'_>, extraction: Extraction) -> (YearRecord, Vec<Diagnostic>) {
    let year = table.year;
    let mut diagnostics = extraction.diagnostics;

    let months: BTreeMap<u32, MonthlyRecord> = match extraction.values {
        Extracted::Portfolio(months) => months,
        Extracted::PerHotel {
            expected_hotels,
            months,
        } => months
            .into_iter()
            .map(|(month, contributions)| {
                let record = aggregate_month(year, month, &contributions, expected_hotels, table.layout().weighting);
                if record.quality.partial {
                    diagnostics.push(Diagnostic::PartialReporting {
                        year,
                        month,
                        reporting: contributions.len(),
                        expected: expected_hotels,
                    });
                }
                (month, record)
            })
            .collect(),
    };
    let months: BTreeMap<u32, MonthlyRecord> = months
        .into_iter()
        .filter(|(_, record)| !record.is_empty())
        .collect();

    diagnostics.extend(months.values().filter_map(|m| check_revpar(year, m)));

    let record = YearRecord {
        year,
        variant: table.variant,
        sheet: table.sheet.name.clone(),
        summary: summarize(&months),
        partial: months.len() < 12,
        months,
    };
    (record, diagnostics)
}

/// Collects year records into the document.
///
/// Append-only: a year is added once and never patched afterwards.
#[derive(Debug, Default)]
pub struct Assembler {
    document: KpiDocument,
}

impl Assembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a year. Returns `false` (and keeps the first record) if the year is already present.
    pub fn push(&mut self, record: YearRecord) -> bool {
        if self.document.years.contains_key(&record.year) {
            warn!(year = record.year, "year already assembled; keeping the first record");
            return false;
        }
        info!(
            year = record.year,
            months = record.months.len(),
            partial = record.partial,
            "year assembled"
        );
        self.document.years.insert(record.year, record);
        true
    }

    pub fn finish(self) -> KpiDocument {
        self.document
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::{detect, extract, fixtures};

    fn year_from(dataset: &crate::extract::YearDataset) -> (YearRecord, Vec<Diagnostic>) {
        let table = detect(dataset).unwrap();
        let extraction = extract(&table);
        build_year(&table, extraction)
    }

    #[test]
    fn partial_year_summarizes_only_present_months() {
        let (record, _) = year_from(&fixtures::modern_partial_dataset());
        assert!(record.partial);
        assert_eq!(record.months.keys().copied().collect::<Vec<_>>(), vec![1, 2, 3, 4, 5, 6]);

        let occ = &fixtures::MODERN_OCCUPANCY[..6];
        let expected_occ = round1(occ.iter().map(|v| round1(v * 100.0)).sum::<f64>() / 6.0);
        assert_eq!(record.summary.occupancy_avg_pct, Some(expected_occ));

        let sales: u64 = fixtures::MODERN_SALES[..6].iter().map(|v| *v as u64).sum();
        assert_eq!(record.summary.sales_total_annual_mil_jpy, Some(sales));

        let adr: f64 = fixtures::MODERN_ADR[..6].iter().sum::<f64>() / 6.0;
        assert_eq!(record.summary.adr_avg_jpy, Some(adr.round() as u64));
    }

    #[test]
    fn full_modern_year_is_not_partial_and_passes_revpar_check() {
        let (record, diagnostics) = year_from(&fixtures::modern_dataset());
        assert!(!record.partial);
        assert_eq!(record.months.len(), 12);
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        assert_eq!(record.sheet, "変動賃料等導入28ホテル");
    }

    #[test]
    fn every_variant_yields_exactly_its_months() {
        let cases = [
            (fixtures::legacy_dataset(), vec![1, 2]),
            (fixtures::transitional_dataset(), vec![1, 2, 3]),
            (fixtures::covid_dataset(), vec![1, 2, 3]),
            (fixtures::modern_dataset(), (1..=12).collect()),
        ];
        for (dataset, months) in cases {
            let (record, _) = year_from(&dataset);
            assert_eq!(record.months.keys().copied().collect::<Vec<_>>(), months, "year {}", dataset.year);
        }
    }

    #[test]
    fn aggregated_records_satisfy_revpar_invariant() {
        for dataset in [fixtures::legacy_dataset(), fixtures::transitional_dataset(), fixtures::covid_dataset()] {
            let (record, _) = year_from(&dataset);
            for m in record.months.values() {
                if let (Some(adr), Some(occ), Some(revpar)) = (m.adr_jpy, m.occupancy_pct, m.revpar_jpy) {
                    let implied = (adr as f64 * occ / 100.0).round();
                    assert!((revpar as f64 - implied).abs() <= 1.0, "{}-{:02}", record.year, m.month);
                }
            }
        }
    }

    #[test]
    fn covid_partial_month_is_flagged() {
        let (record, diagnostics) = year_from(&fixtures::covid_dataset());
        let feb = &record.months[&2];
        assert!(feb.quality.partial);
        assert_eq!(feb.occupancy_pct, Some(65.0));
        assert_eq!(feb.sales_total_mil_jpy, Some(23));
        assert!(diagnostics.contains(&Diagnostic::PartialReporting {
            year: 2021,
            month: 2,
            reporting: 2,
            expected: 3
        }));
        assert_eq!(record.partial_months(), vec![2]);

        let jan = &record.months[&1];
        assert_eq!(jan.sales_total_mil_jpy, Some(42));
        assert_eq!(jan.adr_jpy, Some(10500));
    }

    #[test]
    fn transitional_march_uses_resolved_references() {
        let (record, _) = year_from(&fixtures::transitional_dataset());
        let march = &record.months[&3];
        assert_eq!(march.occupancy_pct, Some(76.7));
        assert_eq!(march.adr_jpy, Some(12826));
        assert_eq!(march.revpar_jpy, Some(9838));
        assert_eq!(march.sales_total_mil_jpy, Some(37));
    }

    #[test]
    fn legacy_sales_are_scaled_from_thousands() {
        let (record, _) = year_from(&fixtures::legacy_dataset());
        assert_eq!(record.months[&1].sales_total_mil_jpy, Some(370));
        assert_eq!(record.months[&2].sales_total_mil_jpy, Some(230));
    }

    #[test]
    fn revpar_mismatch_is_reported() {
        let mut record = MonthlyRecord::new(5);
        record.occupancy_pct = Some(80.0);
        record.adr_jpy = Some(10000);
        record.revpar_jpy = Some(7000);
        assert_eq!(
            check_revpar(2022, &record),
            Some(Diagnostic::RevparMismatch {
                year: 2022,
                month: 5,
                revpar_jpy: 7000,
                implied_jpy: 8000
            })
        );
        record.revpar_jpy = Some(8004);
        assert_eq!(check_revpar(2022, &record), None);
    }

    #[test]
    fn assembler_is_append_only() {
        let (first, _) = year_from(&fixtures::modern_dataset());
        let mut second = first.clone();
        second.sheet = "other".into();

        let mut assembler = Assembler::new();
        assert!(assembler.push(first));
        assert!(!assembler.push(second));
        let doc = assembler.finish();
        assert_eq!(doc.years.len(), 1);
        assert_eq!(doc.years[&2024].sheet, "変動賃料等導入28ホテル");
    }
}
