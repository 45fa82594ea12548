//! Synthetic workbooks, one per layout, shaped like the published files.

use std::path::PathBuf;

use crate::extract::grid::{Cell, Grid, Sheet, YearDataset};

fn t(s: &str) -> Cell {
    Cell::Text(s.to_string())
}

fn n(v: f64) -> Cell {
    Cell::Number(v)
}

fn f(formula: &str) -> Cell {
    Cell::Formula(formula.to_string())
}

/// `[label, year label, month values...]`; an empty label continues the previous KPI.
fn kpi_row(label: &str, year: &str, months: Vec<Cell>) -> Vec<Cell> {
    let label = if label.is_empty() { Cell::Empty } else { t(label) };
    let mut row = vec![label, t(year)];
    row.extend(months);
    row
}

fn nums(values: &[f64]) -> Vec<Cell> {
    values.iter().map(|v| n(*v)).collect()
}

fn hotel_header(name: &str, rooms: Option<f64>) -> Vec<Vec<Cell>> {
    let mut rows = vec![vec![t("物件番号"), t(name)]];
    if let Some(rooms) = rooms {
        rows.push(vec![t("客室数"), n(rooms)]);
    }
    rows
}

fn sheet(name: &str, rows: Vec<Vec<Cell>>) -> Sheet {
    Sheet {
        name: name.to_string(),
        grid: Grid::from_rows(rows),
    }
}

fn notes_sheet() -> Sheet {
    sheet(
        "ご利用上の注意",
        vec![
            vec![t("本資料は投資判断の参考となる情報提供を目的としています。")],
            vec![t("客室稼働率・ADR・RevPARの定義は別表をご参照ください。")],
        ],
    )
}

fn dataset(year: i32, sheets: Vec<Sheet>) -> YearDataset {
    YearDataset {
        year,
        source: PathBuf::from(format!("jhr_{year}_hotel_performance.xlsx")),
        sheets,
    }
}

pub const MODERN_OCCUPANCY: [f64; 12] = [
    0.872, 0.885, 0.901, 0.893, 0.862, 0.874, 0.889, 0.917, 0.881, 0.905, 0.912, 0.878,
];
pub const MODERN_ADR: [f64; 12] = [
    9168.0, 9420.0, 10850.0, 11200.0, 10310.0, 9870.0, 11540.0, 13020.0, 10460.0, 11380.0,
    11900.0, 10740.0,
];
pub const MODERN_REVPAR: [f64; 12] = [
    7990.0, 8337.0, 9776.0, 10002.0, 8887.0, 8626.0, 10259.0, 11939.0, 9215.0, 10299.0,
    10853.0, 9430.0,
];
pub const MODERN_SALES: [f64; 12] = [
    46.0, 47.0, 57.0, 58.0, 52.0, 49.0, 60.0, 68.0, 53.0, 60.0, 61.0, 55.0,
];

/// Portfolio rows for `year`, keeping only the first `months` values.
///
/// Row 4 (zero-based) is always the ADR row of the target year.
fn modern_rows(year: i32, months: usize) -> Vec<Vec<Cell>> {
    let take = |values: &[f64; 12]| -> Vec<Cell> {
        (0..12)
            .map(|i| if i < months { n(values[i]) } else { t("-") })
            .collect()
    };
    let label = format!("{year}年");
    let prior = format!("{}年", year - 1);

    let mut header = vec![Cell::Empty, Cell::Empty];
    header.extend((1..=12).map(|m| t(&format!("{m}月"))));

    vec![
        vec![t("ホテル運営実績(変動賃料等導入ホテル合計)")],
        header,
        kpi_row("客室稼働率", &label, take(&MODERN_OCCUPANCY)),
        kpi_row("", &prior, nums(&[0.801; 12])),
        kpi_row("ADR(円)", &label, take(&MODERN_ADR)),
        kpi_row("", &prior, nums(&[8800.0; 12])),
        kpi_row("RevPAR(円)", &label, take(&MODERN_REVPAR)),
        kpi_row("売上高(百万円)", &label, take(&MODERN_SALES)),
        kpi_row("", "前年比", nums(&[1.08; 12])),
    ]
}

/// 2024: one aggregated table, all twelve months.
pub fn modern_dataset() -> YearDataset {
    dataset(
        2024,
        vec![notes_sheet(), sheet("変動賃料等導入28ホテル", modern_rows(2024, 12))],
    )
}

/// 2025: months 01–06 only, later months shown as dashes.
pub fn modern_partial_dataset() -> YearDataset {
    dataset(
        2025,
        vec![notes_sheet(), sheet("変動賃料等導入28ホテル", modern_rows(2025, 6))],
    )
}

/// Like `modern_dataset` but January ADR holds unparseable text.
pub fn modern_with_bad_cell_dataset() -> YearDataset {
    let mut rows = modern_rows(2024, 12);
    rows[4][2] = t("n.a.");
    dataset(2024, vec![sheet("変動賃料等導入28ホテル", rows)])
}

/// 2021: three hotels with room counts, January to March.
///
/// Hotel B's ADR label sits on its 2020 row and the 2021 row continues it.
/// Hotel C does not report February.
pub fn covid_dataset() -> YearDataset {
    let mut rows = Vec::new();

    rows.extend(hotel_header("ホテルA", Some(300.0)));
    rows.push(kpi_row("客室稼働率", "2021年", nums(&[0.80, 0.70, 0.75])));
    rows.push(kpi_row("ADR(円)", "2021年", nums(&[10000.0, 9000.0, 9500.0])));
    rows.push(kpi_row("RevPAR(円)", "2021年", nums(&[8000.0, 6300.0, 7125.0])));
    rows.push(kpi_row("売上高(百万円)", "2021年", nums(&[10.0, 8.0, 9.0])));

    rows.extend(hotel_header("ホテルB", Some(100.0)));
    rows.push(kpi_row("客室稼働率", "2021年", nums(&[0.60, 0.50, 0.55])));
    rows.push(kpi_row("ADR(円)", "2020年", nums(&[9000.0, 8500.0, 8800.0])));
    rows.push(kpi_row("", "2021年", nums(&[8000.0, 7000.0, 7500.0])));
    rows.push(kpi_row("RevPAR(円)", "2021年", nums(&[4800.0, 3500.0, 4125.0])));
    rows.push(kpi_row("売上高(百万円)", "2021年", nums(&[20.0, 15.0, 18.0])));

    rows.extend(hotel_header("ホテルC", Some(200.0)));
    rows.push(kpi_row("客室稼働率", "2021年", vec![n(0.90), Cell::Empty, n(0.85)]));
    rows.push(kpi_row("ADR(円)", "2021年", vec![n(12000.0), Cell::Empty, n(11000.0)]));
    rows.push(kpi_row("RevPAR(円)", "2021年", vec![n(10800.0), Cell::Empty, n(9350.0)]));
    rows.push(kpi_row("売上高(百万円)", "2021年", vec![n(12.0), Cell::Empty, n(14.0)]));

    dataset(2021, vec![notes_sheet(), sheet("HMJグループホテル", rows)])
}

/// 2019: two hotels on the portfolio sheet, with reference formulas, a ditto
/// mark and an era year label. A decoy HMJ sheet precedes it.
pub fn transitional_dataset() -> YearDataset {
    let mut rows = Vec::new();

    rows.extend(hotel_header("ホテルX", Some(200.0)));
    rows.push(kpi_row("客室稼働率", "平成31年", nums(&[0.80, 0.80, 0.85])));
    // Excel row 4 / 5: March repeats or offsets February.
    rows.push(kpi_row("ADR(円)", "2019年", vec![n(13000.0), n(14000.0), f("=D4")]));
    rows.push(kpi_row("RevPAR(円)", "2019年", vec![n(10400.0), n(11200.0), f("=D5+700")]));
    rows.push(kpi_row("売上高(百万円)", "2019年", nums(&[22.0, 23.0, 25.0])));

    rows.extend(hotel_header("ホテルY", Some(100.0)));
    rows.push(kpi_row("客室稼働率", "平成31年", vec![n(0.55), n(0.60), t("〃")]));
    rows.push(kpi_row("ADR(円)", "2019年", nums(&[9000.0, 9200.0, 9500.0])));
    rows.push(kpi_row("RevPAR(円)", "2019年", nums(&[4950.0, 5520.0, 5700.0])));
    rows.push(kpi_row("売上高(百万円)", "2019年", nums(&[10.0, 11.0, 12.0])));

    let mut decoy = hotel_header("ホテルZ", Some(150.0));
    decoy.push(kpi_row("客室稼働率", "2019年", nums(&[0.5, 0.5, 0.5])));
    decoy.push(kpi_row("ADR(円)", "2019年", nums(&[7000.0, 7000.0, 7000.0])));
    decoy.push(kpi_row("RevPAR(円)", "2019年", nums(&[3500.0, 3500.0, 3500.0])));

    dataset(
        2019,
        vec![
            notes_sheet(),
            sheet("HMJグループホテル", decoy),
            sheet("変動賃料等導入21ホテル", rows),
        ],
    )
}

/// 2016: era year labels, percentages already in points, sales in thousands.
pub fn legacy_dataset() -> YearDataset {
    let mut rows = Vec::new();

    rows.extend(hotel_header("ホテルL1", None));
    rows.push(kpi_row("稼働率(%)", "平成27年", nums(&[80.0, 79.0])));
    rows.push(kpi_row("", "平成28年", nums(&[85.3, 80.1])));
    rows.push(kpi_row("ADR(円)", "平成28年", nums(&[15000.0, 14000.0])));
    rows.push(kpi_row("RevPAR(円)", "平成28年", nums(&[12795.0, 11214.0])));
    rows.push(kpi_row("売上高(千円)", "平成28年", nums(&[250000.0, 230000.0])));

    rows.extend(hotel_header("ホテルL2", None));
    rows.push(kpi_row("稼働率(%)", "平成28年", nums(&[90.5, 88.0])));
    rows.push(kpi_row("ADR(円)", "平成28年", nums(&[10000.0, 9000.0])));
    rows.push(kpi_row("RevPAR(円)", "平成28年", nums(&[9050.0, 7920.0])));
    rows.push(kpi_row("売上高(千円)", "平成28年", vec![n(120000.0), t("-")]));

    dataset(2016, vec![sheet("HMJグループホテル", rows)])
}

/// Workbook with no data sheet at all.
pub fn unrecognized_dataset() -> YearDataset {
    dataset(
        2018,
        vec![
            notes_sheet(),
            sheet(
                "目次",
                vec![
                    vec![t("目次")],
                    vec![t("1. ホテル概要")],
                    vec![t("2. 賃料推移")],
                ],
            ),
        ],
    )
}
