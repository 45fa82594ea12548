//! Raw cell grids, as read from one worksheet.
//!
//! A `Grid` keeps absolute sheet coordinates (row 0 / column A is always index 0),
//! so cell references found in formulas can be followed without offset math.

use std::path::PathBuf;

use crate::domain::CellRef;

/// Maximum number of references followed before giving up on a cell.
const MAX_REFERENCE_DEPTH: usize = 8;

/// Marks that mean "same value as the cell to the left".
const DITTO_MARKS: [&str; 3] = ["〃", "同上", "\""];

/// One raw worksheet cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Number(f64),
    Text(String),
    /// A formula without a cached value (e.g. `=D12` or `=D12+150`).
    Formula(String),
}

static EMPTY: Cell = Cell::Empty;

/// A cell value after following references.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Number(f64),
    Text(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Grid {
    rows: Vec<Vec<Cell>>,
}

impl Grid {
    pub fn from_rows(rows: Vec<Vec<Cell>>) -> Self {
        Self { rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn row(&self, row: usize) -> &[Cell] {
        self.rows.get(row).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn get(&self, at: CellRef) -> &Cell {
        self.rows
            .get(at.row)
            .and_then(|r| r.get(at.col))
            .unwrap_or(&EMPTY)
    }

    /// Place a cell, growing the grid as needed.
    pub fn set(&mut self, at: CellRef, cell: Cell) {
        if self.rows.len() <= at.row {
            self.rows.resize_with(at.row + 1, Vec::new);
        }
        let row = &mut self.rows[at.row];
        if row.len() <= at.col {
            row.resize(at.col + 1, Cell::Empty);
        }
        row[at.col] = cell;
    }

    /// Trimmed, non-empty text of a label cell. Numbers are rendered as text.
    pub fn label(&self, row: usize, col: usize) -> Option<String> {
        let text = match self.get(CellRef::new(row, col)) {
            Cell::Text(s) => s.trim().to_string(),
            Cell::Number(v) => format_number(*v),
            Cell::Empty | Cell::Formula(_) => String::new(),
        };
        if text.is_empty() { None } else { Some(text) }
    }

    /// Read a cell, following formula references and ditto marks.
    ///
    /// Unresolvable references (cycles, other sheets, unsupported formulas)
    /// resolve to `CellValue::Empty`.
    pub fn resolve(&self, at: CellRef) -> CellValue {
        self.resolve_depth(at, 0)
    }

    fn resolve_depth(&self, at: CellRef, depth: usize) -> CellValue {
        if depth > MAX_REFERENCE_DEPTH {
            return CellValue::Empty;
        }
        match self.get(at) {
            Cell::Empty => CellValue::Empty,
            Cell::Number(v) => CellValue::Number(*v),
            Cell::Text(s) => {
                let trimmed = s.trim();
                if DITTO_MARKS.contains(&trimmed) {
                    if at.col == 0 {
                        return CellValue::Empty;
                    }
                    return self.resolve_depth(CellRef::new(at.row, at.col - 1), depth + 1);
                }
                CellValue::Text(s.clone())
            }
            Cell::Formula(f) => {
                let Some((target, delta)) = parse_reference_formula(f) else {
                    return CellValue::Empty;
                };
                if target == at {
                    return CellValue::Empty;
                }
                match self.resolve_depth(target, depth + 1) {
                    CellValue::Number(v) => CellValue::Number(v + delta),
                    other if delta == 0.0 => other,
                    _ => CellValue::Empty,
                }
            }
        }
    }
}

/// Parse `=D12`, `D12`, `=$D$12+150` or `=D12-0.5` into a reference and a delta.
fn parse_reference_formula(formula: &str) -> Option<(CellRef, f64)> {
    let body = formula.trim().trim_start_matches('=').trim();
    let op_pos = body
        .char_indices()
        .skip(1)
        .find(|&(_, c)| c == '+' || c == '-')
        .map(|(i, _)| i);

    let (reference, delta) = match op_pos {
        None => (body, 0.0),
        Some(i) => {
            let (lhs, rhs) = body.split_at(i);
            let sign = if rhs.starts_with('-') { -1.0 } else { 1.0 };
            let magnitude: f64 = rhs[1..].trim().parse().ok()?;
            (lhs.trim(), sign * magnitude)
        }
    };

    CellRef::parse_a1(reference).map(|r| (r, delta))
}

/// Render a number the way it reads in the sheet: integers without a fraction.
pub fn format_number(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}

/// One named worksheet.
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub grid: Grid,
}

/// One source workbook for one calendar year.
#[derive(Debug, Clone, PartialEq)]
pub struct YearDataset {
    pub year: i32,
    pub source: PathBuf,
    pub sheets: Vec<Sheet>,
}
