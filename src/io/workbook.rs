//! Read source workbooks into raw grids.
//!
//! Values and formulas are read separately with `calamine` and merged: a
//! cached value wins, and a formula is kept only where no value was cached.

use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, Range, Reader};
use tracing::debug;

use crate::domain::CellRef;
use crate::error::ExtractError;
use crate::extract::{Cell, Grid, Sheet, YearDataset};

/// Extensions tried for a year's source file, in order.
pub const SOURCE_EXTENSIONS: [&str; 2] = ["xlsx", "xls"];

/// File name of a year's source workbook.
pub fn workbook_file_name(year: i32, extension: &str) -> String {
    format!("jhr_{year}_hotel_performance.{extension}")
}

/// The existing source file for `year`, if any.
pub fn source_path(data_dir: &Path, year: i32) -> Option<PathBuf> {
    SOURCE_EXTENSIONS
        .iter()
        .map(|ext| data_dir.join(workbook_file_name(year, ext)))
        .find(|p| p.is_file())
}

/// Locate and read `year`'s workbook from `data_dir`.
pub fn load_year(data_dir: &Path, year: i32) -> Result<YearDataset, ExtractError> {
    let path = source_path(data_dir, year).ok_or_else(|| ExtractError::SourceMissing {
        path: data_dir.join(workbook_file_name(year, SOURCE_EXTENSIONS[0])),
    })?;
    read_workbook(&path, year)
}

/// Read every sheet of a workbook.
pub fn read_workbook(path: &Path, year: i32) -> Result<YearDataset, ExtractError> {
    let workbook_error = |message: String| ExtractError::Workbook {
        path: path.to_path_buf(),
        message,
    };

    let mut workbook = open_workbook_auto(path).map_err(|e| workbook_error(e.to_string()))?;

    let mut sheets = Vec::new();
    for name in workbook.sheet_names() {
        let values = workbook
            .worksheet_range(&name)
            .map_err(|e| workbook_error(format!("sheet '{name}': {e}")))?;
        // Old .xls files may not expose formulas; values alone are enough there.
        let formulas = workbook.worksheet_formula(&name).ok();

        let grid = merge_ranges(&values, formulas.as_ref());
        debug!(year, sheet = %name, rows = grid.row_count(), cols = grid.width(), "sheet read");
        sheets.push(Sheet { name, grid });
    }

    Ok(YearDataset {
        year,
        source: path.to_path_buf(),
        sheets,
    })
}

/// Build a grid in absolute sheet coordinates from a value and a formula range.
pub fn merge_ranges(values: &Range<Data>, formulas: Option<&Range<String>>) -> Grid {
    let mut grid = Grid::default();

    if let Some((row0, col0)) = values.start() {
        for (r, c, data) in values.used_cells() {
            let cell = cell_from_data(data);
            if cell != Cell::Empty {
                grid.set(CellRef::new(row0 as usize + r, col0 as usize + c), cell);
            }
        }
    }

    if let Some(formulas) = formulas {
        if let Some((row0, col0)) = formulas.start() {
            for (r, c, formula) in formulas.used_cells() {
                let at = CellRef::new(row0 as usize + r, col0 as usize + c);
                if formula.trim().is_empty() || *grid.get(at) != Cell::Empty {
                    continue;
                }
                grid.set(at, Cell::Formula(format!("={}", formula.trim_start_matches('='))));
            }
        }
    }

    grid
}

/// Map one calamine cell onto a raw grid cell.
pub fn cell_from_data(data: &Data) -> Cell {
    match data {
        Data::Empty | Data::Error(_) => Cell::Empty,
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Float(f) => Cell::Number(*f),
        Data::Bool(b) => Cell::Text(b.to_string()),
        Data::String(s) if s.trim().is_empty() => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::DateTime(d) => Cell::Number(d.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_cells_map_to_grid_cells() {
        assert_eq!(cell_from_data(&Data::Int(46)), Cell::Number(46.0));
        assert_eq!(cell_from_data(&Data::Float(0.872)), Cell::Number(0.872));
        assert_eq!(cell_from_data(&Data::String("  ".into())), Cell::Empty);
        assert_eq!(
            cell_from_data(&Data::String("客室稼働率".into())),
            Cell::Text("客室稼働率".into())
        );
        assert_eq!(cell_from_data(&Data::Empty), Cell::Empty);
    }

    #[test]
    fn merge_keeps_absolute_coordinates_and_fills_uncached_formulas() {
        let mut values: Range<Data> = Range::new((3, 2), (3, 4));
        values.set_value((3, 2), Data::String("ADR(円)".into()));
        values.set_value((3, 3), Data::Float(14000.0));

        let mut formulas: Range<String> = Range::new((3, 3), (3, 4));
        formulas.set_value((3, 3), "C4*2".into());
        formulas.set_value((3, 4), "D4".into());

        let grid = merge_ranges(&values, Some(&formulas));
        assert_eq!(grid.get(CellRef::new(3, 2)), &Cell::Text("ADR(円)".into()));
        // Cached value wins over its formula.
        assert_eq!(grid.get(CellRef::new(3, 3)), &Cell::Number(14000.0));
        assert_eq!(grid.get(CellRef::new(3, 4)), &Cell::Formula("=D4".into()));
        assert_eq!(
            grid.resolve(CellRef::new(3, 4)),
            crate::extract::CellValue::Number(14000.0)
        );
    }

    #[test]
    fn source_path_prefers_xlsx_then_xls() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(source_path(dir.path(), 2016), None);

        let xls = dir.path().join("jhr_2016_hotel_performance.xls");
        std::fs::write(&xls, b"stub").unwrap();
        assert_eq!(source_path(dir.path(), 2016), Some(xls));

        let xlsx = dir.path().join("jhr_2016_hotel_performance.xlsx");
        std::fs::write(&xlsx, b"stub").unwrap();
        assert_eq!(source_path(dir.path(), 2016), Some(xlsx));
    }

    #[test]
    fn missing_and_corrupt_sources_are_year_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_year(dir.path(), 2020),
            Err(ExtractError::SourceMissing { .. })
        ));

        std::fs::write(dir.path().join("jhr_2020_hotel_performance.xlsx"), b"not a zip").unwrap();
        assert!(matches!(
            load_year(dir.path(), 2020),
            Err(ExtractError::Workbook { .. })
        ));
    }
}
