//! Workbook grid → per-month KPI values.
//!
//! - `grid`: raw cells, reference and ditto resolution
//! - `variant`: layout detection and per-layout coordinate tables
//! - `fields`: row/column lookup per month and KPI
//! - `normalize`: raw cell → canonical units

pub mod fields;
pub mod grid;
pub mod normalize;
pub mod variant;

#[cfg(test)]
pub(crate) mod fixtures;

pub use fields::{extract, Extracted, Extraction};
pub use grid::{Cell, CellValue, Grid, Sheet, YearDataset};
pub use variant::{detect, DetectedTable, Layout, SalesUnit, Signature, Weighting};
