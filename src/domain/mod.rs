//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the closed set of workbook layout variants (`Variant`)
//! - cell coordinates and KPI identifiers (`CellRef`, `Kpi`)
//! - per-hotel and portfolio monthly values (`HotelContribution`, `MonthlyRecord`)
//! - assembled outputs (`YearRecord`, `AnnualSummary`, `KpiDocument`)

pub mod types;

pub use types::*;
