//! Terminal plots of a generated KPI document.

pub mod ascii;

pub use ascii::{occupancy_series, render_occupancy_plot};
