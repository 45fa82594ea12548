//! `hotel-kpi` library crate.
//!
//! The binary (`kpi`) is a thin wrapper around this library so that:
//!
//! - every extraction stage is testable on in-memory grids, without workbooks on disk
//! - the download step stays swappable and out of the parsing code
//! - code stays easy to navigate as new workbook layouts show up

pub mod aggregate;
pub mod app;
pub mod assemble;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod extract;
pub mod io;
pub mod plot;
pub mod report;
