//! Input/output helpers.
//!
//! - source workbook reading (`workbook`)
//! - KPI document read/write (`yaml`)

pub mod workbook;
pub mod yaml;

pub use workbook::{load_year, read_workbook, source_path, workbook_file_name};
pub use yaml::{parse_document, read_document, to_yaml_string, write_document};
