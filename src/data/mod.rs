//! Source data acquisition.
//!
//! The IR library page is scraped for the yearly workbook links; workbooks are
//! downloaded into the data directory under stable per-year file names.

pub mod library;

pub use library::{discover_workbook_urls, DownloadFailure, DownloadOutcome, LibraryClient};
