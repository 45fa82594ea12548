use std::path::PathBuf;

use crate::domain::{CellRef, Kpi};

/// Run-level failure carrying the process exit code.
#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

/// A failure that makes one year's extraction impossible.
///
/// The pipeline records it against the year and moves on to the next one.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractError {
    /// No sheet in the workbook matches any known layout signature.
    UnrecognizedFormat { sheets: Vec<String> },
    /// The workbook could not be opened or a sheet could not be read.
    Workbook { path: PathBuf, message: String },
    /// No source file exists for the year.
    SourceMissing { path: PathBuf },
}

impl std::fmt::Display for ExtractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractError::UnrecognizedFormat { sheets } => {
                write!(f, "unrecognized workbook format (sheets: {})", sheets.join(", "))
            }
            ExtractError::Workbook { path, message } => {
                write!(f, "failed to read workbook '{}': {message}", path.display())
            }
            ExtractError::SourceMissing { path } => {
                write!(f, "source workbook '{}' not found", path.display())
            }
        }
    }
}

impl std::error::Error for ExtractError {}

/// A single cell that failed to coerce to its KPI's canonical type.
#[derive(Debug, Clone, PartialEq)]
pub enum CellError {
    InvalidNumeric { raw: String, reason: &'static str },
}

impl std::fmt::Display for CellError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellError::InvalidNumeric { raw, reason } => write!(f, "invalid numeric '{raw}': {reason}"),
        }
    }
}

impl std::error::Error for CellError {}

/// Non-fatal findings, each scoped to one year, month or cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// A cell was dropped; its month is missing that KPI.
    InvalidNumeric {
        year: i32,
        kpi: Kpi,
        cell: CellRef,
        error: CellError,
    },
    /// Only a subset of hotels reported the month; the figure covers that subset.
    PartialReporting {
        year: i32,
        month: u32,
        reporting: usize,
        expected: usize,
    },
    /// RevPAR disagrees with `ADR × occupancy / 100` by more than the tolerance.
    RevparMismatch {
        year: i32,
        month: u32,
        revpar_jpy: u64,
        implied_jpy: u64,
    },
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Diagnostic::InvalidNumeric { year, kpi, cell, error } => {
                write!(f, "{year} {} at {cell}: {error}", kpi.field_name())
            }
            Diagnostic::PartialReporting {
                year,
                month,
                reporting,
                expected,
            } => write!(
                f,
                "{year}-{month:02}: partial reporting ({reporting}/{expected} hotels)"
            ),
            Diagnostic::RevparMismatch {
                year,
                month,
                revpar_jpy,
                implied_jpy,
            } => write!(
                f,
                "{year}-{month:02}: revpar {revpar_jpy} differs from adr x occupancy ({implied_jpy})"
            ),
        }
    }
}
