//! Error taxonomy for sheet ingestion, caching and output.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Workbook missing or not a readable workbook. Fatal to that file only.
    #[error("workbook {path} unavailable: {reason}")]
    SourceUnavailable { path: PathBuf, reason: String },

    /// Named sheet is absent from the workbook. Fatal to that sheet only.
    #[error("sheet `{sheet}` not found in {file}")]
    SheetNotFound { file: String, sheet: String },

    /// Required columns are missing or hold no value of their type. The
    /// sheet is skipped.
    #[error(
        "sheet `{sheet}` in {file} does not fit the required columns \
         (missing {missing:?}, mistyped {mistyped:?}); found {found:?}"
    )]
    SchemaViolation {
        file: String,
        sheet: String,
        missing: Vec<String>,
        mistyped: Vec<String>,
        found: Vec<String>,
    },

    #[error("cannot read cache entry {path}: {reason}")]
    CacheRead { path: PathBuf, reason: String },

    #[error("cannot write cache entry {path}: {reason}")]
    CacheWrite { path: PathBuf, reason: String },

    #[error("cannot write output {path}: {reason}")]
    Output { path: PathBuf, reason: String },

    #[error("cannot build table: {0}")]
    Table(#[from] arrow::error::ArrowError),

    #[error("invalid config {path}: {reason}")]
    Config { path: PathBuf, reason: String },
}

impl Error {
    /// Short machine-readable name, used in the run report.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::SourceUnavailable { .. } => "source_unavailable",
            Error::SheetNotFound { .. } => "sheet_not_found",
            Error::SchemaViolation { .. } => "schema_violation",
            Error::CacheRead { .. } => "cache_read",
            Error::CacheWrite { .. } => "cache_write",
            Error::Table(_) => "table",
            Error::Output { .. } => "output",
            Error::Config { .. } => "config",
        }
    }
}
