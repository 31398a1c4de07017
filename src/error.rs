//! Error types for workbook reading and preparation.

use arrow::datatypes::DataType;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SheetcastError>;

/// All errors surfaced by a read call.
///
/// Errors carry the sheet name and, where it is meaningful, the (row, col)
/// position that triggered them. Individual cell decode hiccups are not
/// errors; they are recovered as blanks and logged.
#[derive(Debug, Error)]
pub enum SheetcastError {
    /// I/O failure opening or reading the workbook source.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The byte source is not a readable ZIP container.
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Malformed archive member, XML part, or binary record.
    #[error("invalid workbook format: {detail}")]
    Format { detail: String },

    /// The requested sheet index or name does not exist.
    #[error("worksheet not found: {0}")]
    SheetNotFound(String),

    /// `lookup_head` did not match within `lookup_size` rows.
    #[error("sheet {sheet:?}: no header matching {pattern:?} within {scanned} rows")]
    HeaderLookup {
        sheet: String,
        pattern: String,
        scanned: usize,
    },

    /// Explicit header names do not line up with the surviving columns.
    #[error("sheet {sheet:?}: {provided} header names provided, {found} columns found")]
    HeaderMismatch {
        sheet: String,
        provided: usize,
        found: usize,
    },

    /// Inconsistent or unusable read options.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A user-requested dtype override could not be applied.
    #[error("column {column:?} cannot be cast to {dtype}: {source}")]
    DTypeCast {
        column: String,
        dtype: DataType,
        source: arrow::error::ArrowError,
    },

    /// A cell references a shared-string index outside the loaded table.
    #[error("sheet {sheet:?}: shared string index {index} out of range (table holds {len})")]
    SharedStringsCorrupt {
        sheet: String,
        index: u32,
        len: usize,
    },

    /// The row callback returned an error; the read was aborted.
    #[error("sheet {sheet:?}: cancelled at row {row}: {source}")]
    Cancelled {
        sheet: String,
        row: u64,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Arrow kernel failure while concatenating or building arrays.
    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
}

impl SheetcastError {
    pub(crate) fn format(detail: impl Into<String>) -> Self {
        SheetcastError::Format {
            detail: detail.into(),
        }
    }

    pub(crate) fn config(detail: impl Into<String>) -> Self {
        SheetcastError::Config(detail.into())
    }
}

impl From<quick_xml::Error> for SheetcastError {
    fn from(e: quick_xml::Error) -> Self {
        SheetcastError::format(format!("XML parsing error: {e}"))
    }
}
