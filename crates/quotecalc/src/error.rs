//! Error types for the quotecalc pipeline

use quotecalc_xlsx::XlsxError;
use thiserror::Error;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by evaluation passes, injection and the cash-flow pipeline
///
/// Per-cell runtime problems (`#DIV/0!`, `#VALUE!`, ...) are not errors: they
/// are stored as cell values and flow into dependent cells.
#[derive(Debug, Error)]
pub enum Error {
    /// Workbook document could not be read or written
    #[error(transparent)]
    Xlsx(#[from] XlsxError),

    /// Workbook model rejected an operation
    #[error(transparent)]
    Core(quotecalc_core::Error),

    /// A sheet the operation needs is absent
    #[error("Sheet not found: {0}")]
    SheetNotFound(String),

    /// Formula text is malformed or calls a function with the wrong arity
    #[error("Parse error in {cell}: {message}")]
    Parse { cell: String, message: String },

    /// Formula cells reference each other in a loop
    #[error("Cyclic dependency: {}", .cells.join(" -> "))]
    CyclicDependency { cells: Vec<String> },

    /// A formula calls a function the engine does not implement
    #[error("Unsupported function: {0}")]
    UnsupportedFunction(String),

    /// Row layout and record shape disagree, or the origin is misplaced
    #[error("Invalid layout: {0}")]
    InvalidLayout(String),

    /// A line-item row could not be read back as a record (1-based row)
    #[error("Invalid record at row {row}: {message}")]
    InvalidRecord { row: u32, message: String },
}

impl From<quotecalc_core::Error> for Error {
    fn from(err: quotecalc_core::Error) -> Self {
        match err {
            quotecalc_core::Error::SheetNotFound(name) => Error::SheetNotFound(name),
            other => Error::Core(other),
        }
    }
}
