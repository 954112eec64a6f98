//! Formula error types

use thiserror::Error;

/// Result type for formula operations
pub type FormulaResult<T> = std::result::Result<T, FormulaError>;

/// Errors raised while parsing or checking a formula
///
/// Runtime problems inside a well-formed formula (division by zero, wrong
/// operand type) are not errors: they evaluate to an error value such as
/// `#DIV/0!` that flows into dependent cells.
#[derive(Debug, Error)]
pub enum FormulaError {
    /// Formula text could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),

    /// Function name not present in the registry
    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    /// Wrong number of arguments
    #[error("Wrong number of arguments for {function}: expected {expected}, got {actual}")]
    ArgumentCount {
        function: String,
        expected: String,
        actual: usize,
    },
}
