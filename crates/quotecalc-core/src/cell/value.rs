//! Cell value types

use std::fmt;
use std::sync::Arc;

/// The value stored in a cell
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    /// No value
    #[default]
    Empty,

    /// TRUE / FALSE
    Boolean(bool),

    /// Every number, including percentages stored as fractions
    Number(f64),

    /// Text
    String(SharedString),

    /// Spreadsheet error value (#DIV/0!, #VALUE!, ...)
    Error(CellError),

    /// Formula with the result of the last evaluation (or the value read from file)
    Formula {
        /// Formula text including the leading `=`
        text: String,
        /// Last computed result, if any
        cached_value: Option<Box<CellValue>>,
    },
}

impl CellValue {
    /// Create a text value
    pub fn string<S: AsRef<str>>(s: S) -> Self {
        CellValue::String(SharedString::new(s))
    }

    /// Create a formula without a cached result; a missing `=` is added
    pub fn formula<S: Into<String>>(text: S) -> Self {
        let text = text.into();
        let text = if text.starts_with('=') {
            text
        } else {
            format!("={}", text)
        };
        CellValue::Formula {
            text,
            cached_value: None,
        }
    }

    /// Create a formula that already carries a cached result
    pub fn formula_with_cached<S: Into<String>>(text: S, cached: CellValue) -> Self {
        match Self::formula(text) {
            CellValue::Formula { text, .. } => CellValue::Formula {
                text,
                cached_value: Some(Box::new(cached)),
            },
            other => other,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    pub fn is_formula(&self) -> bool {
        matches!(self, CellValue::Formula { .. })
    }

    /// True for error values, including a formula whose cached result is an error
    pub fn is_error(&self) -> bool {
        matches!(self.effective_value(), CellValue::Error(_))
    }

    /// Numeric view of the value; booleans count as 1 / 0, text does not convert
    pub fn as_number(&self) -> Option<f64> {
        match self.effective_value() {
            CellValue::Number(n) => Some(*n),
            CellValue::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.effective_value() {
            CellValue::Boolean(b) => Some(*b),
            CellValue::Number(n) => Some(*n != 0.0),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&str> {
        match self.effective_value() {
            CellValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Formula text if this is a formula cell
    pub fn formula_text(&self) -> Option<&str> {
        match self {
            CellValue::Formula { text, .. } => Some(text),
            _ => None,
        }
    }

    /// Cached result for formulas, the value itself otherwise
    ///
    /// A formula that was never evaluated resolves to [`CellValue::Empty`].
    pub fn effective_value(&self) -> &CellValue {
        const EMPTY: &CellValue = &CellValue::Empty;
        match self {
            CellValue::Formula {
                cached_value: Some(v),
                ..
            } => v.effective_value(),
            CellValue::Formula { .. } => EMPTY,
            _ => self,
        }
    }

    /// Type name used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            CellValue::Empty => "empty",
            CellValue::Boolean(_) => "boolean",
            CellValue::Number(_) => "number",
            CellValue::String(_) => "string",
            CellValue::Error(_) => "error",
            CellValue::Formula { .. } => "formula",
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Boolean(b) => f.write_str(if *b { "TRUE" } else { "FALSE" }),
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::String(s) => f.write_str(s.as_str()),
            CellValue::Error(e) => write!(f, "{}", e),
            CellValue::Formula {
                cached_value: Some(v),
                ..
            } => write!(f, "{}", v),
            CellValue::Formula { text, .. } => f.write_str(text),
        }
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Boolean(b)
    }
}

impl From<i32> for CellValue {
    fn from(n: i32) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<u32> for CellValue {
    fn from(n: u32) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::string(s)
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::string(s)
    }
}

impl From<CellError> for CellValue {
    fn from(e: CellError) -> Self {
        CellValue::Error(e)
    }
}

/// Spreadsheet error values
///
/// These are ordinary cell values: they are stored, serialized and
/// propagated to dependents, never raised as Rust errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellError {
    /// #NULL! - empty range intersection
    Null,
    /// #DIV/0! - division by zero or by an empty cell
    Div0,
    /// #VALUE! - operand of the wrong type
    Value,
    /// #REF! - reference to a missing sheet or cell
    Ref,
    /// #NAME? - unknown name
    Name,
    /// #NUM! - numeric result out of domain
    Num,
    /// #N/A - no value available (failed lookup)
    Na,
}

impl CellError {
    /// Display string, e.g. `#DIV/0!`
    pub fn as_str(&self) -> &'static str {
        match self {
            CellError::Null => "#NULL!",
            CellError::Div0 => "#DIV/0!",
            CellError::Value => "#VALUE!",
            CellError::Ref => "#REF!",
            CellError::Name => "#NAME?",
            CellError::Num => "#NUM!",
            CellError::Na => "#N/A",
        }
    }

    /// Parse a display string (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "#NULL!" => Some(CellError::Null),
            "#DIV/0!" => Some(CellError::Div0),
            "#VALUE!" => Some(CellError::Value),
            "#REF!" => Some(CellError::Ref),
            "#NAME?" => Some(CellError::Name),
            "#NUM!" => Some(CellError::Num),
            "#N/A" => Some(CellError::Na),
            _ => None,
        }
    }
}

impl fmt::Display for CellError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference-counted text shared between cells and evaluation results
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SharedString(Arc<str>);

impl SharedString {
    pub fn new<S: AsRef<str>>(s: S) -> Self {
        SharedString(Arc::from(s.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SharedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

impl fmt::Display for SharedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SharedString {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SharedString {
    fn from(s: &str) -> Self {
        SharedString::new(s)
    }
}

impl From<String> for SharedString {
    fn from(s: String) -> Self {
        SharedString::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_formula_prefix() {
        assert_eq!(CellValue::formula("B13-B15").formula_text(), Some("=B13-B15"));
        assert_eq!(CellValue::formula("=B19/B13").formula_text(), Some("=B19/B13"));
    }

    #[test]
    fn test_effective_value_of_formula() {
        let fresh = CellValue::formula("=1+1");
        assert_eq!(fresh.effective_value(), &CellValue::Empty);
        assert_eq!(fresh.as_number(), None);

        let cached = CellValue::formula_with_cached("=B19/B13", CellValue::Number(0.0422));
        assert_eq!(cached.as_number(), Some(0.0422));
        assert!(!cached.is_error());

        let failed = CellValue::formula_with_cached("=1/0", CellError::Div0.into());
        assert!(failed.is_error());
    }

    #[test]
    fn test_numeric_views() {
        assert_eq!(CellValue::from(30).as_number(), Some(30.0));
        assert_eq!(CellValue::Boolean(true).as_number(), Some(1.0));
        assert_eq!(CellValue::string("450000").as_number(), None);
        assert_eq!(CellValue::Empty.as_number(), None);
    }

    #[test]
    fn test_cell_error_text() {
        assert_eq!(CellError::Div0.to_string(), "#DIV/0!");
        assert_eq!(CellError::parse("#n/a"), Some(CellError::Na));
        assert_eq!(CellError::parse("#ERROR"), None);
    }
}
