//! Formula abstract syntax tree

use quotecalc_core::{CellAddress, CellError, CellRange};

/// Parsed formula expression
#[derive(Debug, Clone, PartialEq)]
pub enum FormulaExpr {
    // === Literals ===
    Number(f64),
    String(String),
    Boolean(bool),
    Error(CellError),

    // === References ===
    /// Single cell, optionally on another sheet
    CellRef(CellReference),
    /// Rectangular range, optionally on another sheet
    RangeRef(RangeReference),
    /// Defined name; the engine has no name table so these evaluate to #NAME?
    NameRef(String),

    // === Operators ===
    BinaryOp {
        op: BinaryOperator,
        left: Box<FormulaExpr>,
        right: Box<FormulaExpr>,
    },
    UnaryOp {
        op: UnaryOperator,
        operand: Box<FormulaExpr>,
    },

    /// Function call; `name` is upper-case
    Function { name: String, args: Vec<FormulaExpr> },

    /// Array constant such as `{1,2;3,4}`
    Array(Vec<Vec<FormulaExpr>>),
}

/// Cell reference with optional sheet
#[derive(Debug, Clone, PartialEq)]
pub struct CellReference {
    pub sheet: Option<String>,
    pub address: CellAddress,
}

/// Range reference with optional sheet
#[derive(Debug, Clone, PartialEq)]
pub struct RangeReference {
    pub sheet: Option<String>,
    pub range: CellRange,
}

/// A reference found while walking an expression
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reference<'a> {
    Cell(&'a CellReference),
    Range(&'a RangeReference),
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    // Arithmetic
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,

    // Comparison
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,

    // Text
    Concat,

    /// `:` between two non-literal operands, e.g. `INDEX(...):B5`
    Range,
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Negate,
    /// Postfix `%`, divides by 100
    Percent,
}

impl FormulaExpr {
    /// Collect every cell and range reference in evaluation order
    pub fn references(&self) -> Vec<Reference<'_>> {
        let mut out = Vec::new();
        self.collect_references(&mut out);
        out
    }

    fn collect_references<'a>(&'a self, out: &mut Vec<Reference<'a>>) {
        match self {
            FormulaExpr::CellRef(r) => out.push(Reference::Cell(r)),
            FormulaExpr::RangeRef(r) => out.push(Reference::Range(r)),
            FormulaExpr::BinaryOp { left, right, .. } => {
                left.collect_references(out);
                right.collect_references(out);
            }
            FormulaExpr::UnaryOp { operand, .. } => operand.collect_references(out),
            FormulaExpr::Function { args, .. } => {
                for arg in args {
                    arg.collect_references(out);
                }
            }
            FormulaExpr::Array(rows) => {
                for item in rows.iter().flatten() {
                    item.collect_references(out);
                }
            }
            FormulaExpr::Number(_)
            | FormulaExpr::String(_)
            | FormulaExpr::Boolean(_)
            | FormulaExpr::Error(_)
            | FormulaExpr::NameRef(_) => {}
        }
    }

    /// Every function call in the expression as (name, argument count)
    pub fn function_calls(&self) -> Vec<(&str, usize)> {
        let mut out = Vec::new();
        self.collect_calls(&mut out);
        out
    }

    fn collect_calls<'a>(&'a self, out: &mut Vec<(&'a str, usize)>) {
        match self {
            FormulaExpr::Function { name, args } => {
                out.push((name.as_str(), args.len()));
                for arg in args {
                    arg.collect_calls(out);
                }
            }
            FormulaExpr::BinaryOp { left, right, .. } => {
                left.collect_calls(out);
                right.collect_calls(out);
            }
            FormulaExpr::UnaryOp { operand, .. } => operand.collect_calls(out),
            FormulaExpr::Array(rows) => {
                for item in rows.iter().flatten() {
                    item.collect_calls(out);
                }
            }
            _ => {}
        }
    }
}
