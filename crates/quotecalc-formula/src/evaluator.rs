//! Formula evaluator
//!
//! Evaluates an expression tree against a workbook. Referenced formula
//! cells are read through their cached value, so callers evaluate cells in
//! dependency order and store each result before moving on.

use crate::ast::{BinaryOperator, FormulaExpr, UnaryOperator};
use crate::error::FormulaResult;
use crate::functions::function_registry;
use quotecalc_core::{CellError, CellRange, CellValue, Workbook};
use std::cmp::Ordering;

/// Value produced while evaluating a formula
#[derive(Debug, Clone, PartialEq)]
pub enum FormulaValue {
    Number(f64),
    String(String),
    Boolean(bool),
    Error(CellError),
    /// Rows of values, from a range or an array constant
    Array(Vec<Vec<FormulaValue>>),
    /// A blank cell
    Empty,
}

impl FormulaValue {
    /// Numeric coercion used by operators: blanks are 0, numeric text is parsed
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FormulaValue::Number(n) => Some(*n),
            FormulaValue::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            FormulaValue::String(s) => s.trim().parse().ok(),
            FormulaValue::Empty => Some(0.0),
            FormulaValue::Array(rows) => match rows.as_slice() {
                [row] if row.len() == 1 => row[0].as_number(),
                _ => None,
            },
            FormulaValue::Error(_) => None,
        }
    }

    /// Number for an operator operand, or the error value the operator yields
    pub fn to_number(&self) -> Result<f64, CellError> {
        match self {
            FormulaValue::Error(e) => Err(*e),
            other => other.as_number().ok_or(CellError::Value),
        }
    }

    /// Logical coercion used by IF / AND / OR
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FormulaValue::Boolean(b) => Some(*b),
            FormulaValue::Number(n) => Some(*n != 0.0),
            FormulaValue::Empty => Some(false),
            FormulaValue::String(s) if s.eq_ignore_ascii_case("TRUE") => Some(true),
            FormulaValue::String(s) if s.eq_ignore_ascii_case("FALSE") => Some(false),
            _ => None,
        }
    }

    /// Text rendering used by `&`
    pub fn as_string(&self) -> String {
        match self {
            FormulaValue::Number(n) => format_number(*n),
            FormulaValue::String(s) => s.clone(),
            FormulaValue::Boolean(true) => "TRUE".to_string(),
            FormulaValue::Boolean(false) => "FALSE".to_string(),
            FormulaValue::Error(e) => e.to_string(),
            FormulaValue::Empty => String::new(),
            FormulaValue::Array(_) => CellError::Value.to_string(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, FormulaValue::Error(_))
    }

    pub fn get_error(&self) -> Option<CellError> {
        match self {
            FormulaValue::Error(e) => Some(*e),
            _ => None,
        }
    }

    /// Iterate over every scalar, flattening arrays row by row
    pub fn scalars(&self) -> Box<dyn Iterator<Item = &FormulaValue> + '_> {
        match self {
            FormulaValue::Array(rows) => Box::new(rows.iter().flatten()),
            other => Box::new(std::iter::once(other)),
        }
    }

    /// Reduce a 1x1 array to its element; other values are returned unchanged
    pub fn into_scalar(self) -> FormulaValue {
        match self {
            FormulaValue::Array(mut rows) if rows.len() == 1 && rows[0].len() == 1 => {
                rows.remove(0).remove(0)
            }
            other => other,
        }
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

impl From<&CellValue> for FormulaValue {
    fn from(value: &CellValue) -> Self {
        match value.effective_value() {
            CellValue::Empty | CellValue::Formula { .. } => FormulaValue::Empty,
            CellValue::Number(n) => FormulaValue::Number(*n),
            CellValue::String(s) => FormulaValue::String(s.as_str().to_string()),
            CellValue::Boolean(b) => FormulaValue::Boolean(*b),
            CellValue::Error(e) => FormulaValue::Error(*e),
        }
    }
}

impl From<CellValue> for FormulaValue {
    fn from(value: CellValue) -> Self {
        FormulaValue::from(&value)
    }
}

impl From<FormulaValue> for CellValue {
    fn from(value: FormulaValue) -> Self {
        match value.into_scalar() {
            // A formula that yields a blank stores 0, as spreadsheets display it
            FormulaValue::Empty => CellValue::Number(0.0),
            FormulaValue::Number(n) if !n.is_finite() => CellValue::Error(CellError::Num),
            FormulaValue::Number(n) => CellValue::Number(n),
            FormulaValue::String(s) => CellValue::string(s),
            FormulaValue::Boolean(b) => CellValue::Boolean(b),
            FormulaValue::Error(e) => CellValue::Error(e),
            FormulaValue::Array(_) => CellValue::Error(CellError::Value),
        }
    }
}

/// Where references resolve while evaluating a formula
pub struct EvaluationContext<'a> {
    /// Workbook for cell lookups; `None` makes every reference blank
    pub workbook: Option<&'a Workbook>,
    /// Sheet that unqualified references point at
    pub current_sheet: usize,
}

impl<'a> EvaluationContext<'a> {
    pub fn new(workbook: Option<&'a Workbook>, current_sheet: usize) -> Self {
        Self {
            workbook,
            current_sheet,
        }
    }

    /// Context without a workbook, for constant formulas
    pub fn simple() -> Self {
        Self::new(None, 0)
    }

    fn resolve_sheet(&self, sheet: Option<&str>) -> Option<&'a quotecalc_core::Worksheet> {
        let workbook = self.workbook?;
        let index = match sheet {
            Some(name) => workbook.sheet_index_ignore_case(name)?,
            None => self.current_sheet,
        };
        workbook.worksheet(index)
    }

    /// Value of one cell; a missing sheet is #REF!
    pub fn get_cell_value(&self, sheet: Option<&str>, row: u32, col: u16) -> FormulaValue {
        if self.workbook.is_none() {
            return FormulaValue::Empty;
        }
        match self.resolve_sheet(sheet) {
            Some(ws) => ws.cell_at(row, col).map(FormulaValue::from).unwrap_or(FormulaValue::Empty),
            None => FormulaValue::Error(CellError::Ref),
        }
    }

    /// Values of a rectangular range as rows; whole columns and rows stop
    /// at the sheet's declared range
    pub fn get_range_values(
        &self,
        sheet: Option<&str>,
        start_row: u32,
        start_col: u16,
        end_row: u32,
        end_col: u16,
    ) -> FormulaValue {
        if self.workbook.is_none() {
            return FormulaValue::Array(Vec::new());
        }
        let ws = match self.resolve_sheet(sheet) {
            Some(ws) => ws,
            None => return FormulaValue::Error(CellError::Ref),
        };
        let requested = CellRange::from_indices(start_row, start_col, end_row, end_col);
        let Some(range) = requested.bounded_by(ws.dimension().as_ref()) else {
            return FormulaValue::Array(Vec::new());
        };
        let (start_row, start_col) = (range.start.row, range.start.col);
        let (end_row, end_col) = (range.end.row, range.end.col);

        let rows = (start_row..=end_row)
            .map(|row| {
                (start_col..=end_col)
                    .map(|col| {
                        ws.cell_at(row, col)
                            .map(FormulaValue::from)
                            .unwrap_or(FormulaValue::Empty)
                    })
                    .collect()
            })
            .collect();
        FormulaValue::Array(rows)
    }
}

/// Evaluate a formula expression
///
/// Fails only for calls the registry rejects (unknown function, wrong
/// argument count). Everything else, including bad operand types, becomes
/// an error value.
pub fn evaluate(expr: &FormulaExpr, ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    match expr {
        FormulaExpr::Number(n) => Ok(FormulaValue::Number(*n)),
        FormulaExpr::String(s) => Ok(FormulaValue::String(s.clone())),
        FormulaExpr::Boolean(b) => Ok(FormulaValue::Boolean(*b)),
        FormulaExpr::Error(e) => Ok(FormulaValue::Error(*e)),

        FormulaExpr::CellRef(r) => {
            Ok(ctx.get_cell_value(r.sheet.as_deref(), r.address.row, r.address.col))
        }
        FormulaExpr::RangeRef(r) => Ok(ctx.get_range_values(
            r.sheet.as_deref(),
            r.range.start.row,
            r.range.start.col,
            r.range.end.row,
            r.range.end.col,
        )),
        FormulaExpr::NameRef(_) => Ok(FormulaValue::Error(CellError::Name)),

        FormulaExpr::BinaryOp { op, left, right } => {
            let left = evaluate(left, ctx)?;
            let right = evaluate(right, ctx)?;
            Ok(binary_op(*op, &left, &right))
        }
        FormulaExpr::UnaryOp { op, operand } => {
            let value = evaluate(operand, ctx)?;
            Ok(broadcast1(&value, |v| unary_scalar(*op, v)))
        }

        FormulaExpr::Function { name, args } => {
            let def = function_registry().check_call(name, args.len())?;
            let values = args
                .iter()
                .map(|arg| evaluate(arg, ctx))
                .collect::<FormulaResult<Vec<_>>>()?;
            (def.implementation)(&values, ctx)
        }

        FormulaExpr::Array(rows) => {
            let rows = rows
                .iter()
                .map(|row| {
                    row.iter()
                        .map(|item| evaluate(item, ctx).map(FormulaValue::into_scalar))
                        .collect::<FormulaResult<Vec<_>>>()
                })
                .collect::<FormulaResult<Vec<_>>>()?;
            Ok(FormulaValue::Array(rows))
        }
    }
}

fn unary_scalar(op: UnaryOperator, value: &FormulaValue) -> FormulaValue {
    match value.to_number() {
        Ok(n) => match op {
            UnaryOperator::Negate => FormulaValue::Number(-n),
            UnaryOperator::Percent => FormulaValue::Number(n / 100.0),
        },
        Err(e) => FormulaValue::Error(e),
    }
}

/// Apply an operator; array operands are combined element-wise
pub fn binary_op(op: BinaryOperator, left: &FormulaValue, right: &FormulaValue) -> FormulaValue {
    if op == BinaryOperator::Range {
        return FormulaValue::Error(CellError::Value);
    }
    broadcast2(left, right, |l, r| binary_scalar(op, l, r))
}

fn binary_scalar(op: BinaryOperator, left: &FormulaValue, right: &FormulaValue) -> FormulaValue {
    if let Some(e) = left.get_error().or_else(|| right.get_error()) {
        return FormulaValue::Error(e);
    }

    match op {
        BinaryOperator::Add
        | BinaryOperator::Subtract
        | BinaryOperator::Multiply
        | BinaryOperator::Divide
        | BinaryOperator::Power => {
            let (l, r) = match (left.to_number(), right.to_number()) {
                (Ok(l), Ok(r)) => (l, r),
                (Err(e), _) | (_, Err(e)) => return FormulaValue::Error(e),
            };
            let result = match op {
                BinaryOperator::Add => l + r,
                BinaryOperator::Subtract => l - r,
                BinaryOperator::Multiply => l * r,
                BinaryOperator::Divide if r == 0.0 => return FormulaValue::Error(CellError::Div0),
                BinaryOperator::Divide => l / r,
                _ if l == 0.0 && r < 0.0 => return FormulaValue::Error(CellError::Div0),
                _ => l.powf(r),
            };
            if result.is_finite() {
                FormulaValue::Number(result)
            } else {
                FormulaValue::Error(CellError::Num)
            }
        }

        BinaryOperator::Equal => FormulaValue::Boolean(compare_values(left, right).is_eq()),
        BinaryOperator::NotEqual => FormulaValue::Boolean(compare_values(left, right).is_ne()),
        BinaryOperator::LessThan => FormulaValue::Boolean(compare_values(left, right).is_lt()),
        BinaryOperator::LessEqual => FormulaValue::Boolean(compare_values(left, right).is_le()),
        BinaryOperator::GreaterThan => FormulaValue::Boolean(compare_values(left, right).is_gt()),
        BinaryOperator::GreaterEqual => {
            FormulaValue::Boolean(compare_values(left, right).is_ge())
        }

        BinaryOperator::Concat => FormulaValue::String(left.as_string() + &right.as_string()),

        BinaryOperator::Range => FormulaValue::Error(CellError::Value),
    }
}

/// Spreadsheet ordering: numbers < text < booleans, text compared case-insensitively
///
/// A blank takes the type of the other side (0, "" or FALSE).
pub fn compare_values(left: &FormulaValue, right: &FormulaValue) -> Ordering {
    fn blank_like(other: &FormulaValue) -> FormulaValue {
        match other {
            FormulaValue::String(_) => FormulaValue::String(String::new()),
            FormulaValue::Boolean(_) => FormulaValue::Boolean(false),
            _ => FormulaValue::Number(0.0),
        }
    }
    fn rank(v: &FormulaValue) -> u8 {
        match v {
            FormulaValue::Number(_) | FormulaValue::Empty => 0,
            FormulaValue::String(_) => 1,
            FormulaValue::Boolean(_) => 2,
            FormulaValue::Error(_) | FormulaValue::Array(_) => 3,
        }
    }

    let left_owned;
    let right_owned;
    let (left, right) = match (left, right) {
        (FormulaValue::Empty, r) => {
            left_owned = blank_like(r);
            (&left_owned, r)
        }
        (l, FormulaValue::Empty) => {
            right_owned = blank_like(l);
            (l, &right_owned)
        }
        pair => pair,
    };

    match (left, right) {
        (FormulaValue::Number(l), FormulaValue::Number(r)) => {
            l.partial_cmp(r).unwrap_or(Ordering::Equal)
        }
        (FormulaValue::String(l), FormulaValue::String(r)) => {
            l.to_lowercase().cmp(&r.to_lowercase())
        }
        (FormulaValue::Boolean(l), FormulaValue::Boolean(r)) => l.cmp(r),
        (l, r) => rank(l).cmp(&rank(r)),
    }
}

fn broadcast1(value: &FormulaValue, f: impl Fn(&FormulaValue) -> FormulaValue) -> FormulaValue {
    match value {
        FormulaValue::Array(rows) => FormulaValue::Array(
            rows.iter().map(|row| row.iter().map(&f).collect()).collect(),
        ),
        scalar => f(scalar),
    }
}

fn broadcast2(
    left: &FormulaValue,
    right: &FormulaValue,
    f: impl Fn(&FormulaValue, &FormulaValue) -> FormulaValue,
) -> FormulaValue {
    fn dims(rows: &[Vec<FormulaValue>]) -> (usize, usize) {
        (rows.len(), rows.first().map_or(0, Vec::len))
    }
    fn at(rows: &[Vec<FormulaValue>], r: usize, c: usize) -> &FormulaValue {
        let (h, w) = dims(rows);
        // A single row or column stretches along the other axis
        let r = if h == 1 { 0 } else { r };
        let c = if w == 1 { 0 } else { c };
        const NA: &FormulaValue = &FormulaValue::Error(CellError::Na);
        rows.get(r).and_then(|row| row.get(c)).unwrap_or(NA)
    }

    match (left, right) {
        (FormulaValue::Array(l), FormulaValue::Array(r)) => {
            let (lh, lw) = dims(l);
            let (rh, rw) = dims(r);
            let (h, w) = (lh.max(rh), lw.max(rw));
            FormulaValue::Array(
                (0..h)
                    .map(|i| (0..w).map(|j| f(at(l, i, j), at(r, i, j))).collect())
                    .collect(),
            )
        }
        (FormulaValue::Array(l), scalar) => FormulaValue::Array(
            l.iter()
                .map(|row| row.iter().map(|v| f(v, scalar)).collect())
                .collect(),
        ),
        (scalar, FormulaValue::Array(r)) => FormulaValue::Array(
            r.iter()
                .map(|row| row.iter().map(|v| f(scalar, v)).collect())
                .collect(),
        ),
        (l, r) => f(l, r),
    }
}
