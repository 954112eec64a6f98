//! Criteria matching for SUMIF and COUNTIF
//!
//! A criterion is one of:
//! - a number or boolean, matched exactly against numeric cells
//! - a comparison such as `">0"`, `"<>Rateio"` or `"=5"`
//! - text, matched case-insensitively with `*` / `?` wildcards (`~` escapes)
//! - an empty string, matching blank cells

use crate::error::FormulaResult;
use crate::evaluator::{compare_values, EvaluationContext, FormulaValue};
use lazy_regex::regex_captures;
use quotecalc_core::CellError;
use regex::Regex;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ComparisonOp {
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
}

impl ComparisonOp {
    fn parse(op: &str) -> Option<Self> {
        Some(match op {
            "=" => ComparisonOp::Equal,
            "<>" => ComparisonOp::NotEqual,
            "<" => ComparisonOp::LessThan,
            "<=" => ComparisonOp::LessEqual,
            ">" => ComparisonOp::GreaterThan,
            ">=" => ComparisonOp::GreaterEqual,
            _ => return None,
        })
    }

    fn accepts(self, ordering: Ordering) -> bool {
        match self {
            ComparisonOp::Equal => ordering.is_eq(),
            ComparisonOp::NotEqual => ordering.is_ne(),
            ComparisonOp::LessThan => ordering.is_lt(),
            ComparisonOp::LessEqual => ordering.is_le(),
            ComparisonOp::GreaterThan => ordering.is_gt(),
            ComparisonOp::GreaterEqual => ordering.is_ge(),
        }
    }
}

#[derive(Debug)]
enum CriteriaType {
    /// Numeric comparison; bare numbers use `Equal`
    Number(ComparisonOp, f64),
    /// Text equality or inequality, possibly with wildcards
    Text { negate: bool, pattern: Regex },
    /// Text ordering such as `">M"`
    TextOrder(ComparisonOp, String),
    /// Blank cells (`""` or `"="`); `"<>"` selects non-blank cells
    Blank { negate: bool },
    /// Criterion that matches nothing (an error value)
    Nothing,
}

/// Criteria matcher for SUMIF / COUNTIF
#[derive(Debug)]
pub struct CriteriaMatcher {
    criteria_type: CriteriaType,
}

impl CriteriaMatcher {
    pub fn new(criteria: &FormulaValue) -> Self {
        let criteria_type = match criteria.clone().into_scalar() {
            FormulaValue::Number(n) => CriteriaType::Number(ComparisonOp::Equal, n),
            FormulaValue::Boolean(b) => {
                CriteriaType::Number(ComparisonOp::Equal, if b { 1.0 } else { 0.0 })
            }
            FormulaValue::String(s) => Self::parse_string_criteria(&s),
            FormulaValue::Empty => CriteriaType::Blank { negate: false },
            FormulaValue::Error(_) | FormulaValue::Array(_) => CriteriaType::Nothing,
        };
        Self { criteria_type }
    }

    fn parse_string_criteria(s: &str) -> CriteriaType {
        let (op, operand) = match regex_captures!(r"^(<>|>=|<=|=|<|>)?(.*)$"s, s) {
            Some((_, op, operand)) => (ComparisonOp::parse(op), operand),
            None => (None, s),
        };

        if operand.is_empty() {
            return match op {
                Some(ComparisonOp::NotEqual) => CriteriaType::Blank { negate: true },
                None | Some(ComparisonOp::Equal) => CriteriaType::Blank { negate: false },
                Some(_) => CriteriaType::Nothing,
            };
        }

        if let Ok(n) = operand.trim().parse::<f64>() {
            return CriteriaType::Number(op.unwrap_or(ComparisonOp::Equal), n);
        }

        let negate = match op {
            None | Some(ComparisonOp::Equal) => false,
            Some(ComparisonOp::NotEqual) => true,
            Some(op) => return CriteriaType::TextOrder(op, operand.to_string()),
        };
        match wildcard_regex(operand) {
            Ok(pattern) => CriteriaType::Text { negate, pattern },
            Err(_) => CriteriaType::Nothing,
        }
    }

    /// Check if a value matches the criteria
    pub fn matches(&self, value: &FormulaValue) -> bool {
        match &self.criteria_type {
            CriteriaType::Number(op, criteria_num) => {
                let n = match value {
                    FormulaValue::Number(n) => *n,
                    FormulaValue::String(s) if *op == ComparisonOp::Equal => {
                        match s.trim().parse::<f64>() {
                            Ok(n) => n,
                            Err(_) => return false,
                        }
                    }
                    // Anything non-numeric differs from a number
                    _ => return *op == ComparisonOp::NotEqual,
                };
                let ordering = if (n - criteria_num).abs() < 1e-10 {
                    Ordering::Equal
                } else {
                    n.partial_cmp(criteria_num).unwrap_or(Ordering::Equal)
                };
                op.accepts(ordering)
            }

            CriteriaType::Text { negate, pattern } => {
                let matched = match value {
                    FormulaValue::String(s) => pattern.is_match(s),
                    _ => false,
                };
                matched != *negate
            }

            CriteriaType::TextOrder(op, text) => match value {
                FormulaValue::String(_) => {
                    op.accepts(compare_values(value, &FormulaValue::String(text.clone())))
                }
                _ => false,
            },

            CriteriaType::Blank { negate } => {
                let blank = match value {
                    FormulaValue::Empty => true,
                    FormulaValue::String(s) => s.is_empty(),
                    _ => false,
                };
                blank != *negate
            }

            CriteriaType::Nothing => false,
        }
    }
}

/// Case-insensitive anchored regex for a wildcard pattern
fn wildcard_regex(pattern: &str) -> Result<Regex, regex::Error> {
    let mut source = String::from("(?is)^");
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '*' => source.push_str(".*"),
            '?' => source.push('.'),
            '~' => match chars.next() {
                Some(escaped) => source.push_str(&regex::escape(&escaped.to_string())),
                None => source.push_str(&regex::escape("~")),
            },
            other => source.push_str(&regex::escape(&other.to_string())),
        }
    }
    source.push('$');
    Regex::new(&source)
}

fn criteria_pairs<'a>(
    range: &'a FormulaValue,
    sum_range: &'a FormulaValue,
) -> Result<Vec<(&'a FormulaValue, &'a FormulaValue)>, CellError> {
    fn rows_of(value: &FormulaValue) -> Vec<Vec<&FormulaValue>> {
        match value {
            FormulaValue::Array(rows) => rows.iter().map(|row| row.iter().collect()).collect(),
            scalar => vec![vec![scalar]],
        }
    }
    if let Some(e) = range.get_error() {
        return Err(e);
    }

    // The sum range takes the shape of the criteria range, anchored at its top-left cell
    let criteria_rows = rows_of(range);
    let sum_rows = rows_of(sum_range);
    let mut pairs = Vec::new();
    for (r, row) in criteria_rows.iter().enumerate() {
        for (c, value) in row.iter().enumerate() {
            const EMPTY: &FormulaValue = &FormulaValue::Empty;
            let summed = sum_rows.get(r).and_then(|sr| sr.get(c)).copied().unwrap_or(EMPTY);
            pairs.push((*value, summed));
        }
    }
    Ok(pairs)
}

/// SUMIF(range, criteria, [sum_range])
pub fn fn_sumif(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let range = &args[0];
    let matcher = CriteriaMatcher::new(&args[1]);
    let sum_range = args.get(2).unwrap_or(range);

    let pairs = match criteria_pairs(range, sum_range) {
        Ok(pairs) => pairs,
        Err(e) => return Ok(FormulaValue::Error(e)),
    };

    let mut sum = 0.0;
    for (candidate, summed) in pairs {
        if !matcher.matches(candidate) {
            continue;
        }
        match summed {
            FormulaValue::Number(n) => sum += n,
            FormulaValue::Error(e) => return Ok(FormulaValue::Error(*e)),
            _ => {}
        }
    }
    Ok(FormulaValue::Number(sum))
}

/// COUNTIF(range, criteria)
pub fn fn_countif(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let range = &args[0];
    if let Some(e) = range.get_error() {
        return Ok(FormulaValue::Error(e));
    }
    let matcher = CriteriaMatcher::new(&args[1]);
    let count = range.scalars().filter(|v| matcher.matches(v)).count();
    Ok(FormulaValue::Number(count as f64))
}
