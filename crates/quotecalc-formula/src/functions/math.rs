//! Math functions

use super::number_arg;
use crate::error::FormulaResult;
use crate::evaluator::{EvaluationContext, FormulaValue};
use quotecalc_core::CellError;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};

/// Numbers in the arguments, skipping text, booleans and blanks
///
/// The first error value found is returned instead.
pub(crate) fn collect_numbers(args: &[FormulaValue]) -> Result<Vec<f64>, CellError> {
    let mut numbers = Vec::new();
    for value in args.iter().flat_map(FormulaValue::scalars) {
        match value {
            FormulaValue::Number(n) => numbers.push(*n),
            FormulaValue::Error(e) => return Err(*e),
            _ => {}
        }
    }
    Ok(numbers)
}

fn aggregate(args: &[FormulaValue], f: impl FnOnce(Vec<f64>) -> FormulaValue) -> FormulaValue {
    match collect_numbers(args) {
        Ok(numbers) => f(numbers),
        Err(e) => FormulaValue::Error(e),
    }
}

/// SUM function
pub fn fn_sum(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(aggregate(args, |numbers| {
        FormulaValue::Number(numbers.iter().sum())
    }))
}

/// AVERAGE function
pub fn fn_average(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(aggregate(args, |numbers| {
        if numbers.is_empty() {
            FormulaValue::Error(CellError::Div0)
        } else {
            FormulaValue::Number(numbers.iter().sum::<f64>() / numbers.len() as f64)
        }
    }))
}

/// MIN function
pub fn fn_min(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(aggregate(args, |numbers| {
        FormulaValue::Number(numbers.into_iter().reduce(f64::min).unwrap_or(0.0))
    }))
}

/// MAX function
pub fn fn_max(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(aggregate(args, |numbers| {
        FormulaValue::Number(numbers.into_iter().reduce(f64::max).unwrap_or(0.0))
    }))
}

/// COUNT function
pub fn fn_count(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let count = args
        .iter()
        .flat_map(FormulaValue::scalars)
        .filter(|v| matches!(v, FormulaValue::Number(_)))
        .count();
    Ok(FormulaValue::Number(count as f64))
}

/// COUNTA function, counts every non-blank value including errors
pub fn fn_counta(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let count = args
        .iter()
        .flat_map(FormulaValue::scalars)
        .filter(|v| !matches!(v, FormulaValue::Empty))
        .count();
    Ok(FormulaValue::Number(count as f64))
}

/// ABS(number)
pub fn fn_abs(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(match number_arg(args, 0, None) {
        Ok(n) => FormulaValue::Number(n.abs()),
        Err(e) => e,
    })
}

/// Round `number` to `digits` decimal places with the given strategy
///
/// Rounding goes through `Decimal` so that values like 2.675 round as
/// written rather than as their binary approximation.
fn round_with(number: f64, digits: f64, strategy: RoundingStrategy) -> FormulaValue {
    let digits = digits.trunc() as i64;
    let Some(value) = Decimal::from_f64(number) else {
        // Outside Decimal's range the value has no fractional part left
        return FormulaValue::Number(number);
    };

    let rounded = if digits >= 0 {
        value.round_dp_with_strategy(digits.min(28) as u32, strategy)
    } else {
        // Beyond 10^28 nothing is left but zero
        let factor = u32::try_from(-digits)
            .ok()
            .and_then(|n| 10i128.checked_pow(n))
            .and_then(|f| Decimal::try_from_i128_with_scale(f, 0).ok());
        let Some(factor) = factor else {
            return FormulaValue::Number(0.0);
        };
        let rounded = value
            .checked_div(factor)
            .map(|scaled| scaled.round_dp_with_strategy(0, strategy))
            .and_then(|scaled| scaled.checked_mul(factor));
        match rounded {
            Some(r) => r,
            None => return FormulaValue::Error(CellError::Num),
        }
    };

    match rounded.to_f64() {
        Some(n) => FormulaValue::Number(n),
        None => FormulaValue::Error(CellError::Num),
    }
}

fn round_fn(args: &[FormulaValue], strategy: RoundingStrategy) -> FormulaValue {
    let number = match number_arg(args, 0, None) {
        Ok(n) => n,
        Err(e) => return e,
    };
    let digits = match number_arg(args, 1, None) {
        Ok(d) => d,
        Err(e) => return e,
    };
    round_with(number, digits, strategy)
}

/// ROUND(number, num_digits), half away from zero
pub fn fn_round(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(round_fn(args, RoundingStrategy::MidpointAwayFromZero))
}

/// ROUNDUP(number, num_digits), away from zero
pub fn fn_roundup(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(round_fn(args, RoundingStrategy::AwayFromZero))
}

/// ROUNDDOWN(number, num_digits), toward zero
pub fn fn_rounddown(
    args: &[FormulaValue],
    _ctx: &EvaluationContext,
) -> FormulaResult<FormulaValue> {
    Ok(round_fn(args, RoundingStrategy::ToZero))
}

/// INT(number), rounds down to the nearest integer
pub fn fn_int(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(match number_arg(args, 0, None) {
        Ok(n) => FormulaValue::Number(n.floor()),
        Err(e) => e,
    })
}

/// MOD(number, divisor), result has the sign of the divisor
pub fn fn_mod(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let number = match number_arg(args, 0, None) {
        Ok(n) => n,
        Err(e) => return Ok(e),
    };
    let divisor = match number_arg(args, 1, None) {
        Ok(d) => d,
        Err(e) => return Ok(e),
    };

    if divisor == 0.0 {
        return Ok(FormulaValue::Error(CellError::Div0));
    }
    Ok(FormulaValue::Number(number - divisor * (number / divisor).floor()))
}

/// POWER(number, power)
pub fn fn_power(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let base = match number_arg(args, 0, None) {
        Ok(n) => n,
        Err(e) => return Ok(e),
    };
    let exponent = match number_arg(args, 1, None) {
        Ok(n) => n,
        Err(e) => return Ok(e),
    };

    if base == 0.0 && exponent < 0.0 {
        return Ok(FormulaValue::Error(CellError::Div0));
    }
    let result = base.powf(exponent);
    if result.is_finite() {
        Ok(FormulaValue::Number(result))
    } else {
        Ok(FormulaValue::Error(CellError::Num))
    }
}

/// SUMPRODUCT(array1, [array2], ...)
///
/// All arrays must have the same shape. Non-numeric entries count as 0.
pub fn fn_sumproduct(
    args: &[FormulaValue],
    _ctx: &EvaluationContext,
) -> FormulaResult<FormulaValue> {
    let mut shape: Option<(usize, usize)> = None;
    let mut products: Vec<f64> = Vec::new();

    for arg in args {
        let rows: Vec<Vec<FormulaValue>> = match arg {
            FormulaValue::Error(e) => return Ok(FormulaValue::Error(*e)),
            FormulaValue::Array(rows) => rows.clone(),
            scalar => vec![vec![scalar.clone()]],
        };
        let dims = (rows.len(), rows.first().map_or(0, Vec::len));
        if rows.iter().any(|row| row.len() != dims.1) {
            return Ok(FormulaValue::Error(CellError::Value));
        }

        let mut values = Vec::with_capacity(dims.0 * dims.1);
        for value in rows.iter().flatten() {
            match value {
                FormulaValue::Number(n) => values.push(*n),
                FormulaValue::Error(e) => return Ok(FormulaValue::Error(*e)),
                _ => values.push(0.0),
            }
        }

        match shape {
            None => {
                shape = Some(dims);
                products = values;
            }
            Some(expected) if expected != dims => {
                return Ok(FormulaValue::Error(CellError::Value));
            }
            Some(_) => {
                for (acc, v) in products.iter_mut().zip(values) {
                    *acc *= v;
                }
            }
        }
    }

    Ok(FormulaValue::Number(products.iter().sum()))
}
