//! Time-value-of-money functions
//!
//! Sign convention follows spreadsheets: money paid out is negative, so
//! `PV(10%, 1, 0, 110)` is `-100`.

use super::number_arg;
use crate::error::FormulaResult;
use crate::evaluator::{EvaluationContext, FormulaValue};
use quotecalc_core::CellError;

fn finite(n: f64) -> FormulaValue {
    if n.is_finite() {
        FormulaValue::Number(n)
    } else {
        FormulaValue::Error(CellError::Num)
    }
}

/// Shared arguments of PV / FV / PMT: rate, nper, third value, optional fourth, type
struct Annuity {
    rate: f64,
    nper: f64,
    a: f64,
    b: f64,
    /// 1 when payments fall at the start of each period
    due: f64,
}

impl Annuity {
    fn from_args(args: &[FormulaValue]) -> Result<Self, FormulaValue> {
        Ok(Self {
            rate: number_arg(args, 0, None)?,
            nper: number_arg(args, 1, None)?,
            a: number_arg(args, 2, None)?,
            b: number_arg(args, 3, Some(0.0))?,
            due: if number_arg(args, 4, Some(0.0))? != 0.0 { 1.0 } else { 0.0 },
        })
    }

    fn growth(&self) -> f64 {
        (1.0 + self.rate).powf(self.nper)
    }

    /// Value of one unit paid every period, compounded to the end
    fn annuity_factor(&self) -> f64 {
        (1.0 + self.rate * self.due) * (self.growth() - 1.0) / self.rate
    }
}

/// NPV(rate, value1, [value2], ...)
///
/// The first value is discounted one full period. Text and blanks inside
/// ranges are skipped without consuming a period.
pub fn fn_npv(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let rate = match number_arg(args, 0, None) {
        Ok(r) => r,
        Err(e) => return Ok(e),
    };
    if rate == -1.0 {
        return Ok(FormulaValue::Error(CellError::Div0));
    }

    let mut npv = 0.0;
    let mut period = 1;
    for arg in &args[1..] {
        let direct = !matches!(arg, FormulaValue::Array(_));
        for value in arg.scalars() {
            let amount = match value {
                FormulaValue::Number(n) => *n,
                FormulaValue::Error(e) => return Ok(FormulaValue::Error(*e)),
                other if direct => match other.to_number() {
                    Ok(n) => n,
                    Err(e) => return Ok(FormulaValue::Error(e)),
                },
                _ => continue,
            };
            npv += amount / (1.0 + rate).powi(period);
            period += 1;
        }
    }
    Ok(finite(npv))
}

/// PV(rate, nper, pmt, [fv], [type])
pub fn fn_pv(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let t = match Annuity::from_args(args) {
        Ok(t) => t,
        Err(e) => return Ok(e),
    };
    let (pmt, fv) = (t.a, t.b);

    if t.rate == 0.0 {
        return Ok(finite(-(fv + pmt * t.nper)));
    }
    Ok(finite(-(fv + pmt * t.annuity_factor()) / t.growth()))
}

/// FV(rate, nper, pmt, [pv], [type])
pub fn fn_fv(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let t = match Annuity::from_args(args) {
        Ok(t) => t,
        Err(e) => return Ok(e),
    };
    let (pmt, pv) = (t.a, t.b);

    if t.rate == 0.0 {
        return Ok(finite(-(pv + pmt * t.nper)));
    }
    Ok(finite(-(pv * t.growth() + pmt * t.annuity_factor())))
}

/// PMT(rate, nper, pv, [fv], [type])
pub fn fn_pmt(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let t = match Annuity::from_args(args) {
        Ok(t) => t,
        Err(e) => return Ok(e),
    };
    let (pv, fv) = (t.a, t.b);

    if t.nper == 0.0 {
        return Ok(FormulaValue::Error(CellError::Num));
    }
    if t.rate == 0.0 {
        return Ok(finite(-(pv + fv) / t.nper));
    }
    Ok(finite(-(pv * t.growth() + fv) / t.annuity_factor()))
}
