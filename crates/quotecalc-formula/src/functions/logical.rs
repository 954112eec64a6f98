//! Logical functions

use crate::error::FormulaResult;
use crate::evaluator::{EvaluationContext, FormulaValue};
use quotecalc_core::CellError;

fn condition(value: &FormulaValue) -> Result<bool, CellError> {
    match value.clone().into_scalar() {
        FormulaValue::Error(e) => Err(e),
        scalar => scalar.as_bool().ok_or(CellError::Value),
    }
}

/// IF(condition, value_if_true, [value_if_false])
///
/// Both branches are already evaluated; an error in the branch not taken
/// does not reach the result.
pub fn fn_if(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(match condition(&args[0]) {
        Ok(true) => args[1].clone(),
        Ok(false) => args.get(2).cloned().unwrap_or(FormulaValue::Boolean(false)),
        Err(e) => FormulaValue::Error(e),
    })
}

/// IFERROR(value, value_if_error)
pub fn fn_iferror(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(if args[0].is_error() {
        args[1].clone()
    } else {
        args[0].clone()
    })
}

fn fold_logical(args: &[FormulaValue], short_circuit: bool) -> FormulaValue {
    let mut seen = false;
    for value in args.iter().flat_map(FormulaValue::scalars) {
        let b = match value {
            FormulaValue::Error(e) => return FormulaValue::Error(*e),
            FormulaValue::Boolean(b) => *b,
            FormulaValue::Number(n) => *n != 0.0,
            // Text and blanks inside ranges are skipped
            _ => continue,
        };
        seen = true;
        if b == short_circuit {
            return FormulaValue::Boolean(short_circuit);
        }
    }
    if seen {
        FormulaValue::Boolean(!short_circuit)
    } else {
        FormulaValue::Error(CellError::Value)
    }
}

/// AND(logical1, ...)
pub fn fn_and(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(fold_logical(args, false))
}

/// OR(logical1, ...)
pub fn fn_or(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(fold_logical(args, true))
}

/// NOT(logical)
pub fn fn_not(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(match condition(&args[0]) {
        Ok(b) => FormulaValue::Boolean(!b),
        Err(e) => FormulaValue::Error(e),
    })
}

/// TRUE()
pub fn fn_true(_args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Boolean(true))
}

/// FALSE()
pub fn fn_false(_args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Boolean(false))
}

#[cfg(test)]
mod tests {
    use crate::evaluator::{evaluate, EvaluationContext, FormulaValue};
    use crate::parser::parse_formula;
    use quotecalc_core::CellError;

    fn eval(formula: &str) -> FormulaValue {
        let ast = parse_formula(formula).unwrap();
        evaluate(&ast, &EvaluationContext::simple()).unwrap()
    }

    #[test]
    fn test_if() {
        assert_eq!(eval("=IF(1>0,\"sim\",\"não\")"), FormulaValue::String("sim".into()));
        assert_eq!(eval("=IF(0,1)"), FormulaValue::Boolean(false));
        assert_eq!(eval("=IF(0=0,0,1/0)"), FormulaValue::Number(0.0));
        assert_eq!(eval("=IF(\"x\",1,2)"), FormulaValue::Error(CellError::Value));
        assert_eq!(eval("=IF(#N/A,1,2)"), FormulaValue::Error(CellError::Na));
    }

    #[test]
    fn test_iferror() {
        assert_eq!(eval("=IFERROR(1/0,0)"), FormulaValue::Number(0.0));
        assert_eq!(eval("=IFERROR(5,0)"), FormulaValue::Number(5.0));
    }

    #[test]
    fn test_and_or_not() {
        assert_eq!(eval("=AND(TRUE,1,{1,\"x\"})"), FormulaValue::Boolean(true));
        assert_eq!(eval("=AND(TRUE,0)"), FormulaValue::Boolean(false));
        assert_eq!(eval("=OR(FALSE,0,2)"), FormulaValue::Boolean(true));
        assert_eq!(eval("=OR({\"x\"})"), FormulaValue::Error(CellError::Value));
        assert_eq!(eval("=NOT(TRUE())"), FormulaValue::Boolean(false));
        assert_eq!(eval("=NOT(FALSE())"), FormulaValue::Boolean(true));
    }
}
