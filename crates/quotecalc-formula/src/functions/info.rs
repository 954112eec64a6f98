//! Information functions

use crate::error::FormulaResult;
use crate::evaluator::{EvaluationContext, FormulaValue};

/// ISBLANK(value)
pub fn fn_isblank(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Boolean(matches!(
        args[0].clone().into_scalar(),
        FormulaValue::Empty
    )))
}

/// ISNUMBER(value)
pub fn fn_isnumber(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Boolean(matches!(
        args[0].clone().into_scalar(),
        FormulaValue::Number(_)
    )))
}

/// ISERROR(value)
pub fn fn_iserror(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Boolean(args[0].clone().into_scalar().is_error()))
}

#[cfg(test)]
mod tests {
    use crate::evaluator::{evaluate, EvaluationContext, FormulaValue};
    use crate::parser::parse_formula;
    use quotecalc_core::Workbook;

    #[test]
    fn test_info_functions() {
        let mut wb = Workbook::empty();
        let index = wb.add_worksheet_with_name("FC").unwrap();
        wb.worksheet_mut(index).unwrap().set_cell_value("A1", 3.0).unwrap();
        let ctx = EvaluationContext::new(Some(&wb), index);
        let eval = |f: &str| evaluate(&parse_formula(f).unwrap(), &ctx).unwrap();

        assert_eq!(eval("=ISBLANK(A2)"), FormulaValue::Boolean(true));
        assert_eq!(eval("=ISBLANK(A1)"), FormulaValue::Boolean(false));
        assert_eq!(eval("=ISNUMBER(A1)"), FormulaValue::Boolean(true));
        assert_eq!(eval("=ISERROR(A1/A2)"), FormulaValue::Boolean(true));
        assert_eq!(eval("=ISERROR(A1)"), FormulaValue::Boolean(false));
    }
}
