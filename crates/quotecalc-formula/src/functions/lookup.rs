//! Lookup functions

use crate::error::FormulaResult;
use crate::evaluator::{compare_values, EvaluationContext, FormulaValue};
use quotecalc_core::CellError;
use std::cmp::Ordering;

fn rows_of(value: &FormulaValue) -> Vec<Vec<FormulaValue>> {
    match value {
        FormulaValue::Array(rows) => rows.clone(),
        scalar => vec![vec![scalar.clone()]],
    }
}

fn array_dims(rows: &[Vec<FormulaValue>]) -> (usize, usize) {
    (rows.len(), rows.first().map_or(0, Vec::len))
}

fn cell_at(rows: &[Vec<FormulaValue>], row: usize, col: usize) -> FormulaValue {
    rows.get(row)
        .and_then(|r| r.get(col))
        .cloned()
        .unwrap_or(FormulaValue::Error(CellError::Ref))
}

fn int_arg(value: &FormulaValue) -> Result<i64, CellError> {
    value.to_number().map(|n| n.trunc() as i64)
}

fn values_equal(a: &FormulaValue, b: &FormulaValue) -> bool {
    match (a, b) {
        (FormulaValue::Number(_), FormulaValue::String(_))
        | (FormulaValue::String(_), FormulaValue::Number(_)) => false,
        _ => compare_values(a, b) == Ordering::Equal,
    }
}

/// Position (0-based) of `needle` in `haystack`
///
/// `match_type` 0 is an exact match, 1 the largest value <= needle in an
/// ascending list, -1 the smallest value >= needle in a descending list.
fn find_position(needle: &FormulaValue, haystack: &[FormulaValue], match_type: i64) -> Option<usize> {
    if match_type == 0 {
        return haystack.iter().position(|v| values_equal(v, needle));
    }

    let mut found = None;
    for (i, v) in haystack.iter().enumerate() {
        if matches!(v, FormulaValue::Empty | FormulaValue::Error(_)) {
            continue;
        }
        let ordering = compare_values(v, needle);
        let accepted = if match_type > 0 {
            ordering != Ordering::Greater
        } else {
            ordering != Ordering::Less
        };
        if accepted {
            found = Some(i);
        } else {
            break;
        }
    }
    found
}

/// INDEX(array, row_num, [column_num])
///
/// On a single row, a lone index selects the column. Zero selects the
/// whole row or column.
pub fn fn_index(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    if let Some(e) = args.iter().find_map(FormulaValue::get_error) {
        return Ok(FormulaValue::Error(e));
    }

    let rows = rows_of(&args[0]);
    let (height, width) = array_dims(&rows);
    if height == 0 || width == 0 {
        return Ok(FormulaValue::Error(CellError::Ref));
    }

    let first = match int_arg(&args[1]) {
        Ok(n) => n,
        Err(e) => return Ok(FormulaValue::Error(e)),
    };
    let (row_num, col_num) = match args.get(2) {
        Some(v) => match int_arg(v) {
            Ok(c) => (first, c),
            Err(e) => return Ok(FormulaValue::Error(e)),
        },
        None if height == 1 => (1, first),
        None => (first, 1),
    };

    if row_num < 0 || col_num < 0 || row_num as usize > height || col_num as usize > width {
        return Ok(FormulaValue::Error(CellError::Ref));
    }

    Ok(match (row_num as usize, col_num as usize) {
        (0, 0) => FormulaValue::Array(rows),
        (0, c) => {
            FormulaValue::Array((0..height).map(|r| vec![cell_at(&rows, r, c - 1)]).collect())
        }
        (r, 0) => FormulaValue::Array(vec![rows[r - 1].clone()]),
        (r, c) => cell_at(&rows, r - 1, c - 1),
    })
}

/// MATCH(lookup_value, lookup_array, [match_type])
pub fn fn_match(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let needle = args[0].clone().into_scalar();
    if let FormulaValue::Error(e) = needle {
        return Ok(FormulaValue::Error(e));
    }

    let rows = rows_of(&args[1]);
    let (height, width) = array_dims(&rows);
    let haystack: Vec<FormulaValue> = if height == 1 {
        rows.into_iter().flatten().collect()
    } else if width == 1 {
        rows.into_iter()
            .map(|row| row.into_iter().next().unwrap_or(FormulaValue::Empty))
            .collect()
    } else {
        return Ok(FormulaValue::Error(CellError::Na));
    };

    let match_type = match args.get(2).map(int_arg).transpose() {
        Ok(m) => m.unwrap_or(1),
        Err(e) => return Ok(FormulaValue::Error(e)),
    };

    Ok(match find_position(&needle, &haystack, match_type.signum()) {
        Some(i) => FormulaValue::Number((i + 1) as f64),
        None => FormulaValue::Error(CellError::Na),
    })
}

/// VLOOKUP(lookup_value, table_array, col_index_num, [range_lookup])
pub fn fn_vlookup(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let needle = args[0].clone().into_scalar();
    if let FormulaValue::Error(e) = needle {
        return Ok(FormulaValue::Error(e));
    }
    if let Some(e) = args[1].get_error() {
        return Ok(FormulaValue::Error(e));
    }

    let rows = rows_of(&args[1]);
    let (_, width) = array_dims(&rows);
    let col = match int_arg(&args[2]) {
        Ok(c) => c,
        Err(e) => return Ok(FormulaValue::Error(e)),
    };
    if col < 1 {
        return Ok(FormulaValue::Error(CellError::Value));
    }
    if col as usize > width {
        return Ok(FormulaValue::Error(CellError::Ref));
    }

    let approximate = match args.get(3) {
        None => true,
        Some(FormulaValue::Error(e)) => return Ok(FormulaValue::Error(*e)),
        Some(v) => v.as_bool().unwrap_or(true),
    };

    let keys: Vec<FormulaValue> = rows
        .iter()
        .map(|row| row.first().cloned().unwrap_or(FormulaValue::Empty))
        .collect();
    let match_type = if approximate { 1 } else { 0 };

    Ok(match find_position(&needle, &keys, match_type) {
        Some(r) => cell_at(&rows, r, col as usize - 1),
        None => FormulaValue::Error(CellError::Na),
    })
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
    fn test_index() {
        assert_eq!(eval("=INDEX({1,2;3,4},2,1)"), FormulaValue::Number(3.0));
        assert_eq!(eval("=INDEX({10,20,30},2)"), FormulaValue::Number(20.0));
        assert_eq!(eval("=INDEX({10;20;30},3)"), FormulaValue::Number(30.0));
        assert_eq!(eval("=INDEX({1,2;3,4},3,1)"), FormulaValue::Error(CellError::Ref));
        assert_eq!(eval("=SUM(INDEX({1,2;3,4},0,2))"), FormulaValue::Number(6.0));
    }

    #[test]
    fn test_ragged_rows_never_index_out_of_bounds() {
        let ragged = FormulaValue::Array(vec![
            vec![FormulaValue::Number(1.0), FormulaValue::Number(2.0)],
            vec![FormulaValue::Number(3.0)],
        ]);
        let ctx = EvaluationContext::simple();
        let n = FormulaValue::Number;

        let index = super::fn_index(&[ragged.clone(), n(2.0), n(2.0)], &ctx).unwrap();
        assert_eq!(index, FormulaValue::Error(CellError::Ref));
        let vlookup =
            super::fn_vlookup(&[n(3.0), ragged.clone(), n(2.0), FormulaValue::Boolean(false)], &ctx)
                .unwrap();
        assert_eq!(vlookup, FormulaValue::Error(CellError::Ref));
        let column = super::fn_index(&[ragged, n(0.0), n(2.0)], &ctx).unwrap();
        assert_eq!(
            column,
            FormulaValue::Array(vec![vec![n(2.0)], vec![FormulaValue::Error(CellError::Ref)]])
        );
    }

    #[test]
    fn test_match() {
        assert_eq!(eval("=MATCH(\"b\",{\"A\",\"B\",\"C\"},0)"), FormulaValue::Number(2.0));
        assert_eq!(eval("=MATCH(25,{10,20,30})"), FormulaValue::Number(2.0));
        assert_eq!(eval("=MATCH(5,{10,20,30})"), FormulaValue::Error(CellError::Na));
        assert_eq!(eval("=MATCH(25,{30,20,10},-1)"), FormulaValue::Number(1.0));
        assert_eq!(eval("=MATCH(\"1\",{1,2},0)"), FormulaValue::Error(CellError::Na));
    }

    #[test]
    fn test_vlookup() {
        let table = "{\"Boleto\",0;\"Cartão\",0.035;\"Pix\",0.01}";
        assert_eq!(
            eval(&format!("=VLOOKUP(\"pix\",{table},2,FALSE)")),
            FormulaValue::Number(0.01)
        );
        assert_eq!(
            eval(&format!("=VLOOKUP(\"Dinheiro\",{table},2,FALSE)")),
            FormulaValue::Error(CellError::Na)
        );
        assert_eq!(
            eval(&format!("=VLOOKUP(\"Boleto\",{table},3,FALSE)")),
            FormulaValue::Error(CellError::Ref)
        );
        assert_eq!(
            eval("=VLOOKUP(15,{0,\"a\";10,\"b\";20,\"c\"},2)"),
            FormulaValue::String("b".into())
        );
    }
}
