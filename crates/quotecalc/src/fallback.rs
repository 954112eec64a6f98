//! Direct reads used when an evaluation pass fails
//!
//! The fallback reader never evaluates anything. It returns whatever each
//! output cell holds: a literal, or the cached result a formula cell carries
//! from the last successful pass (or from the file it was loaded from).

use crate::extract::{read_outputs, Extraction, ExtractionMap, Provenance};
use quotecalc_core::Worksheet;

/// Read every bound output straight from the stored cells of `sheet`
pub fn read_direct(sheet: &Worksheet, map: &ExtractionMap) -> Extraction {
    tracing::warn!(
        "Reading outputs of {} without recalculation; values may be stale",
        sheet.name()
    );
    read_outputs(map, Provenance::Fallback, |address| {
        let (row, col) = address.key();
        sheet.get_calculated_value_at(row, col).cloned()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::Scale;
    use pretty_assertions::assert_eq;
    use quotecalc_core::{CellAddress, CellValue};

    #[test]
    fn test_reads_cached_formula_results() {
        let mut ws = Worksheet::new("FC");
        let vpl = CellValue::formula_with_cached("=NPV(DZ20,C30:DZ30)", CellValue::Number(987.0));
        let margin = CellValue::formula_with_cached("=B19/B13", CellValue::Number(0.05));
        ws.set_cell_value("B7", vpl).unwrap();
        ws.set_cell_value("B8", margin).unwrap();
        ws.set_cell_formula("B19", "=B13-B15").unwrap();

        let mut map = ExtractionMap::new();
        map.bind("vpl", CellAddress::parse("B7").unwrap(), Scale::Unit)
            .bind("margemPercentual", CellAddress::parse("B8").unwrap(), Scale::Percent)
            .bind("margem", CellAddress::parse("B19").unwrap(), Scale::Unit);

        let out = read_direct(&ws, &map);
        assert_eq!(out.value("vpl"), 987.0);
        assert!((out.value("margemPercentual") - 5.0).abs() < 1e-9);
        assert_eq!(out.value("margem"), 0.0);
        assert_eq!(out.defaulted, vec!["margem"]);
        assert!(out.is_degraded());
    }
}
