//! Result extraction
//!
//! Reads named outputs from fixed coordinates. Extraction never fails: a
//! value that is missing, an error or not a number reads as `0` and the
//! output is listed in [`Extraction::defaulted`].

use crate::calculation::EvaluatedTable;
use quotecalc_core::{CellAddress, CellValue};
use std::collections::BTreeMap;

/// Unit conversion applied when an output is read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Scale {
    /// Value as stored
    #[default]
    Unit,
    /// Stored fraction, reported as a percentage (×100)
    Percent,
}

impl Scale {
    pub fn apply(self, value: f64) -> f64 {
        match self {
            Scale::Unit => value,
            Scale::Percent => value * 100.0,
        }
    }
}

/// One named output and where it lives
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OutputBinding {
    pub name: String,
    pub address: CellAddress,
    #[cfg_attr(feature = "serde", serde(default))]
    pub scale: Scale,
}

/// Output name -> coordinate bindings, in reporting order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct ExtractionMap {
    bindings: Vec<OutputBinding>,
}

impl ExtractionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind an output; binding a name again replaces it
    pub fn bind<S: Into<String>>(
        &mut self,
        name: S,
        address: CellAddress,
        scale: Scale,
    ) -> &mut Self {
        let binding = OutputBinding {
            name: name.into(),
            address,
            scale,
        };
        match self.bindings.iter_mut().find(|b| b.name == binding.name) {
            Some(existing) => *existing = binding,
            None => self.bindings.push(binding),
        }
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &OutputBinding> {
        self.bindings.iter()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// Which path produced an [`Extraction`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Provenance {
    /// Read from a fresh evaluation pass
    Evaluated,
    /// Read from stored values after a failed pass
    Fallback,
}

/// Numeric outputs keyed by name
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Extraction {
    pub values: BTreeMap<String, f64>,
    /// Outputs that read as 0 because their cell held no usable number
    pub defaulted: Vec<String>,
    pub provenance: Provenance,
}

impl Extraction {
    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    /// Value of an output, `0` when the name is not bound
    pub fn value(&self, name: &str) -> f64 {
        self.get(name).unwrap_or(0.0)
    }

    pub fn is_degraded(&self) -> bool {
        self.provenance == Provenance::Fallback
    }
}

/// Read every bound output from an evaluated table
pub fn extract(table: &EvaluatedTable, map: &ExtractionMap) -> Extraction {
    read_outputs(map, Provenance::Evaluated, |address| {
        let (row, col) = address.key();
        table.value_at(row, col).cloned()
    })
}

pub(crate) fn read_outputs<F>(
    map: &ExtractionMap,
    provenance: Provenance,
    lookup: F,
) -> Extraction
where
    F: Fn(&CellAddress) -> Option<CellValue>,
{
    let mut values = BTreeMap::new();
    let mut defaulted = Vec::new();

    for binding in map.iter() {
        let number = match lookup(&binding.address) {
            Some(CellValue::Number(n)) if n.is_finite() => Some(n),
            _ => None,
        };
        let value = match number {
            Some(n) => binding.scale.apply(n),
            None => {
                tracing::warn!(
                    "Output {} at {} has no numeric value, using 0",
                    binding.name,
                    binding.address
                );
                defaulted.push(binding.name.clone());
                0.0
            }
        };
        values.insert(binding.name.clone(), value);
    }

    Extraction {
        values,
        defaulted,
        provenance,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculation::evaluate_sheet;
    use pretty_assertions::assert_eq;
    use quotecalc_core::Workbook;

    fn addr(a1: &str) -> CellAddress {
        CellAddress::parse(a1).unwrap()
    }

    fn table(cells: &[(&str, CellValue)]) -> EvaluatedTable {
        let mut wb = Workbook::empty();
        let index = wb.add_worksheet_with_name("FC").unwrap();
        let ws = wb.worksheet_mut(index).unwrap();
        for (a1, value) in cells {
            ws.set_cell_value(a1, value.clone()).unwrap();
        }
        evaluate_sheet(&mut wb, "FC").unwrap()
    }

    #[test]
    fn test_units_and_percent() {
        let t = table(&[
            ("B7", CellValue::Number(1234.5)),
            ("B8", CellValue::Number(0.0422)),
        ]);
        let mut map = ExtractionMap::new();
        map.bind("vpl", addr("B7"), Scale::Unit)
            .bind("margemPercentual", addr("B8"), Scale::Percent);

        let out = extract(&t, &map);
        assert_eq!(out.get("vpl"), Some(1234.5));
        assert!((out.value("margemPercentual") - 4.22).abs() < 1e-9);
        assert!(out.defaulted.is_empty());
        assert_eq!(out.provenance, Provenance::Evaluated);
    }

    #[test]
    fn test_unusable_values_default_to_zero() {
        let t = table(&[
            ("B7", CellValue::Error(quotecalc_core::CellError::Div0)),
            ("B8", CellValue::string("n/a")),
            ("B9", CellValue::Boolean(true)),
        ]);
        let mut map = ExtractionMap::new();
        map.bind("vpl", addr("B7"), Scale::Unit)
            .bind("margemPercentual", addr("B8"), Scale::Percent)
            .bind("flag", addr("B9"), Scale::Unit)
            .bind("margem", addr("B19"), Scale::Unit);

        let out = extract(&t, &map);
        assert_eq!(out.value("vpl"), 0.0);
        assert_eq!(out.value("margemPercentual"), 0.0);
        assert_eq!(out.value("flag"), 0.0);
        assert_eq!(out.value("margem"), 0.0);
        assert_eq!(out.defaulted, vec!["vpl", "margemPercentual", "flag", "margem"]);
    }

    #[test]
    fn test_rebinding_replaces() {
        let mut map = ExtractionMap::new();
        map.bind("vpl", addr("B7"), Scale::Unit)
            .bind("vpl", addr("C7"), Scale::Unit);
        assert_eq!(map.len(), 1);
        assert_eq!(map.iter().next().unwrap().address, addr("C7"));
    }
}
