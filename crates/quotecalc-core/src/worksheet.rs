//! Worksheet type

use crate::cell::{CellAddress, CellRange, CellStorage, CellValue};
use crate::error::{Error, Result};
use crate::{MAX_COLS, MAX_ROWS};

/// A single sheet: a name, sparse cells and the declared occupied range
///
/// The declared range (`dimension`) only ever grows. Writing a non-empty
/// value outside it expands it; clearing cells leaves it untouched. Sheets
/// loaded from a file start with the range recorded in the file, which may
/// be wider than the cells actually present.
#[derive(Debug, Clone)]
pub struct Worksheet {
    name: String,
    cells: CellStorage,
    dimension: Option<CellRange>,
}

impl Worksheet {
    /// Create an empty worksheet
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            cells: CellStorage::new(),
            dimension: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name<S: Into<String>>(&mut self, name: S) {
        self.name = name.into();
    }

    // === Declared range ===

    /// Declared occupied range, `None` for a sheet that never held a value
    pub fn dimension(&self) -> Option<CellRange> {
        self.dimension
    }

    /// Merge a declared range (e.g. one read from a file) into the current one
    pub fn declare_dimension(&mut self, range: CellRange) {
        let range = CellRange::from_indices(
            range.start.row,
            range.start.col,
            range.end.row,
            range.end.col,
        );
        self.dimension = Some(match self.dimension {
            Some(current) => current.union(&range),
            None => range,
        });
    }

    fn expand_dimension(&mut self, row: u32, col: u16) {
        self.dimension = Some(match self.dimension {
            Some(current) if current.contains(row, col) => current,
            Some(current) => current.expanded_to(row, col),
            None => CellRange::from_indices(row, col, row, col),
        });
    }

    /// Bounds of the cells actually stored
    pub fn used_range(&self) -> Option<CellRange> {
        self.cells
            .used_bounds()
            .map(|(min_row, min_col, max_row, max_col)| {
                CellRange::from_indices(min_row, min_col, max_row, max_col)
            })
    }

    // === Cell access ===

    /// Stored value by address string (e.g. "B13"); missing cells read as empty
    pub fn get_value(&self, address: &str) -> Result<CellValue> {
        let addr = CellAddress::parse(address)?;
        Ok(self.get_value_at(addr.row, addr.col))
    }

    /// Stored value by 0-based indices; missing cells read as empty
    pub fn get_value_at(&self, row: u32, col: u16) -> CellValue {
        self.cells.get(row, col).cloned().unwrap_or_default()
    }

    /// Borrow the stored value, if the cell exists
    pub fn cell_at(&self, row: u32, col: u16) -> Option<&CellValue> {
        self.cells.get(row, col)
    }

    // === Cell modification ===

    /// Set a cell value by address string
    pub fn set_cell_value<V: Into<CellValue>>(&mut self, address: &str, value: V) -> Result<()> {
        let addr = CellAddress::parse(address)?;
        self.set_cell_value_at(addr.row, addr.col, value)?;
        Ok(())
    }

    /// Set a cell value by 0-based indices, returning the previous value
    pub fn set_cell_value_at<V: Into<CellValue>>(
        &mut self,
        row: u32,
        col: u16,
        value: V,
    ) -> Result<Option<CellValue>> {
        validate_cell_position(row, col)?;
        let value = value.into();
        if !value.is_empty() {
            self.expand_dimension(row, col);
        }
        Ok(self.cells.set(row, col, value))
    }

    /// Set a cell formula by address string; a missing `=` is added
    pub fn set_cell_formula(&mut self, address: &str, formula: &str) -> Result<()> {
        let addr = CellAddress::parse(address)?;
        self.set_cell_value_at(addr.row, addr.col, CellValue::formula(formula))?;
        Ok(())
    }

    /// Remove a cell; the declared range does not shrink
    pub fn clear_cell(&mut self, address: &str) -> Result<Option<CellValue>> {
        let addr = CellAddress::parse(address)?;
        Ok(self.cells.remove(addr.row, addr.col))
    }

    /// Remove a cell by indices; the declared range does not shrink
    pub fn clear_cell_at(&mut self, row: u32, col: u16) -> Option<CellValue> {
        self.cells.remove(row, col)
    }

    // === Iteration ===

    pub fn cell_count(&self) -> usize {
        self.cells.cell_count()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Iterate over all stored cells in row-major order
    pub fn iter_cells(&self) -> impl Iterator<Item = (u32, u16, &CellValue)> {
        self.cells.iter()
    }

    /// Iterate over the stored cells of one row
    pub fn iter_row(&self, row: u32) -> impl Iterator<Item = (u16, &CellValue)> {
        self.cells.iter_row(row)
    }

    /// Iterate over the stored cells inside a range
    pub fn iter_range(&self, range: &CellRange) -> impl Iterator<Item = (u32, u16, &CellValue)> {
        self.cells
            .iter_within(range.start.row, range.start.col, range.end.row, range.end.col)
    }

    // === Formula support ===

    /// Iterate over all formula cells: (row, col, formula_text)
    pub fn formula_cells(&self) -> impl Iterator<Item = (u32, u16, &str)> {
        self.cells
            .iter()
            .filter_map(|(row, col, value)| value.formula_text().map(|text| (row, col, text)))
    }

    /// Formula cells inside the declared range
    pub fn declared_formula_cells(&self) -> Vec<(u32, u16, &str)> {
        match self.dimension {
            Some(range) => self
                .iter_range(&range)
                .filter_map(|(row, col, value)| value.formula_text().map(|t| (row, col, t)))
                .collect(),
            None => Vec::new(),
        }
    }

    /// Formula text at a position
    pub fn get_formula_at(&self, row: u32, col: u16) -> Option<&str> {
        self.cells.get(row, col).and_then(CellValue::formula_text)
    }

    /// Overwrite the cached result of a formula cell, keeping its text
    pub fn set_formula_result(&mut self, row: u32, col: u16, value: CellValue) -> Result<()> {
        match self.cells.get_mut(row, col) {
            Some(CellValue::Formula { cached_value, .. }) => {
                *cached_value = Some(Box::new(value));
                Ok(())
            }
            _ => Err(Error::NotAFormula(
                CellAddress::new(row, col).to_a1_string(),
            )),
        }
    }

    /// Cached result for formula cells, the stored value otherwise
    pub fn get_calculated_value_at(&self, row: u32, col: u16) -> Option<&CellValue> {
        self.cells.get(row, col).map(CellValue::effective_value)
    }
}

fn validate_cell_position(row: u32, col: u16) -> Result<()> {
    if row >= MAX_ROWS {
        return Err(Error::RowOutOfBounds(row, MAX_ROWS - 1));
    }
    if col >= MAX_COLS {
        return Err(Error::ColumnOutOfBounds(col, MAX_COLS - 1));
    }
    Ok(())
}
