//! Sparse cell storage
//!
//! Only non-empty cells are kept, in a row-major `BTreeMap` so iteration
//! order matches the order cells appear in a sheet part.

use std::collections::BTreeMap;

use super::CellValue;

/// Sparse row-based storage: `BTreeMap<row, BTreeMap<col, CellValue>>`
#[derive(Debug, Clone, Default)]
pub struct CellStorage {
    rows: BTreeMap<u32, BTreeMap<u16, CellValue>>,
}

impl CellStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, row: u32, col: u16) -> Option<&CellValue> {
        self.rows.get(&row).and_then(|r| r.get(&col))
    }

    pub fn get_mut(&mut self, row: u32, col: u16) -> Option<&mut CellValue> {
        self.rows.get_mut(&row).and_then(|r| r.get_mut(&col))
    }

    /// Store a value; storing [`CellValue::Empty`] removes the cell.
    ///
    /// Returns the previous value, if any.
    pub fn set(&mut self, row: u32, col: u16, value: CellValue) -> Option<CellValue> {
        if value.is_empty() {
            self.remove(row, col)
        } else {
            self.rows.entry(row).or_default().insert(col, value)
        }
    }

    pub fn remove(&mut self, row: u32, col: u16) -> Option<CellValue> {
        let row_map = self.rows.get_mut(&row)?;
        let removed = row_map.remove(&col);
        if row_map.is_empty() {
            self.rows.remove(&row);
        }
        removed
    }

    /// Number of stored cells
    pub fn cell_count(&self) -> usize {
        self.rows.values().map(|r| r.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Bounds of the stored cells as (min_row, min_col, max_row, max_col)
    pub fn used_bounds(&self) -> Option<(u32, u16, u32, u16)> {
        let min_row = *self.rows.keys().next()?;
        let max_row = *self.rows.keys().next_back()?;

        let mut min_col = u16::MAX;
        let mut max_col = 0u16;
        for cols in self.rows.values() {
            if let Some((&first, _)) = cols.first_key_value() {
                min_col = min_col.min(first);
            }
            if let Some((&last, _)) = cols.last_key_value() {
                max_col = max_col.max(last);
            }
        }

        Some((min_row, min_col, max_row, max_col))
    }

    /// Iterate over all cells in row-major order
    pub fn iter(&self) -> impl Iterator<Item = (u32, u16, &CellValue)> {
        self.rows
            .iter()
            .flat_map(|(&row, cols)| cols.iter().map(move |(&col, value)| (row, col, value)))
    }

    /// Iterate over the cells of a single row
    pub fn iter_row(&self, row: u32) -> impl Iterator<Item = (u16, &CellValue)> {
        self.rows
            .get(&row)
            .into_iter()
            .flat_map(|cols| cols.iter().map(|(&col, value)| (col, value)))
    }

    /// Iterate over cells whose row and column fall inside the given bounds
    pub fn iter_within(
        &self,
        start_row: u32,
        start_col: u16,
        end_row: u32,
        end_col: u16,
    ) -> impl Iterator<Item = (u32, u16, &CellValue)> {
        self.rows.range(start_row..=end_row).flat_map(move |(&row, cols)| {
            cols.range(start_col..=end_col)
                .map(move |(&col, value)| (row, col, value))
        })
    }
}
