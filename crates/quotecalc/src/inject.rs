//! Cell injection
//!
//! Writes computed domain values into fixed coordinates of a template before
//! it is evaluated. Scalar inputs go through an [`InjectionMap`]; line items
//! go through [`inject_rows`], one record per row under a header.

use crate::error::{Error, Result};
use quotecalc_core::{CellAddress, CellRange, CellValue, Worksheet};

/// How an entry lands in its cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectionTarget {
    /// The cell becomes a plain value; a formula there is discarded
    Literal,
    /// Only the cached result of a formula cell is replaced; its text survives
    CachedResult,
}

/// One coordinate and the value destined for it
#[derive(Debug, Clone, PartialEq)]
pub struct InjectionEntry {
    pub address: CellAddress,
    pub value: CellValue,
    pub target: InjectionTarget,
}

/// Ordered coordinate -> value map for one request
///
/// Re-inserting a coordinate replaces the earlier entry where it stood.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InjectionMap {
    entries: Vec<InjectionEntry>,
}

impl InjectionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a literal-input entry
    pub fn literal<V: Into<CellValue>>(&mut self, address: CellAddress, value: V) -> &mut Self {
        self.insert(address, value.into(), InjectionTarget::Literal)
    }

    /// Add a cached-result entry
    pub fn cached<V: Into<CellValue>>(&mut self, address: CellAddress, value: V) -> &mut Self {
        self.insert(address, value.into(), InjectionTarget::CachedResult)
    }

    pub fn insert(
        &mut self,
        address: CellAddress,
        value: CellValue,
        target: InjectionTarget,
    ) -> &mut Self {
        let entry = InjectionEntry {
            address,
            value,
            target,
        };
        match self
            .entries
            .iter_mut()
            .find(|e| e.address.key() == address.key())
        {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &InjectionEntry> {
        self.entries.iter()
    }
}

/// What an injection changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InjectionReport {
    /// Cells that did not exist before
    pub created: usize,
    /// Existing cells whose value was replaced
    pub overwritten: usize,
    /// Formula cells turned into literals
    pub formulas_cleared: usize,
    /// Formula cells whose cached result was refreshed
    pub cached_refreshed: usize,
}

impl InjectionReport {
    /// Add another report's counts to this one
    pub fn merge(&mut self, other: InjectionReport) {
        self.created += other.created;
        self.overwritten += other.overwritten;
        self.formulas_cleared += other.formulas_cleared;
        self.cached_refreshed += other.cached_refreshed;
    }
}

/// Write every entry of `map` into `sheet`
///
/// The declared range grows to cover each injected coordinate, even when the
/// injected value is empty. Injecting the same map twice leaves the sheet as
/// after the first time.
pub fn inject(sheet: &mut Worksheet, map: &InjectionMap) -> Result<InjectionReport> {
    let mut report = InjectionReport::default();
    for entry in map.iter() {
        report.merge(inject_entry(sheet, entry)?);
    }
    Ok(report)
}

fn inject_entry(sheet: &mut Worksheet, entry: &InjectionEntry) -> Result<InjectionReport> {
    let (row, col) = entry.address.key();
    let mut report = InjectionReport::default();

    let existing_formula = sheet.get_formula_at(row, col).is_some();
    match (entry.target, existing_formula) {
        (InjectionTarget::CachedResult, true) => {
            sheet.set_formula_result(row, col, entry.value.clone())?;
            report.cached_refreshed += 1;
        }
        (_, had_formula) => {
            let previous = sheet.set_cell_value_at(row, col, entry.value.clone())?;
            match previous {
                None => report.created += 1,
                Some(_) => report.overwritten += 1,
            }
            if had_formula {
                tracing::debug!(
                    "Cleared formula at {}!{}",
                    sheet.name(),
                    CellAddress::new(row, col)
                );
                report.formulas_cleared += 1;
            }
        }
    }

    sheet.declare_dimension(CellRange::single(CellAddress::new(row, col)));
    Ok(report)
}

/// A domain record that occupies one row of a line-item sheet
pub trait RowRecord {
    /// Field values in column order
    fn row_values(&self) -> Vec<CellValue>;
}

/// Where the records of a line-item sheet go
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RowLayout {
    /// 1-based row of the first record; rows above it are headers
    pub origin_row: u32,
    /// Column letters, one per record field
    pub columns: Vec<String>,
}

impl Default for RowLayout {
    /// Records from row 2 across columns A to K
    fn default() -> Self {
        Self {
            origin_row: 2,
            columns: ('A'..='K').map(String::from).collect(),
        }
    }
}

impl RowLayout {
    /// Resolve column letters to 0-based indices
    fn column_indices(&self) -> Result<Vec<u16>> {
        if self.origin_row < 2 {
            return Err(Error::InvalidLayout(format!(
                "origin row {} leaves no header row",
                self.origin_row
            )));
        }
        self.columns
            .iter()
            .map(|letters| {
                CellAddress::letters_to_column(letters).map_err(|_| {
                    Error::InvalidLayout(format!("invalid column letters: {letters}"))
                })
            })
            .collect()
    }
}

/// Write records one per row starting at the layout's origin row
///
/// Rows past the last record are left as they were.
pub fn inject_rows<R: RowRecord>(
    sheet: &mut Worksheet,
    layout: &RowLayout,
    records: &[R],
) -> Result<InjectionReport> {
    let columns = layout.column_indices()?;
    let mut map = InjectionMap::new();

    for (offset, record) in records.iter().enumerate() {
        let values = record.row_values();
        if values.len() != columns.len() {
            return Err(Error::InvalidLayout(format!(
                "record has {} fields but the layout has {} columns",
                values.len(),
                columns.len()
            )));
        }
        let row = layout.origin_row - 1 + offset as u32;
        for (&col, value) in columns.iter().zip(values) {
            map.literal(CellAddress::new(row, col), value);
        }
    }

    let report = inject(sheet, &map)?;
    tracing::debug!("Injected {} rows into {}", records.len(), sheet.name());
    Ok(report)
}
