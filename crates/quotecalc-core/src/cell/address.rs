//! Cell coordinates and ranges in A1 notation

use crate::error::{Error, Result};
use crate::{MAX_COLS, MAX_ROWS};
use std::fmt;
use std::str::FromStr;

/// A cell coordinate such as `B13` or `$DZ$20`
///
/// Rows are 0-based in memory and 1-based in text. `$` markers are kept so
/// formulas can be written back verbatim, but they do not take part in cell
/// identity: use [`CellAddress::key`] when comparing positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellAddress {
    /// Row index (0-based)
    pub row: u32,
    /// Column index (0-based, A=0 .. XFD=16383)
    pub col: u16,
    /// Whether the row reference is absolute ($)
    pub row_absolute: bool,
    /// Whether the column reference is absolute ($)
    pub col_absolute: bool,
}

impl CellAddress {
    /// Create a relative address from 0-based indices
    pub fn new(row: u32, col: u16) -> Self {
        Self {
            row,
            col,
            row_absolute: false,
            col_absolute: false,
        }
    }

    /// Create an address with explicit `$` markers
    pub fn with_absolute(row: u32, col: u16, row_absolute: bool, col_absolute: bool) -> Self {
        Self {
            row,
            col,
            row_absolute,
            col_absolute,
        }
    }

    /// Position of the cell with the `$` markers stripped
    pub fn key(&self) -> (u32, u16) {
        (self.row, self.col)
    }

    /// Parse an A1-style coordinate
    ///
    /// ```
    /// use quotecalc_core::CellAddress;
    ///
    /// let addr = CellAddress::parse("DZ20").unwrap();
    /// assert_eq!(addr.row, 19);
    /// assert_eq!(addr.col, 129);
    /// ```
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::InvalidAddress("empty address".into()));
        }

        let (col_absolute, rest) = match s.strip_prefix('$') {
            Some(rest) => (true, rest),
            None => (false, s),
        };

        let letters_end = rest
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(rest.len());
        if letters_end == 0 {
            return Err(Error::InvalidAddress(format!("no column letters in '{}'", s)));
        }
        let col = Self::letters_to_column(&rest[..letters_end])?;

        let rest = &rest[letters_end..];
        let (row_absolute, digits) = match rest.strip_prefix('$') {
            Some(digits) => (true, digits),
            None => (false, rest),
        };
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::InvalidAddress(format!("invalid row number in '{}'", s)));
        }

        let row: u32 = digits
            .parse()
            .map_err(|_| Error::InvalidAddress(format!("invalid row number in '{}'", s)))?;
        if row == 0 {
            return Err(Error::InvalidAddress(format!("row number must be >= 1 in '{}'", s)));
        }
        if row > MAX_ROWS {
            return Err(Error::RowOutOfBounds(row - 1, MAX_ROWS - 1));
        }

        Ok(Self::with_absolute(row - 1, col, row_absolute, col_absolute))
    }

    /// Bijective base-26 column letters (0 = A, 25 = Z, 26 = AA)
    pub fn column_to_letters(col: u16) -> String {
        let mut letters = Vec::with_capacity(3);
        let mut n = col as u32 + 1;
        while n > 0 {
            n -= 1;
            letters.push(b'A' + (n % 26) as u8);
            n /= 26;
        }
        letters.iter().rev().map(|&b| b as char).collect()
    }

    /// Inverse of [`CellAddress::column_to_letters`], case-insensitive
    pub fn letters_to_column(letters: &str) -> Result<u16> {
        if letters.is_empty() {
            return Err(Error::InvalidAddress("empty column letters".into()));
        }

        let mut col: u32 = 0;
        for c in letters.chars() {
            if !c.is_ascii_alphabetic() {
                return Err(Error::InvalidAddress(format!("invalid column letter '{}'", c)));
            }
            col = col * 26 + (c.to_ascii_uppercase() as u32 - 'A' as u32 + 1);
            if col > MAX_COLS as u32 {
                return Err(Error::InvalidAddress(format!(
                    "column '{}' beyond {}",
                    letters,
                    Self::column_to_letters(MAX_COLS - 1)
                )));
            }
        }

        Ok((col - 1) as u16)
    }

    /// Format as an A1-style string, keeping `$` markers
    pub fn to_a1_string(&self) -> String {
        let mut out = String::new();
        if self.col_absolute {
            out.push('$');
        }
        out.push_str(&Self::column_to_letters(self.col));
        if self.row_absolute {
            out.push('$');
        }
        out.push_str(&(self.row + 1).to_string());
        out
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_a1_string())
    }
}

impl FromStr for CellAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for CellAddress {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_a1_string())
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for CellAddress {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = <String as serde::Deserialize>::deserialize(deserializer)?;
        Self::parse(&text).map_err(serde::de::Error::custom)
    }
}

/// A rectangular block of cells such as `A1:K4`
///
/// Always normalized so that `start` is the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellRange {
    /// Top-left corner
    pub start: CellAddress,
    /// Bottom-right corner
    pub end: CellAddress,
}

impl CellRange {
    /// Create a range from two corners in any order
    pub fn new(a: CellAddress, b: CellAddress) -> Self {
        let (top, bottom) = if a.row <= b.row { (a, b) } else { (b, a) };
        let (left_col, left_abs, right_col, right_abs) = if a.col <= b.col {
            (a.col, a.col_absolute, b.col, b.col_absolute)
        } else {
            (b.col, b.col_absolute, a.col, a.col_absolute)
        };

        Self {
            start: CellAddress::with_absolute(top.row, left_col, top.row_absolute, left_abs),
            end: CellAddress::with_absolute(bottom.row, right_col, bottom.row_absolute, right_abs),
        }
    }

    /// Create a range from 0-based indices
    pub fn from_indices(start_row: u32, start_col: u16, end_row: u32, end_col: u16) -> Self {
        Self::new(
            CellAddress::new(start_row, start_col),
            CellAddress::new(end_row, end_col),
        )
    }

    /// A range covering exactly one cell
    pub fn single(addr: CellAddress) -> Self {
        Self {
            start: addr,
            end: addr,
        }
    }

    /// Parse `A1:B10` or a single coordinate
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        match s.split_once(':') {
            Some((a, b)) => {
                let start = CellAddress::parse(a)
                    .map_err(|e| Error::InvalidRange(format!("'{}': {}", s, e)))?;
                let end = CellAddress::parse(b)
                    .map_err(|e| Error::InvalidRange(format!("'{}': {}", s, e)))?;
                Ok(Self::new(start, end))
            }
            None => CellAddress::parse(s)
                .map(Self::single)
                .map_err(|e| Error::InvalidRange(format!("'{}': {}", s, e))),
        }
    }

    /// Whole columns `first:last`, as in `K:K`
    pub fn full_columns(first: u16, last: u16) -> Self {
        Self::from_indices(0, first, MAX_ROWS - 1, last)
    }

    /// Whole rows `first:last` (0-based), as in `2:3`
    pub fn full_rows(first: u32, last: u32) -> Self {
        Self::from_indices(first, 0, last, MAX_COLS - 1)
    }

    /// Spans every row of its columns
    pub fn is_full_columns(&self) -> bool {
        self.start.row == 0 && self.end.row == MAX_ROWS - 1
    }

    /// Spans every column of its rows
    pub fn is_full_rows(&self) -> bool {
        self.start.col == 0 && self.end.col == MAX_COLS - 1
    }

    /// Cut whole-column and whole-row spans down to a sheet's declared
    /// range; `None` when the sheet declares nothing to cover
    pub fn bounded_by(&self, declared: Option<&CellRange>) -> Option<Self> {
        if !self.is_full_columns() && !self.is_full_rows() {
            return Some(*self);
        }
        let declared = declared?;
        let mut bounded = *self;
        if self.is_full_columns() {
            bounded.end.row = declared.end.row;
        }
        if self.is_full_rows() {
            bounded.end.col = declared.end.col;
        }
        Some(bounded)
    }

    /// Whether the coordinate lies inside the range
    pub fn contains(&self, row: u32, col: u16) -> bool {
        row >= self.start.row && row <= self.end.row && col >= self.start.col && col <= self.end.col
    }

    /// Smallest range covering both this range and the given cell
    pub fn expanded_to(&self, row: u32, col: u16) -> Self {
        Self::from_indices(
            self.start.row.min(row),
            self.start.col.min(col),
            self.end.row.max(row),
            self.end.col.max(col),
        )
    }

    /// Smallest range covering both ranges
    pub fn union(&self, other: &CellRange) -> Self {
        self.expanded_to(other.start.row, other.start.col)
            .expanded_to(other.end.row, other.end.col)
    }

    /// Number of rows in the range
    pub fn row_count(&self) -> u32 {
        self.end.row - self.start.row + 1
    }

    /// Number of columns in the range
    pub fn col_count(&self) -> u16 {
        self.end.col - self.start.col + 1
    }

    /// Total number of cells
    pub fn cell_count(&self) -> u64 {
        self.row_count() as u64 * self.col_count() as u64
    }

    /// Row-major iterator over every coordinate in the range
    pub fn cells(&self) -> CellRangeIterator {
        CellRangeIterator {
            range: *self,
            row: self.start.row,
            col: self.start.col,
            remaining: self.cell_count(),
        }
    }

    /// Format as `A1:B10`, or a single coordinate when the range is one cell
    pub fn to_a1_string(&self) -> String {
        if self.start.key() == self.end.key() {
            self.start.to_a1_string()
        } else {
            format!("{}:{}", self.start.to_a1_string(), self.end.to_a1_string())
        }
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_a1_string())
    }
}

impl FromStr for CellRange {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Iterator returned by [`CellRange::cells`]
pub struct CellRangeIterator {
    range: CellRange,
    row: u32,
    col: u16,
    remaining: u64,
}

impl Iterator for CellRangeIterator {
    type Item = CellAddress;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        let addr = CellAddress::new(self.row, self.col);
        self.remaining -= 1;
        if self.col == self.range.end.col {
            self.col = self.range.start.col;
            self.row += 1;
        } else {
            self.col += 1;
        }

        Some(addr)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for CellRangeIterator {}
