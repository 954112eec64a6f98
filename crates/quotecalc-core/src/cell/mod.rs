//! Cell-level types
//!
//! - [`CellValue`] - the value held by a cell, including formulas and their cached result
//! - [`CellAddress`] / [`CellRange`] - coordinates and rectangular ranges in A1 notation
//! - [`CellStorage`] - sparse row-major storage used by [`crate::Worksheet`]

mod address;
mod storage;
mod value;

pub use address::{CellAddress, CellRange, CellRangeIterator};
pub use storage::CellStorage;
pub use value::{CellError, CellValue, SharedString};
