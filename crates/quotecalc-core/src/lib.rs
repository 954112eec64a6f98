//! # quotecalc-core
//!
//! The in-memory workbook model used by the quotecalc engine:
//! - [`CellValue`] - numbers, text, booleans, error values and formulas with a cached result
//! - [`CellAddress`] and [`CellRange`] - coordinates in A1 notation
//! - [`Workbook`], [`Worksheet`] - named sheets with a declared occupied range
//!
//! ## Example
//!
//! ```rust
//! use quotecalc_core::{CellValue, Workbook};
//!
//! let mut workbook = Workbook::empty();
//! workbook.add_worksheet_with_name("FC").unwrap();
//! let fc = workbook.worksheet_by_name_mut("FC").unwrap();
//!
//! fc.set_cell_value("B13", 450000.0).unwrap();
//! fc.set_cell_formula("B19", "=B13-B15-B16-B18").unwrap();
//!
//! assert_eq!(fc.get_value("B13").unwrap(), CellValue::Number(450000.0));
//! assert_eq!(fc.dimension().unwrap().to_string(), "B13:B19");
//! ```

pub mod cell;
pub mod error;
pub mod workbook;
pub mod worksheet;

pub use cell::{CellAddress, CellError, CellRange, CellStorage, CellValue, SharedString};
pub use error::{Error, Result};
pub use workbook::Workbook;
pub use worksheet::Worksheet;

/// Maximum number of rows in a worksheet
pub const MAX_ROWS: u32 = 1_048_576;

/// Maximum number of columns in a worksheet
pub const MAX_COLS: u16 = 16_384;

/// Maximum length of a sheet name
pub const MAX_SHEET_NAME_LEN: usize = 31;
