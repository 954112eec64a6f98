//! # quotecalc-xlsx
//!
//! XLSX (Office Open XML) reader and writer for quotecalc workbooks.
//!
//! Only what the calculation engine needs survives a round trip: sheet
//! names, values, formulas with cached results and declared dimensions.

pub mod error;
pub mod reader;
pub mod writer;

pub use error::{XlsxError, XlsxResult};
pub use reader::XlsxReader;
pub use writer::XlsxWriter;
