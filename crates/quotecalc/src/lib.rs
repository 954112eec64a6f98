//! # quotecalc
//!
//! Recalculates the cash-flow template attached to a commercial quote.
//!
//! The crate ties the workbook model, the formula engine and the XLSX
//! container together:
//!
//! - Evaluate one sheet of a workbook in dependency order ([`evaluate_sheet`])
//! - Inject quote totals and line items into fixed template cells ([`inject`], [`inject_rows`])
//! - Read VPL and margin back out ([`extract`]), or read stored values when
//!   recalculation fails ([`read_direct`])
//! - Run the whole quote -> template -> outputs pipeline ([`update_cash_flow`])
//!
//! ## Example
//!
//! ```rust
//! use quotecalc::prelude::*;
//!
//! let mut workbook = Workbook::empty();
//! workbook.add_worksheet_with_name("FC").unwrap();
//! let fc = workbook.worksheet_by_name_mut("FC").unwrap();
//! fc.set_cell_formula("B19", "=B13-B15-B16-B18").unwrap();
//! fc.set_cell_formula("B8", "=IFERROR(B19/B13,0)").unwrap();
//!
//! let inputs = CashFlowInputs {
//!     gross_revenue: 450000.0,
//!     prv: 30.0,
//!     product_cost: 300000.0,
//!     allocated_cost: 50000.0,
//!     taxes: 81000.0,
//! };
//! let layout = TemplateLayout::default();
//! let quote = Quote::default();
//! let result = update_cash_flow_with_inputs(&mut workbook, &quote, inputs, &layout).unwrap();
//!
//! assert_eq!(result.margem(), 19000.0);
//! assert!((result.margem_percentual() - 4.2222).abs() < 1e-3);
//! ```

pub mod calculation;
pub mod cash_flow;
pub mod error;
pub mod extract;
pub mod fallback;
pub mod inject;
pub mod layout;
pub mod line_items;
pub mod prelude;
pub mod records;

pub use calculation::{
    evaluate_sheet, evaluate_sheet_with_options, CalculationOptions, CalculationStats,
    EvaluatedTable, WorkbookCalculationExt,
};
pub use cash_flow::{
    fill_template, update_cash_flow, update_cash_flow_with_inputs, CashFlowInputs, CashFlowResult,
};
pub use error::{Error, Result};
pub use extract::{extract, Extraction, ExtractionMap, OutputBinding, Provenance, Scale};
pub use fallback::read_direct;
pub use inject::{
    inject, inject_rows, InjectionEntry, InjectionMap, InjectionReport, InjectionTarget, RowLayout,
    RowRecord,
};
pub use layout::{FcInputCells, TemplateLayout};
pub use line_items::{bulk_product_template, line_item_workbook, parse_bulk_products};
pub use records::{Categoria, Moeda, Quote, QuoteProduct, RateioService, SgiTis};

// Re-export core types
pub use quotecalc_core::{CellAddress, CellError, CellRange, CellValue, Workbook, Worksheet};

// Re-export formula types
pub use quotecalc_formula::{evaluate, parse_formula, EvaluationContext, FormulaExpr, FormulaValue};

// Re-export I/O types
pub use quotecalc_xlsx::{XlsxError, XlsxReader, XlsxWriter};

use std::path::Path;

/// Parse an XLSX document
pub fn load_workbook(bytes: &[u8]) -> Result<Workbook> {
    Ok(XlsxReader::read_bytes(bytes)?)
}

/// Serialize a workbook to XLSX bytes
pub fn save_workbook(workbook: &Workbook) -> Result<Vec<u8>> {
    Ok(XlsxWriter::write_bytes(workbook)?)
}

/// Extension trait for Workbook to add file I/O
pub trait WorkbookExt {
    /// Open a workbook from an `.xlsx` file
    fn open<P: AsRef<Path>>(path: P) -> Result<Workbook>;

    /// Save the workbook to an `.xlsx` file
    fn save<P: AsRef<Path>>(&self, path: P) -> Result<()>;
}

impl WorkbookExt for Workbook {
    fn open<P: AsRef<Path>>(path: P) -> Result<Workbook> {
        Ok(XlsxReader::read_file(path)?)
    }

    fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        Ok(XlsxWriter::write_file(self, path)?)
    }
}
