//! Prelude module - common imports for quotecalc users
//!
//! ```rust
//! use quotecalc::prelude::*;
//! ```

pub use crate::{
    // Pipeline
    evaluate_sheet,
    extract,
    fill_template,
    inject,
    inject_rows,
    read_direct,
    update_cash_flow,
    update_cash_flow_with_inputs,
    // Calculation types
    CalculationOptions,
    CalculationStats,
    CashFlowInputs,
    CashFlowResult,
    // Cell types
    CellAddress,
    CellError,
    CellRange,
    CellValue,
    // Error types
    Error,
    EvaluatedTable,
    Extraction,
    ExtractionMap,
    InjectionMap,
    Provenance,
    // Quote records
    Quote,
    QuoteProduct,
    RateioService,
    Result,
    RowLayout,
    Scale,
    TemplateLayout,
    // Main types
    Workbook,
    // Extension traits
    WorkbookCalculationExt,
    WorkbookExt,
    Worksheet,
    // I/O types
    XlsxReader,
    XlsxWriter,
};
