//! # quotecalc-formula
//!
//! Formula parser and evaluator for quotecalc workbooks.
//!
//! This crate provides:
//! - Formula parsing (text → AST)
//! - Formula evaluation (AST → value), with runtime errors as cell error values
//! - The built-in function set used by cash-flow templates
//! - A dependency graph that orders cells and detects cycles
//!
//! ## Example
//!
//! ```rust
//! use quotecalc_formula::{evaluate, parse_formula, EvaluationContext, FormulaValue};
//!
//! let ast = parse_formula("=ROUND(19000/450000*100, 2)").unwrap();
//! let value = evaluate(&ast, &EvaluationContext::simple()).unwrap();
//! assert_eq!(value, FormulaValue::Number(4.22));
//! ```

pub mod ast;
pub mod dependency;
pub mod error;
pub mod evaluator;
pub mod functions;
pub mod parser;

pub use ast::{
    BinaryOperator, CellReference, FormulaExpr, RangeReference, Reference, UnaryOperator,
};
pub use dependency::{CellKey, CircularReference, DependencyGraph};
pub use error::{FormulaError, FormulaResult};
pub use evaluator::{evaluate, EvaluationContext, FormulaValue};
pub use functions::{function_registry, FunctionDef, FunctionRegistry};
pub use parser::parse_formula;
