//! Sheet evaluation pass
//!
//! One pass parses every formula inside a sheet's declared range, follows
//! references into other sheets, orders the cells so each one is computed
//! after everything it reads, and evaluates them in that order. Results are
//! written back as the cached value of each formula cell.
//!
//! # Example
//!
//! ```rust
//! use quotecalc::prelude::*;
//!
//! let mut workbook = Workbook::empty();
//! workbook.add_worksheet_with_name("FC").unwrap();
//! let fc = workbook.worksheet_by_name_mut("FC").unwrap();
//! fc.set_cell_value("B13", 450000.0).unwrap();
//! fc.set_cell_value("B15", 300000.0).unwrap();
//! fc.set_cell_formula("B19", "=B13-B15").unwrap();
//!
//! let table = evaluate_sheet(&mut workbook, "FC").unwrap();
//! assert_eq!(table.get("B19"), Some(&CellValue::Number(150000.0)));
//! ```

use crate::error::{Error, Result};
use quotecalc_core::{CellAddress, CellValue, Workbook};
use quotecalc_formula::{
    evaluate, function_registry, parse_formula, CellKey, DependencyGraph, EvaluationContext,
    FormulaError, FormulaExpr, Reference,
};
use std::collections::{BTreeMap, HashMap, VecDeque};

/// Options for an evaluation pass
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CalculationOptions {
    /// Store results as the cached value of each formula cell (default: true)
    ///
    /// When false the pass runs on a copy and the workbook is left untouched.
    pub write_back: bool,
}

impl Default for CalculationOptions {
    fn default() -> Self {
        Self { write_back: true }
    }
}

/// Statistics from one evaluation pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct CalculationStats {
    /// Formula cells that took part in the pass, on any sheet
    pub formula_count: usize,
    /// Formula cells evaluated
    pub cells_calculated: usize,
    /// Formula cells that resolved to an error value
    pub errors: usize,
}

/// Resolved values of one sheet after a pass
#[derive(Debug, Clone)]
pub struct EvaluatedTable {
    sheet: String,
    values: BTreeMap<(u32, u16), CellValue>,
    stats: CalculationStats,
}

impl EvaluatedTable {
    pub fn sheet(&self) -> &str {
        &self.sheet
    }

    /// Resolved value by A1 address; missing cells and bad addresses give `None`
    pub fn get(&self, address: &str) -> Option<&CellValue> {
        let addr = CellAddress::parse(address).ok()?;
        self.value_at(addr.row, addr.col)
    }

    /// Resolved value by 0-based indices
    pub fn value_at(&self, row: u32, col: u16) -> Option<&CellValue> {
        self.values.get(&(row, col))
    }

    /// Non-empty cells in row-major order
    pub fn iter(&self) -> impl Iterator<Item = (CellAddress, &CellValue)> {
        self.values
            .iter()
            .map(|(&(row, col), value)| (CellAddress::new(row, col), value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn stats(&self) -> &CalculationStats {
        &self.stats
    }
}

/// Evaluate a sheet with default options
pub fn evaluate_sheet(workbook: &mut Workbook, sheet_name: &str) -> Result<EvaluatedTable> {
    evaluate_sheet_with_options(workbook, sheet_name, &CalculationOptions::default())
}

/// Evaluate a sheet
///
/// Fails before anything is written when a formula does not parse, calls an
/// unknown function or with the wrong number of arguments, or when formula
/// cells form a cycle. Runtime errors inside formulas become error values.
pub fn evaluate_sheet_with_options(
    workbook: &mut Workbook,
    sheet_name: &str,
    options: &CalculationOptions,
) -> Result<EvaluatedTable> {
    let sheet = workbook
        .sheet_index(sheet_name)
        .ok_or_else(|| Error::SheetNotFound(sheet_name.to_string()))?;

    let mut engine = CalculationEngine::default();
    engine.collect_formulas(workbook, sheet)?;
    let order = engine.calculation_order(workbook)?;

    tracing::debug!(
        "Evaluating {sheet_name}: {} formula cells",
        engine.parsed_formulas.len()
    );

    let table = if options.write_back {
        engine.run(workbook, sheet, &order)?
    } else {
        let mut scratch = workbook.clone();
        engine.run(&mut scratch, sheet, &order)?
    };

    tracing::debug!(
        "Evaluated {sheet_name}: {} cells calculated, {} errors",
        table.stats.cells_calculated,
        table.stats.errors
    );
    Ok(table)
}

/// Extension trait for evaluating sheets directly on a [`Workbook`]
pub trait WorkbookCalculationExt {
    /// Evaluate a sheet with default options
    fn evaluate_sheet(&mut self, sheet_name: &str) -> Result<EvaluatedTable>;

    /// Evaluate a sheet with custom options
    fn evaluate_sheet_with_options(
        &mut self,
        sheet_name: &str,
        options: &CalculationOptions,
    ) -> Result<EvaluatedTable>;
}

impl WorkbookCalculationExt for Workbook {
    fn evaluate_sheet(&mut self, sheet_name: &str) -> Result<EvaluatedTable> {
        evaluate_sheet(self, sheet_name)
    }

    fn evaluate_sheet_with_options(
        &mut self,
        sheet_name: &str,
        options: &CalculationOptions,
    ) -> Result<EvaluatedTable> {
        evaluate_sheet_with_options(self, sheet_name, options)
    }
}

#[derive(Default)]
struct CalculationEngine {
    dependency_graph: DependencyGraph,
    parsed_formulas: HashMap<CellKey, FormulaExpr>,
}

impl CalculationEngine {
    /// Parse the sheet's formulas and every formula they reach
    fn collect_formulas(&mut self, workbook: &Workbook, sheet: usize) -> Result<()> {
        let mut pending: VecDeque<CellKey> = workbook
            .worksheet(sheet)
            .map(|ws| {
                ws.declared_formula_cells()
                    .into_iter()
                    .map(|(row, col, _)| CellKey::new(sheet, row, col))
                    .collect()
            })
            .unwrap_or_default();

        while let Some(key) = pending.pop_front() {
            if self.parsed_formulas.contains_key(&key) {
                continue;
            }
            let Some(text) = workbook
                .worksheet(key.sheet)
                .and_then(|ws| ws.get_formula_at(key.row, key.col))
            else {
                continue;
            };

            let ast = parse_formula(text).map_err(|e| formula_error(workbook, key, e))?;
            for (name, argc) in ast.function_calls() {
                function_registry()
                    .check_call(name, argc)
                    .map_err(|e| formula_error(workbook, key, e))?;
            }

            self.dependency_graph.add_node(key);
            for reference in ast.references() {
                for precedent in referenced_cells(workbook, key.sheet, reference) {
                    self.dependency_graph.add_dependency(precedent, key);
                    if !self.parsed_formulas.contains_key(&precedent)
                        && is_formula(workbook, precedent)
                    {
                        pending.push_back(precedent);
                    }
                }
            }
            self.parsed_formulas.insert(key, ast);
        }
        Ok(())
    }

    /// Formula cells ordered after everything they read
    fn calculation_order(&self, workbook: &Workbook) -> Result<Vec<CellKey>> {
        let mut order = self.dependency_graph.evaluation_order().map_err(|cycle| {
            Error::CyclicDependency {
                cells: cycle
                    .cells
                    .iter()
                    .map(|&key| cell_label(workbook, key))
                    .collect(),
            }
        })?;
        order.retain(|key| self.parsed_formulas.contains_key(key));
        Ok(order)
    }

    fn run(
        &self,
        workbook: &mut Workbook,
        sheet: usize,
        order: &[CellKey],
    ) -> Result<EvaluatedTable> {
        let mut stats = CalculationStats {
            formula_count: self.parsed_formulas.len(),
            ..CalculationStats::default()
        };

        for &key in order {
            let Some(ast) = self.parsed_formulas.get(&key) else {
                continue;
            };
            let result = {
                let ctx = EvaluationContext::new(Some(workbook), key.sheet);
                evaluate(ast, &ctx).map_err(|e| formula_error(workbook, key, e))?
            };
            let value = CellValue::from(result);
            if value.is_error() {
                stats.errors += 1;
            }
            if let Some(ws) = workbook.worksheet_mut(key.sheet) {
                ws.set_formula_result(key.row, key.col, value)?;
            }
            stats.cells_calculated += 1;
        }

        let ws = workbook
            .worksheet(sheet)
            .ok_or_else(|| Error::SheetNotFound(format!("#{sheet}")))?;
        let values = ws
            .iter_cells()
            .filter_map(|(row, col, cell)| {
                let value = cell.effective_value();
                (!value.is_empty()).then(|| ((row, col), value.clone()))
            })
            .collect();

        Ok(EvaluatedTable {
            sheet: ws.name().to_string(),
            values,
            stats,
        })
    }
}

/// Stored cells a reference reads; a reference to a missing sheet reads nothing
fn referenced_cells(
    workbook: &Workbook,
    current_sheet: usize,
    reference: Reference<'_>,
) -> Vec<CellKey> {
    let sheet_name = match reference {
        Reference::Cell(cell) => cell.sheet.as_deref(),
        Reference::Range(range) => range.sheet.as_deref(),
    };
    let sheet = match sheet_name {
        Some(name) => match workbook.sheet_index_ignore_case(name) {
            Some(index) => index,
            None => return Vec::new(),
        },
        None => current_sheet,
    };

    match reference {
        Reference::Cell(cell) => vec![CellKey::from_address(sheet, &cell.address)],
        Reference::Range(range) => workbook
            .worksheet(sheet)
            .map(|ws| {
                ws.iter_range(&range.range)
                    .map(|(row, col, _)| CellKey::new(sheet, row, col))
                    .collect()
            })
            .unwrap_or_default(),
    }
}

fn is_formula(workbook: &Workbook, key: CellKey) -> bool {
    workbook
        .worksheet(key.sheet)
        .and_then(|ws| ws.cell_at(key.row, key.col))
        .is_some_and(CellValue::is_formula)
}

/// `Sheet!A1` label for a cell key
fn cell_label(workbook: &Workbook, key: CellKey) -> String {
    match workbook.worksheet(key.sheet) {
        Some(ws) => format!("{}!{}", ws.name(), key.address()),
        None => key.to_string(),
    }
}

fn formula_error(workbook: &Workbook, key: CellKey, err: FormulaError) -> Error {
    match err {
        FormulaError::UnknownFunction(name) => Error::UnsupportedFunction(name),
        other => Error::Parse {
            cell: cell_label(workbook, key),
            message: other.to_string(),
        },
    }
}
