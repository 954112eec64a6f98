//! Built-in functions
//!
//! The set covers what cash-flow templates use: aggregation, rounding,
//! conditional sums, logic, lookups and time-value-of-money.

pub mod criteria;
pub mod financial;
pub mod info;
pub mod logical;
pub mod lookup;
pub mod math;

use crate::error::{FormulaError, FormulaResult};
use crate::evaluator::{EvaluationContext, FormulaValue};
use std::collections::HashMap;
use std::sync::OnceLock;

/// Function implementation signature
pub type FunctionImpl = fn(&[FormulaValue], &EvaluationContext) -> FormulaResult<FormulaValue>;

/// Function definition
pub struct FunctionDef {
    /// Function name (uppercase)
    pub name: &'static str,
    /// Minimum arguments
    pub min_args: usize,
    /// Maximum arguments (None = unlimited)
    pub max_args: Option<usize>,
    /// Implementation
    pub implementation: FunctionImpl,
}

impl FunctionDef {
    fn expected_args(&self) -> String {
        match self.max_args {
            Some(max) if max == self.min_args => max.to_string(),
            Some(max) => format!("{} to {}", self.min_args, max),
            None => format!("at least {}", self.min_args),
        }
    }
}

/// Function registry
pub struct FunctionRegistry {
    functions: HashMap<String, FunctionDef>,
}

static FUNCTION_REGISTRY: OnceLock<FunctionRegistry> = OnceLock::new();

/// Shared registry of built-in functions
pub fn function_registry() -> &'static FunctionRegistry {
    FUNCTION_REGISTRY.get_or_init(FunctionRegistry::new)
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FunctionRegistry {
    /// Create a new registry with all built-in functions
    pub fn new() -> Self {
        let mut registry = Self {
            functions: HashMap::new(),
        };

        registry.register_math_functions();
        registry.register_criteria_functions();
        registry.register_logical_functions();
        registry.register_info_functions();
        registry.register_lookup_functions();
        registry.register_financial_functions();

        registry
    }

    /// Look up a function by name
    pub fn get(&self, name: &str) -> Option<&FunctionDef> {
        self.functions.get(&name.to_uppercase())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Names of every registered function, sorted
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.functions.values().map(|def| def.name).collect();
        names.sort_unstable();
        names
    }

    /// Register a function
    pub fn register(&mut self, def: FunctionDef) {
        self.functions.insert(def.name.to_uppercase(), def);
    }

    /// Resolve a call, checking the function exists and accepts `argc` arguments
    pub fn check_call(&self, name: &str, argc: usize) -> FormulaResult<&FunctionDef> {
        let def = self
            .get(name)
            .ok_or_else(|| FormulaError::UnknownFunction(name.to_uppercase()))?;

        let too_few = argc < def.min_args;
        let too_many = def.max_args.map_or(false, |max| argc > max);
        if too_few || too_many {
            return Err(FormulaError::ArgumentCount {
                function: def.name.to_string(),
                expected: def.expected_args(),
                actual: argc,
            });
        }
        Ok(def)
    }

    fn register_math_functions(&mut self) {
        // SUM
        self.register(FunctionDef {
            name: "SUM",
            min_args: 1,
            max_args: None,
            implementation: math::fn_sum,
        });

        // AVERAGE
        self.register(FunctionDef {
            name: "AVERAGE",
            min_args: 1,
            max_args: None,
            implementation: math::fn_average,
        });

        // MIN
        self.register(FunctionDef {
            name: "MIN",
            min_args: 1,
            max_args: None,
            implementation: math::fn_min,
        });

        // MAX
        self.register(FunctionDef {
            name: "MAX",
            min_args: 1,
            max_args: None,
            implementation: math::fn_max,
        });

        // COUNT
        self.register(FunctionDef {
            name: "COUNT",
            min_args: 1,
            max_args: None,
            implementation: math::fn_count,
        });

        // COUNTA
        self.register(FunctionDef {
            name: "COUNTA",
            min_args: 1,
            max_args: None,
            implementation: math::fn_counta,
        });

        // ABS
        self.register(FunctionDef {
            name: "ABS",
            min_args: 1,
            max_args: Some(1),
            implementation: math::fn_abs,
        });

        // ROUND
        self.register(FunctionDef {
            name: "ROUND",
            min_args: 2,
            max_args: Some(2),
            implementation: math::fn_round,
        });

        // ROUNDUP
        self.register(FunctionDef {
            name: "ROUNDUP",
            min_args: 2,
            max_args: Some(2),
            implementation: math::fn_roundup,
        });

        // ROUNDDOWN
        self.register(FunctionDef {
            name: "ROUNDDOWN",
            min_args: 2,
            max_args: Some(2),
            implementation: math::fn_rounddown,
        });

        // INT
        self.register(FunctionDef {
            name: "INT",
            min_args: 1,
            max_args: Some(1),
            implementation: math::fn_int,
        });

        // MOD
        self.register(FunctionDef {
            name: "MOD",
            min_args: 2,
            max_args: Some(2),
            implementation: math::fn_mod,
        });

        // POWER
        self.register(FunctionDef {
            name: "POWER",
            min_args: 2,
            max_args: Some(2),
            implementation: math::fn_power,
        });

        // SUMPRODUCT
        self.register(FunctionDef {
            name: "SUMPRODUCT",
            min_args: 1,
            max_args: None,
            implementation: math::fn_sumproduct,
        });
    }

    fn register_criteria_functions(&mut self) {
        // SUMIF(range, criteria, [sum_range])
        self.register(FunctionDef {
            name: "SUMIF",
            min_args: 2,
            max_args: Some(3),
            implementation: criteria::fn_sumif,
        });

        // COUNTIF(range, criteria)
        self.register(FunctionDef {
            name: "COUNTIF",
            min_args: 2,
            max_args: Some(2),
            implementation: criteria::fn_countif,
        });
    }

    fn register_logical_functions(&mut self) {
        // IF
        self.register(FunctionDef {
            name: "IF",
            min_args: 2,
            max_args: Some(3),
            implementation: logical::fn_if,
        });

        // IFERROR
        self.register(FunctionDef {
            name: "IFERROR",
            min_args: 2,
            max_args: Some(2),
            implementation: logical::fn_iferror,
        });

        // AND
        self.register(FunctionDef {
            name: "AND",
            min_args: 1,
            max_args: None,
            implementation: logical::fn_and,
        });

        // OR
        self.register(FunctionDef {
            name: "OR",
            min_args: 1,
            max_args: None,
            implementation: logical::fn_or,
        });

        // NOT
        self.register(FunctionDef {
            name: "NOT",
            min_args: 1,
            max_args: Some(1),
            implementation: logical::fn_not,
        });

        // TRUE
        self.register(FunctionDef {
            name: "TRUE",
            min_args: 0,
            max_args: Some(0),
            implementation: logical::fn_true,
        });

        // FALSE
        self.register(FunctionDef {
            name: "FALSE",
            min_args: 0,
            max_args: Some(0),
            implementation: logical::fn_false,
        });
    }

    fn register_info_functions(&mut self) {
        // ISERROR
        self.register(FunctionDef {
            name: "ISERROR",
            min_args: 1,
            max_args: Some(1),
            implementation: info::fn_iserror,
        });

        // ISBLANK
        self.register(FunctionDef {
            name: "ISBLANK",
            min_args: 1,
            max_args: Some(1),
            implementation: info::fn_isblank,
        });

        // ISNUMBER
        self.register(FunctionDef {
            name: "ISNUMBER",
            min_args: 1,
            max_args: Some(1),
            implementation: info::fn_isnumber,
        });
    }

    fn register_lookup_functions(&mut self) {
        // INDEX(array, row_num, [col_num])
        self.register(FunctionDef {
            name: "INDEX",
            min_args: 2,
            max_args: Some(3),
            implementation: lookup::fn_index,
        });

        // MATCH(lookup_value, lookup_array, [match_type])
        self.register(FunctionDef {
            name: "MATCH",
            min_args: 2,
            max_args: Some(3),
            implementation: lookup::fn_match,
        });

        // VLOOKUP(lookup_value, table_array, col_index_num, [range_lookup])
        self.register(FunctionDef {
            name: "VLOOKUP",
            min_args: 3,
            max_args: Some(4),
            implementation: lookup::fn_vlookup,
        });
    }

    fn register_financial_functions(&mut self) {
        // NPV(rate, value1, ...)
        self.register(FunctionDef {
            name: "NPV",
            min_args: 2,
            max_args: None,
            implementation: financial::fn_npv,
        });

        // PV(rate, nper, pmt, [fv], [type])
        self.register(FunctionDef {
            name: "PV",
            min_args: 3,
            max_args: Some(5),
            implementation: financial::fn_pv,
        });

        // FV(rate, nper, pmt, [pv], [type])
        self.register(FunctionDef {
            name: "FV",
            min_args: 3,
            max_args: Some(5),
            implementation: financial::fn_fv,
        });

        // PMT(rate, nper, pv, [fv], [type])
        self.register(FunctionDef {
            name: "PMT",
            min_args: 3,
            max_args: Some(5),
            implementation: financial::fn_pmt,
        });
    }
}

/// Numeric scalar argument at `index`, or the error value the call returns
///
/// Missing optional arguments yield `default`.
pub(crate) fn number_arg(
    args: &[FormulaValue],
    index: usize,
    default: Option<f64>,
) -> Result<f64, FormulaValue> {
    match args.get(index) {
        None => default.ok_or(FormulaValue::Error(quotecalc_core::CellError::Value)),
        Some(v) => v.to_number().map_err(FormulaValue::Error),
    }
}
