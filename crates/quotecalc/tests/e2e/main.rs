//! End-to-end tests for quotecalc.
//!
//! Each test builds the cash-flow template it needs in memory with the same
//! sheet names and coordinates as the production FC template, then drives
//! the public pipeline against it.

mod cash_flow;
mod common;
mod properties;
mod roundtrip;

// Re-export common utilities for submodules
pub use common::*;
