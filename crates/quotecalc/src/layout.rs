//! Template layout
//!
//! Where a cash-flow template expects its inputs and where it exposes its
//! outputs. [`TemplateLayout::default`] describes the standard FC template;
//! a different template can be described in JSON with the `serde` feature.

use crate::extract::{ExtractionMap, Scale};
use crate::inject::RowLayout;
use quotecalc_core::CellAddress;

/// Cells of the FC sheet that receive quote totals
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
pub struct FcInputCells {
    /// Gross revenue (receita bruta)
    pub gross_revenue: CellAddress,
    /// Days to receive payment
    pub prv: CellAddress,
    pub product_cost: CellAddress,
    /// Rateio cost (custo rateado)
    pub allocated_cost: CellAddress,
    pub taxes: CellAddress,
    /// Second copy of the PRV read by the discount schedule
    pub prv_mirror: CellAddress,
}

impl Default for FcInputCells {
    fn default() -> Self {
        Self {
            gross_revenue: CellAddress::new(12, 1),
            prv: CellAddress::new(13, 1),
            product_cost: CellAddress::new(14, 1),
            allocated_cost: CellAddress::new(15, 1),
            taxes: CellAddress::new(17, 1),
            prv_mirror: CellAddress::new(19, 129),
        }
    }
}

/// Names of the standard outputs
pub mod outputs {
    /// Net present value, FC!B7
    pub const VPL: &str = "vpl";
    /// Margin as a percentage, FC!B8
    pub const MARGEM_PERCENTUAL: &str = "margemPercentual";
    /// Margin in currency, FC!B19
    pub const MARGEM: &str = "margem";
}

/// The contract between quotes and a cash-flow template
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
pub struct TemplateLayout {
    pub products_sheet: String,
    pub products_rows: RowLayout,
    pub rateio_sheet: String,
    pub rateio_rows: RowLayout,
    pub fc_sheet: String,
    pub inputs: FcInputCells,
    pub outputs: ExtractionMap,
    /// Share of gross revenue taken by taxes
    pub tax_rate: f64,
}

impl Default for TemplateLayout {
    fn default() -> Self {
        let mut outputs = ExtractionMap::new();
        outputs
            .bind(self::outputs::VPL, CellAddress::new(6, 1), Scale::Unit)
            .bind(self::outputs::MARGEM_PERCENTUAL, CellAddress::new(7, 1), Scale::Percent)
            .bind(self::outputs::MARGEM, CellAddress::new(18, 1), Scale::Unit);

        Self {
            products_sheet: "produtos".to_string(),
            products_rows: RowLayout::default(),
            rateio_sheet: "rateio".to_string(),
            rateio_rows: RowLayout::default(),
            fc_sheet: "FC".to_string(),
            inputs: FcInputCells::default(),
            outputs,
            tax_rate: 0.18,
        }
    }
}
