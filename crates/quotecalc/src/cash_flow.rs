//! Cash-flow pipeline
//!
//! Fills a cash-flow template from a quote and reads back VPL and margin:
//! line items go into the `produtos` / `rateio` sheets, quote totals into the
//! FC input cells, then the FC sheet is evaluated. When evaluation fails the
//! outputs are read from the stored cells instead and the result is marked
//! as degraded.

use crate::calculation::{evaluate_sheet, CalculationStats};
use crate::error::{Error, Result};
use crate::extract::{extract, Extraction};
use crate::fallback::read_direct;
use crate::inject::{inject, inject_rows, InjectionMap, InjectionReport, RowLayout, RowRecord};
use crate::layout::{outputs, TemplateLayout};
use crate::records::Quote;
use quotecalc_core::Workbook;

/// Quote totals written into the FC input cells
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct CashFlowInputs {
    /// Σ sale price × quantity
    pub gross_revenue: f64,
    /// Days to receive payment
    pub prv: f64,
    /// Σ unit cost × quantity
    pub product_cost: f64,
    /// Σ rateio cost with taxes
    pub allocated_cost: f64,
    pub taxes: f64,
}

impl CashFlowInputs {
    /// Derive the totals from a quote's line items
    pub fn from_quote(quote: &Quote, tax_rate: f64) -> Self {
        let gross_revenue: f64 = quote.products.iter().map(|p| p.valor_venda()).sum();
        Self {
            gross_revenue,
            prv: f64::from(quote.prv),
            product_cost: quote.products.iter().map(|p| p.custo_total()).sum(),
            allocated_cost: quote.services.iter().map(|s| s.valor_com_impostos).sum(),
            taxes: gross_revenue * tax_rate,
        }
    }

    /// Revenue left after every cost and tax
    pub fn margin(&self) -> f64 {
        self.gross_revenue - self.product_cost - self.allocated_cost - self.taxes
    }

    /// Margin over revenue as a percentage, 0 without revenue
    pub fn margin_percent(&self) -> f64 {
        if self.gross_revenue == 0.0 {
            0.0
        } else {
            self.margin() / self.gross_revenue * 100.0
        }
    }

    /// Literal entries for the FC input cells, PRV mirror included
    pub fn injection_map(&self, layout: &TemplateLayout) -> InjectionMap {
        let cells = &layout.inputs;
        let mut map = InjectionMap::new();
        map.literal(cells.gross_revenue, self.gross_revenue)
            .literal(cells.prv, self.prv)
            .literal(cells.product_cost, self.product_cost)
            .literal(cells.allocated_cost, self.allocated_cost)
            .literal(cells.taxes, self.taxes)
            .literal(cells.prv_mirror, self.prv);
        map
    }
}

/// Outcome of [`update_cash_flow`]
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct CashFlowResult {
    pub inputs: CashFlowInputs,
    pub outputs: Extraction,
    /// Statistics of the evaluation pass, absent when it failed
    pub stats: Option<CalculationStats>,
    /// Why the evaluation pass failed, when it did
    pub failure: Option<String>,
}

impl CashFlowResult {
    pub fn vpl(&self) -> f64 {
        self.outputs.value(outputs::VPL)
    }

    pub fn margem(&self) -> f64 {
        self.outputs.value(outputs::MARGEM)
    }

    /// Margin as a percentage (4.22 for 4.22 %)
    pub fn margem_percentual(&self) -> f64 {
        self.outputs.value(outputs::MARGEM_PERCENTUAL)
    }

    pub fn is_degraded(&self) -> bool {
        self.outputs.is_degraded()
    }
}

/// Fill the template from a quote, evaluate FC and read the outputs
pub fn update_cash_flow(
    workbook: &mut Workbook,
    quote: &Quote,
    layout: &TemplateLayout,
) -> Result<CashFlowResult> {
    let inputs = CashFlowInputs::from_quote(quote, layout.tax_rate);
    update_cash_flow_with_inputs(workbook, quote, inputs, layout)
}

/// Like [`update_cash_flow`], with totals supplied by the caller
pub fn update_cash_flow_with_inputs(
    workbook: &mut Workbook,
    quote: &Quote,
    inputs: CashFlowInputs,
    layout: &TemplateLayout,
) -> Result<CashFlowResult> {
    if workbook.sheet_index(&layout.fc_sheet).is_none() {
        return Err(Error::SheetNotFound(layout.fc_sheet.clone()));
    }
    tracing::debug!(
        "Updating cash flow for quote {}: {} products, {} services",
        quote.number,
        quote.products.len(),
        quote.services.len()
    );

    inject_line_items(workbook, quote, layout)?;
    let fc = workbook.require_sheet_mut(&layout.fc_sheet)?;
    inject(fc, &inputs.injection_map(layout))?;

    let result = match evaluate_sheet(workbook, &layout.fc_sheet) {
        Ok(table) => CashFlowResult {
            inputs,
            outputs: extract(&table, &layout.outputs),
            stats: Some(table.stats().clone()),
            failure: None,
        },
        Err(err) => {
            tracing::warn!("Recalculation of {} failed: {err}", layout.fc_sheet);
            let fc = workbook.require_sheet(&layout.fc_sheet)?;
            CashFlowResult {
                inputs,
                outputs: read_direct(fc, &layout.outputs),
                stats: None,
                failure: Some(err.to_string()),
            }
        }
    };
    Ok(result)
}

/// Write line items and the PRV mirror without evaluating anything
///
/// Used to export a filled template; sheets the template lacks are skipped.
pub fn fill_template(
    workbook: &mut Workbook,
    quote: &Quote,
    layout: &TemplateLayout,
) -> Result<InjectionReport> {
    let mut report = inject_line_items(workbook, quote, layout)?;
    if let Some(fc) = workbook.worksheet_by_name_mut(&layout.fc_sheet) {
        let mut map = InjectionMap::new();
        map.literal(layout.inputs.prv_mirror, f64::from(quote.prv));
        report.merge(inject(fc, &map)?);
    }
    Ok(report)
}

fn inject_line_items(
    workbook: &mut Workbook,
    quote: &Quote,
    layout: &TemplateLayout,
) -> Result<InjectionReport> {
    let mut report = inject_optional(
        workbook,
        &layout.products_sheet,
        &layout.products_rows,
        &quote.products,
    )?;
    report.merge(inject_optional(
        workbook,
        &layout.rateio_sheet,
        &layout.rateio_rows,
        &quote.services,
    )?);
    Ok(report)
}

fn inject_optional<R: RowRecord>(
    workbook: &mut Workbook,
    sheet_name: &str,
    rows: &RowLayout,
    records: &[R],
) -> Result<InjectionReport> {
    match workbook.worksheet_by_name_mut(sheet_name) {
        Some(sheet) => inject_rows(sheet, rows, records),
        None => {
            tracing::debug!(
                "Template has no {sheet_name} sheet, skipping {} rows",
                records.len()
            );
            Ok(InjectionReport::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{Categoria, QuoteProduct};
    use pretty_assertions::assert_eq;

    fn product(custo: f64, preco: f64, quantidade: u32) -> QuoteProduct {
        QuoteProduct {
            fabricante: "HP".into(),
            part_number: "X1".into(),
            descricao: "Switch".into(),
            id_familia_range: String::new(),
            categoria: Categoria::Hw,
            variacao_cambial: false,
            custo_unitario: custo,
            preco_venda: preco,
            quantidade,
        }
    }

    #[test]
    fn test_totals_from_quote() {
        let quote = Quote {
            number: "Q-1".into(),
            prv: 45,
            products: vec![product(100.0, 150.0, 2), product(10.0, 20.0, 5)],
            services: Vec::new(),
        };
        let inputs = CashFlowInputs::from_quote(&quote, 0.18);
        assert_eq!(inputs.gross_revenue, 400.0);
        assert_eq!(inputs.product_cost, 250.0);
        assert_eq!(inputs.prv, 45.0);
        assert!((inputs.taxes - 72.0).abs() < 1e-9);
        assert!((inputs.margin() - 78.0).abs() < 1e-9);
        assert!((inputs.margin_percent() - 19.5).abs() < 1e-9);
    }

    #[test]
    fn test_margin_percent_without_revenue() {
        assert_eq!(CashFlowInputs::default().margin_percent(), 0.0);
    }

    #[test]
    fn test_missing_fc_sheet() {
        let mut wb = Workbook::empty();
        wb.add_worksheet_with_name("produtos").unwrap();
        let result = update_cash_flow(&mut wb, &Quote::default(), &TemplateLayout::default());
        assert!(matches!(result, Err(Error::SheetNotFound(ref s)) if s == "FC"));
        // Nothing injected before the failure
        assert_eq!(wb.worksheet_by_name("produtos").unwrap().cell_count(), 0);
    }

    #[test]
    fn test_fill_template_mirrors_prv_only() {
        let mut wb = Workbook::empty();
        wb.add_worksheet_with_name("FC").unwrap();
        let quote = Quote {
            number: "Q-2".into(),
            prv: 60,
            products: vec![product(1.0, 2.0, 1)],
            services: Vec::new(),
        };
        let report = fill_template(&mut wb, &quote, &TemplateLayout::default()).unwrap();
        assert_eq!(report.created, 1);

        let fc = wb.worksheet_by_name("FC").unwrap();
        assert_eq!(fc.get_value("DZ20").unwrap().as_number(), Some(60.0));
        assert_eq!(fc.get_value("B13").unwrap().as_number(), None);
    }
}
