//! Quote -> template -> outputs scenarios

use crate::common::*;
use pretty_assertions::assert_eq;
use quotecalc::prelude::*;

#[test]
fn test_reference_quote_margin() {
    let mut wb = fc_template();
    let layout = TemplateLayout::default();
    let result =
        update_cash_flow_with_inputs(&mut wb, &Quote::default(), reference_inputs(), &layout)
            .unwrap();

    assert_eq!(result.outputs.provenance, Provenance::Evaluated);
    assert_eq!(result.margem(), 19000.0);
    approx(result.margem_percentual(), 4.22, 0.005);
    assert!(result.outputs.defaulted.is_empty());

    let rate = 1.12f64.powf(30.0 / 360.0) - 1.0;
    let expected_vpl = -350000.0 / (1.0 + rate) + 369000.0 / (1.0 + rate).powi(2);
    approx(result.vpl(), expected_vpl, 1e-6);

    // Margin % stays a fraction inside the workbook
    let b8 = fc(&wb).get_calculated_value_at(7, 1).cloned();
    match b8 {
        Some(CellValue::Number(n)) => approx(n, 19000.0 / 450000.0, 1e-12),
        other => panic!("unexpected B8 {other:?}"),
    }
}

#[test]
fn test_inputs_land_on_fc_cells() {
    let mut wb = fc_template();
    update_cash_flow_with_inputs(
        &mut wb,
        &Quote::default(),
        reference_inputs(),
        &TemplateLayout::default(),
    )
    .unwrap();

    let fc = fc(&wb);
    let read = |a1: &str| fc.get_value(a1).unwrap().as_number();
    assert_eq!(read("B13"), Some(450000.0));
    assert_eq!(read("B14"), Some(30.0));
    assert_eq!(read("B15"), Some(300000.0));
    assert_eq!(read("B16"), Some(50000.0));
    assert_eq!(read("B18"), Some(81000.0));
    assert_eq!(read("DZ20"), Some(30.0));
    assert_eq!(fc.dimension().unwrap().to_string(), "A7:DZ21");
}

#[test]
fn test_bulk_products_expand_declared_range() {
    let mut wb = fc_template();
    let quote = Quote {
        number: "2024-001".into(),
        prv: 30,
        products: (1..=3).map(product).collect(),
        services: Vec::new(),
    };
    fill_template(&mut wb, &quote, &TemplateLayout::default()).unwrap();

    let produtos = wb.worksheet_by_name("produtos").unwrap();
    assert_eq!(produtos.dimension().unwrap().to_string(), "A1:K4");
    assert_eq!(
        produtos.get_value("A1").unwrap(),
        CellValue::string("Fabricante")
    );
    assert_eq!(
        produtos.get_value("A2").unwrap(),
        CellValue::string("Fabricante 1")
    );
    assert_eq!(produtos.get_value("F3").unwrap(), CellValue::string("Sim"));
    assert_eq!(produtos.get_value("K4").unwrap(), CellValue::Number(13500.0));
    assert_eq!(fc(&wb).get_value("DZ20").unwrap(), CellValue::Number(30.0));
}

#[test]
fn test_full_quote_pipeline() {
    let mut wb = fc_template();
    let quote = Quote {
        number: "2024-002".into(),
        prv: 60,
        products: (1..=3).map(product).collect(),
        services: vec![service(1), service(2)],
    };
    let layout = TemplateLayout::default();
    let result = update_cash_flow(&mut wb, &quote, &layout).unwrap();

    // 1500 + 6000 + 13500 revenue, 1000 + 4000 + 9000 cost
    assert_eq!(result.inputs.gross_revenue, 21000.0);
    assert_eq!(result.inputs.product_cost, 14000.0);
    assert_eq!(result.inputs.allocated_cost, 10000.0);
    approx(result.inputs.taxes, 3780.0, 1e-9);
    approx(result.margem(), result.inputs.margin(), 1e-9);
    approx(result.margem_percentual(), result.inputs.margin_percent(), 1e-9);
    assert!(!result.is_degraded());

    let rateio = wb.worksheet_by_name("rateio").unwrap();
    assert_eq!(rateio.dimension().unwrap().to_string(), "A1:K3");
    assert_eq!(rateio.get_value("C3").unwrap(), CellValue::string("MOIN"));
}

#[test]
fn test_empty_divisor_is_local() {
    let mut wb = fc_template();
    {
        let fc = wb.worksheet_by_name_mut("FC").unwrap();
        fc.set_cell_formula("B8", "=B19/B13").unwrap();
        fc.set_cell_formula("B9", "=B8*100").unwrap();
        fc.set_cell_value("B15", 300000.0).unwrap();
        fc.set_cell_value("B16", 50000.0).unwrap();
    }

    let table = evaluate_sheet(&mut wb, "FC").unwrap();
    assert_eq!(table.get("B8"), Some(&CellValue::Error(CellError::Div0)));
    assert_eq!(table.get("B9"), Some(&CellValue::Error(CellError::Div0)));
    assert_eq!(table.get("B19"), Some(&CellValue::Number(-350000.0)));

    let out = extract(&table, &TemplateLayout::default().outputs);
    assert_eq!(out.value("margemPercentual"), 0.0);
    assert_eq!(out.value("margem"), -350000.0);
    assert_eq!(out.defaulted, vec!["margemPercentual"]);
}

#[test]
fn test_cycle_falls_back_to_cached_outputs() {
    let mut wb = fc_template();
    let layout = TemplateLayout::default();
    let first =
        update_cash_flow_with_inputs(&mut wb, &Quote::default(), reference_inputs(), &layout)
            .unwrap();

    {
        let fc = wb.worksheet_by_name_mut("FC").unwrap();
        fc.set_cell_formula("C1", "=C2+1").unwrap();
        fc.set_cell_formula("C2", "=C1+1").unwrap();
    }
    let changed = CashFlowInputs {
        gross_revenue: 900000.0,
        ..reference_inputs()
    };
    let second = update_cash_flow_with_inputs(&mut wb, &Quote::default(), changed, &layout).unwrap();

    assert!(second.is_degraded());
    assert!(second.stats.is_none());
    assert!(second.failure.as_deref().unwrap().starts_with("Cyclic dependency"));
    assert_eq!(second.outputs.values, first.outputs.values);
    // Inputs were still injected
    assert_eq!(fc(&wb).get_value("B13").unwrap(), CellValue::Number(900000.0));
}

#[test]
fn test_unsupported_function_falls_back() {
    let mut wb = fc_template();
    wb.worksheet_by_name_mut("FC")
        .unwrap()
        .set_cell_formula("C3", "=XIRR(B13:B18,A13:A18)")
        .unwrap();

    assert!(matches!(
        evaluate_sheet(&mut wb, "FC"),
        Err(Error::UnsupportedFunction(ref name)) if name == "XIRR"
    ));

    let result = update_cash_flow_with_inputs(
        &mut wb,
        &Quote::default(),
        reference_inputs(),
        &TemplateLayout::default(),
    )
    .unwrap();
    assert_eq!(result.outputs.provenance, Provenance::Fallback);
    // Never evaluated, so every output defaults
    assert_eq!(result.outputs.defaulted.len(), 3);
    assert_eq!(result.margem(), 0.0);
}

#[test]
fn test_missing_fc_sheet_is_not_recoverable() {
    let mut wb = Workbook::empty();
    wb.add_worksheet_with_name("produtos").unwrap();
    let err = update_cash_flow(&mut wb, &Quote::default(), &TemplateLayout::default())
        .unwrap_err();
    assert!(matches!(err, Error::SheetNotFound(ref name) if name == "FC"));
}

#[test]
fn test_cross_sheet_totals() {
    let mut wb = fc_template();
    wb.worksheet_by_name_mut("FC")
        .unwrap()
        .set_cell_formula("C13", "=SUM(produtos!K2:K50)")
        .unwrap();
    let quote = Quote {
        number: "2024-003".into(),
        prv: 30,
        products: (1..=3).map(product).collect(),
        services: Vec::new(),
    };
    fill_template(&mut wb, &quote, &TemplateLayout::default()).unwrap();

    let table = evaluate_sheet(&mut wb, "FC").unwrap();
    assert_eq!(table.get("C13"), Some(&CellValue::Number(21000.0)));
}

#[test]
fn test_fewer_records_leave_stale_rows() {
    let mut wb = fc_template();
    let layout = TemplateLayout::default();
    let mut quote = Quote {
        number: "2024-004".into(),
        prv: 30,
        products: (1..=3).map(product).collect(),
        services: Vec::new(),
    };
    fill_template(&mut wb, &quote, &layout).unwrap();
    quote.products.truncate(1);
    fill_template(&mut wb, &quote, &layout).unwrap();

    let produtos = wb.worksheet_by_name("produtos").unwrap();
    assert_eq!(produtos.dimension().unwrap().to_string(), "A1:K4");
    assert_eq!(
        produtos.get_value("A4").unwrap(),
        CellValue::string("Fabricante 3")
    );
}
