//! Common utilities for E2E tests.

use quotecalc::prelude::*;
use quotecalc::line_items::{PRODUCT_HEADERS, RATEIO_HEADERS};
use quotecalc::{Categoria, Moeda, SgiTis};
use std::io::{Cursor, Write};

/// A miniature FC template
///
/// - `produtos` / `rateio` with header rows
/// - FC!B13..B18 inputs, B19 margin, B8 margin fraction, B7 VPL
/// - DZ20 PRV mirror feeding a monthly discount rate in DZ21
pub fn fc_template() -> Workbook {
    let mut wb = Workbook::empty();

    let index = wb.add_worksheet_with_name("produtos").unwrap();
    let produtos = wb.worksheet_mut(index).unwrap();
    for (col, header) in PRODUCT_HEADERS.iter().enumerate() {
        produtos.set_cell_value_at(0, col as u16, *header).unwrap();
    }

    let index = wb.add_worksheet_with_name("rateio").unwrap();
    let rateio = wb.worksheet_mut(index).unwrap();
    for (col, header) in RATEIO_HEADERS.iter().enumerate() {
        rateio.set_cell_value_at(0, col as u16, *header).unwrap();
    }

    let index = wb.add_worksheet_with_name("FC").unwrap();
    let fc = wb.worksheet_mut(index).unwrap();
    fc.set_cell_value("A7", "VPL").unwrap();
    fc.set_cell_value("A8", "Margem %").unwrap();
    fc.set_cell_value("A13", "Receita Bruta").unwrap();
    fc.set_cell_value("A19", "Margem").unwrap();
    fc.set_cell_formula("B19", "=B13-B15-B16-B18").unwrap();
    fc.set_cell_formula("B8", "=IFERROR(B19/B13,0)").unwrap();
    fc.set_cell_value("DZ19", 0.12).unwrap();
    fc.set_cell_formula("DZ21", "=(1+DZ19)^(DZ20/360)-1").unwrap();
    fc.set_cell_formula("B7", "=NPV(DZ21,-B15-B16,B13-B18)").unwrap();
    wb
}

pub fn fc(wb: &Workbook) -> &Worksheet {
    wb.worksheet_by_name("FC").unwrap()
}

pub fn product(n: u32) -> QuoteProduct {
    QuoteProduct {
        fabricante: format!("Fabricante {n}"),
        part_number: format!("PN-{n:03}"),
        descricao: "Servidor".into(),
        id_familia_range: "PE".into(),
        categoria: Categoria::Hw,
        variacao_cambial: n % 2 == 0,
        custo_unitario: 1000.0 * f64::from(n),
        preco_venda: 1500.0 * f64::from(n),
        quantidade: n,
    }
}

pub fn service(item: u32) -> RateioService {
    RateioService {
        item,
        mes_inicio_minimo: 1,
        sgi_tis: SgiTis::Moin,
        servico: "Instalação".into(),
        descricao_servico: "Instalação física".into(),
        importado: false,
        fornecedor: "Acme".into(),
        valor_com_impostos: 5000.0,
        moeda_referencia: Moeda::Brl,
        prazo_custo: "30 dias".into(),
        mensalidades: 12,
    }
}

/// FC totals of the worked example
pub fn reference_inputs() -> CashFlowInputs {
    CashFlowInputs {
        gross_revenue: 450000.0,
        prv: 30.0,
        product_cost: 300000.0,
        allocated_cost: 50000.0,
        taxes: 81000.0,
    }
}

pub fn approx(actual: f64, expected: f64, tolerance: f64) {
    assert!(
        (actual - expected).abs() <= tolerance,
        "{actual} is not within {tolerance} of {expected}"
    );
}

/// A one-sheet XLSX document around raw `sheetData` XML
pub fn single_sheet_package(name: &str, sheet_xml: &str) -> Vec<u8> {
    let mut buf = Vec::new();
    let mut zip = zip::ZipWriter::new(Cursor::new(&mut buf));
    let options = zip::write::SimpleFileOptions::default();

    let parts = [
        (
            "[Content_Types].xml",
            r#"<?xml version="1.0"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="xml" ContentType="application/xml"/></Types>"#.to_string(),
        ),
        (
            "xl/workbook.xml",
            format!(r#"<?xml version="1.0"?><workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="{name}" sheetId="1" r:id="rId1"/></sheets></workbook>"#),
        ),
        (
            "xl/_rels/workbook.xml.rels",
            r#"<?xml version="1.0"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#.to_string(),
        ),
        ("xl/worksheets/sheet1.xml", sheet_xml.to_string()),
    ];
    for (path, content) in parts {
        zip.start_file(path, options).unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
    buf
}
