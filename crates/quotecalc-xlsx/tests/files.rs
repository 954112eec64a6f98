//! File-level tests for XLSX roundtrip (create -> save -> read -> verify)

use pretty_assertions::assert_eq;
use quotecalc_core::{CellError, CellRange, CellValue, Workbook};
use quotecalc_xlsx::{XlsxError, XlsxReader, XlsxWriter};

fn template() -> Workbook {
    let mut wb = Workbook::empty();
    let index = wb.add_worksheet_with_name("FC").unwrap();
    let fc = wb.worksheet_mut(index).unwrap();
    fc.set_cell_value("A13", "Receita Bruta").unwrap();
    fc.set_cell_value("B13", 450000.0).unwrap();
    fc.set_cell_value("B14", 30.0).unwrap();
    fc.set_cell_value("C1", true).unwrap();
    fc.set_cell_value("C2", CellError::Div0).unwrap();
    fc.set_cell_value(
        "B19",
        CellValue::formula_with_cached("=B13-B15-B16-B18", CellValue::Number(19000.0)),
    )
    .unwrap();
    fc.set_cell_value(
        "B8",
        CellValue::formula_with_cached("=B19/B13", CellValue::Error(CellError::Div0)),
    )
    .unwrap();
    fc.set_cell_formula("B7", "=NPV(DZ21,B15,B13)").unwrap();
    fc.declare_dimension(CellRange::parse("A1:DZ40").unwrap());
    wb
}

#[test]
fn test_file_roundtrip() {
    let wb = template();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fluxo-de-caixa-1.xlsx");

    XlsxWriter::write_file(&wb, &path).unwrap();
    let loaded = XlsxReader::read_file(&path).unwrap();

    let before = wb.worksheet(0).unwrap();
    let after = loaded.worksheet(0).unwrap();
    assert_eq!(after.name(), "FC");
    assert_eq!(after.dimension().unwrap().to_string(), "A1:DZ40");

    let cells = |ws: &quotecalc_core::Worksheet| -> Vec<(u32, u16, CellValue)> {
        ws.iter_cells().map(|(r, c, v)| (r, c, v.clone())).collect()
    };
    assert_eq!(cells(after), cells(before));
}

#[test]
fn test_bytes_and_file_agree() {
    let wb = template();
    let bytes = XlsxWriter::write_bytes(&wb).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("template.xlsx");
    std::fs::write(&path, &bytes).unwrap();

    let from_file = XlsxReader::read_file(&path).unwrap();
    let from_bytes = XlsxReader::read_bytes(&bytes).unwrap();
    assert_eq!(
        from_file.worksheet(0).unwrap().cell_count(),
        from_bytes.worksheet(0).unwrap().cell_count()
    );
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = XlsxReader::read_file(dir.path().join("absent.xlsx")).unwrap_err();
    assert!(matches!(err, XlsxError::Io(_)));
    assert!(!err.is_malformed());
}
