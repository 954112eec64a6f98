//! Stand-alone line-item workbooks
//!
//! Quote exports without a template, the blank bulk-upload sheet for products
//! and the reader that turns a filled upload back into records.

use crate::error::{Error, Result};
use crate::inject::{inject_rows, RowLayout};
use crate::records::{parse_sim_nao, QuoteProduct, RateioService};
use quotecalc_core::{CellAddress, CellValue, Workbook, Worksheet};
use std::collections::{BTreeSet, HashMap};

/// Header row of the product sheet, columns A to K
pub const PRODUCT_HEADERS: [&str; 11] = [
    "Fabricante",
    "Part Number",
    "Descrição",
    "ID Família/Range",
    "Categoria",
    "Variação Cambial",
    "Custo Unitário",
    "Valor Unit. Venda",
    "Quantidade",
    "Custo Total",
    "Valor de Venda",
];

/// Header row of the rateio sheet, columns A to K
pub const RATEIO_HEADERS: [&str; 11] = [
    "Item",
    "Mês Início Mínimo",
    "SGI TIS",
    "Serviço",
    "Descrição do Serviço",
    "Importado",
    "Fornecedor",
    "Valor com Impostos",
    "Moeda de Referência",
    "Prazo do Custo",
    "Mensalidades",
];

/// Columns a bulk product upload fills in; totals are derived
const BULK_PRODUCT_COLUMNS: usize = 9;

/// A fresh workbook with headered `Produtos` and `Rateio` sheets
pub fn line_item_workbook(
    products: &[QuoteProduct],
    services: &[RateioService],
) -> Result<Workbook> {
    let mut workbook = Workbook::empty();

    let mut sheet = headered_sheet("Produtos", &PRODUCT_HEADERS)?;
    inject_rows(&mut sheet, &RowLayout::default(), products)?;
    workbook.add_existing_worksheet(sheet)?;

    let mut sheet = headered_sheet("Rateio", &RATEIO_HEADERS)?;
    inject_rows(&mut sheet, &RowLayout::default(), services)?;
    workbook.add_existing_worksheet(sheet)?;

    Ok(workbook)
}

/// The blank product upload sheet: one header row, no records
pub fn bulk_product_template() -> Result<Workbook> {
    let mut workbook = Workbook::empty();
    let sheet = headered_sheet("Produtos", &PRODUCT_HEADERS[..BULK_PRODUCT_COLUMNS])?;
    workbook.add_existing_worksheet(sheet)?;
    Ok(workbook)
}

fn headered_sheet(name: &str, headers: &[&str]) -> Result<Worksheet> {
    let mut sheet = Worksheet::new(name);
    for (col, header) in headers.iter().enumerate() {
        sheet.set_cell_value_at(0, col as u16, *header)?;
    }
    Ok(sheet)
}

/// Read products from the first sheet of an upload
///
/// Columns are found by their header text in row 1, in any order; derived
/// total columns are ignored. Blank rows are skipped. The first malformed
/// record fails the whole read with its 1-based row number.
pub fn parse_bulk_products(workbook: &Workbook) -> Result<Vec<QuoteProduct>> {
    let sheet = workbook
        .worksheet(0)
        .ok_or_else(|| Error::InvalidLayout("upload has no sheets".to_string()))?;

    let headers: HashMap<&str, u16> = sheet
        .iter_row(0)
        .filter_map(|(col, value)| value.as_string().map(|text| (text.trim(), col)))
        .collect();
    let mut columns = [0u16; BULK_PRODUCT_COLUMNS];
    for (slot, name) in columns.iter_mut().zip(PRODUCT_HEADERS) {
        *slot = *headers
            .get(name)
            .ok_or_else(|| Error::InvalidLayout(format!("missing column '{name}'")))?;
    }

    let rows: BTreeSet<u32> = sheet
        .iter_cells()
        .filter(|(row, _, value)| *row > 0 && !is_blank(value))
        .map(|(row, _, _)| row)
        .collect();

    rows.into_iter()
        .map(|row| {
            let reader = RowReader {
                sheet,
                row,
                columns: &columns,
            };
            reader.product()
        })
        .collect()
}

fn is_blank(value: &CellValue) -> bool {
    match value.effective_value() {
        CellValue::Empty => true,
        CellValue::String(s) => s.as_str().trim().is_empty(),
        _ => false,
    }
}

/// Field access for one upload row
struct RowReader<'a> {
    sheet: &'a Worksheet,
    row: u32,
    columns: &'a [u16; BULK_PRODUCT_COLUMNS],
}

impl RowReader<'_> {
    fn product(&self) -> Result<QuoteProduct> {
        Ok(QuoteProduct {
            fabricante: self.text(0)?,
            part_number: self.text(1)?,
            descricao: self.text(2)?,
            id_familia_range: self.text(3)?,
            categoria: self.parsed(4)?,
            variacao_cambial: self.flag(5)?,
            custo_unitario: self.number(6)?,
            preco_venda: self.number(7)?,
            quantidade: self.count(8)?,
        })
    }

    fn value(&self, field: usize) -> &CellValue {
        const EMPTY: &CellValue = &CellValue::Empty;
        self.sheet
            .cell_at(self.row, self.columns[field])
            .map(CellValue::effective_value)
            .unwrap_or(EMPTY)
    }

    fn invalid(&self, field: usize, message: impl std::fmt::Display) -> Error {
        Error::InvalidRecord {
            row: self.row + 1,
            message: format!(
                "{} ({}): {message}",
                PRODUCT_HEADERS[field],
                CellAddress::new(self.row, self.columns[field])
            ),
        }
    }

    fn unexpected(&self, field: usize, expected: &str, found: &CellValue) -> Error {
        self.invalid(field, format!("expected {expected}, found {}", found.type_name()))
    }

    fn text(&self, field: usize) -> Result<String> {
        match self.value(field) {
            CellValue::Empty => Ok(String::new()),
            CellValue::String(s) => Ok(s.as_str().trim().to_string()),
            CellValue::Number(n) => Ok(n.to_string()),
            other => Err(self.unexpected(field, "text", other)),
        }
    }

    fn parsed<T: std::str::FromStr<Err = String>>(&self, field: usize) -> Result<T> {
        self.text(field)?
            .parse()
            .map_err(|message: String| self.invalid(field, message))
    }

    fn flag(&self, field: usize) -> Result<bool> {
        match self.value(field) {
            CellValue::Empty => Ok(false),
            CellValue::Boolean(b) => Ok(*b),
            CellValue::String(s) => parse_sim_nao(s.as_str())
                .ok_or_else(|| self.invalid(field, format!("expected Sim or Não, found '{s}'"))),
            other => Err(self.unexpected(field, "Sim or Não", other)),
        }
    }

    fn number(&self, field: usize) -> Result<f64> {
        let n = match self.value(field) {
            CellValue::Number(n) => *n,
            CellValue::String(s) => parse_decimal(s.as_str())
                .ok_or_else(|| self.invalid(field, format!("'{s}' is not a number")))?,
            other => return Err(self.unexpected(field, "a number", other)),
        };
        if n.is_finite() && n >= 0.0 {
            Ok(n)
        } else {
            Err(self.invalid(field, format!("{n} is not a valid amount")))
        }
    }

    fn count(&self, field: usize) -> Result<u32> {
        let n = self.number(field)?;
        if n.fract() == 0.0 && n <= f64::from(u32::MAX) {
            Ok(n as u32)
        } else {
            Err(self.invalid(field, format!("{n} is not a whole quantity")))
        }
    }
}

/// Parse `1234.5`, `1.234,5`, `1234,5` or `1.234` (dot-grouped thousands)
fn parse_decimal(text: &str) -> Option<f64> {
    let text = text.trim();
    if dot_grouped(text) {
        return text.replace('.', "").parse().ok();
    }
    if let Ok(n) = text.parse::<f64>() {
        return Some(n);
    }
    if !text.contains(',') {
        return None;
    }
    text.replace('.', "").replace(',', ".").parse().ok()
}

/// `1.234` or `-12.345.678`: every group after the first has three digits
fn dot_grouped(text: &str) -> bool {
    let body = text.strip_prefix('-').unwrap_or(text);
    let mut groups = body.split('.');
    let head = groups.next().unwrap_or_default();
    let digits = |g: &str| !g.is_empty() && g.bytes().all(|b| b.is_ascii_digit());

    let mut tail = groups.peekable();
    tail.peek().is_some()
        && digits(head)
        && head.len() <= 3
        && !head.starts_with('0')
        && tail.all(|g| g.len() == 3 && digits(g))
}
