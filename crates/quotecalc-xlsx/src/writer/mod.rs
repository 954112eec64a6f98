//! XLSX writer
//!
//! Writes sheet names, cell values, formulas with their cached results and
//! the declared `<dimension>` of each sheet.

use std::fs::File;
use std::io::{BufWriter, Cursor, Seek, Write};
use std::path::Path;

use crate::error::{XlsxError, XlsxResult};
use quotecalc_core::{CellAddress, CellValue, Workbook, Worksheet};

/// XLSX file writer
pub struct XlsxWriter;

impl XlsxWriter {
    /// Write a workbook to a file path
    pub fn write_file<P: AsRef<Path>>(workbook: &Workbook, path: P) -> XlsxResult<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        Self::write(workbook, &mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Serialize a workbook into an in-memory document
    pub fn write_bytes(workbook: &Workbook) -> XlsxResult<Vec<u8>> {
        let mut cursor = Cursor::new(Vec::new());
        Self::write(workbook, &mut cursor)?;
        Ok(cursor.into_inner())
    }

    /// Write a workbook to a writer
    pub fn write<W: Write + Seek>(workbook: &Workbook, writer: W) -> XlsxResult<()> {
        if workbook.is_empty() {
            return Err(XlsxError::InvalidFormat(
                "a workbook needs at least one sheet".into(),
            ));
        }

        let mut zip = zip::ZipWriter::new(writer);

        Self::write_content_types(&mut zip, workbook)?;
        Self::write_root_rels(&mut zip)?;
        Self::write_workbook_xml(&mut zip, workbook)?;
        Self::write_workbook_rels(&mut zip, workbook)?;

        for (i, sheet) in workbook.worksheets().enumerate() {
            Self::write_worksheet(&mut zip, sheet, i)?;
        }

        zip.finish()?;
        log::debug!("wrote workbook with {} sheet(s)", workbook.sheet_count());
        Ok(())
    }

    fn write_content_types<W: Write + Seek>(
        zip: &mut zip::ZipWriter<W>,
        workbook: &Workbook,
    ) -> XlsxResult<()> {
        let options = zip::write::SimpleFileOptions::default();
        zip.start_file("[Content_Types].xml", options)?;

        let mut content = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
    <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
    <Default Extension="xml" ContentType="application/xml"/>
    <Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>"#,
        );

        for i in 0..workbook.sheet_count() {
            content.push_str(&format!(
                r#"
    <Override PartName="/xl/worksheets/sheet{}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#,
                i + 1
            ));
        }

        content.push_str("\n</Types>");

        zip.write_all(content.as_bytes())?;
        Ok(())
    }

    fn write_root_rels<W: Write + Seek>(zip: &mut zip::ZipWriter<W>) -> XlsxResult<()> {
        let options = zip::write::SimpleFileOptions::default();
        zip.start_file("_rels/.rels", options)?;

        let content = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
    <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>"#;

        zip.write_all(content.as_bytes())?;
        Ok(())
    }

    fn write_workbook_xml<W: Write + Seek>(
        zip: &mut zip::ZipWriter<W>,
        workbook: &Workbook,
    ) -> XlsxResult<()> {
        let options = zip::write::SimpleFileOptions::default();
        zip.start_file("xl/workbook.xml", options)?;

        let mut content = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
    <sheets>"#,
        );

        for (i, sheet) in workbook.worksheets().enumerate() {
            content.push_str(&format!(
                r#"
        <sheet name="{}" sheetId="{}" r:id="rId{}"/>"#,
                escape_xml(sheet.name()),
                i + 1,
                i + 1
            ));
        }

        content.push_str("\n    </sheets>");

        // Ask spreadsheet applications to recompute on open
        let has_formulas = workbook
            .worksheets()
            .any(|sheet| sheet.formula_cells().next().is_some());
        if has_formulas {
            content.push_str("\n    <calcPr fullCalcOnLoad=\"1\"/>");
        }

        content.push_str("\n</workbook>");

        zip.write_all(content.as_bytes())?;
        Ok(())
    }

    fn write_workbook_rels<W: Write + Seek>(
        zip: &mut zip::ZipWriter<W>,
        workbook: &Workbook,
    ) -> XlsxResult<()> {
        let options = zip::write::SimpleFileOptions::default();
        zip.start_file("xl/_rels/workbook.xml.rels", options)?;

        let mut content = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        );

        for i in 0..workbook.sheet_count() {
            content.push_str(&format!(
                r#"
    <Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{}.xml"/>"#,
                i + 1,
                i + 1
            ));
        }

        content.push_str("\n</Relationships>");

        zip.write_all(content.as_bytes())?;
        Ok(())
    }

    fn write_worksheet<W: Write + Seek>(
        zip: &mut zip::ZipWriter<W>,
        sheet: &Worksheet,
        index: usize,
    ) -> XlsxResult<()> {
        let options = zip::write::SimpleFileOptions::default();
        zip.start_file(format!("xl/worksheets/sheet{}.xml", index + 1), options)?;

        let mut content = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">"#,
        );

        if let Some(range) = sheet.dimension() {
            content.push_str(&format!("\n    <dimension ref=\"{}\"/>", range.to_a1_string()));
        }
        content.push_str("\n    <sheetData>");

        // Write cell data (sparse, row-major)
        let mut current_row: Option<u32> = None;
        for (row, col, value) in sheet.iter_cells() {
            if current_row != Some(row) {
                if current_row.is_some() {
                    content.push_str("\n        </row>");
                }
                content.push_str(&format!("\n        <row r=\"{}\">", row + 1));
                current_row = Some(row);
            }

            let cell_ref = CellAddress::new(row, col).to_a1_string();
            Self::write_cell(&mut content, &cell_ref, value);
        }

        if current_row.is_some() {
            content.push_str("\n        </row>");
        }

        content.push_str("\n    </sheetData>\n</worksheet>");

        zip.write_all(content.as_bytes())?;
        Ok(())
    }

    fn write_cell(content: &mut String, cell_ref: &str, value: &CellValue) {
        match value {
            CellValue::Empty => {}
            CellValue::Formula { text, cached_value } => {
                let formula = text.strip_prefix('=').unwrap_or(text);
                let (type_attr, cached) = match cached_value.as_deref() {
                    Some(cached) => Self::typed_value(cached),
                    None => ("", None),
                };
                content.push_str(&format!(
                    "\n            <c r=\"{}\"{}><f>{}</f>",
                    cell_ref,
                    type_attr,
                    escape_xml(formula)
                ));
                if let Some(v) = cached {
                    content.push_str(&format!("<v>{}</v>", escape_xml(&v)));
                }
                content.push_str("</c>");
            }
            CellValue::String(s) => {
                content.push_str(&format!(
                    "\n            <c r=\"{}\" t=\"inlineStr\"><is><t xml:space=\"preserve\">{}</t></is></c>",
                    cell_ref,
                    escape_xml(s.as_str())
                ));
            }
            other => {
                let (type_attr, v) = Self::typed_value(other);
                if let Some(v) = v {
                    content.push_str(&format!(
                        "\n            <c r=\"{}\"{}><v>{}</v></c>",
                        cell_ref,
                        type_attr,
                        escape_xml(&v)
                    ));
                }
            }
        }
    }

    /// `t` attribute and `<v>` text for a plain value
    fn typed_value(value: &CellValue) -> (&'static str, Option<String>) {
        match value {
            CellValue::Number(n) if n.is_finite() => ("", Some(n.to_string())),
            CellValue::Number(_) => (" t=\"e\"", Some("#NUM!".to_string())),
            CellValue::Boolean(b) => (" t=\"b\"", Some(if *b { "1" } else { "0" }.to_string())),
            CellValue::Error(e) => (" t=\"e\"", Some(e.as_str().to_string())),
            CellValue::String(s) => (" t=\"str\"", Some(s.as_str().to_string())),
            CellValue::Empty | CellValue::Formula { .. } => ("", None),
        }
    }
}

/// Escape text for XML element content and attribute values
fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '\r' => out.push_str("_x000D_"),
            c if (c as u32) < 0x20 && !matches!(c, '\t' | '\n') => {
                out.push_str(&format!("_x{:04X}_", c as u32));
            }
            c => out.push(c),
        }
    }
    out
}
