//! XLSX reader
//!
//! Loads sheet names, cell values, formulas with their cached results and
//! each sheet's declared `<dimension>`. Shared formulas are expanded into
//! one formula per cell. Styles, comments and drawing parts are not read.

mod shared;

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek};
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::error::{XlsxError, XlsxResult};
use shared::SharedFormulas;
use quotecalc_core::{CellAddress, CellError, CellRange, CellValue, Workbook, Worksheet};

/// Decode Excel's `_xHHHH_` escape sequences in strings.
///
/// - `_x000d_` = CR (carriage return)
/// - `_x000a_` = LF (line feed)
/// - `_x0009_` = Tab
/// - `_x005f_` = Underscore (escaped underscore)
fn decode_excel_escapes(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(pos) = rest.find("_x") {
        result.push_str(&rest[..pos]);
        let candidate = &rest[pos..];
        let decoded = candidate
            .get(2..6)
            .filter(|hex| hex.chars().all(|c| c.is_ascii_hexdigit()))
            .filter(|_| candidate.as_bytes().get(6) == Some(&b'_'))
            .and_then(|hex| u32::from_str_radix(hex, 16).ok())
            .and_then(char::from_u32);

        match decoded {
            Some(c) => {
                result.push(c);
                rest = &candidate[7..];
            }
            None => {
                result.push_str("_x");
                rest = &candidate[2..];
            }
        }
    }
    result.push_str(rest);
    result
}

fn attr_value(e: &BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == key)
        .and_then(|attr| attr.unescape_value().ok().map(|v| v.to_string()))
}

/// Cell being assembled while its child elements stream past
#[derive(Default)]
struct PendingCell {
    reference: Option<String>,
    cell_type: Option<String>,
    value: Option<String>,
    formula: Option<String>,
    /// `si` of a `<f t="shared">` element
    shared_index: Option<u32>,
}

impl PendingCell {
    fn note_formula(&mut self, e: &BytesStart) {
        if attr_value(e, b"t").as_deref() == Some("shared") {
            self.shared_index = attr_value(e, b"si").and_then(|si| si.trim().parse().ok());
        }
    }
}

/// XLSX file reader
pub struct XlsxReader;

impl XlsxReader {
    /// Read a workbook from a file path
    pub fn read_file<P: AsRef<Path>>(path: P) -> XlsxResult<Workbook> {
        let file = File::open(path)?;
        Self::read(BufReader::new(file))
    }

    /// Read a workbook from an in-memory document
    pub fn read_bytes(bytes: &[u8]) -> XlsxResult<Workbook> {
        Self::read(Cursor::new(bytes))
    }

    /// Read a workbook from a reader
    pub fn read<R: Read + Seek>(reader: R) -> XlsxResult<Workbook> {
        let mut archive = zip::ZipArchive::new(reader)?;

        // Verify this is an XLSX file
        if archive.by_name("[Content_Types].xml").is_err() {
            return Err(XlsxError::InvalidFormat(
                "Missing [Content_Types].xml".into(),
            ));
        }

        let shared_strings = Self::read_shared_strings(&mut archive)?;
        let sheet_info = Self::read_workbook_xml(&mut archive)?;
        let sheet_paths = Self::read_workbook_rels(&mut archive)?;

        let mut workbook = Workbook::empty();
        for (name, r_id) in &sheet_info {
            let Some(path) = sheet_paths.get(r_id) else {
                log::warn!("sheet '{}' has no worksheet relationship {}, skipped", name, r_id);
                continue;
            };
            let mut worksheet = Worksheet::new(name.as_str());
            Self::read_worksheet(&mut archive, path, &mut worksheet, &shared_strings)?;
            workbook.add_existing_worksheet(worksheet)?;
        }

        if workbook.is_empty() {
            return Err(XlsxError::InvalidFormat("workbook has no sheets".into()));
        }

        log::debug!("read workbook with {} sheet(s)", workbook.sheet_count());
        Ok(workbook)
    }

    /// Read the shared strings table
    fn read_shared_strings<R: Read + Seek>(
        archive: &mut zip::ZipArchive<R>,
    ) -> XlsxResult<Vec<String>> {
        let mut strings = Vec::new();

        let file = match archive.by_name("xl/sharedStrings.xml") {
            Ok(f) => f,
            Err(_) => return Ok(strings), // No shared strings is valid
        };

        let mut xml_reader = Reader::from_reader(BufReader::new(file));
        xml_reader.trim_text(false);

        let mut buf = Vec::new();
        let mut current = String::new();
        let mut in_si = false;
        let mut in_t = false;
        // Phonetic runs (<rPh>) also hold <t> elements that are not part of the text
        let mut in_phonetic = false;

        loop {
            match xml_reader.read_event_into(&mut buf)? {
                Event::Start(e) => match e.name().as_ref() {
                    b"si" => {
                        in_si = true;
                        current.clear();
                    }
                    b"rPh" => in_phonetic = true,
                    b"t" if in_si && !in_phonetic => in_t = true,
                    _ => {}
                },
                Event::Empty(e) if e.name().as_ref() == b"si" => strings.push(String::new()),
                Event::End(e) => match e.name().as_ref() {
                    b"si" => {
                        strings.push(decode_excel_escapes(&current));
                        in_si = false;
                    }
                    b"rPh" => in_phonetic = false,
                    b"t" => in_t = false,
                    _ => {}
                },
                Event::Text(e) if in_t => {
                    current.push_str(&e.unescape()?);
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        Ok(strings)
    }

    /// Read workbook.xml to get sheet names and rIds
    fn read_workbook_xml<R: Read + Seek>(
        archive: &mut zip::ZipArchive<R>,
    ) -> XlsxResult<Vec<(String, String)>> {
        let file = archive
            .by_name("xl/workbook.xml")
            .map_err(|_| XlsxError::MissingPart("xl/workbook.xml".into()))?;

        let mut xml_reader = Reader::from_reader(BufReader::new(file));
        xml_reader.trim_text(true);

        let mut buf = Vec::new();
        let mut sheets = Vec::new();

        loop {
            match xml_reader.read_event_into(&mut buf)? {
                Event::Empty(e) | Event::Start(e) if e.name().as_ref() == b"sheet" => {
                    let name = attr_value(&e, b"name");
                    let r_id = attr_value(&e, b"r:id");
                    match (name, r_id) {
                        (Some(name), Some(r_id)) => sheets.push((name, r_id)),
                        _ => {
                            return Err(XlsxError::Parse(
                                "<sheet> without name or r:id in xl/workbook.xml".into(),
                            ))
                        }
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        Ok(sheets)
    }

    /// Read workbook.xml.rels to get sheet file paths
    fn read_workbook_rels<R: Read + Seek>(
        archive: &mut zip::ZipArchive<R>,
    ) -> XlsxResult<HashMap<String, String>> {
        let file = archive
            .by_name("xl/_rels/workbook.xml.rels")
            .map_err(|_| XlsxError::MissingPart("xl/_rels/workbook.xml.rels".into()))?;

        let mut xml_reader = Reader::from_reader(BufReader::new(file));
        xml_reader.trim_text(true);

        let mut buf = Vec::new();
        let mut rels = HashMap::new();

        loop {
            match xml_reader.read_event_into(&mut buf)? {
                Event::Empty(e) | Event::Start(e) if e.name().as_ref() == b"Relationship" => {
                    let id = attr_value(&e, b"Id");
                    let target = attr_value(&e, b"Target");
                    let rel_type = attr_value(&e, b"Type");

                    // Only include worksheet relationships
                    if let (Some(id), Some(target), Some(rel_type)) = (id, target, rel_type) {
                        if rel_type.ends_with("/worksheet") {
                            // Target is relative to xl/ folder
                            let full_path = match target.strip_prefix('/') {
                                Some(absolute) => absolute.to_string(),
                                None => format!("xl/{}", target),
                            };
                            rels.insert(id, full_path);
                        }
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        Ok(rels)
    }

    /// Read a worksheet from the archive
    fn read_worksheet<R: Read + Seek>(
        archive: &mut zip::ZipArchive<R>,
        path: &str,
        worksheet: &mut Worksheet,
        shared_strings: &[String],
    ) -> XlsxResult<()> {
        let file = archive
            .by_name(path)
            .map_err(|_| XlsxError::MissingPart(path.to_string()))?;

        let mut xml_reader = Reader::from_reader(BufReader::new(file));
        xml_reader.trim_text(false);

        let mut buf = Vec::new();
        let mut cell: Option<PendingCell> = None;
        let mut in_value = false;
        let mut in_formula = false;
        let mut in_inline_text = false;
        let mut shared = SharedFormulas::default();
        let mut unresolved = 0usize;

        loop {
            match xml_reader.read_event_into(&mut buf)? {
                Event::Start(e) => match e.name().as_ref() {
                    b"dimension" => Self::apply_dimension(&e, worksheet, path)?,
                    b"c" => {
                        cell = Some(PendingCell {
                            reference: attr_value(&e, b"r"),
                            cell_type: attr_value(&e, b"t"),
                            ..PendingCell::default()
                        });
                    }
                    b"v" => in_value = cell.is_some(),
                    b"f" => {
                        if let Some(pending) = cell.as_mut() {
                            pending.note_formula(&e);
                            in_formula = true;
                        }
                    }
                    b"t" => in_inline_text = cell.is_some(),
                    _ => {}
                },
                Event::Empty(e) => match e.name().as_ref() {
                    b"dimension" => Self::apply_dimension(&e, worksheet, path)?,
                    b"c" => {
                        // Styled but empty cell; only the declared range cares about it
                    }
                    b"f" => {
                        if let Some(pending) = cell.as_mut() {
                            pending.note_formula(&e);
                        }
                    }
                    _ => {}
                },
                Event::End(e) => match e.name().as_ref() {
                    b"c" => {
                        if let Some(pending) = cell.take() {
                            if !Self::process_cell(worksheet, pending, shared_strings, &mut shared)? {
                                unresolved += 1;
                            }
                        }
                    }
                    b"v" => in_value = false,
                    b"f" => in_formula = false,
                    b"t" => in_inline_text = false,
                    _ => {}
                },
                Event::Text(e) => {
                    if let Some(pending) = cell.as_mut() {
                        let text = e.unescape()?;
                        if in_value {
                            pending.value.get_or_insert_with(String::new).push_str(&text);
                        } else if in_formula {
                            pending.formula.get_or_insert_with(String::new).push_str(&text);
                        } else if in_inline_text {
                            pending.value.get_or_insert_with(String::new).push_str(&text);
                        }
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if unresolved > 0 {
            log::warn!(
                "sheet '{}': {} shared formula cell(s) could not be expanded, loaded as cached values",
                worksheet.name(),
                unresolved
            );
        }
        Ok(())
    }

    fn apply_dimension(e: &BytesStart, worksheet: &mut Worksheet, path: &str) -> XlsxResult<()> {
        let Some(reference) = attr_value(e, b"ref") else {
            return Ok(());
        };
        let range = CellRange::parse(&reference).map_err(|err| {
            XlsxError::Parse(format!("{}: invalid dimension '{}': {}", path, reference, err))
        })?;
        worksheet.declare_dimension(range);
        Ok(())
    }

    /// Decode a `<v>` payload according to the cell's `t` attribute
    fn decode_value(
        cell_type: Option<&str>,
        raw: &str,
        shared_strings: &[String],
    ) -> XlsxResult<CellValue> {
        Ok(match cell_type {
            // Shared string
            Some("s") => {
                let idx: usize = raw.trim().parse().map_err(|_| {
                    XlsxError::Parse(format!("Invalid shared string index: {}", raw))
                })?;
                let s = shared_strings.get(idx).ok_or_else(|| {
                    XlsxError::Parse(format!("Shared string index {} out of bounds", idx))
                })?;
                CellValue::string(s)
            }

            Some("b") => CellValue::Boolean(raw == "1" || raw.eq_ignore_ascii_case("true")),

            Some("e") => CellError::parse(raw)
                .map(CellValue::Error)
                .unwrap_or_else(|| CellValue::string(raw)),

            Some("inlineStr") | Some("str") => CellValue::string(decode_excel_escapes(raw)),

            None | Some("n") => raw
                .trim()
                .parse::<f64>()
                .map(CellValue::Number)
                .map_err(|_| XlsxError::Parse(format!("Invalid number '{}'", raw)))?,

            // Dates are stored as ISO text when t="d"
            Some(_) => CellValue::string(raw),
        })
    }

    /// Store a finished cell in the worksheet
    ///
    /// Returns `false` for a shared formula follower whose formula could not
    /// be rebuilt; its cached value is stored instead.
    fn process_cell(
        worksheet: &mut Worksheet,
        cell: PendingCell,
        shared_strings: &[String],
        shared: &mut SharedFormulas,
    ) -> XlsxResult<bool> {
        let Some(reference) = cell.reference else {
            return Err(XlsxError::Parse(format!(
                "cell without r attribute on sheet '{}'",
                worksheet.name()
            )));
        };
        let addr = CellAddress::parse(&reference).map_err(|e| {
            XlsxError::Parse(format!("Invalid cell reference '{}': {}", reference, e))
        })?;

        let cached = cell
            .value
            .as_deref()
            .map(|raw| Self::decode_value(cell.cell_type.as_deref(), raw, shared_strings))
            .transpose()?;

        let own_formula = cell.formula.filter(|f| !f.trim().is_empty());
        let mut resolved = true;
        let formula = match (own_formula, cell.shared_index) {
            (Some(f), Some(index)) => {
                shared.register(index, addr, f.strip_prefix('=').unwrap_or(&f));
                Some(f)
            }
            (Some(f), None) => Some(f),
            (None, Some(index)) => {
                let follower = shared.follower(index, addr);
                resolved = follower.is_some();
                follower
            }
            (None, None) => None,
        };

        let value = match (formula, cached) {
            (Some(f), cached) => CellValue::Formula {
                text: if f.starts_with('=') { f } else { format!("={}", f) },
                cached_value: cached.map(Box::new),
            },
            (None, Some(value)) => value,
            (None, None) => return Ok(resolved),
        };

        worksheet.set_cell_value_at(addr.row, addr.col, value)?;
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::{Cursor, Write};

    #[test]
    fn test_decode_excel_escapes() {
        assert_eq!(decode_excel_escapes("hello_x000d_world"), "hello\rworld");
        assert_eq!(decode_excel_escapes("col1_x0009_col2"), "col1\tcol2");
        assert_eq!(decode_excel_escapes("line1_x000D__x000A_line2"), "line1\r\nline2");
        assert_eq!(decode_excel_escapes("under_x005f_score"), "under_score");
        assert_eq!(decode_excel_escapes("plain text"), "plain text");
    }

    #[test]
    fn test_decode_excel_escapes_partial_sequence() {
        assert_eq!(decode_excel_escapes("_x00"), "_x00");
        assert_eq!(decode_excel_escapes("_x000d"), "_x000d");
        assert_eq!(decode_excel_escapes("a_xzzzz_b"), "a_xzzzz_b");
    }

    fn package(sheet_xml: &str, shared: Option<&str>) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(Cursor::new(&mut buf));
            let options = zip::write::SimpleFileOptions::default();

            zip.start_file("[Content_Types].xml", options).unwrap();
            zip.write_all(br#"<?xml version="1.0"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="xml" ContentType="application/xml"/></Types>"#).unwrap();

            zip.start_file("xl/workbook.xml", options).unwrap();
            zip.write_all(br#"<?xml version="1.0"?><workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="FC" sheetId="1" r:id="rId1"/></sheets></workbook>"#).unwrap();

            zip.start_file("xl/_rels/workbook.xml.rels", options).unwrap();
            zip.write_all(br#"<?xml version="1.0"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#).unwrap();

            zip.start_file("xl/worksheets/sheet1.xml", options).unwrap();
            zip.write_all(sheet_xml.as_bytes()).unwrap();

            if let Some(shared) = shared {
                zip.start_file("xl/sharedStrings.xml", options).unwrap();
                zip.write_all(shared.as_bytes()).unwrap();
            }

            zip.finish().unwrap();
        }
        buf
    }

    #[test]
    fn test_read_values_formulas_and_dimension() {
        let sheet = r#"<?xml version="1.0"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <dimension ref="A1:DZ20"/>
  <sheetData>
    <row r="1"><c r="A1" t="s"><v>0</v></c></row>
    <row r="13"><c r="B13"><v>450000</v></c></row>
    <row r="19"><c r="B19"><f>B13-B15-B16-B18</f><v>19000</v></c>
      <c r="C19" t="str"><f>"M"&amp;"C"</f><v>MC</v></c>
      <c r="D19" t="e"><f>1/0</f><v>#DIV/0!</v></c>
      <c r="E19" t="inlineStr"><is><t>texto livre</t></is></c>
      <c r="F19" t="b"><v>1</v></c>
    </row>
  </sheetData>
</worksheet>"#;
        let shared = r#"<?xml version="1.0"?><sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="1" uniqueCount="1"><si><t>Receita Bruta</t></si></sst>"#;

        let workbook = XlsxReader::read_bytes(&package(sheet, Some(shared))).unwrap();
        let ws = workbook.worksheet_by_name("FC").unwrap();

        assert_eq!(ws.dimension().unwrap().to_a1_string(), "A1:DZ20");
        assert_eq!(ws.get_value("A1").unwrap(), CellValue::string("Receita Bruta"));
        assert_eq!(ws.get_value("B13").unwrap(), CellValue::Number(450000.0));
        assert_eq!(
            ws.get_value("B19").unwrap(),
            CellValue::formula_with_cached("=B13-B15-B16-B18", CellValue::Number(19000.0))
        );
        assert_eq!(
            ws.get_calculated_value_at(18, 2),
            Some(&CellValue::string("MC"))
        );
        assert_eq!(
            ws.get_calculated_value_at(18, 3),
            Some(&CellValue::Error(CellError::Div0))
        );
        assert_eq!(ws.get_value("E19").unwrap(), CellValue::string("texto livre"));
        assert_eq!(ws.get_value("F19").unwrap(), CellValue::Boolean(true));
    }

    #[test]
    fn test_shared_formula_followers_become_formulas() {
        let sheet = r#"<?xml version="1.0"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>
<row r="13"><c r="B13"><v>100</v></c></row>
<row r="20">
  <c r="C20"><f t="shared" ref="C20:E20" si="0">$B$13*2+C19</f><v>200</v></c>
  <c r="D20"><f t="shared" si="0"/><v>200</v></c>
  <c r="E20"><f t="shared" si="0"></f><v>200</v></c>
  <c r="F20"><f t="shared" si="7"/><v>5</v></c>
</row>
</sheetData></worksheet>"#;
        let workbook = XlsxReader::read_bytes(&package(sheet, None)).unwrap();
        let ws = workbook.worksheet(0).unwrap();

        assert_eq!(
            ws.get_value("C20").unwrap(),
            CellValue::formula_with_cached("=$B$13*2+C19", CellValue::Number(200.0))
        );
        assert_eq!(
            ws.get_value("D20").unwrap(),
            CellValue::formula_with_cached("=$B$13*2+D19", CellValue::Number(200.0))
        );
        assert_eq!(
            ws.get_value("E20").unwrap(),
            CellValue::formula_with_cached("=$B$13*2+E19", CellValue::Number(200.0))
        );
        // Unknown group keeps its cached value
        assert_eq!(ws.get_value("F20").unwrap(), CellValue::Number(5.0));
    }

    #[test]
    fn test_malformed_dimension_is_parse_error() {
        let sheet = r#"<worksheet><dimension ref="A1:??"/><sheetData/></worksheet>"#;
        let err = XlsxReader::read_bytes(&package(sheet, None)).unwrap_err();
        assert!(matches!(err, XlsxError::Parse(_)), "got {err:?}");
    }

    #[test]
    fn test_not_a_zip() {
        let err = XlsxReader::read_bytes(b"definitely not a workbook").unwrap_err();
        assert!(matches!(err, XlsxError::Zip(_)), "got {err:?}");
    }

    #[test]
    fn test_missing_content_types() {
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(Cursor::new(&mut buf));
            zip.start_file("hello.txt", zip::write::SimpleFileOptions::default())
                .unwrap();
            zip.write_all(b"hi").unwrap();
            zip.finish().unwrap();
        }
        let err = XlsxReader::read_bytes(&buf).unwrap_err();
        assert!(matches!(err, XlsxError::InvalidFormat(_)), "got {err:?}");
    }
}
