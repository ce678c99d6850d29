//! Minimal xlsx writer for tests.
//!
//! Produces just enough of the Office Open XML package for calamine to read it back:
//! workbook, relationships, one date cell style and inline-string worksheets.

use std::io::{Cursor, Write};

use zip::result::ZipResult;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

pub const ROSTER_HEADER: [&str; 7] =
    ["STT", "Họ và tên", "Đơn vị", "Đơn vị cha", "Ngày sinh", "Số điện thoại", "Trạng thái"];

#[derive(Debug, Clone, PartialEq)]
pub enum FixtureCell {
    Text(String),
    Number(f64),
    /// Serial day number carrying the `mm-dd-yy` date style.
    Date(f64),
    Empty,
}

impl From<&str> for FixtureCell {
    fn from(value: &str) -> Self {
        if value.is_empty() {
            Self::Empty
        } else {
            Self::Text(value.to_string())
        }
    }
}

#[must_use]
pub fn header_row() -> Vec<FixtureCell> {
    ROSTER_HEADER.iter().map(|title| FixtureCell::from(*title)).collect()
}

/// One seven-column roster row; empty strings become blank cells.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn roster_row(stt: i64, full_name: &str, unit: &str, status: &str) -> Vec<FixtureCell> {
    vec![
        FixtureCell::Number(stt as f64),
        full_name.into(),
        unit.into(),
        FixtureCell::Empty,
        FixtureCell::Empty,
        FixtureCell::Empty,
        status.into(),
    ]
}

/// Build an xlsx package with one worksheet per `(name, rows)` entry, in order.
///
/// # Errors
/// Returns an error when the zip archive cannot be written.
pub fn workbook_bytes(sheets: &[(&str, Vec<Vec<FixtureCell>>)]) -> ZipResult<Vec<u8>> {
    write_workbook(sheets, false)
}

/// Same as [`workbook_bytes`], but date serials count from the 1904 epoch.
///
/// # Errors
/// Returns an error when the zip archive cannot be written.
pub fn workbook_bytes_1904(sheets: &[(&str, Vec<Vec<FixtureCell>>)]) -> ZipResult<Vec<u8>> {
    write_workbook(sheets, true)
}

fn write_workbook(sheets: &[(&str, Vec<Vec<FixtureCell>>)], date1904: bool) -> ZipResult<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();

    writer.start_file("[Content_Types].xml", options)?;
    writer.write_all(content_types_xml(sheets.len()).as_bytes())?;

    writer.start_file("_rels/.rels", options)?;
    writer.write_all(PACKAGE_RELS_XML.as_bytes())?;

    writer.start_file("xl/workbook.xml", options)?;
    writer.write_all(workbook_xml(sheets, date1904).as_bytes())?;

    writer.start_file("xl/_rels/workbook.xml.rels", options)?;
    writer.write_all(workbook_rels_xml(sheets.len()).as_bytes())?;

    writer.start_file("xl/styles.xml", options)?;
    writer.write_all(STYLES_XML.as_bytes())?;

    for (index, (_, rows)) in sheets.iter().enumerate() {
        writer.start_file(format!("xl/worksheets/sheet{}.xml", index + 1), options)?;
        writer.write_all(worksheet_xml(rows).as_bytes())?;
    }

    Ok(writer.finish()?.into_inner())
}

const PACKAGE_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

// Style 1 is the built-in `mm-dd-yy` date format, which calamine reports as a date.
const STYLES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><cellXfs count="2"><xf numFmtId="0"/><xf numFmtId="14" applyNumberFormat="1"/></cellXfs></styleSheet>"#;

fn content_types_xml(sheet_count: usize) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>"#,
    );
    for index in 1..=sheet_count {
        xml.push_str(&format!(
            r#"<Override PartName="/xl/worksheets/sheet{index}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#
        ));
    }
    xml.push_str("</Types>");
    xml
}

fn workbook_xml(sheets: &[(&str, Vec<Vec<FixtureCell>>)], date1904: bool) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">"#,
    );
    if date1904 {
        xml.push_str(r#"<workbookPr date1904="1"/>"#);
    }
    xml.push_str("<sheets>");
    for (index, (name, _)) in sheets.iter().enumerate() {
        let id = index + 1;
        xml.push_str(&format!(
            r#"<sheet name="{}" sheetId="{id}" r:id="rId{id}"/>"#,
            escape_xml(name)
        ));
    }
    xml.push_str("</sheets></workbook>");
    xml
}

fn workbook_rels_xml(sheet_count: usize) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    );
    for id in 1..=sheet_count {
        xml.push_str(&format!(
            r#"<Relationship Id="rId{id}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{id}.xml"/>"#
        ));
    }
    let styles_id = sheet_count + 1;
    xml.push_str(&format!(
        r#"<Relationship Id="rId{styles_id}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>"#
    ));
    xml.push_str("</Relationships>");
    xml
}

fn worksheet_xml(rows: &[Vec<FixtureCell>]) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
    );
    for (row_index, row) in rows.iter().enumerate() {
        let row_number = row_index + 1;
        xml.push_str(&format!(r#"<row r="{row_number}">"#));
        for (column_index, cell) in row.iter().enumerate() {
            let reference = format!("{}{row_number}", column_name(column_index));
            match cell {
                FixtureCell::Text(text) => xml.push_str(&format!(
                    r#"<c r="{reference}" t="inlineStr"><is><t>{}</t></is></c>"#,
                    escape_xml(text)
                )),
                FixtureCell::Number(value) => {
                    xml.push_str(&format!(r#"<c r="{reference}"><v>{value}</v></c>"#));
                }
                FixtureCell::Date(serial) => {
                    xml.push_str(&format!(r#"<c r="{reference}" s="1"><v>{serial}</v></c>"#));
                }
                FixtureCell::Empty => {}
            }
        }
        xml.push_str("</row>");
    }
    xml.push_str("</sheetData></worksheet>");
    xml
}

fn column_name(mut index: usize) -> String {
    let mut name = Vec::new();
    loop {
        let letter = u8::try_from(index % 26).unwrap_or(0);
        name.push(char::from(b'A' + letter));
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    name.iter().rev().collect()
}

fn escape_xml(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
