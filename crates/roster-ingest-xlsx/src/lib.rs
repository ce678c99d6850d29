//! XLSX/XLS roster ingestion
//!
//! Reads the first sheet of an uploaded workbook, discards its header row, and maps the
//! remaining rows positionally onto [`Record`]s.

use std::io::{Cursor, Read};
use std::path::Path;

use calamine::{open_workbook_auto_from_rs, Data, ExcelDateTime, Range, Reader};
use chrono::Datelike;
use roster_core::{Record, SequenceNumber, DEFAULT_STATUS};
use thiserror::Error;

#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Excel parse error: {0}")]
    Parse(String),
    #[error("Calamine error: {0}")]
    Calamine(#[from] calamine::Error),
}

/// Parse a workbook file from disk.
///
/// # Errors
/// Returns [`IngestError`] when the file cannot be read or decoded.
pub fn parse_workbook_path(path: &Path) -> Result<Vec<Record>, IngestError> {
    let bytes = std::fs::read(path)?;
    parse_workbook_bytes(&bytes)
}

/// Parse a workbook from any byte stream.
///
/// # Errors
/// Returns [`IngestError`] when the stream fails or its contents cannot be decoded.
pub fn parse_workbook_reader<R: Read>(mut reader: R) -> Result<Vec<Record>, IngestError> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    parse_workbook_bytes(&bytes)
}

/// Parse an in-memory workbook (xlsx, xls, xlsb or ods; the format is detected).
///
/// # Errors
/// Returns [`IngestError`] when the bytes are not a readable workbook or it has no sheets.
pub fn parse_workbook_bytes(bytes: &[u8]) -> Result<Vec<Record>, IngestError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| IngestError::Parse("workbook contains no sheets".to_string()))??;

    Ok(records_from_range(&range))
}

fn records_from_range(range: &Range<Data>) -> Vec<Record> {
    // Ranges start at the first non-empty column; positions are sheet columns.
    let first_column = range.start().map_or(0, |(_, column)| column as usize);

    range
        .rows()
        .skip(1)
        .enumerate()
        .map(|(index, row)| row_to_record(index, row, first_column))
        .filter(Record::is_valid)
        .collect()
}

fn row_to_record(index: usize, row: &[Data], first_column: usize) -> Record {
    let cell = |column: usize| {
        column
            .checked_sub(first_column)
            .and_then(|offset| row.get(offset))
            .filter(|value| !is_missing(value))
    };
    let text = |column: usize| cell(column).map(cell_to_string).unwrap_or_default();
    let position = i64::try_from(index + 1).unwrap_or(i64::MAX);

    Record {
        sequence_number: cell(0)
            .map_or(SequenceNumber::Number(position), sequence_from_cell),
        full_name: text(1),
        unit: text(2),
        parent_unit: text(3),
        date_of_birth: text(4),
        phone: text(5),
        status: cell(6).map_or_else(|| DEFAULT_STATUS.to_string(), cell_to_string),
    }
}

/// Blank, empty-string, zero and `false` cells all fall back to the column default.
#[allow(clippy::float_cmp)]
fn is_missing(cell: &Data) -> bool {
    match cell {
        Data::Empty => true,
        Data::String(s) => s.is_empty(),
        Data::Float(f) => *f == 0.0 || f.is_nan(),
        Data::Int(i) => *i == 0,
        Data::Bool(b) => !*b,
        _ => false,
    }
}

#[allow(clippy::cast_possible_truncation, clippy::float_cmp)]
fn sequence_from_cell(cell: &Data) -> SequenceNumber {
    match cell {
        Data::Int(i) => SequenceNumber::Number(*i),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 9.0e15 => {
            SequenceNumber::Number(*f as i64)
        }
        Data::Float(f) => SequenceNumber::Decimal(*f),
        other => SequenceNumber::Text(cell_to_string(other)),
    }
}

#[allow(clippy::float_cmp)]
fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Float(f) => {
            // Format floats nicely (remove trailing zeros)
            if f.fract() == 0.0 {
                format!("{f:.0}")
            } else {
                format!("{f}")
            }
        }
        Data::Int(i) => format!("{i}"),
        Data::Bool(b) => {
            if *b {
                "TRUE".to_string()
            } else {
                "FALSE".to_string()
            }
        }
        Data::Error(e) => format!("#ERROR: {e:?}"),
        Data::DateTime(dt) => excel_date_label(dt),
    }
}

/// Date-formatted cells arrive as serial day numbers in either the 1900 or the 1904 date
/// system; render them the way the roster displays dates (`dd/mm/yyyy`).
fn excel_date_label(value: &ExcelDateTime) -> String {
    if value.is_duration() {
        return value.as_f64().to_string();
    }

    match value.as_datetime() {
        Some(moment) => format!("{:02}/{:02}/{}", moment.day(), moment.month(), moment.year()),
        None => value.as_f64().to_string(),
    }
}
