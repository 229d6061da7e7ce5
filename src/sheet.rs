//! Spreadsheet source: a sheet as an in-memory grid of cell text.
//!
//! The first three rows are fixed: type specs, field paths, then comments.
//! Every following row is a data row.

use std::path::Path;

use anyhow::{Context, Result};
use calamine::{Data, Reader, open_workbook_auto};
use chrono::{NaiveDate, NaiveTime, TimeDelta};
use encoding_rs::Encoding;

use crate::{
    error::{ConvertError, ConvertResult, column_letter},
    io_utils,
};

pub const FIELD_TYPE_ROW: usize = 0;
pub const FIELD_NAME_ROW: usize = 1;
pub const FIELD_COMMENT_ROW: usize = 2;
pub const FIRST_DATA_ROW: usize = FIELD_COMMENT_ROW + 1;

const SECONDS_PER_DAY: f64 = 86_400.0;

#[derive(Debug, Clone)]
pub struct SheetTable {
    name: String,
    rows: Vec<Vec<String>>,
}

/// How a delimited-text source is read.
#[derive(Debug, Clone, Copy)]
pub struct TextSource {
    pub delimiter: Option<u8>,
    pub encoding: &'static Encoding,
}

impl SheetTable {
    pub fn new(name: impl Into<String>, rows: Vec<Vec<String>>) -> Self {
        SheetTable {
            name: name.into(),
            rows,
        }
    }

    /// Loads `sheet` from a workbook, or the whole file when `path` is a
    /// delimited-text file.
    pub fn load(path: &Path, sheet: &str, text: TextSource) -> Result<Self> {
        if io_utils::is_delimited_text(path) {
            Self::from_delimited(path, sheet, text)
        } else {
            Self::from_workbook(path, sheet)
        }
    }

    pub fn from_delimited(path: &Path, sheet: &str, text: TextSource) -> Result<Self> {
        let delimiter = io_utils::resolve_input_delimiter(path, text.delimiter);
        let mut reader = io_utils::open_csv_reader_from_path(path, delimiter)?;
        let mut rows = Vec::new();
        for (idx, record) in reader.byte_records().enumerate() {
            let record = record.with_context(|| format!("Reading row {} of {path:?}", idx + 1))?;
            rows.push(io_utils::decode_record(&record, text.encoding)?);
        }
        Ok(SheetTable::new(sheet, rows))
    }

    pub fn from_workbook(path: &Path, sheet: &str) -> Result<Self> {
        let mut workbook = open_workbook_auto(path)
            .map_err(|err| ConvertError::Sheet {
                message: err.to_string(),
            })
            .with_context(|| format!("Opening workbook {path:?}"))?;
        let range = workbook
            .worksheet_range(sheet)
            .map_err(|err| ConvertError::Sheet {
                message: err.to_string(),
            })
            .with_context(|| format!("Reading sheet '{sheet}' from {path:?}"))?;

        // Ranges start at the first non-empty cell; pad back to A1 so column
        // indices match the workbook.
        let (row_offset, col_offset) = range
            .start()
            .map(|(r, c)| (r as usize, c as usize))
            .unwrap_or_default();
        let mut rows = vec![Vec::new(); row_offset];
        for (idx, cells) in range.rows().enumerate() {
            let mut row = vec![String::new(); col_offset];
            for (col, cell) in cells.iter().enumerate() {
                row.push(cell_text(cell, row_offset + idx, col_offset + col)?);
            }
            rows.push(row);
        }
        Ok(SheetTable::new(sheet, rows))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Trimmed header cell; blank when the row is short.
    pub fn header(&self, row: usize, column: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|cells| cells.get(column))
            .map(|cell| cell.trim())
            .unwrap_or("")
    }

    pub fn ensure_header(&self) -> ConvertResult<()> {
        if self.rows.len() <= FIELD_COMMENT_ROW {
            return Err(ConvertError::Structural {
                sheet: self.name.clone(),
                message: format!(
                    "only {} row(s); the type, name and comment header rows are required",
                    self.rows.len()
                ),
            });
        }
        Ok(())
    }

    /// Data rows with their 1-based spreadsheet row numbers.
    pub fn data_rows(&self) -> impl Iterator<Item = (usize, &[String])> {
        self.rows
            .iter()
            .enumerate()
            .skip(FIRST_DATA_ROW)
            .map(|(idx, cells)| (idx + 1, cells.as_slice()))
    }
}

fn cell_text(cell: &Data, row: usize, column: usize) -> ConvertResult<String> {
    let text = match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => number_text(*f),
        Data::Bool(b) => String::from(if *b { "1" } else { "0" }),
        Data::DateTime(dt) => excel_serial_text(dt.as_f64()),
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
        Data::Error(e) => {
            return Err(ConvertError::DataCoercion {
                row: row + 1,
                column: column_letter(column),
                raw: format!("{e:?}"),
                message: "cell holds a spreadsheet error".to_string(),
            });
        }
    };
    Ok(text)
}

/// Integral floats render without a fraction (`3`, not `3.0`).
fn number_text(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        (value as i64).to_string()
    } else {
        value.to_string()
    }
}

/// Renders an Excel date serial; serials below one day are times of day.
fn excel_serial_text(serial: f64) -> String {
    let total_seconds = (serial * SECONDS_PER_DAY).round() as i64;
    if serial < 1.0 {
        let seconds = total_seconds.rem_euclid(86_400) as u32;
        return NaiveTime::from_num_seconds_from_midnight_opt(seconds, 0)
            .map(|t| t.format("%H:%M:%S").to_string())
            .unwrap_or_else(|| number_text(serial));
    }
    NaiveDate::from_ymd_opt(1899, 12, 30)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .and_then(|epoch| epoch.checked_add_signed(TimeDelta::seconds(total_seconds)))
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| number_text(serial))
}
