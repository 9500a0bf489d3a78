//! Spreadsheet reading and writing
//!
//! Uploads are parsed into [`Row`]s: the header row provides the labels, every
//! following non-blank line becomes one row of typed [`Cell`]s keyed by label.
//! Workbooks (xlsx/xls) go through calamine, CSV through the csv crate.
//! Exports are written from a [`SheetTable`] to xlsx or CSV bytes.

use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, DataType, Reader};
use chrono::{NaiveDateTime, Timelike};
use rust_xlsxwriter::{Format, Workbook};

use crate::error::{Error, Result};

/// One typed spreadsheet cell
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    DateTime(NaiveDateTime),
}

impl Cell {
    /// Stringified, trimmed value; `None` when empty
    pub fn text(&self) -> Option<String> {
        let s = match self {
            Cell::Empty => return None,
            Cell::String(s) => s.trim().to_string(),
            Cell::Int(i) => i.to_string(),
            Cell::Float(f) => format_float(*f),
            Cell::Bool(b) => b.to_string(),
            Cell::DateTime(dt) => {
                if dt.time().num_seconds_from_midnight() == 0 {
                    dt.format("%Y-%m-%d").to_string()
                } else {
                    dt.format("%Y-%m-%d %H:%M:%S").to_string()
                }
            }
        };
        if s.is_empty() {
            None
        } else {
            Some(s)
        }
    }

    pub fn is_blank(&self) -> bool {
        self.text().is_none()
    }

    fn from_data(data: &Data) -> Self {
        match data {
            Data::Empty | Data::Error(_) => Cell::Empty,
            Data::String(s) => Cell::String(s.clone()),
            Data::Int(i) => Cell::Int(*i),
            Data::Float(f) => Cell::Float(*f),
            Data::Bool(b) => Cell::Bool(*b),
            Data::DateTime(_) | Data::DateTimeIso(_) => match data.as_datetime() {
                Some(dt) => Cell::DateTime(dt),
                None => Cell::String(data.to_string()),
            },
            Data::DurationIso(s) => Cell::String(s.clone()),
        }
    }
}

/// Whole floats render without a decimal point (`12.0` -> `12`)
fn format_float(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 {
        (f as i64).to_string()
    } else {
        f.to_string()
    }
}

/// One data row of an uploaded sheet
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// 1-based spreadsheet line number (the header is line 1)
    pub line: usize,
    cells: Vec<(String, Cell)>,
}

impl Row {
    pub fn new(line: usize, cells: Vec<(String, Cell)>) -> Self {
        Self { line, cells }
    }

    /// Cell under an exact header label. Duplicate headers resolve to the first column.
    pub fn get(&self, label: &str) -> Option<&Cell> {
        self.cells
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, cell)| cell)
    }

    /// First non-empty cell among the accepted labels, in priority order
    pub fn first_cell(&self, labels: &[&str]) -> Option<&Cell> {
        labels
            .iter()
            .filter_map(|label| self.get(label))
            .find(|cell| !cell.is_blank())
    }

    /// First non-empty text among the accepted labels, in priority order
    pub fn first_text(&self, labels: &[&str]) -> Option<String> {
        labels
            .iter()
            .filter_map(|label| self.get(label))
            .find_map(Cell::text)
    }

    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|(_, cell)| cell.is_blank())
    }
}

/// Accepted upload formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetFormat {
    Xlsx,
    Xls,
    Csv,
}

impl SheetFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            Self::Xls => "application/vnd.ms-excel",
            Self::Csv => "text/csv",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Xlsx => "xlsx",
            Self::Xls => "xls",
            Self::Csv => "csv",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.').to_lowercase().as_str() {
            "xlsx" => Some(Self::Xlsx),
            "xls" => Some(Self::Xls),
            "csv" => Some(Self::Csv),
            _ => None,
        }
    }

    fn from_content_type(content_type: &str) -> Option<Self> {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_lowercase();
        match essence.as_str() {
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet" => {
                Some(Self::Xlsx)
            }
            "application/vnd.ms-excel" => Some(Self::Xls),
            "text/csv" | "application/csv" => Some(Self::Csv),
            _ => None,
        }
    }

    /// Detect the upload format from the file name and the declared content type.
    ///
    /// A known file extension wins: some clients label CSV files as
    /// `application/vnd.ms-excel`. Otherwise the content type decides.
    pub fn detect(file_name: Option<&str>, content_type: Option<&str>) -> Option<Self> {
        let by_extension = file_name
            .and_then(|name| std::path::Path::new(name).extension())
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension);

        by_extension.or_else(|| content_type.and_then(Self::from_content_type))
    }
}

/// Parse an uploaded sheet. Only the first worksheet of a workbook is read.
pub fn read_sheet(bytes: &[u8], format: SheetFormat) -> Result<Vec<Row>> {
    match format {
        SheetFormat::Xlsx | SheetFormat::Xls => read_workbook(bytes),
        SheetFormat::Csv => read_csv(bytes),
    }
}

fn read_workbook(bytes: &[u8]) -> Result<Vec<Row>> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;
    let range = match workbook.worksheet_range_at(0) {
        Some(range) => range?,
        None => return Ok(Vec::new()),
    };

    // The range may not start at A1
    let first_line = range.start().map(|(row, _)| row as usize + 1).unwrap_or(1);
    let mut rows = range.rows();

    let headers: Vec<String> = match rows.next() {
        Some(header) => header
            .iter()
            .map(|cell| Cell::from_data(cell).text().unwrap_or_default())
            .collect(),
        None => return Ok(Vec::new()),
    };

    let parsed = rows
        .enumerate()
        .map(|(i, cells)| {
            let cells = headers
                .iter()
                .zip(cells.iter())
                .filter(|(label, _)| !label.is_empty())
                .map(|(label, cell)| (label.clone(), Cell::from_data(cell)))
                .collect();
            Row::new(first_line + i + 1, cells)
        })
        .filter(|row| !row.is_blank())
        .collect();

    Ok(parsed)
}

fn read_csv(bytes: &[u8]) -> Result<Vec<Row>> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record?;
        let line = record
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(i + 2);
        let cells = headers
            .iter()
            .zip(record.iter())
            .filter(|(label, _)| !label.is_empty())
            .map(|(label, value)| {
                let cell = if value.trim().is_empty() {
                    Cell::Empty
                } else {
                    Cell::String(value.to_string())
                };
                (label.clone(), cell)
            })
            .collect();

        let row = Row::new(line, cells);
        if !row.is_blank() {
            rows.push(row);
        }
    }

    Ok(rows)
}

/// Export column: header label and display width
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Column {
    pub label: &'static str,
    pub width: f64,
}

impl Column {
    pub const fn new(label: &'static str, width: f64) -> Self {
        Self { label, width }
    }
}

/// A flat row-set ready to be written out
#[derive(Debug, Clone, PartialEq)]
pub struct SheetTable {
    pub sheet_name: String,
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<String>>,
}

impl SheetTable {
    pub fn headers(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.label).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Write a table as a single-sheet xlsx workbook
pub fn write_xlsx(table: &SheetTable) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();

    let worksheet = workbook.add_worksheet();
    worksheet.set_name(&table.sheet_name)?;

    for (col, column) in table.columns.iter().enumerate() {
        let col = u16::try_from(col)
            .map_err(|_| Error::InvalidData("too many export columns".to_string()))?;
        worksheet.set_column_width(col, column.width)?;
        worksheet.write_string_with_format(0, col, column.label, &header_format)?;
    }

    for (i, values) in table.rows.iter().enumerate() {
        let row = u32::try_from(i + 1)
            .map_err(|_| Error::InvalidData("too many export rows".to_string()))?;
        for (col, value) in values.iter().enumerate() {
            if value.is_empty() {
                continue;
            }
            let col = u16::try_from(col)
                .map_err(|_| Error::InvalidData("too many export columns".to_string()))?;
            worksheet.write_string(row, col, value)?;
        }
    }

    Ok(workbook.save_to_buffer()?)
}

/// Write a table as UTF-8 CSV with a byte-order mark (so Excel detects the encoding)
pub fn write_csv(table: &SheetTable) -> Result<Vec<u8>> {
    let mut buf = b"\xEF\xBB\xBF".to_vec();
    {
        let mut writer = csv::Writer::from_writer(&mut buf);
        writer.write_record(table.headers())?;
        for row in &table.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
    }
    Ok(buf)
}
