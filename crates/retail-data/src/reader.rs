//! Transaction source loading.
//!
//! Reads the raw invoice log from a delimited text file or the first sheet of
//! a spreadsheet and coerces every row into a [`Transaction`].

use std::io::Read;
use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, Reader};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use retail_core::calendar::parse_timestamp;
use retail_core::models::Transaction;
use retail_core::{AnalysisError, Result};
use tracing::debug;

/// Columns every source must carry. Exact, case-sensitive names.
pub const REQUIRED_COLUMNS: [&str; 8] = [
    "InvoiceNo",
    "StockCode",
    "Description",
    "Quantity",
    "InvoiceDate",
    "UnitPrice",
    "CustomerID",
    "Country",
];

const SPREADSHEET_EXTENSIONS: [&str; 5] = ["xlsx", "xlsm", "xls", "xlsb", "ods"];

// ── Public API ────────────────────────────────────────────────────────────────

/// A loaded source: the original header row plus one record per data row.
#[derive(Debug, Clone)]
pub struct SourceTable {
    pub columns: Vec<String>,
    pub records: Vec<Transaction>,
}

/// Load transactions from `path`, choosing the reader by file extension.
///
/// Spreadsheet extensions (`xlsx`, `xlsm`, `xls`, `xlsb`, `ods`) read the first
/// worksheet; anything else is parsed as comma-separated text.
pub fn load_transactions(path: &Path) -> Result<SourceTable> {
    if !path.exists() {
        return Err(AnalysisError::SourceNotFound(path.to_path_buf()));
    }

    let table = if is_spreadsheet(path) {
        load_spreadsheet(path)?
    } else {
        let file = std::fs::File::open(path)?;
        load_csv(file, path)?
    };

    debug!(
        "Loaded {} rows ({} columns) from {}",
        table.records.len(),
        table.columns.len(),
        path.display()
    );
    Ok(table)
}

/// Parse comma-separated transactions from any reader.
///
/// `origin` only labels error messages. Bytes that are not valid UTF-8 are
/// replaced rather than rejected, since retail exports are frequently
/// Latin-1 encoded.
pub fn load_csv<R: Read>(reader: R, origin: &Path) -> Result<SourceTable> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(reader);

    let columns: Vec<String> = csv_reader
        .byte_headers()
        .map_err(|e| parse_error(origin, e))?
        .iter()
        .map(|h| String::from_utf8_lossy(h).into_owned())
        .collect();
    let index = ColumnIndex::resolve(&columns, origin)?;

    let mut records = Vec::new();
    for (i, result) in csv_reader.byte_records().enumerate() {
        let record = result.map_err(|e| parse_error(origin, e))?;
        let cells: Vec<Cell> = record
            .iter()
            .map(|bytes| Cell::from_text(&String::from_utf8_lossy(bytes)))
            .collect();
        // Header is row 1.
        records.push(index.parse_row(&cells, i + 2)?);
    }

    Ok(SourceTable { columns, records })
}

// ── Spreadsheet loading ───────────────────────────────────────────────────────

fn is_spreadsheet(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            SPREADSHEET_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

fn load_spreadsheet(path: &Path) -> Result<SourceTable> {
    let mut workbook = open_workbook_auto(path).map_err(|e| parse_error(path, e))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| parse_error(path, "workbook has no worksheets"))?
        .map_err(|e| parse_error(path, e))?;

    let mut rows = range.rows();
    let header = rows
        .next()
        .ok_or_else(|| parse_error(path, "worksheet is empty"))?;
    let columns: Vec<String> = header
        .iter()
        .map(|cell| Cell::from_data(cell).into_text())
        .collect();
    let index = ColumnIndex::resolve(&columns, path)?;

    let mut records = Vec::new();
    for (i, row) in rows.enumerate() {
        let cells: Vec<Cell> = row.iter().map(Cell::from_data).collect();
        if cells.iter().all(Cell::is_empty) {
            continue;
        }
        records.push(index.parse_row(&cells, i + 2)?);
    }

    Ok(SourceTable { columns, records })
}

// ── Cell coercion ─────────────────────────────────────────────────────────────

/// A raw source cell, independent of the file format it came from.
#[derive(Debug, Clone, PartialEq)]
enum Cell {
    Empty,
    Text(String),
    Number(f64),
    DateTime(NaiveDateTime),
}

impl Cell {
    fn from_text(s: &str) -> Self {
        if s.trim().is_empty() {
            Cell::Empty
        } else {
            Cell::Text(s.to_string())
        }
    }

    fn from_data(data: &Data) -> Self {
        match data {
            Data::Empty => Cell::Empty,
            Data::String(s) => Cell::from_text(s),
            Data::Float(f) => Cell::Number(*f),
            Data::Int(i) => Cell::Number(*i as f64),
            Data::Bool(b) => Cell::Text(b.to_string()),
            Data::DateTime(dt) => match dt.as_datetime() {
                Some(naive) => Cell::DateTime(naive),
                None => Cell::Number(dt.as_f64()),
            },
            Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::from_text(s),
            Data::Error(e) => Cell::Text(format!("#{:?}", e)),
        }
    }

    fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    fn into_text(self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s,
            Cell::Number(f) => format_number_cell(f),
            Cell::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }

    fn raw(&self) -> String {
        self.clone().into_text()
    }
}

/// Integral floats print without a fractional part so that numeric invoice
/// numbers read from spreadsheets match their CSV spelling.
fn format_number_cell(f: f64) -> String {
    if f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{}", f as i64)
    } else {
        f.to_string()
    }
}

/// Convert an Excel serial day number into a date-time.
fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let millis = (serial * 86_400_000.0).round() as i64;
    epoch.checked_add_signed(Duration::milliseconds(millis))
}

// ── Column resolution and row parsing ─────────────────────────────────────────

/// Positions of the required columns within a header row.
#[derive(Debug, Clone, Copy)]
struct ColumnIndex {
    invoice_no: usize,
    stock_code: usize,
    description: usize,
    quantity: usize,
    invoice_date: usize,
    unit_price: usize,
    customer_id: usize,
    country: usize,
}

impl ColumnIndex {
    fn resolve(columns: &[String], origin: &Path) -> Result<Self> {
        let find = |name: &str| columns.iter().position(|c| c == name);

        let missing: Vec<&str> = REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|name| find(name).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(parse_error(
                origin,
                format!("missing required column(s): {}", missing.join(", ")),
            ));
        }

        let at = |name: &str| find(name).unwrap_or_default();
        Ok(Self {
            invoice_no: at("InvoiceNo"),
            stock_code: at("StockCode"),
            description: at("Description"),
            quantity: at("Quantity"),
            invoice_date: at("InvoiceDate"),
            unit_price: at("UnitPrice"),
            customer_id: at("CustomerID"),
            country: at("Country"),
        })
    }

    fn parse_row(&self, cells: &[Cell], row: usize) -> Result<Transaction> {
        let cell = |idx: usize| cells.get(idx).cloned().unwrap_or(Cell::Empty);

        Ok(Transaction {
            invoice_no: cell(self.invoice_no).into_text(),
            stock_code: cell(self.stock_code).into_text(),
            description: match cell(self.description) {
                Cell::Empty => None,
                other => Some(other.into_text()),
            },
            quantity: coerce_quantity(&cell(self.quantity), row)?,
            invoice_date: coerce_timestamp(&cell(self.invoice_date), row)?,
            unit_price: coerce_price(&cell(self.unit_price), row)?,
            customer_id: coerce_customer_id(&cell(self.customer_id), row)?,
            country: cell(self.country).into_text(),
        })
    }
}

fn coerce_quantity(cell: &Cell, row: usize) -> Result<i64> {
    let value = match cell {
        Cell::Number(f) => Some(*f),
        Cell::Text(s) => {
            let s = s.trim();
            match s.parse::<i64>() {
                Ok(i) => return Ok(i),
                Err(_) => s.parse::<f64>().ok(),
            }
        }
        _ => None,
    };
    match value {
        Some(f) if f.is_finite() && f.fract() == 0.0 => Ok(f as i64),
        _ => Err(AnalysisError::malformed(
            row,
            "Quantity",
            cell.raw(),
            "expected an integer",
        )),
    }
}

fn coerce_price(cell: &Cell, row: usize) -> Result<f64> {
    let value = match cell {
        Cell::Number(f) => Some(*f),
        Cell::Text(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    value.filter(|f| f.is_finite()).ok_or_else(|| {
        AnalysisError::malformed(row, "UnitPrice", cell.raw(), "expected a number")
    })
}

fn coerce_timestamp(cell: &Cell, row: usize) -> Result<NaiveDateTime> {
    let value = match cell {
        Cell::DateTime(dt) => Some(*dt),
        Cell::Text(s) => parse_timestamp(s),
        Cell::Number(serial) => excel_serial_to_datetime(*serial),
        Cell::Empty => None,
    };
    value.ok_or_else(|| {
        AnalysisError::malformed(row, "InvoiceDate", cell.raw(), "unrecognised timestamp")
    })
}

fn coerce_customer_id(cell: &Cell, row: usize) -> Result<Option<u64>> {
    let value = match cell {
        Cell::Empty => return Ok(None),
        Cell::Number(f) => Some(*f),
        Cell::Text(s) => {
            let s = s.trim();
            match s.parse::<u64>() {
                Ok(id) => return Ok(Some(id)),
                Err(_) => s.parse::<f64>().ok(),
            }
        }
        Cell::DateTime(_) => None,
    };
    match value {
        Some(f) if f.is_finite() && f >= 0.0 && f.fract() == 0.0 => Ok(Some(f as u64)),
        _ => Err(AnalysisError::malformed(
            row,
            "CustomerID",
            cell.raw(),
            "expected an integer identifier",
        )),
    }
}

fn parse_error(path: &Path, reason: impl std::fmt::Display) -> AnalysisError {
    AnalysisError::ParseError {
        path: PathBuf::from(path),
        reason: reason.to_string(),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
