//! Spreadsheet decoding for CSV and Excel (.xlsx/.xls/.xlsm) listing exports.
//!
//! Produces ordered [`RawRow`]s keyed by the exact header text of the upstream
//! sheet. A file that cannot be decoded at all is one fatal error for the
//! whole batch; no partial rows are ever returned.

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use std::collections::HashMap;
use std::io::Cursor;
use thiserror::Error;

/// Fatal decode failure. This is the only error class in the pipeline that
/// propagates to the caller; everything downstream degrades per-row.
#[derive(Debug, Error)]
pub enum SheetError {
    #[error("Unsupported file type: .{0}. Supported: .csv, .xlsx, .xls, .xlsm")]
    UnsupportedExtension(String),
    #[error("Failed to decode CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("Failed to open workbook: {0}")]
    Workbook(#[from] calamine::Error),
    #[error("Workbook contains no sheets")]
    NoSheets,
    #[error("Sheet has no header row")]
    NoHeaders,
}

/// One data row of the upstream sheet: exact header text → cell text.
/// Ephemeral: lives only while one file is being normalized.
#[derive(Debug, Clone, Default)]
pub struct RawRow {
    cells: HashMap<String, String>,
}

impl RawRow {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            cells: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Get a cell by its literal header text. Returns `None` for a missing
    /// header or a cell that is blank after trimming.
    pub fn get(&self, header: &str) -> Option<&str> {
        self.cells
            .get(header)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.cells.values().all(|v| v.trim().is_empty())
    }
}

/// Decode a spreadsheet file into ordered rows. Dispatch is by file
/// extension; the first row is treated as headers and fully empty rows are
/// skipped. Excel workbooks are read from the first sheet only (the upstream
/// Google Sheet export has a single tab).
pub fn parse_rows(filename: &str, data: &[u8]) -> Result<Vec<RawRow>, SheetError> {
    let ext = filename.rsplit('.').next().unwrap_or("").to_lowercase();

    match ext.as_str() {
        "csv" => parse_csv(data),
        "xlsx" | "xls" | "xlsm" => parse_workbook(data),
        _ => Err(SheetError::UnsupportedExtension(ext)),
    }
}

fn parse_csv(data: &[u8]) -> Result<Vec<RawRow>, SheetError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(true)
        .from_reader(data);

    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(SheetError::NoHeaders);
    }

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        let row = RawRow::from_pairs(
            headers
                .iter()
                .zip(record.iter())
                .map(|(h, v)| (h.clone(), v.to_string())),
        );
        if !row.is_empty() {
            rows.push(row);
        }
    }

    Ok(rows)
}

fn parse_workbook(data: &[u8]) -> Result<Vec<RawRow>, SheetError> {
    let cursor = Cursor::new(data.to_vec());
    let mut workbook = open_workbook_auto_from_rs(cursor)?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or(SheetError::NoSheets)?;

    let range = workbook.worksheet_range(&sheet_name)?;
    let mut row_iter = range.rows();

    let headers: Vec<String> = row_iter
        .next()
        .ok_or(SheetError::NoHeaders)?
        .iter()
        .map(cell_to_string)
        .collect();
    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(SheetError::NoHeaders);
    }

    let mut rows = Vec::new();
    for row in row_iter {
        let raw = RawRow::from_pairs(
            headers
                .iter()
                .zip(row.iter())
                .map(|(h, c)| (h.clone(), cell_to_string(c))),
        );
        if !raw.is_empty() {
            rows.push(raw);
        }
    }

    Ok(rows)
}

/// Convert a calamine cell to the text a human would see in the sheet.
fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            // Avoid trailing ".0" for whole numbers
            if *f == (*f as i64) as f64 && f.abs() < i64::MAX as f64 {
                format!("{}", *f as i64)
            } else {
                format!("{}", f)
            }
        }
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => excel_serial_to_date(dt.as_f64()),
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
        Data::Error(e) => format!("#ERR:{:?}", e),
    }
}

/// Format an Excel serial date number as YYYY-MM-DD. The time-of-day part is
/// dropped; the only dated column in the sheet ("Available From") carries
/// whole dates.
fn excel_serial_to_date(serial: f64) -> String {
    let days = serial as i64;
    // Excel's 1900 leap year bug: serials past the fake Feb 29, 1900 count one
    // extra day, absorbed by the 1899-12-30 epoch (25569 days before Unix).
    let unix_days = if days > 59 { days - 25569 } else { days - 25568 };

    let mut year = 1970i32;
    let mut remaining = unix_days as i32;
    if remaining >= 0 {
        loop {
            let diy = if is_leap(year) { 366 } else { 365 };
            if remaining < diy {
                break;
            }
            remaining -= diy;
            year += 1;
        }
    } else {
        loop {
            year -= 1;
            let diy = if is_leap(year) { 366 } else { 365 };
            remaining += diy;
            if remaining >= 0 {
                break;
            }
        }
    }

    let dim: [i32; 12] = if is_leap(year) {
        [31, 29, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31]
    } else {
        [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31]
    };

    let mut month = 1;
    for d in dim {
        if remaining < d {
            break;
        }
        remaining -= d;
        month += 1;
    }

    format!("{:04}-{:02}-{:02}", year, month, remaining + 1)
}

fn is_leap(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || (year % 400 == 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_csv_basic() {
        let data = b"Location,Price,Bedrooms\nRawai,5000000,2\nKata,3200000,Studio\n";
        let rows = parse_rows("listings.csv", data).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("Location"), Some("Rawai"));
        assert_eq!(rows[0].get("Price"), Some("5000000"));
        assert_eq!(rows[1].get("Bedrooms"), Some("Studio"));
    }

    #[test]
    fn test_empty_rows_skipped() {
        let data = b"Location,Price\nRawai,5000000\n,\n   ,  \nKata,3200000\n";
        let rows = parse_rows("listings.csv", data).unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_short_rows_tolerated() {
        // The shared sheet often trails off mid-row; missing cells read as absent
        let data = b"Location,Price,Views\nRawai,5000000\n";
        let rows = parse_rows("listings.csv", data).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("Views"), None);
    }

    #[test]
    fn test_blank_cell_reads_as_absent() {
        let data = b"Location,Price\nRawai,   \n";
        let rows = parse_rows("listings.csv", data).unwrap();
        assert_eq!(rows[0].get("Price"), None);
    }

    #[test]
    fn test_unsupported_extension_is_fatal() {
        let err = parse_rows("listings.pdf", b"data").unwrap_err();
        assert!(matches!(err, SheetError::UnsupportedExtension(_)));
    }

    #[test]
    fn test_malformed_workbook_is_fatal() {
        assert!(parse_rows("listings.xlsx", b"not a zip archive").is_err());
    }

    #[test]
    fn test_cell_to_string_trims_whole_floats() {
        assert_eq!(cell_to_string(&Data::Float(5000000.0)), "5000000");
        assert_eq!(cell_to_string(&Data::Float(2.5)), "2.5");
    }

    #[test]
    fn test_excel_serial_to_date() {
        // 2024-01-01 is serial 45292
        assert_eq!(excel_serial_to_date(45292.0), "2024-01-01");
        // 1900-01-01 is serial 1 (before the leap bug cutover)
        assert_eq!(excel_serial_to_date(1.0), "1900-01-01");
    }
}
