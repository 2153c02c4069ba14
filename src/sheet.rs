use std::path::Path;

use crate::error::{FinError, Result};
use crate::models::SheetRow;

// ---------------------------------------------------------------------------
// Format detection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SheetFormat {
    Csv,
    #[cfg(feature = "xlsx")]
    Workbook,
}

impl SheetFormat {
    pub fn from_filename(filename: &str) -> Result<Self> {
        let ext = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "csv" | "txt" => Ok(Self::Csv),
            #[cfg(feature = "xlsx")]
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Ok(Self::Workbook),
            "" => Err(FinError::ParseFailure(format!("{filename}: missing file extension"))),
            other => Err(FinError::ParseFailure(format!("unsupported file type: .{other}"))),
        }
    }
}

/// Parse an uploaded spreadsheet into rows keyed by lower-cased header.
/// The first row is the header; every later row is data, numbered from 1.
pub fn read_rows(filename: &str, bytes: &[u8]) -> Result<Vec<SheetRow>> {
    match SheetFormat::from_filename(filename)? {
        SheetFormat::Csv => read_csv(bytes),
        #[cfg(feature = "xlsx")]
        SheetFormat::Workbook => read_workbook(bytes),
    }
}

pub fn read_file(path: &Path) -> Result<Vec<SheetRow>> {
    let bytes = std::fs::read(path)?;
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    read_rows(name, &bytes)
}

fn normalize_header(raw: &str) -> String {
    raw.trim().trim_start_matches('\u{feff}').to_ascii_lowercase()
}

fn cell_text(raw: &str) -> Option<String> {
    let s = raw.trim();
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

fn build_row(headers: &[String], cells: impl Iterator<Item = Option<String>>) -> SheetRow {
    let mut row: SheetRow = headers.iter().map(|h| (h.clone(), None)).collect();
    for (header, cell) in headers.iter().zip(cells) {
        if header.is_empty() {
            continue;
        }
        row.insert(header.clone(), cell);
    }
    row.retain(|k, _| !k.is_empty());
    row
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

fn read_csv(bytes: &[u8]) -> Result<Vec<SheetRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);
    let headers: Vec<String> = rdr
        .headers()
        .map_err(|e| FinError::ParseFailure(e.to_string()))?
        .iter()
        .map(normalize_header)
        .collect();

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(|e| FinError::ParseFailure(e.to_string()))?;
        rows.push(build_row(&headers, record.iter().map(cell_text)));
    }
    Ok(rows)
}

// ---------------------------------------------------------------------------
// XLSX / XLS / ODS (feature-gated)
// ---------------------------------------------------------------------------

#[cfg(feature = "xlsx")]
fn read_workbook(bytes: &[u8]) -> Result<Vec<SheetRow>> {
    use calamine::{Data, Reader};

    let mut workbook = calamine::open_workbook_auto_from_rs(std::io::Cursor::new(bytes.to_vec()))
        .map_err(|e| FinError::ParseFailure(format!("failed to open workbook: {e}")))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| FinError::ParseFailure("workbook has no sheets".to_string()))?
        .map_err(|e| FinError::ParseFailure(e.to_string()))?;

    let cell = |data: &Data| -> Option<String> {
        match data {
            Data::String(s) | Data::DateTimeIso(s) => cell_text(s),
            Data::Float(f) => Some(f.to_string()),
            Data::Int(i) => Some(i.to_string()),
            Data::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    };

    let mut sheet_rows = range.rows();
    let Some(header_row) = sheet_rows.next() else {
        return Ok(Vec::new());
    };
    let headers: Vec<String> = header_row
        .iter()
        .map(|h| cell(h).map(|s| normalize_header(&s)).unwrap_or_default())
        .collect();

    Ok(sheet_rows
        .map(|r| build_row(&headers, r.iter().map(cell)))
        .collect())
}
