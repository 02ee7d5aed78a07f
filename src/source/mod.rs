// src/source/mod.rs

pub mod discover;
pub mod excel;

pub use discover::discover_workbooks;
pub use excel::{read_sheet, sheet_names, Workbook};

/// One spreadsheet cell, after the workbook-specific encoding is stripped.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl CellValue {
    /// Empty cells and whitespace-only text both count as missing.
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Text rendering; `None` for empty cells.
    pub fn as_text(&self) -> Option<String> {
        match self {
            CellValue::Empty => None,
            CellValue::Text(s) => Some(s.clone()),
            CellValue::Number(n) => Some(format_number(*n)),
            CellValue::Bool(b) => Some(if *b { "True" } else { "False" }.to_string()),
        }
    }
}

/// Shortest text form of a number; whole values carry no fractional part.
pub fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// The unmodified grid read from one sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    /// Column names from the sheet's first row.
    pub headers: Vec<String>,
    /// Data rows; every row has exactly `headers.len()` cells.
    pub rows: Vec<Vec<CellValue>>,
}

impl RawTable {
    /// Build from a header row and data rows, padding or truncating ragged
    /// rows to the header width.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut r| {
                r.resize(width, CellValue::Empty);
                r
            })
            .collect();
        Self { headers, rows }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }
}

/// Turn a raw header row into unique column names: blanks become
/// `Unnamed: <idx>`, repeats get `.1`, `.2`, … suffixes.
pub fn dedupe_headers(raw: Vec<CellValue>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(raw.len());
    for (idx, cell) in raw.into_iter().enumerate() {
        let base = match cell.as_text() {
            Some(s) if !s.trim().is_empty() => s,
            _ => format!("Unnamed: {}", idx),
        };
        let mut name = base.clone();
        let mut n = 1;
        while out.contains(&name) {
            name = format!("{}.{}", base, n);
            n += 1;
        }
        out.push(name);
    }
    out
}
