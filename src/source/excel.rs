// src/source/excel.rs

use calamine::{open_workbook_auto, Data, Range, Reader, Sheets};
use chrono::{Duration, NaiveDate};
use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};
use tracing::debug;

use super::{dedupe_headers, CellValue, RawTable};
use crate::error::{Error, Result};

/// An open workbook. Sheet names are read once at open time.
pub struct Workbook {
    path: PathBuf,
    file_name: String,
    sheet_names: Vec<String>,
    inner: Sheets<BufReader<File>>,
}

impl Workbook {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(Error::SourceUnavailable {
                path: path.to_path_buf(),
                reason: "no such file".into(),
            });
        }
        let inner = open_workbook_auto(path).map_err(|e| Error::SourceUnavailable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let sheet_names = inner.sheet_names().to_vec();
        Ok(Self {
            path: path.to_path_buf(),
            file_name: file_name_of(path),
            sheet_names,
            inner,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Base name of the workbook, e.g. `meters.xlsx`.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Sheet names in workbook order.
    pub fn sheet_names(&self) -> &[String] {
        &self.sheet_names
    }

    /// Load one sheet; the first row of the used range is the header.
    pub fn load(&mut self, sheet: &str) -> Result<RawTable> {
        if !self.sheet_names.iter().any(|s| s == sheet) {
            return Err(Error::SheetNotFound {
                file: self.file_name.clone(),
                sheet: sheet.to_string(),
            });
        }
        let range = self
            .inner
            .worksheet_range(sheet)
            .map_err(|e| Error::SourceUnavailable {
                path: self.path.clone(),
                reason: format!("reading sheet `{}`: {}", sheet, e),
            })?;
        let table = range_to_raw(&range);
        debug!(
            file = %self.file_name,
            sheet,
            rows = table.num_rows(),
            cols = table.headers.len(),
            "loaded sheet"
        );
        Ok(table)
    }
}

/// Ordered sheet names of the workbook at `path`.
pub fn sheet_names<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    Ok(Workbook::open(path)?.sheet_names.clone())
}

/// Read one sheet of the workbook at `path`.
pub fn read_sheet<P: AsRef<Path>>(path: P, sheet: &str) -> Result<RawTable> {
    Workbook::open(path)?.load(sheet)
}

pub(crate) fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

fn range_to_raw(range: &Range<Data>) -> RawTable {
    let mut rows = range.rows();
    let headers = match rows.next() {
        Some(first) => dedupe_headers(first.iter().map(to_cell).collect()),
        None => return RawTable::new(Vec::new(), Vec::new()),
    };
    let body = rows.map(|r| r.iter().map(to_cell).collect()).collect();
    RawTable::new(headers, body)
}

fn to_cell(data: &Data) -> CellValue {
    match data {
        Data::Empty | Data::Error(_) => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => match excel_serial_to_text(dt.as_f64()) {
            Some(s) => CellValue::Text(s),
            None => CellValue::Number(dt.as_f64()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
    }
}

/// Render an Excel (1900 system) serial as `YYYY-MM-DD[ HH:MM:SS]`.
///
/// Excel counts a nonexistent 1900-02-29 as serial 60, so serials below 60
/// are shifted by a day and 60 itself has no date.
fn excel_serial_to_text(serial: f64) -> Option<String> {
    if !serial.is_finite() || serial < 0.0 || (60.0..61.0).contains(&serial) {
        return None;
    }
    let serial = if serial < 60.0 { serial + 1.0 } else { serial };
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let millis = (serial * 86_400_000.0).round() as i64;
    let dt = epoch.checked_add_signed(Duration::milliseconds(millis))?;
    if serial.fract() == 0.0 {
        Some(dt.format("%Y-%m-%d").to_string())
    } else {
        Some(dt.format("%Y-%m-%d %H:%M:%S").to_string())
    }
}
