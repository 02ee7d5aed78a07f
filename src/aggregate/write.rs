use rust_xlsxwriter::{Workbook, XlsxError};
use std::{fs, path::Path};
use tracing::info;

use super::AggregateTable;
use crate::error::{Error, Result};

pub const OUTPUT_SHEET: &str = "Sheet1";

/// Write the aggregate as a single-sheet workbook: header row, then one row
/// per period. Written beside `path` first and renamed into place.
pub fn write_xlsx(table: &AggregateTable, path: &Path) -> Result<()> {
    let out_err = |reason: String| Error::Output {
        path: path.to_path_buf(),
        reason,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| out_err(e.to_string()))?;
    }
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let tmp_path = path.with_file_name(format!(".{}.tmp", file_name));

    build_workbook(table)
        .and_then(|mut wb| wb.save(&tmp_path))
        .map_err(|e| out_err(e.to_string()))?;
    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        out_err(e.to_string())
    })?;

    info!(path = %path.display(), periods = table.rows.len(), "wrote summary");
    Ok(())
}

fn build_workbook(table: &AggregateTable) -> std::result::Result<Workbook, XlsxError> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet().set_name(OUTPUT_SHEET)?;

    for (col, header) in table.headers.iter().enumerate() {
        sheet.write_string(0, col as u16, header)?;
    }
    for (i, row) in table.rows.iter().enumerate() {
        let r = (i + 1) as u32;
        sheet.write_string(r, 0, &row.period)?;
        for (j, cost) in row.costs.iter().enumerate() {
            sheet.write_number(r, (j + 1) as u16, *cost)?;
        }
        sheet.write_number(r, (row.costs.len() + 1) as u16, row.total)?;
    }
    Ok(workbook)
}
