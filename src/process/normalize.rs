// src/process/normalize.rs

use arrow::{
    array::{Array, StringArray},
    record_batch::RecordBatch,
};
use tracing::{debug, warn};

use super::convert::{batch_to_rows, rows_to_batch};
use super::schema::{ResolvedColumns, SheetSchema};
use crate::error::Result;
use crate::source::{format_number, CellValue, RawTable};

/// A cleaned sheet: category gaps filled and trimmed, identifier columns
/// held as text, everything else as read.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedTable {
    source_file: String,
    period: String,
    category_column: String,
    batch: RecordBatch,
}

impl NormalizedTable {
    pub fn source_file(&self) -> &str {
        &self.source_file
    }

    /// Reporting period, i.e. the sheet name.
    pub fn period(&self) -> &str {
        &self.period
    }

    pub fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.batch
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect()
    }

    /// Category per row; `None` only for a leading run that had nothing to fill from.
    pub fn categories(&self) -> Vec<Option<String>> {
        match self
            .batch
            .column_by_name(&self.category_column)
            .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        {
            Some(arr) => arr.iter().map(|v| v.map(str::to_string)).collect(),
            None => vec![None; self.num_rows()],
        }
    }

    /// Back to an untyped grid, e.g. to feed through [`normalize`] again.
    pub fn to_raw(&self) -> RawTable {
        RawTable::new(self.column_names(), batch_to_rows(&self.batch))
    }
}

/// Clean one sheet. Fails with `SchemaViolation` when a required column is
/// missing; row order and count are preserved otherwise.
#[tracing::instrument(level = "debug", skip(raw, schema), fields(rows = raw.num_rows()))]
pub fn normalize(
    raw: &RawTable,
    schema: &SheetSchema,
    period: &str,
    source_file: &str,
) -> Result<NormalizedTable> {
    let cols = schema.validate(raw, source_file, period)?;
    let identifiers = schema.identifier_indices(raw);

    let mut rows = raw.rows.clone();
    let unfilled = fill_categories(&mut rows, cols);
    if unfilled > 0 {
        // leading rows have no category above them to inherit
        warn!(
            file = source_file,
            sheet = period,
            unfilled,
            "leading rows have no category"
        );
    }
    for row in rows.iter_mut() {
        for &i in &identifiers {
            row[i] = identifier_text(&row[i]);
        }
    }

    let mut text_columns = identifiers;
    text_columns.push(cols.category);
    let batch = rows_to_batch(&raw.headers, &rows, &text_columns)?;

    debug!(file = source_file, sheet = period, "normalized");
    Ok(NormalizedTable {
        source_file: source_file.to_string(),
        period: period.to_string(),
        category_column: raw.headers[cols.category].clone(),
        batch,
    })
}

/// Forward-fill then trim the category column. Returns how many leading
/// rows stayed empty.
fn fill_categories(rows: &mut [Vec<CellValue>], cols: ResolvedColumns) -> usize {
    let mut last: Option<String> = None;
    let mut unfilled = 0;
    for row in rows.iter_mut() {
        let cell = &mut row[cols.category];
        if cell.is_blank() {
            match &last {
                Some(v) => *cell = CellValue::Text(v.clone()),
                None => {
                    *cell = CellValue::Empty;
                    unfilled += 1;
                }
            }
            continue;
        }
        let value = cell.as_text().unwrap_or_default().trim().to_string();
        *cell = CellValue::Text(value.clone());
        last = Some(value);
    }
    unfilled
}

/// Meter numbers: whole numbers lose the `.0`, text is kept verbatim.
fn identifier_text(cell: &CellValue) -> CellValue {
    match cell {
        CellValue::Number(n) => CellValue::Text(format_number(*n)),
        CellValue::Bool(_) => CellValue::Text(cell.as_text().unwrap_or_default()),
        other => other.clone(),
    }
}
