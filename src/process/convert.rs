use arrow::{
    array::{Array, ArrayRef, BooleanArray, Float64Array, StringArray},
    datatypes::{DataType, Field, Schema},
    error::ArrowError,
    record_batch::RecordBatch,
};
use std::sync::Arc;

use crate::source::CellValue;

/// Pick one Arrow type for a column of cells: all numbers → Float64, all
/// bools → Boolean, anything else (including all-empty) → Utf8.
pub fn infer_column_type<'a>(cells: impl Iterator<Item = &'a CellValue>) -> DataType {
    let mut numbers = 0usize;
    let mut bools = 0usize;
    for cell in cells {
        match cell {
            CellValue::Empty => {}
            CellValue::Number(_) => numbers += 1,
            CellValue::Bool(_) => bools += 1,
            CellValue::Text(_) => return DataType::Utf8,
        }
    }
    match (numbers, bools) {
        (n, 0) if n > 0 => DataType::Float64,
        (0, b) if b > 0 => DataType::Boolean,
        _ => DataType::Utf8,
    }
}

fn build_column(cells: &[&CellValue], ty: &DataType) -> ArrayRef {
    match ty {
        DataType::Float64 => Arc::new(Float64Array::from(
            cells
                .iter()
                .map(|c| match c {
                    CellValue::Number(n) => Some(*n),
                    _ => None,
                })
                .collect::<Vec<_>>(),
        )),
        DataType::Boolean => Arc::new(BooleanArray::from(
            cells
                .iter()
                .map(|c| match c {
                    CellValue::Bool(b) => Some(*b),
                    _ => None,
                })
                .collect::<Vec<_>>(),
        )),
        _ => Arc::new(StringArray::from(
            cells.iter().map(|c| c.as_text()).collect::<Vec<_>>(),
        )),
    }
}

/// Build a typed batch from a row grid. Columns listed in `text_columns`
/// are always Utf8.
pub fn rows_to_batch(
    headers: &[String],
    rows: &[Vec<CellValue>],
    text_columns: &[usize],
) -> Result<RecordBatch, ArrowError> {
    let mut fields = Vec::with_capacity(headers.len());
    let mut arrays = Vec::with_capacity(headers.len());

    for (i, name) in headers.iter().enumerate() {
        let cells: Vec<&CellValue> = rows.iter().map(|r| &r[i]).collect();
        let ty = if text_columns.contains(&i) {
            DataType::Utf8
        } else {
            infer_column_type(cells.iter().copied())
        };
        arrays.push(build_column(&cells, &ty));
        fields.push(Field::new(name, ty, true));
    }

    RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)
}

/// Inverse of [`rows_to_batch`] for the column types it produces.
pub fn batch_to_rows(batch: &RecordBatch) -> Vec<Vec<CellValue>> {
    let mut rows = vec![Vec::with_capacity(batch.num_columns()); batch.num_rows()];
    for col in batch.columns() {
        for (r, row) in rows.iter_mut().enumerate() {
            row.push(cell_at(col.as_ref(), r));
        }
    }
    rows
}

fn cell_at(col: &dyn Array, row: usize) -> CellValue {
    if col.is_null(row) {
        return CellValue::Empty;
    }
    if let Some(a) = col.as_any().downcast_ref::<Float64Array>() {
        CellValue::Number(a.value(row))
    } else if let Some(a) = col.as_any().downcast_ref::<BooleanArray>() {
        CellValue::Bool(a.value(row))
    } else if let Some(a) = col.as_any().downcast_ref::<StringArray>() {
        CellValue::Text(a.value(row).to_string())
    } else {
        CellValue::Empty
    }
}
