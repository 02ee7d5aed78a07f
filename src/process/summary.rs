use arrow::{
    array::{Array, Float64Array, StringArray},
    compute::cast,
    datatypes::DataType,
};
use serde::Serialize;
use tracing::warn;

use super::normalize::NormalizedTable;
use crate::config::ColumnNames;

/// Totals for one energy category within one sheet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotals {
    pub category: String,
    pub consumption: f64,
    pub cost: f64,
}

/// Per-category totals of one sheet, tagged with its period and source file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SheetSummary {
    pub period: String,
    pub source_file: String,
    /// Recognized categories present in the sheet, in canonical order.
    pub rows: Vec<CategoryTotals>,
}

impl SheetSummary {
    /// `(consumption, cost)` for `category`; zeros when absent or unrecognized.
    pub fn totals(&self, category: &str) -> (f64, f64) {
        self.rows
            .iter()
            .find(|r| r.category == category)
            .map_or((0.0, 0.0), |r| (r.consumption, r.cost))
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Sum consumption and cost per recognized category. Rows whose category is
/// outside `categories` are ignored.
pub fn summarize(
    table: &NormalizedTable,
    categories: &[String],
    columns: &ColumnNames,
) -> SheetSummary {
    let labels = table.categories();
    let consumption = measure(table, &columns.consumption);
    let cost = measure(table, &columns.cost);

    let mut sums = vec![(0.0f64, 0.0f64, false); categories.len()];
    for (row, label) in labels.iter().enumerate() {
        let Some(slot) = label
            .as_deref()
            .and_then(|l| categories.iter().position(|c| c == l))
        else {
            continue;
        };
        let s = &mut sums[slot];
        s.0 += consumption[row];
        s.1 += cost[row];
        s.2 = true;
    }

    let rows = categories
        .iter()
        .zip(sums)
        .filter(|(_, (_, _, seen))| *seen)
        .map(|(category, (consumption, cost, _))| CategoryTotals {
            category: category.clone(),
            consumption,
            cost,
        })
        .collect();

    SheetSummary {
        period: table.period().to_string(),
        source_file: table.source_file().to_string(),
        rows,
    }
}

/// Numeric view of a column: nulls are 0, unparseable text is 0 and logged.
fn measure(table: &NormalizedTable, name: &str) -> Vec<f64> {
    let rows = table.num_rows();
    let Some(col) = table.batch().column_by_name(name) else {
        return vec![0.0; rows];
    };

    if let Some(text) = col.as_any().downcast_ref::<StringArray>() {
        let mut bad = 0usize;
        let values: Vec<f64> = text
            .iter()
            .map(|v| match v.map(str::trim) {
                None | Some("") => 0.0,
                Some(s) => s.parse::<f64>().unwrap_or_else(|_| {
                    bad += 1;
                    0.0
                }),
            })
            .collect();
        if bad > 0 {
            warn!(
                file = table.source_file(),
                sheet = table.period(),
                column = name,
                bad,
                "non-numeric values excluded from totals"
            );
        }
        return values;
    }

    match cast(col.as_ref(), &DataType::Float64) {
        Ok(arr) => match arr.as_any().downcast_ref::<Float64Array>() {
            Some(f) => f.iter().map(|v| v.unwrap_or(0.0)).collect(),
            None => vec![0.0; rows],
        },
        Err(e) => {
            warn!(
                file = table.source_file(),
                sheet = table.period(),
                column = name,
                "column is not numeric: {}",
                e
            );
            vec![0.0; rows]
        }
    }
}
