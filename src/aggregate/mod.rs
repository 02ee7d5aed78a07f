// src/aggregate/mod.rs

pub mod write;

use serde::Serialize;
use std::collections::BTreeMap;

use crate::config::ColumnNames;
use crate::process::SheetSummary;

pub use write::write_xlsx;

/// One row of the concatenated summaries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LongRow {
    pub period: String,
    pub category: String,
    pub consumption: f64,
    pub cost: f64,
    pub source_file: String,
}

/// Wide cross-sheet table: one row per period, one cost column per category
/// plus a grand total.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateTable {
    /// Period header, category cost headers, total header.
    pub headers: Vec<String>,
    /// Category behind each cost column, same order as the cost headers.
    pub categories: Vec<String>,
    pub rows: Vec<AggregateRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateRow {
    pub period: String,
    pub costs: Vec<f64>,
    pub total: f64,
}

impl AggregateTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn periods(&self) -> Vec<&str> {
        self.rows.iter().map(|r| r.period.as_str()).collect()
    }

    /// Values of a cost or total column by header.
    pub fn column(&self, header: &str) -> Option<Vec<f64>> {
        if self.headers.last().map(String::as_str) == Some(header) {
            return Some(self.rows.iter().map(|r| r.total).collect());
        }
        let idx = self.headers[1..self.headers.len().saturating_sub(1)]
            .iter()
            .position(|h| h == header)?;
        Some(self.rows.iter().map(|r| r.costs[idx]).collect())
    }
}

/// Flatten summaries into long form, sorted so that downstream sums do not
/// depend on the order sheets were processed in.
pub fn long_form(summaries: &[SheetSummary]) -> Vec<LongRow> {
    let mut rows: Vec<LongRow> = summaries
        .iter()
        .flat_map(|s| {
            s.rows.iter().map(move |r| LongRow {
                period: s.period.clone(),
                category: r.category.clone(),
                consumption: r.consumption,
                cost: r.cost,
                source_file: s.source_file.clone(),
            })
        })
        .collect();
    rows.sort_by(|a, b| {
        a.period
            .cmp(&b.period)
            .then_with(|| a.category.cmp(&b.category))
            .then_with(|| a.source_file.cmp(&b.source_file))
            .then_with(|| a.cost.total_cmp(&b.cost))
            .then_with(|| a.consumption.total_cmp(&b.consumption))
    });
    rows
}

/// Pivot every summary into the wide table. Canonical categories always get
/// a column (zero-filled); any other category follows them in sorted order.
pub fn pivot(
    summaries: &[SheetSummary],
    canonical: &[String],
    columns: &ColumnNames,
) -> AggregateTable {
    let long = long_form(summaries);

    let mut categories: Vec<String> = canonical.to_vec();
    let mut extras: Vec<&str> = long
        .iter()
        .map(|r| r.category.as_str())
        .filter(|c| !canonical.iter().any(|k| k == c))
        .collect();
    extras.sort_unstable();
    extras.dedup();
    categories.extend(extras.into_iter().map(str::to_string));

    let mut cells: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for r in &long {
        let slot = categories
            .iter()
            .position(|c| *c == r.category)
            .unwrap_or_default();
        cells
            .entry(r.period.as_str())
            .or_insert_with(|| vec![0.0; categories.len()])[slot] += r.cost;
    }

    let rows = cells
        .into_iter()
        .map(|(period, costs)| AggregateRow {
            period: period.to_string(),
            total: costs.iter().sum(),
            costs,
        })
        .collect();

    let mut headers = Vec::with_capacity(categories.len() + 2);
    headers.push(columns.period.clone());
    headers.extend(categories.iter().map(|c| columns.cost_column_for(c)));
    headers.push(columns.total.clone());

    AggregateTable {
        headers,
        categories,
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_CATEGORIES;
    use crate::process::CategoryTotals;

    fn canonical() -> Vec<String> {
        DEFAULT_CATEGORIES.iter().map(|c| c.to_string()).collect()
    }

    fn summary(period: &str, file: &str, rows: &[(&str, f64)]) -> SheetSummary {
        SheetSummary {
            period: period.into(),
            source_file: file.into(),
            rows: rows
                .iter()
                .map(|(c, cost)| CategoryTotals {
                    category: c.to_string(),
                    consumption: cost / 2.0,
                    cost: *cost,
                })
                .collect(),
        }
    }

    #[test]
    fn two_periods_end_to_end() {
        let names = ColumnNames::default();
        let table = pivot(
            &[
                summary("2024-01", "a.xlsx", &[("电", 100.0), ("自来水", 20.0)]),
                summary("2024-02", "a.xlsx", &[("电", 150.0), ("自来水", 0.0)]),
            ],
            &canonical(),
            &names,
        );
        assert_eq!(table.periods(), vec!["2024-01", "2024-02"]);
        assert_eq!(table.column("电_费用(元)"), Some(vec![100.0, 150.0]));
        assert_eq!(table.column("自来水_费用(元)"), Some(vec![20.0, 0.0]));
        assert_eq!(table.column("燃气_费用(元)"), Some(vec![0.0, 0.0]));
        assert_eq!(table.column("总费用(元)"), Some(vec![120.0, 150.0]));
        assert_eq!(
            table.headers,
            vec![
                "日期区间",
                "电_费用(元)",
                "采暖热表_费用(元)",
                "生活热水表_费用(元)",
                "自来水_费用(元)",
                "中水_费用(元)",
                "燃气_费用(元)",
                "总费用(元)"
            ]
        );
    }

    #[test]
    fn same_period_across_files_is_summed() {
        let table = pivot(
            &[
                summary("2024-01", "a.xlsx", &[("电", 1.5)]),
                summary("2024-01", "b.xlsx", &[("电", 2.25)]),
            ],
            &canonical(),
            &ColumnNames::default(),
        );
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.column("电_费用(元)"), Some(vec![3.75]));
    }

    #[test]
    fn order_of_inputs_does_not_matter() {
        let a = summary("2024-02", "a.xlsx", &[("电", 0.1), ("燃气", 0.7)]);
        let b = summary("2024-02", "b.xlsx", &[("电", 0.2), ("中水", 1e-3)]);
        let c = summary("2024-01", "c.xlsx", &[("电", 0.3)]);
        let names = ColumnNames::default();
        let forward = pivot(&[a.clone(), b.clone(), c.clone()], &canonical(), &names);
        let backward = pivot(&[c, b, a], &canonical(), &names);
        assert_eq!(forward, backward);
        assert_eq!(
            serde_json::to_string(&forward).unwrap(),
            serde_json::to_string(&backward).unwrap()
        );
    }

    #[test]
    fn unknown_categories_follow_canonical_ones() {
        let table = pivot(
            &[summary("2024-01", "a.xlsx", &[("蒸汽", 5.0), ("电", 1.0), ("冷量", 2.0)])],
            &canonical(),
            &ColumnNames::default(),
        );
        let tail: Vec<&str> = table.categories[6..].iter().map(String::as_str).collect();
        assert_eq!(tail, vec!["冷量", "蒸汽"]);
        assert_eq!(table.column("总费用(元)"), Some(vec![8.0]));
    }

    #[test]
    fn total_is_exact_row_sum() {
        let table = pivot(
            &[
                summary("2024-01", "a.xlsx", &[("电", 0.1), ("采暖热表", 0.2), ("燃气", 0.3)]),
                summary("2024-03", "a.xlsx", &[("中水", 1e16), ("自来水", 1.0)]),
            ],
            &canonical(),
            &ColumnNames::default(),
        );
        for row in &table.rows {
            let expected: f64 = row.costs.iter().sum();
            assert_eq!(row.total.to_bits(), expected.to_bits());
        }
    }

    #[test]
    fn empty_input_gives_empty_table() {
        let table = pivot(&[], &canonical(), &ColumnNames::default());
        assert!(table.is_empty());
        assert_eq!(table.headers.len(), 8);
    }
}
