use crate::config::ColumnNames;
use crate::error::{Error, Result};
use crate::source::{CellValue, RawTable};

/// What a required column means to the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRole {
    Category,
    Consumption,
    Cost,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SemanticType {
    Text,
    Numeric,
}

impl ColumnRole {
    pub fn semantic_type(self) -> SemanticType {
        match self {
            ColumnRole::Category => SemanticType::Text,
            ColumnRole::Consumption | ColumnRole::Cost => SemanticType::Numeric,
        }
    }
}

impl SemanticType {
    /// Whether a non-empty cell can hold a value of this type. Text columns
    /// take anything; numeric ones take numbers and numeric text.
    pub fn accepts(self, cell: &CellValue) -> bool {
        match (self, cell) {
            (SemanticType::Text, _) => true,
            (SemanticType::Numeric, CellValue::Number(_)) => true,
            (SemanticType::Numeric, CellValue::Text(s)) => s.trim().parse::<f64>().is_ok(),
            (SemanticType::Numeric, _) => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: String,
    pub role: ColumnRole,
}

/// Required columns (ordered) plus the optional identifier columns that
/// get coerced to text when present.
#[derive(Debug, Clone)]
pub struct SheetSchema {
    pub required: Vec<ColumnSpec>,
    pub identifiers: Vec<String>,
}

/// Column positions of a RawTable that passed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedColumns {
    pub category: usize,
    pub consumption: usize,
    pub cost: usize,
}

impl SheetSchema {
    pub fn from_names(names: &ColumnNames) -> Self {
        Self {
            required: vec![
                ColumnSpec {
                    name: names.category.clone(),
                    role: ColumnRole::Category,
                },
                ColumnSpec {
                    name: names.consumption.clone(),
                    role: ColumnRole::Consumption,
                },
                ColumnSpec {
                    name: names.cost.clone(),
                    role: ColumnRole::Cost,
                },
            ],
            identifiers: names.identifiers.clone(),
        }
    }

    pub fn column(&self, role: ColumnRole) -> &str {
        self.required
            .iter()
            .find(|c| c.role == role)
            .map(|c| c.name.as_str())
            .unwrap_or_default()
    }

    /// Exact header match for every required column. A column whose
    /// non-empty cells include none of its semantic type is mistyped; single
    /// bad cells are left to the summarizer.
    pub fn validate(&self, raw: &RawTable, file: &str, sheet: &str) -> Result<ResolvedColumns> {
        let mut missing = Vec::new();
        let mut mistyped = Vec::new();
        for spec in &self.required {
            let Some(idx) = raw.column_index(&spec.name) else {
                missing.push(spec.name.clone());
                continue;
            };
            let kind = spec.role.semantic_type();
            let mut filled = raw
                .rows
                .iter()
                .map(|row| &row[idx])
                .filter(|cell| !cell.is_blank())
                .peekable();
            if filled.peek().is_some() && !filled.any(|cell| kind.accepts(cell)) {
                mistyped.push(spec.name.clone());
            }
        }
        if !missing.is_empty() || !mistyped.is_empty() {
            return Err(Error::SchemaViolation {
                file: file.to_string(),
                sheet: sheet.to_string(),
                missing,
                mistyped,
                found: raw.headers.clone(),
            });
        }
        let idx = |role| raw.column_index(self.column(role)).unwrap_or_default();
        Ok(ResolvedColumns {
            category: idx(ColumnRole::Category),
            consumption: idx(ColumnRole::Consumption),
            cost: idx(ColumnRole::Cost),
        })
    }

    /// Positions of identifier columns present in `raw`.
    pub fn identifier_indices(&self, raw: &RawTable) -> Vec<usize> {
        self.identifiers
            .iter()
            .filter_map(|name| raw.column_index(name))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(headers: &[&str]) -> RawTable {
        RawTable::new(headers.iter().map(|h| h.to_string()).collect(), vec![])
    }

    #[test]
    fn resolves_required_positions() -> anyhow::Result<()> {
        let schema = SheetSchema::from_names(&ColumnNames::default());
        let raw = table(&["表号", "费用(元)", "能源类型", "实际消耗"]);
        let cols = schema.validate(&raw, "a.xlsx", "2024-01")?;
        assert_eq!(
            cols,
            ResolvedColumns {
                category: 2,
                consumption: 3,
                cost: 1
            }
        );
        assert_eq!(schema.identifier_indices(&raw), vec![0]);
        Ok(())
    }

    #[test]
    fn missing_cost_reports_identity_and_found_columns() {
        let schema = SheetSchema::from_names(&ColumnNames::default());
        let raw = table(&["能源类型", "实际消耗", "费用 (元)"]);
        match schema.validate(&raw, "a.xlsx", "2024-01") {
            Err(Error::SchemaViolation {
                file,
                sheet,
                missing,
                mistyped,
                found,
            }) => {
                assert_eq!(file, "a.xlsx");
                assert_eq!(sheet, "2024-01");
                assert_eq!(missing, vec!["费用(元)"]);
                assert!(mistyped.is_empty());
                assert_eq!(found.len(), 3);
            }
            other => panic!("expected schema violation, got {:?}", other),
        }
    }

    fn sheet(cost: Vec<CellValue>) -> RawTable {
        let rows = cost
            .into_iter()
            .map(|c| vec![CellValue::Text("电".into()), CellValue::Number(1.0), c])
            .collect();
        RawTable::new(
            vec!["能源类型".into(), "实际消耗".into(), "费用(元)".into()],
            rows,
        )
    }

    #[test]
    fn cost_column_without_any_number_is_mistyped() {
        let schema = SheetSchema::from_names(&ColumnNames::default());
        let raw = sheet(vec![
            CellValue::Text("n/a".into()),
            CellValue::Bool(true),
            CellValue::Empty,
        ]);
        match schema.validate(&raw, "a.xlsx", "2024-01") {
            Err(Error::SchemaViolation {
                missing, mistyped, ..
            }) => {
                assert!(missing.is_empty());
                assert_eq!(mistyped, vec!["费用(元)"]);
            }
            other => panic!("expected schema violation, got {:?}", other),
        }
    }

    #[test]
    fn stray_text_and_empty_columns_still_validate() -> anyhow::Result<()> {
        let schema = SheetSchema::from_names(&ColumnNames::default());
        let mixed = sheet(vec![
            CellValue::Text("n/a".into()),
            CellValue::Text(" 12.5 ".into()),
        ]);
        schema.validate(&mixed, "a.xlsx", "2024-01")?;
        let blank = sheet(vec![CellValue::Empty, CellValue::Text("  ".into())]);
        schema.validate(&blank, "a.xlsx", "2024-01")?;
        Ok(())
    }

    #[test]
    fn semantic_types_by_role() {
        assert_eq!(ColumnRole::Category.semantic_type(), SemanticType::Text);
        assert!(SemanticType::Text.accepts(&CellValue::Number(3.0)));
        assert_eq!(ColumnRole::Cost.semantic_type(), SemanticType::Numeric);
        assert!(!SemanticType::Numeric.accepts(&CellValue::Bool(false)));
    }
}
