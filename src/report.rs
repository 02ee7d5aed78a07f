use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use crate::cache::CacheStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SheetOutcome {
    Summarized,
    SchemaViolation,
    SheetNotFound,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct SheetReport {
    pub sheet: String,
    pub outcome: SheetOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<CacheStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub file: String,
    /// Set when the workbook itself could not be opened.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub sheets: Vec<SheetReport>,
}

/// Per-run record of what happened to every file and sheet.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub generated_at: DateTime<Utc>,
    pub input_dir: PathBuf,
    pub files: Vec<FileReport>,
    pub summarized_sheets: usize,
    pub output: Option<PathBuf>,
}

impl RunReport {
    pub fn new(input_dir: &Path, files: Vec<FileReport>) -> Self {
        let summarized_sheets = files
            .iter()
            .flat_map(|f| &f.sheets)
            .filter(|s| s.outcome == SheetOutcome::Summarized)
            .count();
        Self {
            generated_at: Utc::now(),
            input_dir: input_dir.to_path_buf(),
            files,
            summarized_sheets,
            output: None,
        }
    }

    /// Sheets per cache classification, for the closing log line.
    pub fn cache_counts(&self) -> Vec<(CacheStatus, usize)> {
        [
            CacheStatus::New,
            CacheStatus::Match,
            CacheStatus::Mismatch,
            CacheStatus::Error,
        ]
        .into_iter()
        .map(|status| {
            let n = self
                .files
                .iter()
                .flat_map(|f| &f.sheets)
                .filter(|s| s.cache == Some(status))
                .count();
            (status, n)
        })
        .collect()
    }

    /// Pretty JSON, written atomically.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating report directory {:?}", parent))?;
        }
        let tmp_path = path.with_extension("json.tmp");
        let mut tmp = fs::File::create(&tmp_path)
            .with_context(|| format!("creating {:?}", tmp_path))?;
        serde_json::to_writer_pretty(&mut tmp, self).context("serializing run report")?;
        tmp.write_all(b"\n")?;
        fs::rename(&tmp_path, path)
            .with_context(|| format!("renaming {:?} -> {:?}", tmp_path, path))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sheet(outcome: SheetOutcome, cache: Option<CacheStatus>) -> SheetReport {
        SheetReport {
            sheet: "2024-01".into(),
            outcome,
            cache,
            detail: None,
        }
    }

    #[test]
    fn counts_and_serializes() -> Result<()> {
        let report = RunReport::new(
            Path::new("input"),
            vec![FileReport {
                file: "a.xlsx".into(),
                error: None,
                sheets: vec![
                    sheet(SheetOutcome::Summarized, Some(CacheStatus::New)),
                    sheet(SheetOutcome::Summarized, Some(CacheStatus::Mismatch)),
                    sheet(SheetOutcome::SchemaViolation, None),
                ],
            }],
        );
        assert_eq!(report.summarized_sheets, 2);
        assert_eq!(
            report.cache_counts(),
            vec![
                (CacheStatus::New, 1),
                (CacheStatus::Match, 0),
                (CacheStatus::Mismatch, 1),
                (CacheStatus::Error, 0)
            ]
        );

        let dir = tempdir()?;
        let path = dir.path().join("run_report.json");
        report.write_json(&path)?;
        let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path)?)?;
        assert_eq!(json["files"][0]["sheets"][1]["cache"], "MISMATCH");
        assert_eq!(json["files"][0]["sheets"][2]["outcome"], "schema_violation");
        assert!(json["files"][0]["sheets"][2].get("cache").is_none());
        assert!(json["generated_at"].is_string());
        Ok(())
    }
}
