// src/config.rs

use crate::error::{Error, Result};
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Canonical energy categories, in output column order.
pub const DEFAULT_CATEGORIES: [&str; 6] = ["电", "采暖热表", "生活热水表", "自来水", "中水", "燃气"];

/// Workbook names starting with this prefix are editor lock files.
pub const LOCK_FILE_PREFIX: &str = "~$";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_file: Option<PathBuf>,
    pub paths: Paths,
    #[serde(default)]
    pub columns: ColumnNames,
    #[serde(default = "default_categories")]
    pub categories: Vec<String>,
    #[serde(default = "default_output_file")]
    pub output_file: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Paths {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Defaults to `<parent of output_dir>/data`.
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
}

/// Column headers the sheets are expected to carry, plus the names used
/// for the wide-form output columns.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ColumnNames {
    pub category: String,
    pub consumption: String,
    pub cost: String,
    pub identifiers: Vec<String>,
    pub period: String,
    pub total: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            category: "能源类型".into(),
            consumption: "实际消耗".into(),
            cost: "费用(元)".into(),
            identifiers: vec!["表号".into()],
            period: "日期区间".into(),
            total: "总费用(元)".into(),
        }
    }
}

impl ColumnNames {
    /// Wide-form header for one category's cost, e.g. `电_费用(元)`.
    pub fn cost_column_for(&self, category: &str) -> String {
        format!("{}_{}", category, self.cost)
    }
}

fn default_log_level() -> String {
    "INFO".into()
}

fn default_categories() -> Vec<String> {
    DEFAULT_CATEGORIES.iter().map(|c| c.to_string()).collect()
}

fn default_output_file() -> String {
    "energy_usage_summary.xlsx".into()
}

impl Config {
    /// Load a YAML config file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| Error::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_yaml(&text).map_err(|e| match e {
            Error::Config { reason, .. } => Error::Config {
                path: path.to_path_buf(),
                reason,
            },
            other => other,
        })
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        let cfg: Config = serde_yaml::from_str(text).map_err(|e| Error::Config {
            path: PathBuf::new(),
            reason: e.to_string(),
        })?;
        if cfg.categories.is_empty() {
            return Err(Error::Config {
                path: PathBuf::new(),
                reason: "`categories` must not be empty".into(),
            });
        }
        Ok(cfg)
    }

    /// Config with defaults for everything but the two required directories.
    pub fn with_dirs(input_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            log_level: default_log_level(),
            log_file: None,
            paths: Paths {
                input_dir: input_dir.into(),
                output_dir: output_dir.into(),
                cache_dir: None,
            },
            columns: ColumnNames::default(),
            categories: default_categories(),
            output_file: default_output_file(),
        }
    }

    pub fn cache_dir(&self) -> PathBuf {
        match &self.paths.cache_dir {
            Some(dir) => dir.clone(),
            None => self
                .paths
                .output_dir
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join("data"),
        }
    }

    pub fn output_path(&self) -> PathBuf {
        self.paths.output_dir.join(&self.output_file)
    }

    pub fn report_path(&self) -> PathBuf {
        self.paths.output_dir.join("run_report.json")
    }
}
