// src/pipeline.rs

use anyhow::{bail, Context, Result};
use rayon::prelude::*;
use std::{
    collections::{hash_map::Entry, HashMap},
    fs,
    path::{Path, PathBuf},
    time::Instant,
};
use tracing::{debug, error, info, instrument, warn};

use crate::aggregate::{pivot, write_xlsx, AggregateTable};
use crate::cache::{CacheKey, CacheStatus, SheetCache};
use crate::config::{ColumnNames, Config};
use crate::error::Error;
use crate::process::{normalize, summarize, SheetSchema, SheetSummary};
use crate::report::{FileReport, RunReport, SheetOutcome, SheetReport};
use crate::source::{discover_workbooks, excel::file_name_of, sheet_names, Workbook};

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The aggregate workbook was written to this path.
    Written(PathBuf),
    /// No sheet could be summarized; nothing was written except the report.
    NothingProcessed,
}

#[derive(Debug)]
pub struct RunResult {
    pub outcome: RunOutcome,
    pub report: RunReport,
    pub table: Option<AggregateTable>,
}

/// Owner of every cache key for one run. Keys are claimed before any sheet
/// is processed, in workbook discovery order then sheet order, so exactly
/// one sheet per key touches the cache no matter how files are scheduled.
#[derive(Debug, Default)]
pub struct KeyClaims {
    owners: HashMap<CacheKey, (String, String)>,
}

impl KeyClaims {
    /// Claim keys for every sheet of `workbooks`. Unreadable workbooks claim
    /// nothing; they are reported when processed.
    pub fn from_workbooks(workbooks: &[PathBuf]) -> Self {
        let mut claims = Self::default();
        for path in workbooks {
            let file = file_name_of(path);
            match sheet_names(path) {
                Ok(sheets) => {
                    for sheet in &sheets {
                        claims.claim(&file, sheet);
                    }
                }
                Err(e) => debug!(file = %file, "no cache keys claimed: {}", e),
            }
        }
        claims
    }

    /// First claimant wins; returns whether `(file, sheet)` owns its key.
    pub fn claim(&mut self, file: &str, sheet: &str) -> bool {
        match self.owners.entry(CacheKey::derive(file, sheet)) {
            Entry::Vacant(v) => {
                v.insert((file.to_string(), sheet.to_string()));
                true
            }
            Entry::Occupied(o) => o.get().0 == file && o.get().1 == sheet,
        }
    }

    pub fn owner(&self, key: &CacheKey) -> Option<(&str, &str)> {
        self.owners
            .get(key)
            .map(|(file, sheet)| (file.as_str(), sheet.as_str()))
    }
}

/// Per-sheet work: normalize, compare with cache, summarize.
pub struct SheetProcessor {
    schema: SheetSchema,
    columns: ColumnNames,
    categories: Vec<String>,
    cache: SheetCache,
}

impl SheetProcessor {
    pub fn new(columns: ColumnNames, categories: Vec<String>, cache: SheetCache) -> Self {
        Self {
            schema: SheetSchema::from_names(&columns),
            columns,
            categories,
            cache,
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(
            cfg.columns.clone(),
            cfg.categories.clone(),
            SheetCache::new(cfg.cache_dir()),
        )
    }

    pub fn cache(&self) -> &SheetCache {
        &self.cache
    }

    /// Process every sheet of one workbook. Failures are recorded in the
    /// returned report and never escape. Only sheets owning their key in
    /// `claims` touch the cache.
    #[instrument(level = "info", skip(self, path, claims), fields(file = %path.display()))]
    pub fn process_workbook(
        &self,
        path: &Path,
        claims: &KeyClaims,
    ) -> (FileReport, Vec<SheetSummary>) {
        let mut report = FileReport {
            file: file_name_of(path),
            error: None,
            sheets: Vec::new(),
        };
        let mut workbook = match Workbook::open(path) {
            Ok(wb) => wb,
            Err(e) => {
                error!(file = %report.file, "skipping workbook: {}", e);
                report.error = Some(e.to_string());
                return (report, Vec::new());
            }
        };

        let start = Instant::now();
        let mut summaries = Vec::new();
        for sheet in workbook.sheet_names().to_vec() {
            let (sheet_report, summary) = self.process_sheet(&mut workbook, &sheet, claims);
            report.sheets.push(sheet_report);
            summaries.extend(summary);
        }
        info!(
            file = %report.file,
            sheets = report.sheets.len(),
            summarized = summaries.len(),
            elapsed = ?start.elapsed(),
            "workbook done"
        );
        (report, summaries)
    }

    fn process_sheet(
        &self,
        workbook: &mut Workbook,
        sheet: &str,
        claims: &KeyClaims,
    ) -> (SheetReport, Option<SheetSummary>) {
        let file = workbook.file_name().to_string();
        let mut report = SheetReport {
            sheet: sheet.to_string(),
            outcome: SheetOutcome::Summarized,
            cache: None,
            detail: None,
        };
        info!(file = %file, sheet, "processing sheet");

        let table = match workbook
            .load(sheet)
            .and_then(|raw| normalize(&raw, &self.schema, sheet, &file))
        {
            Ok(t) => t,
            Err(e) => {
                report.outcome = match e {
                    Error::SchemaViolation { .. } => SheetOutcome::SchemaViolation,
                    Error::SheetNotFound { .. } => SheetOutcome::SheetNotFound,
                    _ => SheetOutcome::Failed,
                };
                warn!(file = %file, sheet, "skipping sheet: {}", e);
                report.detail = Some(e.to_string());
                return (report, None);
            }
        };

        let key = CacheKey::derive(&file, sheet);
        match claims.owner(&key) {
            Some((f, s)) if f == file && s == sheet => {
                let status = self.cache.compare(&table, &key);
                report.cache = Some(status);
                self.apply_cache_policy(status, &table, &key, &mut report);
            }
            owner => {
                let owner = owner
                    .map(|(f, s)| format!("{} / {}", f, s))
                    .unwrap_or_else(|| "no sheet".into());
                warn!(
                    file = %file,
                    sheet,
                    key = %key,
                    owner = %owner,
                    "cache key owned by another sheet; cache check skipped"
                );
                report.detail = Some(format!("cache key {} is owned by {}", key, owner));
            }
        }

        let summary = summarize(&table, &self.categories, &self.columns);
        (report, Some(summary))
    }

    /// NEW is written; MATCH is left alone; MISMATCH and ERROR are logged
    /// and the existing entry stays the system of record.
    fn apply_cache_policy(
        &self,
        status: CacheStatus,
        table: &crate::process::NormalizedTable,
        key: &CacheKey,
        report: &mut SheetReport,
    ) {
        let (file, sheet) = (table.source_file(), table.period());
        match status {
            CacheStatus::New => {
                info!(file, sheet, "new sheet; caching");
                if let Err(e) = self.cache.write(table, key) {
                    error!(file, sheet, "cache write failed: {}", e);
                    report.detail = Some(e.to_string());
                }
            }
            CacheStatus::Match => info!(file, sheet, "matches cache"),
            CacheStatus::Mismatch => {
                error!(
                    file,
                    sheet,
                    path = %self.cache.path(key).display(),
                    "sheet does not match cached data; cache not updated"
                );
            }
            CacheStatus::Error => {
                error!(
                    file,
                    sheet,
                    path = %self.cache.path(key).display(),
                    "cache entry unreadable; cache left untouched"
                );
            }
        }
    }
}

/// Full run: discover workbooks, process them in parallel, pivot, write.
pub fn run(cfg: &Config) -> Result<RunResult> {
    let start = Instant::now();
    let input_dir = &cfg.paths.input_dir;
    if !input_dir.is_dir() {
        bail!("input directory {} does not exist", input_dir.display());
    }
    let output_dir = &cfg.paths.output_dir;
    if !output_dir.exists() {
        fs::create_dir_all(output_dir)
            .with_context(|| format!("creating output directory {:?}", output_dir))?;
        info!(dir = %output_dir.display(), "created output directory");
    }

    let workbooks = discover_workbooks(input_dir)?;
    if workbooks.is_empty() {
        warn!(dir = %input_dir.display(), "no workbooks found");
    }
    let processor = SheetProcessor::from_config(cfg);
    let claims = KeyClaims::from_workbooks(&workbooks);
    info!(
        count = workbooks.len(),
        cache = %processor.cache().dir().display(),
        "starting run"
    );

    let results: Vec<(FileReport, Vec<SheetSummary>)> = workbooks
        .par_iter()
        .map(|path| processor.process_workbook(path, &claims))
        .collect();

    let mut files = Vec::with_capacity(results.len());
    let mut summaries = Vec::new();
    for (file, sheet_summaries) in results {
        files.push(file);
        summaries.extend(sheet_summaries);
    }

    let mut report = RunReport::new(input_dir, files);
    let outcome = if report.summarized_sheets == 0 {
        warn!("no data processed");
        None
    } else {
        let table = pivot(&summaries, &cfg.categories, &cfg.columns);
        let path = cfg.output_path();
        write_xlsx(&table, &path)?;
        report.output = Some(path.clone());
        Some((path, table))
    };

    report
        .write_json(&cfg.report_path())
        .context("writing run report")?;
    for (status, n) in report.cache_counts() {
        info!(status = %status, sheets = n, "cache classification");
    }
    info!(
        summarized = report.summarized_sheets,
        elapsed = ?start.elapsed(),
        "run complete"
    );

    Ok(match outcome {
        Some((path, table)) => RunResult {
            outcome: RunOutcome::Written(path),
            report,
            table: Some(table),
        },
        None => RunResult {
            outcome: RunOutcome::NothingProcessed,
            report,
            table: None,
        },
    })
}
