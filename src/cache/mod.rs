// src/cache/mod.rs

pub mod compare;
pub mod key;

use arrow::{
    compute::concat_batches,
    record_batch::{RecordBatch, RecordBatchReader},
};
use parquet::arrow::{arrow_reader::ParquetRecordBatchReaderBuilder, ArrowWriter};
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use serde::Serialize;
use std::{
    fs::{self, File},
    io::BufWriter,
    path::{Path, PathBuf},
};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::process::NormalizedTable;
pub use compare::first_difference;
pub use key::CacheKey;

/// Outcome of comparing a freshly normalized table with its cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CacheStatus {
    /// No entry exists yet.
    New,
    Match,
    /// Entry exists and differs in content.
    Mismatch,
    /// Entry exists but cannot be read.
    Error,
}

impl CacheStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::New => "NEW",
            CacheStatus::Match => "MATCH",
            CacheStatus::Mismatch => "MISMATCH",
            CacheStatus::Error => "ERROR",
        }
    }
}

impl std::fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Last-seen normalized table per (source file, sheet), one Parquet file each.
#[derive(Debug, Clone)]
pub struct SheetCache {
    dir: PathBuf,
}

impl SheetCache {
    /// The directory is created lazily on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(key.file_name())
    }

    /// Serialize `table` under `key`, replacing any existing entry. Written
    /// to a temporary file first, then renamed into place.
    pub fn write(&self, table: &NormalizedTable, key: &CacheKey) -> Result<PathBuf> {
        let final_path = self.path(key);
        let write_err = |reason: String| Error::CacheWrite {
            path: final_path.clone(),
            reason,
        };

        fs::create_dir_all(&self.dir).map_err(|e| write_err(e.to_string()))?;
        let tmp_path = self.dir.join(format!(".{}.tmp", key.file_name()));

        let result = (|| -> std::result::Result<(), String> {
            let file = File::create(&tmp_path).map_err(|e| e.to_string())?;
            let props = WriterProperties::builder()
                .set_compression(Compression::SNAPPY)
                .build();
            let batch = table.batch();
            let mut writer = ArrowWriter::try_new(BufWriter::new(file), batch.schema(), Some(props))
                .map_err(|e| e.to_string())?;
            writer.write(batch).map_err(|e| e.to_string())?;
            writer.close().map_err(|e| e.to_string())?;
            fs::rename(&tmp_path, &final_path).map_err(|e| e.to_string())
        })();

        if let Err(reason) = result {
            let _ = fs::remove_file(&tmp_path);
            return Err(write_err(reason));
        }
        info!(path = %final_path.display(), rows = table.num_rows(), "cached sheet");
        Ok(final_path)
    }

    /// Read the entry under `key` back into a single batch.
    pub fn read(&self, key: &CacheKey) -> Result<RecordBatch> {
        let path = self.path(key);
        let read_err = |reason: String| Error::CacheRead {
            path: path.clone(),
            reason,
        };

        let file = File::open(&path).map_err(|e| read_err(e.to_string()))?;
        let reader = ParquetRecordBatchReaderBuilder::try_new(file)
            .map_err(|e| read_err(e.to_string()))?
            .with_batch_size(8192)
            .build()
            .map_err(|e| read_err(e.to_string()))?;
        let schema = reader.schema();
        let batches = reader
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| read_err(e.to_string()))?;
        concat_batches(&schema, &batches).map_err(|e| read_err(e.to_string()))
    }

    /// Classify `table` against the entry under `key`. Never writes.
    pub fn compare(&self, table: &NormalizedTable, key: &CacheKey) -> CacheStatus {
        let path = self.path(key);
        if !path.exists() {
            return CacheStatus::New;
        }
        let cached = match self.read(key) {
            Ok(b) => b,
            Err(e) => {
                debug!(
                    file = table.source_file(),
                    sheet = table.period(),
                    "cache comparison failed: {}",
                    e
                );
                return CacheStatus::Error;
            }
        };
        match first_difference(&cached, table.batch()) {
            None => CacheStatus::Match,
            Some(diff) => {
                debug!(
                    file = table.source_file(),
                    sheet = table.period(),
                    %diff,
                    "cached table differs"
                );
                CacheStatus::Mismatch
            }
        }
    }
}
