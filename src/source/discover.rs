use anyhow::{Context, Result};
use glob::glob;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::config::LOCK_FILE_PREFIX;

/// All `*.xlsx` workbooks directly under `input_dir`, lock files excluded,
/// sorted by path.
pub fn discover_workbooks(input_dir: &Path) -> Result<Vec<PathBuf>> {
    let pattern = format!("{}/*.xlsx", input_dir.display());
    let mut found = Vec::new();
    for entry in glob(&pattern).with_context(|| format!("invalid glob pattern {}", pattern))? {
        let path = match entry {
            Ok(p) => p,
            Err(e) => {
                warn!("cannot read glob entry: {:?}", e);
                continue;
            }
        };
        let is_lock = path
            .file_name()
            .and_then(|n| n.to_str())
            .map_or(true, |n| n.starts_with(LOCK_FILE_PREFIX));
        if path.is_file() && !is_lock {
            found.push(path);
        }
    }
    found.sort();
    Ok(found)
}
