use std::path::Path;

pub const CACHE_EXTENSION: &str = "parquet";

/// Filesystem-safe name of one cache entry, derived from
/// `(source file, sheet name)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// `<file stem>_<sanitized sheet>.parquet`. The sheet name keeps
    /// alphanumerics plus space, `.`, `-` and `_`, then is trimmed.
    ///
    /// Distinct sheet names can sanitize to the same key.
    pub fn derive(source_file: &str, sheet: &str) -> Self {
        let stem = Path::new(source_file)
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| source_file.to_string());
        Self(format!(
            "{}_{}.{}",
            stem,
            sanitize_sheet_name(sheet),
            CACHE_EXTENSION
        ))
    }

    pub fn file_name(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn sanitize_sheet_name(sheet: &str) -> String {
    sheet
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '.' | '-' | '_'))
        .collect::<String>()
        .trim()
        .to_string()
}
