// src/logging.rs

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    path::Path,
    sync::Mutex,
};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Map Python-style level names (`WARNING`, `CRITICAL`, …) to a tracing directive.
pub fn level_directive(level: &str) -> &'static str {
    match level.trim().to_ascii_uppercase().as_str() {
        "TRACE" => "trace",
        "DEBUG" => "debug",
        "WARN" | "WARNING" => "warn",
        "ERROR" | "CRITICAL" | "FATAL" => "error",
        _ => "info",
    }
}

/// Install the global subscriber: stderr always, plus a plain-text file
/// layer when `log_file` is set. `RUST_LOG` overrides `level`.
pub fn init(level: &str, log_file: Option<&Path>) -> Result<()> {
    let env = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_directive(level)));

    let file_layer = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating log directory {:?}", parent))?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("opening log file {:?}", path))?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .try_init()
        .context("installing tracing subscriber")?;
    Ok(())
}

/// Test logging; ignores an already-installed subscriber.
#[cfg(test)]
pub(crate) fn init_test_logging() {
    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,energysheets=debug")),
        )
        .with_test_writer()
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}
