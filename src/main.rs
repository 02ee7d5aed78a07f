use anyhow::Result;
use clap::Parser;
use energysheets::{
    config::Config,
    logging,
    pipeline::{self, RunOutcome},
};
use std::path::PathBuf;
use tracing::info;

/// Summarize monthly energy-metering workbooks into one cost table.
#[derive(Debug, Parser)]
#[command(name = "energysheets", version)]
struct Cli {
    /// YAML config file.
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Directory of input workbooks (overrides `paths.input_dir`).
    #[arg(long)]
    input: Option<PathBuf>,

    /// Output directory (overrides `paths.output_dir`).
    #[arg(long)]
    output: Option<PathBuf>,

    /// Cache directory (overrides `paths.cache_dir`).
    #[arg(long)]
    cache: Option<PathBuf>,
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut cfg = match (&cli.input, &cli.output) {
        // both directories on the command line: the file is optional
        (Some(input), Some(output)) if !cli.config.exists() => Config::with_dirs(input, output),
        _ => Config::load(&cli.config)?,
    };
    if let Some(dir) = &cli.input {
        cfg.paths.input_dir = dir.clone();
    }
    if let Some(dir) = &cli.output {
        cfg.paths.output_dir = dir.clone();
    }
    if let Some(dir) = &cli.cache {
        cfg.paths.cache_dir = Some(dir.clone());
    }
    Ok(cfg)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = load_config(&cli)?;

    // ─── 1) init logging ─────────────────────────────────────────────
    logging::init(&cfg.log_level, cfg.log_file.as_deref())?;
    info!("startup");

    std::panic::set_hook(Box::new(|info| {
        eprintln!("panic: {:?}", info);
    }));

    // ─── 2) run ──────────────────────────────────────────────────────
    info!(
        input = %cfg.paths.input_dir.display(),
        output = %cfg.paths.output_dir.display(),
        cache = %cfg.cache_dir().display(),
        "configured"
    );
    let result = pipeline::run(&cfg)?;

    // ─── 3) report ───────────────────────────────────────────────────
    match &result.outcome {
        RunOutcome::Written(path) => {
            let periods = result.table.as_ref().map_or(0, |t| t.rows.len());
            println!(
                "wrote {} ({} periods, {} sheets)",
                path.display(),
                periods,
                result.report.summarized_sheets
            );
        }
        RunOutcome::NothingProcessed => println!("no data processed"),
    }
    for (status, n) in result.report.cache_counts() {
        if n > 0 {
            println!("  {:<8} {}", status, n);
        }
    }

    info!("all done");
    Ok(())
}
