mod batch;
mod error;
mod geometry;
mod hierarchy;
mod render;

use anyhow::{bail, Context, Result};
use batch::{BatchOptions, BatchReport, FailurePolicy};
use chrono::Utc;
use clap::{ArgAction, Parser};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

const DEFAULT_OUT_DIR: &str = "edited_screenshots";

#[derive(Parser, Debug)]
#[command(
    name = "draw-bounding-boxes",
    version,
    about = "Draw visible view-hierarchy bounds onto paired .json/.jpg screenshots"
)]
struct Cli {
    /// Directory holding <name>.json hierarchies and <name>.jpg screenshots
    path: Option<PathBuf>,
    /// Directory for annotated screenshots (regular files in it are removed first)
    #[arg(short, long, default_value = DEFAULT_OUT_DIR)]
    out_dir: PathBuf,
    /// What to do when a pair cannot be annotated
    #[arg(long, value_enum, default_value_t = FailurePolicy::Skip)]
    on_error: FailurePolicy,
    /// Number of pairs annotated concurrently
    #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u16).range(1..))]
    jobs: u16,
    /// Write a JSON run report to this path
    #[arg(long)]
    report: Option<PathBuf>,
    /// Exit with non-zero status when any pair was skipped
    #[arg(long, action = ArgAction::SetTrue)]
    strict: bool,
    /// Enable debug logging
    #[arg(short, long, action = ArgAction::SetTrue)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(err) = run(cli) {
        tracing::error!("{err:#}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let Some(input_dir) = cli.path else {
        bail!("You must pass the path to the dataset");
    };

    let options = BatchOptions {
        input_dir,
        output_dir: cli.out_dir,
        frame: geometry::REFERENCE_FRAME,
        on_error: cli.on_error,
        jobs: usize::from(cli.jobs),
    };

    let report = batch::run_batch(&options).with_context(|| {
        format!(
            "failed to annotate screenshots in {}",
            options.input_dir.display()
        )
    })?;

    tracing::info!(
        "{} succeeded, {} failed",
        report.annotated.len(),
        report.failure_count()
    );

    if let Some(path) = &cli.report {
        let payload = report.to_json(&options, &timestamp_iso());
        write_json_pretty(path, &payload)?;
        tracing::debug!(report = %path.display(), "wrote run report");
    }

    check_strict(&report, cli.strict)?;
    tracing::info!("Execution has finished successfully");
    Ok(())
}

fn check_strict(report: &BatchReport, strict: bool) -> Result<()> {
    if strict && report.failure_count() > 0 {
        bail!(
            "{} pair(s) failed and --strict is set",
            report.failure_count()
        );
    }
    Ok(())
}

fn write_json_pretty(path: &Path, value: &Value) -> Result<()> {
    ensure_parent_dir(path)?;
    let raw = serde_json::to_string_pretty(value)?;
    fs::write(path, raw).with_context(|| format!("failed to write JSON: {}", path.display()))?;
    Ok(())
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed to create parent directory: {}", parent.display())
            })?;
        }
    }
    Ok(())
}

fn timestamp_iso() -> String {
    Utc::now().to_rfc3339()
}
