//! Capture patcher.
//!
//! Walks an input tree of capture folders and writes fixed-size tiles with
//! per-tile JSON metadata for each of them.

mod config;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use config::{load_config, Overrides};

#[derive(Parser, Debug)]
#[command(name = "patcher")]
#[command(about = "Split capture folders into fixed-size tiles with fused metadata")]
struct Args {
    /// YAML configuration file
    #[arg(short, long, env = "PATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Input root holding <source>/<capture>/ folders
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output root for tile folders
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Tile edge length in pixels
    #[arg(long)]
    tile_size: Option<usize>,

    /// Number of captures processed in parallel
    #[arg(long)]
    workers: Option<usize>,

    /// Write PNG previews of raw tiles
    #[arg(long)]
    png_previews: bool,

    /// Do not write run_summary.json
    #[arg(long)]
    no_summary: bool,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            input: self.input.clone(),
            output: self.output.clone(),
            tile_size: self.tile_size,
            workers: self.workers,
            png_previews: self.png_previews,
            no_summary: self.no_summary,
        }
    }
}

fn init_tracing(log_level: &str, json: bool) -> Result<()> {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true);

    if json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_tracing(&args.log_level, args.json_logs)?;

    info!("Starting capture patcher");

    let config = load_config(args.config.as_deref(), &args.overrides(), |key| {
        std::env::var(key).ok()
    })?;
    info!(
        input = %config.input_root.display(),
        output = %config.output_root.display(),
        tile_size = config.tile_size,
        sources = ?config.sources.iter().map(|s| s.directory.as_str()).collect::<Vec<_>>(),
        "Loaded configuration"
    );

    let report = tiling::run_batch(&config)?;

    for skipped in report
        .captures
        .iter()
        .filter(|c| c.status == tiling::CaptureStatus::Skipped)
    {
        warn!(
            capture = %skipped.name,
            reason = skipped.error.as_deref().unwrap_or("unknown"),
            "Capture skipped"
        );
    }

    info!(
        tiled = report.tiled_count(),
        skipped = report.skipped_count(),
        tiles = report.total_tiles(),
        elapsed_ms = (report.finished_at - report.started_at).num_milliseconds(),
        "Done"
    );

    Ok(())
}
