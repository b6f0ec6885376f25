//! Layered configuration loading for the patcher.
//!
//! Precedence, lowest first: built-in defaults, YAML file, `PATCH_*`
//! environment variables (including values from `.env`), command-line flags.
//! `~` and `$VAR` references in paths are expanded last.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tiling::TilingConfig;

/// Values given on the command line. `None`/`false` leaves the lower layer
/// untouched.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub tile_size: Option<usize>,
    pub workers: Option<usize>,
    pub png_previews: bool,
    pub no_summary: bool,
}

/// Build the effective configuration.
pub fn load_config(
    config_file: Option<&Path>,
    overrides: &Overrides,
    env: impl Fn(&str) -> Option<String>,
) -> Result<TilingConfig> {
    let mut config = match config_file {
        Some(path) => {
            let expanded = expand_path(path)?;
            TilingConfig::from_yaml_file(&expanded)
                .with_context(|| format!("Failed to load config from {:?}", expanded))?
        }
        None => TilingConfig::default(),
    };

    config.apply_env_with(env);

    if let Some(input) = &overrides.input {
        config.input_root = input.clone();
    }
    if let Some(output) = &overrides.output {
        config.output_root = output.clone();
    }
    if let Some(tile_size) = overrides.tile_size {
        config.tile_size = tile_size;
    }
    if let Some(workers) = overrides.workers {
        config.workers = workers;
    }
    if overrides.png_previews {
        config.png_previews = true;
    }
    if overrides.no_summary {
        config.write_summary = false;
    }

    config.input_root = expand_path(&config.input_root)?;
    config.output_root = expand_path(&config.output_root)?;

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Expand `~` and environment variables in a path.
fn expand_path(path: &Path) -> Result<PathBuf> {
    let raw = path.to_string_lossy();
    let expanded = shellexpand::full(&raw)
        .with_context(|| format!("Failed to expand path {:?}", raw))?;
    Ok(PathBuf::from(expanded.as_ref()))
}
