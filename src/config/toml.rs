//! TOML configuration file parsing

use super::*;
use crate::config::cli::Cli;
use crate::config::cli_convert::{convert_backend, convert_sampling, parse_count, parse_duration_ms};
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Parse TOML configuration file
pub fn parse_toml_file(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_toml_string(&contents)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Parse TOML configuration from string
pub fn parse_toml_string(contents: &str) -> Result<Config> {
    let config: Config = ::toml::from_str(contents)
        .context("Failed to parse TOML configuration")?;

    Ok(config)
}

/// Merge CLI arguments with TOML configuration (CLI takes precedence)
pub fn merge_cli_with_config(cli: &Cli, mut config: Config) -> Result<Config> {
    // Override run settings
    if let Some(ref total_str) = cli.total_size {
        config.run.total_size = parse_count(total_str).context("Invalid total size")?;
    }
    if let Some(workers) = cli.workers {
        config.run.workers = workers;
    }
    if let Some(coordinator) = cli.coordinator {
        config.run.coordinator = coordinator;
    }
    if let Some(sampling) = cli.sampling {
        config.run.sampling = convert_sampling(sampling);
    }
    if let Some(backend) = cli.backend {
        config.run.backend = convert_backend(backend);
    }
    if let Some(ref timeout_str) = cli.timeout {
        config.run.timeout_ms = parse_duration_ms(timeout_str).context("Invalid timeout")?;
    }

    // Override output settings
    if let Some(ref path) = cli.json_output {
        config.output.json_output = Some(path.clone());
    }
    if cli.show_partials {
        config.output.show_partials = true;
    }

    Ok(config)
}

/// Build the effective configuration: TOML file (if any) overlaid with CLI flags
pub fn load_config(cli: &Cli) -> Result<Config> {
    let base = match cli.config {
        Some(ref path) => parse_toml_file(path)?,
        None => Config::default(),
    };
    merge_cli_with_config(cli, base)
}
