//! Configuration validation

use super::*;
use anyhow::Result;

/// Validate complete configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_run(&config.run)?;
    validate_output(&config.output)?;
    Ok(())
}

/// Validate run configuration
///
/// Invalid values are rejected, never clamped: a zero worker count is an
/// error, not one worker.
pub fn validate_run(run: &RunConfig) -> Result<()> {
    if run.workers == 0 {
        anyhow::bail!("workers must be at least 1");
    }

    if run.total_size <= 0 {
        anyhow::bail!("total_size must be positive, got {}", run.total_size);
    }

    if (run.total_size as u64) < run.workers as u64 {
        anyhow::bail!(
            "total_size ({}) must be at least the number of workers ({})",
            run.total_size,
            run.workers
        );
    }

    if run.coordinator >= run.workers {
        anyhow::bail!(
            "coordinator rank {} is outside the worker group [0, {})",
            run.coordinator,
            run.workers
        );
    }

    if run.timeout_ms == 0 {
        anyhow::bail!("timeout must be greater than zero");
    }

    Ok(())
}

/// Validate output configuration
pub fn validate_output(output: &OutputConfig) -> Result<()> {
    if let Some(ref path) = output.json_output {
        if path.as_os_str().is_empty() {
            anyhow::bail!("json_output path must not be empty");
        }
        if path.is_dir() {
            anyhow::bail!("json_output must be a file path, got directory {}", path.display());
        }
    }
    Ok(())
}
