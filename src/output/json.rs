//! JSON output formatting
//!
//! One report per run: configuration echo, the coordinator's estimate and its
//! distance from π, and per-rank partial sums.

use crate::coordinator::Reduction;
use crate::reducer::Contribution;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Duration;

/// Duration with both microseconds and human-readable format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonDuration {
    pub micros: u64,
    pub human: String,
}

impl JsonDuration {
    pub fn from_duration(d: Duration) -> Self {
        let micros = d.as_micros() as u64;
        let human = format_duration_human(d);
        Self { micros, human }
    }
}

/// Complete run report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonReport {
    pub version: String,
    /// RFC 3339 UTC time the report was produced
    pub timestamp: String,
    pub hostname: String,
    pub total_size: u64,
    pub workers: usize,
    pub coordinator: usize,
    pub sampling: String,
    pub backend: String,
    pub estimate: f64,
    /// |estimate - π|
    pub abs_error: f64,
    pub samples_per_worker: u64,
    pub dropped_remainder: u64,
    pub elapsed: JsonDuration,
    pub partials: Vec<Contribution>,
}

impl JsonReport {
    pub fn from_reduction(reduction: &Reduction) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            hostname: node_hostname(),
            total_size: reduction.total_size,
            workers: reduction.num_workers,
            coordinator: reduction.coordinator_rank,
            sampling: reduction.sampling.to_string(),
            backend: reduction.backend.to_string(),
            estimate: reduction.estimate,
            abs_error: (reduction.estimate - std::f64::consts::PI).abs(),
            samples_per_worker: reduction.samples_per_worker,
            dropped_remainder: reduction.dropped_remainder,
            elapsed: JsonDuration::from_duration(reduction.elapsed),
            partials: reduction.contributions.clone(),
        }
    }
}

fn node_hostname() -> String {
    hostname::get()
        .map(|h| h.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "unknown".to_string())
}

/// Write the report for `reduction` to `output_path`
pub fn write_json_output(output_path: &Path, reduction: &Reduction, pretty: bool) -> Result<()> {
    let report = JsonReport::from_reduction(reduction);
    let file = File::create(output_path)
        .with_context(|| format!("Failed to create JSON output: {}", output_path.display()))?;
    let mut writer = BufWriter::new(file);

    if pretty {
        serde_json::to_writer_pretty(&mut writer, &report)?;
    } else {
        serde_json::to_writer(&mut writer, &report)?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to write JSON output: {}", output_path.display()))?;

    Ok(())
}

/// Format duration in human-readable format
fn format_duration_human(d: Duration) -> String {
    let micros = d.as_micros() as u64;

    if micros < 1000 {
        format!("{}µs", micros)
    } else if micros < 1_000_000 {
        format!("{:.3}ms", micros as f64 / 1000.0)
    } else if micros < 60_000_000 {
        format!("{:.3}s", micros as f64 / 1_000_000.0)
    } else {
        format!("{:.2}m", micros as f64 / 60_000_000.0)
    }
}
