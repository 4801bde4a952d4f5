//! Configuration module
//!
//! Handles CLI argument parsing, TOML configuration files, and validation.

pub mod cli;
pub mod cli_convert;
pub mod toml;
pub mod validator;

use crate::reducer::SamplingPolicy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Complete run configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Reduction run parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Total number of integration steps
    #[serde(default = "default_total_size")]
    pub total_size: i64,
    /// Number of workers (ranks) in the group
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Rank that receives the reduced result
    #[serde(default)]
    pub coordinator: usize,
    /// Which sample indices each worker evaluates
    #[serde(default)]
    pub sampling: SamplingPolicy,
    /// Execution substrate for Phase 1
    #[serde(default)]
    pub backend: Backend,
    /// How long the coordinator waits for all partials (milliseconds)
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_total_size() -> i64 {
    500_000_000
}

fn default_workers() -> usize {
    num_cpus::get()
}

fn default_timeout_ms() -> u64 {
    60_000
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            total_size: default_total_size(),
            workers: default_workers(),
            coordinator: 0,
            sampling: SamplingPolicy::default(),
            backend: Backend::default(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl RunConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Phase 1 execution substrate
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// One OS thread per rank, fan-in over a channel, wait timeout enforced
    #[default]
    Threads,
    /// Rayon pool sized to the worker count, no wait timeout
    Rayon,
}

/// Output configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    /// JSON report path
    pub json_output: Option<PathBuf>,
    /// Print each rank's partial sum after the result
    #[serde(default)]
    pub show_partials: bool,
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Configuration:")?;
        writeln!(f, "  Run: {}", self.run)?;
        writeln!(f, "  Output: {}", self.output)?;
        Ok(())
    }
}

impl fmt::Display for RunConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "total_size={}, workers={}, coordinator={}, sampling={}, backend={}, timeout={}ms",
            self.total_size,
            self.workers,
            self.coordinator,
            self.sampling,
            self.backend,
            self.timeout_ms
        )
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Threads => write!(f, "threads"),
            Backend::Rayon => write!(f, "rayon"),
        }
    }
}

impl fmt::Display for OutputConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.json_output {
            Some(ref path) => write!(f, "json={}", path.display())?,
            None => write!(f, "text only")?,
        }
        if self.show_partials {
            write!(f, ", partials")?;
        }
        Ok(())
    }
}
