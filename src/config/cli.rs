//! CLI argument parsing using clap

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Execution mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExecutionMode {
    /// Parallel midpoint integration of 4/(1+x²), reduced to the coordinator (default)
    Integrate,
    /// Dot product of the two vectors in a text file (or stdin)
    Dot,
    /// Pass two numbers through the host-value marshaling layer
    PairSum,
}

/// pireduce - parallel reduce-to-root numerical integration
#[derive(Parser, Debug)]
#[command(name = "pireduce")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Execution mode: integrate, dot, or pair-sum
    #[arg(long, value_enum, default_value = "integrate")]
    pub mode: ExecutionMode,

    // === Integration Options ===
    /// Total number of integration steps (e.g., 8, 10k, 500M)
    #[arg(short = 'n', long, env = "PIREDUCE_TOTAL_SIZE")]
    pub total_size: Option<String>,

    /// Number of workers (default: number of logical CPUs)
    #[arg(short = 'w', long, env = "PIREDUCE_WORKERS")]
    pub workers: Option<usize>,

    /// Rank that receives and prints the result
    #[arg(long)]
    pub coordinator: Option<usize>,

    /// Sample set per worker: inclusive reproduces the reference tool's
    /// shared boundary sample, exclusive evaluates owned samples only
    #[arg(long, value_enum)]
    pub sampling: Option<SamplingType>,

    /// Phase 1 execution substrate
    #[arg(long, value_enum)]
    pub backend: Option<BackendType>,

    /// How long to wait for every worker's partial (e.g., 500ms, 30s, 2m)
    #[arg(long)]
    pub timeout: Option<String>,

    // === Output Options ===
    /// JSON report output path
    #[arg(long)]
    pub json_output: Option<PathBuf>,

    /// Print each rank's partial sum after the result
    #[arg(long)]
    pub show_partials: bool,

    // === Dot Product Options ===
    /// Vector file for dot mode (reads stdin when omitted)
    #[arg(long, value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Persist the dot product as a raw f64 to this file and read it back
    #[arg(long, value_name = "FILE")]
    pub result_file: Option<PathBuf>,

    // === Marshaling Options ===
    /// The two operands for pair-sum mode
    #[arg(long, num_args = 2, value_names = ["A", "B"], allow_negative_numbers = true)]
    pub pair: Option<Vec<f64>>,

    // === Configuration File ===
    /// TOML configuration file
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Dry run - validate configuration without executing
    #[arg(long)]
    pub dry_run: bool,

    /// Enable debug logging (overrides RUST_LOG)
    #[arg(long)]
    pub debug: bool,
}

/// Sampling policy
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SamplingType {
    /// Evaluate [start, end], matching the reference tool
    Inclusive,
    /// Evaluate [start, end), the owned slice only
    Exclusive,
}

/// Execution substrate
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum BackendType {
    /// One thread per rank with channel fan-in
    Threads,
    /// Rayon thread pool
    Rayon,
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate CLI arguments
    pub fn validate(&self) -> anyhow::Result<()> {
        if let Some(0) = self.workers {
            anyhow::bail!("workers must be at least 1");
        }

        match self.mode {
            ExecutionMode::PairSum => {
                if self.pair.is_none() {
                    anyhow::bail!("pair-sum mode requires --pair A B");
                }
            }
            ExecutionMode::Integrate => {
                if self.input.is_some() || self.result_file.is_some() {
                    anyhow::bail!("--input and --result-file only apply to dot mode");
                }
            }
            ExecutionMode::Dot => {}
        }

        Ok(())
    }
}
