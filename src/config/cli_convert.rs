//! CLI to Config conversion utilities

use crate::config::{cli, Backend};
use crate::reducer::SamplingPolicy;
use anyhow::{Context, Result};

/// Parse a sample count (e.g., "8", "10k", "500M", "5G") using decimal multipliers
pub fn parse_count(s: &str) -> Result<i64> {
    let s = s.trim().to_lowercase().replace('_', "");

    let (num_str, multiplier) = if let Some(n) = s.strip_suffix('k') {
        (n, 1_000i64)
    } else if let Some(n) = s.strip_suffix('m') {
        (n, 1_000_000)
    } else if let Some(n) = s.strip_suffix('g') {
        (n, 1_000_000_000)
    } else if let Some(n) = s.strip_suffix('t') {
        (n, 1_000_000_000_000)
    } else {
        (s.as_str(), 1)
    };

    let num: i64 = num_str.parse()
        .with_context(|| format!("Invalid count format: {}", s))?;

    num.checked_mul(multiplier)
        .with_context(|| format!("Count overflows i64: {}", s))
}

/// Parse a duration string (e.g., "500ms", "30s", "2m", "1h") to milliseconds
pub fn parse_duration_ms(s: &str) -> Result<u64> {
    let s = s.trim().to_lowercase();

    let (num_str, multiplier) = if let Some(n) = s.strip_suffix("ms") {
        (n, 1u64)
    } else if let Some(n) = s.strip_suffix('s') {
        (n, 1000)
    } else if let Some(n) = s.strip_suffix('m') {
        (n, 60 * 1000)
    } else if let Some(n) = s.strip_suffix('h') {
        (n, 3600 * 1000)
    } else {
        (s.as_str(), 1000)
    };

    let num: u64 = num_str.parse()
        .with_context(|| format!("Invalid duration format: {}", s))?;

    num.checked_mul(multiplier)
        .with_context(|| format!("Duration overflows: {}", s))
}

/// Convert CLI SamplingType to reducer SamplingPolicy
pub fn convert_sampling(cli_type: cli::SamplingType) -> SamplingPolicy {
    match cli_type {
        cli::SamplingType::Inclusive => SamplingPolicy::Inclusive,
        cli::SamplingType::Exclusive => SamplingPolicy::Exclusive,
    }
}

/// Convert CLI BackendType to config Backend
pub fn convert_backend(cli_type: cli::BackendType) -> Backend {
    match cli_type {
        cli::BackendType::Threads => Backend::Threads,
        cli::BackendType::Rayon => Backend::Rayon,
    }
}
