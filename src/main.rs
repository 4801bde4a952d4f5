//! pireduce CLI entry point

use anyhow::{Context, Result};
use pireduce::config::cli::{Cli, ExecutionMode};
use pireduce::config::{toml, validator};
use pireduce::coordinator::ParallelReducer;
use pireduce::marshal::{self, HostValue};
use pireduce::output::{json, text};
use pireduce::vector;
use std::fs::File;
use std::io::{self, BufReader};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = Cli::parse_args();
    init_logging(cli.debug);
    cli.validate()?;

    match cli.mode {
        ExecutionMode::Integrate => run_integrate(&cli),
        ExecutionMode::Dot => run_dot(&cli),
        ExecutionMode::PairSum => run_pair_sum(&cli),
    }
}

/// Log to stderr so stdout carries only results
fn init_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    // A subscriber may already be installed when embedded; keep it
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

/// Run the parallel integration and print the coordinator's result
fn run_integrate(cli: &Cli) -> Result<()> {
    let config = toml::load_config(cli)?;

    validator::validate_config(&config)
        .context("Configuration validation failed")?;

    if cli.dry_run {
        print!("{}", config);
        println!();
        println!("Dry run mode - configuration validated successfully");
        return Ok(());
    }

    let reducer = ParallelReducer::new(config.run.clone())
        .context("Failed to create reducer")?;
    let reduction = reducer.run()
        .context("Reduction failed")?;

    text::print_results(&reduction, config.output.show_partials);

    if let Some(ref path) = config.output.json_output {
        json::write_json_output(path, &reduction, true)?;
        tracing::info!(path = %path.display(), "JSON report written");
    }

    Ok(())
}

/// Dot product of a vector pair from a file or stdin
fn run_dot(cli: &Cli) -> Result<()> {
    let (a, b) = match cli.input {
        Some(ref path) => {
            let file = File::open(path)
                .with_context(|| format!("Error opening {}", path.display()))?;
            vector::read_vector_pair(BufReader::new(file))
                .with_context(|| format!("Error reading {}", path.display()))?
        }
        None => vector::read_vector_pair(io::stdin().lock())
            .context("Error reading vectors from stdin")?,
    };

    let result = vector::dot(&a, &b)?;
    if vector::is_near_zero(result) {
        println!("Warning: |result| < 10^-6");
        return Ok(());
    }

    match cli.result_file {
        Some(ref path) => {
            vector::write_scalar(path, result)
                .with_context(|| format!("Error writing to {}", path.display()))?;
            println!("Output written to file.");
            let read_back = vector::read_scalar(path)
                .with_context(|| format!("Error reading from {}", path.display()))?;
            println!("Value read from file: {:5.2}", read_back);
        }
        None => println!("result = {:.6}", result),
    }

    Ok(())
}

/// Round-trip two numbers through the marshaling layer
fn run_pair_sum(cli: &Cli) -> Result<()> {
    let operands = cli.pair.as_deref().unwrap_or_default();
    let args: Vec<HostValue> = operands.iter().copied().map(HostValue::scalar).collect();

    match marshal::call_native(&args, marshal::pair_sum)? {
        HostValue::Numeric(values) => {
            let rendered: Vec<String> = values.iter().map(|v| v.to_string()).collect();
            println!("{}", rendered.join(" "));
        }
        other => anyhow::bail!("pair_sum returned a non-numeric value: {:?}", other),
    }

    Ok(())
}
