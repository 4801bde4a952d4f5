//! Human-readable text output

use crate::coordinator::Reduction;

/// The coordinator's result line, π to 8 decimal places in an 11-wide field
pub fn format_estimate(value: f64) -> String {
    format!("The value of pi is: {:11.8}", value)
}

/// Numeric output produced by `rank`: the result line on the coordinator, nothing elsewhere
pub fn rank_output(reduction: &Reduction, rank: usize) -> Option<String> {
    reduction.view(rank).map(format_estimate)
}

/// Print the coordinator's result, optionally followed by every rank's partial sum
pub fn print_results(reduction: &Reduction, show_partials: bool) {
    if let Some(line) = rank_output(reduction, reduction.coordinator_rank) {
        println!("{}", line);
    }

    if show_partials {
        println!();
        println!(
            "Partials ({} workers, {} samples each, sampling={}, backend={}):",
            reduction.num_workers,
            reduction.samples_per_worker,
            reduction.sampling,
            reduction.backend
        );
        for c in &reduction.contributions {
            println!("  rank {:>4}/{}: {:.15}", c.rank, reduction.num_workers, c.value);
        }
        if reduction.dropped_remainder > 0 {
            println!("  dropped remainder: {} sample(s)", reduction.dropped_remainder);
        }
        println!("Elapsed: {:.3}s", reduction.elapsed.as_secs_f64());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Backend;
    use crate::reducer::{Contribution, SamplingPolicy};
    use std::time::Duration;

    fn reduction() -> Reduction {
        Reduction {
            coordinator_rank: 1,
            num_workers: 2,
            total_size: 8,
            sampling: SamplingPolicy::Exclusive,
            backend: Backend::Threads,
            estimate: std::f64::consts::PI,
            contributions: vec![
                Contribution { rank: 0, value: 1.8 },
                Contribution { rank: 1, value: 1.34 },
            ],
            samples_per_worker: 4,
            dropped_remainder: 0,
            elapsed: Duration::from_millis(3),
        }
    }

    #[test]
    fn test_format_estimate() {
        assert_eq!(format_estimate(std::f64::consts::PI), "The value of pi is:  3.14159265");
    }

    #[test]
    fn test_only_coordinator_prints() {
        let r = reduction();
        assert_eq!(rank_output(&r, 0), None);
        assert_eq!(rank_output(&r, 1).as_deref(), Some("The value of pi is:  3.14159265"));
    }
}
