//! Partial sums and the reduce-to-root step
//!
//! This module holds the pure halves of a reduction run:
//!
//! - **Phase 1**: [`compute_partial`] evaluates one rank's share of the
//!   midpoint-rule integral. No communication, no shared state.
//! - **Phase 2**: [`reduce_sum`] combines one [`Contribution`] per rank into a
//!   single scalar visible only to the coordinator rank.
//!
//! The threaded driver in [`crate::coordinator`] wires the two phases together
//! through a fan-in channel.
//!
//! # Example
//!
//! ```
//! use pireduce::reducer::{compute_partial, pi_integrand, reduce_sum, Contribution};
//!
//! let num_workers = 4;
//! let contributions: Vec<Contribution> = (0..num_workers)
//!     .map(|rank| {
//!         let value = compute_partial(rank, num_workers, 1_000_000, pi_integrand)?;
//!         Ok(Contribution { rank, value })
//!     })
//!     .collect::<pireduce::Result<_>>()?;
//!
//! let pi = reduce_sum(&contributions, num_workers, 0, 0)?.expect("rank 0 is the coordinator");
//! assert!((pi - std::f64::consts::PI).abs() < 1e-4);
//!
//! // Other ranks see nothing
//! assert_eq!(reduce_sum(&contributions, num_workers, 0, 3)?, None);
//! # Ok::<(), pireduce::ReduceError>(())
//! ```

pub mod partition;

pub use partition::{Partition, SamplingPolicy};

use crate::error::ReduceError;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Shared per-sample function evaluated by every worker
pub type Integrand = Arc<dyn Fn(f64) -> f64 + Send + Sync>;

/// How many samples a worker evaluates between cancellation checks
pub const CANCEL_CHECK_INTERVAL: u64 = 64;

/// `4 / (1 + x²)`, whose integral over `[0, 1)` is π
#[inline]
pub fn pi_integrand(x: f64) -> f64 {
    4.0 / (1.0 + x * x)
}

/// The reference integrand as a shareable [`Integrand`]
pub fn pi_integrand_shared() -> Integrand {
    Arc::new(pi_integrand)
}

/// One rank's partial sum as handed to the reduction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Contribution {
    pub rank: usize,
    pub value: f64,
}

impl Contribution {
    /// Reject NaN and infinite partials
    pub fn check_finite(&self) -> Result<()> {
        if self.value.is_finite() {
            Ok(())
        } else {
            Err(ReduceError::aggregation(
                format!("rank {} reported a non-finite partial sum ({})", self.rank, self.value),
                vec![self.rank],
            ))
        }
    }
}

/// Compute rank `rank`'s partial integral with the reference (inclusive) sample set
///
/// `h = 1/total_size`, `nsize = total_size / num_workers`, and the samples
/// `i ∈ [nsize*rank + 1, nsize*rank + 1 + nsize]` are accumulated in
/// increasing order as `f(h*(i - 0.5))`. Returns `h * sum`.
///
/// # Errors
///
/// `ReduceError::Config` for a zero worker count, an out-of-range rank, or a
/// non-positive `total_size`.
pub fn compute_partial<F>(rank: usize, num_workers: usize, total_size: i64, f: F) -> Result<f64>
where
    F: Fn(f64) -> f64,
{
    let partition = Partition::new(rank, num_workers, total_size)?;
    Ok(compute_partial_with(&partition, SamplingPolicy::Inclusive, f))
}

/// Compute a partition's partial integral under an explicit sampling policy
pub fn compute_partial_with<F>(partition: &Partition, policy: SamplingPolicy, f: F) -> f64
where
    F: Fn(f64) -> f64,
{
    // Never cancelled, so always Some
    accumulate(partition, policy, f, || false).unwrap_or(f64::NAN)
}

/// Accumulate a partition, polling `should_stop` every [`CANCEL_CHECK_INTERVAL`] samples
///
/// Returns `None` if `should_stop` returned true before the partition was
/// finished. Summation order is identical to [`compute_partial_with`], so a
/// completed run is bit-identical to the uncancellable path.
pub fn accumulate<F, C>(
    partition: &Partition,
    policy: SamplingPolicy,
    f: F,
    mut should_stop: C,
) -> Option<f64>
where
    F: Fn(f64) -> f64,
    C: FnMut() -> bool,
{
    let h = partition.step_width();
    let mut sum = 0.0;
    let mut until_check = 0u64;

    for i in partition.samples(policy) {
        if until_check == 0 {
            if should_stop() {
                return None;
            }
            until_check = CANCEL_CHECK_INTERVAL;
        }
        until_check -= 1;

        let x = h * (i as f64 - 0.5);
        sum += f(x);
    }

    Some(h * sum)
}

/// Combine per-rank partials into the coordinator's result
///
/// Every rank in `[0, num_workers)` must contribute exactly once. Values are
/// summed in ascending rank order regardless of arrival order, so identical
/// inputs give bit-identical totals.
///
/// Returns `Some(total)` when `observer_rank == coordinator_rank` and `None`
/// for every other rank of the group.
///
/// # Errors
///
/// - `ReduceError::Config` if `num_workers` is zero or
///   `coordinator_rank`/`observer_rank` is outside `[0, num_workers)`.
/// - `ReduceError::Aggregation` if any partial is NaN or infinite, a rank
///   appears twice, a rank of the group is missing, or a contribution names a
///   rank outside the group.
pub fn reduce_sum(
    partials: &[Contribution],
    num_workers: usize,
    coordinator_rank: usize,
    observer_rank: usize,
) -> Result<Option<f64>> {
    if num_workers == 0 {
        return Err(ReduceError::config("num_workers must be at least 1"));
    }
    if coordinator_rank >= num_workers {
        return Err(ReduceError::config(format!(
            "coordinator rank {} is outside the worker group [0, {})",
            coordinator_rank, num_workers
        )));
    }
    if observer_rank >= num_workers {
        return Err(ReduceError::config(format!(
            "observer rank {} is outside the worker group [0, {})",
            observer_rank, num_workers
        )));
    }

    let mut slots: Vec<Option<f64>> = vec![None; num_workers];
    let mut stray = Vec::new();
    for contribution in partials {
        contribution.check_finite()?;
        match slots.get_mut(contribution.rank) {
            Some(Some(_)) => {
                return Err(ReduceError::aggregation(
                    format!("rank {} contributed more than once", contribution.rank),
                    vec![contribution.rank],
                ));
            }
            Some(slot) => *slot = Some(contribution.value),
            None => stray.push(contribution.rank),
        }
    }

    let missing: Vec<usize> = slots
        .iter()
        .enumerate()
        .filter(|(_, slot)| slot.is_none())
        .map(|(rank, _)| rank)
        .collect();
    if !missing.is_empty() {
        return Err(ReduceError::aggregation(
            format!("missing partials from ranks {:?}", missing),
            missing,
        ));
    }
    if !stray.is_empty() {
        return Err(ReduceError::aggregation(
            format!("partials from ranks {:?} outside the group [0, {})", stray, num_workers),
            stray,
        ));
    }

    if observer_rank != coordinator_rank {
        return Ok(None);
    }

    let total = slots.iter().flatten().fold(0.0, |acc, value| acc + value);
    Ok(Some(total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::seq::SliceRandom;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;
    use std::f64::consts::PI;

    fn partials(num_workers: usize, total_size: i64, policy: SamplingPolicy) -> Vec<Contribution> {
        Partition::all(num_workers, total_size)
            .unwrap()
            .iter()
            .map(|p| Contribution {
                rank: p.rank(),
                value: compute_partial_with(p, policy, pi_integrand),
            })
            .collect()
    }

    fn estimate(num_workers: usize, total_size: i64, policy: SamplingPolicy) -> f64 {
        reduce_sum(&partials(num_workers, total_size, policy), num_workers, 0, 0)
            .unwrap()
            .unwrap()
    }

    #[test]
    fn test_compute_partial_matches_reference_loop() {
        // Straight transcription of the reference loop for rank 1 of 2, total 8
        let h = 1.0 / 8.0;
        let mut sum = 0.0;
        for i in 5..=9u64 {
            let x = h * (i as f64 - 0.5);
            sum += 4.0 / (1.0 + x * x);
        }
        let expected = h * sum;

        let got = compute_partial(1, 2, 8, pi_integrand).unwrap();
        assert_eq!(got.to_bits(), expected.to_bits());
    }

    #[test]
    fn test_coarse_scenario() {
        let exclusive = estimate(2, 8, SamplingPolicy::Exclusive);
        assert!((exclusive - PI).abs() < 1e-2, "exclusive estimate {}", exclusive);

        // Inclusive sampling adds exactly the two boundary samples i = 5 and i = 9
        let h = 1.0 / 8.0;
        let boundary = h * (pi_integrand(h * 4.5) + pi_integrand(h * 8.5));
        let inclusive = estimate(2, 8, SamplingPolicy::Inclusive);
        assert!((inclusive - exclusive - boundary).abs() < 1e-12);
    }

    #[test]
    fn test_zero_workers_is_config_error() {
        let err = compute_partial(0, 0, 8, pi_integrand).unwrap_err();
        assert!(err.is_config());

        let err = reduce_sum(&[], 0, 0, 0).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_non_finite_partial_is_aggregation_error() {
        let mut parts = partials(4, 400, SamplingPolicy::Inclusive);
        parts[2].value = f64::NAN;
        let err = reduce_sum(&parts, 4, 0, 0).unwrap_err();
        match err {
            ReduceError::Aggregation { ranks, .. } => assert_eq!(ranks, vec![2]),
            other => panic!("Wrong error: {other}"),
        }

        parts[2].value = f64::INFINITY;
        assert!(reduce_sum(&parts, 4, 0, 0).unwrap_err().is_aggregation());
    }

    #[test]
    fn test_missing_and_duplicate_ranks() {
        let mut parts = partials(3, 300, SamplingPolicy::Inclusive);
        parts[1].rank = 0;
        assert!(reduce_sum(&parts, 3, 0, 0).unwrap_err().is_aggregation());

        parts[1].rank = 7;
        match reduce_sum(&parts, 3, 0, 0).unwrap_err() {
            ReduceError::Aggregation { ranks, .. } => assert_eq!(ranks, vec![1]),
            other => panic!("Wrong error: {other}"),
        }
    }

    #[test]
    fn test_last_rank_missing_yields_no_estimate() {
        let mut parts = partials(3, 300, SamplingPolicy::Inclusive);
        parts.pop();

        // Every observer gets the error, not a two-rank sum
        for observer in 0..3 {
            match reduce_sum(&parts, 3, 0, observer).unwrap_err() {
                ReduceError::Aggregation { ranks, .. } => assert_eq!(ranks, vec![2]),
                other => panic!("Wrong error: {other}"),
            }
        }
    }

    #[test]
    fn test_rank_outside_group_is_aggregation_error() {
        let mut parts = partials(3, 300, SamplingPolicy::Inclusive);
        parts.push(Contribution { rank: 3, value: 0.5 });
        match reduce_sum(&parts, 3, 0, 0).unwrap_err() {
            ReduceError::Aggregation { ranks, .. } => assert_eq!(ranks, vec![3]),
            other => panic!("Wrong error: {other}"),
        }
    }

    #[test]
    fn test_only_coordinator_sees_result() {
        let parts = partials(4, 4_000, SamplingPolicy::Inclusive);
        assert!(reduce_sum(&parts, 4, 2, 2).unwrap().is_some());
        for observer in [0, 1, 3] {
            assert_eq!(reduce_sum(&parts, 4, 2, observer).unwrap(), None);
        }
        assert!(reduce_sum(&parts, 4, 4, 4).unwrap_err().is_config());
        assert!(reduce_sum(&parts, 4, 2, 4).unwrap_err().is_config());
    }

    #[test]
    fn test_permutation_invariance() {
        let mut parts = partials(16, 160_000, SamplingPolicy::Inclusive);
        let reference = reduce_sum(&parts, 16, 0, 0).unwrap().unwrap();

        let mut rng = Xoshiro256PlusPlus::seed_from_u64(0x5eed);
        for _ in 0..20 {
            parts.shuffle(&mut rng);
            let total = reduce_sum(&parts, 16, 0, 0).unwrap().unwrap();
            assert!(((total - reference) / reference).abs() <= 1e-9);
        }
    }

    #[test]
    fn test_monotonic_convergence() {
        for policy in [SamplingPolicy::Inclusive, SamplingPolicy::Exclusive] {
            let num_workers = 4;
            let errors: Vec<f64> = [10i64, 100, 1_000, 10_000]
                .iter()
                .map(|m| (estimate(num_workers, m * num_workers as i64, policy) - PI).abs())
                .collect();
            for pair in errors.windows(2) {
                assert!(pair[1] < pair[0], "{policy}: errors not decreasing: {:?}", errors);
            }
        }
    }

    #[test]
    fn test_repeated_runs_bit_identical() {
        let first = estimate(8, 80_000, SamplingPolicy::Inclusive);
        for _ in 0..5 {
            assert_eq!(estimate(8, 80_000, SamplingPolicy::Inclusive).to_bits(), first.to_bits());
        }
    }

    #[test]
    fn test_accumulate_stops_when_asked() {
        let partition = Partition::new(0, 1, 10 * CANCEL_CHECK_INTERVAL as i64).unwrap();
        let mut checks = 0;
        let result = accumulate(&partition, SamplingPolicy::Exclusive, pi_integrand, || {
            checks += 1;
            checks > 2
        });
        assert_eq!(result, None);
        assert_eq!(checks, 3);

        let full = accumulate(&partition, SamplingPolicy::Exclusive, pi_integrand, || false);
        let plain = compute_partial_with(&partition, SamplingPolicy::Exclusive, pi_integrand);
        assert_eq!(full.map(f64::to_bits), Some(plain.to_bits()));
    }
}
