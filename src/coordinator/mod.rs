//! Coordinator module
//!
//! Drives a reduction run through both phases:
//!
//! 1. **Phase 1**: spawn one worker per rank; each computes its partial sum
//!    independently and sends a single report into a shared fan-in channel.
//! 2. **Phase 2**: the coordinator drains the channel into a
//!    [`PartialAggregator`] until every rank has reported, then reduces to the
//!    coordinator rank with [`reduce_sum`].
//!
//! Any failed, panicked, non-finite or late worker abandons the run: the stop
//! flag is raised so the remaining workers exit early, and the caller gets
//! `ReduceError::Aggregation`. No partial estimate is ever returned.
//!
//! # Example
//!
//! ```
//! use pireduce::config::RunConfig;
//! use pireduce::coordinator::ParallelReducer;
//!
//! let config = RunConfig {
//!     total_size: 100_000,
//!     workers: 4,
//!     ..Default::default()
//! };
//! let reduction = ParallelReducer::new(config)?.run()?;
//!
//! assert!((reduction.estimate - std::f64::consts::PI).abs() < 1e-3);
//! assert_eq!(reduction.view(0), Some(reduction.estimate));
//! assert_eq!(reduction.view(1), None);
//! # Ok::<(), pireduce::ReduceError>(())
//! ```

pub mod aggregator;

use crate::config::{Backend, RunConfig};
use crate::error::ReduceError;
use crate::reducer::{
    pi_integrand_shared, reduce_sum, Contribution, Integrand, Partition, SamplingPolicy,
};
use crate::worker::{Worker, WorkerReport};
use crate::Result;
use aggregator::PartialAggregator;
use crossbeam::channel::{self, Receiver, RecvTimeoutError};
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Outcome of a completed reduction run
#[derive(Debug, Clone)]
pub struct Reduction {
    pub coordinator_rank: usize,
    pub num_workers: usize,
    pub total_size: u64,
    pub sampling: SamplingPolicy,
    pub backend: Backend,
    /// The reduced scalar held by the coordinator
    pub estimate: f64,
    /// Per-rank partial sums, in rank order
    pub contributions: Vec<Contribution>,
    /// Samples evaluated by each worker under `sampling`
    pub samples_per_worker: u64,
    /// Trailing samples no worker owned
    pub dropped_remainder: u64,
    pub elapsed: Duration,
}

impl Reduction {
    /// The result as seen from `rank`: the estimate on the coordinator, `None` elsewhere
    pub fn view(&self, rank: usize) -> Option<f64> {
        (rank == self.coordinator_rank).then_some(self.estimate)
    }
}

/// Partition, fan out, fan in, reduce
pub struct ParallelReducer {
    config: RunConfig,
    integrand: Integrand,
}

impl ParallelReducer {
    /// Reducer for the reference integrand `4/(1+x²)`
    pub fn new(config: RunConfig) -> Result<Self> {
        Self::with_integrand(config, pi_integrand_shared())
    }

    /// Reducer for an arbitrary per-sample function
    ///
    /// # Errors
    ///
    /// `ReduceError::Config` for a zero worker count, a non-positive or too
    /// small total size, a coordinator outside the group, or a zero timeout.
    pub fn with_integrand(config: RunConfig, integrand: Integrand) -> Result<Self> {
        // Validates worker count and total size
        Partition::new(0, config.workers, config.total_size)?;

        if config.coordinator >= config.workers {
            return Err(ReduceError::config(format!(
                "coordinator rank {} is outside the worker group [0, {})",
                config.coordinator, config.workers
            )));
        }
        if config.timeout_ms == 0 {
            return Err(ReduceError::config("timeout must be greater than zero"));
        }

        Ok(Self { config, integrand })
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Execute both phases and return the coordinator's result
    pub fn run(&self) -> Result<Reduction> {
        let started = Instant::now();
        let partitions = Partition::all(self.config.workers, self.config.total_size)?;
        let first = partitions[0];

        if first.dropped_remainder() > 0 {
            tracing::warn!(
                total_size = first.total_size(),
                workers = first.num_workers(),
                remainder = first.dropped_remainder(),
                "total_size is not a multiple of workers; trailing samples are not evaluated"
            );
        }
        tracing::info!(
            workers = self.config.workers,
            total_size = self.config.total_size,
            sampling = %self.config.sampling,
            backend = %self.config.backend,
            "starting reduction"
        );

        let contributions = match self.config.backend {
            Backend::Threads => self.run_threads(partitions)?,
            Backend::Rayon => self.run_rayon(partitions)?,
        };

        let coordinator = self.config.coordinator;
        let estimate = reduce_sum(&contributions, self.config.workers, coordinator, coordinator)?
            .ok_or_else(|| {
                ReduceError::aggregation("coordinator received no value", vec![coordinator])
            })?;

        let elapsed = started.elapsed();
        tracing::info!(estimate, elapsed_ms = elapsed.as_millis() as u64, "reduction complete");

        Ok(Reduction {
            coordinator_rank: self.config.coordinator,
            num_workers: self.config.workers,
            total_size: first.total_size(),
            sampling: self.config.sampling,
            backend: self.config.backend,
            estimate,
            contributions,
            samples_per_worker: first.sample_count(self.config.sampling),
            dropped_remainder: first.dropped_remainder(),
            elapsed,
        })
    }

    /// One OS thread per rank, fan-in over a bounded channel
    ///
    /// When the run is abandoned (failure, timeout, spawn error) the stop flag
    /// is raised and the remaining threads are detached, not joined. Each exits
    /// at its next cancellation check, at most [`CANCEL_CHECK_INTERVAL`]
    /// samples later.
    ///
    /// [`CANCEL_CHECK_INTERVAL`]: crate::reducer::CANCEL_CHECK_INTERVAL
    fn run_threads(&self, partitions: Vec<Partition>) -> Result<Vec<Contribution>> {
        let num_workers = partitions.len();
        let stop_flag = Arc::new(AtomicBool::new(false));
        let (tx, rx) = channel::bounded(num_workers);

        let mut handles = Vec::with_capacity(num_workers);
        for partition in partitions {
            let rank = partition.rank();
            let worker = Worker::new(
                partition,
                self.config.sampling,
                self.integrand.clone(),
                stop_flag.clone(),
            );
            match worker.spawn(tx.clone()) {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    stop_flag.store(true, Ordering::Relaxed);
                    return Err(ReduceError::aggregation(
                        format!("failed to spawn worker {}: {}", rank, e),
                        vec![rank],
                    ));
                }
            }
        }
        // Only workers hold senders now, so a disconnect means they all exited
        drop(tx);

        let deadline = Instant::now() + self.config.timeout();
        let mut aggregator = PartialAggregator::new(num_workers);
        if let Err(e) = collect_until(&rx, &mut aggregator, deadline, self.config.timeout()) {
            stop_flag.store(true, Ordering::Relaxed);
            tracing::warn!(error = %e, "reduction abandoned, cancelling remaining workers");
            return Err(e);
        }

        // Every worker has reported, so each thread is past its last send
        for (rank, handle) in handles.into_iter().enumerate() {
            handle.join().map_err(|_| {
                ReduceError::aggregation(format!("worker {} thread panicked", rank), vec![rank])
            })?;
        }

        Ok(aggregator.contributions())
    }

    /// Rayon pool sized to the group; every task is joined, so no wait timeout applies
    fn run_rayon(&self, partitions: Vec<Partition>) -> Result<Vec<Contribution>> {
        let num_workers = partitions.len();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_workers)
            .thread_name(|i| format!("pireduce-rayon-{}", i))
            .build()
            .map_err(|e| {
                ReduceError::aggregation(format!("failed to build thread pool: {}", e), vec![])
            })?;

        let stop_flag = Arc::new(AtomicBool::new(false));
        let sampling = self.config.sampling;
        let integrand = &self.integrand;

        let mut reports: Vec<WorkerReport> = pool.install(|| {
            partitions
                .into_par_iter()
                .map(|partition| {
                    let worker =
                        Worker::new(partition, sampling, integrand.clone(), stop_flag.clone());
                    let report = worker.run();
                    let usable =
                        matches!(report, WorkerReport::Partial(ref c) if c.value.is_finite());
                    if !usable {
                        stop_flag.store(true, Ordering::Relaxed);
                    }
                    report
                })
                .collect()
        });

        // Surface the root cause before the cancellations it triggered
        reports.sort_by_key(|report| matches!(report, WorkerReport::Cancelled { .. }));

        let mut aggregator = PartialAggregator::new(num_workers);
        for report in reports {
            aggregator.accept(report)?;
        }
        Ok(aggregator.contributions())
    }
}

/// Drain reports until every rank has contributed, the deadline passes, or all senders are gone
fn collect_until(
    rx: &Receiver<WorkerReport>,
    aggregator: &mut PartialAggregator,
    deadline: Instant,
    timeout: Duration,
) -> Result<()> {
    while !aggregator.is_complete() {
        match rx.recv_deadline(deadline) {
            Ok(report) => {
                tracing::debug!(rank = report.rank(), "received report");
                aggregator.accept(report)?;
            }
            Err(RecvTimeoutError::Timeout) => {
                let missing = aggregator.missing();
                return Err(ReduceError::aggregation(
                    format!("timed out after {:?} waiting for ranks {:?}", timeout, missing),
                    missing,
                ));
            }
            Err(RecvTimeoutError::Disconnected) => {
                let missing = aggregator.missing();
                return Err(ReduceError::aggregation(
                    format!("ranks {:?} exited without reporting", missing),
                    missing,
                ));
            }
        }
    }
    Ok(())
}

/// Estimate π with `total_size` steps across one worker per logical CPU, reduced to rank 0
///
/// # Errors
///
/// `ReduceError::Config` if `total_size` is not positive or is smaller than
/// the worker count; `ReduceError::Aggregation` if any worker fails.
pub fn run(total_size: i64) -> Result<f64> {
    let config = RunConfig {
        total_size,
        ..RunConfig::default()
    };
    Ok(ParallelReducer::new(config)?.run()?.estimate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reducer::{compute_partial_with, pi_integrand, CANCEL_CHECK_INTERVAL};
    use std::f64::consts::PI;

    fn config(total_size: i64, workers: usize, backend: Backend) -> RunConfig {
        RunConfig {
            total_size,
            workers,
            coordinator: 0,
            sampling: SamplingPolicy::Inclusive,
            backend,
            timeout_ms: 10_000,
        }
    }

    #[test]
    fn test_threads_match_sequential_reference() {
        let reduction = ParallelReducer::new(config(80_000, 8, Backend::Threads))
            .unwrap()
            .run()
            .unwrap();

        let expected = Partition::all(8, 80_000)
            .unwrap()
            .iter()
            .map(|p| compute_partial_with(p, SamplingPolicy::Inclusive, pi_integrand))
            .fold(0.0, |acc, v| acc + v);
        assert_eq!(reduction.estimate.to_bits(), expected.to_bits());
        assert_eq!(reduction.contributions.len(), 8);
        assert_eq!(reduction.samples_per_worker, 10_001);
        assert_eq!(reduction.dropped_remainder, 0);
    }

    #[test]
    fn test_backends_agree_bit_for_bit() {
        let threads = ParallelReducer::new(config(60_000, 6, Backend::Threads))
            .unwrap()
            .run()
            .unwrap();
        let rayon = ParallelReducer::new(config(60_000, 6, Backend::Rayon))
            .unwrap()
            .run()
            .unwrap();
        assert_eq!(threads.estimate.to_bits(), rayon.estimate.to_bits());
    }

    #[test]
    fn test_coarse_exclusive_estimate() {
        let mut cfg = config(8, 2, Backend::Threads);
        cfg.sampling = SamplingPolicy::Exclusive;
        let reduction = ParallelReducer::new(cfg).unwrap().run().unwrap();
        assert!((reduction.estimate - PI).abs() < 1e-2);
        assert_eq!(reduction.samples_per_worker, 4);
    }

    #[test]
    fn test_non_coordinator_view_is_none() {
        let mut cfg = config(4_000, 4, Backend::Threads);
        cfg.coordinator = 3;
        let reduction = ParallelReducer::new(cfg).unwrap().run().unwrap();
        assert_eq!(reduction.view(3), Some(reduction.estimate));
        for rank in 0..3 {
            assert_eq!(reduction.view(rank), None);
        }
    }

    #[test]
    fn test_config_errors_before_any_work() {
        assert!(ParallelReducer::new(config(8, 0, Backend::Threads)).err().unwrap().is_config());
        assert!(ParallelReducer::new(config(0, 2, Backend::Threads)).err().unwrap().is_config());

        let mut cfg = config(8, 2, Backend::Threads);
        cfg.coordinator = 2;
        assert!(ParallelReducer::new(cfg).err().unwrap().is_config());

        assert!(run(-1).unwrap_err().is_config());
    }

    #[test]
    fn test_nan_worker_aborts_reduction() {
        for backend in [Backend::Threads, Backend::Rayon] {
            // Only rank 1 of 2 samples x > 0.6
            let integrand: Integrand =
                Arc::new(|x: f64| if x > 0.6 { f64::NAN } else { pi_integrand(x) });
            let reducer =
                ParallelReducer::with_integrand(config(1_000, 2, backend), integrand).unwrap();
            match reducer.run().unwrap_err() {
                ReduceError::Aggregation { ranks, .. } => assert_eq!(ranks, vec![1], "{backend}"),
                other => panic!("Wrong error: {other}"),
            }
        }
    }

    #[test]
    fn test_panicking_worker_aborts_reduction() {
        for backend in [Backend::Threads, Backend::Rayon] {
            let integrand: Integrand = Arc::new(|x: f64| {
                if x > 0.75 {
                    panic!("sample out of range");
                }
                pi_integrand(x)
            });
            let reducer =
                ParallelReducer::with_integrand(config(4_000, 4, backend), integrand).unwrap();
            let err = reducer.run().unwrap_err();
            assert!(err.is_aggregation(), "{backend}: {err}");
            assert!(err.to_string().contains("sample out of range"));
        }
    }

    #[test]
    fn test_hung_worker_times_out() {
        let integrand: Integrand = Arc::new(|x: f64| {
            if x > 0.9 {
                std::thread::sleep(Duration::from_millis(50));
            }
            pi_integrand(x)
        });
        let mut cfg = config(1_000, 2, Backend::Threads);
        cfg.timeout_ms = 200;
        let reducer = ParallelReducer::with_integrand(cfg, integrand).unwrap();

        let started = Instant::now();
        match reducer.run().unwrap_err() {
            ReduceError::Aggregation { ranks, reason } => {
                assert_eq!(ranks, vec![1]);
                assert!(reason.contains("timed out"));
            }
            other => panic!("Wrong error: {other}"),
        }
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_abandoned_worker_stops_evaluating() {
        use std::sync::atomic::AtomicUsize;

        // Rank 1 of 2 owns samples 501..=1001; 101 of them have x > 0.9
        let slow_samples = Arc::new(AtomicUsize::new(0));
        let counter = slow_samples.clone();
        let integrand: Integrand = Arc::new(move |x: f64| {
            if x > 0.9 {
                counter.fetch_add(1, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(5));
            }
            pi_integrand(x)
        });
        let mut cfg = config(1_000, 2, Backend::Threads);
        cfg.timeout_ms = 100;
        let reducer = ParallelReducer::with_integrand(cfg, integrand).unwrap();
        assert!(reducer.run().unwrap_err().is_aggregation());

        // Long enough for the detached worker to reach its next cancellation check
        let budget = Duration::from_millis(5 * CANCEL_CHECK_INTERVAL + 500);
        std::thread::sleep(budget);
        let settled = slow_samples.load(Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(200));
        assert_eq!(slow_samples.load(Ordering::SeqCst), settled);
        assert!(settled < 101, "worker finished its partition: {settled} slow samples");
    }

    #[test]
    fn test_repeated_runs_identical() {
        let reducer = ParallelReducer::new(config(90_000, 9, Backend::Threads)).unwrap();
        let first = reducer.run().unwrap().estimate;
        for _ in 0..3 {
            assert_eq!(reducer.run().unwrap().estimate.to_bits(), first.to_bits());
        }
    }
}
