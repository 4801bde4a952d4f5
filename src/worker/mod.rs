//! Worker execution contexts
//!
//! A [`Worker`] owns one [`Partition`] for the duration of a run. It computes
//! its private partial sum and reports exactly once through a fan-in channel
//! shared with every other worker of the group.
//!
//! # Lifecycle
//!
//! 1. **Creation**: `Worker::new()` binds rank, partition, policy and integrand
//! 2. **Execution**: `run()` accumulates, polling the shared stop flag
//! 3. **Report**: `spawn()` sends one [`WorkerReport`] and exits
//!
//! Workers do not share mutable state. The stop flag is written only by the
//! coordinator and read by workers.

use crate::reducer::{accumulate, Contribution, Integrand, Partition, SamplingPolicy};
use crossbeam::channel::Sender;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

/// The single message a worker sends to the coordinator
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerReport {
    /// Partial sum computed over the whole partition
    Partial(Contribution),
    /// The worker aborted before producing a partial
    Failed { rank: usize, reason: String },
    /// The worker saw the stop flag and gave up
    Cancelled { rank: usize },
}

impl WorkerReport {
    pub fn rank(&self) -> usize {
        match self {
            Self::Partial(c) => c.rank,
            Self::Failed { rank, .. } | Self::Cancelled { rank } => *rank,
        }
    }
}

/// One rank of a reduction run
pub struct Worker {
    partition: Partition,
    policy: SamplingPolicy,
    integrand: Integrand,
    stop_flag: Arc<AtomicBool>,
}

impl Worker {
    pub fn new(
        partition: Partition,
        policy: SamplingPolicy,
        integrand: Integrand,
        stop_flag: Arc<AtomicBool>,
    ) -> Self {
        Self {
            partition,
            policy,
            integrand,
            stop_flag,
        }
    }

    pub fn rank(&self) -> usize {
        self.partition.rank()
    }

    pub fn partition(&self) -> &Partition {
        &self.partition
    }

    /// Accumulate the partition and describe the outcome
    ///
    /// A panic inside the integrand is caught and turned into
    /// [`WorkerReport::Failed`], so the coordinator learns about it right away
    /// instead of waiting for the channel to disconnect.
    pub fn run(&self) -> WorkerReport {
        let rank = self.rank();
        let started = Instant::now();
        tracing::debug!(
            rank,
            start = self.partition.start(),
            end = self.partition.end(),
            policy = %self.policy,
            "worker starting"
        );

        let stop_flag = &self.stop_flag;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            accumulate(&self.partition, self.policy, &*self.integrand, || {
                stop_flag.load(Ordering::Relaxed)
            })
        }));

        match outcome {
            Ok(Some(value)) => {
                tracing::debug!(
                    rank,
                    value,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "worker finished"
                );
                WorkerReport::Partial(Contribution { rank, value })
            }
            Ok(None) => {
                tracing::debug!(rank, "worker cancelled");
                WorkerReport::Cancelled { rank }
            }
            Err(payload) => {
                let reason = panic_message(payload.as_ref());
                tracing::warn!(rank, %reason, "worker panicked");
                WorkerReport::Failed { rank, reason }
            }
        }
    }

    /// Run on a dedicated OS thread and send the report into `tx`
    pub fn spawn(self, tx: Sender<WorkerReport>) -> std::io::Result<JoinHandle<()>> {
        std::thread::Builder::new()
            .name(format!("pireduce-worker-{}", self.rank()))
            .spawn(move || {
                let report = self.run();
                // The coordinator may already have given up and dropped the receiver
                if tx.send(report).is_err() {
                    tracing::debug!(rank = self.rank(), "coordinator gone, report discarded");
                }
            })
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("worker panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("worker panicked: {}", s)
    } else {
        "worker panicked".to_string()
    }
}
