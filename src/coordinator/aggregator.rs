//! Fan-in aggregation
//!
//! The coordinator feeds every [`WorkerReport`] it receives into a
//! [`PartialAggregator`]. The aggregator keeps one slot per rank and refuses
//! anything that would make the final sum wrong: failed workers, non-finite
//! partials, duplicate or unknown ranks. Once every slot is filled the
//! collected contributions go to [`reduce_sum`](crate::reducer::reduce_sum).
//!
//! # Example
//!
//! ```
//! use pireduce::coordinator::aggregator::PartialAggregator;
//! use pireduce::reducer::Contribution;
//! use pireduce::worker::WorkerReport;
//!
//! let mut aggregator = PartialAggregator::new(2);
//! aggregator.accept(WorkerReport::Partial(Contribution { rank: 1, value: 1.5 }))?;
//! assert!(!aggregator.is_complete());
//! assert_eq!(aggregator.missing(), vec![0]);
//!
//! aggregator.accept(WorkerReport::Partial(Contribution { rank: 0, value: 1.0 }))?;
//! assert!(aggregator.is_complete());
//! # Ok::<(), pireduce::ReduceError>(())
//! ```

use crate::error::ReduceError;
use crate::reducer::Contribution;
use crate::worker::WorkerReport;
use crate::Result;

/// Per-rank collection of partial sums
#[derive(Debug)]
pub struct PartialAggregator {
    /// Partial sum per rank, `None` until reported
    slots: Vec<Option<f64>>,

    /// Number of filled slots
    received: usize,
}

impl PartialAggregator {
    pub fn new(num_workers: usize) -> Self {
        Self {
            slots: vec![None; num_workers],
            received: 0,
        }
    }

    pub fn num_workers(&self) -> usize {
        self.slots.len()
    }

    /// Record one worker's report
    ///
    /// # Errors
    ///
    /// `ReduceError::Aggregation` if the worker failed or was cancelled, the
    /// partial is NaN or infinite, or the rank is unknown or already reported.
    /// The aggregator is left unchanged on error.
    pub fn accept(&mut self, report: WorkerReport) -> Result<()> {
        let contribution = match report {
            WorkerReport::Partial(c) => c,
            WorkerReport::Failed { rank, reason } => {
                return Err(ReduceError::aggregation(
                    format!("rank {} failed: {}", rank, reason),
                    vec![rank],
                ));
            }
            WorkerReport::Cancelled { rank } => {
                return Err(ReduceError::aggregation(
                    format!("rank {} was cancelled before contributing", rank),
                    vec![rank],
                ));
            }
        };

        contribution.check_finite()?;

        let num_workers = self.num_workers();
        match self.slots.get_mut(contribution.rank) {
            None => Err(ReduceError::aggregation(
                format!(
                    "rank {} is outside the worker group [0, {})",
                    contribution.rank, num_workers
                ),
                vec![contribution.rank],
            )),
            Some(Some(_)) => Err(ReduceError::aggregation(
                format!("rank {} contributed more than once", contribution.rank),
                vec![contribution.rank],
            )),
            Some(slot) => {
                *slot = Some(contribution.value);
                self.received += 1;
                Ok(())
            }
        }
    }

    /// Whether every rank has contributed
    pub fn is_complete(&self) -> bool {
        self.received == self.slots.len()
    }

    /// Ranks that have not contributed yet, ascending
    pub fn missing(&self) -> Vec<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_none())
            .map(|(rank, _)| rank)
            .collect()
    }

    /// Contributions received so far, in rank order
    pub fn contributions(&self) -> Vec<Contribution> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(rank, slot)| slot.map(|value| Contribution { rank, value }))
            .collect()
    }
}
