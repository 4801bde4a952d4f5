//! Domain decomposition
//!
//! Splits the 1-based sample index space `[1, total_size]` into `P` contiguous
//! slices of `nsize = total_size / P` samples each. Rank `r` owns
//! `[r*nsize + 1, (r+1)*nsize + 1)`.
//!
//! Integer division drops up to `P-1` trailing samples when `total_size` is not
//! a multiple of `P`. The remainder is reported by [`Partition::dropped_remainder`]
//! and is never handed to any worker.

use crate::error::ReduceError;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::ops::{Range, RangeInclusive};

/// Which sample indices a worker evaluates relative to its owned slice
///
/// The reference tool loops `for i in start..=end`, so every worker also
/// evaluates the first index owned by its right neighbour. `Inclusive`
/// reproduces that sample set bit for bit. `Exclusive` evaluates exactly the
/// owned slice, which makes the per-worker sums add up to the plain midpoint
/// rule over `[1, P*nsize]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SamplingPolicy {
    /// Evaluate `[start, end]`, one shared boundary sample per worker
    #[default]
    Inclusive,
    /// Evaluate `[start, end)`, the owned slice only
    Exclusive,
}

impl std::fmt::Display for SamplingPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Inclusive => write!(f, "inclusive"),
            Self::Exclusive => write!(f, "exclusive"),
        }
    }
}

/// One worker's share of the integration domain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Partition {
    rank: usize,
    num_workers: usize,
    nsize: u64,
    total_size: u64,
}

impl Partition {
    /// Build the partition for `rank` out of `num_workers`
    ///
    /// # Errors
    ///
    /// `ReduceError::Config` when `num_workers` is zero, `rank` is outside
    /// `[0, num_workers)`, `total_size` is not positive, or `total_size` is
    /// smaller than `num_workers` (some worker would own nothing).
    pub fn new(rank: usize, num_workers: usize, total_size: i64) -> Result<Self> {
        if num_workers == 0 {
            return Err(ReduceError::config("num_workers must be at least 1"));
        }
        if rank >= num_workers {
            return Err(ReduceError::config(format!(
                "rank {} is outside the worker group [0, {})",
                rank, num_workers
            )));
        }
        if total_size <= 0 {
            return Err(ReduceError::config(format!(
                "total_size must be positive, got {}",
                total_size
            )));
        }

        let total_size = total_size as u64;
        if total_size < num_workers as u64 {
            return Err(ReduceError::config(format!(
                "total_size ({}) must be at least num_workers ({})",
                total_size, num_workers
            )));
        }

        Ok(Self {
            rank,
            num_workers,
            nsize: total_size / num_workers as u64,
            total_size,
        })
    }

    /// Partitions for every rank of the group, in rank order
    pub fn all(num_workers: usize, total_size: i64) -> Result<Vec<Self>> {
        if num_workers == 0 {
            return Err(ReduceError::config("num_workers must be at least 1"));
        }
        (0..num_workers)
            .map(|rank| Self::new(rank, num_workers, total_size))
            .collect()
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn num_workers(&self) -> usize {
        self.num_workers
    }

    /// Samples owned per worker (`total_size / num_workers`)
    pub fn nsize(&self) -> u64 {
        self.nsize
    }

    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    /// Subinterval width `h = 1 / total_size`
    pub fn step_width(&self) -> f64 {
        1.0 / self.total_size as f64
    }

    /// First owned sample index (1-based)
    pub fn start(&self) -> u64 {
        self.nsize * self.rank as u64 + 1
    }

    /// First sample index past the owned slice
    pub fn end(&self) -> u64 {
        self.start() + self.nsize
    }

    /// Sample indices this worker owns
    pub fn owned(&self) -> Range<u64> {
        self.start()..self.end()
    }

    /// Sample indices this worker evaluates under `policy`, in increasing order
    pub fn samples(&self, policy: SamplingPolicy) -> RangeInclusive<u64> {
        match policy {
            SamplingPolicy::Inclusive => self.start()..=self.end(),
            // start >= 1, so end - 1 never underflows
            SamplingPolicy::Exclusive => self.start()..=self.end() - 1,
        }
    }

    /// Number of evaluated samples under `policy`
    pub fn sample_count(&self, policy: SamplingPolicy) -> u64 {
        match policy {
            SamplingPolicy::Inclusive => self.nsize + 1,
            SamplingPolicy::Exclusive => self.nsize,
        }
    }

    /// Trailing samples no worker owns (`total_size % num_workers`)
    pub fn dropped_remainder(&self) -> u64 {
        self.total_size % self.num_workers as u64
    }
}
