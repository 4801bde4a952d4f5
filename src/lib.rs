//! pireduce - parallel reduce-to-root numerical integration
//!
//! Estimates π by midpoint integration of `4/(1+x²)` over `[0, 1)`, split
//! across a fixed group of workers whose partial sums are combined at a single
//! coordinator rank.
//!
//! # Architecture
//!
//! - **Partitioning**: contiguous, disjoint index slices per rank (`reducer::partition`)
//! - **Phase 1**: independent per-rank partial sums (`reducer`, `worker`)
//! - **Phase 2**: channel fan-in and reduce-to-root with barrier semantics (`coordinator`)
//! - **Boundary collaborators**: vector I/O, dot product, host-value marshaling
//!   (`vector`, `marshal`)

pub mod config;
pub mod coordinator;
pub mod error;
pub mod marshal;
pub mod output;
pub mod reducer;
pub mod vector;
pub mod worker;

// Re-export commonly used types
pub use config::Config;
pub use coordinator::{run, ParallelReducer, Reduction};
pub use error::ReduceError;
pub use reducer::{compute_partial, reduce_sum, Contribution, Partition, SamplingPolicy};

/// Result type used throughout pireduce
pub type Result<T> = std::result::Result<T, ReduceError>;
