//! Error types
//!
//! Library operations return [`ReduceError`] so callers can match on the
//! failure class. The binary wraps these in `anyhow` with added context.

use thiserror::Error;

/// Failure classes of a reduction run and its boundary collaborators
#[derive(Debug, Error)]
pub enum ReduceError {
    /// Invalid worker count, total size, rank or coordinator.
    /// Raised before any computation starts.
    #[error("configuration error: {0}")]
    Config(String),

    /// One or more workers failed to contribute a usable partial sum.
    /// The whole reduction is abandoned.
    #[error("aggregation failed: {reason}")]
    Aggregation {
        reason: String,
        /// Ranks that failed or never reported, in ascending order
        ranks: Vec<usize>,
    },

    /// Reading or writing a vector stream failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed or short vector input
    #[error("parse error at token {position}: {message}")]
    Parse { position: usize, message: String },

    /// Operands of a vector kernel disagree in length
    #[error("shape mismatch: left has {left} elements, right has {right}")]
    Shape { left: usize, right: usize },

    /// A host value could not be converted to native arguments
    #[error("marshal error: {0}")]
    Marshal(String),
}

impl ReduceError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub(crate) fn aggregation(reason: impl Into<String>, mut ranks: Vec<usize>) -> Self {
        ranks.sort_unstable();
        ranks.dedup();
        Self::Aggregation {
            reason: reason.into(),
            ranks,
        }
    }

    /// Whether this error aborted the run before any partial was computed
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Whether this error abandoned the collective step
    pub fn is_aggregation(&self) -> bool {
        matches!(self, Self::Aggregation { .. })
    }
}
