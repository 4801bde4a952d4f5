//! Vector collaborators
//!
//! Boundary-only helpers that sit beside the reduction core: text and binary
//! vector I/O plus a sequential dot product. None of this participates in a
//! reduction run.
//!
//! # Example
//!
//! ```
//! use pireduce::vector::{dot, read_vector_pair};
//! use std::io::Cursor;
//!
//! let (a, b) = read_vector_pair(Cursor::new("2\n1 2\n3 4\n"))?;
//! assert_eq!(dot(&a, &b)?, 11.0);
//! # Ok::<(), pireduce::ReduceError>(())
//! ```

pub mod dot;
pub mod io;

pub use dot::{dot, is_near_zero};
pub use io::{read_scalar, read_vector, read_vector_pair, write_scalar, write_vector};
