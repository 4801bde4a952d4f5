//! Dot product kernel

use crate::error::ReduceError;
use crate::Result;

/// Magnitude below which a dot product is reported as effectively zero
pub const NEAR_ZERO: f64 = 1.0e-6;

/// Sequential dot product, summed in index order
///
/// # Errors
///
/// `ReduceError::Shape` when `a` and `b` differ in length.
pub fn dot(a: &[f64], b: &[f64]) -> Result<f64> {
    if a.len() != b.len() {
        return Err(ReduceError::Shape {
            left: a.len(),
            right: b.len(),
        });
    }
    Ok(a.iter().zip(b).fold(0.0, |acc, (x, y)| acc + x * y))
}

/// Whether a result is too small to print meaningfully
pub fn is_near_zero(value: f64) -> bool {
    value.abs() < NEAR_ZERO
}
