//! Host-value marshaling
//!
//! Models the boundary between a dynamically typed host language and a native
//! routine. Host values arrive as numeric vectors (a host "scalar" is a vector
//! of length one); [`marshal_in`] checks and unwraps them, the native routine
//! runs on plain `f64`s, and [`marshal_out`] wraps the result back up.
//!
//! ```
//! use pireduce::marshal::{call_native, pair_sum, HostValue};
//!
//! let out = call_native(&[HostValue::scalar(1.5), HostValue::scalar(2.0)], pair_sum)?;
//! assert_eq!(out, HostValue::Numeric(vec![1.5, 2.0, 3.5]));
//! # Ok::<(), pireduce::ReduceError>(())
//! ```

use crate::error::ReduceError;
use crate::Result;
use serde::{Deserialize, Serialize};

/// A value as the host language sees it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HostValue {
    Numeric(Vec<f64>),
    Text(String),
    Null,
}

impl HostValue {
    pub fn scalar(value: f64) -> Self {
        Self::Numeric(vec![value])
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Numeric(_) => "numeric",
            Self::Text(_) => "text",
            Self::Null => "null",
        }
    }
}

/// Arguments unwrapped for a native routine
#[derive(Debug, Clone, PartialEq)]
pub struct NativeArgs(pub Vec<f64>);

/// Values produced by a native routine
#[derive(Debug, Clone, PartialEq)]
pub struct NativeResult(pub Vec<f64>);

/// Convert host arguments to native scalars
///
/// Every argument must be a numeric value of length exactly one. Longer
/// vectors are rejected rather than truncated to their first element.
pub fn marshal_in(args: &[HostValue]) -> Result<NativeArgs> {
    args.iter()
        .enumerate()
        .map(|(i, arg)| match arg {
            HostValue::Numeric(values) if values.len() == 1 => Ok(values[0]),
            HostValue::Numeric(values) => Err(ReduceError::Marshal(format!(
                "argument {} must be a numeric scalar, got a vector of length {}",
                i,
                values.len()
            ))),
            other => Err(ReduceError::Marshal(format!(
                "argument {} must be numeric, got {}",
                i,
                other.kind()
            ))),
        })
        .collect::<Result<Vec<_>>>()
        .map(NativeArgs)
}

/// Wrap native results as a host numeric vector
pub fn marshal_out(result: NativeResult) -> HostValue {
    HostValue::Numeric(result.0)
}

/// Sample native routine: `[a, b, a + b]`
pub fn pair_sum(args: &NativeArgs) -> Result<NativeResult> {
    match args.0.as_slice() {
        [a, b] => Ok(NativeResult(vec![*a, *b, a + b])),
        other => Err(ReduceError::Marshal(format!(
            "pair_sum takes 2 arguments, got {}",
            other.len()
        ))),
    }
}

/// Marshal in, call `native`, marshal out
pub fn call_native<F>(args: &[HostValue], native: F) -> Result<HostValue>
where
    F: FnOnce(&NativeArgs) -> Result<NativeResult>,
{
    let native_args = marshal_in(args)?;
    tracing::debug!(args = ?native_args.0, "calling native routine");
    native(&native_args).map(marshal_out)
}
