//! Result output
//!
//! - `text`: the coordinator's result line and optional per-rank partials
//! - `json`: machine-readable run report

pub mod json;
pub mod text;
