//! Metrics and observability
//!
//! Atomic counters for the hot dispatch paths.

mod counters;

pub use counters::*;
