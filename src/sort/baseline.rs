//! Single-process reference sort
//!
//! Times the standard library sort over a copy of the input so distributed
//! runs can be compared against sorting everything in one process.

use crate::util::verification::{verify_sorted, VerificationResult};
use std::time::{Duration, Instant};

/// Outcome of a baseline sort
#[derive(Debug, Clone)]
pub struct BaselineResult {
    /// Number of elements sorted
    pub len: usize,

    /// Wall-clock time spent sorting
    pub elapsed: Duration,

    /// Ordering check over the sorted copy
    pub verification: VerificationResult,
}

/// Sort a copy of `input` and time it
pub fn run_baseline(input: &[i32]) -> BaselineResult {
    let mut copy = input.to_vec();

    let start = Instant::now();
    copy.sort_unstable();
    let elapsed = start.elapsed();

    BaselineResult {
        len: copy.len(),
        elapsed,
        verification: verify_sorted(&copy),
    }
}
