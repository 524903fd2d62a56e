//! Ordering verification
//!
//! Linear scan over a merged result confirming it is non-decreasing. The check
//! is diagnostic only: a failure is reported with the first offending position
//! and never corrected.

use serde::{Deserialize, Serialize};

/// Verification result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VerificationResult {
    /// Every element is >= its predecessor
    Success,
    /// Ordering is broken
    Failure {
        /// Index of the first element smaller than its predecessor
        index: usize,
        /// Value at `index - 1`
        previous: i32,
        /// Value at `index`
        actual: i32,
    },
}

impl VerificationResult {
    pub fn is_success(&self) -> bool {
        matches!(self, VerificationResult::Success)
    }
}

/// Verify that `values` is sorted in non-decreasing order
///
/// # Example
///
/// ```
/// use distsort::util::verification::{verify_sorted, VerificationResult};
///
/// assert_eq!(verify_sorted(&[1, 2, 2, 5]), VerificationResult::Success);
/// assert!(!verify_sorted(&[1, 3, 2]).is_success());
/// ```
pub fn verify_sorted(values: &[i32]) -> VerificationResult {
    for (i, pair) in values.windows(2).enumerate() {
        if pair[1] < pair[0] {
            return VerificationResult::Failure {
                index: i + 1,
                previous: pair[0],
                actual: pair[1],
            };
        }
    }
    VerificationResult::Success
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_and_single_pass_trivially() {
        assert_eq!(verify_sorted(&[]), VerificationResult::Success);
        assert_eq!(verify_sorted(&[-3]), VerificationResult::Success);
    }

    #[test]
    fn test_equal_neighbours_allowed() {
        assert_eq!(verify_sorted(&[0, 0, 0, 1, 1]), VerificationResult::Success);
    }

    #[test]
    fn test_reports_first_violation() {
        match verify_sorted(&[1, 4, 2, 0]) {
            VerificationResult::Failure { index, previous, actual } => {
                assert_eq!(index, 2);
                assert_eq!(previous, 4);
                assert_eq!(actual, 2);
            }
            _ => panic!("Expected failure"),
        }
    }

    #[test]
    fn test_serializes_with_status_tag() {
        let json = serde_json::to_string(&VerificationResult::Success).unwrap();
        assert_eq!(json, r#"{"status":"success"}"#);
    }
}
