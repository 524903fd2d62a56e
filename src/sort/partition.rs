//! Partition planning
//!
//! Splits an input sequence into one contiguous partition per worker.
//! Every partition except the last covers `floor(len / workers)` elements;
//! the last partition absorbs the remainder.
//!
//! # Example
//!
//! ```
//! use distsort::sort::partition::plan_partitions;
//!
//! let parts = plan_partitions(&[5, 3, 1, 4, 2], 2);
//! assert_eq!(parts, vec![vec![5, 3], vec![1, 4, 2]]);
//! ```

use std::ops::Range;

/// Compute the half-open index ranges for `workers` partitions of `len` elements
///
/// Ranges are contiguous, non-overlapping, ordered and together cover `0..len`.
/// When `len < workers` the leading ranges are empty.
///
/// # Panics
///
/// Panics if `workers` is zero. The configuration layer rejects an empty
/// worker list before a round is planned.
pub fn partition_ranges(len: usize, workers: usize) -> Vec<Range<usize>> {
    assert!(workers >= 1, "at least one worker is required");

    let chunk = len / workers;

    (0..workers)
        .map(|i| {
            let start = i * chunk;
            let end = if i == workers - 1 {
                len  // Last partition gets remainder
            } else {
                start + chunk
            };
            start..end
        })
        .collect()
}

/// Length of the largest partition `partition_ranges` produces
///
/// # Panics
///
/// Panics if `workers` is zero.
pub fn largest_partition_len(len: usize, workers: usize) -> usize {
    assert!(workers >= 1, "at least one worker is required");
    len / workers + len % workers
}

/// Split `input` into `workers` owned partitions
///
/// Each partition is an independent copy so it can be moved into an in-flight
/// request without borrowing the original input.
pub fn plan_partitions(input: &[i32], workers: usize) -> Vec<Vec<i32>> {
    partition_ranges(input.len(), workers)
        .into_iter()
        .map(|range| input[range].to_vec())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_even_split() {
        let ranges = partition_ranges(9, 3);
        assert_eq!(ranges, vec![0..3, 3..6, 6..9]);
    }

    #[test]
    fn test_last_partition_absorbs_remainder() {
        let ranges = partition_ranges(10, 3);
        assert_eq!(ranges, vec![0..3, 3..6, 6..10]);
        assert_eq!(ranges[2].len(), 3 + 10 % 3);
    }

    #[test]
    fn test_fewer_elements_than_workers() {
        let ranges = partition_ranges(2, 4);
        assert_eq!(ranges, vec![0..0, 0..0, 0..0, 0..2]);
    }

    #[test]
    fn test_empty_input() {
        let parts = plan_partitions(&[], 3);
        assert_eq!(parts, vec![Vec::<i32>::new(), Vec::new(), Vec::new()]);
    }

    #[test]
    fn test_single_worker_gets_everything() {
        let input = vec![4, -1, 7];
        assert_eq!(plan_partitions(&input, 1), vec![input]);
    }

    #[test]
    fn test_largest_partition_len_matches_ranges() {
        for len in [0, 1, 5, 17, 1000] {
            for workers in 1..=7 {
                let largest = partition_ranges(len, workers).iter().map(|r| r.len()).max().unwrap();
                assert_eq!(largest_partition_len(len, workers), largest, "len {} workers {}", len, workers);
            }
        }
    }

    #[test]
    fn test_partitions_reconstruct_input() {
        let input: Vec<i32> = (0..103).map(|i| (i * 37 % 11) - 5).collect();

        for workers in 1..=input.len() {
            let ranges = partition_ranges(input.len(), workers);
            assert_eq!(ranges.len(), workers);

            // Contiguous and ordered
            let mut expected_start = 0;
            for range in &ranges {
                assert_eq!(range.start, expected_start);
                assert!(range.end >= range.start);
                expected_start = range.end;
            }
            assert_eq!(expected_start, input.len());

            let rebuilt: Vec<i32> = plan_partitions(&input, workers).concat();
            assert_eq!(rebuilt, input);
        }
    }

    #[test]
    #[should_panic(expected = "at least one worker")]
    fn test_zero_workers_panics() {
        partition_ranges(5, 0);
    }
}
