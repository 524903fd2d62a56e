//! K-way merge of sorted partitions
//!
//! Sorted partitions coming back from workers are combined by recursive
//! pairwise reduction: the list is halved, each half is merged down to one
//! sequence, and the two results are merged with a linear two-pointer pass.
//! Total work is O(n log k) for n elements across k partitions.

/// Merge any number of sorted sequences into one sorted sequence
///
/// An empty list yields an empty sequence. A single sequence is returned
/// without copying. On ties the element from the left half wins.
///
/// # Example
///
/// ```
/// use distsort::sort::merge::merge_all;
///
/// let merged = merge_all(vec![vec![3, 5], vec![1, 2, 4]]);
/// assert_eq!(merged, vec![1, 2, 3, 4, 5]);
/// ```
pub fn merge_all(mut sequences: Vec<Vec<i32>>) -> Vec<i32> {
    match sequences.len() {
        0 => Vec::new(),
        1 => sequences.pop().unwrap_or_default(),
        len => {
            let right = sequences.split_off(len / 2);
            let left = merge_all(sequences);
            let right = merge_all(right);
            merge_two(&left, &right)
        }
    }
}

/// Merge two sorted sequences
pub fn merge_two(left: &[i32], right: &[i32]) -> Vec<i32> {
    let mut merged = Vec::with_capacity(left.len() + right.len());

    let mut i = 0;
    let mut j = 0;

    while i < left.len() && j < right.len() {
        if left[i] <= right[j] {
            merged.push(left[i]);
            i += 1;
        } else {
            merged.push(right[j]);
            j += 1;
        }
    }

    merged.extend_from_slice(&left[i..]);
    merged.extend_from_slice(&right[j..]);

    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_sequences() {
        assert!(merge_all(Vec::new()).is_empty());
    }

    #[test]
    fn test_single_sequence_returned_unchanged() {
        let only = vec![1, 1, 2, 9];
        let ptr = only.as_ptr();

        let merged = merge_all(vec![only]);
        assert_eq!(merged, vec![1, 1, 2, 9]);
        // Moved through, not copied
        assert_eq!(merged.as_ptr(), ptr);
    }

    #[test]
    fn test_two_sequences() {
        assert_eq!(merge_two(&[3, 5], &[1, 2, 4]), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_empty_members() {
        let merged = merge_all(vec![vec![], vec![2, 4], vec![], vec![1, 3], vec![]]);
        assert_eq!(merged, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_all_members_empty() {
        assert!(merge_all(vec![vec![], vec![], vec![]]).is_empty());
    }

    #[test]
    fn test_many_sequences_with_duplicates() {
        let inputs: Vec<Vec<i32>> = (0..13)
            .map(|k| (0..(k * 3 % 7)).map(|v| v * (k % 4) - 5).collect::<Vec<i32>>())
            .map(|mut seq| {
                seq.sort_unstable();
                seq
            })
            .collect();

        let total: usize = inputs.iter().map(Vec::len).sum();
        let mut expected = inputs.concat();
        expected.sort_unstable();

        let merged = merge_all(inputs);
        assert_eq!(merged.len(), total);
        assert_eq!(merged, expected);
    }

    #[test]
    fn test_sort_then_merge_round_trip() {
        use crate::sort::local::merge_sort;
        use crate::sort::partition::plan_partitions;

        let input: Vec<i32> = (0..60).map(|i| (i * 7919 % 61) - 30).collect();
        let mut expected = input.clone();
        expected.sort_unstable();

        for workers in 1..=input.len() {
            let sorted_parts = plan_partitions(&input, workers)
                .iter()
                .map(|part| merge_sort(part))
                .collect();
            assert_eq!(merge_all(sorted_parts), expected, "workers = {}", workers);
        }
    }
}
