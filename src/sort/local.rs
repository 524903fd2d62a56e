//! Local merge sort
//!
//! Top-down merge sort used by workers to sort one partition. The split point
//! is `(lo + hi) / 2` over the inclusive range, and each merge step writes into
//! a scratch buffer sized to the merge range before copying back into place.

/// Sort a sequence without mutating the caller's copy
///
/// Returns a new ascending sequence. Empty and single-element inputs are
/// returned as-is.
///
/// # Example
///
/// ```
/// use distsort::sort::local::merge_sort;
///
/// let input = vec![5, 3, 1, 4, 2];
/// assert_eq!(merge_sort(&input), vec![1, 2, 3, 4, 5]);
/// assert_eq!(input, vec![5, 3, 1, 4, 2]);
/// ```
pub fn merge_sort(values: &[i32]) -> Vec<i32> {
    let mut sorted = values.to_vec();
    merge_sort_in_place(&mut sorted);
    sorted
}

/// Sort a sequence in place
pub fn merge_sort_in_place(values: &mut [i32]) {
    if values.len() <= 1 {
        return;
    }

    // Scratch space reused by every merge step
    let mut scratch = Vec::with_capacity(values.len());
    sort_range(values, 0, values.len() - 1, &mut scratch);
}

/// Recursively sort the inclusive range `lo..=hi`
fn sort_range(values: &mut [i32], lo: usize, hi: usize, scratch: &mut Vec<i32>) {
    if lo >= hi {
        return;
    }

    let mid = lo + (hi - lo) / 2;
    sort_range(values, lo, mid, scratch);
    sort_range(values, mid + 1, hi, scratch);
    merge_halves(values, lo, mid, hi, scratch);
}

/// Merge the sorted runs `lo..=mid` and `mid+1..=hi`
fn merge_halves(values: &mut [i32], lo: usize, mid: usize, hi: usize, scratch: &mut Vec<i32>) {
    scratch.clear();

    let mut left = lo;
    let mut right = mid + 1;

    while left <= mid && right <= hi {
        if values[left] <= values[right] {
            scratch.push(values[left]);
            left += 1;
        } else {
            scratch.push(values[right]);
            right += 1;
        }
    }

    scratch.extend_from_slice(&values[left..=mid]);
    scratch.extend_from_slice(&values[right..=hi]);

    values[lo..=hi].copy_from_slice(scratch);
}
