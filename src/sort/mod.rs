//! Sorting core
//!
//! - `partition`: splits the input into one contiguous slice per worker
//! - `local`: merge sort run by each worker over its partition
//! - `merge`: k-way merge of the sorted partitions on the coordinator
//! - `input`: seeded random input generation
//! - `baseline`: single-process reference sort for timing comparison

pub mod baseline;
pub mod input;
pub mod local;
pub mod merge;
pub mod partition;

pub use local::merge_sort;
pub use merge::merge_all;
pub use partition::plan_partitions;
