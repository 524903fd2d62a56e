//! distsort - Distributed merge sort over TCP workers
//!
//! A coordinator splits an integer sequence into one contiguous partition per
//! worker, sends every partition concurrently, merges the sorted replies and
//! verifies the result.
//!
//! # Architecture
//!
//! - **Sort core**: partition planning, local merge sort, k-way merge, input generation
//! - **Distributed mode**: length-prefixed MessagePack protocol, worker service, coordinator
//! - **Output**: console summary and JSON report
//! - **Util**: ordering verification and injected logging

pub mod config;
pub mod distributed;
pub mod output;
pub mod sort;
pub mod util;

// Re-export commonly used types
pub use config::Config;
pub use distributed::{DistributedCoordinator, RoundReport, WorkerService};

/// Result type used throughout distsort
pub type Result<T> = anyhow::Result<T>;
