//! Distributed mode implementation
//!
//! # Architecture
//!
//! distsort uses a coordinator-worker architecture:
//!
//! - **Coordinator**: Partitions the input, dispatches one partition per worker,
//!   merges the sorted partitions and verifies the result
//! - **Worker Service**: Runs on workers, sorts every partition it receives and
//!   sends it back on the same connection
//!
//! # Modules
//!
//! - `protocol`: Message definitions and framing
//! - `worker_service`: Worker service implementation
//! - `coordinator`: Distributed coordinator implementation

pub mod coordinator;
pub mod protocol;
pub mod worker_service;

// Re-export key types
pub use protocol::{Message, ProtocolError, SortRequest, SortResponse, MAX_FRAME_LEN};

pub use coordinator::{DispatchError, DistributedCoordinator, RoundPhase, RoundReport, WorkerConnection, WorkerOutcome};
pub use worker_service::{WorkerService, WorkerSession};
