//! Distributed sort coordinator
//!
//! This module implements the coordinator side of a sort round.
//! The coordinator:
//! - Connects to all workers
//! - Plans one partition per worker
//! - Dispatches all partitions concurrently and waits for every reply
//! - Merges the sorted partitions and verifies the result
//! - Sends TERMINATE on every connection and closes it
//!
//! # Round phases
//!
//! ```text
//! IDLE -> DISPATCHING -> COLLECTING -> MERGING -> VERIFIED
//!                                             \-> FAILED (ordering check failed)
//! ```
//!
//! A worker that fails (unreachable, I/O error, unexpected message, wrong
//! length, deadline exceeded) contributes an empty partition. The round still
//! completes, and the missing elements are reported as a round-level warning.

use crate::config::CoordinatorConfig;
use crate::distributed::protocol::*;
use crate::sort::baseline::{run_baseline, BaselineResult};
use crate::sort::input::InputGenerator;
use crate::sort::merge::merge_all;
use crate::sort::partition::plan_partitions;
use crate::util::log::SharedLogger;
use crate::util::verification::{verify_sorted, VerificationResult};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

const COMPONENT: &str = "coordinator";

/// Round phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundPhase {
    Idle,
    Dispatching,
    Collecting,
    Merging,
    Verified,
    Failed,
}

/// Failure of one request/response exchange
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("worker is not connected")]
    NotConnected,

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("protocol violation: expected SORT_RESPONSE, got {0}")]
    UnexpectedMessage(&'static str),

    #[error("protocol violation: response has {actual} elements, request had {expected}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("no response within {0:?}")]
    Timeout(Duration),

    #[error("dispatch task failed: {0}")]
    TaskFailed(String),
}

/// One coordinator-side connection to a worker
///
/// A slot exists for every configured endpoint. Endpoints that could not be
/// reached, or whose exchange failed, keep their slot without a stream.
pub struct WorkerConnection<S = TcpStream> {
    index: usize,
    endpoint: String,
    stream: Option<S>,
}

impl<S> WorkerConnection<S> {
    pub fn connected(index: usize, endpoint: impl Into<String>, stream: S) -> Self {
        Self {
            index,
            endpoint: endpoint.into(),
            stream: Some(stream),
        }
    }

    pub fn disconnected(index: usize, endpoint: impl Into<String>) -> Self {
        Self {
            index,
            endpoint: endpoint.into(),
            stream: None,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }
}

/// Outcome of one worker's exchange
#[derive(Debug, Clone, Serialize)]
pub struct WorkerOutcome {
    pub index: usize,
    pub endpoint: String,
    pub partition_len: usize,
    pub result_len: usize,
    #[serde(skip)]
    pub elapsed: Duration,
    pub error: Option<String>,
}

impl WorkerOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Result of one sort round
#[derive(Debug, Clone)]
pub struct RoundReport {
    pub started_at: DateTime<Utc>,
    pub input_len: usize,
    pub merged: Vec<i32>,
    pub workers: Vec<WorkerOutcome>,
    pub phase: RoundPhase,
    pub verification: VerificationResult,
    pub warnings: Vec<String>,
    /// Fan-out through the join barrier
    pub dispatch_time: Duration,
    pub merge_time: Duration,
    pub verify_time: Duration,
    pub baseline: Option<BaselineResult>,
}

impl RoundReport {
    pub fn failed_workers(&self) -> usize {
        self.workers.iter().filter(|w| !w.succeeded()).count()
    }

    pub fn missing_elements(&self) -> usize {
        self.input_len.saturating_sub(self.merged.len())
    }

    /// Every element came back and the result is ordered
    pub fn is_complete(&self) -> bool {
        self.missing_elements() == 0 && self.verification.is_success()
    }

    pub fn distributed_time(&self) -> Duration {
        self.dispatch_time + self.merge_time
    }
}

/// Distributed sort coordinator
///
/// Runs exactly one round per invocation of `run`.
pub struct DistributedCoordinator {
    config: Arc<CoordinatorConfig>,
    logger: SharedLogger,
}

impl DistributedCoordinator {
    /// Create a new coordinator
    pub fn new(config: Arc<CoordinatorConfig>, logger: SharedLogger) -> Result<Self> {
        if config.workers.is_empty() {
            anyhow::bail!("No workers specified for the coordinator");
        }

        Ok(Self { config, logger })
    }

    /// Generate the input, run one round against the configured workers, close
    /// every connection, then time the baseline sort
    pub async fn run(&self) -> RoundReport {
        self.logger.info(COMPONENT, &format!(
            "Starting coordinator: {} worker(s), {} element(s)",
            self.config.workers.len(),
            self.config.input_len
        ));

        let input = InputGenerator::from_seed_option(
            self.config.min_value,
            self.config.max_value,
            self.config.seed,
        )
        .generate(self.config.input_len);
        self.logger.info(COMPONENT, &format!("Generated input with {} elements", input.len()));

        let mut connections = self.connect_all().await;
        let mut report = self.run_round(&mut connections, &input).await;
        self.close_all(connections).await;

        if self.config.run_baseline {
            self.logger.info(COMPONENT, "Comparing with single-process sort...");
            let baseline = run_baseline(&input);
            self.logger.info(COMPONENT, &format!(
                "Single-process sort: {:.2} ms",
                baseline.elapsed.as_secs_f64() * 1000.0
            ));
            report.baseline = Some(baseline);
        }

        report
    }

    /// Connect to every configured worker
    ///
    /// Unreachable endpoints yield disconnected slots so that partition count
    /// always equals endpoint count.
    pub async fn connect_all(&self) -> Vec<WorkerConnection<TcpStream>> {
        let connect_timeout = self.config.connect_timeout();
        let mut connections = Vec::with_capacity(self.config.workers.len());

        self.logger.info(COMPONENT, &format!("Connecting to {} worker(s)...", self.config.workers.len()));

        for (i, endpoint) in self.config.workers.iter().enumerate() {
            match timeout(connect_timeout, TcpStream::connect(endpoint.as_str())).await {
                Ok(Ok(stream)) => {
                    if let Err(e) = stream.set_nodelay(true) {
                        self.logger.warn(COMPONENT, &format!("Failed to set TCP_NODELAY for {}: {}", endpoint, e));
                    }
                    self.logger.info(COMPONENT, &format!("Connected to worker {} ({})", i, endpoint));
                    connections.push(WorkerConnection::connected(i, endpoint.as_str(), stream));
                }
                Ok(Err(e)) => {
                    self.logger.warn(COMPONENT, &format!("Failed to connect to worker {} ({}): {}", i, endpoint, e));
                    connections.push(WorkerConnection::disconnected(i, endpoint.as_str()));
                }
                Err(_) => {
                    self.logger.warn(COMPONENT, &format!(
                        "Timed out connecting to worker {} ({}) after {:?}",
                        i, endpoint, connect_timeout
                    ));
                    connections.push(WorkerConnection::disconnected(i, endpoint.as_str()));
                }
            }
        }

        let connected = connections.iter().filter(|c| c.is_connected()).count();
        self.logger.info(COMPONENT, &format!("Connected to {} of {} worker(s)", connected, connections.len()));

        connections
    }

    /// Run one sort round over `connections`
    ///
    /// Partition `i` goes to `connections[i]`. Connections whose exchange
    /// failed lose their stream and are skipped by `close_all`.
    pub async fn run_round<S>(&self, connections: &mut [WorkerConnection<S>], input: &[i32]) -> RoundReport
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let started_at = Utc::now();
        let mut phase = RoundPhase::Idle;
        let mut warnings = Vec::new();

        if connections.is_empty() {
            let warning = format!("Round has no worker connections; {} element(s) dropped", input.len());
            self.logger.error(COMPONENT, &warning);
            warnings.push(warning);
            return RoundReport {
                started_at,
                input_len: input.len(),
                merged: Vec::new(),
                workers: Vec::new(),
                phase: RoundPhase::Failed,
                verification: VerificationResult::Success,
                warnings,
                dispatch_time: Duration::ZERO,
                merge_time: Duration::ZERO,
                verify_time: Duration::ZERO,
                baseline: None,
            };
        }

        let partitions = plan_partitions(input, connections.len());
        let partition_lens: Vec<usize> = partitions.iter().map(Vec::len).collect();

        // IDLE -> DISPATCHING
        phase = self.transition(phase, RoundPhase::Dispatching);
        let dispatch_start = Instant::now();
        let round_timeout = self.config.round_timeout();

        let mut handles = Vec::with_capacity(connections.len());
        for (conn, partition) in connections.iter_mut().zip(partitions) {
            self.logger.info(COMPONENT, &format!(
                "Sending {} element(s) to worker {} ({})",
                partition.len(),
                conn.index,
                conn.endpoint
            ));
            let stream = conn.stream.take();
            handles.push(tokio::spawn(dispatch_one(stream, partition, round_timeout)));
        }

        // DISPATCHING -> COLLECTING: join barrier over every dispatch task
        let mut joined = Vec::with_capacity(handles.len());
        for handle in handles {
            joined.push(match handle.await {
                Ok(done) => done,
                Err(e) => DispatchDone {
                    stream: None,
                    result: Err(DispatchError::TaskFailed(e.to_string())),
                    elapsed: dispatch_start.elapsed(),
                },
            });
        }
        let dispatch_time = dispatch_start.elapsed();
        phase = self.transition(phase, RoundPhase::Collecting);

        // One slot per partition, filled after the barrier
        let mut sorted_parts: Vec<Vec<i32>> = Vec::with_capacity(joined.len());
        let mut workers = Vec::with_capacity(joined.len());

        for ((conn, done), partition_len) in connections.iter_mut().zip(joined).zip(partition_lens) {
            let (values, error) = match done.result {
                Ok(values) => {
                    self.logger.info(COMPONENT, &format!(
                        "Received sorted partition from worker {} with {} element(s)",
                        conn.index,
                        values.len()
                    ));
                    conn.stream = done.stream;
                    (values, None)
                }
                Err(e) => {
                    self.logger.error(COMPONENT, &format!(
                        "Worker {} ({}) failed, contributing nothing: {}",
                        conn.index, conn.endpoint, e
                    ));
                    (Vec::new(), Some(e.to_string()))
                }
            };

            workers.push(WorkerOutcome {
                index: conn.index,
                endpoint: conn.endpoint.clone(),
                partition_len,
                result_len: values.len(),
                elapsed: done.elapsed,
                error,
            });
            sorted_parts.push(values);
        }

        self.logger.info(COMPONENT, &format!(
            "All partitions collected in {:.2} ms",
            dispatch_time.as_secs_f64() * 1000.0
        ));

        // COLLECTING -> MERGING
        phase = self.transition(phase, RoundPhase::Merging);
        let merge_start = Instant::now();
        let merged = merge_all(sorted_parts);
        let merge_time = merge_start.elapsed();
        self.logger.info(COMPONENT, &format!(
            "Merge complete: {} element(s) in {:.2} ms",
            merged.len(),
            merge_time.as_secs_f64() * 1000.0
        ));

        let failed = workers.iter().filter(|w| !w.succeeded()).count();
        if failed > 0 || merged.len() != input.len() {
            let warning = format!(
                "Round incomplete: {} of {} worker(s) failed; result has {} of {} element(s)",
                failed,
                workers.len(),
                merged.len(),
                input.len()
            );
            self.logger.warn(COMPONENT, &warning);
            warnings.push(warning);
        }

        // MERGING -> VERIFIED | FAILED
        let verify_start = Instant::now();
        let verification = verify_sorted(&merged);
        let verify_time = verify_start.elapsed();

        match verification {
            VerificationResult::Success => {
                phase = self.transition(phase, RoundPhase::Verified);
                self.logger.info(COMPONENT, "Result is correctly sorted");
            }
            VerificationResult::Failure { index, previous, actual } => {
                phase = self.transition(phase, RoundPhase::Failed);
                let warning = format!(
                    "Result is NOT sorted: element {} ({}) is smaller than its predecessor ({})",
                    index, actual, previous
                );
                self.logger.error(COMPONENT, &warning);
                warnings.push(warning);
            }
        }

        RoundReport {
            started_at,
            input_len: input.len(),
            merged,
            workers,
            phase,
            verification,
            warnings,
            dispatch_time,
            merge_time,
            verify_time,
            baseline: None,
        }
    }

    /// Send TERMINATE on every live connection and close it
    ///
    /// Waits up to the close timeout for each worker to acknowledge by
    /// closing its side.
    pub async fn close_all<S>(&self, connections: Vec<WorkerConnection<S>>)
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        self.logger.info(COMPONENT, "Closing connections...");
        let close_timeout = self.config.close_timeout();

        for conn in connections {
            let WorkerConnection { index, endpoint, stream } = conn;
            let Some(mut stream) = stream else {
                continue;
            };

            if let Err(e) = write_message(&mut stream, &Message::Terminate).await {
                self.logger.error(COMPONENT, &format!("Failed to send TERMINATE to worker {}: {}", index, e));
                continue;
            }
            let _ = stream.shutdown().await;

            match timeout(close_timeout, read_message(&mut stream)).await {
                Ok(Err(ProtocolError::ConnectionClosed)) => {}
                Ok(Ok(msg)) => self.logger.warn(COMPONENT, &format!(
                    "Worker {} sent {} after TERMINATE",
                    index,
                    msg.kind()
                )),
                Ok(Err(e)) => self.logger.warn(COMPONENT, &format!("Worker {} closed abruptly: {}", index, e)),
                Err(_) => self.logger.warn(COMPONENT, &format!(
                    "Worker {} did not close within {:?}",
                    index, close_timeout
                )),
            }

            self.logger.info(COMPONENT, &format!("Connection closed: {}", endpoint));
        }
    }

    fn transition(&self, from: RoundPhase, to: RoundPhase) -> RoundPhase {
        self.logger.info(COMPONENT, &format!("Round phase {:?} -> {:?}", from, to));
        to
    }
}

/// Result of one dispatch task
struct DispatchDone<S> {
    /// Returned only when the exchange succeeded
    stream: Option<S>,
    result: Result<Vec<i32>, DispatchError>,
    elapsed: Duration,
}

/// Send one partition and wait for its sorted reply within `deadline`
async fn dispatch_one<S>(stream: Option<S>, partition: Vec<i32>, deadline: Duration) -> DispatchDone<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let start = Instant::now();

    let Some(mut stream) = stream else {
        return DispatchDone {
            stream: None,
            result: Err(DispatchError::NotConnected),
            elapsed: start.elapsed(),
        };
    };

    let result = match timeout(deadline, exchange(&mut stream, partition)).await {
        Ok(result) => result,
        Err(_) => Err(DispatchError::Timeout(deadline)),
    };

    DispatchDone {
        stream: result.is_ok().then_some(stream),
        result,
        elapsed: start.elapsed(),
    }
}

/// One SORT_REQUEST / SORT_RESPONSE round trip
async fn exchange<S>(stream: &mut S, partition: Vec<i32>) -> Result<Vec<i32>, DispatchError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let expected = partition.len();
    write_message(stream, &Message::SortRequest(SortRequest { values: partition })).await?;

    match read_message(stream).await? {
        Message::SortResponse(resp) if resp.values.len() == expected => Ok(resp.values),
        Message::SortResponse(resp) => Err(DispatchError::LengthMismatch {
            expected,
            actual: resp.values.len(),
        }),
        other => Err(DispatchError::UnexpectedMessage(other.kind())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distributed::worker_service::WorkerSession;
    use crate::util::log::{Level, MemoryLogger};
    use tokio::io::DuplexStream;

    fn coordinator(workers: usize, round_timeout_ms: u64, logger: Arc<MemoryLogger>) -> DistributedCoordinator {
        let config = CoordinatorConfig {
            workers: (0..workers).map(|i| format!("worker-{}:1", i)).collect(),
            round_timeout_ms,
            close_timeout_ms: 500,
            ..CoordinatorConfig::default()
        };
        DistributedCoordinator::new(Arc::new(config), logger).unwrap()
    }

    /// Connection backed by a real in-process worker session
    fn live_worker(index: usize, logger: Arc<MemoryLogger>) -> WorkerConnection<DuplexStream> {
        let (client, server) = tokio::io::duplex(64 * 1024);
        tokio::spawn(WorkerSession::new(server, format!("peer-{}", index), logger).run());
        WorkerConnection::connected(index, format!("worker-{}:1", index), client)
    }

    /// Connection whose peer answers every request with `reply`
    fn scripted_worker(index: usize, reply: Message) -> WorkerConnection<DuplexStream> {
        let (client, mut server) = tokio::io::duplex(64 * 1024);
        tokio::spawn(async move {
            while let Ok(Message::SortRequest(_)) = read_message(&mut server).await {
                if write_message(&mut server, &reply).await.is_err() {
                    break;
                }
            }
        });
        WorkerConnection::connected(index, format!("worker-{}:1", index), client)
    }

    /// Connection whose peer reads requests and never replies
    fn silent_worker(index: usize) -> WorkerConnection<DuplexStream> {
        let (client, mut server) = tokio::io::duplex(64 * 1024);
        tokio::spawn(async move {
            while read_message(&mut server).await.is_ok() {}
        });
        WorkerConnection::connected(index, format!("worker-{}:1", index), client)
    }

    #[test]
    fn test_new_requires_workers() {
        let config = CoordinatorConfig::default();
        assert!(DistributedCoordinator::new(Arc::new(config), MemoryLogger::new()).is_err());
    }

    #[tokio::test]
    async fn test_round_scenario_a() {
        let logger = MemoryLogger::new();
        let coord = coordinator(2, 5_000, logger.clone());
        let mut conns = vec![live_worker(0, logger.clone()), live_worker(1, logger.clone())];

        let report = coord.run_round(&mut conns, &[5, 3, 1, 4, 2]).await;

        assert_eq!(report.merged, vec![1, 2, 3, 4, 5]);
        assert_eq!(report.phase, RoundPhase::Verified);
        assert_eq!(report.workers[0].partition_len, 2);
        assert_eq!(report.workers[1].partition_len, 3);
        assert!(report.warnings.is_empty());
        assert!(report.is_complete());
        assert!(conns.iter().all(|c| c.is_connected()));

        coord.close_all(conns).await;
        assert!(!logger.contains(Level::Warn, "did not close"));
    }

    #[tokio::test]
    async fn test_round_scenario_b_empty_input() {
        let logger = MemoryLogger::new();
        let coord = coordinator(3, 5_000, logger.clone());
        let mut conns: Vec<_> = (0..3).map(|i| live_worker(i, logger.clone())).collect();

        let report = coord.run_round(&mut conns, &[]).await;

        assert!(report.merged.is_empty());
        assert_eq!(report.phase, RoundPhase::Verified);
        assert!(report.verification.is_success());
        assert!(report.workers.iter().all(|w| w.partition_len == 0 && w.succeeded()));
        assert!(report.warnings.is_empty());
    }

    #[tokio::test]
    async fn test_disconnected_worker_contributes_nothing() {
        let logger = MemoryLogger::new();
        let coord = coordinator(2, 5_000, logger.clone());
        let mut conns = vec![live_worker(0, logger.clone()), WorkerConnection::disconnected(1, "worker-1:1")];

        let report = coord.run_round(&mut conns, &[9, 1, 5, 3]).await;

        assert_eq!(report.merged, vec![1, 9]);
        assert_eq!(report.failed_workers(), 1);
        assert_eq!(report.missing_elements(), 2);
        assert!(!report.is_complete());
        assert_eq!(report.phase, RoundPhase::Verified);
        assert_eq!(report.warnings.len(), 1);
        assert!(logger.contains(Level::Warn, "Round incomplete"));
    }

    #[tokio::test]
    async fn test_unexpected_message_is_protocol_violation() {
        let logger = MemoryLogger::new();
        let coord = coordinator(2, 5_000, logger.clone());
        let mut conns = vec![scripted_worker(0, Message::Terminate), live_worker(1, logger.clone())];

        let report = coord.run_round(&mut conns, &[4, 3, 2, 1]).await;

        assert_eq!(report.merged, vec![1, 2]);
        let error = report.workers[0].error.as_deref().unwrap();
        assert!(error.contains("TERMINATE"), "{}", error);
        assert!(!conns[0].is_connected());
        assert!(conns[1].is_connected());
    }

    #[tokio::test]
    async fn test_length_mismatch_is_protocol_violation() {
        let logger = MemoryLogger::new();
        let coord = coordinator(1, 5_000, logger.clone());
        let reply = Message::SortResponse(SortResponse { values: vec![1] });
        let mut conns = vec![scripted_worker(0, reply)];

        let report = coord.run_round(&mut conns, &[2, 1]).await;

        assert!(report.merged.is_empty());
        assert!(report.workers[0].error.as_deref().unwrap().contains("1 elements"));
        assert_eq!(report.missing_elements(), 2);
    }

    #[tokio::test]
    async fn test_hung_worker_times_out() {
        let logger = MemoryLogger::new();
        let coord = coordinator(2, 100, logger.clone());
        let mut conns = vec![live_worker(0, logger.clone()), silent_worker(1)];

        let report = tokio::time::timeout(Duration::from_secs(5), coord.run_round(&mut conns, &[7, 6, 5, 4]))
            .await
            .expect("round must not block on a hung worker");

        assert_eq!(report.merged, vec![6, 7]);
        assert!(report.workers[1].error.as_deref().unwrap().contains("no response"));
    }

    #[tokio::test]
    async fn test_unsorted_reply_fails_verification() {
        let logger = MemoryLogger::new();
        let coord = coordinator(1, 5_000, logger.clone());
        let reply = Message::SortResponse(SortResponse { values: vec![3, 1, 2] });
        let mut conns = vec![scripted_worker(0, reply)];

        let report = coord.run_round(&mut conns, &[1, 2, 3]).await;

        assert_eq!(report.phase, RoundPhase::Failed);
        assert!(!report.verification.is_success());
        assert_eq!(report.merged, vec![3, 1, 2]);
        assert!(logger.contains(Level::Error, "NOT sorted"));
    }

    #[tokio::test]
    async fn test_more_workers_than_elements() {
        let logger = MemoryLogger::new();
        let coord = coordinator(4, 5_000, logger.clone());
        let mut conns: Vec<_> = (0..4).map(|i| live_worker(i, logger.clone())).collect();

        let report = coord.run_round(&mut conns, &[2, -2]).await;

        assert_eq!(report.merged, vec![-2, 2]);
        let lens: Vec<usize> = report.workers.iter().map(|w| w.partition_len).collect();
        assert_eq!(lens, vec![0, 0, 0, 2]);
        assert!(report.is_complete());
    }
}
