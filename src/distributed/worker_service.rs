//! Sort worker service
//!
//! Runs on each worker node. The service:
//! - Listens for connections from the coordinator
//! - Runs one independent session task per accepted connection
//! - Sorts every received partition and sends it back
//! - Stops accepting when its shutdown future resolves
//!
//! # Session states
//!
//! ```text
//! AWAITING_MESSAGE --SORT_REQUEST--> SORTING --> RESPONDING --> AWAITING_MESSAGE
//!        |
//!        +--TERMINATE / EOF / stream error--> CLOSED
//! ```

use crate::distributed::protocol::*;
use crate::sort::local::merge_sort_in_place;
use crate::util::log::SharedLogger;
use anyhow::{Context, Result};
use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;

const COMPONENT: &str = "worker";
const SESSION: &str = "session";

/// First pause after a failed `accept`; doubles per consecutive failure
const ACCEPT_BACKOFF_MIN: Duration = Duration::from_millis(10);
const ACCEPT_BACKOFF_MAX: Duration = Duration::from_secs(1);

/// Sort worker service
///
/// Accepts coordinator connections indefinitely; sessions never share state.
pub struct WorkerService {
    /// Bound listener
    listener: TcpListener,

    /// Worker identifier (hostname)
    worker_id: String,

    logger: SharedLogger,
}

impl WorkerService {
    /// Bind a new service to `addr` (e.g. "0.0.0.0:12345")
    pub async fn bind(addr: &str, logger: SharedLogger) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind worker service to {}", addr))?;

        Ok(Self::new(listener, logger))
    }

    /// Wrap an already bound listener
    pub fn new(listener: TcpListener, logger: SharedLogger) -> Self {
        Self {
            listener,
            worker_id: get_worker_id(),
            logger,
        }
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Run the accept loop until `shutdown` resolves
    ///
    /// Sessions still running at shutdown are aborted.
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send,
    {
        let WorkerService {
            listener,
            worker_id,
            logger,
        } = self;

        let addr = listener
            .local_addr()
            .context("Failed to read listener address")?;
        logger.info(COMPONENT, &format!("Worker {} listening on {}", worker_id, addr));
        logger.info(COMPONENT, "Waiting for coordinator connections...");

        let mut sessions = JoinSet::new();
        let mut accept_failures: u32 = 0;
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    logger.info(COMPONENT, &format!(
                        "Shutdown requested, stopping accept loop ({} session(s) active)",
                        sessions.len()
                    ));
                    break;
                }
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            accept_failures = 0;
                            logger.info(COMPONENT, &format!("Connection accepted from {}", peer));
                            let session_logger = logger.clone();
                            sessions.spawn(async move {
                                serve_connection(stream, peer, session_logger).await
                            });
                        }
                        Err(e) => {
                            let pause = accept_backoff(accept_failures);
                            accept_failures = accept_failures.saturating_add(1);
                            logger.warn(COMPONENT, &format!(
                                "Failed to accept connection: {} (retrying in {:?})",
                                e, pause
                            ));
                            // Errors such as EMFILE persist until a descriptor is released
                            tokio::time::sleep(pause).await;
                        }
                    }
                }
                Some(joined) = sessions.join_next(), if !sessions.is_empty() => {
                    match joined {
                        Ok((peer, summary)) => logger.info(COMPONENT, &format!(
                            "Session with {} finished: {} request(s) served, {} discarded, {:?}",
                            peer, summary.requests_served, summary.messages_discarded, summary.close_reason
                        )),
                        Err(e) => logger.error(COMPONENT, &format!("Session task failed: {}", e)),
                    }
                }
            }
        }

        sessions.shutdown().await;
        logger.info(COMPONENT, "Worker stopped");

        Ok(())
    }

    /// Run until Ctrl-C
    pub async fn run_until_ctrl_c(self) -> Result<()> {
        let logger = self.logger.clone();
        self.run_until(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                logger.warn(COMPONENT, &format!("Failed to install Ctrl-C handler: {}", e));
                std::future::pending::<()>().await;
            }
        })
        .await
    }
}

/// Pause before the next `accept` after `failures` consecutive failures
fn accept_backoff(failures: u32) -> Duration {
    ACCEPT_BACKOFF_MIN
        .saturating_mul(1u32 << failures.min(16))
        .min(ACCEPT_BACKOFF_MAX)
}

async fn serve_connection(stream: TcpStream, peer: SocketAddr, logger: SharedLogger) -> (SocketAddr, SessionSummary) {
    if let Err(e) = stream.set_nodelay(true) {
        logger.warn(SESSION, &format!("Failed to set TCP_NODELAY for {}: {}", peer, e));
    }
    let summary = WorkerSession::new(stream, peer.to_string(), logger).run().await;
    (peer, summary)
}

/// Session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AwaitingMessage,
    Sorting,
    Responding,
    Closed,
}

/// Why a session ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// Coordinator sent TERMINATE
    Terminated,
    /// Peer closed the connection between messages
    PeerDisconnected,
    /// Transport failure
    StreamError(String),
}

/// Result of a finished session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub requests_served: u64,
    pub messages_discarded: u64,
    pub close_reason: CloseReason,
}

/// Per-connection worker session
///
/// Handles one request at a time and replies exactly once per request.
pub struct WorkerSession<S> {
    stream: S,
    peer: String,
    logger: SharedLogger,
    state: SessionState,
    requests_served: u64,
    messages_discarded: u64,
}

impl<S> WorkerSession<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(stream: S, peer: String, logger: SharedLogger) -> Self {
        Self {
            stream,
            peer,
            logger,
            state: SessionState::AwaitingMessage,
            requests_served: 0,
            messages_discarded: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Serve messages until termination, disconnect or stream failure
    pub async fn run(mut self) -> SessionSummary {
        let close_reason = loop {
            debug_assert_eq!(self.state, SessionState::AwaitingMessage);

            match read_message(&mut self.stream).await {
                Ok(Message::SortRequest(request)) => {
                    if let Err(reason) = self.handle_request(request).await {
                        break reason;
                    }
                }
                Ok(Message::Terminate) => {
                    self.logger.warn(SESSION, &format!("Termination received from {}", self.peer));
                    break CloseReason::Terminated;
                }
                Ok(other) => {
                    self.messages_discarded += 1;
                    self.logger.warn(SESSION, &format!(
                        "Unexpected {} from {}, discarding",
                        other.kind(),
                        self.peer
                    ));
                }
                Err(ProtocolError::ConnectionClosed) => {
                    self.logger.warn(SESSION, &format!("Peer closed the connection: {}", self.peer));
                    break CloseReason::PeerDisconnected;
                }
                Err(e) if e.is_recoverable() => {
                    self.messages_discarded += 1;
                    self.logger.warn(SESSION, &format!(
                        "Discarding malformed message from {}: {}",
                        self.peer, e
                    ));
                }
                Err(e) => {
                    self.logger.warn(SESSION, &format!("Connection error with {}: {}", self.peer, e));
                    break CloseReason::StreamError(e.to_string());
                }
            }
        };

        self.state = SessionState::Closed;
        let _ = self.stream.shutdown().await;
        self.logger.info(SESSION, &format!(
            "Connection closed: {} ({} request(s) served)",
            self.peer, self.requests_served
        ));

        SessionSummary {
            requests_served: self.requests_served,
            messages_discarded: self.messages_discarded,
            close_reason,
        }
    }

    /// SORTING -> RESPONDING -> AWAITING_MESSAGE
    async fn handle_request(&mut self, request: SortRequest) -> Result<(), CloseReason> {
        let len = request.values.len();
        self.logger.info(SESSION, &format!("Request received from {}, size: {}", self.peer, len));

        self.state = SessionState::Sorting;
        let mut values = request.values;
        let sorted = match tokio::task::spawn_blocking(move || {
            merge_sort_in_place(&mut values);
            values
        })
        .await
        {
            Ok(sorted) => sorted,
            Err(e) => {
                self.logger.error(SESSION, &format!("Sort task failed for {}: {}", self.peer, e));
                return Err(CloseReason::StreamError(e.to_string()));
            }
        };

        self.state = SessionState::Responding;
        let response = Message::SortResponse(SortResponse { values: sorted });
        if let Err(e) = write_message(&mut self.stream, &response).await {
            self.logger.error(SESSION, &format!("Failed to send response to {}: {}", self.peer, e));
            return Err(CloseReason::StreamError(e.to_string()));
        }

        self.requests_served += 1;
        self.state = SessionState::AwaitingMessage;
        self.logger.info(SESSION, &format!("Response sent to {} ({} elements)", self.peer, len));

        Ok(())
    }
}

/// Get worker identifier (hostname)
fn get_worker_id() -> String {
    hostname::get()
        .ok()
        .and_then(|name| name.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string())
}
