//! Worker protocol
//!
//! Messages exchanged between the coordinator and sort workers, serialized with
//! MessagePack (rmp-serde).
//!
//! # Message Flow
//!
//! ```text
//! Coordinator                     Worker
//!     |                              |
//!     |---- SORT_REQUEST(values) --->|
//!     |                              |  merge sort
//!     |<--- SORT_RESPONSE(sorted) ---|
//!     |                              |
//!     |        ... repeat ...        |
//!     |                              |
//!     |-------- TERMINATE ---------->|
//!     |                              |  closes connection
//! ```
//!
//! Requests are never pipelined: a connection carries at most one request in
//! flight, and the worker answers each request exactly once, in order.
//!
//! # Message Framing
//!
//! Each message is prefixed with a 4-byte length field (little-endian u32):
//!
//! ```text
//! [4 bytes: message length][N bytes: MessagePack-serialized message]
//! ```
//!
//! Because the body is read completely before decoding, an undecodable body
//! leaves the stream positioned at the next frame.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Largest accepted frame body (256 MiB)
pub const MAX_FRAME_LEN: usize = 256 * 1024 * 1024;

/// Length of the frame prefix
const LEN_PREFIX: usize = 4;

/// Upper bound on the message envelope around a partition (variant tag, array headers)
const ENVELOPE_LEN: usize = 64;

/// Protocol message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Message {
    /// Sort request (Coordinator → Worker)
    ///
    /// Carries one partition; the worker replies with exactly one `SortResponse`.
    SortRequest(SortRequest),

    /// Sort response (Worker → Coordinator)
    ///
    /// Carries the sorted partition; same length as the request.
    SortResponse(SortResponse),

    /// Termination signal (Coordinator → Worker)
    ///
    /// No further requests follow on this connection. The worker closes it
    /// without replying.
    Terminate,
}

impl Message {
    /// Short name used in log lines
    pub fn kind(&self) -> &'static str {
        match self {
            Message::SortRequest(_) => "SORT_REQUEST",
            Message::SortResponse(_) => "SORT_RESPONSE",
            Message::Terminate => "TERMINATE",
        }
    }
}

/// Sort request payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortRequest {
    /// Partition to sort
    pub values: Vec<i32>,
}

/// Sort response payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortResponse {
    /// Sorted partition
    pub values: Vec<i32>,
}

/// Wire-level errors
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Peer closed the stream cleanly between frames
    #[error("connection closed by peer")]
    ConnectionClosed,

    /// Transport failure (reset, broken pipe, truncated frame, ...)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Frame header announces a body larger than `MAX_FRAME_LEN`
    #[error("frame too large: {len} bytes (max {max})")]
    FrameTooLarge { len: usize, max: usize },

    /// Frame body was read completely but could not be decoded
    #[error("failed to decode message: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    /// Message could not be encoded
    #[error("failed to encode message: {0}")]
    Encode(#[from] rmp_serde::encode::Error),
}

impl ProtocolError {
    /// True if the stream is still aligned on a frame boundary
    ///
    /// Only a decode failure leaves the connection usable.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ProtocolError::Decode(_))
    }
}

/// MessagePack size of one integer in its most compact encoding
fn encoded_int_len(v: i32) -> usize {
    match v {
        -32..=127 => 1,
        -128..=255 => 2,
        -32_768..=65_535 => 3,
        _ => 5,
    }
}

/// Largest frame body a request or response of `elements` values drawn from
/// `min..=max` can serialize to
///
/// Compare against `MAX_FRAME_LEN` to reject partitions the wire cannot carry.
pub fn max_body_len(elements: usize, min: i32, max: i32) -> usize {
    let per_value = encoded_int_len(min).max(encoded_int_len(max));
    elements.saturating_mul(per_value).saturating_add(ENVELOPE_LEN)
}

/// Serialize a message to bytes
///
/// Prepends a 4-byte length field for framing.
///
/// # Message Format
///
/// ```text
/// [4 bytes: message length (little-endian u32)][N bytes: MessagePack message]
/// ```
pub fn serialize_message(msg: &Message) -> Result<Vec<u8>, ProtocolError> {
    let msg_bytes = rmp_serde::to_vec(msg)?;

    if msg_bytes.len() > MAX_FRAME_LEN {
        return Err(ProtocolError::FrameTooLarge {
            len: msg_bytes.len(),
            max: MAX_FRAME_LEN,
        });
    }

    let msg_len = msg_bytes.len() as u32;
    let mut framed = Vec::with_capacity(LEN_PREFIX + msg_bytes.len());
    framed.extend_from_slice(&msg_len.to_le_bytes());
    framed.extend_from_slice(&msg_bytes);

    Ok(framed)
}

/// Deserialize a message from a buffer holding at least one complete frame
///
/// # Returns
///
/// Returns (message, bytes_consumed) where bytes_consumed includes the length prefix.
pub fn deserialize_message(buf: &[u8]) -> Result<(Message, usize), ProtocolError> {
    if buf.len() < LEN_PREFIX {
        return Err(truncated(LEN_PREFIX, buf.len()));
    }

    let msg_len = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
    if msg_len > MAX_FRAME_LEN {
        return Err(ProtocolError::FrameTooLarge {
            len: msg_len,
            max: MAX_FRAME_LEN,
        });
    }

    if buf.len() < LEN_PREFIX + msg_len {
        return Err(truncated(LEN_PREFIX + msg_len, buf.len()));
    }

    let msg = rmp_serde::from_slice(&buf[LEN_PREFIX..LEN_PREFIX + msg_len])?;

    Ok((msg, LEN_PREFIX + msg_len))
}

fn truncated(needed: usize, got: usize) -> ProtocolError {
    ProtocolError::Io(std::io::Error::new(
        std::io::ErrorKind::UnexpectedEof,
        format!("incomplete frame (need {} bytes, got {})", needed, got),
    ))
}

/// Read one complete message from a stream
///
/// A clean end-of-stream before the length prefix is reported as
/// `ConnectionClosed`; end-of-stream inside a frame is an `Io` error.
pub async fn read_message<R>(reader: &mut R) -> Result<Message, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; LEN_PREFIX];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(ProtocolError::ConnectionClosed);
        }
        Err(e) => return Err(ProtocolError::Io(e)),
    }

    let msg_len = u32::from_le_bytes(len_buf) as usize;
    if msg_len > MAX_FRAME_LEN {
        return Err(ProtocolError::FrameTooLarge {
            len: msg_len,
            max: MAX_FRAME_LEN,
        });
    }

    let mut msg_buf = vec![0u8; msg_len];
    reader.read_exact(&mut msg_buf).await?;

    let msg = rmp_serde::from_slice(&msg_buf)?;

    Ok(msg)
}

/// Write a message to a stream and flush it
pub async fn write_message<W>(writer: &mut W, msg: &Message) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    let framed = serialize_message(msg)?;

    writer.write_all(&framed).await?;

    // Flush to ensure message is sent immediately
    writer.flush().await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_deserialize_sort_request() {
        let msg = Message::SortRequest(SortRequest {
            values: vec![5, -3, 1, i32::MIN, i32::MAX],
        });

        let bytes = serialize_message(&msg).unwrap();
        let (deserialized, consumed) = deserialize_message(&bytes).unwrap();

        assert_eq!(consumed, bytes.len());
        assert_eq!(deserialized, msg);
    }

    #[test]
    fn test_serialize_deserialize_empty_response() {
        let msg = Message::SortResponse(SortResponse { values: Vec::new() });

        let bytes = serialize_message(&msg).unwrap();
        let (deserialized, _) = deserialize_message(&bytes).unwrap();

        match deserialized {
            Message::SortResponse(resp) => assert!(resp.values.is_empty()),
            other => panic!("Wrong message type: {:?}", other),
        }
    }

    #[test]
    fn test_max_body_len_bounds_encoded_size() {
        let cases: [(i32, i32, i32); 4] = [
            (i32::MIN, i32::MIN, i32::MAX),
            (i32::MAX, i32::MIN, i32::MAX),
            (-100, -100, 100),
            (100, -100, 100),
        ];

        for (value, min, max) in cases {
            let msg = Message::SortResponse(SortResponse { values: vec![value; 1000] });
            let body = serialize_message(&msg).unwrap().len() - LEN_PREFIX;
            assert!(body <= max_body_len(1000, min, max), "value {} in {}..={}", value, min, max);
        }

        assert_eq!(max_body_len(0, 0, 0), ENVELOPE_LEN);
        assert!(max_body_len(60_000_000, i32::MIN, i32::MAX) > MAX_FRAME_LEN);
        assert!(max_body_len(60_000_000, -100, 100) < MAX_FRAME_LEN);
    }

    #[test]
    fn test_message_kinds_are_distinct() {
        let kinds = [
            Message::SortRequest(SortRequest { values: vec![] }).kind(),
            Message::SortResponse(SortResponse { values: vec![] }).kind(),
            Message::Terminate.kind(),
        ];
        assert_ne!(kinds[0], kinds[1]);
        assert_ne!(kinds[1], kinds[2]);
        assert_ne!(kinds[0], kinds[2]);

        // Same payload, different tag, different bytes
        let req = serialize_message(&Message::SortRequest(SortRequest { values: vec![1] })).unwrap();
        let resp = serialize_message(&Message::SortResponse(SortResponse { values: vec![1] })).unwrap();
        assert_ne!(req, resp);
    }

    #[test]
    fn test_message_framing() {
        let bytes = serialize_message(&Message::Terminate).unwrap();

        assert!(bytes.len() >= 4);
        let msg_len = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
        assert_eq!(bytes.len(), 4 + msg_len);
    }

    #[test]
    fn test_deserialize_incomplete_frame() {
        let bytes = serialize_message(&Message::SortRequest(SortRequest { values: vec![1, 2, 3] })).unwrap();
        let err = deserialize_message(&bytes[..bytes.len() - 1]).unwrap_err();
        assert!(matches!(err, ProtocolError::Io(_)));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_deserialize_oversized_header() {
        let header = (MAX_FRAME_LEN as u32 + 1).to_le_bytes();
        let err = deserialize_message(&header).unwrap_err();
        assert!(matches!(err, ProtocolError::FrameTooLarge { .. }));
    }

    #[tokio::test]
    async fn test_stream_round_trip_in_order() {
        let (mut client, mut server) = tokio::io::duplex(64 * 1024);

        let first = Message::SortRequest(SortRequest { values: vec![3, 2, 1] });
        write_message(&mut client, &first).await.unwrap();
        write_message(&mut client, &Message::Terminate).await.unwrap();

        assert_eq!(read_message(&mut server).await.unwrap(), first);
        assert_eq!(read_message(&mut server).await.unwrap(), Message::Terminate);
    }

    #[tokio::test]
    async fn test_clean_eof_is_connection_closed() {
        let (client, mut server) = tokio::io::duplex(1024);
        drop(client);

        let err = read_message(&mut server).await.unwrap_err();
        assert!(matches!(err, ProtocolError::ConnectionClosed));
    }

    #[tokio::test]
    async fn test_undecodable_body_leaves_stream_aligned() {
        let (mut client, mut server) = tokio::io::duplex(1024);

        // Valid length prefix followed by garbage body
        let garbage = [0xc1u8, 0xc1, 0xc1];
        client.write_all(&(garbage.len() as u32).to_le_bytes()).await.unwrap();
        client.write_all(&garbage).await.unwrap();
        write_message(&mut client, &Message::Terminate).await.unwrap();

        let err = read_message(&mut server).await.unwrap_err();
        assert!(err.is_recoverable());
        assert_eq!(read_message(&mut server).await.unwrap(), Message::Terminate);
    }
}
