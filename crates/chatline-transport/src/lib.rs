//! Transport abstraction layer for Chatline.
//!
//! Provides the [`Connector`] and [`Connection`] traits that abstract over
//! how a client reaches the chat server, plus the newline-delimited
//! [`FrameCodec`] that turns a byte stream into discrete frames.
//!
//! # Feature Flags
//!
//! - `tcp` (default): plain TCP dialing via [`TcpConnector`]

mod codec;
mod connection;
mod error;
#[cfg(feature = "tcp")]
mod tcp;

pub use codec::{DEFAULT_MAX_FRAME_LEN, DELIMITER, FrameCodec, InboundFrame};
pub use connection::StreamConnection;
pub use error::TransportError;
#[cfg(feature = "tcp")]
pub use tcp::TcpConnector;

use std::fmt;
use std::future::Future;

/// Tags one connection in log output. Unique within the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The counter value behind the tag.
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Dials a remote address and produces a [`Connection`].
pub trait Connector: Send + Sync + 'static {
    /// The connection type produced by this connector.
    type Connection: Connection;

    /// Establishes a connection to `addr` (`host:port`).
    fn connect(
        &self,
        addr: &str,
    ) -> impl Future<Output = Result<Self::Connection, TransportError>> + Send;
}

/// A single connection that exchanges text frames.
///
/// The returned futures are `Send` so a connection can be driven from a
/// spawned task (the session's read loop) while other tasks send.
pub trait Connection: Send + Sync + 'static {
    /// Sends one frame to the remote peer.
    ///
    /// Concurrent calls never interleave: each frame reaches the wire whole.
    fn send(
        &self,
        frame: &str,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Receives the next frame from the remote peer.
    ///
    /// Returns `Ok(None)` when the peer closed the stream cleanly. An error
    /// for which [`TransportError::is_recoverable`] holds leaves the
    /// connection usable.
    fn recv(
        &self,
    ) -> impl Future<Output = Result<Option<String>, TransportError>> + Send;

    /// Closes the connection. Closing twice is a no-op.
    fn close(&self) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_formats_as_log_tag() {
        let id = ConnectionId::new(7);
        assert_eq!(id.as_u64(), 7);
        assert_eq!(id.to_string(), "conn-7");
        assert_eq!(format!("{id:?}"), "ConnectionId(7)");
    }

    #[test]
    fn test_connection_ids_compare_by_value() {
        assert_eq!(ConnectionId::new(3), ConnectionId::new(3));
        assert_ne!(ConnectionId::new(3), ConnectionId::new(4));
    }
}
