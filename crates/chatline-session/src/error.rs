//! Error types for the session layer.
//!
//! Three channels, three types:
//!
//! - [`ConnectError`]: returned from `connect`, fatal to that attempt only.
//! - [`SendError`]: returned from `send`.
//! - [`SessionError`]: delivered to the listener through `on_exception`
//!   while the session runs; never returned from a method.

use chatline_protocol::ProtocolError;
use chatline_transport::TransportError;

use crate::SessionState;

/// The transport could not be established.
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    /// Dialing the server failed (refused, unreachable, bad address).
    #[error("could not connect: {0}")]
    Transport(#[from] TransportError),
}

/// A request could not be sent.
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    /// The session is not open. It was closed locally or by the peer, or a
    /// transport failure ended it.
    #[error("session is not open (state: {0:?})")]
    NotOpen(SessionState),

    /// The request could not be encoded.
    #[error(transparent)]
    Encode(#[from] ProtocolError),

    /// Writing to the connection failed. The session is closed as a result.
    #[error("write failed: {0}")]
    Transport(#[source] TransportError),
}

/// An anomaly reported to the listener while the session runs.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Reading from the connection failed.
    ///
    /// Fatal unless [`TransportError::is_recoverable`] holds (an oversized
    /// frame that was skipped).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A `send` hit an I/O error and tore the session down.
    #[error("write failed: {0}")]
    WriteFailed(String),

    /// The read loop panicked. The session is closed.
    #[error("read loop panicked")]
    ReadLoopPanicked,
}

impl SessionError {
    /// Returns `true` if the session is closing because of this error.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Transport(e) => !e.is_recoverable(),
            Self::WriteFailed(_) | Self::ReadLoopPanicked => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oversized_frame_is_not_fatal() {
        let err = SessionError::from(TransportError::FrameTooLong { limit: 16 });
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_read_failure_is_fatal() {
        let io = std::io::Error::from(std::io::ErrorKind::ConnectionReset);
        let err = SessionError::from(TransportError::ReceiveFailed(io));
        assert!(err.is_fatal());
        assert!(SessionError::WriteFailed("broken pipe".into()).is_fatal());
    }

    #[test]
    fn test_send_error_not_open_names_state() {
        let err = SendError::NotOpen(SessionState::Closed);
        assert_eq!(err.to_string(), "session is not open (state: Closed)");
    }
}
