//! Unified error type for the Chatline client.

use chatline_protocol::ProtocolError;
use chatline_session::{ConnectError, SendError, SessionError};
use chatline_transport::TransportError;

/// Every failure a chat client can hand to its frontend.
///
/// [`supervise`](crate::supervise) turns any of these into a message on
/// the frontend's error display. Layer errors convert with `?`.
#[derive(Debug, thiserror::Error)]
pub enum ChatlineError {
    /// The byte stream underneath the session failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A request could not be encoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The server could not be reached.
    #[error(transparent)]
    Connect(#[from] ConnectError),

    /// A request could not be sent.
    #[error(transparent)]
    Send(#[from] SendError),

    /// An anomaly reported by a running session.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Local I/O outside the session (reading user input, for instance).
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
