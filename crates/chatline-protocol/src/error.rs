//! Error types for the protocol layer.
//!
//! Each crate in Chatline defines its own error enum. When you see a
//! `ProtocolError`, the problem is in serialization, not in networking or
//! session state.
//!
//! Note that decoding a *server* frame never produces a `ProtocolError`:
//! bad input becomes [`IncomingEvent::Malformed`](crate::IncomingEvent)
//! instead, because a garbled frame is data for the user, not a fault.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into wire text).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization of a client request failed.
    ///
    /// Only the server-side mirror ([`Codec::decode_request`](crate::Codec))
    /// reports this.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The message is invalid at the protocol level.
    ///
    /// Used when a value cannot be put on the wire at all, e.g. an
    /// unsuccessful result without a reason.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
