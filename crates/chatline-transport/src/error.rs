/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Dialing the remote address failed.
    #[error("connect to {addr} failed: {source}")]
    ConnectFailed {
        /// The address that was dialed.
        addr: String,
        /// The underlying socket error.
        #[source]
        source: std::io::Error,
    },

    /// The connection was closed.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// Sending data failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Receiving data failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// An incoming frame exceeded the configured limit and was discarded.
    #[error("frame exceeded {limit} bytes and was discarded")]
    FrameTooLong {
        /// The configured maximum frame length.
        limit: usize,
    },
}

impl TransportError {
    /// Returns `true` if the connection is still usable after this error.
    ///
    /// Only [`FrameTooLong`](Self::FrameTooLong) qualifies: the framing codec
    /// skips to the next delimiter and keeps reading.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::FrameTooLong { .. })
    }
}
