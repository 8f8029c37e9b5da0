//! TCP dialer producing line-framed connections.

use tokio::net::TcpStream;

use crate::codec::DEFAULT_MAX_FRAME_LEN;
use crate::{Connector, StreamConnection, TransportError};

/// A [`Connector`] that dials plain TCP.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    max_frame_len: usize,
}

impl TcpConnector {
    /// Creates a connector whose connections accept frames of up to
    /// `max_frame_len` bytes.
    pub fn new(max_frame_len: usize) -> Self {
        Self { max_frame_len }
    }
}

impl Default for TcpConnector {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_LEN)
    }
}

impl Connector for TcpConnector {
    type Connection = StreamConnection;

    async fn connect(
        &self,
        addr: &str,
    ) -> Result<StreamConnection, TransportError> {
        let stream = TcpStream::connect(addr).await.map_err(|source| {
            TransportError::ConnectFailed {
                addr: addr.to_string(),
                source,
            }
        })?;
        // Chat frames are small and latency-sensitive.
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(error = %e, "could not disable Nagle");
        }
        let peer = stream.peer_addr().ok();
        let conn = StreamConnection::new(stream, self.max_frame_len);
        tracing::info!(id = %crate::Connection::id(&conn), ?peer, "TCP connection established");
        Ok(conn)
    }
}
