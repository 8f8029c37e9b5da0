//! A framed [`Connection`] over any async byte stream.

use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::sync::CancellationToken;

use crate::{Connection, ConnectionId, FrameCodec, InboundFrame, TransportError};

/// Source of [`ConnectionId`]s for framed connections.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

type BoxedReader = Pin<Box<dyn AsyncRead + Send>>;
type BoxedWriter = Pin<Box<dyn AsyncWrite + Send>>;

/// A line-framed connection over an arbitrary `AsyncRead + AsyncWrite`.
///
/// The stream is split into halves, each behind its own lock: the read loop
/// holds the reader while it waits for data, and senders contend only for
/// the writer. Holding the writer lock for a whole `send` is what keeps two
/// frames from interleaving on the wire.
///
/// [`close`](Connection::close) interrupts any `send` or `recv` that is
/// still waiting, so a peer that stopped reading cannot hold the connection
/// open.
///
/// TCP connections come from [`TcpConnector`](crate::TcpConnector); tests
/// typically wrap one end of `tokio::io::duplex`.
pub struct StreamConnection {
    id: ConnectionId,
    limit: usize,
    reader: Mutex<FramedRead<BoxedReader, FrameCodec>>,
    writer: Mutex<FramedWrite<BoxedWriter, FrameCodec>>,
    closed: AtomicBool,
    closing: CancellationToken,
}

impl StreamConnection {
    /// Wraps `stream`, accepting inbound frames of up to `max_frame_len` bytes.
    pub fn new<S>(stream: S, max_frame_len: usize) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (read_half, write_half) = tokio::io::split(stream);
        let reader: BoxedReader = Box::pin(read_half);
        let writer: BoxedWriter = Box::pin(write_half);
        let id = ConnectionId::new(
            NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
        );
        tracing::debug!(%id, max_frame_len, "framed connection created");

        Self {
            id,
            limit: max_frame_len,
            reader: Mutex::new(FramedRead::new(
                reader,
                FrameCodec::new(max_frame_len),
            )),
            writer: Mutex::new(FramedWrite::new(
                writer,
                FrameCodec::new(max_frame_len),
            )),
            closed: AtomicBool::new(false),
            closing: CancellationToken::new(),
        }
    }
}

fn closed_locally() -> TransportError {
    TransportError::ConnectionClosed("connection closed locally".into())
}

impl Connection for StreamConnection {
    async fn send(&self, frame: &str) -> Result<(), TransportError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(closed_locally());
        }
        tokio::select! {
            biased;
            _ = self.closing.cancelled() => Err(closed_locally()),
            // `SinkExt::send` encodes and flushes before releasing the lock.
            sent = async { self.writer.lock().await.send(frame).await } => {
                sent.map_err(TransportError::SendFailed)
            }
        }
    }

    async fn recv(&self) -> Result<Option<String>, TransportError> {
        let next = tokio::select! {
            biased;
            _ = self.closing.cancelled() => return Ok(None),
            next = async { self.reader.lock().await.next().await } => next,
        };
        match next {
            Some(Ok(InboundFrame::Text(text))) => Ok(Some(text)),
            Some(Ok(InboundFrame::Oversized)) => {
                Err(TransportError::FrameTooLong { limit: self.limit })
            }
            Some(Err(e)) => Err(TransportError::ReceiveFailed(e)),
            None => Ok(None),
        }
    }

    async fn close(&self) -> Result<(), TransportError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        tracing::debug!(id = %self.id, "closing connection");
        // Wakes a blocked `send`, which then drops the writer lock.
        self.closing.cancel();

        // Whatever a cancelled send left buffered is discarded, not flushed.
        let mut writer = self.writer.lock().await;
        writer
            .get_mut()
            .shutdown()
            .await
            .map_err(TransportError::SendFailed)
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    use super::*;

    #[tokio::test]
    async fn test_send_writes_delimited_frame() {
        let (local, mut remote) = tokio::io::duplex(1024);
        let conn = StreamConnection::new(local, 1024);

        conn.send("hello").await.expect("send should succeed");

        let mut buf = [0u8; 6];
        remote.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"hello\n");
    }

    #[tokio::test]
    async fn test_recv_returns_frames_then_none_on_eof() {
        let (local, mut remote) = tokio::io::duplex(1024);
        let conn = StreamConnection::new(local, 1024);

        remote.write_all(b"one\ntwo\n").await.unwrap();
        drop(remote);

        assert_eq!(conn.recv().await.unwrap().as_deref(), Some("one"));
        assert_eq!(conn.recv().await.unwrap().as_deref(), Some("two"));
        assert!(conn.recv().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_recv_oversized_frame_is_recoverable() {
        let (local, mut remote) = tokio::io::duplex(1024);
        let conn = StreamConnection::new(local, 4);

        remote.write_all(b"much too long\nok\n").await.unwrap();

        let err = conn.recv().await.unwrap_err();
        assert!(err.is_recoverable());
        assert_eq!(conn.recv().await.unwrap().as_deref(), Some("ok"));
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_blocks_later_sends() {
        let (local, _remote) = tokio::io::duplex(1024);
        let conn = StreamConnection::new(local, 1024);

        conn.close().await.expect("first close");
        conn.close().await.expect("second close is a no-op");

        let result = conn.send("late").await;
        assert!(matches!(result, Err(TransportError::ConnectionClosed(_))));
    }

    #[tokio::test]
    async fn test_close_signals_eof_to_peer() {
        let (local, mut remote) = tokio::io::duplex(1024);
        let conn = StreamConnection::new(local, 1024);

        conn.close().await.unwrap();

        let mut rest = Vec::new();
        let n = remote.read_to_end(&mut rest).await.unwrap();
        assert_eq!(n, 0);
    }

    #[tokio::test]
    async fn test_close_interrupts_send_blocked_on_full_pipe() {
        // The peer never reads, so a large frame fills the pipe and blocks.
        let (local, _remote) = tokio::io::duplex(64);
        let conn = std::sync::Arc::new(StreamConnection::new(local, 1024));

        let sender = {
            let conn = std::sync::Arc::clone(&conn);
            tokio::spawn(async move { conn.send(&"x".repeat(10_000)).await })
        };
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(!sender.is_finished(), "send should be blocked");

        tokio::time::timeout(std::time::Duration::from_secs(2), conn.close())
            .await
            .expect("close should not wait for the blocked send")
            .expect("close should succeed");

        let result = tokio::time::timeout(std::time::Duration::from_secs(2), sender)
            .await
            .expect("blocked send should be woken")
            .unwrap();
        assert!(matches!(result, Err(TransportError::ConnectionClosed(_))));
    }

    #[tokio::test]
    async fn test_close_wakes_pending_recv() {
        let (local, _remote) = tokio::io::duplex(64);
        let conn = std::sync::Arc::new(StreamConnection::new(local, 1024));

        let receiver = {
            let conn = std::sync::Arc::clone(&conn);
            tokio::spawn(async move { conn.recv().await })
        };
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        conn.close().await.unwrap();

        let received = tokio::time::timeout(std::time::Duration::from_secs(2), receiver)
            .await
            .expect("pending recv should be woken")
            .unwrap();
        assert!(received.unwrap().is_none());
    }

    #[test]
    fn test_connection_ids_are_unique() {
        let (a, _) = tokio::io::duplex(8);
        let (b, _) = tokio::io::duplex(8);
        let first = StreamConnection::new(a, 8);
        let second = StreamConnection::new(b, 8);
        assert_ne!(first.id(), second.id());
    }
}
