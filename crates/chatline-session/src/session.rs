//! The client session: one connection, one read loop, one lifetime.
//!
//! A [`Session`] is single-use. It is born open (by a successful connect),
//! lives while the connection does, and ends closed. There is no reconnect:
//! a new login attempt builds a new session.
//!
//! ```text
//!   Idle ──(dial)──→ Connecting ──(ok)──→ Open ──(close / EOF / error)──→ Closed
//!                        │
//!                        └──(error)──→ ConnectError returned, no session
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};

use chatline_protocol::{Codec, JsonCodec, OutgoingRequest};
use chatline_transport::{
    Connection, ConnectionId, Connector, DEFAULT_MAX_FRAME_LEN,
    StreamConnection, TcpConnector,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::{ConnectError, SendError, SessionError, SessionEvent, SessionEvents};

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Configuration for a session.
///
/// There is no timeout setting: `connect` waits as long as the operating
/// system does, and [`Session::close`] is the only way to cancel.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How many events may queue up before the read loop waits for the
    /// consumer. Values below 1 are treated as 1.
    ///
    /// Default: 64.
    pub event_buffer: usize,

    /// Longest accepted inbound frame in bytes. Longer frames are skipped
    /// and reported through `on_exception`.
    ///
    /// Default: 64 KiB.
    pub max_frame_len: usize,
}

impl SessionConfig {
    /// Sets [`event_buffer`](Self::event_buffer).
    pub fn event_buffer(mut self, capacity: usize) -> Self {
        self.event_buffer = capacity;
        self
    }

    /// Sets [`max_frame_len`](Self::max_frame_len).
    pub fn max_frame_len(mut self, bytes: usize) -> Self {
        self.max_frame_len = bytes;
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            event_buffer: 64,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        }
    }
}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// Where a session is in its lifecycle.
///
/// Transitions only move forward; `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionState {
    /// Not yet dialing.
    Idle = 0,
    /// Dialing the server.
    Connecting = 1,
    /// Connected; requests can be sent.
    Open = 2,
    /// Over. Nothing can be sent and no events follow.
    Closed = 3,
}

impl SessionState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Idle,
            1 => Self::Connecting,
            2 => Self::Open,
            _ => Self::Closed,
        }
    }
}

/// Lock-free holder for a [`SessionState`].
#[derive(Debug)]
struct StateCell(AtomicU8);

impl StateCell {
    fn new(state: SessionState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    fn get(&self) -> SessionState {
        SessionState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Moves `from → to`. Returns `false` if the state was not `from`,
    /// which is how concurrent closers agree on a single winner.
    fn transition(&self, from: SessionState, to: SessionState) -> bool {
        self.0
            .compare_exchange(
                from as u8,
                to as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// State shared between the session handles and the read loop.
struct Inner<C, K> {
    conn: C,
    codec: K,
    state: StateCell,
    shutdown: CancellationToken,
    /// A write failure recorded by `send`, reported by the read loop on
    /// its way out.
    fault: Mutex<Option<SessionError>>,
}

impl<C: Connection, K: Codec> Inner<C, K> {
    /// Moves `Open → Closed` and stops the read loop. Returns `false` if
    /// someone else already closed the session.
    fn begin_close(&self) -> bool {
        if !self.state.transition(SessionState::Open, SessionState::Closed) {
            return false;
        }
        self.shutdown.cancel();
        true
    }

    async fn close_connection(&self) {
        if let Err(e) = self.conn.close().await {
            tracing::debug!(id = %self.conn.id(), error = %e, "error while closing connection");
        }
    }

    fn record_fault(&self, fault: SessionError) {
        if let Ok(mut slot) = self.fault.lock() {
            slot.get_or_insert(fault);
        }
    }

    fn take_fault(&self) -> Option<SessionError> {
        self.fault.lock().ok().and_then(|mut slot| slot.take())
    }
}

/// A live connection to the chat server.
///
/// `Session` is a cheap handle: clone it to send from several tasks. All
/// clones refer to the same connection, and closing any of them closes it.
///
/// # Example
///
/// ```rust,no_run
/// use chatline_protocol::OutgoingRequest;
/// use chatline_session::{Session, SessionEvent};
///
/// # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
/// let (session, mut events) = Session::connect("127.0.0.1:8181").await?;
///
/// while let Some(event) = events.next().await {
///     match event {
///         SessionEvent::Ready => {
///             session.send(&OutgoingRequest::auth("alice", "pw")).await?;
///         }
///         SessionEvent::Message(msg) => println!("{msg:?}"),
///         SessionEvent::Exception(e) => eprintln!("{e}"),
///         SessionEvent::Closed => break,
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub struct Session<C = StreamConnection, K = JsonCodec> {
    inner: Arc<Inner<C, K>>,
}

impl<C, K> Clone for Session<C, K> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: Connection, K: Codec> fmt::Debug for Session<C, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.inner.conn.id())
            .field("state", &self.inner.state.get())
            .finish()
    }
}

impl Session {
    /// Connects over TCP to `addr` (`host:port`) with default settings.
    ///
    /// # Errors
    /// Returns [`ConnectError`] if the server cannot be reached. No read
    /// loop is started in that case.
    pub async fn connect(
        addr: &str,
    ) -> Result<(Self, SessionEvents), ConnectError> {
        Self::connect_with_config(addr, SessionConfig::default()).await
    }

    /// Connects over TCP to `addr` with the given configuration.
    ///
    /// # Errors
    /// Returns [`ConnectError`] if the server cannot be reached.
    pub async fn connect_with_config(
        addr: &str,
        config: SessionConfig,
    ) -> Result<(Self, SessionEvents), ConnectError> {
        let connector = TcpConnector::new(config.max_frame_len);
        Self::dial(&connector, addr, JsonCodec, config).await
    }
}

impl<C: Connection, K: Codec> Session<C, K> {
    /// Connects through an arbitrary [`Connector`] and [`Codec`].
    ///
    /// # Errors
    /// Returns [`ConnectError`] if the connector fails.
    pub async fn dial<T>(
        connector: &T,
        addr: &str,
        codec: K,
        config: SessionConfig,
    ) -> Result<(Self, SessionEvents), ConnectError>
    where
        T: Connector<Connection = C>,
    {
        let state = StateCell::new(SessionState::Idle);
        state.transition(SessionState::Idle, SessionState::Connecting);
        tracing::debug!(addr, "session connecting");

        let conn = match connector.connect(addr).await {
            Ok(conn) => conn,
            Err(e) => {
                tracing::warn!(addr, error = %e, "connect failed");
                return Err(ConnectError::Transport(e));
            }
        };
        Ok(Self::start(conn, codec, config, state))
    }

    /// Wraps a connection that is already established.
    ///
    /// Must be called from within a Tokio runtime: the read loop is spawned
    /// immediately.
    pub fn open(
        conn: C,
        codec: K,
        config: SessionConfig,
    ) -> (Self, SessionEvents) {
        Self::start(conn, codec, config, StateCell::new(SessionState::Connecting))
    }

    fn start(
        conn: C,
        codec: K,
        config: SessionConfig,
        state: StateCell,
    ) -> (Self, SessionEvents) {
        let (tx, rx) = mpsc::channel(config.event_buffer.max(1));
        state.transition(SessionState::Connecting, SessionState::Open);

        // Queued before the loop exists, so nothing can overtake it.
        tx.try_send(SessionEvent::Ready)
            .expect("fresh channel has room for one event");

        let inner = Arc::new(Inner {
            conn,
            codec,
            state,
            shutdown: CancellationToken::new(),
            fault: Mutex::new(None),
        });
        tracing::info!(id = %inner.conn.id(), "session open");

        let guard = ReadLoopGuard {
            inner: Arc::clone(&inner),
            tx,
            completed: false,
        };
        tokio::spawn(read_loop(guard));

        (Self { inner }, SessionEvents::new(rx))
    }

    /// Encodes `request` and writes it as one frame.
    ///
    /// Safe to call from any number of tasks at once; frames never
    /// interleave. Listener callbacks may call it too, since they run on
    /// the consumer and not on the read loop.
    ///
    /// # Errors
    /// - [`SendError::NotOpen`] if the session is closed. Never blocks.
    /// - [`SendError::Encode`] if the request could not be serialized.
    /// - [`SendError::Transport`] if the write failed. The session is now
    ///   closed and the listener will see `on_exception` then
    ///   `on_socket_closed`.
    pub async fn send(&self, request: &OutgoingRequest) -> Result<(), SendError> {
        let state = self.state();
        if state != SessionState::Open {
            return Err(SendError::NotOpen(state));
        }
        let frame = self.inner.codec.encode(request)?;

        match self.inner.conn.send(&frame).await {
            Ok(()) => {
                tracing::debug!(id = %self.id(), kind = request.kind(), "request sent");
                Ok(())
            }
            Err(e) => {
                // Lost a race with `close()`: the write failed because we
                // shut the connection ourselves.
                if self.state() != SessionState::Open {
                    return Err(SendError::NotOpen(self.state()));
                }
                tracing::error!(id = %self.id(), error = %e, "write failed, closing session");
                self.inner.record_fault(SessionError::WriteFailed(e.to_string()));
                if self.inner.begin_close() {
                    self.inner.close_connection().await;
                }
                Err(SendError::Transport(e))
            }
        }
    }

    /// Closes the session.
    ///
    /// Idempotent: closing a closed session does nothing. The pending read
    /// is interrupted right away; the listener sees `on_socket_closed`
    /// exactly once, after any events that were already queued.
    pub async fn close(&self) {
        if !self.inner.begin_close() {
            tracing::trace!(id = %self.id(), "close on closed session ignored");
            return;
        }
        tracing::info!(id = %self.id(), "closing session");
        self.inner.close_connection().await;
    }

    /// The current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.inner.state.get()
    }

    /// Returns `true` while requests can be sent.
    pub fn is_open(&self) -> bool {
        self.state() == SessionState::Open
    }

    /// The identifier of the underlying connection.
    pub fn id(&self) -> ConnectionId {
        self.inner.conn.id()
    }
}

// ---------------------------------------------------------------------------
// Read loop
// ---------------------------------------------------------------------------

/// Owns the event sender for the read loop and cleans up if the loop
/// never reaches its normal exit.
///
/// On a normal exit the loop finishes itself and disarms the guard. The
/// loop can also end early: it panics, or its task is dropped because the
/// task was aborted or the runtime shut down. Either way `Drop` closes the
/// session and spawns the connection close, since `Drop` can't await. Only
/// a panic is reported to the consumer; a dropped task ends with a plain
/// `Closed`.
struct ReadLoopGuard<C: Connection, K: Codec> {
    inner: Arc<Inner<C, K>>,
    tx: mpsc::Sender<SessionEvent>,
    completed: bool,
}

impl<C: Connection, K: Codec> ReadLoopGuard<C, K> {
    /// Queues an event, giving up if the session is being closed or the
    /// consumer went away. Returns `false` in those cases.
    async fn deliver(&self, event: SessionEvent) -> bool {
        tokio::select! {
            biased;
            _ = self.inner.shutdown.cancelled() => false,
            sent = self.tx.send(event) => sent.is_ok(),
        }
    }

    /// Queues a terminal event. Not interruptible by `close()`: the event
    /// explains why the session is ending.
    async fn deliver_final(&self, event: SessionEvent) {
        if self.tx.send(event).await.is_err() {
            tracing::debug!("event receiver dropped before final event");
        }
    }
}

impl<C: Connection, K: Codec> Drop for ReadLoopGuard<C, K> {
    fn drop(&mut self) {
        if self.completed {
            return;
        }
        let id = self.inner.conn.id();
        self.inner.begin_close();
        if std::thread::panicking() {
            tracing::error!(%id, "read loop panicked");
            // Best-effort: the channel may be full.
            if self
                .tx
                .try_send(SessionEvent::Exception(SessionError::ReadLoopPanicked))
                .is_err()
            {
                tracing::error!(%id, "could not report read loop panic to consumer");
            }
        } else {
            tracing::debug!(%id, "read loop task dropped before finishing");
        }
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let inner = Arc::clone(&self.inner);
            handle.spawn(async move {
                inner.close_connection().await;
            });
        }
    }
}

async fn read_loop<C: Connection, K: Codec>(mut guard: ReadLoopGuard<C, K>) {
    let id = guard.inner.conn.id();
    tracing::debug!(%id, "read loop started");

    loop {
        let received = tokio::select! {
            biased;
            _ = guard.inner.shutdown.cancelled() => break,
            _ = guard.tx.closed() => {
                tracing::debug!(%id, "event receiver dropped, stopping");
                break;
            }
            received = guard.inner.conn.recv() => received,
        };

        let event = match received {
            Ok(Some(frame)) => {
                let event = guard.inner.codec.decode(&frame);
                if event.is_malformed() {
                    tracing::warn!(%id, frame = %frame, "malformed frame");
                } else {
                    tracing::trace!(%id, "frame received");
                }
                SessionEvent::Message(event)
            }
            Ok(None) => {
                tracing::info!(%id, "peer closed the connection");
                break;
            }
            Err(e) if e.is_recoverable() => {
                tracing::warn!(%id, error = %e, "skipped inbound frame");
                SessionEvent::Exception(SessionError::Transport(e))
            }
            Err(e) => {
                if !guard.inner.shutdown.is_cancelled() {
                    tracing::warn!(%id, error = %e, "read failed");
                    guard
                        .deliver_final(SessionEvent::Exception(SessionError::Transport(e)))
                        .await;
                }
                break;
            }
        };

        if !guard.deliver(event).await {
            break;
        }
    }

    // A failed `send` closed the session; tell the consumer why.
    if let Some(fault) = guard.inner.take_fault() {
        guard.deliver_final(SessionEvent::Exception(fault)).await;
    }

    guard.inner.begin_close();
    guard.inner.close_connection().await;
    guard.completed = true;
    tracing::debug!(%id, "read loop finished");
    // Dropping the guard drops the only sender: the consumer sees `Closed`.
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_cell_transition_only_from_expected_state() {
        let cell = StateCell::new(SessionState::Open);

        assert!(cell.transition(SessionState::Open, SessionState::Closed));
        assert!(!cell.transition(SessionState::Open, SessionState::Closed));
        assert_eq!(cell.get(), SessionState::Closed);
    }

    #[test]
    fn test_state_round_trips_through_u8() {
        for state in [
            SessionState::Idle,
            SessionState::Connecting,
            SessionState::Open,
            SessionState::Closed,
        ] {
            assert_eq!(SessionState::from_u8(state as u8), state);
        }
    }

    #[test]
    fn test_config_defaults_and_setters() {
        let config = SessionConfig::default();
        assert_eq!(config.event_buffer, 64);
        assert_eq!(config.max_frame_len, DEFAULT_MAX_FRAME_LEN);

        let config = config.event_buffer(4).max_frame_len(128);
        assert_eq!(config.event_buffer, 4);
        assert_eq!(config.max_frame_len, 128);
    }
}
