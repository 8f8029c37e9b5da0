//! Event delivery from the read loop to the consumer.

use chatline_protocol::IncomingEvent;
use tokio::sync::mpsc;

use crate::{SessionError, SessionListener};

/// One thing that happened on a session, in the order it happened.
#[derive(Debug)]
pub enum SessionEvent {
    /// The connection is established. Always the first event.
    Ready,
    /// A frame was received and decoded.
    Message(IncomingEvent),
    /// An anomaly. See [`SessionError::is_fatal`].
    Exception(SessionError),
    /// The session is over. Always the last event, delivered exactly once.
    Closed,
}

impl SessionEvent {
    /// Invokes the matching [`SessionListener`] callback.
    pub async fn dispatch_to<L: SessionListener>(self, listener: &mut L) {
        match self {
            Self::Ready => listener.on_socket_ready().await,
            Self::Message(event) => listener.on_message_received(event).await,
            Self::Exception(error) => listener.on_exception(error).await,
            Self::Closed => listener.on_socket_closed().await,
        }
    }
}

/// The consumer's end of a session's event stream.
///
/// The read loop owns the only sender. When the loop ends, for
/// whatever reason, the sender is dropped, and once the buffered events
/// are drained this pump yields a single [`SessionEvent::Closed`].
/// After that it yields `None` forever.
///
/// The channel is bounded: a consumer that stops draining slows the read
/// loop down instead of letting memory grow, and [`Session::close`]
/// still takes effect immediately.
///
/// [`Session::close`]: crate::Session::close
#[derive(Debug)]
pub struct SessionEvents {
    rx: mpsc::Receiver<SessionEvent>,
    finished: bool,
}

impl SessionEvents {
    pub(crate) fn new(rx: mpsc::Receiver<SessionEvent>) -> Self {
        Self {
            rx,
            finished: false,
        }
    }

    /// Waits for the next event. `None` once `Closed` has been yielded.
    pub async fn next(&mut self) -> Option<SessionEvent> {
        if self.finished {
            return None;
        }
        let event = self.rx.recv().await;
        Some(self.terminate_on_end(event))
    }

    /// Blocking variant of [`next`](Self::next) for consumers that run on
    /// a plain thread (a UI event loop, for instance).
    ///
    /// # Panics
    /// Panics if called from inside an async runtime.
    pub fn blocking_next(&mut self) -> Option<SessionEvent> {
        if self.finished {
            return None;
        }
        let event = self.rx.blocking_recv();
        Some(self.terminate_on_end(event))
    }

    /// Returns an already-queued event without waiting, if there is one.
    ///
    /// Useful for UI loops that poll once per frame.
    pub fn try_next(&mut self) -> Option<SessionEvent> {
        if self.finished {
            return None;
        }
        match self.rx.try_recv() {
            Ok(event) => Some(event),
            Err(mpsc::error::TryRecvError::Empty) => None,
            Err(mpsc::error::TryRecvError::Disconnected) => {
                Some(self.terminate_on_end(None))
            }
        }
    }

    /// Waits for one event and hands it to `listener`.
    ///
    /// Returns `false` once the session is over and `on_socket_closed` has
    /// already been delivered.
    pub async fn dispatch<L: SessionListener>(
        &mut self,
        listener: &mut L,
    ) -> bool {
        match self.next().await {
            Some(event) => {
                event.dispatch_to(listener).await;
                true
            }
            None => false,
        }
    }

    /// Delivers every remaining event to `listener`, ending after
    /// `on_socket_closed`.
    pub async fn run<L: SessionListener>(&mut self, listener: &mut L) {
        while self.dispatch(listener).await {}
    }

    /// Returns `true` once `Closed` has been yielded.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn terminate_on_end(&mut self, event: Option<SessionEvent>) -> SessionEvent {
        match event {
            Some(event) => event,
            None => {
                self.finished = true;
                SessionEvent::Closed
            }
        }
    }
}
