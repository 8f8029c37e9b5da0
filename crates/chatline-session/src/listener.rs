//! The consumer side of a session: what it must react to.
//!
//! The session never calls into the consumer directly. Its read loop pushes
//! [`SessionEvent`](crate::SessionEvent)s onto a bounded channel, and the
//! consumer drains that channel on its own task through
//! [`SessionEvents`](crate::SessionEvents), which invokes these callbacks.
//! So the callbacks run wherever the consumer drives the pump (a UI loop
//! or a test, say) and never on the read loop.

use std::future::Future;

use chatline_protocol::IncomingEvent;

use crate::SessionError;

/// Reactions a session consumer implements.
///
/// Ordering guaranteed by the pump:
///
/// ```text
/// on_socket_ready ─→ (on_message_received | on_exception)* ─→ on_socket_closed
/// ```
///
/// - `on_socket_ready` comes first, exactly once.
/// - `on_message_received` comes once per frame, in receipt order,
///   `Malformed` frames included.
/// - `on_exception` may come any number of times. A recoverable anomaly
///   leaves the session open; a fatal one is followed by `on_socket_closed`.
/// - `on_socket_closed` comes exactly once and nothing follows it.
///
/// The returned futures are `Send` so a pump can run on a spawned task.
///
/// # Example
///
/// ```rust
/// use chatline_protocol::IncomingEvent;
/// use chatline_session::{SessionError, SessionListener};
///
/// #[derive(Default)]
/// struct Printer {
///     lines: Vec<String>,
/// }
///
/// impl SessionListener for Printer {
///     async fn on_socket_ready(&mut self) {
///         self.lines.push("connected".into());
///     }
///
///     async fn on_message_received(&mut self, event: IncomingEvent) {
///         self.lines.push(format!("{event:?}"));
///     }
///
///     async fn on_socket_closed(&mut self) {
///         self.lines.push("closed".into());
///     }
///
///     async fn on_exception(&mut self, error: SessionError) {
///         self.lines.push(format!("error: {error}"));
///     }
/// }
/// ```
pub trait SessionListener {
    /// The connection is up. Typically the consumer logs in here.
    fn on_socket_ready(&mut self) -> impl Future<Output = ()> + Send;

    /// One frame arrived and was decoded.
    fn on_message_received(
        &mut self,
        event: IncomingEvent,
    ) -> impl Future<Output = ()> + Send;

    /// The session is over. Terminal.
    fn on_socket_closed(&mut self) -> impl Future<Output = ()> + Send;

    /// Something went wrong that is not a clean close.
    fn on_exception(
        &mut self,
        error: SessionError,
    ) -> impl Future<Output = ()> + Send;
}
