//! Client session management for Chatline.
//!
//! This crate owns the lifecycle of one connection to a chat server:
//!
//! 1. **Connecting** ([`Session::connect`], [`Session::dial`]), which yields a
//!    session handle plus its event stream, or a [`ConnectError`]
//! 2. **Reading**: a background read loop decodes every inbound frame and
//!    queues it as a [`SessionEvent`]
//! 3. **Sending** ([`Session::send`]): safe from any task, frames never
//!    interleave
//! 4. **Closing** ([`Session::close`]): idempotent, and the consumer sees
//!    exactly one `Closed` at the end
//!
//! Consumers either match on [`SessionEvent`]s directly or implement
//! [`SessionListener`] and let [`SessionEvents::run`] drive it.
//!
//! # How it fits in the stack
//!
//! ```text
//! Client Layer (above)  ← turns session events into chat behavior
//!     ↕
//! Session Layer (this crate)  ← connection lifecycle and event delivery
//!     ↕
//! Protocol Layer (below)  ← OutgoingRequest / IncomingEvent and the codec
//!     ↕
//! Transport Layer (below)  ← newline-framed byte streams
//! ```

mod error;
mod events;
mod listener;
mod session;

pub use error::{ConnectError, SendError, SessionError};
pub use events::{SessionEvent, SessionEvents};
pub use listener::SessionListener;
pub use session::{Session, SessionConfig, SessionState};
