//! # Chatline
//!
//! Client side of a line-oriented JSON chat protocol.
//!
//! Chatline connects to a chat server over TCP, logs in, and exchanges
//! chat messages. Applications implement a single [`Frontend`] trait (show
//! an error, append a history line, switch views) and the client handles
//! transport, session lifecycle and the login flow.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use chatline::prelude::*;
//!
//! struct Stdout;
//!
//! impl Frontend for Stdout {
//!     fn show_error(&mut self, message: &str) {
//!         eprintln!("error: {message}");
//!     }
//!     fn append_history(&mut self, entry: HistoryEntry) {
//!         println!("{entry}");
//!     }
//!     fn set_logged_in(&mut self, _logged_in: bool) {}
//! }
//!
//! # async fn demo() -> Result<(), ChatlineError> {
//! let (mut client, mut events) = ChatClient::<Stdout>::builder()
//!     .address("127.0.0.1:8181")
//!     .login("alice")
//!     .password("secret")
//!     .connect(Stdout)
//!     .await?;
//! client.run(&mut events).await;
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
mod frontend;
mod history;
mod state;

pub use client::{
    ChatClient, ChatClientBuilder, DEFAULT_ADDRESS, DEFAULT_LOGIN,
    DEFAULT_PASSWORD,
};
pub use error::ChatlineError;
pub use frontend::Frontend;
pub use history::{HistoryEntry, TIMESTAMP_FORMAT};
pub use state::{ClientAction, ClientAuthState, ClientProtocol, NOT_LOGGED_IN};

pub use chatline_protocol;
pub use chatline_session;
pub use chatline_transport;

/// Routes a failed result to the user.
///
/// This is the top-level failure funnel: anything that bubbles up to the
/// application's entry point as a [`ChatlineError`] is logged and shown
/// through [`Frontend::show_error`] instead of ending the program.
pub fn supervise<T>(
    frontend: &mut impl Frontend,
    result: Result<T, ChatlineError>,
) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::error!(error = %e, "operation failed");
            frontend.show_error(&e.to_string());
            None
        }
    }
}

/// Installs the global `tracing` subscriber.
///
/// The filter comes from `RUST_LOG` and defaults to `info`. Calling this
/// more than once is harmless: later calls leave the first subscriber in
/// place.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Everything needed to write a Chatline client.
pub mod prelude {
    pub use crate::{
        ChatClient, ChatClientBuilder, ChatlineError, ClientAuthState,
        Frontend, HistoryEntry, supervise,
    };
    pub use chatline_protocol::{IncomingEvent, OutgoingRequest};
    pub use chatline_session::{
        SessionConfig, SessionError, SessionEvent, SessionEvents,
        SessionListener,
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recording {
        errors: Vec<String>,
    }

    impl Frontend for Recording {
        fn show_error(&mut self, message: &str) {
            self.errors.push(message.to_string());
        }
        fn append_history(&mut self, _entry: HistoryEntry) {}
        fn set_logged_in(&mut self, _logged_in: bool) {}
    }

    #[test]
    fn test_supervise_passes_success_through() {
        let mut frontend = Recording::default();
        assert_eq!(supervise(&mut frontend, Ok(5)), Some(5));
        assert!(frontend.errors.is_empty());
    }

    #[test]
    fn test_supervise_shows_error() {
        let mut frontend = Recording::default();
        let result: Result<(), _> = Err(ChatlineError::from(
            chatline_session::SessionError::ReadLoopPanicked,
        ));

        assert!(supervise(&mut frontend, result).is_none());
        assert_eq!(frontend.errors, vec!["read loop panicked"]);
    }

    #[test]
    fn test_init_tracing_twice_is_harmless() {
        init_tracing();
        init_tracing();
    }
}
