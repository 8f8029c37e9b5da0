//! The client protocol state machine.
//!
//! [`ClientProtocol`] decides what the client does in response to session
//! events. It performs no I/O: every handler takes an event and returns the
//! [`ClientAction`]s to carry out, in order. The caller (normally
//! [`ChatClient`](crate::ChatClient)) executes them against the session and
//! the frontend.
//!
//! ```text
//!                    on_ready
//!  Unauthenticated ───────────→ AuthPending
//!                                 │     │
//!             AuthResult(success) │     │ AuthResult(failure) / closed
//!                                 ↓     ↓
//!                       Authenticated ──→ Disconnected
//!                            closed / request_close
//! ```

use chatline_protocol::{IncomingEvent, OutgoingRequest, describe_malformed};
use chatline_session::SessionError;
use chrono::{DateTime, Local};

use crate::HistoryEntry;

/// Shown when the user tries to chat before the server accepted the login.
pub const NOT_LOGGED_IN: &str = "not logged in";

/// Where the client is in the login flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientAuthState {
    /// Connected (or connecting) but no credentials sent yet.
    Unauthenticated,
    /// Credentials sent, waiting for the server's verdict.
    AuthPending,
    /// Logged in; chat flows both ways.
    Authenticated,
    /// The session is over. Terminal.
    Disconnected,
}

/// One side effect requested by the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientAction {
    /// Send this request over the session.
    Send(OutgoingRequest),
    /// Show this message to the user as an error notification.
    Notify(String),
    /// Append this line to the chat history.
    Append(HistoryEntry),
    /// Switch the presentation between logged-in and logged-out views.
    SetLoggedIn(bool),
    /// Close the session.
    Close,
}

/// Login-flow state machine for one session.
///
/// A `ClientProtocol` lives exactly as long as the session it drives. A new
/// login attempt starts with a new one.
#[derive(Debug, Clone)]
pub struct ClientProtocol {
    login: String,
    password: String,
    state: ClientAuthState,
}

impl ClientProtocol {
    /// Creates a machine that will log in with the given credentials.
    pub fn new(login: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            password: password.into(),
            state: ClientAuthState::Unauthenticated,
        }
    }

    /// The current state.
    pub fn state(&self) -> ClientAuthState {
        self.state
    }

    /// The login this client authenticates as.
    pub fn login(&self) -> &str {
        &self.login
    }

    /// Returns `true` once the server accepted the login, until disconnect.
    pub fn is_logged_in(&self) -> bool {
        self.state == ClientAuthState::Authenticated
    }

    /// The session is connected: send the credentials.
    pub fn on_ready(&mut self) -> Vec<ClientAction> {
        if self.state != ClientAuthState::Unauthenticated {
            tracing::warn!(state = ?self.state, "ready event in unexpected state");
            return Vec::new();
        }
        self.state = ClientAuthState::AuthPending;
        tracing::debug!(login = %self.login, "sending credentials");
        vec![ClientAction::Send(OutgoingRequest::auth(
            self.login.clone(),
            self.password.clone(),
        ))]
    }

    /// A frame arrived. `received_at` stamps any history line it produces.
    pub fn on_message(
        &mut self,
        event: IncomingEvent,
        received_at: DateTime<Local>,
    ) -> Vec<ClientAction> {
        if self.state == ClientAuthState::Disconnected {
            tracing::debug!(?event, "event after disconnect dropped");
            return Vec::new();
        }

        match event {
            IncomingEvent::AuthResult {
                success: true,
                greeting,
                ..
            } => {
                if self.state != ClientAuthState::AuthPending {
                    tracing::warn!(state = ?self.state, "unsolicited auth success ignored");
                    return Vec::new();
                }
                self.state = ClientAuthState::Authenticated;
                tracing::info!(login = %self.login, "logged in");

                let mut actions = vec![ClientAction::SetLoggedIn(true)];
                if let Some(greeting) = greeting.filter(|g| !g.is_empty()) {
                    actions.push(ClientAction::Append(HistoryEntry::notice(
                        received_at,
                        greeting,
                    )));
                }
                actions
            }

            IncomingEvent::AuthResult {
                success: false,
                failure_reason,
                ..
            } => {
                let reason = failure_reason.unwrap_or_default();
                if self.state != ClientAuthState::AuthPending {
                    // Not an answer to our login; just tell the user.
                    return vec![ClientAction::Notify(reason)];
                }
                self.state = ClientAuthState::Disconnected;
                tracing::info!(login = %self.login, %reason, "login rejected");
                vec![ClientAction::Notify(reason), ClientAction::Close]
            }

            IncomingEvent::ChatReceived { sender_login, text } => {
                if self.state != ClientAuthState::Authenticated {
                    tracing::debug!(sender = %sender_login, "chat before login dropped");
                    return Vec::new();
                }
                if text.is_empty() {
                    return Vec::new();
                }
                vec![ClientAction::Append(HistoryEntry::chat(
                    received_at,
                    sender_login,
                    text,
                ))]
            }

            IncomingEvent::MessageRejected { reason } => {
                vec![ClientAction::Notify(reason)]
            }

            IncomingEvent::Malformed { raw_text } => {
                vec![ClientAction::Notify(describe_malformed(&raw_text))]
            }
        }
    }

    /// The session reported an anomaly.
    ///
    /// Fatal errors are followed by [`on_closed`](Self::on_closed), so the
    /// state is left alone here.
    pub fn on_exception(&mut self, error: &SessionError) -> Vec<ClientAction> {
        vec![ClientAction::Notify(error.to_string())]
    }

    /// The session is over, whoever closed it.
    pub fn on_closed(&mut self) -> Vec<ClientAction> {
        if self.state != ClientAuthState::Disconnected {
            tracing::info!(login = %self.login, state = ?self.state, "disconnected");
        }
        self.state = ClientAuthState::Disconnected;
        vec![ClientAction::SetLoggedIn(false)]
    }

    /// The user asked to disconnect.
    pub fn request_close(&mut self) -> Vec<ClientAction> {
        if self.state == ClientAuthState::Disconnected {
            return Vec::new();
        }
        self.state = ClientAuthState::Disconnected;
        vec![ClientAction::Close]
    }

    /// The user typed `text` into the message box.
    ///
    /// Empty text is ignored. Anything else is sent under this client's
    /// login, but only once logged in.
    pub fn compose_message(&self, text: &str) -> Vec<ClientAction> {
        if text.is_empty() {
            return Vec::new();
        }
        if self.state != ClientAuthState::Authenticated {
            return vec![ClientAction::Notify(NOT_LOGGED_IN.into())];
        }
        vec![ClientAction::Send(OutgoingRequest::chat(
            self.login.clone(),
            text,
        ))]
    }
}
