//! `ChatClient` builder and event handling.
//!
//! This is the entry point for a Chatline client. It ties together all the
//! layers: transport → protocol → session → client state machine → frontend.

use chatline_session::{
    Session, SessionConfig, SessionError, SessionEvents, SessionListener,
};
use chatline_protocol::IncomingEvent;
use chrono::Local;

use crate::{ChatlineError, ClientAction, ClientAuthState, ClientProtocol, Frontend};

/// Server the client dials when none is configured.
pub const DEFAULT_ADDRESS: &str = "127.0.0.1:8181";

/// Login used when none is configured.
pub const DEFAULT_LOGIN: &str = "login";

/// Password used when none is configured.
pub const DEFAULT_PASSWORD: &str = "123";

/// Builder for configuring and connecting a [`ChatClient`].
///
/// # Example
///
/// ```rust,ignore
/// use chatline::prelude::*;
///
/// let (mut client, mut events) = ChatClient::builder()
///     .address("127.0.0.1:8181")
///     .login("alice")
///     .password("secret")
///     .connect(my_frontend)
///     .await?;
/// client.run(&mut events).await;
/// ```
#[derive(Debug, Clone)]
pub struct ChatClientBuilder {
    address: String,
    login: String,
    password: String,
    session_config: SessionConfig,
}

impl ChatClientBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            login: DEFAULT_LOGIN.to_string(),
            password: DEFAULT_PASSWORD.to_string(),
            session_config: SessionConfig::default(),
        }
    }

    /// Sets the server address (`host:port`).
    pub fn address(mut self, addr: impl Into<String>) -> Self {
        self.address = addr.into();
        self
    }

    /// Sets the login to authenticate as.
    pub fn login(mut self, login: impl Into<String>) -> Self {
        self.login = login.into();
        self
    }

    /// Sets the password.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    /// Sets the session configuration.
    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.session_config = config;
        self
    }

    /// Connects to the server.
    ///
    /// Returns the client and the session's event stream. Nothing has been
    /// sent yet: the credentials go out when the client handles the first
    /// event (`Ready`), so drive the events with [`ChatClient::run`] or
    /// [`SessionEvent::dispatch_to`](chatline_session::SessionEvent::dispatch_to).
    ///
    /// # Errors
    /// Returns [`ChatlineError::Connect`] if the server cannot be reached.
    pub async fn connect<F: Frontend>(
        self,
        frontend: F,
    ) -> Result<(ChatClient<F>, SessionEvents), ChatlineError> {
        tracing::info!(address = %self.address, login = %self.login, "connecting");
        let (session, events) =
            Session::connect_with_config(&self.address, self.session_config)
                .await?;

        let client = ChatClient {
            session,
            protocol: ClientProtocol::new(self.login, self.password),
            frontend,
        };
        Ok((client, events))
    }
}

impl Default for ChatClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A connected chat client.
///
/// The client is the session's consumer: it implements
/// [`SessionListener`], feeds every event through its [`ClientProtocol`],
/// and carries out the resulting actions against the session and the
/// [`Frontend`].
pub struct ChatClient<F> {
    session: Session,
    protocol: ClientProtocol,
    frontend: F,
}

impl<F: Frontend> ChatClient<F> {
    /// Creates a new builder.
    pub fn builder() -> ChatClientBuilder {
        ChatClientBuilder::new()
    }

    /// The underlying session.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Where the client is in the login flow.
    pub fn auth_state(&self) -> ClientAuthState {
        self.protocol.state()
    }

    /// The frontend this client drives.
    pub fn frontend(&self) -> &F {
        &self.frontend
    }

    /// Mutable access to the frontend, e.g. for [`supervise`](crate::supervise).
    pub fn frontend_mut(&mut self) -> &mut F {
        &mut self.frontend
    }

    /// Sends `text` as a chat message under this client's login.
    ///
    /// Empty text is ignored. Before login the frontend is told the user
    /// is not logged in and nothing is sent.
    ///
    /// # Errors
    /// Returns [`ChatlineError::Send`] if the session could not take the
    /// message.
    pub async fn send_chat(&mut self, text: &str) -> Result<(), ChatlineError> {
        let actions = self.protocol.compose_message(text);
        self.apply(actions).await
    }

    /// Closes the session. The frontend switches to the logged-out view
    /// once the `Closed` event has been handled.
    pub async fn disconnect(&mut self) {
        let actions = self.protocol.request_close();
        self.apply_reported(actions).await;
    }

    /// Handles every remaining session event, returning after the session
    /// has closed.
    pub async fn run(&mut self, events: &mut SessionEvents) {
        events.run(self).await;
    }

    async fn apply(&mut self, actions: Vec<ClientAction>) -> Result<(), ChatlineError> {
        for action in actions {
            match action {
                ClientAction::Send(request) => self.session.send(&request).await?,
                ClientAction::Notify(message) => self.frontend.show_error(&message),
                ClientAction::Append(entry) => self.frontend.append_history(entry),
                ClientAction::SetLoggedIn(logged_in) => {
                    self.frontend.set_logged_in(logged_in)
                }
                ClientAction::Close => self.session.close().await,
            }
        }
        Ok(())
    }

    /// Like `apply`, for event handlers. A failed send tears the session
    /// down, and the session reports the cause through `on_exception`, so
    /// the error is only logged here.
    async fn apply_reported(&mut self, actions: Vec<ClientAction>) {
        if let Err(e) = self.apply(actions).await {
            tracing::warn!(id = %self.session.id(), error = %e, "client action failed");
        }
    }
}

impl<F: Frontend> SessionListener for ChatClient<F> {
    async fn on_socket_ready(&mut self) {
        let actions = self.protocol.on_ready();
        self.apply_reported(actions).await;
    }

    async fn on_message_received(&mut self, event: IncomingEvent) {
        let actions = self.protocol.on_message(event, Local::now());
        self.apply_reported(actions).await;
    }

    async fn on_socket_closed(&mut self) {
        let actions = self.protocol.on_closed();
        self.apply_reported(actions).await;
    }

    async fn on_exception(&mut self, error: SessionError) {
        tracing::warn!(id = %self.session.id(), %error, fatal = error.is_fatal(), "session error");
        let actions = self.protocol.on_exception(&error);
        self.apply_reported(actions).await;
    }
}
