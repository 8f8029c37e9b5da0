//! Core protocol types for Chatline's wire format.
//!
//! Two directions, two vocabularies:
//!
//! - [`OutgoingRequest`]: what the client sends (log in, post a message).
//! - [`IncomingEvent`]: what the client makes of each server frame.
//!
//! Every frame on the wire is a single JSON object whose `type` field is the
//! discriminant:
//!
//! ```text
//! client → server   {"type":"auth","login":"alice","password":"pw"}
//! client → server   {"type":"message","login":"alice","message":"hi"}
//! server → client   {"type":"auth","success":true,"message":"welcome"}
//! server → client   {"type":"message","success":true,"login":"bob","message":"hi"}
//! ```

use serde::{Deserialize, Serialize};

/// Discriminant of authentication frames.
pub const AUTH_TYPE: &str = "auth";

/// Discriminant of chat message frames.
pub const MESSAGE_TYPE: &str = "message";

/// Reason shown when the server rejects a login without saying why.
pub(crate) const DEFAULT_AUTH_FAILURE: &str = "authentication rejected";

/// Reason shown when the server rejects a chat frame without saying why.
pub(crate) const DEFAULT_MESSAGE_FAILURE: &str = "message rejected";

// ---------------------------------------------------------------------------
// OutgoingRequest
// ---------------------------------------------------------------------------

/// A logical request from the client to the server.
///
/// `#[serde(tag = "type")]` makes this an internally tagged enum, so the
/// variant name lands in the `type` field next to the payload fields. serde
/// writes fields in declaration order, which is what makes encoding
/// deterministic: the same request always produces the same bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OutgoingRequest {
    /// Log in with a login name and password.
    #[serde(rename = "auth")]
    AuthRequest {
        /// The user's login name.
        login: String,
        /// The user's password, sent as-is.
        password: String,
    },

    /// Post a chat message on behalf of `login`.
    #[serde(rename = "message")]
    ChatMessage {
        /// Who is speaking.
        login: String,
        /// The message body. On the wire this is the `message` field.
        #[serde(rename = "message")]
        text: String,
    },
}

impl OutgoingRequest {
    /// Shorthand for [`OutgoingRequest::AuthRequest`].
    pub fn auth(login: impl Into<String>, password: impl Into<String>) -> Self {
        Self::AuthRequest {
            login: login.into(),
            password: password.into(),
        }
    }

    /// Shorthand for [`OutgoingRequest::ChatMessage`].
    pub fn chat(login: impl Into<String>, text: impl Into<String>) -> Self {
        Self::ChatMessage {
            login: login.into(),
            text: text.into(),
        }
    }

    /// The wire discriminant of this request.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AuthRequest { .. } => AUTH_TYPE,
            Self::ChatMessage { .. } => MESSAGE_TYPE,
        }
    }
}

// ---------------------------------------------------------------------------
// IncomingEvent
// ---------------------------------------------------------------------------

/// The parsed result of one frame received from the server.
///
/// Exactly one variant per frame. An unsuccessful result always carries a
/// non-empty reason: when the server leaves it out, the codec fills in a
/// generic one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IncomingEvent {
    /// The server's answer to an [`OutgoingRequest::AuthRequest`].
    AuthResult {
        /// Whether the login was accepted.
        success: bool,
        /// Why the login was refused. `Some` iff `success` is `false`.
        failure_reason: Option<String>,
        /// Optional welcome text sent with a successful login.
        greeting: Option<String>,
    },

    /// A chat message relayed by the server.
    ChatReceived {
        /// Login of the user who sent the message.
        sender_login: String,
        /// Message body; may be empty.
        text: String,
    },

    /// The server refused something the client sent as a chat frame
    /// (e.g. posting before logging in).
    MessageRejected {
        /// Human-readable reason, never empty.
        reason: String,
    },

    /// The frame could not be understood. Not fatal to the session.
    Malformed {
        /// The frame exactly as received.
        raw_text: String,
    },
}

impl IncomingEvent {
    /// Returns `true` for [`IncomingEvent::Malformed`].
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::Malformed { .. })
    }

    /// Builds the event for a decoded wire frame.
    ///
    /// `raw` is kept for the `Malformed` case so the user can see exactly
    /// what arrived.
    pub(crate) fn from_wire(frame: WireFrame, raw: &str) -> Self {
        let success = frame.success.unwrap_or(true);
        match (frame.kind.as_str(), success) {
            (AUTH_TYPE, true) => Self::AuthResult {
                success: true,
                failure_reason: None,
                greeting: frame.message,
            },
            (AUTH_TYPE, false) => Self::AuthResult {
                success: false,
                failure_reason: Some(non_empty_or(
                    frame.message,
                    DEFAULT_AUTH_FAILURE,
                )),
                greeting: None,
            },
            (MESSAGE_TYPE, true) => match (frame.login, frame.message) {
                (Some(sender_login), Some(text)) => {
                    Self::ChatReceived { sender_login, text }
                }
                _ => Self::Malformed {
                    raw_text: raw.to_string(),
                },
            },
            (MESSAGE_TYPE, false) => Self::MessageRejected {
                reason: non_empty_or(frame.message, DEFAULT_MESSAGE_FAILURE),
            },
            _ => Self::Malformed {
                raw_text: raw.to_string(),
            },
        }
    }

    /// The wire frame a server would send to produce this event.
    ///
    /// Returns `None` for `Malformed`, which has no structured form.
    pub(crate) fn to_wire(&self) -> Option<WireFrame> {
        let frame = match self {
            Self::AuthResult {
                success: true,
                greeting,
                ..
            } => WireFrame {
                kind: AUTH_TYPE.into(),
                success: Some(true),
                login: None,
                message: greeting.clone(),
            },
            Self::AuthResult {
                success: false,
                failure_reason,
                ..
            } => WireFrame {
                kind: AUTH_TYPE.into(),
                success: Some(false),
                login: None,
                message: failure_reason.clone(),
            },
            Self::ChatReceived { sender_login, text } => WireFrame {
                kind: MESSAGE_TYPE.into(),
                success: Some(true),
                login: Some(sender_login.clone()),
                message: Some(text.clone()),
            },
            Self::MessageRejected { reason } => WireFrame {
                kind: MESSAGE_TYPE.into(),
                success: Some(false),
                login: None,
                message: Some(reason.clone()),
            },
            Self::Malformed { .. } => return None,
        };
        Some(frame)
    }
}

/// The user-facing text for a frame the client could not understand.
pub fn describe_malformed(raw_text: &str) -> String {
    format!("Incorrect server response: {raw_text}")
}

fn non_empty_or(message: Option<String>, fallback: &str) -> String {
    match message {
        Some(m) if !m.trim().is_empty() => m,
        _ => fallback.to_string(),
    }
}

// ---------------------------------------------------------------------------
// WireFrame: the lenient on-the-wire shape of a server frame
// ---------------------------------------------------------------------------

/// A server frame as it appears on the wire, before interpretation.
///
/// Every field except `type` is optional here; whether a combination makes
/// sense is decided in [`IncomingEvent::from_wire`]. Unknown fields are
/// ignored so servers can add data without breaking older clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct WireFrame {
    #[serde(rename = "type")]
    pub(crate) kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) success: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) login: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) message: Option<String>,
}

// =========================================================================
// Tests
// =========================================================================
