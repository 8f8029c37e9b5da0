//! Chat history lines.

use std::fmt;

use chrono::{DateTime, Local};

/// `strftime` pattern for history timestamps: `19.10.2026 14:03:59`.
pub const TIMESTAMP_FORMAT: &str = "%d.%m.%Y %H:%M:%S";

/// One line of the chat history, stamped when the client received it.
///
/// The [`Display`](fmt::Display) impl renders the line the way a chat area
/// shows it:
///
/// ```text
/// 19.10.2026 14:03:59 <bob>: hi
/// ```
///
/// Server notices (the login greeting) have no sender and render as bare
/// text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    /// Local time at which the frame was handled.
    pub received_at: DateTime<Local>,
    /// Login of whoever wrote the line. `None` for server notices.
    pub sender: Option<String>,
    /// The line's text. Never empty for chat lines.
    pub text: String,
}

impl HistoryEntry {
    /// A chat message from `sender`.
    pub fn chat(
        received_at: DateTime<Local>,
        sender: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            received_at,
            sender: Some(sender.into()),
            text: text.into(),
        }
    }

    /// A line from the server itself.
    pub fn notice(received_at: DateTime<Local>, text: impl Into<String>) -> Self {
        Self {
            received_at,
            sender: None,
            text: text.into(),
        }
    }

    /// Returns `true` for server notices.
    pub fn is_notice(&self) -> bool {
        self.sender.is_none()
    }
}

impl fmt::Display for HistoryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.sender {
            Some(sender) => write!(
                f,
                "{} <{}>: {}",
                self.received_at.format(TIMESTAMP_FORMAT),
                sender,
                self.text
            ),
            None => f.write_str(&self.text),
        }
    }
}
