//! The presentation side of the client.

use crate::HistoryEntry;

/// What the client needs from whatever shows the chat to a person.
///
/// Calls arrive on the task that drives the session events, one at a time.
/// Implementations should return quickly; they are not async.
pub trait Frontend: Send {
    /// Shows a dismissible error notification.
    fn show_error(&mut self, message: &str);

    /// Adds one line to the visible chat history.
    fn append_history(&mut self, entry: HistoryEntry);

    /// Switches between the login view and the chat view.
    fn set_logged_in(&mut self, logged_in: bool);
}

impl<T: Frontend + ?Sized> Frontend for &mut T {
    fn show_error(&mut self, message: &str) {
        (**self).show_error(message);
    }

    fn append_history(&mut self, entry: HistoryEntry) {
        (**self).append_history(entry);
    }

    fn set_logged_in(&mut self, logged_in: bool) {
        (**self).set_logged_in(logged_in);
    }
}
