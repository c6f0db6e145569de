//! The conversation view contract.
//!
//! The session core does not own a UI. It talks to whatever front end is
//! attached through [`ConversationView`]: a render-on-demand surface that
//! draws turns, the typing affordance, and cycle-scoped errors and status
//! captions. The view relays user input back as [`Intent`]s over a channel;
//! it never mutates the conversation state itself.
//!
//! The terminal front end in `main.rs` is the production implementation.
//!
//! [`Intent`]: crate::session::Intent

use crate::session::Message;

/// What a front end must render for the session runner.
///
/// Methods are fire-and-forget: the runner never waits for a draw to
/// complete, and a view that drops a call only degrades cosmetically.
pub trait ConversationView: Send {
    /// Draw a newly appended conversation turn.
    fn render_message(&mut self, message: &Message);

    /// Show that an answer is being produced for the latest user turn.
    fn render_typing(&mut self);

    /// Show a cycle-scoped error. Errors are never part of the history.
    fn render_error(&mut self, message: &str);

    /// Show a cycle-scoped status caption (audio stats, transcript preview,
    /// search debug).
    fn render_status(&mut self, note: &str);

    /// The conversation was reset; drop everything drawn so far.
    fn conversation_cleared(&mut self);
}

// ---------------------------------------------------------------------------
// RecordingView  (test-only)
// ---------------------------------------------------------------------------

/// One recorded view call, in arrival order.
#[cfg(test)]
#[derive(Debug, Clone, PartialEq)]
pub enum ViewEvent {
    Message(Message),
    Typing,
    Error(String),
    Status(String),
    Cleared,
}

/// Test double that records every call so tests can assert on render order.
#[cfg(test)]
pub struct RecordingView {
    events: std::sync::Arc<std::sync::Mutex<Vec<ViewEvent>>>,
}

#[cfg(test)]
impl RecordingView {
    /// The view plus a handle to its event log. The handle stays valid after
    /// the view has been moved into a runner.
    pub fn new() -> (Self, std::sync::Arc<std::sync::Mutex<Vec<ViewEvent>>>) {
        let events = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        (
            Self {
                events: std::sync::Arc::clone(&events),
            },
            events,
        )
    }
}

#[cfg(test)]
impl ConversationView for RecordingView {
    fn render_message(&mut self, message: &Message) {
        self.events
            .lock()
            .unwrap()
            .push(ViewEvent::Message(message.clone()));
    }

    fn render_typing(&mut self) {
        self.events.lock().unwrap().push(ViewEvent::Typing);
    }

    fn render_error(&mut self, message: &str) {
        self.events
            .lock()
            .unwrap()
            .push(ViewEvent::Error(message.to_string()));
    }

    fn render_status(&mut self, note: &str) {
        self.events
            .lock()
            .unwrap()
            .push(ViewEvent::Status(note.to_string()));
    }

    fn conversation_cleared(&mut self) {
        self.events.lock().unwrap().push(ViewEvent::Cleared);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Role;

    #[test]
    fn recording_view_preserves_call_order() {
        let (mut view, events) = RecordingView::new();

        view.render_message(&Message::user("hi"));
        view.render_typing();
        view.render_message(&Message::assistant("hello"));
        view.render_status("debug: role=X");
        view.render_error("oops");
        view.conversation_cleared();

        let log = events.lock().unwrap();
        assert_eq!(log.len(), 6);
        assert!(matches!(&log[0], ViewEvent::Message(m) if m.role == Role::User));
        assert_eq!(log[1], ViewEvent::Typing);
        assert!(matches!(&log[2], ViewEvent::Message(m) if m.role == Role::Assistant));
        assert_eq!(log[3], ViewEvent::Status("debug: role=X".into()));
        assert_eq!(log[4], ViewEvent::Error("oops".into()));
        assert_eq!(log[5], ViewEvent::Cleared);
    }

    #[test]
    fn view_is_usable_as_a_trait_object() {
        let (view, _events) = RecordingView::new();
        let mut boxed: Box<dyn ConversationView> = Box::new(view);
        boxed.render_typing();
    }
}
