//! Session runner — the host loop that drives refresh cycles.
//!
//! [`SessionRunner`] owns the lifecycle, the shared state and a view. Its
//! [`run`](SessionRunner::run) loop is the execution model the lifecycle is
//! written for:
//!
//! ```text
//! loop:
//!   nothing pending?  → block for the next intent (exit when channel closes)
//!   drain queued intents → lifecycle.apply_intent(…)
//!   lifecycle.advance(…)  — exactly one transition
//!   render: new turns, errors, status notes, typing affordance
//! ```
//!
//! A cycle that changed state asks for a re-render; since pending work
//! remains, the loop simply runs another cycle immediately instead of
//! blocking. Errors and notes in the report are rendered for that cycle
//! only — they never enter the history.

use tokio::sync::mpsc;

use crate::session::lifecycle::{CycleReport, Intent, RequestLifecycle};
use crate::session::state::{SharedState, Stage};
use crate::view::ConversationView;

// ---------------------------------------------------------------------------
// SessionRunner
// ---------------------------------------------------------------------------

/// Drives one conversation session until its intent channel closes.
///
/// Create with [`SessionRunner::new`], then call [`run`](Self::run) inside a
/// tokio task. The front end keeps the sender side of the channel and a
/// clone of the [`SharedState`] for read-only inspection.
pub struct SessionRunner {
    lifecycle: RequestLifecycle,
    state: SharedState,
    view: Box<dyn ConversationView>,
    /// History entries already handed to the view.
    rendered: usize,
}

impl SessionRunner {
    /// Create a runner over the given lifecycle, state and view.
    pub fn new(
        lifecycle: RequestLifecycle,
        state: SharedState,
        view: Box<dyn ConversationView>,
    ) -> Self {
        Self {
            lifecycle,
            state,
            view,
            rendered: 0,
        }
    }

    /// Run refresh cycles until `intent_rx` closes and no work is pending.
    pub async fn run(mut self, mut intent_rx: mpsc::Receiver<Intent>) {
        loop {
            // Block for input only when a cycle would be a no-op anyway.
            if !self.state.lock().unwrap().has_pending_work() {
                match intent_rx.recv().await {
                    Some(intent) => self.handle_intent(intent),
                    None => break,
                }
            }

            // Fold in whatever else arrived without waiting.
            while let Ok(intent) = intent_rx.try_recv() {
                self.handle_intent(intent);
            }

            // One advancement step per cycle.
            let report = self.lifecycle.advance(&self.state).await;
            self.render(&report);
        }

        log::info!("session: intent channel closed, runner shutting down");
    }

    /// Apply one intent, with the view side effects intake cannot know about.
    fn handle_intent(&mut self, intent: Intent) {
        let is_clear = intent == Intent::Clear;
        let changed = self.lifecycle.apply_intent(&self.state, intent);

        if is_clear && changed {
            self.rendered = 0;
            self.view.conversation_cleared();
        }
    }

    /// Render everything a finished cycle produced.
    fn render(&mut self, report: &CycleReport) {
        // New turns first, in history order.
        let (start, new_messages, answering) = {
            let st = self.state.lock().unwrap();
            let start = self.rendered.min(st.history.len());
            (
                start,
                st.history[start..].to_vec(),
                st.stage == Stage::Answering,
            )
        };
        for message in &new_messages {
            self.view.render_message(message);
        }
        self.rendered = start + new_messages.len();

        for note in &report.notes {
            self.view.render_status(note);
        }
        if let Some(error) = &report.error {
            self.view.render_error(&error.to_string());
        }

        // An answer is owed — keep the typing affordance under the last turn.
        if answering {
            self.view.render_typing();
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
