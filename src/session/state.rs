//! Per-session conversation state and its shared handle.
//!
//! [`ConversationState`] is the single source of truth for one chat session:
//! the append-only history, the (at most one each) pending audio blob and
//! pending text query, and the stage flag that says whether a promoted query
//! is still awaiting its answer.
//!
//! [`SharedState`] is a type alias for `Arc<Mutex<ConversationState>>` —
//! cheap to clone and safe to share between the session task and the front
//! end. Lock with `.lock().unwrap()` for a short critical section; do
//! **not** hold the lock across `.await` points.

use std::sync::{Arc, Mutex};

use crate::session::message::Message;

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

/// Whether a pending query has already been promoted into the history.
///
/// `Answering` means the query's `User` message is the most recent history
/// entry and the assistant turn is still owed. The two-stage split is what
/// keeps promotion and answering in separate refresh cycles, so an answer
/// can never appear before the question it answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Stage {
    /// No promoted query in flight.
    #[default]
    Idle,
    /// The pending query is in the history; its answer is owed.
    Answering,
}

impl Stage {
    /// Short human-readable label used in logs.
    pub fn label(&self) -> &'static str {
        match self {
            Stage::Idle => "idle",
            Stage::Answering => "answering",
        }
    }
}

// ---------------------------------------------------------------------------
// ConversationState
// ---------------------------------------------------------------------------

/// Everything one chat session remembers between refresh cycles.
///
/// Mutated exclusively by the request lifecycle; views only read it.
#[derive(Debug, Default)]
pub struct ConversationState {
    /// Conversation turns, append-only, in display order.
    pub history: Vec<Message>,

    /// Audio blob queued for the process-audio step, at most one.
    pub pending_audio: Option<Vec<u8>>,

    /// Audio recorded while auto-process is off, parked until the user
    /// explicitly confirms it should be transcribed.
    pub held_audio: Option<Vec<u8>>,

    /// Text query awaiting promotion or an answer, at most one.
    pub pending_query: Option<String>,

    /// Whether the pending query is already in the history.
    pub stage: Stage,

    /// Digest of the most recently accepted audio blob.
    ///
    /// The host re-delivers the recorder's last blob on every refresh; a
    /// matching digest means "already handled" and the blob is ignored.
    pub last_audio_fingerprint: Option<String>,

    /// When true, new audio is queued for processing immediately; when
    /// false it is parked in `held_audio` until confirmed.
    pub auto_process: bool,

    /// Bumped by [`clear`](Self::clear). A remote call snapshots this
    /// before it starts; a mismatch when it finishes means the session was
    /// cleared meanwhile and the result must be discarded.
    pub generation: u64,
}

impl ConversationState {
    /// Fresh session state: empty history, nothing pending, auto-process on.
    pub fn new() -> Self {
        Self {
            auto_process: true,
            ..Self::default()
        }
    }

    /// Reset the conversation in one call.
    ///
    /// Empties the history, drops all pending and held work, returns the
    /// stage to [`Stage::Idle`] and bumps the generation so any in-flight
    /// remote call lands on the floor. Idempotent.
    ///
    /// `last_audio_fingerprint` and `auto_process` deliberately survive: the
    /// host may re-deliver the last blob right after a clear, and that must
    /// not restart a conversation on its own.
    pub fn clear(&mut self) {
        self.history.clear();
        self.pending_audio = None;
        self.held_audio = None;
        self.pending_query = None;
        self.stage = Stage::Idle;
        self.generation = self.generation.wrapping_add(1);
    }

    /// True when an advancement cycle would have something to do.
    pub fn has_pending_work(&self) -> bool {
        self.pending_query.is_some() || self.pending_audio.is_some()
    }
}

// ---------------------------------------------------------------------------
// SharedState
// ---------------------------------------------------------------------------

/// Thread-safe handle to [`ConversationState`].
///
/// Cheap to clone (`Arc` clone). Critical sections must stay short and
/// never span an `.await`.
pub type SharedState = Arc<Mutex<ConversationState>>;

/// Construct a new [`SharedState`] wrapping a fresh [`ConversationState`].
pub fn new_shared_state() -> SharedState {
    Arc::new(Mutex::new(ConversationState::new()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
