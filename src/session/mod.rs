//! The conversation session — state, lifecycle and host loop.
//!
//! # Architecture
//!
//! ```text
//! view intents ──▶ RequestLifecycle::apply_intent ──▶ ConversationState
//!                                                         │
//! refresh cycle ─▶ RequestLifecycle::advance  ◀───────────┘
//!                    │ (one transition per cycle)
//!                    ├─▶ promote query → history
//!                    ├─▶ Answerer      → assistant turn
//!                    └─▶ gate + Transcriber → queued query
//! ```
//!
//! [`SessionRunner`] is the host loop: it feeds intents in, runs one
//! [`advance`](RequestLifecycle::advance) per cycle, and renders what the
//! cycle produced through a [`ConversationView`].
//!
//! [`ConversationView`]: crate::view::ConversationView

pub mod lifecycle;
pub mod message;
pub mod runner;
pub mod state;

// ── Public re-exports ──────────────────────────────────────────────────────

pub use lifecycle::{CycleReport, CycleStep, Intent, RequestLifecycle, SessionError};
pub use message::{Message, Role};
pub use runner::SessionRunner;
pub use state::{new_shared_state, ConversationState, SharedState, Stage};
