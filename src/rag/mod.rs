//! Retrieval-augmented answering.
//!
//! # Pipeline
//!
//! ```text
//! query ──▶ search_top_content ──▶ top chunk ──▶ complete_with_context ──▶ Answer
//!              │ (no hits)                           │ (empty text)
//!              └──▶ fixed fallback answer            └──▶ "(empty)" placeholder
//! ```
//!
//! Both steps share one [`Connection`] (HTTP client + resolved identifiers)
//! established lazily by [`ConnectionCache`] and reused for the life of the
//! process. [`RagAnswerer`] is the boundary: whatever the remote side does —
//! no hits, empty text, HTTP failure — the session always receives an
//! [`Answer`], never an error.

pub mod answerer;
pub mod complete;
pub mod connection;
pub mod search;
pub mod types;

// ── Public re-exports ──────────────────────────────────────────────────────

pub use answerer::{Answerer, RagAnswerer};
pub use connection::{normalize_identifier, Connection, ConnectionCache};
pub use types::{Answer, RagError, EMPTY_COMPLETION_PLACEHOLDER, NO_CONTENT_FALLBACK};

// test-only re-export so the session test modules can import MockAnswerer
// without `use voxask::rag::answerer::MockAnswerer`.
#[cfg(test)]
pub use answerer::MockAnswerer;
