//! STT (speech-to-text) adapter module.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                   Transcriber (trait)                    │
//! │                                                         │
//! │  select_backend(cfg) ──┬──▶ WhisperTranscriber (fast)   │
//! │   (once, at startup)   ├──▶ WhisperTranscriber (beam)   │
//! │                        ├──▶ CloudTranscriber            │
//! │                        └──▶ NoModelTranscriber (degraded)│
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! All backends satisfy the same contract — 16 kHz mono `f32` in, trimmed
//! non-empty transcript out — so the session never knows which one it is
//! talking to.

pub mod cloud;
pub mod engine;
pub mod whisper;

// ── Public re-exports ──────────────────────────────────────────────────────

pub use cloud::CloudTranscriber;
pub use engine::{select_backend, NoModelTranscriber, TranscribeError, Transcriber};
pub use whisper::{Sampling, WhisperParams, WhisperTranscriber};

// test-only re-export so the session test modules can import MockTranscriber
// without `use voxask::stt::engine::MockTranscriber`.
#[cfg(test)]
pub use engine::MockTranscriber;
