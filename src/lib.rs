//! voxask — a voice-driven question-answering front end.
//!
//! Capture a short voice or text query, transcribe speech to text, retrieve
//! the most relevant chunk from a remote search index, and ask a remote LLM
//! to answer from that chunk. The heavy lifting is delegated to external
//! engines and services; this crate sequences the calls, gates audio
//! quality, and owns the per-session conversation state machine.
//!
//! # Modules
//!
//! | Module      | Responsibility                                        |
//! |-------------|-------------------------------------------------------|
//! | [`config`]  | environment-driven settings and model paths           |
//! | [`audio`]   | WAV decode, quality gate, blob fingerprint            |
//! | [`stt`]     | transcription adapter and its interchangeable backends|
//! | [`rag`]     | retrieval-augmented answerer over shared connection   |
//! | [`session`] | the request lifecycle state machine and host loop     |
//! | [`view`]    | the render-on-demand conversation view contract       |
//!
//! # Flow
//!
//! ```text
//! voice blob ─▶ decode ─▶ QualityGate ─▶ Transcriber ─▶ pending query ┐
//! typed text ────────────────────────────────────────▶ pending query ┤
//!                                                                    ▼
//!                    RequestLifecycle::advance (one step per cycle)
//!                                                                    │
//!                   search top chunk ─▶ grounded completion ─▶ answer┘
//! ```

pub mod audio;
pub mod config;
pub mod rag;
pub mod session;
pub mod stt;
pub mod view;
