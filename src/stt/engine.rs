//! Core transcription trait, error taxonomy and backend selection.
//!
//! # Overview
//!
//! [`Transcriber`] is the interface the session drivers use. It is
//! object-safe and `Send + Sync` so it can be held behind an
//! `Arc<dyn Transcriber>` and called from the session task.
//!
//! [`select_backend`] picks the concrete implementation **once at startup**
//! from configuration; nothing re-dispatches on the selector string per
//! call. When the configured local model file is missing the selection
//! degrades to [`NoModelTranscriber`] so the application still launches and
//! text questions keep working.
//!
//! [`MockTranscriber`] (available under `#[cfg(test)]`) returns a scripted
//! response and counts calls — useful for testing the session lifecycle
//! without a model file or network access.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::{AppPaths, SttBackend, SttConfig};
use crate::stt::cloud::CloudTranscriber;
use crate::stt::whisper::{WhisperParams, WhisperTranscriber};

// ---------------------------------------------------------------------------
// TranscribeError
// ---------------------------------------------------------------------------

/// All errors that can arise from a transcription backend.
///
/// Callers distinguish [`EmptyTranscript`] (the backend ran and produced
/// nothing usable) from [`BackendUnavailable`] (the backend could not run at
/// all) when wording the user-facing message; both halt the pipeline for
/// the clip in question.
///
/// [`EmptyTranscript`]: TranscribeError::EmptyTranscript
/// [`BackendUnavailable`]: TranscribeError::BackendUnavailable
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TranscribeError {
    /// The GGML model file was not found at the given path.
    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// The engine or remote service could not be reached or failed mid-run.
    #[error("transcription backend unavailable: {0}")]
    BackendUnavailable(String),

    /// The backend ran but the transcript trimmed down to nothing.
    #[error("transcription came back empty")]
    EmptyTranscript,
}

// ---------------------------------------------------------------------------
// Transcriber trait
// ---------------------------------------------------------------------------

/// Object-safe, thread-safe interface for transcription backends.
///
/// # Contract
///
/// - `samples` must be **16 kHz, mono, f32** PCM.
/// - A successful result is a non-empty transcript, trimmed of surrounding
///   whitespace. Implementations never return `Ok("")` — a transcript that
///   trims to nothing is [`TranscribeError::EmptyTranscript`].
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe `samples` and return the text transcript.
    async fn transcribe(&self, samples: &[f32]) -> Result<String, TranscribeError>;
}

// Compile-time assertion: Box<dyn Transcriber> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn Transcriber>) {}
};

// ---------------------------------------------------------------------------
// Backend selection
// ---------------------------------------------------------------------------

/// Build the transcription backend configured in `cfg`.
///
/// Local backends need the model file `<model>.bin` in `cfg.model_dir` (or
/// the platform model directory when unset). A missing or unloadable model
/// is not fatal: the returned [`NoModelTranscriber`] reports the problem per
/// call instead, and voice input degrades while text input keeps working.
pub fn select_backend(cfg: &SttConfig) -> Arc<dyn Transcriber> {
    match cfg.backend {
        SttBackend::Cloud => {
            log::info!("stt: using cloud backend ({})", cfg.cloud_model);
            Arc::new(CloudTranscriber::from_config(cfg))
        }
        SttBackend::LocalFast | SttBackend::LocalReference => {
            let model_path = match &cfg.model_dir {
                Some(dir) => dir.join(format!("{}.bin", cfg.model)),
                None => AppPaths::new().model_file(&cfg.model),
            };

            let params = match cfg.backend {
                SttBackend::LocalReference => WhisperParams::reference(&cfg.language),
                _ => WhisperParams::fast(&cfg.language),
            };

            match WhisperTranscriber::load(&model_path, params) {
                Ok(engine) => {
                    log::info!(
                        "stt: using {} backend, model {}",
                        cfg.backend.label(),
                        model_path.display()
                    );
                    Arc::new(engine)
                }
                Err(e) => {
                    log::warn!(
                        "stt: could not load model {} ({e}); voice input will report the problem",
                        model_path.display()
                    );
                    Arc::new(NoModelTranscriber {
                        path: model_path.display().to_string(),
                    })
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// NoModelTranscriber — fallback when the model file is not present
// ---------------------------------------------------------------------------

/// Stub backend used when the configured local model could not be loaded.
///
/// Keeps the application functional without a model file: every call
/// returns [`TranscribeError::ModelNotFound`] with the path that was tried.
pub struct NoModelTranscriber {
    /// Path the model was expected at, echoed in every error.
    pub path: String,
}

#[async_trait]
impl Transcriber for NoModelTranscriber {
    async fn transcribe(&self, _samples: &[f32]) -> Result<String, TranscribeError> {
        Err(TranscribeError::ModelNotFound(self.path.clone()))
    }
}

// ---------------------------------------------------------------------------
// MockTranscriber  (test-only)
// ---------------------------------------------------------------------------

/// A test double that returns a scripted response and counts calls.
///
/// ```rust,ignore
/// let backend = MockTranscriber::ok("what is the return policy");
/// let text = backend.transcribe(&vec![0.0_f32; 8_000]).await.unwrap();
/// assert_eq!(text, "what is the return policy");
/// assert_eq!(backend.calls(), 1);
/// ```
#[cfg(test)]
pub struct MockTranscriber {
    response: Result<String, TranscribeError>,
    calls: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl MockTranscriber {
    /// Create a mock that always returns `Ok(text)`.
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            response: Ok(text.into()),
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// Create a mock that always returns `Err(error)`.
    pub fn err(error: TranscribeError) -> Self {
        Self {
            response: Err(error),
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// How many times `transcribe` has been called.
    pub fn calls(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
#[async_trait]
impl Transcriber for MockTranscriber {
    async fn transcribe(&self, _samples: &[f32]) -> Result<String, TranscribeError> {
        self.calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.response.clone()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_ok_returns_scripted_text() {
        let backend = MockTranscriber::ok("hello world");
        let text = backend.transcribe(&[0.0; 8_000]).await.unwrap();
        assert_eq!(text, "hello world");
    }

    #[tokio::test]
    async fn mock_err_returns_scripted_error() {
        let backend = MockTranscriber::err(TranscribeError::EmptyTranscript);
        let err = backend.transcribe(&[0.0; 8_000]).await.unwrap_err();
        assert_eq!(err, TranscribeError::EmptyTranscript);
    }

    #[tokio::test]
    async fn mock_counts_calls() {
        let backend = MockTranscriber::ok("x");
        assert_eq!(backend.calls(), 0);
        let _ = backend.transcribe(&[]).await;
        let _ = backend.transcribe(&[]).await;
        assert_eq!(backend.calls(), 2);
    }

    #[tokio::test]
    async fn no_model_stub_reports_the_missing_path() {
        let stub = NoModelTranscriber {
            path: "/models/base.en.bin".into(),
        };
        let err = stub.transcribe(&[0.0; 16_000]).await.unwrap_err();
        assert_eq!(
            err,
            TranscribeError::ModelNotFound("/models/base.en.bin".into())
        );
    }

    /// A missing local model must degrade to the stub, not panic or abort.
    #[tokio::test]
    async fn select_backend_degrades_when_model_missing() {
        // A real directory with no model file in it.
        let empty_dir = tempfile::tempdir().unwrap();
        let cfg = SttConfig {
            backend: SttBackend::LocalFast,
            model: "definitely-not-downloaded".into(),
            model_dir: Some(empty_dir.path().to_path_buf()),
            ..SttConfig::default()
        };

        let backend = select_backend(&cfg);
        let err = backend.transcribe(&[0.0; 16_000]).await.unwrap_err();
        assert!(
            matches!(err, TranscribeError::ModelNotFound(_)),
            "expected ModelNotFound, got: {err:?}"
        );
    }

    #[test]
    fn box_dyn_transcriber_compiles() {
        // If this test compiles, the trait is object-safe.
        let _backend: Box<dyn Transcriber> = Box::new(MockTranscriber::ok("ok"));
    }

    #[test]
    fn error_display_distinguishes_empty_from_unavailable() {
        let empty = TranscribeError::EmptyTranscript.to_string();
        let down = TranscribeError::BackendUnavailable("connection refused".into()).to_string();
        assert!(empty.contains("empty"), "{empty}");
        assert!(down.contains("unavailable"), "{down}");
        assert!(down.contains("connection refused"), "{down}");
    }
}
