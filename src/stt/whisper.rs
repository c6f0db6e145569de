//! Local Whisper backend via `whisper_rs`.
//!
//! One [`WhisperTranscriber`] serves both local backend selectors — they
//! differ only in sampling profile:
//!
//! | Selector          | Profile                      | Trade-off            |
//! |-------------------|------------------------------|----------------------|
//! | `local-fast`      | greedy, `best_of = 1`        | lowest latency       |
//! | `local-reference` | beam search, `beam_size = 5` | higher accuracy      |
//!
//! The GGML model is loaded once at startup and shared; each call creates
//! its own `WhisperState`, so concurrent calls need no locking. Inference
//! is CPU-bound and runs under `spawn_blocking` to keep the session task
//! responsive.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use whisper_rs::{FullParams, WhisperContext, WhisperContextParameters};

use crate::stt::engine::{TranscribeError, Transcriber};

// ---------------------------------------------------------------------------
// Sampling / WhisperParams
// ---------------------------------------------------------------------------

/// Mirrors `whisper_rs::SamplingStrategy` but is owned and `Clone`.
#[derive(Debug, Clone, PartialEq)]
pub enum Sampling {
    /// Greedy (single-pass) decoding.
    Greedy {
        /// Candidate tokens evaluated per step. 1 is fastest.
        best_of: i32,
    },
    /// Beam-search decoding.
    BeamSearch {
        /// Number of beams maintained in parallel.
        beam_size: i32,
        /// Beam-search patience factor (≥ 1.0 is standard beam search).
        patience: f32,
    },
}

/// Settings for a single Whisper inference run.
#[derive(Debug, Clone)]
pub struct WhisperParams {
    /// ISO-639-1 language code, or `"auto"` for built-in detection.
    pub language: String,
    /// Decoding strategy.
    pub sampling: Sampling,
    /// CPU threads handed to Whisper, capped at 8.
    pub n_threads: i32,
}

impl WhisperParams {
    /// Low-latency profile backing the `local-fast` selector.
    pub fn fast(language: &str) -> Self {
        Self {
            language: language.to_string(),
            sampling: Sampling::Greedy { best_of: 1 },
            n_threads: optimal_threads(),
        }
    }

    /// Accuracy-leaning profile backing the `local-reference` selector.
    pub fn reference(language: &str) -> Self {
        Self {
            language: language.to_string(),
            sampling: Sampling::BeamSearch {
                beam_size: 5,
                patience: 1.0,
            },
            n_threads: optimal_threads(),
        }
    }
}

/// Physical CPU threads to use for inference, capped at 8 — Whisper shows
/// diminishing returns past that.
fn optimal_threads() -> i32 {
    std::thread::available_parallelism()
        .map(|n| n.get().min(8) as i32)
        .unwrap_or(4)
}

// ---------------------------------------------------------------------------
// WhisperTranscriber
// ---------------------------------------------------------------------------

/// Local transcription backend wrapping a `whisper_rs::WhisperContext`.
pub struct WhisperTranscriber {
    ctx: Arc<WhisperContext>,
    params: WhisperParams,
}

impl std::fmt::Debug for WhisperTranscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhisperTranscriber")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

// `WhisperContext` holds a raw pointer internally but declares
// `unsafe impl Send` and `unsafe impl Sync` in whisper-rs — the model
// weights are read-only after loading.  `WhisperParams` is fully owned
// and trivially Send+Sync.
// SAFETY: WhisperContext is Send+Sync as declared by whisper-rs.
unsafe impl Send for WhisperTranscriber {}
unsafe impl Sync for WhisperTranscriber {}

impl WhisperTranscriber {
    /// Load a GGML model from `model_path` and prepare it for inference.
    ///
    /// # Errors
    ///
    /// - [`TranscribeError::ModelNotFound`] — `model_path` does not exist.
    /// - [`TranscribeError::BackendUnavailable`] — whisper-rs could not load
    ///   the file.
    pub fn load(
        model_path: impl AsRef<Path>,
        params: WhisperParams,
    ) -> Result<Self, TranscribeError> {
        let path = model_path.as_ref();

        if !path.exists() {
            return Err(TranscribeError::ModelNotFound(path.display().to_string()));
        }

        let path_str = path.to_str().ok_or_else(|| {
            TranscribeError::ModelNotFound(format!(
                "model path contains non-UTF-8 characters: {}",
                path.display()
            ))
        })?;

        let ctx_params = WhisperContextParameters::default();
        let ctx = WhisperContext::new_with_params(path_str, ctx_params)
            .map_err(|e| TranscribeError::BackendUnavailable(e.to_string()))?;

        Ok(Self {
            ctx: Arc::new(ctx),
            params,
        })
    }
}

#[async_trait]
impl Transcriber for WhisperTranscriber {
    async fn transcribe(&self, samples: &[f32]) -> Result<String, TranscribeError> {
        let ctx = Arc::clone(&self.ctx);
        let params = self.params.clone();
        let audio = samples.to_vec();

        let text = tokio::task::spawn_blocking(move || run_inference(&ctx, &params, &audio))
            .await
            .map_err(|e| {
                TranscribeError::BackendUnavailable(format!("inference task failed: {e}"))
            })??;

        if text.is_empty() {
            return Err(TranscribeError::EmptyTranscript);
        }
        Ok(text)
    }
}

/// One blocking inference pass: build `FullParams`, run, concatenate
/// segments, trim.
fn run_inference(
    ctx: &WhisperContext,
    params: &WhisperParams,
    audio: &[f32],
) -> Result<String, TranscribeError> {
    use whisper_rs::SamplingStrategy as WS;
    let ws = match params.sampling {
        Sampling::Greedy { best_of } => WS::Greedy { best_of },
        Sampling::BeamSearch {
            beam_size,
            patience,
        } => WS::BeamSearch {
            beam_size,
            patience,
        },
    };

    let mut fp = FullParams::new(ws);

    // set_language takes an Option<&str> whose lifetime is tied to fp.
    // Both `fp` and the borrow of `params.language` remain alive until
    // state.full() returns, so the borrow is valid.
    let lang: Option<&str> = if params.language == "auto" {
        None
    } else {
        Some(params.language.as_str())
    };
    fp.set_language(lang);
    fp.set_n_threads(params.n_threads);
    fp.set_print_progress(false);
    fp.set_print_realtime(false);

    let mut state = ctx
        .create_state()
        .map_err(|e| TranscribeError::BackendUnavailable(e.to_string()))?;

    state
        .full(fp, audio)
        .map_err(|e| TranscribeError::BackendUnavailable(e.to_string()))?;

    let n_segments = state
        .full_n_segments()
        .map_err(|e| TranscribeError::BackendUnavailable(e.to_string()))?;

    let mut text = String::new();
    for i in 0..n_segments {
        let seg_text = state
            .full_get_segment_text(i)
            .map_err(|e| TranscribeError::BackendUnavailable(format!("segment {i}: {e}")))?;
        text.push_str(&seg_text);
    }

    Ok(text.trim().to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
