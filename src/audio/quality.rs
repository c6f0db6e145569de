//! Pre-transcription audio quality gating.
//!
//! [`QualityGate`] measures a decoded clip and decides whether it carries
//! enough usable voice to be worth a transcription call:
//!
//! | Measure  | Definition                                        |
//! |----------|---------------------------------------------------|
//! | duration | `samples / sample_rate`, in seconds               |
//! | rms      | root mean square over samples clamped to [-1, 1]  |
//! | peak     | largest absolute clamped sample                   |
//!
//! A clip is accepted when it is long enough **and** either its rms clears
//! the silence threshold or its peak clears three times that threshold (a
//! short loud transient in an otherwise quiet clip still counts as voice).
//!
//! # Example
//!
//! ```rust
//! use voxask::audio::QualityGate;
//!
//! let gate = QualityGate::default();
//!
//! // 1 s of audible signal @ 16 kHz
//! let audio = vec![0.1_f32; 16_000];
//! assert!(gate.evaluate(&audio, 16_000).accepted);
//!
//! // 0.2 s is below the 0.5 s minimum
//! let short = vec![0.1_f32; 3_200];
//! assert!(!gate.evaluate(&short, 16_000).accepted);
//! ```

// ---------------------------------------------------------------------------
// AudioReport
// ---------------------------------------------------------------------------

/// Measurements produced by [`QualityGate::evaluate`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioReport {
    /// Clip length in seconds.
    pub duration_secs: f32,
    /// Root mean square amplitude of the clamped samples.
    pub rms: f32,
    /// Largest absolute clamped sample.
    pub peak: f32,
    /// Whether the clip passed the gate.
    pub accepted: bool,
}

impl AudioReport {
    /// Report for an empty or unreadable clip: all measures zero, rejected.
    pub fn empty() -> Self {
        Self {
            duration_secs: 0.0,
            rms: 0.0,
            peak: 0.0,
            accepted: false,
        }
    }

    /// One-line stats summary shown next to a processed clip.
    pub fn caption(&self) -> String {
        format!(
            "Audio {:.2}s · RMS {:.4} · Peak {:.4}",
            self.duration_secs, self.rms, self.peak
        )
    }
}

// ---------------------------------------------------------------------------
// QualityGate
// ---------------------------------------------------------------------------

/// Decides whether a decoded clip is worth transcribing.
///
/// Pure and deterministic: the same samples always produce the same
/// [`AudioReport`], and nothing is mutated or logged.
#[derive(Debug, Clone, Copy)]
pub struct QualityGate {
    /// Minimum clip length in seconds (default: `0.5`).
    pub min_duration_secs: f32,
    /// RMS amplitude below which a clip counts as silence (default: `0.01`).
    pub silence_threshold: f32,
}

impl Default for QualityGate {
    fn default() -> Self {
        Self {
            min_duration_secs: 0.5,
            silence_threshold: 0.01,
        }
    }
}

impl QualityGate {
    /// Create a gate with explicit thresholds.
    pub fn new(min_duration_secs: f32, silence_threshold: f32) -> Self {
        Self {
            min_duration_secs,
            silence_threshold,
        }
    }

    /// Gate configured from the application settings.
    pub fn from_config(cfg: &crate::config::GateConfig) -> Self {
        Self {
            min_duration_secs: cfg.min_duration_secs,
            silence_threshold: cfg.silence_threshold,
        }
    }

    /// Measure `samples` (mono `f32` at `sample_rate` Hz) and decide.
    ///
    /// Empty input or a zero sample rate yields [`AudioReport::empty`].
    pub fn evaluate(&self, samples: &[f32], sample_rate: u32) -> AudioReport {
        if samples.is_empty() || sample_rate == 0 {
            return AudioReport::empty();
        }

        let duration_secs = samples.len() as f32 / sample_rate as f32;

        let mut sum_squares = 0.0_f64;
        let mut peak = 0.0_f32;
        for &s in samples {
            let clamped = s.clamp(-1.0, 1.0);
            sum_squares += (clamped as f64) * (clamped as f64);
            peak = peak.max(clamped.abs());
        }
        let rms = (sum_squares / samples.len() as f64).sqrt() as f32;

        let long_enough = duration_secs >= self.min_duration_secs;
        let audible = rms >= self.silence_threshold || peak >= 3.0 * self.silence_threshold;

        AudioReport {
            duration_secs,
            rms,
            peak,
            accepted: long_enough && audible,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
