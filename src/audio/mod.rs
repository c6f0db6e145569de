//! Audio intake — WAV blob decode → quality gate → fingerprint.
//!
//! # Pipeline
//!
//! ```text
//! WAV blob → decode_wav → QualityGate::evaluate → resample_to_16k → Transcriber
//!      └→ fingerprint (duplicate suppression, raw bytes)
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use voxask::audio::{decode_wav, encode_wav_16k, QualityGate};
//!
//! let blob = encode_wav_16k(&vec![0.1_f32; 16_000]).unwrap();
//! let decoded = decode_wav(&blob).unwrap();
//!
//! let report = QualityGate::default().evaluate(&decoded.samples, decoded.sample_rate);
//! assert!(report.accepted);
//! ```

pub mod fingerprint;
pub mod quality;
pub mod wav;

pub use fingerprint::fingerprint;
pub use quality::{AudioReport, QualityGate};
pub use wav::{decode_wav, encode_wav_16k, resample_to_16k, AudioError, DecodedAudio};
