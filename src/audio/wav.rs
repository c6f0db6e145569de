//! WAV blob decoding and sample-rate conversion.
//!
//! Recorded queries arrive from the presentation layer as encoded WAV blobs.
//! This module turns a blob into the mono `f32` samples the quality gate and
//! the local transcription engine consume, and re-encodes 16 kHz mono WAV
//! for the cloud transcription upload:
//!
//! 1. [`decode_wav`] — parse a blob, downmix to mono, keep the source rate.
//! 2. [`resample_to_16k`] — linear interpolation to the 16 kHz Whisper rate.
//! 3. [`encode_wav_16k`] — 16-bit mono WAV bytes from 16 kHz samples.
//!
//! Supported encodings: 16/24/32-bit integer and 32-bit float PCM, any
//! channel count, any source rate.

use std::io::Cursor;

use hound::SampleFormat;
use thiserror::Error;

// ---------------------------------------------------------------------------
// AudioError
// ---------------------------------------------------------------------------

/// Reason a blob could not be decoded or encoded.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AudioError {
    /// The blob is not parseable as a WAV file.
    #[error("could not parse WAV data: {0}")]
    MalformedWav(String),

    /// The WAV parsed but uses an encoding this module does not read.
    #[error("unsupported WAV encoding: {bits}-bit {format}")]
    UnsupportedEncoding { bits: u16, format: &'static str },

    /// In-memory WAV encoding failed.
    #[error("could not encode WAV data: {0}")]
    EncodeFailed(String),
}

// ---------------------------------------------------------------------------
// DecodedAudio
// ---------------------------------------------------------------------------

/// A decoded clip: mono `f32` samples at the source rate.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    /// Mono samples in `[-1, 1]` (already downmixed).
    pub samples: Vec<f32>,
    /// Source sample rate in Hz.
    pub sample_rate: u32,
}

// ---------------------------------------------------------------------------
// decode_wav
// ---------------------------------------------------------------------------

/// Parse a WAV blob into mono `f32` samples plus the source rate.
///
/// Multi-channel audio is downmixed by averaging each frame. Integer
/// encodings are scaled to `[-1, 1]`.
pub fn decode_wav(bytes: &[u8]) -> Result<DecodedAudio, AudioError> {
    let reader = hound::WavReader::new(Cursor::new(bytes))
        .map_err(|e| AudioError::MalformedWav(e.to_string()))?;
    let spec = reader.spec();

    let interleaved: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Float, 32) => reader
            .into_samples::<f32>()
            .collect::<Result<_, _>>()
            .map_err(|e| AudioError::MalformedWav(e.to_string()))?,
        (SampleFormat::Int, 16) => reader
            .into_samples::<i16>()
            .map(|s| s.map(|v| v as f32 / 32_768.0))
            .collect::<Result<_, _>>()
            .map_err(|e| AudioError::MalformedWav(e.to_string()))?,
        (SampleFormat::Int, bits @ (24 | 32)) => {
            let scale = (1_i64 << (bits - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()
                .map_err(|e| AudioError::MalformedWav(e.to_string()))?
        }
        (format, bits) => {
            return Err(AudioError::UnsupportedEncoding {
                bits,
                format: match format {
                    SampleFormat::Float => "float",
                    SampleFormat::Int => "int",
                },
            });
        }
    };

    Ok(DecodedAudio {
        samples: downmix_to_mono(&interleaved, spec.channels),
        sample_rate: spec.sample_rate,
    })
}

/// Mix interleaved multi-channel audio down to mono by averaging each frame.
fn downmix_to_mono(samples: &[f32], channels: u16) -> Vec<f32> {
    match channels {
        0 => Vec::new(),
        1 => samples.to_vec(),
        n => {
            let n = n as usize;
            samples
                .chunks_exact(n)
                .map(|frame| frame.iter().sum::<f32>() / n as f32)
                .collect()
        }
    }
}

// ---------------------------------------------------------------------------
// resample_to_16k
// ---------------------------------------------------------------------------

/// Resample mono `samples` from `source_rate` Hz to 16 000 Hz using linear
/// interpolation.
///
/// * Already 16 kHz → the input is returned unchanged (owned copy).
/// * Empty input → empty output.
///
/// The output length is approximately `samples.len() * 16_000 / source_rate`.
pub fn resample_to_16k(samples: &[f32], source_rate: u32) -> Vec<f32> {
    const TARGET_RATE: u32 = 16_000;

    if source_rate == TARGET_RATE {
        return samples.to_vec();
    }

    if samples.is_empty() || source_rate == 0 {
        return Vec::new();
    }

    let ratio = TARGET_RATE as f64 / source_rate as f64;
    let output_len = (samples.len() as f64 * ratio).ceil() as usize;
    let mut output = Vec::with_capacity(output_len);

    for i in 0..output_len {
        let src_pos = i as f64 / ratio;
        let idx = src_pos as usize;
        let frac = src_pos - idx as f64;

        let sample = if idx + 1 < samples.len() {
            // Linear interpolation between adjacent samples
            samples[idx] * (1.0 - frac as f32) + samples[idx + 1] * frac as f32
        } else if idx < samples.len() {
            samples[idx]
        } else {
            0.0
        };

        output.push(sample);
    }

    output
}

// ---------------------------------------------------------------------------
// encode_wav_16k
// ---------------------------------------------------------------------------

/// Encode 16 kHz mono `f32` samples as a 16-bit PCM WAV blob.
///
/// Used for the cloud transcription upload, which takes a file, not raw
/// samples. Samples are clamped to `[-1, 1]` before quantisation.
pub fn encode_wav_16k(samples: &[f32]) -> Result<Vec<u8>, AudioError> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 16_000,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)
            .map_err(|e| AudioError::EncodeFailed(e.to_string()))?;
        for &s in samples {
            let quantised = (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
            writer
                .write_sample(quantised)
                .map_err(|e| AudioError::EncodeFailed(e.to_string()))?;
        }
        writer
            .finalize()
            .map_err(|e| AudioError::EncodeFailed(e.to_string()))?;
    }

    Ok(cursor.into_inner())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
