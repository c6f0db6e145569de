//! Cloud transcription backend.
//!
//! Calls any OpenAI-compatible `/v1/audio/transcriptions` endpoint with a
//! multipart upload: the clip is re-encoded as 16 kHz mono WAV and sent as
//! the `file` part alongside the configured `model`. All connection details
//! come from [`SttConfig`]; nothing is hardcoded.

use async_trait::async_trait;

use crate::audio::encode_wav_16k;
use crate::config::SttConfig;
use crate::stt::engine::{TranscribeError, Transcriber};

/// Uploads take longer than chat calls; give the whole request a minute.
const CLOUD_TIMEOUT_SECS: u64 = 60;

// ---------------------------------------------------------------------------
// CloudTranscriber
// ---------------------------------------------------------------------------

/// Remote transcription backend over an OpenAI-compatible API.
pub struct CloudTranscriber {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl CloudTranscriber {
    /// Build a `CloudTranscriber` from application config.
    ///
    /// A default (no-timeout) client is used as a last-resort fallback if
    /// the builder fails (should never happen in practice).
    pub fn from_config(cfg: &SttConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(CLOUD_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            base_url: cfg.cloud_base_url.clone(),
            api_key: cfg.cloud_api_key.clone(),
            model: cfg.cloud_model.clone(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/audio/transcriptions", self.base_url)
    }
}

#[async_trait]
impl Transcriber for CloudTranscriber {
    /// Upload `samples` and return the transcript.
    ///
    /// The `Authorization: Bearer …` header is attached **only** when the
    /// API key is a non-empty string — safe for self-hosted gateways that
    /// require no authentication.
    async fn transcribe(&self, samples: &[f32]) -> Result<String, TranscribeError> {
        let wav = encode_wav_16k(samples)
            .map_err(|e| TranscribeError::BackendUnavailable(format!("encode upload: {e}")))?;

        let file_part = reqwest::multipart::Part::bytes(wav)
            .file_name("query.wav")
            .mime_str("audio/wav")
            .map_err(|e| TranscribeError::BackendUnavailable(e.to_string()))?;

        let form = reqwest::multipart::Form::new()
            .part("file", file_part)
            .text("model", self.model.clone());

        let mut req = self.client.post(self.endpoint()).multipart(form);

        let key = self.api_key.as_deref().unwrap_or("");
        if !key.is_empty() {
            req = req.bearer_auth(key);
        }

        let response = req
            .send()
            .await
            .map_err(|e| TranscribeError::BackendUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(TranscribeError::BackendUnavailable(format!(
                "transcription API returned {}",
                response.status()
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| TranscribeError::BackendUnavailable(format!("parse response: {e}")))?;

        let text = json["text"].as_str().unwrap_or("").trim().to_string();

        if text.is_empty() {
            return Err(TranscribeError::EmptyTranscript);
        }
        Ok(text)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn make_config(api_key: Option<&str>) -> SttConfig {
        SttConfig {
            cloud_base_url: "https://api.example.com".into(),
            cloud_api_key: api_key.map(|s| s.to_string()),
            cloud_model: "whisper-1".into(),
            ..SttConfig::default()
        }
    }

    #[test]
    fn from_config_builds_without_panic() {
        let _backend = CloudTranscriber::from_config(&make_config(None));
    }

    #[test]
    fn from_config_accepts_empty_api_key() {
        let _backend = CloudTranscriber::from_config(&make_config(Some("")));
    }

    #[test]
    fn endpoint_appends_transcriptions_path() {
        let backend = CloudTranscriber::from_config(&make_config(Some("sk-test")));
        assert_eq!(
            backend.endpoint(),
            "https://api.example.com/v1/audio/transcriptions"
        );
    }

    /// Verify `CloudTranscriber` is usable as `dyn Transcriber`.
    #[test]
    fn backend_is_object_safe() {
        let backend: Box<dyn Transcriber> =
            Box::new(CloudTranscriber::from_config(&make_config(None)));
        drop(backend);
    }
}
