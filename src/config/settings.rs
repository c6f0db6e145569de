//! Environment-driven application settings.
//!
//! All keys are optional: every setting has a default, and malformed values
//! fall back to that default, so [`AppConfig::from_env`] never fails. `main`
//! loads an optional `.env` file before this module reads the process
//! environment.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// SttBackend
// ---------------------------------------------------------------------------

/// Selects which transcription backend answers [`Transcriber`] calls.
///
/// | Variant        | Engine                                  | Network |
/// |----------------|-----------------------------------------|---------|
/// | LocalFast      | whisper-rs, greedy sampling             | No      |
/// | Cloud          | OpenAI-compatible transcription API     | Yes     |
/// | LocalReference | whisper-rs, beam-search sampling        | No      |
///
/// Selection happens once at startup; the chosen backend handles every
/// transcription for the life of the process.
///
/// [`Transcriber`]: crate::stt::Transcriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SttBackend {
    /// Local whisper with greedy sampling — lowest latency.
    LocalFast,
    /// Remote transcription API — no local model file required.
    Cloud,
    /// Local whisper with beam-search sampling — slower, higher accuracy.
    LocalReference,
}

impl Default for SttBackend {
    fn default() -> Self {
        Self::LocalFast
    }
}

impl SttBackend {
    /// Parses a `TRANSCRIBE_BACKEND` selector string.
    ///
    /// Unknown selectors fall back to [`SttBackend::LocalFast`] with a
    /// warning rather than aborting startup.
    pub fn from_selector(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "local-fast" | "" => Self::LocalFast,
            "cloud" => Self::Cloud,
            "local-reference" => Self::LocalReference,
            other => {
                log::warn!("config: unknown TRANSCRIBE_BACKEND '{other}', using local-fast");
                Self::LocalFast
            }
        }
    }

    /// Short human-readable name used in startup logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::LocalFast => "local-fast",
            Self::Cloud => "cloud",
            Self::LocalReference => "local-reference",
        }
    }
}

// ---------------------------------------------------------------------------
// GateConfig
// ---------------------------------------------------------------------------

/// Thresholds for the audio quality gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    /// RMS amplitude floor below which a clip counts as silence (0.0 – 1.0).
    pub silence_threshold: f32,
    /// Minimum clip length in seconds before transcription is attempted.
    pub min_duration_secs: f32,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            silence_threshold: 0.01,
            min_duration_secs: 0.5,
        }
    }
}

// ---------------------------------------------------------------------------
// SttConfig
// ---------------------------------------------------------------------------

/// Settings for the transcription backends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SttConfig {
    /// Which backend handles transcription.
    pub backend: SttBackend,
    /// GGML model file stem for the local backends (e.g. `"base.en"`).
    pub model: String,
    /// Directory holding `<model>.bin` — `None` means the platform data dir.
    pub model_dir: Option<PathBuf>,
    /// Speech language as an ISO-639-1 code, or `"auto"` for detection.
    pub language: String,
    /// Base URL of the cloud transcription API.
    pub cloud_base_url: String,
    /// Bearer token for the cloud backend — `None` sends no auth header.
    pub cloud_api_key: Option<String>,
    /// Model identifier sent to the cloud backend.
    pub cloud_model: String,
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            backend: SttBackend::default(),
            model: "base.en".into(),
            model_dir: None,
            language: "en".into(),
            cloud_base_url: "https://api.openai.com".into(),
            cloud_api_key: None,
            cloud_model: "whisper-1".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// SearchConfig
// ---------------------------------------------------------------------------

/// Settings for the remote semantic-search service.
///
/// `role`, `database`, `schema` and `service` are identifiers on the remote
/// side; unquoted values are upper-cased when the connection is resolved
/// (see [`crate::rag::normalize_identifier`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Base URL of the search service.
    pub base_url: String,
    /// Bearer token shared by the search and completion calls.
    pub api_key: Option<String>,
    /// Role the connection reports in diagnostics.
    pub role: String,
    /// Database holding the search index.
    pub database: String,
    /// Schema holding the search index.
    pub schema: String,
    /// Name of the search service to query.
    pub service: String,
    /// How many results to request — only the top one is used.
    pub chunk_limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".into(),
            api_key: None,
            role: "lab_role".into(),
            database: String::new(),
            schema: String::new(),
            service: "HAEBI_CORTEX_SEARCH_SERVICE".into(),
            chunk_limit: 1,
        }
    }
}

// ---------------------------------------------------------------------------
// CompletionConfig
// ---------------------------------------------------------------------------

/// Settings for the remote completion endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    /// Base URL of the completion API — defaults to the search base URL.
    pub base_url: String,
    /// Model identifier sent to the completion API.
    pub model: String,
    /// Maximum seconds to wait for a completion before timing out.
    pub timeout_secs: u64,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".into(),
            model: "claude-3-5-sonnet".into(),
            timeout_secs: 30,
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration.
///
/// # Environment keys
///
/// | Key | Default | Setting |
/// |---|---|---|
/// | `SILENCE_THRESH` | `0.01` | `gate.silence_threshold` |
/// | `MIN_DURATION_S` | `0.5` | `gate.min_duration_secs` |
/// | `TRANSCRIBE_BACKEND` | `local-fast` | `stt.backend` |
/// | `WHISPER_MODEL` | `base.en` | `stt.model` |
/// | `WHISPER_MODEL_DIR` | platform data dir | `stt.model_dir` |
/// | `WHISPER_LANGUAGE` | `en` | `stt.language` |
/// | `TRANSCRIBE_BASE_URL` | `https://api.openai.com` | `stt.cloud_base_url` |
/// | `TRANSCRIBE_API_KEY` | unset | `stt.cloud_api_key` |
/// | `TRANSCRIBE_CLOUD_MODEL` | `whisper-1` | `stt.cloud_model` |
/// | `SEARCH_BASE_URL` | `http://localhost:8000` | `search.base_url` |
/// | `SEARCH_API_KEY` | unset | `search.api_key` |
/// | `SEARCH_ROLE` | `lab_role` | `search.role` |
/// | `SEARCH_DATABASE` | empty | `search.database` |
/// | `SEARCH_SCHEMA` | empty | `search.schema` |
/// | `SEARCH_SERVICE` | `HAEBI_CORTEX_SEARCH_SERVICE` | `search.service` |
/// | `CHUNK_LIMIT` | `1` | `search.chunk_limit` |
/// | `COMPLETE_BASE_URL` | `SEARCH_BASE_URL` | `completion.base_url` |
/// | `COMPLETE_MODEL` | `claude-3-5-sonnet` | `completion.model` |
/// | `COMPLETE_TIMEOUT_SECS` | `30` | `completion.timeout_secs` |
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Audio quality gate thresholds.
    pub gate: GateConfig,
    /// Transcription backend settings.
    pub stt: SttConfig,
    /// Remote search settings.
    pub search: SearchConfig,
    /// Remote completion settings.
    pub completion: CompletionConfig,
}

impl AppConfig {
    /// Builds the configuration from the process environment.
    ///
    /// Never fails: missing keys take their documented default, and values
    /// that do not parse are ignored the same way.
    pub fn from_env() -> Self {
        let search_base = trim_base_url(env_string("SEARCH_BASE_URL", "http://localhost:8000"));

        Self {
            gate: GateConfig {
                silence_threshold: env_parse_f32("SILENCE_THRESH", 0.01),
                min_duration_secs: env_parse_f32("MIN_DURATION_S", 0.5),
            },
            stt: SttConfig {
                backend: SttBackend::from_selector(&env_string("TRANSCRIBE_BACKEND", "")),
                model: env_string("WHISPER_MODEL", "base.en"),
                model_dir: std::env::var("WHISPER_MODEL_DIR").ok().map(PathBuf::from),
                language: env_string("WHISPER_LANGUAGE", "en"),
                cloud_base_url: trim_base_url(env_string(
                    "TRANSCRIBE_BASE_URL",
                    "https://api.openai.com",
                )),
                cloud_api_key: env_opt("TRANSCRIBE_API_KEY"),
                cloud_model: env_string("TRANSCRIBE_CLOUD_MODEL", "whisper-1"),
            },
            search: SearchConfig {
                base_url: search_base.clone(),
                api_key: env_opt("SEARCH_API_KEY"),
                role: env_string("SEARCH_ROLE", "lab_role"),
                database: env_string("SEARCH_DATABASE", ""),
                schema: env_string("SEARCH_SCHEMA", ""),
                service: env_string("SEARCH_SERVICE", "HAEBI_CORTEX_SEARCH_SERVICE"),
                chunk_limit: env_parse_usize("CHUNK_LIMIT", 1),
            },
            completion: CompletionConfig {
                base_url: trim_base_url(env_string("COMPLETE_BASE_URL", &search_base)),
                model: env_string("COMPLETE_MODEL", "claude-3-5-sonnet"),
                timeout_secs: env_parse_u64("COMPLETE_TIMEOUT_SECS", 30),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Env helpers
// ---------------------------------------------------------------------------

fn env_string(key: &str, default: &str) -> String {
    match std::env::var(key) {
        Ok(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => default.to_string(),
    }
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse_f32(key: &str, default: f32) -> f32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<f32>().ok())
        .unwrap_or(default)
}

fn env_parse_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_parse_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(default)
}

fn trim_base_url(url: String) -> String {
    url.trim_end_matches('/').to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
