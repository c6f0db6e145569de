//! Shared types for the retrieval-augmented answer pipeline.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Fixed response strings
// ---------------------------------------------------------------------------

/// Appended as a normal assistant turn when the search finds nothing —
/// a defined empty-result path, not an error.
pub const NO_CONTENT_FALLBACK: &str = "I couldn't find anything relevant in search.";

/// Substituted when the completion comes back empty, so the conversation
/// never shows a blank assistant bubble.
pub const EMPTY_COMPLETION_PLACEHOLDER: &str = "(empty)";

// ---------------------------------------------------------------------------
// RagError
// ---------------------------------------------------------------------------

/// Errors internal to the search and completion calls.
///
/// These never escape the answerer boundary: [`RagAnswerer::answer`] converts
/// them into a failed [`Answer`] instead of propagating.
///
/// [`RagAnswerer::answer`]: crate::rag::RagAnswerer
#[derive(Debug, Error)]
pub enum RagError {
    /// HTTP transport or connection error.
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// The request did not complete within the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// The service answered with a non-success status.
    #[error("service returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body could not be parsed as expected JSON.
    #[error("failed to parse response: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for RagError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            RagError::Timeout
        } else {
            RagError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// Answer
// ---------------------------------------------------------------------------

/// What the answerer hands back for every query — it never fails outright.
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    /// Generated answer, fixed fallback, or user-facing error string.
    pub text: String,
    /// True when a remote step failed and `text` explains the failure.
    pub failed: bool,
    /// Resolved connection context (`role=… db=… schema=… service=…`),
    /// present on success and failure alike.
    pub search_debug: String,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_maps_from_reqwest() {
        // Cannot fabricate a reqwest timeout error directly; check Display
        // for the variants we construct ourselves instead.
        assert_eq!(RagError::Timeout.to_string(), "request timed out");
    }

    #[test]
    fn status_display_includes_code_and_body() {
        let e = RagError::Status {
            status: 503,
            body: "service unavailable".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("503"), "{msg}");
        assert!(msg.contains("service unavailable"), "{msg}");
    }
}
