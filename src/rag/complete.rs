//! Grounded completion call.
//!
//! One request to an OpenAI-compatible `/v1/chat/completions` endpoint with
//! a prompt that instructs the model to answer **only** from the retrieved
//! chunk. The prompt wording is part of the product behavior — answers must
//! stay grounded — so it is fixed here rather than configurable.

use crate::rag::connection::Connection;
use crate::rag::types::RagError;

// ---------------------------------------------------------------------------
// Prompt
// ---------------------------------------------------------------------------

/// Grounding prompt sent as the single user message.
pub(crate) fn build_grounding_prompt(question: &str, context: &str) -> String {
    format!(
        "You are a helpful assistant. Answer based ONLY on the provided context.\n\n\
         Question: {question}\n\nContext:\n{context}\n\nAnswer clearly and concisely:"
    )
}

// ---------------------------------------------------------------------------
// complete_with_context
// ---------------------------------------------------------------------------

/// Ask the remote LLM to answer `question` from `context`.
///
/// Returns the trimmed response text — possibly empty; the caller decides
/// what an empty answer renders as.
pub(crate) async fn complete_with_context(
    conn: &Connection,
    question: &str,
    context: &str,
) -> Result<String, RagError> {
    let prompt = build_grounding_prompt(question, context);

    let body = serde_json::json!({
        "model": conn.completion_model,
        "messages": [
            { "role": "user", "content": prompt }
        ],
        "stream": false,
    });

    let req = conn.authorize(conn.client.post(conn.completions_url()).json(&body));
    let response = req.send().await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(RagError::Status {
            status: status.as_u16(),
            body,
        });
    }

    let json: serde_json::Value = response
        .json()
        .await
        .map_err(|e| RagError::Parse(e.to_string()))?;

    let answer = json["choices"][0]["message"]["content"]
        .as_str()
        .ok_or_else(|| RagError::Parse("response has no message content".into()))?
        .trim()
        .to_string();

    Ok(answer)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
