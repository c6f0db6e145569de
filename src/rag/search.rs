//! Top-1 semantic search against the remote index.
//!
//! One POST to the configured search service asking for `chunk_limit`
//! results; only the top-ranked hit is used. Content is pulled from the hit
//! by field-name alias in fixed priority order — indexes name their text
//! column differently — and an unrecognised hit shape degrades to a string
//! dump rather than an error, so a schema drift on the remote side still
//! produces *something* to ground the answer on.

use serde_json::Value;

use crate::rag::connection::Connection;
use crate::rag::types::RagError;

/// Field names that may hold the chunk text, in lookup order.
const CONTENT_ALIASES: [&str; 4] = ["PAGE_CONTENT", "CONTENT", "TEXT", "BODY"];

// ---------------------------------------------------------------------------
// search_top_content
// ---------------------------------------------------------------------------

/// Issue the search and return `(content, debug_line)`.
///
/// `content` is `None` when the index returned no hits. The debug line
/// describes the resolved connection context and is returned on every
/// successful call — diagnosis should not require a failure first.
pub(crate) async fn search_top_content(
    conn: &Connection,
    query: &str,
) -> Result<(Option<String>, String), RagError> {
    let body = serde_json::json!({
        "query": query,
        "columns": [],
        "limit": conn.chunk_limit,
    });

    let req = conn.authorize(conn.client.post(conn.search_url()).json(&body));
    let response = req.send().await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(RagError::Status {
            status: status.as_u16(),
            body,
        });
    }

    let json: Value = response
        .json()
        .await
        .map_err(|e| RagError::Parse(e.to_string()))?;

    let content = first_hit(&json).map(extract_content);
    log::debug!(
        "rag: search for {:?} → {}",
        query,
        if content.is_some() { "hit" } else { "no results" }
    );

    Ok((content, conn.debug_line()))
}

/// Top-ranked hit of a search response, if any.
fn first_hit(response: &Value) -> Option<&Value> {
    response["results"].as_array().and_then(|r| r.first())
}

/// Pull the chunk text out of a hit.
///
/// The first alias *present* wins, even if its value is unusable; a missing
/// or null field degrades to a dump of the whole hit.
fn extract_content(hit: &Value) -> String {
    let mut found: Option<&Value> = None;
    for alias in CONTENT_ALIASES {
        if let Some(v) = hit.get(alias) {
            found = Some(v);
            break;
        }
    }

    match found {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => hit.to_string(),
        Some(other) => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
