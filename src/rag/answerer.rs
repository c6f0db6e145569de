//! The `Answerer` trait and its retrieval-augmented implementation.
//!
//! [`RagAnswerer`] composes the two remote steps:
//!
//! 1. search for the single most relevant chunk ([`search_top_content`]);
//! 2. ask the LLM to answer from that chunk ([`complete_with_context`]) —
//!    never invoked when step 1 found nothing.
//!
//! Every failure from either step is caught **here** and turned into a
//! user-facing [`Answer`] with the `failed` flag set; `answer` has no error
//! path, so a refresh cycle can never be crashed by the remote side.
//!
//! [`search_top_content`]: crate::rag::search::search_top_content
//! [`complete_with_context`]: crate::rag::complete::complete_with_context

use async_trait::async_trait;

use crate::config::AppConfig;
use crate::rag::complete::complete_with_context;
use crate::rag::connection::ConnectionCache;
use crate::rag::search::search_top_content;
use crate::rag::types::{Answer, EMPTY_COMPLETION_PLACEHOLDER, NO_CONTENT_FALLBACK};

// ---------------------------------------------------------------------------
// Answerer trait
// ---------------------------------------------------------------------------

/// Async interface for answering a text query.
///
/// Implementors must be `Send + Sync` so they can be shared as
/// `Arc<dyn Answerer>` with the session task.
#[async_trait]
pub trait Answerer: Send + Sync {
    /// Answer `query`. Infallible by contract: failures are folded into the
    /// returned [`Answer`].
    async fn answer(&self, query: &str) -> Answer;
}

// Compile-time assertion: Box<dyn Answerer> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn Answerer>) {}
};

// ---------------------------------------------------------------------------
// RagAnswerer
// ---------------------------------------------------------------------------

/// Production answerer: remote search + grounded completion over a shared,
/// lazily-established connection.
pub struct RagAnswerer {
    cache: ConnectionCache,
}

impl RagAnswerer {
    /// Build an answerer owning its own connection cache.
    pub fn from_config(cfg: &AppConfig) -> Self {
        Self {
            cache: ConnectionCache::new(cfg.search.clone(), cfg.completion.clone()),
        }
    }

    /// Resolve the connection before the first question. Best-effort —
    /// callers ignore the outcome.
    pub fn warmup(&self) {
        self.cache.warmup();
    }
}

#[async_trait]
impl Answerer for RagAnswerer {
    async fn answer(&self, query: &str) -> Answer {
        let conn = self.cache.get();

        let (content, search_debug) = match search_top_content(conn, query).await {
            Ok(found) => found,
            Err(e) => {
                log::warn!("rag: search failed: {e}");
                return Answer {
                    text: format!("Search failed: {e}"),
                    failed: true,
                    search_debug: conn.debug_line(),
                };
            }
        };

        let content = match usable_content(content) {
            Some(c) => c,
            None => {
                return Answer {
                    text: NO_CONTENT_FALLBACK.to_string(),
                    failed: false,
                    search_debug,
                };
            }
        };

        match complete_with_context(conn, query, &content).await {
            Ok(text) => Answer {
                text: non_empty_answer(text),
                failed: false,
                search_debug,
            },
            Err(e) => {
                log::warn!("rag: completion failed: {e}");
                Answer {
                    text: format!("Answer generation failed: {e}"),
                    failed: true,
                    search_debug,
                }
            }
        }
    }
}

/// Grounding content must be non-blank; a hit whose text boils down to
/// nothing is treated the same as no hit.
fn usable_content(content: Option<String>) -> Option<String> {
    content.filter(|c| !c.trim().is_empty())
}

/// An empty completion renders as a fixed placeholder, never as a blank
/// assistant bubble.
fn non_empty_answer(text: String) -> String {
    if text.is_empty() {
        EMPTY_COMPLETION_PLACEHOLDER.to_string()
    } else {
        text
    }
}

// ---------------------------------------------------------------------------
// MockAnswerer  (test-only)
// ---------------------------------------------------------------------------

/// A test double that returns a scripted [`Answer`] and counts calls.
#[cfg(test)]
pub struct MockAnswerer {
    response: Answer,
    calls: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl MockAnswerer {
    /// Mock that answers every query with `text`.
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            response: Answer {
                text: text.into(),
                failed: false,
                search_debug: "role=TEST db=TEST schema=TEST service=TEST".into(),
            },
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// Mock that reports a failed remote step.
    pub fn failing(text: impl Into<String>) -> Self {
        Self {
            response: Answer {
                failed: true,
                ..Self::ok(text).response
            },
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// Mock that finds no relevant content.
    pub fn no_content() -> Self {
        Self::ok(NO_CONTENT_FALLBACK)
    }

    /// How many times `answer` has been called.
    pub fn calls(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
#[async_trait]
impl Answerer for MockAnswerer {
    async fn answer(&self, _query: &str) -> Answer {
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
    use crate::config::AppConfig;

    #[test]
    fn usable_content_rejects_blank() {
        assert_eq!(usable_content(None), None);
        assert_eq!(usable_content(Some(String::new())), None);
        assert_eq!(usable_content(Some("   \n".into())), None);
        assert_eq!(usable_content(Some("chunk".into())), Some("chunk".into()));
    }

    #[test]
    fn empty_completion_becomes_placeholder() {
        assert_eq!(non_empty_answer(String::new()), EMPTY_COMPLETION_PLACEHOLDER);
        assert_eq!(non_empty_answer("real answer".into()), "real answer");
    }

    #[test]
    fn from_config_builds_without_network() {
        let answerer = RagAnswerer::from_config(&AppConfig::default());
        // Warmup resolves the connection eagerly; still no network needed.
        answerer.warmup();
    }

    #[tokio::test]
    async fn mock_answers_and_counts() {
        let answerer = MockAnswerer::ok("the answer");
        let a = answerer.answer("question?").await;
        assert_eq!(a.text, "the answer");
        assert!(!a.failed);
        assert!(a.search_debug.contains("role="));
        assert_eq!(answerer.calls(), 1);
    }

    #[tokio::test]
    async fn mock_no_content_uses_fixed_fallback() {
        let answerer = MockAnswerer::no_content();
        let a = answerer.answer("question?").await;
        assert_eq!(a.text, NO_CONTENT_FALLBACK);
        assert!(!a.failed);
    }

    #[test]
    fn answerer_is_object_safe() {
        let _: Box<dyn Answerer> = Box::new(MockAnswerer::ok("x"));
    }
}
