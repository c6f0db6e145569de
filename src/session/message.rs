//! Conversation messages.
//!
//! A [`Message`] is one turn of the conversation. Messages are immutable
//! once appended to the history: the session only ever pushes new ones or
//! clears the whole list, never edits or reorders.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Role
// ---------------------------------------------------------------------------

/// Who produced a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The person asking — typed text or an accepted voice transcript.
    User,
    /// The generated (or fallback) answer.
    Assistant,
}

impl Role {
    /// Short label used when rendering a turn.
    pub fn label(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// One turn of the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Who produced this turn.
    pub role: Role,
    /// The turn's text.
    pub content: String,
}

impl Message {
    /// A user turn.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// An assistant turn.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_set_role_and_content() {
        let q = Message::user("What is the return policy?");
        assert_eq!(q.role, Role::User);
        assert_eq!(q.content, "What is the return policy?");

        let a = Message::assistant("30 days.");
        assert_eq!(a.role, Role::Assistant);
        assert_eq!(a.content, "30 days.");
    }

    #[test]
    fn role_labels() {
        assert_eq!(Role::User.label(), "user");
        assert_eq!(Role::Assistant.label(), "assistant");
    }

    #[test]
    fn serializes_with_lowercase_roles() {
        let json = serde_json::to_string(&Message::user("hi")).unwrap();
        assert_eq!(json, r#"{"role":"user","content":"hi"}"#);
    }
}
