//! Conversation entity

use super::message::Message;
use serde::{Deserialize, Serialize};

/// Maximum number of characters taken from the first message for a title.
pub const TITLE_MAX_CHARS: usize = 50;

/// A chat conversation (Entity)
///
/// The id is assigned by the server. Message history is normally loaded
/// separately; `messages` is only populated when the server inlines it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<Message>,
}

impl Conversation {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            created_at: None,
            updated_at: None,
            messages: Vec::new(),
        }
    }

    /// Derive a conversation title from the first message.
    ///
    /// Takes the first [`TITLE_MAX_CHARS`] characters and appends `...`
    /// when the message was longer.
    pub fn title_from_message(content: &str) -> String {
        let mut chars = content.chars();
        let head: String = chars.by_ref().take(TITLE_MAX_CHARS).collect();
        if chars.next().is_some() {
            format!("{}...", head)
        } else {
            head
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_short_message_unchanged() {
        assert_eq!(Conversation::title_from_message("Hello"), "Hello");
    }

    #[test]
    fn test_title_exactly_fifty_chars_has_no_ellipsis() {
        let content = "a".repeat(50);
        assert_eq!(Conversation::title_from_message(&content), content);
    }

    #[test]
    fn test_title_truncates_with_ellipsis() {
        let content = "b".repeat(51);
        let title = Conversation::title_from_message(&content);
        assert_eq!(title, format!("{}...", "b".repeat(50)));
    }

    #[test]
    fn test_title_counts_characters_not_bytes() {
        let content = "知".repeat(60);
        let title = Conversation::title_from_message(&content);
        assert_eq!(title.chars().count(), 53);
    }

    #[test]
    fn test_deserialize_conversation() {
        let conversation: Conversation = serde_json::from_str(
            r#"{"_id":"c1","user_id":"7","title":"Hi","created_at":"2024-01-01T00:00:00"}"#,
        )
        .unwrap();
        assert_eq!(conversation.id, "c1");
        assert_eq!(conversation.title, "Hi");
        assert!(conversation.messages.is_empty());
    }
}
