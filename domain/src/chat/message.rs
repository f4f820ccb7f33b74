//! Message entity and its value objects.
//!
//! A [`Message`] is either a user turn or a bot turn. Bot turns are created
//! as *placeholders* (`loading = true`, temporary id) and grow in place while
//! the reply streams in; see [`ChatStore`](super::store::ChatStore).

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Prefix used for locally generated message ids.
pub const TEMP_ID_PREFIX: &str = "temp-";

/// Who wrote a message
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    /// Messages without a sender are treated as bot replies.
    #[default]
    Bot,
}

impl Sender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sender::User => "user",
            Sender::Bot => "bot",
        }
    }
}

/// Thumbs-up / thumbs-down rating on a bot message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Feedback {
    Like,
    Dislike,
}

impl Feedback {
    pub fn as_str(&self) -> &'static str {
        match self {
            Feedback::Like => "like",
            Feedback::Dislike => "dislike",
        }
    }
}

/// A file stored server-side and referenced from a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    pub filename: String,
    pub bucket_name: String,
    pub object_name: String,
    pub size: u64,
    pub content_type: String,
    #[serde(default)]
    pub upload_timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
}

/// One retrieved document backing an answer.
///
/// Knowledge-base hits carry `rag_item_name`/`filename`; online hits carry
/// other keys, which are kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rag_item_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_preview: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl SourceDocument {
    /// Best human-readable label for this document.
    pub fn display_name(&self) -> &str {
        self.rag_item_name
            .as_deref()
            .or(self.filename.as_deref())
            .or(self.source.as_deref())
            .or_else(|| self.extra.get("title").and_then(Value::as_str))
            .unwrap_or("untitled source")
    }
}

/// Retrieval metadata attached to a bot message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    #[serde(default)]
    pub source_documents: Vec<SourceDocument>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// A single chat message (Entity)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    #[serde(default)]
    pub sender: Sender,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub content: String,
    #[serde(
        rename = "thinkingProcess",
        default,
        deserialize_with = "null_as_empty"
    )]
    pub thinking: String,
    #[serde(default, alias = "timestamp", skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub attachments: Vec<Attachment>,
    #[serde(
        default,
        deserialize_with = "lenient_search_results",
        skip_serializing_if = "Option::is_none"
    )]
    pub search_results: Option<SearchResults>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<Feedback>,
    /// Set while the reply is still streaming. Never persisted.
    #[serde(skip)]
    pub loading: bool,
}

impl Message {
    /// Create a user message as typed in the composer.
    pub fn user(content: impl Into<String>, attachments: Vec<Attachment>) -> Self {
        Self {
            id: None,
            conversation_id: None,
            sender: Sender::User,
            content: content.into(),
            thinking: String::new(),
            time: Some(chrono::Utc::now().to_rfc3339()),
            attachments,
            search_results: None,
            feedback: None,
            loading: false,
        }
    }

    /// Create an empty, loading bot message with the given temporary id.
    pub fn placeholder(temp_id: impl Into<String>) -> Self {
        Self {
            id: Some(temp_id.into()),
            conversation_id: None,
            sender: Sender::Bot,
            content: String::new(),
            thinking: String::new(),
            time: Some(chrono::Utc::now().to_rfc3339()),
            attachments: Vec::new(),
            search_results: Some(SearchResults::default()),
            feedback: None,
            loading: true,
        }
    }

    /// Create a finished bot message carrying an error marker.
    pub fn bot_error(error: impl std::fmt::Display) -> Self {
        let mut message = Self::placeholder(String::new());
        message.id = None;
        message.content = format!("Error: {}", error);
        message.loading = false;
        message
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn is_user(&self) -> bool {
        self.sender == Sender::User
    }

    pub fn is_bot(&self) -> bool {
        self.sender == Sender::Bot
    }

    /// True for ids generated locally and not yet confirmed by the server.
    pub fn is_temporary(&self) -> bool {
        self.id.as_deref().is_some_and(|id| id.starts_with(TEMP_ID_PREFIX))
    }

    /// Retrieved documents, if any.
    pub fn source_documents(&self) -> &[SourceDocument] {
        self.search_results
            .as_ref()
            .map(|r| r.source_documents.as_slice())
            .unwrap_or_default()
    }

    /// Number of whitespace-separated words in the content.
    pub fn word_count(&self) -> usize {
        self.content.split_whitespace().count()
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// The server sends `search_results` either as an object or as a bare list.
fn lenient_search_results<'de, D>(deserializer: D) -> Result<Option<SearchResults>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Object(map)) => serde_json::from_value(Value::Object(map)).ok(),
        Some(Value::Array(items)) => Some(SearchResults {
            source_documents: serde_json::from_value(Value::Array(items)).unwrap_or_default(),
            extra: serde_json::Map::new(),
        }),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_server_message() {
        let raw = json!({
            "_id": "m1",
            "conversation_id": "c1",
            "sender": "bot",
            "content": "hello",
            "timestamp": "2024-05-01T10:00:00",
            "attachments": [],
            "search_results": [{"rag_item_name": "Handbook", "content": "..."}],
            "feedback": "like"
        });
        let message: Message = serde_json::from_value(raw).unwrap();
        assert_eq!(message.id(), Some("m1"));
        assert!(message.is_bot());
        assert_eq!(message.time.as_deref(), Some("2024-05-01T10:00:00"));
        assert_eq!(message.source_documents().len(), 1);
        assert_eq!(message.source_documents()[0].display_name(), "Handbook");
        assert_eq!(message.feedback, Some(Feedback::Like));
        assert!(!message.loading);
    }

    #[test]
    fn test_missing_sender_defaults_to_bot() {
        let message: Message = serde_json::from_value(json!({"content": null})).unwrap();
        assert!(message.is_bot());
        assert_eq!(message.content, "");
        assert!(message.attachments.is_empty());
    }

    #[test]
    fn test_search_results_object_form() {
        let message: Message = serde_json::from_value(json!({
            "sender": "bot",
            "content": "x",
            "search_results": {
                "source_documents": [{"filename": "a.pdf"}],
                "online_results": [{"title": "t", "href": "h", "body": "b"}]
            }
        }))
        .unwrap();
        let results = message.search_results.unwrap();
        assert_eq!(results.source_documents[0].display_name(), "a.pdf");
        assert!(results.extra.contains_key("online_results"));
    }

    #[test]
    fn test_placeholder_is_temporary_and_loading() {
        let message = Message::placeholder("temp-1-1");
        assert!(message.is_temporary());
        assert!(message.loading);
        assert!(message.content.is_empty());
        assert!(message.thinking.is_empty());
        assert!(message.time.is_some());
    }

    #[test]
    fn test_bot_error_marker() {
        let message = Message::bot_error("HTTP 403: Forbidden");
        assert_eq!(message.content, "Error: HTTP 403: Forbidden");
        assert!(!message.loading);
        assert!(message.id.is_none());
    }

    #[test]
    fn test_word_count() {
        let message = Message::user("  one two\n three  ", vec![]);
        assert_eq!(message.word_count(), 3);
    }
}
