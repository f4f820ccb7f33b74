//! Typed stream events.
//!
//! Each block produced by the [`BlockFramer`](super::framer::BlockFramer)
//! carries at most one `event:` line and one `data:` line. [`ChatEvent`]
//! is the closed set of events the chat client understands; anything else
//! becomes [`ChatEvent::Unknown`] so newer servers can add events freely.
//!
//! | event      | data                              |
//! |------------|-----------------------------------|
//! | `thought`  | JSON string                       |
//! | `text`     | JSON string                       |
//! | `metadata` | `{"source_documents": [...]}`     |
//! | `error`    | `{"error": "..."}`                |

use crate::chat::message::SourceDocument;
use serde_json::Value;
use thiserror::Error;

/// Event name used when a block has no `event:` line.
pub const DEFAULT_EVENT_NAME: &str = "message";

/// A decoded event from the reply stream.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    /// A fragment of the model's thinking trace.
    Thought(String),
    /// A fragment of the answer text.
    Text(String),
    /// The full list of retrieved documents (replaces any previous list).
    Metadata(Vec<SourceDocument>),
    /// A server-side failure reported inside the stream.
    Error(String),
    /// An event this client does not know about.
    Unknown { name: String },
}

/// Why a block could not be turned into a [`ChatEvent`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EventParseError {
    #[error("invalid JSON in `{event}` event ({message}): {data}")]
    InvalidJson {
        event: String,
        data: String,
        message: String,
    },

    #[error("unexpected payload for `{event}` event: {data}")]
    UnexpectedPayload { event: String, data: String },
}

/// The `event:` / `data:` pair of a block, before JSON decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawEvent<'a> {
    pub name: &'a str,
    pub data: Option<&'a str>,
}

impl<'a> RawEvent<'a> {
    /// Pick out the `event:` and `data:` lines of a block.
    ///
    /// Other lines are ignored. If a field repeats, the last one wins.
    pub fn split(block: &'a str) -> Self {
        let mut name = DEFAULT_EVENT_NAME;
        let mut data = None;

        for line in block.split('\n').filter(|l| !l.is_empty()) {
            if let Some(rest) = line.strip_prefix("event:") {
                name = rest.trim();
            } else if let Some(rest) = line.strip_prefix("data:") {
                data = Some(rest.trim());
            }
        }

        Self { name, data }
    }
}

impl ChatEvent {
    /// Parse one framed block.
    ///
    /// Returns `Ok(None)` for blocks without a (non-empty) `data:` line.
    pub fn parse_block(block: &str) -> Result<Option<Self>, EventParseError> {
        let raw = RawEvent::split(block);
        match raw.data {
            Some(data) if !data.is_empty() => Self::from_parts(raw.name, data).map(Some),
            _ => Ok(None),
        }
    }

    /// Decode the JSON `data` of an event named `name`.
    pub fn from_parts(name: &str, data: &str) -> Result<Self, EventParseError> {
        let value: Value =
            serde_json::from_str(data).map_err(|e| EventParseError::InvalidJson {
                event: name.to_string(),
                data: data.to_string(),
                message: e.to_string(),
            })?;

        let unexpected = || EventParseError::UnexpectedPayload {
            event: name.to_string(),
            data: data.to_string(),
        };

        match name {
            "thought" => match value {
                Value::String(s) => Ok(ChatEvent::Thought(s)),
                _ => Err(unexpected()),
            },
            "text" => match value {
                Value::String(s) => Ok(ChatEvent::Text(s)),
                _ => Err(unexpected()),
            },
            "metadata" => match value {
                Value::Object(mut map) => {
                    let documents = match map.remove("source_documents") {
                        None | Some(Value::Null) => Vec::new(),
                        Some(docs) => serde_json::from_value(docs).map_err(|_| unexpected())?,
                    };
                    Ok(ChatEvent::Metadata(documents))
                }
                _ => Err(unexpected()),
            },
            "error" => Ok(ChatEvent::Error(match value {
                Value::String(s) => s,
                Value::Object(ref map) => match map.get("error") {
                    Some(Value::String(s)) => s.clone(),
                    _ => value.to_string(),
                },
                other => other.to_string(),
            })),
            _ => Ok(ChatEvent::Unknown {
                name: name.to_string(),
            }),
        }
    }

    /// Wire name of this event.
    pub fn name(&self) -> &str {
        match self {
            ChatEvent::Thought(_) => "thought",
            ChatEvent::Text(_) => "text",
            ChatEvent::Metadata(_) => "metadata",
            ChatEvent::Error(_) => "error",
            ChatEvent::Unknown { name } => name,
        }
    }
}
