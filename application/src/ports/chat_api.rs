//! Chat API port
//!
//! Defines the interface to the chat backend: conversation CRUD, uploads,
//! feedback and the streaming send endpoint.

use async_trait::async_trait;
use futures::stream::BoxStream;
use rosti_domain::{
    Attachment, Conversation, Feedback, Message, OutgoingMessage, PendingFile, is_retryable,
};
use thiserror::Error;

/// Errors that can occur while talking to the chat backend.
///
/// The display text matters: retry classification matches fragments of it
/// (see [`rosti_domain::is_retryable`]).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Streaming error: {0}")]
    Stream(String),

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("{0}")]
    Other(String),
}

impl ApiError {
    /// Transient failure worth retrying.
    pub fn is_retryable(&self) -> bool {
        is_retryable(&self.to_string())
    }
}

/// Text fragments of a streaming reply, in arrival order.
pub type FragmentStream = BoxStream<'static, Result<String, ApiError>>;

/// Backend for conversations and messages
///
/// Implementations (adapters) live in the infrastructure layer.
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// `GET /chat/conversations/`
    async fn list_conversations(&self) -> Result<Vec<Conversation>, ApiError>;

    /// `POST /chat/conversations/`
    async fn create_conversation(&self, title: &str) -> Result<Conversation, ApiError>;

    /// `GET /chat/conversations/:id/messages/`
    async fn list_messages(&self, conversation_id: &str) -> Result<Vec<Message>, ApiError>;

    /// `POST /chat/conversations/:id/title`
    async fn rename_conversation(
        &self,
        conversation_id: &str,
        title: &str,
    ) -> Result<Conversation, ApiError>;

    /// `DELETE /chat/conversations/:id/`
    async fn delete_conversation(&self, conversation_id: &str) -> Result<(), ApiError>;

    /// Upload files; the server returns the stored attachment references.
    async fn upload_files(
        &self,
        files: &[PendingFile],
        conversation_id: Option<&str>,
    ) -> Result<Vec<Attachment>, ApiError>;

    /// `POST /chat/conversations/:id/messages/`, answered as an event stream.
    ///
    /// Resolves once response headers arrive; the body is then read through
    /// the returned stream.
    async fn stream_message(
        &self,
        conversation_id: &str,
        message: &OutgoingMessage,
    ) -> Result<FragmentStream, ApiError>;

    /// Set or clear the rating of a bot message.
    async fn submit_feedback(
        &self,
        message_id: &str,
        feedback: Option<Feedback>,
    ) -> Result<(), ApiError>;
}
