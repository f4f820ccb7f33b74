//! Domain layer for rosti-chat
//!
//! This crate contains the core entities and state machines of the chat
//! client. It performs no I/O.
//!
//! # Core Concepts
//!
//! ## Conversation store
//!
//! [`ChatStore`] owns conversations and the open message list. While a reply
//! streams in, a bot *placeholder* message is grown in place, addressed by a
//! temporary id.
//!
//! ## Stream decoding
//!
//! [`BlockFramer`] cuts the raw text stream into `event:`/`data:` blocks and
//! [`ChatEvent`] gives each block a type.
//!
//! ## Retry
//!
//! [`RetryPolicy`] describes bounded exponential backoff, [`RetryState`] is
//! what the UI observes while a send is being retried.

pub mod chat;
pub mod core;
pub mod retry;
pub mod stream;

// Re-export commonly used types
pub use chat::{
    conversation::Conversation,
    draft::{AttachmentPolicy, Draft, OutgoingMessage, PendingFile, SearchOptions},
    message::{Attachment, Feedback, Message, SearchResults, Sender, SourceDocument},
    store::ChatStore,
};
pub use self::core::error::{AttachmentRejection, DomainError};
pub use retry::{classify::is_retryable, policy::RetryPolicy, state::RetryState};
pub use stream::{
    event::{ChatEvent, EventParseError, RawEvent},
    framer::{BlockFramer, frame_all},
};
