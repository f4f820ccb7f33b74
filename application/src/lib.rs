//! Application layer for rosti-chat
//!
//! This crate contains use cases, port definitions, and application configuration.
//! It depends only on the domain layer.

pub mod config;
pub mod context;
pub mod ports;
pub mod use_cases;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types
pub use config::{ChatConfig, MAX_WORD_COUNT};
pub use context::ChatContext;
pub use ports::{
    chat_api::{ApiError, ChatApi, FragmentStream},
    progress::{NoSendProgress, SendProgressNotifier},
    transcript::{NoTranscript, TranscriptEvent, TranscriptLogger},
};
pub use use_cases::conversations::{ConversationError, ManageConversationsUseCase};
pub use use_cases::dispatch::{DispatchOutcome, DispatchStats, EventDispatcher};
pub use use_cases::message_actions::{ActionError, MessageActionsUseCase};
pub use use_cases::retry::{RetryController, RetryError};
pub use use_cases::send_message::{SendError, SendMessageUseCase, SendOutcome};
