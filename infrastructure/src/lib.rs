//! Infrastructure layer for rosti-chat
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer, including configuration file loading.

pub mod config;
pub mod http;
pub mod logging;

// Re-export commonly used types
pub use config::{
    ConfigLoader, ConfigValidationError, FileApiConfig, FileChatConfig, FileConfig,
    FileLoggingConfig, FileRetryConfig, FileUploadConfig,
};
pub use http::{HttpChatApi, HttpSetupError, Utf8ChunkDecoder};
pub use logging::JsonlTranscriptLogger;
