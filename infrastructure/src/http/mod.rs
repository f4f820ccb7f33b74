//! HTTP adapter for the chat backend.

mod client;
mod decoder;
mod error;

pub use client::HttpChatApi;
pub use decoder::Utf8ChunkDecoder;
pub use error::HttpSetupError;
