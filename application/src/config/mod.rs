//! Application-level configuration.
//!
//! - [`ChatConfig`]: word limit, retrieval switches, attachment limits and
//!   retry policies used while sending

pub mod chat_config;

pub use chat_config::{ChatConfig, MAX_WORD_COUNT};
