//! Chat domain.
//!
//! - [`conversation::Conversation`]: a titled, server-owned conversation
//! - [`message::Message`]: one user or bot turn
//! - [`draft::Draft`]: what the user is composing, with attachment limits
//! - [`store::ChatStore`]: the in-memory state machine mutated while streaming

pub mod conversation;
pub mod draft;
pub mod message;
pub mod store;
