//! Use cases
//!
//! Application-level operations that orchestrate domain logic.

pub mod conversations;
pub mod dispatch;
pub mod message_actions;
pub mod retry;
pub mod send_message;
