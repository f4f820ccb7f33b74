//! Interactive chat module
//!
//! Provides a readline-based interactive chat interface.

mod files;
mod repl;

pub use files::read_attachment;
pub use repl::ChatRepl;
