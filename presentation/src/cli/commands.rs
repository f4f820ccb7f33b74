//! CLI command definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// CLI arguments for rosti-chat
#[derive(Parser, Debug)]
#[command(name = "rosti-chat")]
#[command(author, version, about = "Terminal client for the Rosti knowledge chat")]
#[command(long_about = r#"
rosti-chat sends a message to the Rosti chat backend and streams the answer
to the terminal. Dropped connections are retried with exponential backoff.

Configuration files are loaded from (in priority order):
1. ROSTI_* environment variables (e.g. ROSTI_API__TOKEN)
2. --config <path>     Explicit config file
3. ./rosti.toml        Project-level config
4. ~/.config/rosti-chat/config.toml   Global config

Example:
  rosti-chat "Summarise the onboarding guide"
  rosti-chat --file report.pdf "What are the key figures?"
  rosti-chat --conversation 65f0c0ffee --think "And for 2023?"
  rosti-chat --chat
  rosti-chat list
"#)]
pub struct Cli {
    /// The message to send (not required in chat mode)
    pub message: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,

    /// Start interactive chat mode
    #[arg(short, long)]
    pub chat: bool,

    /// Attach a file (pdf, docx or xlsx; can be specified multiple times)
    #[arg(short, long, value_name = "PATH")]
    pub file: Vec<PathBuf>,

    /// Continue an existing conversation instead of starting a new one
    #[arg(long, value_name = "ID")]
    pub conversation: Option<String>,

    /// Ask the server to stream its thinking process
    #[arg(long)]
    pub think: bool,

    /// Disable knowledge-base search
    #[arg(long)]
    pub no_search_ai: bool,

    /// Enable Rosti document search
    #[arg(long)]
    pub search_rosti: bool,

    /// Enable online search
    #[arg(long)]
    pub search_online: bool,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress progress indicators and live streaming
    #[arg(short, long)]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long)]
    pub no_config: bool,

    /// Show configuration file locations and exit
    #[arg(long)]
    pub show_config: bool,
}

/// Conversation management subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List conversations
    List,

    /// Rename a conversation
    Rename {
        /// Conversation id
        id: String,
        /// New title
        title: String,
    },

    /// Delete a conversation
    Delete {
        /// Conversation id
        id: String,
    },
}
