//! Configuration file loading for rosti-chat
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `ROSTI_*` environment variables
//! 2. `--config <path>` specified file
//! 3. Project root: `./rosti.toml` or `./.rosti.toml`
//! 4. Global: `$XDG_CONFIG_HOME/rosti-chat/config.toml`
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{
    ConfigValidationError, DEFAULT_BASE_URL, FileApiConfig, FileChatConfig, FileConfig,
    FileLoggingConfig, FileRetryConfig, FileUploadConfig,
};
pub use loader::ConfigLoader;
