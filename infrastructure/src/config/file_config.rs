//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly and converted into application types by
//! [`FileConfig::chat_config`].

use rosti_application::ChatConfig;
use rosti_domain::{AttachmentPolicy, RetryPolicy, SearchOptions};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";

/// Configuration validation errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigValidationError {
    #[error("retry.timeout_ms cannot be 0")]
    InvalidTimeout,

    #[error("retry.backoff_multiplier must be at least 1.0")]
    InvalidBackoffMultiplier,

    #[error("api.base_url cannot be empty")]
    EmptyBaseUrl,
}

/// Raw backend configuration from TOML
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileApiConfig {
    /// Base URL of the REST API, e.g. `https://host/api`
    pub base_url: String,
    /// Bearer token sent with every request
    pub token: Option<String>,
    /// TCP connect timeout in seconds
    pub connect_timeout_secs: u64,
}

impl Default for FileApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token: None,
            connect_timeout_secs: 30,
        }
    }
}

/// Raw retry configuration for streaming sends
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileRetryConfig {
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub backoff_multiplier: f64,
    /// Upper bound for one attempt
    pub timeout_ms: u64,
    /// Longest silence tolerated mid-stream; 0 disables the check
    pub heartbeat_timeout_ms: u64,
}

impl Default for FileRetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay_ms: 2000,
            backoff_multiplier: 1.5,
            timeout_ms: 900_000,
            heartbeat_timeout_ms: 30_000,
        }
    }
}

/// Raw retry configuration for attachment uploads
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileUploadConfig {
    pub max_retries: u32,
    pub retry_delay_ms: u64,
}

impl Default for FileUploadConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            retry_delay_ms: 1000,
        }
    }
}

/// Raw chat behaviour configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileChatConfig {
    pub max_word_count: usize,
    pub show_think_process: bool,
    pub search_ai_active: bool,
    pub search_rosti_active: bool,
    pub search_online_active: bool,
}

impl Default for FileChatConfig {
    fn default() -> Self {
        let search = SearchOptions::default();
        Self {
            max_word_count: rosti_application::MAX_WORD_COUNT,
            show_think_process: search.show_think_process,
            search_ai_active: search.search_ai_active,
            search_rosti_active: search.search_rosti_active,
            search_online_active: search.search_online_active,
        }
    }
}

/// Raw logging configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoggingConfig {
    /// Write tracing output to this file instead of stderr
    pub file: Option<String>,
    /// Append a JSONL record per finished exchange to this file
    pub transcript: Option<String>,
}

/// Complete file configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub api: FileApiConfig,
    pub retry: FileRetryConfig,
    pub upload: FileUploadConfig,
    pub chat: FileChatConfig,
    pub attachments: AttachmentPolicy,
    pub logging: FileLoggingConfig,
}

impl FileConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.retry.timeout_ms == 0 {
            return Err(ConfigValidationError::InvalidTimeout);
        }

        let multiplier = self.retry.backoff_multiplier;
        if multiplier.is_nan() || multiplier < 1.0 {
            return Err(ConfigValidationError::InvalidBackoffMultiplier);
        }

        if self.api.base_url.trim().is_empty() {
            return Err(ConfigValidationError::EmptyBaseUrl);
        }

        Ok(())
    }

    /// Retry policy for streaming sends.
    pub fn retry_policy(&self) -> RetryPolicy {
        let heartbeat = (self.retry.heartbeat_timeout_ms > 0)
            .then(|| Duration::from_millis(self.retry.heartbeat_timeout_ms));
        RetryPolicy::for_chat()
            .with_max_retries(self.retry.max_retries)
            .with_retry_delay(Duration::from_millis(self.retry.retry_delay_ms))
            .with_backoff_multiplier(self.retry.backoff_multiplier)
            .with_timeout(Duration::from_millis(self.retry.timeout_ms))
            .with_heartbeat_timeout(heartbeat)
    }

    /// Retry policy for uploads.
    pub fn upload_policy(&self) -> RetryPolicy {
        RetryPolicy::for_upload()
            .with_max_retries(self.upload.max_retries)
            .with_retry_delay(Duration::from_millis(self.upload.retry_delay_ms))
    }

    pub fn search_options(&self) -> SearchOptions {
        SearchOptions {
            search_ai_active: self.chat.search_ai_active,
            search_rosti_active: self.chat.search_rosti_active,
            search_online_active: self.chat.search_online_active,
            show_think_process: self.chat.show_think_process,
        }
    }

    /// Application-level chat configuration.
    pub fn chat_config(&self) -> ChatConfig {
        ChatConfig::default()
            .with_max_word_count(self.chat.max_word_count)
            .with_search(self.search_options())
            .with_attachments(self.attachments.clone())
            .with_retry(self.retry_policy())
            .with_upload_retry(self.upload_policy())
    }
}
