//! Chat behaviour parameters.
//!
//! [`ChatConfig`] groups the static parameters used by
//! [`SendMessageUseCase`](crate::use_cases::send_message::SendMessageUseCase).

use rosti_domain::{AttachmentPolicy, RetryPolicy, SearchOptions};

/// Word budget of a conversation before it is cleared client-side.
pub const MAX_WORD_COUNT: usize = 200_000;

/// Chat sending parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatConfig {
    /// Clear the open conversation once it holds this many words.
    pub max_word_count: usize,
    /// Initial retrieval switches.
    pub search: SearchOptions,
    /// Limits on files added to a draft.
    pub attachments: AttachmentPolicy,
    /// Retry policy for the streaming send.
    pub retry: RetryPolicy,
    /// Retry policy for attachment uploads.
    pub upload_retry: RetryPolicy,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_word_count: MAX_WORD_COUNT,
            search: SearchOptions::default(),
            attachments: AttachmentPolicy::default(),
            retry: RetryPolicy::for_chat(),
            upload_retry: RetryPolicy::for_upload(),
        }
    }
}

impl ChatConfig {
    // ==================== Builder Methods ====================

    pub fn with_max_word_count(mut self, max: usize) -> Self {
        self.max_word_count = max;
        self
    }

    pub fn with_search(mut self, search: SearchOptions) -> Self {
        self.search = search;
        self
    }

    pub fn with_attachments(mut self, policy: AttachmentPolicy) -> Self {
        self.attachments = policy;
        self
    }

    pub fn with_retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    pub fn with_upload_retry(mut self, policy: RetryPolicy) -> Self {
        self.upload_retry = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_defaults() {
        let config = ChatConfig::default();
        assert_eq!(config.max_word_count, 200_000);
        assert_eq!(config.retry.timeout, Duration::from_secs(900));
        assert_eq!(config.upload_retry.max_retries, 2);
        assert!(config.search.search_ai_active);
    }

    #[test]
    fn test_builders() {
        let config = ChatConfig::default()
            .with_max_word_count(10)
            .with_retry(RetryPolicy::default().with_max_retries(1));
        assert_eq!(config.max_word_count, 10);
        assert_eq!(config.retry.max_retries, 1);
    }
}
