//! Send progress notification port
//!
//! Defines the callbacks a UI receives while a message is being sent.

use rosti_domain::ChatEvent;
use std::time::Duration;

/// Callback for progress updates during a send
///
/// Implementations live in the presentation layer and can display
/// progress in various ways (console, web UI, etc.)
pub trait SendProgressNotifier: Send + Sync {
    /// Called before each attempt (1-based).
    fn on_attempt_start(&self, _attempt: u32) {}

    /// Called for every event applied to the bot message.
    fn on_event(&self, _event: &ChatEvent) {}

    /// Called when the open conversation was cleared for exceeding the
    /// word limit.
    fn on_conversation_limit(&self, _word_count: usize) {}

    /// Called when a retryable failure schedules retry `retry`.
    fn on_retry(&self, retry: u32, max_retries: u32, error: &str, delay: Duration);

    /// Called when the reply completed.
    fn on_complete(&self);

    /// Called when the send failed for good.
    fn on_failed(&self, error: &str);
}

/// No-op progress notifier for when progress reporting is not needed
pub struct NoSendProgress;

impl SendProgressNotifier for NoSendProgress {
    fn on_retry(&self, _retry: u32, _max_retries: u32, _error: &str, _delay: Duration) {}
    fn on_complete(&self) {}
    fn on_failed(&self, _error: &str) {}
}
