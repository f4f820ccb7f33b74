//! Send message use case.
//!
//! Orchestrates one logical send:
//!
//! 1. clear the open conversation if it exceeds the word budget
//! 2. upload selected files (retried on its own policy)
//! 3. create a conversation if none is selected
//! 4. append the user message and a bot placeholder
//! 5. stream the reply under the [`RetryController`], resetting the
//!    placeholder before every attempt
//! 6. finalize, or surface the failure inline as the bot message
//! 7. once the busy flag is released, sync the conversation list with the
//!    server
//!
//! Failures after the send has started are never returned as `Err`: they
//! become an inline error message and [`SendOutcome::Failed`].

use crate::config::ChatConfig;
use crate::context::ChatContext;
use crate::ports::chat_api::{ApiError, ChatApi};
use crate::ports::progress::SendProgressNotifier;
use crate::ports::transcript::{TranscriptEvent, TranscriptLogger};
use crate::use_cases::dispatch::{DispatchStats, EventDispatcher};
use crate::use_cases::retry::{RetryController, RetryError};
use rosti_domain::{
    Attachment, Conversation, DomainError, Draft, Message, OutgoingMessage, PendingFile,
    RetryState, SearchOptions,
};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Errors that prevent a send (or recovery action) from starting.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SendError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Nothing to retry")]
    NothingToRetry,

    #[error("Retry is not available")]
    RetryUnavailable,

    #[error("No partial response to recover")]
    NoPartialResponse,
}

impl SendError {
    pub fn is_busy(&self) -> bool {
        matches!(self, SendError::Domain(e) if e.is_busy())
    }
}

/// Result of a send that was allowed to start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Blank draft; nothing was sent.
    Skipped,
    /// The reply streamed to completion.
    Completed {
        conversation_id: String,
        message_id: String,
    },
    /// The send failed; the error is shown as the bot message.
    Failed { error: String, retryable: bool },
}

impl SendOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, SendOutcome::Completed { .. })
    }
}

/// Payload and message positions of the most recent send, kept for a
/// manual retry.
#[derive(Debug, Clone)]
struct CapturedSend {
    message: OutgoingMessage,
    user_index: Option<usize>,
    bot_id: Option<String>,
}

/// Outcome of the sending steps, before the server sync.
struct Delivery {
    outcome: SendOutcome,
    /// The conversation was created by this send.
    created: bool,
}

impl Delivery {
    fn done(outcome: SendOutcome) -> Self {
        Self {
            outcome,
            created: false,
        }
    }
}

/// Use case for sending messages and recovering from failed sends.
pub struct SendMessageUseCase<A: ChatApi + 'static> {
    api: Arc<A>,
    ctx: ChatContext,
    config: ChatConfig,
    search: Mutex<SearchOptions>,
    transcript: Arc<dyn TranscriptLogger>,
    last_send: Mutex<Option<CapturedSend>>,
}

impl<A: ChatApi + 'static> SendMessageUseCase<A> {
    pub fn new(
        api: Arc<A>,
        ctx: ChatContext,
        config: ChatConfig,
        transcript: Arc<dyn TranscriptLogger>,
    ) -> Self {
        let search = Mutex::new(config.search);
        Self {
            api,
            ctx,
            config,
            search,
            transcript,
            last_send: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    pub async fn search_options(&self) -> SearchOptions {
        *self.search.lock().await
    }

    pub async fn set_search_options(&self, options: SearchOptions) {
        *self.search.lock().await = options;
    }

    /// Copy of the retry state of the current logical send.
    pub async fn retry_state(&self) -> RetryState {
        self.ctx.retry_snapshot().await
    }

    /// Send the draft.
    ///
    /// The draft text is cleared only when the reply completes; selected
    /// files are consumed by the upload either way.
    pub async fn send(
        &self,
        draft: &mut Draft,
        progress: &dyn SendProgressNotifier,
    ) -> Result<SendOutcome, SendError> {
        if draft.is_blank() {
            debug!("Ignoring blank draft");
            return Ok(SendOutcome::Skipped);
        }

        self.ctx.store().await.begin_send()?;
        let delivery = self.send_draft(draft, progress).await;
        self.ctx.store().await.end_send();
        Ok(self.settle(delivery).await)
    }

    async fn send_draft(
        &self,
        draft: &mut Draft,
        progress: &dyn SendProgressNotifier,
    ) -> Delivery {
        self.ctx.retry_state().await.reset();
        self.enforce_word_limit(progress).await;

        let attachments = if draft.files.is_empty() {
            Vec::new()
        } else {
            let files = std::mem::take(&mut draft.files);
            match self.upload(&files).await {
                Ok(attachments) => attachments,
                Err(e) => return Delivery::done(self.fail_upload(e, progress).await),
            }
        };

        let search = SearchOptions {
            show_think_process: self.ctx.store().await.show_think_process(),
            ..self.search_options().await
        };
        let message = OutgoingMessage::new(draft.text.trim(), attachments, search);

        let delivery = self.deliver(message, progress).await;
        if delivery.outcome.is_completed() {
            draft.text.clear();
        }
        delivery
    }

    /// Whether [`retry_last`](Self::retry_last) would be accepted now.
    pub async fn can_retry(&self) -> bool {
        if self.last_send.lock().await.is_none() || self.ctx.store().await.is_sending() {
            return false;
        }
        self.ctx
            .retry_state()
            .await
            .can_retry(self.config.retry.max_retries)
    }

    /// Resend the last failed message.
    ///
    /// The failed user and bot messages are removed first, and the captured
    /// payload (including already uploaded attachments) is sent again.
    pub async fn retry_last(
        &self,
        progress: &dyn SendProgressNotifier,
    ) -> Result<SendOutcome, SendError> {
        let captured = self
            .last_send
            .lock()
            .await
            .clone()
            .ok_or(SendError::NothingToRetry)?;
        if !self.can_retry().await {
            return Err(SendError::RetryUnavailable);
        }

        self.ctx.store().await.begin_send()?;
        info!("Retrying last message");

        if let Some(bot_id) = &captured.bot_id {
            let mut store = self.ctx.store().await;
            match captured.user_index {
                Some(user_index) => {
                    store.remove_exchange(user_index, &captured.message.content, bot_id)
                }
                // Conversation creation failed; only the error message was added.
                None => {
                    store.remove_message(bot_id);
                }
            }
        }
        self.enforce_word_limit(progress).await;

        let delivery = self.deliver(captured.message, progress).await;
        self.ctx.store().await.end_send();
        Ok(self.settle(delivery).await)
    }

    /// Replace the failed bot message with the text received before the
    /// failure.
    pub async fn use_partial_response(&self) -> Result<(), SendError> {
        let partial = self.ctx.retry_state().await.partial_response.clone();
        if partial.is_empty() {
            return Err(SendError::NoPartialResponse);
        }
        let bot_id = self
            .last_send
            .lock()
            .await
            .as_ref()
            .and_then(|c| c.bot_id.clone())
            .ok_or(SendError::NothingToRetry)?;

        self.ctx.store().await.use_partial(&bot_id, &partial);
        self.ctx.retry_state().await.reset();
        info!("Recovered {} chars of partial response", partial.len());
        Ok(())
    }

    /// Forget the last error.
    pub async fn dismiss_error(&self) {
        self.ctx.retry_state().await.reset();
    }

    // ==================== Send Steps ====================

    async fn enforce_word_limit(&self, progress: &dyn SendProgressNotifier) {
        let mut store = self.ctx.store().await;
        if store.current().is_none() {
            return;
        }
        let words = store.word_count();
        if words >= self.config.max_word_count {
            warn!(
                "Conversation holds {} words (limit {}); starting a new one",
                words, self.config.max_word_count
            );
            store.clear_current();
            drop(store);
            progress.on_conversation_limit(words);
        }
    }

    async fn upload(&self, files: &[PendingFile]) -> Result<Vec<Attachment>, RetryError> {
        let conversation_id = self.ctx.store().await.current_id().map(str::to_string);
        let conversation_id = conversation_id.as_deref();
        info!("Uploading {} file(s)", files.len());

        let controller = RetryController::new(self.config.upload_retry.clone());
        controller
            .execute_with_retry(
                |_| self.api.upload_files(files, conversation_id),
                |retry, error, delay| {
                    warn!("Upload retry {} in {:?}: {}", retry, delay, error);
                },
            )
            .await
    }

    async fn fail_upload(
        &self,
        error: RetryError,
        progress: &dyn SendProgressNotifier,
    ) -> SendOutcome {
        let text = format!("File upload failed: {}", error);
        warn!("{}", text);
        self.ctx.store().await.push_error_message(&text);
        progress.on_failed(&text);
        SendOutcome::Failed {
            error: text,
            retryable: false,
        }
    }

    /// Steps 3 to 6 of a send, shared by fresh sends and manual retries.
    async fn deliver(
        &self,
        message: OutgoingMessage,
        progress: &dyn SendProgressNotifier,
    ) -> Delivery {
        *self.last_send.lock().await = Some(CapturedSend {
            message: message.clone(),
            user_index: None,
            bot_id: None,
        });

        let (conversation_id, created) = match self.ensure_conversation(&message).await {
            Ok(found) => found,
            Err(e) => {
                let text = e.to_string();
                warn!("Could not create conversation: {}", text);
                let error_id = self.ctx.store().await.push_error_message(&text);
                if let Some(captured) = self.last_send.lock().await.as_mut() {
                    captured.bot_id = Some(error_id);
                }
                self.record_failure(&text, e.is_retryable()).await;
                progress.on_failed(&text);
                return Delivery::done(SendOutcome::Failed {
                    retryable: e.is_retryable(),
                    error: text,
                });
            }
        };

        let (user_index, bot_id) = {
            let mut store = self.ctx.store().await;
            let user_index = store.push_user_message(Message::user(
                &message.content,
                message.attachments.clone(),
            ));
            (user_index, store.insert_placeholder())
        };
        if let Some(captured) = self.last_send.lock().await.as_mut() {
            captured.user_index = Some(user_index);
            captured.bot_id = Some(bot_id.clone());
        }

        let max_retries = self.config.retry.max_retries;
        let controller =
            RetryController::with_state(self.config.retry.clone(), self.ctx.retry_state_handle());
        let conversation = conversation_id.as_str();
        let placeholder = bot_id.as_str();
        let outgoing = &message;

        let result = controller
            .execute_with_retry(
                |attempt| self.attempt(attempt, conversation, outgoing, placeholder, progress),
                |retry, error, delay| {
                    progress.on_retry(retry, max_retries, &error.to_string(), delay)
                },
            )
            .await;

        match result {
            Ok(stats) => {
                debug!("Reply complete: {:?}", stats);
                self.ctx.store().await.finalize(&bot_id);
                self.ctx.retry_state().await.reset();
                self.record_transcript(&conversation_id, &message, &bot_id, None)
                    .await;
                progress.on_complete();
                Delivery {
                    outcome: SendOutcome::Completed {
                        conversation_id,
                        message_id: bot_id,
                    },
                    created,
                }
            }
            Err(e) => {
                let text = e.to_string();
                warn!("Send failed: {}", text);
                self.ctx.store().await.fail(&bot_id, &text);
                self.record_failure(&text, e.is_retryable()).await;
                self.record_transcript(&conversation_id, &message, &bot_id, Some(&text))
                    .await;
                progress.on_failed(&text);
                Delivery::done(SendOutcome::Failed {
                    retryable: e.is_retryable(),
                    error: text,
                })
            }
        }
    }

    /// One streaming attempt against the placeholder.
    async fn attempt(
        &self,
        attempt: u32,
        conversation_id: &str,
        message: &OutgoingMessage,
        placeholder: &str,
        progress: &dyn SendProgressNotifier,
    ) -> Result<DispatchStats, ApiError> {
        debug!("Streaming attempt {} for {}", attempt, placeholder);
        progress.on_attempt_start(attempt);
        self.ctx.store().await.reset_placeholder(placeholder);
        self.ctx.retry_state().await.begin_attempt();

        let stream = self.api.stream_message(conversation_id, message).await?;
        EventDispatcher::new(&self.ctx, placeholder, progress)
            .drain(stream, self.config.retry.heartbeat_timeout)
            .await
    }

    /// The selected conversation id, creating a conversation if needed.
    async fn ensure_conversation(
        &self,
        message: &OutgoingMessage,
    ) -> Result<(String, bool), ApiError> {
        if let Some(id) = self.ctx.store().await.current_id() {
            return Ok((id.to_string(), false));
        }

        let seed = match message.attachments.first() {
            Some(first) if message.content.is_empty() => first.filename.as_str(),
            _ => message.content.as_str(),
        };
        let title = Conversation::title_from_message(seed);
        let conversation = self.api.create_conversation(&title).await?;
        if conversation.id.is_empty() {
            return Err(ApiError::InvalidResponse(
                "Failed to create new conversation".to_string(),
            ));
        }

        info!("Created conversation {} ({})", conversation.id, title);
        let id = conversation.id.clone();
        self.ctx.store().await.open_new(conversation);
        Ok((id, true))
    }

    /// Pull server-confirmed state after a completed send.
    ///
    /// The conversation list is always refreshed. A new conversation also
    /// reloads its history so messages carry server ids. Failures keep the
    /// local state.
    /// Arm manual retry only for a retryable failure; the counter restarts
    /// so an exhausted automatic loop can still be retried by hand.
    async fn record_failure(&self, text: &str, retryable: bool) {
        let mut state = self.ctx.retry_state().await;
        state.record_failure(text);
        if retryable {
            state.retry_count = 0;
        } else {
            state.last_error = None;
        }
    }

    /// Post-send bookkeeping, run after the busy flag has been released.
    async fn settle(&self, delivery: Delivery) -> SendOutcome {
        let SendOutcome::Completed {
            conversation_id,
            message_id,
        } = delivery.outcome
        else {
            return delivery.outcome;
        };
        self.reconcile(&conversation_id, delivery.created).await;
        let message_id = self.reply_id(&message_id).await;
        SendOutcome::Completed {
            conversation_id,
            message_id,
        }
    }

    async fn reconcile(&self, conversation_id: &str, created: bool) {
        match self.api.list_conversations().await {
            Ok(conversations) => self.ctx.store().await.replace_conversations(conversations),
            Err(e) => warn!("Failed to refresh conversations: {}", e),
        }

        if !created {
            return;
        }
        match self.api.list_messages(conversation_id).await {
            Ok(messages) if !messages.is_empty() => {
                let mut store = self.ctx.store().await;
                if let Some(current) = store.current().cloned()
                    && current.id == conversation_id
                {
                    store.select(current, messages);
                }
            }
            Ok(_) => {}
            Err(e) => warn!("Failed to reload messages of {}: {}", conversation_id, e),
        }
    }

    /// Id of the finished reply; a reload may have replaced the temporary id.
    async fn reply_id(&self, temp_id: &str) -> String {
        let store = self.ctx.store().await;
        if store.message(temp_id).is_some() {
            return temp_id.to_string();
        }
        store
            .messages()
            .iter()
            .rev()
            .find(|m| m.is_bot())
            .and_then(|m| m.id().map(str::to_string))
            .unwrap_or_else(|| temp_id.to_string())
    }

    async fn record_transcript(
        &self,
        conversation_id: &str,
        message: &OutgoingMessage,
        bot_id: &str,
        error: Option<&str>,
    ) {
        let reply = self
            .ctx
            .store()
            .await
            .message(bot_id)
            .map(|m| m.content.clone())
            .unwrap_or_default();
        self.transcript.log(TranscriptEvent::new(
            "exchange",
            json!({
                "conversation_id": conversation_id,
                "user": message.content,
                "attachments": message.attachments.len(),
                "bot": reply,
                "outcome": if error.is_some() { "failed" } else { "completed" },
                "error": error,
            }),
        ));
    }
}
