//! Actions on individual messages: feedback and regenerate.

use crate::context::ChatContext;
use crate::ports::chat_api::{ApiError, ChatApi};
use rosti_domain::{DomainError, Feedback};
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ActionError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Message {0} has not been saved yet")]
    NotPersisted(String),
}

pub struct MessageActionsUseCase<A: ChatApi + 'static> {
    api: Arc<A>,
    ctx: ChatContext,
}

impl<A: ChatApi + 'static> MessageActionsUseCase<A> {
    pub fn new(api: Arc<A>, ctx: ChatContext) -> Self {
        Self { api, ctx }
    }

    /// Toggle `feedback` on a message and return the resulting rating.
    ///
    /// Choosing the current rating clears it. The store is updated before
    /// the request and restored if the request fails.
    pub async fn toggle_feedback(
        &self,
        message_id: &str,
        feedback: Feedback,
    ) -> Result<Option<Feedback>, ActionError> {
        let (next, previous) = {
            let mut store = self.ctx.store().await;
            let message = store
                .message(message_id)
                .ok_or_else(|| DomainError::MessageNotFound(message_id.to_string()))?;
            if message.is_temporary() {
                return Err(ActionError::NotPersisted(message_id.to_string()));
            }
            let next = (message.feedback != Some(feedback)).then_some(feedback);
            (next, store.set_feedback(message_id, next)?)
        };

        if let Err(e) = self.api.submit_feedback(message_id, next).await {
            warn!("Feedback for {} failed: {}", message_id, e);
            let _ = self.ctx.store().await.set_feedback(message_id, previous);
            return Err(e.into());
        }
        Ok(next)
    }

    /// Text of the most recent user message, to be put back in the draft.
    pub async fn regenerate(&self) -> Option<String> {
        self.ctx
            .store()
            .await
            .last_user_message()
            .map(|m| m.content.clone())
    }

    /// Id of the most recent bot message that has a server id.
    pub async fn latest_reply_id(&self) -> Option<String> {
        self.ctx
            .store()
            .await
            .messages()
            .iter()
            .rev()
            .find(|m| m.is_bot() && !m.is_temporary())
            .and_then(|m| m.id().map(str::to_string))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedChatApi;
    use rosti_domain::{Conversation, Message, Sender};

    fn reply(id: &str) -> Message {
        Message {
            id: Some(id.to_string()),
            sender: Sender::Bot,
            content: "answer".to_string(),
            ..Message::default()
        }
    }

    async fn setup() -> (MessageActionsUseCase<ScriptedChatApi>, Arc<ScriptedChatApi>, ChatContext) {
        let api = Arc::new(ScriptedChatApi::default());
        let ctx = ChatContext::new();
        ctx.store().await.select(
            Conversation::new("c", "Chat"),
            vec![
                Message::user("first question", vec![]),
                reply("m1"),
                Message::user("second question", vec![]),
                reply("m2"),
            ],
        );
        (MessageActionsUseCase::new(Arc::clone(&api), ctx.clone()), api, ctx)
    }

    #[tokio::test]
    async fn test_feedback_toggles() {
        let (use_case, api, ctx) = setup().await;

        assert_eq!(
            use_case.toggle_feedback("m2", Feedback::Like).await,
            Ok(Some(Feedback::Like))
        );
        assert_eq!(use_case.toggle_feedback("m2", Feedback::Like).await, Ok(None));
        assert_eq!(
            *api.feedback.lock().unwrap(),
            vec![
                ("m2".to_string(), Some(Feedback::Like)),
                ("m2".to_string(), None)
            ]
        );
        assert_eq!(ctx.store().await.message("m2").unwrap().feedback, None);
    }

    #[tokio::test]
    async fn test_feedback_reverts_on_failure() {
        let (use_case, api, ctx) = setup().await;
        use_case.toggle_feedback("m1", Feedback::Like).await.unwrap();
        *api.feedback_error.lock().unwrap() = Some(ApiError::Network("down".to_string()));

        let result = use_case.toggle_feedback("m1", Feedback::Dislike).await;

        assert!(matches!(result, Err(ActionError::Api(_))));
        assert_eq!(
            ctx.store().await.message("m1").unwrap().feedback,
            Some(Feedback::Like)
        );
    }

    #[tokio::test]
    async fn test_feedback_on_unsaved_message_is_rejected() {
        let (use_case, _api, ctx) = setup().await;
        let temp = ctx.store().await.insert_placeholder();

        assert_eq!(
            use_case.toggle_feedback(&temp, Feedback::Like).await,
            Err(ActionError::NotPersisted(temp.clone()))
        );
        assert!(matches!(
            use_case.toggle_feedback("missing", Feedback::Like).await,
            Err(ActionError::Domain(DomainError::MessageNotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_regenerate_returns_last_user_message() {
        let (use_case, _api, _ctx) = setup().await;
        assert_eq!(use_case.regenerate().await.as_deref(), Some("second question"));
        assert_eq!(use_case.latest_reply_id().await.as_deref(), Some("m2"));
    }
}
