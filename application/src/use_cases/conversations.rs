//! Conversation management use case.
//!
//! Listing, opening, renaming and deleting conversations. The conversation
//! list is advisory: failures to load it leave it empty rather than stale.

use crate::context::ChatContext;
use crate::ports::chat_api::{ApiError, ChatApi};
use rosti_domain::Conversation;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConversationError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Title must not be empty")]
    EmptyTitle,
}

/// Use case for browsing and editing conversations.
pub struct ManageConversationsUseCase<A: ChatApi + 'static> {
    api: Arc<A>,
    ctx: ChatContext,
}

impl<A: ChatApi + 'static> ManageConversationsUseCase<A> {
    pub fn new(api: Arc<A>, ctx: ChatContext) -> Self {
        Self { api, ctx }
    }

    /// Reload the conversation list. Returns the number of conversations.
    pub async fn refresh(&self) -> Result<usize, ConversationError> {
        match self.api.list_conversations().await {
            Ok(conversations) => {
                let count = conversations.len();
                self.ctx.store().await.replace_conversations(conversations);
                Ok(count)
            }
            Err(e) => {
                warn!("Failed to load conversations: {}", e);
                self.ctx.store().await.replace_conversations(Vec::new());
                Err(e.into())
            }
        }
    }

    /// Open a conversation and load its messages.
    ///
    /// The conversation becomes current even if its history cannot be
    /// loaded; the message list is then empty.
    pub async fn select(&self, conversation_id: &str) -> Result<usize, ConversationError> {
        let conversation = self
            .ctx
            .store()
            .await
            .conversations()
            .iter()
            .find(|c| c.id == conversation_id)
            .cloned()
            .unwrap_or_else(|| Conversation::new(conversation_id, ""));

        match self.api.list_messages(conversation_id).await {
            Ok(messages) => {
                let count = messages.len();
                info!("Opened conversation {} ({} messages)", conversation_id, count);
                self.ctx.store().await.select(conversation, messages);
                Ok(count)
            }
            Err(e) => {
                warn!("Failed to load messages of {}: {}", conversation_id, e);
                self.ctx.store().await.select(conversation, Vec::new());
                Err(e.into())
            }
        }
    }

    /// Rename a conversation; the server-confirmed title is stored.
    pub async fn rename(
        &self,
        conversation_id: &str,
        title: &str,
    ) -> Result<Conversation, ConversationError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(ConversationError::EmptyTitle);
        }

        let renamed = self.api.rename_conversation(conversation_id, title).await?;
        let confirmed = if renamed.title.is_empty() {
            title
        } else {
            renamed.title.as_str()
        };
        self.ctx.store().await.rename(conversation_id, confirmed);
        Ok(renamed)
    }

    pub async fn delete(&self, conversation_id: &str) -> Result<(), ConversationError> {
        self.api.delete_conversation(conversation_id).await?;
        self.ctx.store().await.remove_conversation(conversation_id);
        info!("Deleted conversation {}", conversation_id);
        Ok(())
    }

    /// Deselect so the next send creates a conversation.
    pub async fn new_conversation(&self) {
        self.ctx.store().await.clear_current();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedChatApi;
    use rosti_domain::Message;

    fn seeded() -> (ManageConversationsUseCase<ScriptedChatApi>, Arc<ScriptedChatApi>, ChatContext) {
        let api = ScriptedChatApi::default();
        api.conversations.lock().unwrap().extend([
            Conversation::new("a", "First"),
            Conversation::new("b", "Second"),
        ]);
        api.histories
            .lock()
            .unwrap()
            .insert("a".to_string(), vec![Message::user("hello", vec![])]);
        let api = Arc::new(api);
        let ctx = ChatContext::new();
        (
            ManageConversationsUseCase::new(Arc::clone(&api), ctx.clone()),
            api,
            ctx,
        )
    }

    #[tokio::test]
    async fn test_refresh_keeps_selection() {
        let (use_case, api, ctx) = seeded();
        use_case.refresh().await.unwrap();
        use_case.select("a").await.unwrap();
        api.conversations.lock().unwrap()[0].title = "Renamed".to_string();

        assert_eq!(use_case.refresh().await.unwrap(), 2);

        let store = ctx.store().await;
        assert_eq!(store.current_id(), Some("a"));
        assert_eq!(store.current().unwrap().title, "Renamed");
        assert_eq!(store.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_refresh_failure_empties_list() {
        let (use_case, api, ctx) = seeded();
        use_case.refresh().await.unwrap();
        *api.list_error.lock().unwrap() = Some(ApiError::Network("down".to_string()));

        assert!(use_case.refresh().await.is_err());
        assert!(ctx.store().await.conversations().is_empty());
    }

    #[tokio::test]
    async fn test_select_failure_leaves_empty_messages() {
        let (use_case, _api, ctx) = seeded();
        use_case.refresh().await.unwrap();
        use_case.select("a").await.unwrap();

        assert!(use_case.select("b").await.is_err());

        let store = ctx.store().await;
        assert_eq!(store.current_id(), Some("b"));
        assert!(store.messages().is_empty());
    }

    #[tokio::test]
    async fn test_rename_updates_list_and_selection() {
        let (use_case, _api, ctx) = seeded();
        use_case.refresh().await.unwrap();
        use_case.select("a").await.unwrap();

        use_case.rename("a", "  Better  ").await.unwrap();

        let store = ctx.store().await;
        assert_eq!(store.conversations()[0].title, "Better");
        assert_eq!(store.current().unwrap().title, "Better");
    }

    #[tokio::test]
    async fn test_rename_rejects_blank_title() {
        let (use_case, _api, _ctx) = seeded();
        assert_eq!(
            use_case.rename("a", "   ").await,
            Err(ConversationError::EmptyTitle)
        );
    }

    #[tokio::test]
    async fn test_delete_current_clears_selection() {
        let (use_case, api, ctx) = seeded();
        use_case.refresh().await.unwrap();
        use_case.select("a").await.unwrap();

        use_case.delete("a").await.unwrap();

        let store = ctx.store().await;
        assert!(store.current().is_none());
        assert!(store.messages().is_empty());
        assert_eq!(store.conversations().len(), 1);
        assert_eq!(api.conversations.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_new_conversation_deselects() {
        let (use_case, _api, ctx) = seeded();
        use_case.refresh().await.unwrap();
        use_case.select("a").await.unwrap();

        use_case.new_conversation().await;

        assert!(ctx.store().await.current().is_none());
    }
}
