//! In-memory conversation state.
//!
//! [`ChatStore`] is the single writer of message content. A send walks the
//! store through
//!
//! ```text
//! idle -> user message appended -> placeholder inserted -> streaming -> finalized | errored
//! ```
//!
//! Streaming mutations address the bot placeholder by its temporary id. If
//! the placeholder is gone (for example the user switched conversation
//! mid-stream) the mutation is dropped and reported as such.

use super::conversation::Conversation;
use super::message::{Attachment, Feedback, Message, SearchResults, TEMP_ID_PREFIX};
use crate::core::error::DomainError;
use crate::stream::event::ChatEvent;

/// Authoritative model of conversations and the open message list.
#[derive(Debug, Default)]
pub struct ChatStore {
    conversations: Vec<Conversation>,
    current: Option<Conversation>,
    messages: Vec<Message>,
    show_think_process: bool,
    is_sending: bool,
    temp_seq: u64,
}

impl ChatStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ==================== Accessors ====================

    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn current(&self) -> Option<&Conversation> {
        self.current.as_ref()
    }

    pub fn current_id(&self) -> Option<&str> {
        self.current.as_ref().map(|c| c.id.as_str())
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn message(&self, id: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.id() == Some(id))
    }

    fn message_mut(&mut self, id: &str) -> Option<&mut Message> {
        self.messages.iter_mut().find(|m| m.id() == Some(id))
    }

    pub fn show_think_process(&self) -> bool {
        self.show_think_process
    }

    pub fn set_show_think_process(&mut self, show: bool) {
        self.show_think_process = show;
    }

    pub fn is_sending(&self) -> bool {
        self.is_sending
    }

    // ==================== Send Guard ====================

    /// Claim the single sending slot.
    pub fn begin_send(&mut self) -> Result<(), DomainError> {
        if self.is_sending {
            return Err(DomainError::SendInProgress);
        }
        self.is_sending = true;
        Ok(())
    }

    pub fn end_send(&mut self) {
        self.is_sending = false;
    }

    // ==================== Conversations ====================

    /// Replace the conversation list with a fresh server copy.
    ///
    /// The current selection is kept; its title follows the server's.
    pub fn replace_conversations(&mut self, conversations: Vec<Conversation>) {
        if let Some(current) = self.current.as_mut()
            && let Some(fresh) = conversations.iter().find(|c| c.id == current.id)
        {
            current.title = fresh.title.clone();
            current.updated_at = fresh.updated_at.clone();
        }
        self.conversations = conversations;
    }

    /// Make `conversation` current with the given message history.
    pub fn select(&mut self, conversation: Conversation, messages: Vec<Message>) {
        self.current = Some(conversation);
        self.messages = messages;
    }

    /// Make a freshly created conversation current and list it first.
    ///
    /// The open message list is left untouched: the first exchange is
    /// appended right after creation.
    pub fn open_new(&mut self, conversation: Conversation) {
        self.conversations.retain(|c| c.id != conversation.id);
        self.conversations.insert(0, conversation.clone());
        self.current = Some(conversation);
    }

    /// Deselect and empty the message list.
    pub fn clear_current(&mut self) {
        self.current = None;
        self.messages.clear();
    }

    pub fn rename(&mut self, conversation_id: &str, title: &str) {
        if let Some(conversation) = self
            .conversations
            .iter_mut()
            .find(|c| c.id == conversation_id)
        {
            conversation.title = title.to_string();
        }
        if let Some(current) = self.current.as_mut()
            && current.id == conversation_id
        {
            current.title = title.to_string();
        }
    }

    /// Drop a conversation; clears the selection if it was current.
    pub fn remove_conversation(&mut self, conversation_id: &str) {
        self.conversations.retain(|c| c.id != conversation_id);
        if self.current_id() == Some(conversation_id) {
            self.clear_current();
        }
    }

    /// Total words across the open message list.
    pub fn word_count(&self) -> usize {
        self.messages.iter().map(Message::word_count).sum()
    }

    /// Attachments already stored in the open conversation.
    pub fn attachments(&self) -> Vec<Attachment> {
        self.messages
            .iter()
            .flat_map(|m| m.attachments.iter().cloned())
            .collect()
    }

    // ==================== Streaming Lifecycle ====================

    /// Append the user's message. Returns its index in the list.
    pub fn push_user_message(&mut self, message: Message) -> usize {
        self.messages.push(message);
        self.messages.len() - 1
    }

    /// Append an empty loading bot message and return its temporary id.
    pub fn insert_placeholder(&mut self) -> String {
        let id = self.next_temp_id();
        self.messages.push(Message::placeholder(id.clone()));
        id
    }

    /// Append a finished bot message carrying an error marker and return
    /// its temporary id.
    pub fn push_error_message(&mut self, error: impl std::fmt::Display) -> String {
        let id = self.next_temp_id();
        let mut message = Message::bot_error(error);
        message.id = Some(id.clone());
        self.messages.push(message);
        id
    }

    /// Clear a placeholder's streamed content before a new attempt.
    pub fn reset_placeholder(&mut self, id: &str) -> bool {
        match self.message_mut(id) {
            Some(message) => {
                message.content.clear();
                message.thinking.clear();
                message.search_results = Some(SearchResults::default());
                message.loading = true;
                true
            }
            None => false,
        }
    }

    /// Apply one stream event to the placeholder.
    ///
    /// Returns `false` when the placeholder no longer exists; the event is
    /// then dropped.
    pub fn apply_event(&mut self, id: &str, event: &ChatEvent) -> bool {
        let Some(message) = self.message_mut(id) else {
            return false;
        };

        match event {
            ChatEvent::Thought(chunk) => message.thinking.push_str(chunk),
            ChatEvent::Text(chunk) => message.content.push_str(chunk),
            ChatEvent::Metadata(documents) => {
                message
                    .search_results
                    .get_or_insert_with(SearchResults::default)
                    .source_documents = documents.clone();
            }
            ChatEvent::Error(error) => {
                message.content.push_str("\n\nError: ");
                message.content.push_str(error);
            }
            ChatEvent::Unknown { .. } => {}
        }
        true
    }

    /// The stream completed: stop the loading indicator.
    pub fn finalize(&mut self, id: &str) -> bool {
        match self.message_mut(id) {
            Some(message) => {
                message.loading = false;
                true
            }
            None => false,
        }
    }

    /// The send failed: show the error in place of the reply.
    pub fn fail(&mut self, id: &str, error: impl std::fmt::Display) -> bool {
        match self.message_mut(id) {
            Some(message) => {
                message.content = format!("Error: {}", error);
                message.loading = false;
                true
            }
            None => false,
        }
    }

    /// Replace a bot message's content with recovered partial text.
    pub fn use_partial(&mut self, id: &str, partial: &str) -> bool {
        match self.message_mut(id) {
            Some(message) => {
                message.content = partial.to_string();
                message.loading = false;
                true
            }
            None => false,
        }
    }

    /// Remove the user message and bot message of a failed send.
    ///
    /// The user message has no id yet, so it is matched by position and
    /// content; nothing is removed if the list has been replaced since.
    /// Drop a single message by id.
    pub fn remove_message(&mut self, id: &str) -> bool {
        let before = self.messages.len();
        self.messages.retain(|m| m.id() != Some(id));
        self.messages.len() != before
    }

    pub fn remove_exchange(&mut self, user_index: usize, user_content: &str, bot_id: &str) {
        let user_is_intact = self
            .messages
            .get(user_index)
            .is_some_and(|m| m.is_user() && m.content == user_content);
        self.messages.retain(|m| m.id() != Some(bot_id));
        if user_is_intact && user_index < self.messages.len() {
            self.messages.remove(user_index);
        }
    }

    // ==================== Message Actions ====================

    /// Set a message's feedback and return the previous value.
    pub fn set_feedback(
        &mut self,
        id: &str,
        feedback: Option<Feedback>,
    ) -> Result<Option<Feedback>, DomainError> {
        let message = self
            .message_mut(id)
            .ok_or_else(|| DomainError::MessageNotFound(id.to_string()))?;
        Ok(std::mem::replace(&mut message.feedback, feedback))
    }

    /// Most recent message written by the user.
    pub fn last_user_message(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.is_user())
    }

    fn next_temp_id(&mut self) -> String {
        self.temp_seq += 1;
        format!(
            "{}{}-{}",
            TEMP_ID_PREFIX,
            chrono::Utc::now().timestamp_millis(),
            self.temp_seq
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::message::SourceDocument;

    fn doc(name: &str) -> SourceDocument {
        SourceDocument {
            rag_item_name: Some(name.to_string()),
            ..SourceDocument::default()
        }
    }

    fn store_with_placeholder() -> (ChatStore, String) {
        let mut store = ChatStore::new();
        store.select(Conversation::new("c1", "Chat"), vec![]);
        store.push_user_message(Message::user("hi", vec![]));
        let id = store.insert_placeholder();
        (store, id)
    }

    #[test]
    fn test_send_guard() {
        let mut store = ChatStore::new();
        store.begin_send().unwrap();
        assert_eq!(store.begin_send(), Err(DomainError::SendInProgress));
        store.end_send();
        assert!(store.begin_send().is_ok());
    }

    #[test]
    fn test_placeholder_ids_are_unique() {
        let mut store = ChatStore::new();
        let a = store.insert_placeholder();
        let b = store.insert_placeholder();
        assert_ne!(a, b);
        assert!(a.starts_with(TEMP_ID_PREFIX));
    }

    #[test]
    fn test_streaming_lifecycle() {
        let (mut store, id) = store_with_placeholder();
        assert!(store.message(&id).unwrap().loading);

        assert!(store.apply_event(&id, &ChatEvent::Thought("plan".to_string())));
        assert!(store.apply_event(&id, &ChatEvent::Text("Hel".to_string())));
        assert!(store.apply_event(&id, &ChatEvent::Text("lo".to_string())));
        assert!(store.apply_event(&id, &ChatEvent::Unknown { name: "heartbeat".to_string() }));
        assert!(store.finalize(&id));

        let message = store.message(&id).unwrap();
        assert_eq!(message.content, "Hello");
        assert_eq!(message.thinking, "plan");
        assert!(!message.loading);
        assert_eq!(store.messages().len(), 2);
    }

    #[test]
    fn test_metadata_replaces_previous_documents() {
        let (mut store, id) = store_with_placeholder();
        store.apply_event(&id, &ChatEvent::Metadata(vec![doc("a"), doc("b")]));
        store.apply_event(&id, &ChatEvent::Metadata(vec![doc("c")]));
        let docs = store.message(&id).unwrap().source_documents();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].display_name(), "c");
    }

    #[test]
    fn test_error_event_appends_marker() {
        let (mut store, id) = store_with_placeholder();
        store.apply_event(&id, &ChatEvent::Text("partial".to_string()));
        store.apply_event(&id, &ChatEvent::Error("model crashed".to_string()));
        assert_eq!(
            store.message(&id).unwrap().content,
            "partial\n\nError: model crashed"
        );
    }

    #[test]
    fn test_events_dropped_after_conversation_switch() {
        let (mut store, id) = store_with_placeholder();
        store.select(Conversation::new("c2", "Other"), vec![]);
        assert!(!store.apply_event(&id, &ChatEvent::Text("late".to_string())));
        assert!(!store.finalize(&id));
        assert!(store.messages().is_empty());
    }

    #[test]
    fn test_fail_keeps_message_visible() {
        let (mut store, id) = store_with_placeholder();
        store.apply_event(&id, &ChatEvent::Text("half".to_string()));
        assert!(store.fail(&id, "HTTP 403: Forbidden"));
        let message = store.message(&id).unwrap();
        assert_eq!(message.content, "Error: HTTP 403: Forbidden");
        assert!(!message.loading);
        assert_eq!(store.messages().len(), 2);
    }

    #[test]
    fn test_reset_placeholder_discards_attempt_content() {
        let (mut store, id) = store_with_placeholder();
        store.apply_event(&id, &ChatEvent::Text("first try".to_string()));
        store.apply_event(&id, &ChatEvent::Metadata(vec![doc("a")]));
        assert!(store.reset_placeholder(&id));
        let message = store.message(&id).unwrap();
        assert!(message.content.is_empty());
        assert!(message.source_documents().is_empty());
        assert!(message.loading);
    }

    #[test]
    fn test_remove_exchange() {
        let mut store = ChatStore::new();
        store.push_user_message(Message::user("earlier", vec![]));
        let user_index = store.push_user_message(Message::user("failed", vec![]));
        let bot_id = store.insert_placeholder();
        store.remove_exchange(user_index, "failed", &bot_id);
        assert_eq!(store.messages().len(), 1);
        assert_eq!(store.messages()[0].content, "earlier");

        store.remove_exchange(0, "something else", "temp-none");
        assert_eq!(store.messages().len(), 1);
    }

    #[test]
    fn test_word_count_and_clear() {
        let mut store = ChatStore::new();
        store.select(Conversation::new("c1", "t"), vec![]);
        store.push_user_message(Message::user("one two three", vec![]));
        let id = store.insert_placeholder();
        store.apply_event(&id, &ChatEvent::Text("four five".to_string()));
        assert_eq!(store.word_count(), 5);
        store.clear_current();
        assert!(store.current().is_none());
        assert_eq!(store.word_count(), 0);
    }

    #[test]
    fn test_conversation_management() {
        let mut store = ChatStore::new();
        store.replace_conversations(vec![Conversation::new("a", "A"), Conversation::new("b", "B")]);
        store.select(Conversation::new("b", "B"), vec![Message::user("x", vec![])]);

        store.rename("b", "Renamed");
        assert_eq!(store.current().unwrap().title, "Renamed");
        assert_eq!(store.conversations()[1].title, "Renamed");

        store.replace_conversations(vec![Conversation::new("b", "Server title")]);
        assert_eq!(store.current().unwrap().title, "Server title");

        store.remove_conversation("b");
        assert!(store.current().is_none());
        assert!(store.messages().is_empty());
        assert!(store.conversations().is_empty());
    }

    #[test]
    fn test_open_new_lists_first() {
        let mut store = ChatStore::new();
        store.replace_conversations(vec![Conversation::new("old", "Old")]);
        store.open_new(Conversation::new("new", "New"));
        assert_eq!(store.conversations()[0].id, "new");
        assert_eq!(store.current_id(), Some("new"));
    }

    #[test]
    fn test_feedback_and_last_user_message() {
        let mut store = ChatStore::new();
        let mut reply = Message::placeholder("m2");
        reply.loading = false;
        store.select(
            Conversation::new("c", "t"),
            vec![Message::user("question", vec![]), reply],
        );
        assert_eq!(store.set_feedback("m2", Some(Feedback::Like)), Ok(None));
        assert_eq!(
            store.set_feedback("m2", None),
            Ok(Some(Feedback::Like))
        );
        assert!(store.set_feedback("missing", None).is_err());
        assert_eq!(store.last_user_message().unwrap().content, "question");
    }

    #[test]
    fn test_error_message_can_be_removed() {
        let mut store = ChatStore::new();
        let id = store.push_error_message("Network error: down");
        let message = store.message(&id).unwrap();
        assert_eq!(message.content, "Error: Network error: down");
        assert!(message.is_temporary());
        assert!(!message.loading);

        assert!(store.remove_message(&id));
        assert!(store.messages().is_empty());
        assert!(!store.remove_message(&id));
    }
}
