//! In-memory [`ChatApi`] replaying scripted streams, for use case tests.

use crate::context::ChatContext;
use crate::ports::chat_api::{ApiError, ChatApi, FragmentStream};
use async_trait::async_trait;
use futures::{StreamExt, stream};
use rosti_domain::{
    Attachment, Conversation, Feedback, Message, OutgoingMessage, PendingFile,
};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

/// How one `stream_message` call behaves.
pub(crate) enum ScriptedStream {
    /// Deliver the fragments, then end cleanly.
    Fragments(Vec<&'static str>),
    /// Deliver the fragments, then fail mid-stream.
    FailAfter(Vec<&'static str>, ApiError),
    /// Fail before any body arrives.
    Refuse(ApiError),
}

#[derive(Default)]
pub(crate) struct ScriptedChatApi {
    pub streams: Mutex<VecDeque<ScriptedStream>>,
    pub uploads: Mutex<VecDeque<Result<Vec<Attachment>, ApiError>>>,
    pub conversations: Mutex<Vec<Conversation>>,
    pub histories: Mutex<HashMap<String, Vec<Message>>>,
    pub list_error: Mutex<Option<ApiError>>,
    pub create_errors: Mutex<VecDeque<ApiError>>,
    /// When set, `list_conversations` records whether a send was in flight.
    pub observed: Mutex<Option<ChatContext>>,
    pub busy_on_list: Mutex<Vec<bool>>,
    pub feedback_error: Mutex<Option<ApiError>>,
    pub sent: Mutex<Vec<OutgoingMessage>>,
    pub feedback: Mutex<Vec<(String, Option<Feedback>)>>,
    pub upload_calls: AtomicU32,
    next_id: AtomicU32,
}

impl ScriptedChatApi {
    pub fn with_streams(streams: Vec<ScriptedStream>) -> Self {
        Self {
            streams: Mutex::new(streams.into()),
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<OutgoingMessage> {
        self.sent.lock().unwrap().clone()
    }
}

pub(crate) fn attachment(filename: &str) -> Attachment {
    Attachment {
        id: Some(format!("att-{}", filename)),
        filename: filename.to_string(),
        bucket_name: "bucket".to_string(),
        object_name: format!("obj/{}", filename),
        size: 10,
        content_type: rosti_domain::chat::draft::MIME_PDF.to_string(),
        upload_timestamp: String::new(),
        download_url: None,
    }
}

#[async_trait]
impl ChatApi for ScriptedChatApi {
    async fn list_conversations(&self) -> Result<Vec<Conversation>, ApiError> {
        let observed = self.observed.lock().unwrap().clone();
        if let Some(ctx) = observed {
            let busy = ctx.store().await.is_sending();
            self.busy_on_list.lock().unwrap().push(busy);
        }
        if let Some(e) = self.list_error.lock().unwrap().clone() {
            return Err(e);
        }
        Ok(self.conversations.lock().unwrap().clone())
    }

    async fn create_conversation(&self, title: &str) -> Result<Conversation, ApiError> {
        let failure = self.create_errors.lock().unwrap().pop_front();
        if let Some(e) = failure {
            return Err(e);
        }
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let conversation = Conversation::new(format!("c{}", n), title);
        self.conversations
            .lock()
            .unwrap()
            .insert(0, conversation.clone());
        Ok(conversation)
    }

    async fn list_messages(&self, conversation_id: &str) -> Result<Vec<Message>, ApiError> {
        self.histories
            .lock()
            .unwrap()
            .get(conversation_id)
            .cloned()
            .ok_or_else(|| ApiError::Http {
                status: 404,
                message: "Conversation not found".to_string(),
            })
    }

    async fn rename_conversation(
        &self,
        conversation_id: &str,
        title: &str,
    ) -> Result<Conversation, ApiError> {
        let mut conversations = self.conversations.lock().unwrap();
        let conversation = conversations
            .iter_mut()
            .find(|c| c.id == conversation_id)
            .ok_or_else(|| ApiError::Http {
                status: 404,
                message: "Conversation not found".to_string(),
            })?;
        conversation.title = title.trim().to_string();
        Ok(conversation.clone())
    }

    async fn delete_conversation(&self, conversation_id: &str) -> Result<(), ApiError> {
        self.conversations
            .lock()
            .unwrap()
            .retain(|c| c.id != conversation_id);
        Ok(())
    }

    async fn upload_files(
        &self,
        files: &[PendingFile],
        _conversation_id: Option<&str>,
    ) -> Result<Vec<Attachment>, ApiError> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        match self.uploads.lock().unwrap().pop_front() {
            Some(result) => result,
            None => Ok(files.iter().map(|f| attachment(&f.filename)).collect()),
        }
    }

    async fn stream_message(
        &self,
        _conversation_id: &str,
        message: &OutgoingMessage,
    ) -> Result<FragmentStream, ApiError> {
        self.sent.lock().unwrap().push(message.clone());
        let script = self.streams.lock().unwrap().pop_front();
        let ok = |parts: Vec<&'static str>| {
            parts
                .into_iter()
                .map(|p| Ok(p.to_string()))
                .collect::<Vec<Result<String, ApiError>>>()
        };
        match script {
            Some(ScriptedStream::Fragments(parts)) => Ok(stream::iter(ok(parts)).boxed()),
            Some(ScriptedStream::FailAfter(parts, error)) => {
                let mut items = ok(parts);
                items.push(Err(error));
                Ok(stream::iter(items).boxed())
            }
            Some(ScriptedStream::Refuse(error)) => Err(error),
            None => Err(ApiError::Other("no scripted stream left".to_string())),
        }
    }

    async fn submit_feedback(
        &self,
        message_id: &str,
        feedback: Option<Feedback>,
    ) -> Result<(), ApiError> {
        if let Some(e) = self.feedback_error.lock().unwrap().clone() {
            return Err(e);
        }
        self.feedback
            .lock()
            .unwrap()
            .push((message_id.to_string(), feedback));
        Ok(())
    }
}
