//! reqwest-backed [`ChatApi`] adapter.
//!
//! JSON endpoints are called without their trailing slash; the streaming
//! send keeps it. Every request carries the bearer token when one is
//! configured.

use super::decoder::Utf8ChunkDecoder;
use super::error::{HttpSetupError, Result, from_reqwest, from_status};
use crate::config::FileApiConfig;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};
use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder, Response};
use rosti_application::{ApiError, ChatApi, FragmentStream};
use rosti_domain::{Attachment, Conversation, Feedback, Message, OutgoingMessage, PendingFile};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::pin::Pin;
use std::time::Duration;
use tracing::{debug, info};

type BodyStream = Pin<Box<dyn Stream<Item = reqwest::Result<Bytes>> + Send>>;

#[derive(Deserialize)]
struct UploadResponse {
    #[serde(default)]
    uploaded_files: Vec<Attachment>,
}

/// HTTP client for the chat REST API.
pub struct HttpChatApi {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpChatApi {
    /// Create a client for `base_url` (e.g. `http://localhost:8000/api`).
    pub fn new(
        base_url: impl Into<String>,
        token: Option<String>,
        connect_timeout: Duration,
    ) -> Result<Self> {
        let base_url = base_url.into().trim().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(HttpSetupError::InvalidBaseUrl(base_url));
        }

        let client = Client::builder().connect_timeout(connect_timeout).build()?;
        info!("Using chat API at {}", base_url);

        Ok(Self {
            client,
            base_url,
            token: token.filter(|t| !t.trim().is_empty()),
        })
    }

    pub fn from_config(config: &FileApiConfig) -> Result<Self> {
        Self::new(
            config.base_url.clone(),
            config.token.clone(),
            Duration::from_secs(config.connect_timeout_secs),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URL for a JSON endpoint: one trailing slash is dropped.
    fn json_url(&self, path: &str) -> String {
        let path = path.strip_suffix('/').unwrap_or(path);
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> std::result::Result<Response, ApiError> {
        let response = builder.send().await.map_err(from_reqwest)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        debug!("Request failed with {}: {}", status, body);
        Err(from_status(status, &body))
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
    ) -> std::result::Result<T, ApiError> {
        let body = self
            .send(builder)
            .await?
            .text()
            .await
            .map_err(from_reqwest)?;
        serde_json::from_str(&body).map_err(|e| ApiError::InvalidResponse(e.to_string()))
    }

    /// Turn a streaming response body into text fragments.
    fn fragments(response: Response) -> FragmentStream {
        let body: BodyStream = Box::pin(response.bytes_stream());
        stream::unfold(Some((body, Utf8ChunkDecoder::new())), |state| async move {
            let Some((mut body, mut decoder)) = state else {
                return None;
            };
            loop {
                match body.next().await {
                    Some(Ok(chunk)) => {
                        let text = decoder.decode(&chunk);
                        if !text.is_empty() {
                            return Some((Ok(text), Some((body, decoder))));
                        }
                    }
                    Some(Err(e)) => return Some((Err(from_reqwest(e)), None)),
                    None => return decoder.finish().map(|rest| (Ok(rest), None)),
                }
            }
        })
        .boxed()
    }

    /// The server answers a send it will not process with a JSON notice
    /// instead of a stream; present it as a single text event.
    async fn notice_stream(response: Response) -> std::result::Result<FragmentStream, ApiError> {
        let body = response.text().await.map_err(from_reqwest)?;
        let value: Value =
            serde_json::from_str(&body).map_err(|e| ApiError::InvalidResponse(e.to_string()))?;
        let notice = value
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let block = format!("event: text\ndata: {}\n\n", Value::String(notice));
        Ok(stream::once(async move { Ok(block) }).boxed())
    }
}

#[async_trait]
impl ChatApi for HttpChatApi {
    async fn list_conversations(&self) -> std::result::Result<Vec<Conversation>, ApiError> {
        let url = self.json_url("/chat/conversations/");
        self.send_json(self.request(Method::GET, &url)).await
    }

    async fn create_conversation(
        &self,
        title: &str,
    ) -> std::result::Result<Conversation, ApiError> {
        let url = self.json_url("/chat/conversations/");
        self.send_json(self.request(Method::POST, &url).json(&json!({ "title": title })))
            .await
    }

    async fn list_messages(
        &self,
        conversation_id: &str,
    ) -> std::result::Result<Vec<Message>, ApiError> {
        let url = self.json_url(&format!("/chat/conversations/{}/messages/", conversation_id));
        self.send_json(self.request(Method::GET, &url)).await
    }

    async fn rename_conversation(
        &self,
        conversation_id: &str,
        title: &str,
    ) -> std::result::Result<Conversation, ApiError> {
        let url = self.json_url(&format!("/chat/conversations/{}/title", conversation_id));
        self.send_json(self.request(Method::POST, &url).json(&json!({ "title": title })))
            .await
    }

    async fn delete_conversation(&self, conversation_id: &str) -> std::result::Result<(), ApiError> {
        let url = self.json_url(&format!("/chat/conversations/{}/", conversation_id));
        self.send(self.request(Method::DELETE, &url)).await?;
        Ok(())
    }

    async fn upload_files(
        &self,
        files: &[PendingFile],
        conversation_id: Option<&str>,
    ) -> std::result::Result<Vec<Attachment>, ApiError> {
        let mut form = Form::new();
        for file in files {
            let part = Part::bytes(file.data.clone())
                .file_name(file.filename.clone())
                .mime_str(&file.content_type)
                .map_err(|e| ApiError::Other(format!("{}: {}", file.filename, e)))?;
            form = form.part("files", part);
        }

        let url = self.json_url("/chat/upload_files");
        let mut request = self.request(Method::POST, &url).multipart(form);
        if let Some(id) = conversation_id {
            request = request.query(&[("conversation_id", id)]);
        }

        let response: UploadResponse = self.send_json(request).await?;
        info!("Uploaded {} file(s)", response.uploaded_files.len());
        Ok(response.uploaded_files)
    }

    async fn stream_message(
        &self,
        conversation_id: &str,
        message: &OutgoingMessage,
    ) -> std::result::Result<FragmentStream, ApiError> {
        let url = format!(
            "{}/chat/conversations/{}/messages/",
            self.base_url, conversation_id
        );
        let response = self
            .send(self.request(Method::POST, &url).json(message))
            .await?;

        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/json"));
        if is_json {
            return Self::notice_stream(response).await;
        }

        debug!("Streaming reply for conversation {}", conversation_id);
        Ok(Self::fragments(response))
    }

    async fn submit_feedback(
        &self,
        message_id: &str,
        feedback: Option<Feedback>,
    ) -> std::result::Result<(), ApiError> {
        let url = self.json_url(&format!("/chat/messages/{}/feedback", message_id));
        self.send(
            self.request(Method::POST, &url)
                .json(&json!({ "rating": feedback })),
        )
        .await?;
        Ok(())
    }
}
