//! Composer state: the text being typed and the files selected for upload,
//! plus the payload that is finally sent to the server.

use super::message::{Attachment, Sender};
use crate::core::error::AttachmentRejection;
use serde::{Deserialize, Serialize};

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_DOCX: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const MIME_XLSX: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// A local file selected for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingFile {
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl PendingFile {
    pub fn new(filename: impl Into<String>, data: Vec<u8>) -> Self {
        let filename = filename.into();
        let content_type = Self::guess_content_type(&filename).to_string();
        Self {
            filename,
            content_type,
            data,
        }
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    /// MIME type from the file extension.
    pub fn guess_content_type(filename: &str) -> &'static str {
        let ext = filename
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "pdf" => MIME_PDF,
            "docx" => MIME_DOCX,
            "xlsx" => MIME_XLSX,
            "txt" | "md" => "text/plain",
            _ => "application/octet-stream",
        }
    }
}

/// Limits applied when files are added to a draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttachmentPolicy {
    pub max_count: usize,
    pub max_total_bytes: u64,
    pub allowed_types: Vec<String>,
}

impl Default for AttachmentPolicy {
    fn default() -> Self {
        Self {
            max_count: 5,
            max_total_bytes: 100 * 1024 * 1024,
            allowed_types: vec![
                MIME_PDF.to_string(),
                MIME_DOCX.to_string(),
                MIME_XLSX.to_string(),
            ],
        }
    }
}

impl AttachmentPolicy {
    /// Check whether `candidate` may join `selected`, given the attachments
    /// already stored in the conversation.
    pub fn admit(
        &self,
        existing: &[Attachment],
        selected: &[PendingFile],
        candidate: &PendingFile,
    ) -> Result<(), AttachmentRejection> {
        if !self.allowed_types.iter().any(|t| t == &candidate.content_type) {
            return Err(AttachmentRejection::UnsupportedType {
                filename: candidate.filename.clone(),
                content_type: candidate.content_type.clone(),
            });
        }

        if existing.len() + selected.len() >= self.max_count {
            return Err(AttachmentRejection::TooMany {
                filename: candidate.filename.clone(),
                max: self.max_count,
            });
        }

        let used: u64 = existing.iter().map(|a| a.size).sum::<u64>()
            + selected.iter().map(PendingFile::size).sum::<u64>();
        if used + candidate.size() > self.max_total_bytes {
            return Err(AttachmentRejection::TooLarge {
                filename: candidate.filename.clone(),
                max_mb: self.max_total_bytes / (1024 * 1024),
            });
        }

        Ok(())
    }
}

/// What the user is composing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
    pub text: String,
    pub files: Vec<PendingFile>,
}

impl Draft {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            files: Vec::new(),
        }
    }

    /// Nothing to send: blank text and no files.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty() && self.files.is_empty()
    }

    /// Add a file if `policy` admits it.
    pub fn attach(
        &mut self,
        file: PendingFile,
        policy: &AttachmentPolicy,
        existing: &[Attachment],
    ) -> Result<(), AttachmentRejection> {
        policy.admit(existing, &self.files, &file)?;
        self.files.push(file);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.files.clear();
    }
}

/// Retrieval switches sent along with a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchOptions {
    pub search_ai_active: bool,
    pub search_rosti_active: bool,
    pub search_online_active: bool,
    pub show_think_process: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            search_ai_active: true,
            search_rosti_active: false,
            search_online_active: false,
            show_think_process: false,
        }
    }
}

/// Request body of the streaming send endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingMessage {
    pub sender: Sender,
    pub content: String,
    pub attachments: Vec<Attachment>,
    #[serde(flatten)]
    pub options: SearchOptions,
}

impl OutgoingMessage {
    pub fn new(content: impl Into<String>, attachments: Vec<Attachment>, options: SearchOptions) -> Self {
        Self {
            sender: Sender::User,
            content: content.into(),
            attachments,
            options,
        }
    }
}
