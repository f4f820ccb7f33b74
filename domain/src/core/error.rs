//! Domain error types

use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Message is empty and no files are attached")]
    EmptyMessage,

    #[error("Another message is still being sent")]
    SendInProgress,

    #[error("Attachment rejected: {0}")]
    AttachmentRejected(#[from] AttachmentRejection),

    #[error("Message not found: {0}")]
    MessageNotFound(String),
}

/// Why a file could not be added to a draft.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AttachmentRejection {
    #[error("{filename}: unsupported file type {content_type} (only pdf, docx and xlsx)")]
    UnsupportedType {
        filename: String,
        content_type: String,
    },

    #[error("{filename}: exceeds maximum attachment count ({max})")]
    TooMany { filename: String, max: usize },

    #[error("{filename}: exceeds maximum total attachment size ({max_mb}MB)")]
    TooLarge { filename: String, max_mb: u64 },
}

impl DomainError {
    /// Check if this error is the single-sender guard
    pub fn is_busy(&self) -> bool {
        matches!(self, DomainError::SendInProgress)
    }
}
