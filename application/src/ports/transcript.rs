//! Transcript logger port
//!
//! Records finished exchanges for later inspection.

use serde_json::Value;

/// A single transcript record.
///
/// `event_type` becomes the `type` field of the record; `payload` fields
/// are merged alongside it.
#[derive(Debug, Clone)]
pub struct TranscriptEvent {
    pub event_type: &'static str,
    pub payload: Value,
}

impl TranscriptEvent {
    pub fn new(event_type: &'static str, payload: Value) -> Self {
        Self {
            event_type,
            payload,
        }
    }
}

/// Sink for transcript records. Logging must never fail a send.
pub trait TranscriptLogger: Send + Sync {
    fn log(&self, event: TranscriptEvent);
}

/// Discards every record.
pub struct NoTranscript;

impl TranscriptLogger for NoTranscript {
    fn log(&self, _event: TranscriptEvent) {}
}
