//! Typed progress events and the sink the pipeline reports through.
//!
//! The pipeline never touches subscriber transports directly: it pushes
//! [`ProgressUpdate`]s into a [`ProgressSink`], and the registry binding
//! ([`crate::registry::JobRegistry::progress_sink`]) forwards them to
//! subscribers in the order they were reported.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::OutputFormat;

/// Pipeline stage a progress update belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Upload,
    Transcribe,
    Optimize,
    Format,
    Finalize,
}

/// Position marker inside a phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStatus {
    Received,
    Start,
    Done,
}

/// One progress event on a job's stream.
///
/// Only the fields relevant to the reporting phase are set; the rest stay
/// `None` and are omitted from the serialized event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdate {
    pub phase: Phase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ProgressStatus>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_segments: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_segments: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<OutputFormat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    /// Stamped by the registry when the update is recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl ProgressUpdate {
    pub fn new(phase: Phase, message: impl Into<String>) -> Self {
        Self {
            phase,
            status: None,
            message: message.into(),
            total_segments: None,
            completed_segments: None,
            format: None,
            file_name: None,
            timestamp: None,
        }
    }

    pub fn with_status(mut self, status: ProgressStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_segments(mut self, total: usize, completed: usize) -> Self {
        self.total_segments = Some(total);
        self.completed_segments = Some(completed);
        self
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }
}

/// Where the pipeline reports progress.
///
/// `report` must not block: implementations hand the update to an async
/// consumer (a channel, a registry) or drop it.
pub trait ProgressSink: Send + Sync {
    fn report(&self, update: ProgressUpdate);
}

/// Sink that discards every update.
#[derive(Debug, Default, Clone)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn report(&self, _update: ProgressUpdate) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_only_requested_fields() {
        let update = ProgressUpdate::new(Phase::Transcribe, "Transcribed 2/5 segments")
            .with_segments(5, 2);
        assert_eq!(update.phase, Phase::Transcribe);
        assert_eq!(update.total_segments, Some(5));
        assert_eq!(update.completed_segments, Some(2));
        assert_eq!(update.status, None);
        assert_eq!(update.format, None);
        assert_eq!(update.timestamp, None);
    }

    #[test]
    fn serializes_with_camel_case_keys() {
        let update = ProgressUpdate::new(Phase::Transcribe, "Transcribing audio (5 segments)")
            .with_status(ProgressStatus::Start)
            .with_segments(5, 0);
        let value = serde_json::to_value(&update).unwrap();
        assert_eq!(value["phase"], "transcribe");
        assert_eq!(value["status"], "start");
        assert_eq!(value["totalSegments"], 5);
        assert_eq!(value["completedSegments"], 0);
    }

    #[test]
    fn unset_fields_are_omitted_from_the_wire() {
        let update = ProgressUpdate::new(Phase::Finalize, "Transcription complete")
            .with_status(ProgressStatus::Done);
        let value = serde_json::to_value(&update).unwrap();
        let object = value.as_object().unwrap();
        assert!(!object.contains_key("totalSegments"));
        assert!(!object.contains_key("format"));
        assert!(!object.contains_key("fileName"));
        assert!(!object.contains_key("timestamp"));
    }

    #[test]
    fn upload_update_carries_file_name() {
        let update = ProgressUpdate::new(Phase::Upload, "Received meeting.mp3")
            .with_status(ProgressStatus::Received)
            .with_file_name("meeting.mp3");
        let value = serde_json::to_value(&update).unwrap();
        assert_eq!(value["status"], "received");
        assert_eq!(value["fileName"], "meeting.mp3");
    }
}
