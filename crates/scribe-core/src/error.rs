//! Error types for scribe transcription jobs.
//!
//! Every fallible operation in this crate returns [`ScribeError`]. Callers
//! that relay failures over HTTP can map them to a status code through
//! [`ScribeError::status_code`].

use thiserror::Error;

/// Errors raised while validating, segmenting, or transcribing a job.
#[derive(Error, Debug)]
pub enum ScribeError {
    /// The caller supplied unusable input: a missing API key, an empty
    /// format selection, or an audio path that cannot be read.
    #[error("{message}")]
    InvalidInput { message: String },

    /// The transcription provider rejected or failed a request. Carries the
    /// upstream HTTP status when one was returned.
    #[error("{message}")]
    Provider { message: String, status: Option<u16> },

    /// FFmpeg segmentation failed, or produced no segments at all.
    #[error("{message}")]
    Segmentation { message: String },

    /// Every segment of the recording transcribed to nothing.
    #[error("Transcription returned empty result")]
    EmptyTranscript,

    /// The notes format was requested from a backend with no rewrite model.
    #[error("Notes output requires the Gemini 2.5 Pro model")]
    NotesModelUnavailable,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScribeError {
    /// Upstream HTTP status attached to a provider failure, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ScribeError::Provider { status, .. } => *status,
            _ => None,
        }
    }
}

/// Convenience result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ScribeError>;
