//! Multi-phase transcription pipeline.

mod formats;
mod transcribe;

pub use transcribe::{
    INLINE_AUDIO_BYTES_THRESHOLD, PipelineInput, TranscriptionOutcome, run_transcription,
};
