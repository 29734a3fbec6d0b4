//! The transcription pipeline.
//!
//! One call to [`run_transcription`] takes a job from validated input to a
//! finished [`TranscriptionOutcome`]: route by size (inline vs segmented),
//! transcribe, optionally rewrite for readability, then synthesize every
//! requested output format. Progress is reported through the caller's
//! [`ProgressSink`] at each phase boundary.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Serialize;

use crate::config::{OutputFormat, TranscriptionModel};
use crate::error::{Result, ScribeError};
use crate::pipeline::formats;
use crate::progress::{Phase, ProgressSink, ProgressStatus, ProgressUpdate};
use crate::provider::{TranscriptionBackend, TranscriptionRequest};
use crate::splitter::split_audio_file;

/// Audio payloads at or below this size are sent in one inline request;
/// anything larger is segmented first.
pub const INLINE_AUDIO_BYTES_THRESHOLD: u64 = 24 * 1024 * 1024;

/// Everything one pipeline run needs.
#[derive(Debug, Clone)]
pub struct PipelineInput {
    pub api_key: String,
    /// Requested model name. Unsupported names fall back to the default.
    pub model: String,
    /// Rewrite the transcript for readability before formatting.
    pub optimize: bool,
    /// Requested format names. Unknown names are dropped, duplicates merged.
    pub output_formats: Vec<String>,
    pub audio_path: PathBuf,
    /// Media type of the audio file, e.g. `audio/mpeg`.
    pub media_type: String,
    /// Original file name, carried through to progress and the outcome.
    pub file_name: String,
    /// Free-form agenda used only by the notes format.
    pub agenda: Option<String>,
}

/// Aggregated result of one pipeline run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptionOutcome {
    pub file_name: String,
    pub model: TranscriptionModel,
    pub raw_transcript: String,
    /// Set only when the optimize pass was requested.
    pub optimized_transcript: Option<String>,
    pub outputs: BTreeMap<OutputFormat, String>,
}

pub(crate) fn exceeds_inline_threshold(byte_size: u64) -> bool {
    byte_size > INLINE_AUDIO_BYTES_THRESHOLD
}

/// Run the whole pipeline for one job.
///
/// # Errors
///
/// Returns [`ScribeError::InvalidInput`] for an empty API key, an empty or
/// all-unknown format selection, or an unreadable audio path. Provider and
/// segmentation failures propagate as their own variants, and a recording
/// that transcribes to nothing yields [`ScribeError::EmptyTranscript`].
pub async fn run_transcription(
    backend: &dyn TranscriptionBackend,
    client: &reqwest::Client,
    input: PipelineInput,
    progress: &dyn ProgressSink,
) -> Result<TranscriptionOutcome> {
    if input.api_key.trim().is_empty() {
        return Err(ScribeError::InvalidInput {
            message: "A Gemini API key is required".to_string(),
        });
    }
    let model = TranscriptionModel::resolve(&input.model);
    let selected_formats = OutputFormat::normalize(&input.output_formats);
    if selected_formats.is_empty() {
        return Err(ScribeError::InvalidInput {
            message: "At least one output format must be selected".to_string(),
        });
    }
    if input.audio_path.as_os_str().is_empty() {
        return Err(ScribeError::InvalidInput {
            message: "Audio file path is required".to_string(),
        });
    }
    let byte_size = match tokio::fs::metadata(&input.audio_path).await {
        Ok(metadata) => metadata.len(),
        Err(err) => {
            return Err(ScribeError::InvalidInput {
                message: format!(
                    "Cannot read audio file {}: {err}",
                    input.audio_path.display()
                ),
            });
        }
    };

    crate::verbose!(
        "Transcribing {} ({byte_size} bytes) with {model} via {}",
        input.file_name,
        backend.name()
    );

    let raw_transcript = if exceeds_inline_threshold(byte_size) {
        transcribe_in_segments(backend, client, &input, model, progress).await?
    } else {
        transcribe_inline(backend, client, &input, model, progress).await?
    };
    if raw_transcript.is_empty() {
        return Err(ScribeError::EmptyTranscript);
    }

    let mut optimized_transcript = None;
    if input.optimize {
        if let Some(rewrite) = backend.rewrite_model() {
            progress.report(
                ProgressUpdate::new(Phase::Optimize, "Optimizing transcript")
                    .with_status(ProgressStatus::Start),
            );
            let improved = formats::optimize_transcript(
                backend,
                client,
                &input.api_key,
                rewrite,
                &raw_transcript,
            )
            .await?;
            progress.report(
                ProgressUpdate::new(Phase::Optimize, "Optimization finished")
                    .with_status(ProgressStatus::Done),
            );
            optimized_transcript = Some(improved);
        } else {
            crate::verbose!(
                "Optimize requested but {} offers no rewrite model; keeping raw transcript",
                backend.name()
            );
            optimized_transcript = Some(raw_transcript.clone());
        }
    }
    let base_text = optimized_transcript.as_deref().unwrap_or(&raw_transcript);

    let agenda = input
        .agenda
        .as_deref()
        .map(str::trim)
        .filter(|agenda| !agenda.is_empty());
    let outputs = formats::synthesize_outputs(
        backend,
        client,
        &input.api_key,
        &selected_formats,
        &raw_transcript,
        base_text,
        agenda,
        progress,
    )
    .await?;

    progress.report(
        ProgressUpdate::new(Phase::Finalize, "Transcription complete")
            .with_status(ProgressStatus::Done),
    );

    Ok(TranscriptionOutcome {
        file_name: input.file_name.clone(),
        model,
        raw_transcript,
        optimized_transcript,
        outputs,
    })
}

/// Transcribe the whole file in one provider call.
async fn transcribe_inline(
    backend: &dyn TranscriptionBackend,
    client: &reqwest::Client,
    input: &PipelineInput,
    model: TranscriptionModel,
    progress: &dyn ProgressSink,
) -> Result<String> {
    let audio_data = tokio::fs::read(&input.audio_path).await?;
    progress.report(
        ProgressUpdate::new(Phase::Transcribe, "Transcribing audio (1 segment)")
            .with_status(ProgressStatus::Start)
            .with_segments(1, 0),
    );
    let transcript = backend
        .transcribe_audio(
            client,
            &input.api_key,
            model,
            TranscriptionRequest {
                audio_data,
                mime_type: input.media_type.clone(),
            },
        )
        .await?;
    progress.report(
        ProgressUpdate::new(Phase::Transcribe, "Transcription finished (1/1)")
            .with_status(ProgressStatus::Done)
            .with_segments(1, 1),
    );
    Ok(transcript)
}

/// Split an oversized file and transcribe the segments in order.
async fn transcribe_in_segments(
    backend: &dyn TranscriptionBackend,
    client: &reqwest::Client,
    input: &PipelineInput,
    model: TranscriptionModel,
    progress: &dyn ProgressSink,
) -> Result<String> {
    // The scratch directory inside `segments` is removed when this function
    // returns, on the error paths included.
    let segments = split_audio_file(&input.audio_path, None).await?;
    if segments.segments.is_empty() {
        return Err(ScribeError::Segmentation {
            message: "Audio chunking failed to produce segments".to_string(),
        });
    }
    crate::verbose!(
        "Split {} into {} segments",
        input.file_name,
        segments.segments.len()
    );
    transcribe_segment_files(
        backend,
        client,
        &input.api_key,
        model,
        &segments.segments,
        progress,
    )
    .await
}

/// Transcribe segment files sequentially and join the non-empty transcripts.
///
/// Strictly one request is in flight at a time, which bounds provider load
/// and keeps the joined transcript in chronological order. A segment that
/// transcribes to nothing is skipped but still counts as completed.
async fn transcribe_segment_files(
    backend: &dyn TranscriptionBackend,
    client: &reqwest::Client,
    api_key: &str,
    model: TranscriptionModel,
    segment_paths: &[PathBuf],
    progress: &dyn ProgressSink,
) -> Result<String> {
    let total = segment_paths.len();
    progress.report(
        ProgressUpdate::new(
            Phase::Transcribe,
            format!("Transcribing audio ({total} segments)"),
        )
        .with_status(ProgressStatus::Start)
        .with_segments(total, 0),
    );

    let mut transcripts = Vec::new();
    for (index, path) in segment_paths.iter().enumerate() {
        let audio_data = tokio::fs::read(path).await?;
        let transcript = backend
            .transcribe_audio(
                client,
                api_key,
                model,
                TranscriptionRequest {
                    audio_data,
                    mime_type: "audio/wav".to_string(),
                },
            )
            .await?;
        if !transcript.is_empty() {
            transcripts.push(transcript);
        }
        let completed = index + 1;
        progress.report(
            ProgressUpdate::new(
                Phase::Transcribe,
                format!("Transcribed {completed}/{total} segments"),
            )
            .with_segments(total, completed),
        );
    }

    progress.report(
        ProgressUpdate::new(
            Phase::Transcribe,
            format!("Transcription finished ({total}/{total})"),
        )
        .with_status(ProgressStatus::Done)
        .with_segments(total, total),
    );

    Ok(transcripts.join("\n\n").trim().to_string())
}
