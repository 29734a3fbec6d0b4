//! Output-format synthesis from a finished transcript.
//!
//! Formats are produced concurrently; one failed format fails the job and
//! cancels its siblings. The subtitle format is the exception on the
//! validation side: a provider response without SRT timing falls back to
//! the local synthesizer instead of failing.

use std::collections::BTreeMap;

use futures_util::future::try_join_all;

use crate::config::{OutputFormat, TranscriptionModel};
use crate::error::{Result, ScribeError};
use crate::progress::{Phase, ProgressSink, ProgressStatus, ProgressUpdate};
use crate::provider::TranscriptionBackend;
use crate::subtitle::build_approximate_srt;
use crate::text::strip_code_fences;

const OPTIMIZATION_PROMPT: &str = "Improve the readability of the transcript while \
preserving meaning. Fix obvious punctuation, apply sentence casing, and remove \
filler words when safe. Do not summarise or omit important information. Return \
plain text only.";

const MARKDOWN_PROMPT: &str = "Rewrite the transcript as clean Markdown. Use \
paragraphs and lists when it improves readability, but avoid fabricating \
headings. Do not add content that is not present in the transcript.";

const SRT_PROMPT: &str = "Convert the transcript into SubRip (SRT) format with \
realistic timestamps. If exact timings are unknown, estimate steadily increasing \
timestamps. Return valid SRT text only.";

const NOTES_PROMPT: &str = "You are an expert at organizing verbatim transcripts \
into structured meeting notes. Preserve as much of the speaker's content as \
possible while polishing the wording. Produce a detailed, comprehensive account \
of what was said rather than a brief summary.";

/// Rewrite the raw transcript for readability.
pub(crate) async fn optimize_transcript(
    backend: &dyn TranscriptionBackend,
    client: &reqwest::Client,
    api_key: &str,
    model: TranscriptionModel,
    transcript: &str,
) -> Result<String> {
    let prompt = format!("{OPTIMIZATION_PROMPT}\n\nTranscript:\n{transcript}");
    backend.generate_text(client, api_key, model, &prompt).await
}

async fn to_markdown(
    backend: &dyn TranscriptionBackend,
    client: &reqwest::Client,
    api_key: &str,
    model: TranscriptionModel,
    transcript: &str,
) -> Result<String> {
    let prompt = format!("{MARKDOWN_PROMPT}\n\nTranscript:\n{transcript}");
    backend.generate_text(client, api_key, model, &prompt).await
}

/// Structured notes from the raw transcript, fence-stripped.
///
/// Notes deliberately start from the raw transcript rather than the
/// optimized one: the rewrite model restructures the content itself, and
/// feeding it an already-rewritten text compounds paraphrasing drift.
async fn to_notes(
    backend: &dyn TranscriptionBackend,
    client: &reqwest::Client,
    api_key: &str,
    model: TranscriptionModel,
    raw_transcript: &str,
    agenda: Option<&str>,
) -> Result<String> {
    let prompt = build_notes_prompt(raw_transcript, agenda);
    let response = backend.generate_text(client, api_key, model, &prompt).await?;
    Ok(strip_code_fences(&response))
}

/// SRT from the provider when it produces valid timing, otherwise the local
/// synthesizer. Provider transport errors still propagate.
async fn to_subtitle(
    backend: &dyn TranscriptionBackend,
    client: &reqwest::Client,
    api_key: &str,
    model: TranscriptionModel,
    transcript: &str,
) -> Result<String> {
    let prompt = format!("{SRT_PROMPT}\n\nTranscript:\n{transcript}");
    let response = backend.generate_text(client, api_key, model, &prompt).await?;
    let cleaned = strip_code_fences(&response);
    // Prefer the fence-stripped body when it validates, then the raw
    // response, then give up on the provider entirely.
    let candidate = if cleaned.contains("-->") { cleaned } else { response };
    if candidate.contains("-->") {
        Ok(candidate)
    } else {
        crate::verbose!("Provider SRT lacked timing markers; synthesizing locally");
        Ok(build_approximate_srt(transcript))
    }
}

fn build_notes_prompt(transcript: &str, agenda: Option<&str>) -> String {
    let agenda_block = match agenda {
        Some(agenda) => format!(
            "The user provided this agenda; order the sections to follow it:\n{agenda}"
        ),
        None => "The user provided no agenda; divide the content into sensible \
                 sections with a clear hierarchy."
            .to_string(),
    };
    format!(
        "{NOTES_PROMPT}\n\n{agenda_block}\n\nOutput Markdown. Arrange the material \
         hierarchically with headings and lists, and emphasize key points with bold \
         or italics. Do not add closing remarks or commentary of your own.\n\n\
         Transcript:\n{transcript}"
    )
}

/// Produce every requested output format concurrently.
///
/// Emits a `format`-phase start/done progress pair around each format. The
/// result map only materializes when every format succeeded.
#[allow(clippy::too_many_arguments)]
pub(crate) async fn synthesize_outputs(
    backend: &dyn TranscriptionBackend,
    client: &reqwest::Client,
    api_key: &str,
    formats: &[OutputFormat],
    raw_transcript: &str,
    base_text: &str,
    agenda: Option<&str>,
    progress: &dyn ProgressSink,
) -> Result<BTreeMap<OutputFormat, String>> {
    let rewrite_model = backend.rewrite_model();
    let tasks = formats.iter().map(|&format| async move {
        progress.report(
            ProgressUpdate::new(Phase::Format, format!("Generating {format} output"))
                .with_status(ProgressStatus::Start)
                .with_format(format),
        );
        let body = match format {
            OutputFormat::Text => base_text.to_string(),
            OutputFormat::Markdown => match rewrite_model {
                Some(model) => to_markdown(backend, client, api_key, model, base_text).await?,
                None => base_text.to_string(),
            },
            OutputFormat::Notes => {
                let Some(model) = rewrite_model else {
                    return Err(ScribeError::NotesModelUnavailable);
                };
                to_notes(backend, client, api_key, model, raw_transcript, agenda).await?
            }
            OutputFormat::Subtitle => match rewrite_model {
                Some(model) => to_subtitle(backend, client, api_key, model, base_text).await?,
                None => build_approximate_srt(base_text),
            },
        };
        progress.report(
            ProgressUpdate::new(Phase::Format, format!("{format} output ready"))
                .with_status(ProgressStatus::Done)
                .with_format(format),
        );
        Ok((format, body))
    });
    Ok(try_join_all(tasks).await?.into_iter().collect())
}
