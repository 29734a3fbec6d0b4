//! Drives one transcription job end to end: registers it, streams its
//! progress events to stdout as JSON lines, runs the pipeline, and writes
//! the produced formats to disk.

mod app;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use scribe_core::{
    GeminiBackend, JobCompletion, JobRegistry, JobStatus, Phase, PipelineInput, ProgressStatus,
    ProgressUpdate, Settings, get_http_client, run_transcription, set_verbose,
};

#[derive(Parser, Debug)]
#[command(
    name = "scribe",
    version,
    about = "Transcribe audio into text, notes, markdown, and subtitles"
)]
struct Args {
    /// Audio file to transcribe
    #[arg(short, long, value_name = "FILE")]
    input: PathBuf,

    /// Transcription model (gemini-2.5-pro or gemini-2.5-flash)
    #[arg(short, long, value_name = "MODEL")]
    model: Option<String>,

    /// Output format to produce (repeatable): text, notes, markdown, subtitle
    #[arg(short, long = "format", value_name = "FORMAT", default_value = "text")]
    formats: Vec<String>,

    /// Rewrite the transcript for readability before formatting
    #[arg(long)]
    optimize: bool,

    /// Agenda used to order the sections of the notes output
    #[arg(long, value_name = "TEXT")]
    agenda: Option<String>,

    /// Gemini API key (falls back to settings, then GEMINI_API_KEY)
    #[arg(long, value_name = "KEY")]
    api_key: Option<String>,

    /// Directory the artifacts are written to
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Seconds between keep-alive events on the progress stream (0 disables)
    #[arg(long, value_name = "SECONDS", default_value_t = 15)]
    keep_alive_secs: u64,

    /// Print verbose diagnostics to stderr
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    set_verbose(args.verbose);
    app::ensure_ffmpeg_installed()?;

    let settings = Settings::load();
    let api_key = args
        .api_key
        .clone()
        .or_else(|| settings.api_key())
        .context(
            "No Gemini API key configured. Pass --api-key, set GEMINI_API_KEY, \
             or store one in settings.",
        )?;
    let model = args
        .model
        .clone()
        .or_else(|| settings.model.clone())
        .unwrap_or_default();

    let file_name = args
        .input
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| args.input.display().to_string());
    let media_type = app::guess_media_type(&args.input);

    let registry = Arc::new(JobRegistry::new());
    let job_id = registry.create().await;

    // Stream this job's events to stdout, one JSON object per line, the way
    // a server would relay them to its subscribers.
    let mut subscription = registry
        .attach(&job_id)
        .await
        .context("job disappeared before its stream could attach")?;
    let printer = tokio::spawn(async move {
        while let Some(event) = subscription.next_event().await {
            if let Ok(line) = serde_json::to_string(&event) {
                println!("{line}");
            }
        }
    });
    let keep_alive = (args.keep_alive_secs > 0).then(|| {
        JobRegistry::spawn_keep_alive(
            Arc::clone(&registry),
            Duration::from_secs(args.keep_alive_secs),
        )
    });

    registry.set_status(&job_id, JobStatus::Processing, None).await;
    registry
        .report_progress(
            &job_id,
            ProgressUpdate::new(Phase::Upload, format!("Received {file_name}"))
                .with_status(ProgressStatus::Received)
                .with_file_name(&file_name),
        )
        .await;

    let backend = GeminiBackend;
    let client = get_http_client()?;
    let sink = registry.progress_sink(&job_id);
    let pipeline_input = PipelineInput {
        api_key,
        model,
        optimize: args.optimize,
        output_formats: args.formats.clone(),
        audio_path: args.input.clone(),
        media_type,
        file_name,
        agenda: args.agenda.clone(),
    };

    let outcome = run_transcription(&backend, client, pipeline_input, &sink).await;
    // Flush queued progress before the terminal event so subscribers see the
    // full sequence first.
    sink.finish().await;
    match &outcome {
        Ok(result) => {
            registry
                .complete(
                    &job_id,
                    JobCompletion {
                        file_name: result.file_name.clone(),
                        model: result.model.to_string(),
                    },
                )
                .await;
        }
        Err(err) => registry.fail(&job_id, err.to_string()).await,
    }

    // The terminal event closed the stream; drain the printer before writing
    // artifacts so job events and file paths do not interleave.
    if let Some(handle) = keep_alive {
        handle.abort();
    }
    let _ = printer.await;

    let result = outcome?;
    app::write_outputs(&args.output_dir, &args.input, &result)?;
    Ok(())
}
