//! Transcription provider backends.
//!
//! The pipeline talks to providers through [`TranscriptionBackend`], which
//! keeps the job orchestration independent of any one API and lets tests
//! substitute a mock backend.

mod gemini;

pub use gemini::GeminiBackend;

use async_trait::async_trait;

use crate::config::TranscriptionModel;
use crate::error::Result;

/// Audio payload for a single transcription call.
#[derive(Debug, Clone)]
pub struct TranscriptionRequest {
    pub audio_data: Vec<u8>,
    pub mime_type: String,
}

/// Seam between the pipeline and a text-generation provider.
#[async_trait]
pub trait TranscriptionBackend: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Model used for rewrite steps (optimize, markdown, notes, subtitle),
    /// when the provider offers one capable enough.
    fn rewrite_model(&self) -> Option<TranscriptionModel>;

    /// Transcribe one audio payload verbatim, returning trimmed plain text.
    /// An empty string means the audio carried no transcribable speech.
    async fn transcribe_audio(
        &self,
        client: &reqwest::Client,
        api_key: &str,
        model: TranscriptionModel,
        request: TranscriptionRequest,
    ) -> Result<String>;

    /// Run a text prompt through the given model, returning trimmed text.
    async fn generate_text(
        &self,
        client: &reqwest::Client,
        api_key: &str,
        model: TranscriptionModel,
        prompt: &str,
    ) -> Result<String>;
}
