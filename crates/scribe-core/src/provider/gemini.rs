//! Gemini `generateContent` backend.

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Deserialize;
use serde_json::json;

use crate::config::TranscriptionModel;
use crate::error::{Result, ScribeError};
use crate::provider::{TranscriptionBackend, TranscriptionRequest};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

const TRANSCRIPTION_PROMPT: &str = "Transcribe the audio content verbatim. \
Return plain text only without speaker labels, timestamps, or commentary. \
Maintain the original language detected in the audio.";

/// Backend for the Gemini API. Audio is sent inline, base64-encoded.
#[derive(Debug, Default, Clone)]
pub struct GeminiBackend;

#[async_trait]
impl TranscriptionBackend for GeminiBackend {
    fn name(&self) -> &'static str {
        "gemini"
    }

    fn rewrite_model(&self) -> Option<TranscriptionModel> {
        Some(TranscriptionModel::Pro)
    }

    async fn transcribe_audio(
        &self,
        client: &reqwest::Client,
        api_key: &str,
        model: TranscriptionModel,
        request: TranscriptionRequest,
    ) -> Result<String> {
        let body = json!({
            "contents": [{
                "parts": [
                    {
                        "inline_data": {
                            "mime_type": request.mime_type,
                            "data": BASE64.encode(&request.audio_data),
                        }
                    },
                    { "text": TRANSCRIPTION_PROMPT },
                ]
            }]
        });
        generate(client, api_key, model, body).await
    }

    async fn generate_text(
        &self,
        client: &reqwest::Client,
        api_key: &str,
        model: TranscriptionModel,
        prompt: &str,
    ) -> Result<String> {
        let body = json!({
            "contents": [{
                "parts": [{ "text": prompt }]
            }]
        });
        generate(client, api_key, model, body).await
    }
}

async fn generate(
    client: &reqwest::Client,
    api_key: &str,
    model: TranscriptionModel,
    body: serde_json::Value,
) -> Result<String> {
    let url = format!("{GEMINI_API_BASE}/{}:generateContent", model.as_str());
    crate::verbose!("POST {url}");

    let response = client
        .post(&url)
        .header("x-goog-api-key", api_key)
        .json(&body)
        .send()
        .await
        .map_err(|err| ScribeError::Provider {
            message: format!("Gemini request failed: {err}"),
            status: None,
        })?;

    let status = response.status();
    if !status.is_success() {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(ScribeError::Provider {
            message: format!("Gemini API error ({status}): {error_text}"),
            status: Some(status.as_u16()),
        });
    }

    let parsed: GenerateContentResponse =
        response.json().await.map_err(|err| ScribeError::Provider {
            message: format!("Failed to parse Gemini response: {err}"),
            status: None,
        })?;
    response_text(parsed)
}

/// Concatenated text of the first candidate, trimmed. An empty string is a
/// valid outcome (silence transcribes to nothing); missing candidates are not.
fn response_text(response: GenerateContentResponse) -> Result<String> {
    let Some(candidate) = response.candidates.into_iter().next() else {
        return Err(ScribeError::Provider {
            message: "Gemini response contained no candidates".to_string(),
            status: None,
        });
    };
    let text = candidate
        .content
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect::<String>()
        })
        .unwrap_or_default();
    Ok(text.trim().to_string())
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}
