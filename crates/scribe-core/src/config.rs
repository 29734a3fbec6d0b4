//! Model and output-format vocabularies.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Gemini models a job may transcribe with.
///
/// Unknown names resolve to [`TranscriptionModel::Pro`], which is also the
/// model used for every rewrite step (optimize, markdown, notes, subtitle).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TranscriptionModel {
    #[default]
    #[serde(rename = "gemini-2.5-pro")]
    Pro,
    #[serde(rename = "gemini-2.5-flash")]
    Flash,
}

impl TranscriptionModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            TranscriptionModel::Pro => "gemini-2.5-pro",
            TranscriptionModel::Flash => "gemini-2.5-flash",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            TranscriptionModel::Pro => "Gemini 2.5 Pro",
            TranscriptionModel::Flash => "Gemini 2.5 Flash",
        }
    }

    pub fn all() -> &'static [TranscriptionModel] {
        &[TranscriptionModel::Pro, TranscriptionModel::Flash]
    }

    /// Resolve a requested model name, falling back to the default model
    /// when the name is not in the supported set.
    pub fn resolve(name: &str) -> TranscriptionModel {
        name.parse().unwrap_or_default()
    }
}

impl fmt::Display for TranscriptionModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TranscriptionModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gemini-2.5-pro" => Ok(TranscriptionModel::Pro),
            "gemini-2.5-flash" => Ok(TranscriptionModel::Flash),
            _ => Err(format!(
                "Unknown model: {s}. Available: gemini-2.5-pro, gemini-2.5-flash"
            )),
        }
    }
}

/// Artifacts a job can produce from the finished transcript.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// The transcript itself, optimized when requested.
    Text,
    /// Structured meeting notes, optionally ordered by an agenda.
    Notes,
    /// The transcript rewritten as clean Markdown.
    Markdown,
    /// SubRip subtitles, provider-generated or locally estimated.
    Subtitle,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Text => "text",
            OutputFormat::Notes => "notes",
            OutputFormat::Markdown => "markdown",
            OutputFormat::Subtitle => "subtitle",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            OutputFormat::Text => "Plain text",
            OutputFormat::Notes => "Meeting notes",
            OutputFormat::Markdown => "Markdown",
            OutputFormat::Subtitle => "Subtitles (SRT)",
        }
    }

    pub fn all() -> &'static [OutputFormat] {
        &[
            OutputFormat::Text,
            OutputFormat::Notes,
            OutputFormat::Markdown,
            OutputFormat::Subtitle,
        ]
    }

    /// File extension for the written artifact.
    pub fn file_extension(&self) -> &'static str {
        match self {
            OutputFormat::Text => "txt",
            OutputFormat::Notes => "notes.md",
            OutputFormat::Markdown => "md",
            OutputFormat::Subtitle => "srt",
        }
    }

    /// Normalize a requested format list: unknown names are dropped and
    /// duplicates collapse onto their first occurrence, preserving order.
    pub fn normalize(requested: &[String]) -> Vec<OutputFormat> {
        let mut formats = Vec::new();
        for name in requested {
            if let Ok(format) = name.parse::<OutputFormat>() {
                if !formats.contains(&format) {
                    formats.push(format);
                }
            }
        }
        formats
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(OutputFormat::Text),
            "notes" => Ok(OutputFormat::Notes),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            "subtitle" | "srt" => Ok(OutputFormat::Subtitle),
            _ => Err(format!(
                "Unknown output format: {s}. Available: text, notes, markdown, subtitle"
            )),
        }
    }
}
