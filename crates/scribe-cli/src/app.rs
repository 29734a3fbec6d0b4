//! Environment checks and artifact writing for the scribe CLI.

use std::path::Path;

use anyhow::{Context, Result};
use scribe_core::TranscriptionOutcome;

pub fn ensure_ffmpeg_installed() -> Result<()> {
    if std::process::Command::new("ffmpeg")
        .arg("-version")
        .output()
        .is_err()
    {
        eprintln!("Error: FFmpeg is not installed or not in PATH.");
        eprintln!("\nscribe requires FFmpeg to segment long recordings.");
        eprintln!("Please install FFmpeg:");
        eprintln!("  - Ubuntu/Debian: sudo apt install ffmpeg");
        eprintln!("  - macOS: brew install ffmpeg");
        eprintln!("  - Windows: choco install ffmpeg or download from ffmpeg.org");
        eprintln!("  - Or visit: https://ffmpeg.org/download.html\n");
        std::process::exit(1);
    }
    Ok(())
}

/// Media type for an audio file, guessed from its extension.
pub fn guess_media_type(path: &Path) -> String {
    let extension = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "m4a" => "audio/mp4",
        "ogg" => "audio/ogg",
        "flac" => "audio/flac",
        "webm" => "audio/webm",
        "aac" => "audio/aac",
        "opus" => "audio/opus",
        _ => "application/octet-stream",
    }
    .to_string()
}

/// Write every produced format next to each other in the output directory,
/// named after the input file's stem.
pub fn write_outputs(
    output_dir: &Path,
    input_path: &Path,
    outcome: &TranscriptionOutcome,
) -> Result<()> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory {}", output_dir.display()))?;
    let stem = input_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "transcript".to_string());

    for (format, body) in &outcome.outputs {
        let path = output_dir.join(format!("{stem}.{}", format.file_extension()));
        std::fs::write(&path, body)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Wrote {}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    use scribe_core::{OutputFormat, TranscriptionModel};

    #[test]
    fn guesses_common_audio_media_types() {
        assert_eq!(guess_media_type(Path::new("a.mp3")), "audio/mpeg");
        assert_eq!(guess_media_type(Path::new("a.WAV")), "audio/wav");
        assert_eq!(guess_media_type(Path::new("a.m4a")), "audio/mp4");
        assert_eq!(guess_media_type(Path::new("a.unknown")), "application/octet-stream");
        assert_eq!(guess_media_type(Path::new("noext")), "application/octet-stream");
    }

    #[test]
    fn writes_one_file_per_format() {
        let dir = tempfile::tempdir().unwrap();
        let mut outputs = BTreeMap::new();
        outputs.insert(OutputFormat::Text, "the transcript".to_string());
        outputs.insert(OutputFormat::Subtitle, "1\n00:00:00,000 --> 00:00:03,000\nhi".to_string());
        let outcome = TranscriptionOutcome {
            file_name: "meeting.mp3".to_string(),
            model: TranscriptionModel::Pro,
            raw_transcript: "the transcript".to_string(),
            optimized_transcript: None,
            outputs,
        };

        write_outputs(dir.path(), &PathBuf::from("recordings/meeting.mp3"), &outcome).unwrap();

        let text = std::fs::read_to_string(dir.path().join("meeting.txt")).unwrap();
        assert_eq!(text, "the transcript");
        assert!(dir.path().join("meeting.srt").exists());
    }
}
