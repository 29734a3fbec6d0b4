//! Audio segmentation via FFmpeg for oversized recordings.
//!
//! Recordings too large for a single inline provider request are resampled
//! to 16 kHz mono WAV and cut into fixed-length segments inside a scratch
//! directory. The scratch directory lives exactly as long as the returned
//! [`AudioSegments`]: dropping it removes every segment file.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tokio::process::Command;

use crate::error::{Result, ScribeError};

/// Sample rate segments are resampled to before transcription.
pub const TARGET_SAMPLE_RATE: u32 = 16_000;
/// Segment length used when the caller does not override it.
pub const DEFAULT_SEGMENT_SECONDS: u64 = 600;

/// Ordered segment files plus the scratch directory that owns them.
#[derive(Debug)]
pub struct AudioSegments {
    /// Scratch directory holding the segment files. Removed on drop.
    pub dir: TempDir,
    /// Segment paths in playback order.
    pub segments: Vec<PathBuf>,
}

/// Split an audio file into WAV segments of at most `segment_seconds`
/// (default ten minutes) using FFmpeg's segment muxer.
///
/// Returns the segments in playback order. FFmpeg start failures and
/// non-zero exits surface as [`ScribeError::Segmentation`]; either way the
/// scratch directory is cleaned up with the returned value.
pub async fn split_audio_file(
    input_path: &Path,
    segment_seconds: Option<u64>,
) -> Result<AudioSegments> {
    let seconds = segment_seconds.unwrap_or(DEFAULT_SEGMENT_SECONDS);
    let dir = tempfile::Builder::new().prefix("scribe-audio-").tempdir()?;
    let pattern = dir.path().join("chunk_%03d.wav");

    crate::verbose!(
        "Segmenting {} into {}s chunks under {}",
        input_path.display(),
        seconds,
        dir.path().display()
    );

    let output = Command::new("ffmpeg")
        .arg("-hide_banner")
        .args(["-loglevel", "error"])
        .arg("-i")
        .arg(input_path)
        .arg("-ar")
        .arg(TARGET_SAMPLE_RATE.to_string())
        .args(["-ac", "1"])
        .args(["-f", "segment", "-reset_timestamps", "1"])
        .arg("-segment_time")
        .arg(seconds.to_string())
        .arg("-y")
        .arg(&pattern)
        .output()
        .await
        .map_err(|err| ScribeError::Segmentation {
            message: format!("Failed to execute ffmpeg ({err}). Make sure ffmpeg is installed."),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ScribeError::Segmentation {
            message: format!("FFmpeg segmentation failed: {}", stderr.trim()),
        });
    }

    let mut segments = Vec::new();
    let mut entries = tokio::fs::read_dir(dir.path()).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with("chunk_") && name.ends_with(".wav") {
            segments.push(entry.path());
        }
    }
    // Zero-padded indices make lexicographic order playback order.
    segments.sort();

    Ok(AudioSegments { dir, segments })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ffmpeg_available() -> bool {
        std::process::Command::new("ffmpeg")
            .arg("-version")
            .output()
            .is_ok()
    }

    /// Write a sine-tone WAV of the given length at the target sample rate.
    fn write_test_wav(path: &Path, seconds: f32) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: TARGET_SAMPLE_RATE,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        let total_samples = (seconds * TARGET_SAMPLE_RATE as f32) as u32;
        for i in 0..total_samples {
            let t = i as f32 / TARGET_SAMPLE_RATE as f32;
            let sample = (t * 440.0 * std::f32::consts::TAU).sin();
            writer.write_sample((sample * 0.2 * i16::MAX as f32) as i16).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[tokio::test]
    async fn splits_audio_into_ordered_segments() {
        if !ffmpeg_available() {
            eprintln!("skipping: ffmpeg not installed");
            return;
        }
        let work = tempfile::tempdir().unwrap();
        let input = work.path().join("tone.wav");
        write_test_wav(&input, 2.5);

        let segments = split_audio_file(&input, Some(1)).await.unwrap();
        assert_eq!(segments.segments.len(), 3);
        let names: Vec<String> = segments
            .segments
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["chunk_000.wav", "chunk_001.wav", "chunk_002.wav"]);

        // Full segments run the requested length; only the last may be short.
        let first = hound::WavReader::open(&segments.segments[0]).unwrap();
        let duration = first.duration();
        assert!(
            (15_900..=16_100).contains(&duration),
            "unexpected first segment length: {duration} samples"
        );
    }

    #[tokio::test]
    async fn short_audio_yields_a_single_segment() {
        if !ffmpeg_available() {
            eprintln!("skipping: ffmpeg not installed");
            return;
        }
        let work = tempfile::tempdir().unwrap();
        let input = work.path().join("tone.wav");
        write_test_wav(&input, 1.0);

        let segments = split_audio_file(&input, None).await.unwrap();
        assert_eq!(segments.segments.len(), 1);
    }

    #[tokio::test]
    async fn scratch_directory_is_removed_on_drop() {
        if !ffmpeg_available() {
            eprintln!("skipping: ffmpeg not installed");
            return;
        }
        let work = tempfile::tempdir().unwrap();
        let input = work.path().join("tone.wav");
        write_test_wav(&input, 1.0);

        let segments = split_audio_file(&input, Some(1)).await.unwrap();
        let scratch = segments.dir.path().to_path_buf();
        assert!(scratch.exists());
        drop(segments);
        assert!(!scratch.exists());
    }

    #[tokio::test]
    async fn rejects_non_audio_input() {
        if !ffmpeg_available() {
            eprintln!("skipping: ffmpeg not installed");
            return;
        }
        let work = tempfile::tempdir().unwrap();
        let input = work.path().join("bogus.wav");
        std::fs::write(&input, b"definitely not audio").unwrap();

        let err = split_audio_file(&input, Some(1)).await.unwrap_err();
        assert!(matches!(err, ScribeError::Segmentation { .. }));
    }
}
