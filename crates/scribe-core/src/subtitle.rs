//! Local SubRip synthesis for transcripts without real timing data.
//!
//! Used when the provider cannot produce valid SRT: cues are laid out
//! back-to-back from zero with durations estimated from text length, so the
//! result is well-formed and watchable even though timings are approximate.

const MAX_WORDS_PER_CUE: usize = 18;
const MIN_CUE_SECONDS: u64 = 3;
const SECONDS_PER_UNIT: f64 = 0.6;
const SENTENCE_TERMINATORS: [char; 6] = ['.', '!', '?', '。', '！', '？'];

/// Build an approximate SRT document for a transcript.
///
/// Sentences become cues, long sentences are split into fixed-size word
/// windows, and each cue's duration is estimated from its word and character
/// counts. Whitespace-only input yields an empty string.
pub fn build_approximate_srt(transcript: &str) -> String {
    let chunks = split_into_chunks(transcript);
    if chunks.is_empty() {
        return String::new();
    }

    let mut entries = Vec::with_capacity(chunks.len());
    let mut cursor = 0u64;
    for (index, chunk) in chunks.iter().enumerate() {
        let start = cursor;
        let end = start + estimate_duration_seconds(chunk);
        entries.push(format!(
            "{}\n{} --> {}\n{}\n",
            index + 1,
            to_timecode(start),
            to_timecode(end),
            chunk
        ));
        cursor = end;
    }
    entries.join("\n").trim().to_string()
}

/// Split a transcript into cue-sized chunks.
///
/// Whitespace is collapsed first, then the text is cut on Latin and CJK
/// sentence terminators (kept with their sentence). Terminators with no
/// preceding content are dropped, an unterminated tail is kept, and text
/// with no sentence structure at all becomes a single chunk. Sentences
/// longer than the word limit are split into fixed-size windows.
fn split_into_chunks(text: &str) -> Vec<String> {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return Vec::new();
    }

    let mut sentences = Vec::new();
    let mut current = String::new();
    for c in collapsed.chars() {
        if SENTENCE_TERMINATORS.contains(&c) {
            if current.trim().is_empty() {
                current.clear();
                continue;
            }
            current.push(c);
            sentences.push(current.trim().to_string());
            current.clear();
        } else {
            current.push(c);
        }
    }
    if !current.trim().is_empty() {
        sentences.push(current.trim().to_string());
    }
    if sentences.is_empty() {
        return vec![collapsed];
    }

    let mut chunks = Vec::new();
    for sentence in sentences {
        let words: Vec<&str> = sentence.split_whitespace().collect();
        if words.len() <= MAX_WORDS_PER_CUE {
            chunks.push(sentence);
        } else {
            for window in words.chunks(MAX_WORDS_PER_CUE) {
                chunks.push(window.join(" "));
            }
        }
    }
    chunks
}

/// Rough speaking time for a chunk, never below the minimum cue length.
///
/// Word count drives the estimate for spaced languages; for unspaced text
/// the character count (six characters per unit) takes over.
fn estimate_duration_seconds(chunk: &str) -> u64 {
    let word_count = chunk.split_whitespace().count();
    let char_count = chunk.chars().filter(|c| !c.is_whitespace()).count();
    let units = word_count.max(char_count.div_ceil(6));
    let estimated = (units as f64 * SECONDS_PER_UNIT).round() as u64;
    estimated.max(MIN_CUE_SECONDS)
}

fn to_timecode(total_seconds: u64) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02},000")
}
