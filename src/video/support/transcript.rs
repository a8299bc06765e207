use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::video::segments::TranscriptSegment;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscriptFormat {
    Srt,
    WhisperJson,
    SegmentJson,
}

#[derive(Debug, Deserialize)]
struct WhisperOutput {
    segments: Vec<WhisperSegment>,
}

#[derive(Debug, Deserialize)]
struct WhisperSegment {
    start: f64,
    end: f64,
    #[serde(default)]
    text: String,
    #[serde(default)]
    words: Vec<WhisperWord>,
}

#[derive(Debug, Deserialize)]
struct WhisperWord {
    #[serde(default)]
    score: Option<f64>,
}

/// Read a transcript file, detecting its format from the extension and content.
pub fn load_segments(path: &Path) -> Result<Vec<TranscriptSegment>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read transcript {}", path.display()))?;
    let format = detect_format(path, &contents);
    parse_transcript(&contents, format)
        .with_context(|| format!("Failed to parse transcript {}", path.display()))
}

pub fn detect_format(path: &Path, contents: &str) -> TranscriptFormat {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    if extension.as_deref() == Some("srt") {
        return TranscriptFormat::Srt;
    }
    match contents.trim_start().chars().next() {
        Some('[') => TranscriptFormat::SegmentJson,
        Some('{') => TranscriptFormat::WhisperJson,
        _ => TranscriptFormat::Srt,
    }
}

pub fn parse_transcript(contents: &str, format: TranscriptFormat) -> Result<Vec<TranscriptSegment>> {
    match format {
        TranscriptFormat::Srt => parse_srt(contents),
        TranscriptFormat::WhisperJson => parse_whisper_json(contents),
        TranscriptFormat::SegmentJson => parse_segment_json(contents),
    }
}

/// Segments of a WhisperX result. Confidence is the mean word score.
pub fn parse_whisper_json(json_str: &str) -> Result<Vec<TranscriptSegment>> {
    let output: WhisperOutput =
        serde_json::from_str(json_str).context("Failed to parse WhisperX JSON output")?;

    Ok(output
        .segments
        .into_iter()
        .filter(|segment| !segment.text.trim().is_empty())
        .map(|segment| {
            let scores: Vec<f64> = segment.words.iter().filter_map(|w| w.score).collect();
            let confidence = if scores.is_empty() {
                1.0
            } else {
                scores.iter().sum::<f64>() / scores.len() as f64
            };
            TranscriptSegment::new(segment.start, segment.end, segment.text.trim())
                .with_confidence(confidence)
        })
        .collect())
}

/// A plain JSON array of `{start_time, end_time, text, confidence}` records.
pub fn parse_segment_json(json_str: &str) -> Result<Vec<TranscriptSegment>> {
    serde_json::from_str(json_str).context("Failed to parse transcript segment list")
}

pub fn parse_srt(input: &str) -> Result<Vec<TranscriptSegment>> {
    let mut segments = Vec::new();
    let mut lines = input.lines().peekable();

    while let Some(line) = lines.next() {
        let index_line = line.trim().trim_start_matches('\u{feff}');
        if index_line.is_empty() {
            continue;
        }

        // Cue numbers are optional in the wild; a timing line may come first.
        let times = if index_line.contains("-->") {
            index_line
        } else {
            lines
                .next()
                .map(str::trim)
                .context("SRT cue is missing a timestamp line")?
        };

        let (start_raw, end_raw) = times
            .split_once("-->")
            .map(|(a, b)| (a.trim(), b.trim()))
            .context("SRT cue timestamp line must contain '-->'")?;

        let start = parse_timestamp(start_raw)
            .with_context(|| format!("Failed to parse SRT start timestamp '{start_raw}'"))?;
        let end = parse_timestamp(end_raw)
            .with_context(|| format!("Failed to parse SRT end timestamp '{end_raw}'"))?;

        let mut text_lines = Vec::new();
        while let Some(next) = lines.next_if(|next| !next.trim().is_empty()) {
            text_lines.push(next.trim().to_string());
        }

        segments.push(TranscriptSegment::new(start, end, text_lines.join(" ")));
    }

    Ok(segments)
}

/// `HH:MM:SS,mmm` (or `.mmm`) to seconds.
fn parse_timestamp(value: &str) -> Result<f64> {
    let cleaned = value.trim().replace(',', ".");
    let (time_part, fractional_part) = cleaned.split_once('.').unwrap_or((cleaned.as_str(), "0"));

    let mut hms = time_part.split(':');
    let hours = hms
        .next()
        .context("Timestamp missing hours")?
        .parse::<u64>()
        .context("Invalid hours in timestamp")?;
    let minutes = hms
        .next()
        .context("Timestamp missing minutes")?
        .parse::<u64>()
        .context("Invalid minutes in timestamp")?;
    let seconds = hms
        .next()
        .context("Timestamp missing seconds")?
        .parse::<u64>()
        .context("Invalid seconds in timestamp")?;

    if hms.next().is_some() {
        bail!("Timestamp has more than three components: {value}");
    }

    let millis_digits: String = fractional_part.chars().chain("000".chars()).take(3).collect();
    let millis = millis_digits
        .parse::<u64>()
        .context("Invalid millisecond component in timestamp")?;

    let total_seconds = hours * 3600 + minutes * 60 + seconds;
    Ok(total_seconds as f64 + millis as f64 / 1000.0)
}
