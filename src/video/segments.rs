use serde::{Deserialize, Serialize};

use super::errors::PipelineError;

/// One ASR-produced span of speech.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub start_time: f64,
    pub end_time: f64,
    pub text: String,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

fn default_confidence() -> f64 {
    1.0
}

impl TranscriptSegment {
    pub fn new(start_time: f64, end_time: f64, text: impl Into<String>) -> Self {
        Self {
            start_time,
            end_time,
            text: text.into(),
            confidence: 1.0,
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn overlaps(&self, start: f64, end: f64) -> bool {
        self.start_time < end && start < self.end_time
    }
}

/// Chronologically ordered, immutable view over a job's transcript.
///
/// Segments are validated on construction and never change afterwards. Ties
/// on `start_time` keep the order in which the caller supplied them, so the
/// index of a segment is stable for the lifetime of the store.
#[derive(Debug, Clone, Default)]
pub struct SegmentStore {
    segments: Vec<TranscriptSegment>,
}

impl SegmentStore {
    pub fn new(segments: Vec<TranscriptSegment>) -> Result<Self, PipelineError> {
        let mut validated = Vec::with_capacity(segments.len());
        for (index, mut segment) in segments.into_iter().enumerate() {
            if !segment.start_time.is_finite() || !segment.end_time.is_finite() {
                return Err(PipelineError::MalformedSegment {
                    index,
                    reason: "timestamps must be finite".to_string(),
                });
            }
            if segment.start_time < 0.0 {
                return Err(PipelineError::MalformedSegment {
                    index,
                    reason: format!("start time {} is negative", segment.start_time),
                });
            }
            if segment.end_time <= segment.start_time {
                return Err(PipelineError::InvalidSegment {
                    index,
                    start_time: segment.start_time,
                    end_time: segment.end_time,
                });
            }
            segment.confidence = if segment.confidence.is_finite() {
                segment.confidence.clamp(0.0, 1.0)
            } else {
                0.0
            };
            validated.push(segment);
        }

        // sort_by is stable, which preserves insertion order on ties
        validated.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));

        Ok(Self {
            segments: validated,
        })
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&TranscriptSegment> {
        self.segments.get(index)
    }

    /// Chronological iteration (ascending start time).
    pub fn iter(&self) -> impl Iterator<Item = &TranscriptSegment> {
        self.segments.iter()
    }

    pub fn as_slice(&self) -> &[TranscriptSegment] {
        &self.segments
    }

    /// Segments whose span intersects `[start, end)`, with their store index.
    pub fn in_range(&self, start: f64, end: f64) -> Vec<(usize, &TranscriptSegment)> {
        // Segments are sorted by start; anything starting at or after `end` cannot intersect.
        let upper = self.segments.partition_point(|s| s.start_time < end);
        self.segments[..upper]
            .iter()
            .enumerate()
            .filter(|(_, s)| s.overlaps(start, end))
            .collect()
    }

    /// The earliest segment whose span contains `time`.
    pub fn at(&self, time: f64) -> Option<(usize, &TranscriptSegment)> {
        self.segments
            .iter()
            .enumerate()
            .take_while(|(_, s)| s.start_time <= time)
            .find(|(_, s)| time < s.end_time)
    }

    /// End of the last spoken segment, or 0 for an empty store.
    pub fn total_end(&self) -> f64 {
        self.segments
            .iter()
            .map(|s| s.end_time)
            .fold(0.0, f64::max)
    }
}
