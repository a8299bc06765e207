mod vocabulary;

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

pub use self::vocabulary::Vocabulary;
use self::vocabulary::ranking_tokens;

use super::errors::PipelineError;
use super::segments::SegmentStore;

const BASE_SCORE: f64 = 1.0;
const DECISION_WEIGHT: f64 = 0.6;
const MAX_DECISION_HITS: usize = 3;
const NUMERIC_BONUS: f64 = 0.5;
const PERCENT_BONUS: f64 = 0.3;
const DOMAIN_NOUN_MIN_CHARS: usize = 7;
const DOMAIN_NOUN_WEIGHT: f64 = 0.15;
const MAX_DOMAIN_NOUNS: usize = 4;
const FILLER_FACTOR: f64 = 0.05;
const SHORT_SEGMENT_TOKENS: usize = 4;
const SHORT_SEGMENT_FACTOR: f64 = 0.5;
const SPAN_EDGE_FACTOR: f64 = 1.15;

/// A piece of text proposed for display, possibly paraphrased.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulletCandidate {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_hint: Option<String>,
}

impl BulletCandidate {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source_hint: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.source_hint = Some(hint.into());
        self
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RankerSettings {
    pub max_bullets: usize,
    /// Segments scoring at or below this are never selected.
    pub min_score: f64,
    /// Silence of at least this long separates thematic spans.
    pub span_gap_seconds: f64,
}

impl Default for RankerSettings {
    fn default() -> Self {
        Self {
            max_bullets: 5,
            min_score: 0.3,
            span_gap_seconds: 2.0,
        }
    }
}

/// A segment with its salience score.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredSegment {
    pub segment_index: usize,
    pub start_time: f64,
    pub text: String,
    pub score: f64,
}

/// Outcome of validating externally supplied candidates.
#[derive(Debug, Clone)]
pub struct AcceptedCandidates {
    pub candidates: Vec<BulletCandidate>,
    pub dropped_blank: usize,
    pub truncated: usize,
}

pub struct ImportanceRanker<'a> {
    vocabulary: &'a Vocabulary,
    settings: RankerSettings,
}

impl<'a> ImportanceRanker<'a> {
    pub fn new(vocabulary: &'a Vocabulary, settings: RankerSettings) -> Self {
        Self {
            vocabulary,
            settings,
        }
    }

    /// Salience of every segment, in store order.
    pub fn score_segments(&self, store: &SegmentStore) -> Vec<ScoredSegment> {
        let segments = store.as_slice();
        segments
            .iter()
            .enumerate()
            .map(|(index, segment)| {
                let opens_span = index == 0
                    || segment.start_time - segments[index - 1].end_time
                        >= self.settings.span_gap_seconds;
                let closes_span = index + 1 == segments.len()
                    || segments[index + 1].start_time - segment.end_time
                        >= self.settings.span_gap_seconds;

                let mut score = self.lexical_score(&segment.text);
                if opens_span || closes_span {
                    score *= SPAN_EDGE_FACTOR;
                }
                score *= segment.confidence;

                ScoredSegment {
                    segment_index: index,
                    start_time: segment.start_time,
                    text: segment.text.clone(),
                    score,
                }
            })
            .collect()
    }

    fn lexical_score(&self, text: &str) -> f64 {
        let tokens = ranking_tokens(text);
        let mut score = BASE_SCORE;

        let hits = self.vocabulary.decision_hits(&tokens).min(MAX_DECISION_HITS);
        score += DECISION_WEIGHT * hits as f64;

        if text.chars().any(|c| c.is_ascii_digit()) {
            score += NUMERIC_BONUS;
        }
        let lowered = text.to_lowercase();
        if lowered.contains('%') || lowered.contains("percent") {
            score += PERCENT_BONUS;
        }

        let domain_nouns = tokens
            .iter()
            .filter(|t| t.chars().count() >= DOMAIN_NOUN_MIN_CHARS)
            .filter(|t| !self.vocabulary.is_decision_token(t))
            .count()
            .min(MAX_DOMAIN_NOUNS);
        score += DOMAIN_NOUN_WEIGHT * domain_nouns as f64;

        if self.vocabulary.is_filler(text) {
            score *= FILLER_FACTOR;
        }
        if tokens.len() < SHORT_SEGMENT_TOKENS {
            score *= SHORT_SEGMENT_FACTOR;
        }
        score
    }

    /// The top `max_bullets` segments as candidates, highest score first.
    pub fn rank(&self, store: &SegmentStore) -> Result<Vec<BulletCandidate>, PipelineError> {
        let ranked = self.top_segments(store);
        if ranked.is_empty() {
            return Err(PipelineError::NoCandidates);
        }
        Ok(ranked
            .into_iter()
            .map(|scored| {
                BulletCandidate::new(scored.text.trim())
                    .with_hint(format!("segment:{}", scored.segment_index))
            })
            .collect())
    }

    pub fn top_segments(&self, store: &SegmentStore) -> Vec<ScoredSegment> {
        let mut scored: Vec<ScoredSegment> = self
            .score_segments(store)
            .into_iter()
            .filter(|s| s.score.is_finite() && s.score > self.settings.min_score)
            .filter(|s| !s.text.trim().is_empty())
            .collect();

        scored.sort_by(by_rank);
        scored.truncate(self.settings.max_bullets);
        scored
    }

    /// Pass-through for externally ranked bullets: enforces `1 <= len <= max_bullets`.
    pub fn accept_external(
        &self,
        candidates: Vec<BulletCandidate>,
    ) -> Result<AcceptedCandidates, PipelineError> {
        let total = candidates.len();
        let mut kept: Vec<BulletCandidate> = candidates
            .into_iter()
            .filter_map(|mut c| {
                let trimmed = c.text.trim();
                if trimmed.is_empty() {
                    return None;
                }
                c.text = trimmed.to_string();
                Some(c)
            })
            .collect();
        let dropped_blank = total - kept.len();

        if kept.is_empty() {
            return Err(PipelineError::NoCandidates);
        }

        let limit = self.settings.max_bullets.max(1);
        let truncated = kept.len().saturating_sub(limit);
        kept.truncate(limit);

        Ok(AcceptedCandidates {
            candidates: kept,
            dropped_blank,
            truncated,
        })
    }
}

/// Descending by score, then chronological.
fn by_rank(a: &ScoredSegment, b: &ScoredSegment) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.start_time.total_cmp(&b.start_time))
        .then_with(|| a.segment_index.cmp(&b.segment_index))
}
