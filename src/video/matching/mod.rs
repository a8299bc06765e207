mod similarity;
mod tokens;

use serde::{Deserialize, Serialize};

pub use self::similarity::{JaroWinklerScorer, ScorerKind, SimilarityStrategy, TokenOverlapScorer};
pub use self::tokens::content_tokens;

use super::ranking::BulletCandidate;
use super::segments::SegmentStore;

/// Scores closer than this are treated as equal so the earlier segment wins.
const SCORE_EPSILON: f64 = 1e-9;

/// A bullet anchored to a moment in the recording.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchedBullet {
    pub text: String,
    pub timestamp_seconds: f64,
    /// Index into the job's segment store; `None` for fallback placements.
    pub segment_index: Option<usize>,
    pub match_score: f64,
}

impl MatchedBullet {
    pub fn is_fallback(&self) -> bool {
        self.segment_index.is_none()
    }
}

/// Where an unmatched bullet is placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FallbackPolicy {
    /// `duration * (i + 1) / (n + 1)` for the i-th of n candidates.
    #[default]
    EvenlySpaced,
    /// `i * interval` seconds.
    FixedInterval,
}

#[derive(Debug, Clone, Copy)]
pub struct MatcherSettings {
    pub min_similarity: f64,
    pub fallback: FallbackPolicy,
    pub fallback_interval_seconds: f64,
}

impl Default for MatcherSettings {
    fn default() -> Self {
        Self {
            min_similarity: 0.2,
            fallback: FallbackPolicy::EvenlySpaced,
            fallback_interval_seconds: 30.0,
        }
    }
}

/// Position of a candidate within its batch, used for fallback placement.
#[derive(Debug, Clone, Copy)]
pub struct FallbackSlot {
    pub position: usize,
    pub total: usize,
    pub video_duration: f64,
}

impl FallbackSlot {
    fn timestamp(self, settings: &MatcherSettings) -> f64 {
        let raw = match settings.fallback {
            FallbackPolicy::EvenlySpaced => {
                self.video_duration * (self.position + 1) as f64 / (self.total + 1) as f64
            }
            FallbackPolicy::FixedInterval => {
                self.position as f64 * settings.fallback_interval_seconds
            }
        };
        if raw.is_finite() { raw.max(0.0) } else { 0.0 }
    }
}

pub struct SegmentMatcher<'a> {
    scorer: &'a dyn SimilarityStrategy,
    settings: MatcherSettings,
}

impl<'a> SegmentMatcher<'a> {
    pub fn new(scorer: &'a dyn SimilarityStrategy, settings: MatcherSettings) -> Self {
        Self { scorer, settings }
    }

    /// Best segment at or above the similarity floor. Earliest segment wins ties.
    pub fn best_match(
        &self,
        candidate: &BulletCandidate,
        store: &SegmentStore,
    ) -> Option<MatchedBullet> {
        let mut best: Option<(usize, f64)> = None;
        for (index, segment) in store.iter().enumerate() {
            let score = self.scorer.score(&candidate.text, &segment.text);
            if !score.is_finite() || score < self.settings.min_similarity {
                continue;
            }
            match best {
                Some((_, best_score)) if score <= best_score + SCORE_EPSILON => {}
                _ => best = Some((index, score)),
            }
        }

        let (index, score) = best?;
        let segment = store.get(index)?;
        Some(MatchedBullet {
            text: candidate.text.clone(),
            timestamp_seconds: segment.start_time,
            segment_index: Some(index),
            match_score: score,
        })
    }

    /// Anchor a candidate, falling back to a deterministic placeholder time.
    pub fn match_candidate(
        &self,
        candidate: &BulletCandidate,
        store: &SegmentStore,
        slot: FallbackSlot,
    ) -> MatchedBullet {
        self.best_match(candidate, store)
            .unwrap_or_else(|| MatchedBullet {
                text: candidate.text.clone(),
                timestamp_seconds: slot.timestamp(&self.settings),
                segment_index: None,
                match_score: 0.0,
            })
    }

    pub fn match_all(
        &self,
        candidates: &[BulletCandidate],
        store: &SegmentStore,
        video_duration: f64,
    ) -> Vec<MatchedBullet> {
        candidates
            .iter()
            .enumerate()
            .map(|(position, candidate)| {
                let slot = FallbackSlot {
                    position,
                    total: candidates.len(),
                    video_duration,
                };
                self.match_candidate(candidate, store, slot)
            })
            .collect()
    }
}
