use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::tokens::{content_tokens, normalized_text};

/// Scores how well a bullet's text matches a transcript segment's text.
///
/// Implementations must be deterministic and return a value in `[0, 1]`.
pub trait SimilarityStrategy: Send + Sync {
    fn score(&self, candidate: &str, segment: &str) -> f64;

    fn name(&self) -> &'static str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ScorerKind {
    #[default]
    TokenOverlap,
    JaroWinkler,
}

impl ScorerKind {
    pub fn build(self) -> Box<dyn SimilarityStrategy> {
        match self {
            ScorerKind::TokenOverlap => Box::new(TokenOverlapScorer::default()),
            ScorerKind::JaroWinkler => Box::new(JaroWinklerScorer),
        }
    }
}

/// Jaccard overlap of content tokens plus a bonus for a contiguous run of the
/// candidate's tokens appearing verbatim in the segment.
#[derive(Debug, Clone, Copy)]
pub struct TokenOverlapScorer {
    pub containment_weight: f64,
    pub min_run: usize,
}

impl Default for TokenOverlapScorer {
    fn default() -> Self {
        Self {
            containment_weight: 0.5,
            min_run: 2,
        }
    }
}

impl TokenOverlapScorer {
    fn jaccard(a: &[String], b: &[String]) -> f64 {
        let a: HashSet<&str> = a.iter().map(String::as_str).collect();
        let b: HashSet<&str> = b.iter().map(String::as_str).collect();
        let union = a.union(&b).count();
        if union == 0 {
            return 0.0;
        }
        a.intersection(&b).count() as f64 / union as f64
    }

    /// Fraction of the candidate covered by its longest run found contiguously in the segment.
    fn containment(&self, candidate: &[String], segment: &[String]) -> f64 {
        if candidate.is_empty() || segment.is_empty() {
            return 0.0;
        }
        let longest = longest_common_run(candidate, segment);
        if longest < self.min_run.max(1) && candidate.len() > 1 {
            return 0.0;
        }
        longest as f64 / candidate.len() as f64
    }
}

impl SimilarityStrategy for TokenOverlapScorer {
    fn score(&self, candidate: &str, segment: &str) -> f64 {
        let candidate = content_tokens(candidate);
        let segment = content_tokens(segment);
        let jaccard = Self::jaccard(&candidate, &segment);
        let containment = self.containment(&candidate, &segment);
        ((jaccard + self.containment_weight * containment) / (1.0 + self.containment_weight))
            .clamp(0.0, 1.0)
    }

    fn name(&self) -> &'static str {
        "token-overlap"
    }
}

fn longest_common_run(a: &[String], b: &[String]) -> usize {
    // Classic longest-common-substring table, one row at a time.
    let mut previous = vec![0usize; b.len() + 1];
    let mut current = vec![0usize; b.len() + 1];
    let mut best = 0;
    for token in a {
        for (j, other) in b.iter().enumerate() {
            current[j + 1] = if token == other { previous[j] + 1 } else { 0 };
            best = best.max(current[j + 1]);
        }
        std::mem::swap(&mut previous, &mut current);
    }
    best
}

/// Character-level Jaro-Winkler over the normalised texts.
#[derive(Debug, Clone, Copy, Default)]
pub struct JaroWinklerScorer;

impl SimilarityStrategy for JaroWinklerScorer {
    fn score(&self, candidate: &str, segment: &str) -> f64 {
        let candidate = normalized_text(candidate);
        let segment = normalized_text(segment);
        if candidate.is_empty() || segment.is_empty() {
            return 0.0;
        }
        strsim::jaro_winkler(&candidate, &segment)
    }

    fn name(&self) -> &'static str {
        "jaro-winkler"
    }
}
