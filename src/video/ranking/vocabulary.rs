use crate::video::matching::content_tokens;

const DECISION_TERMS: &[&str] = &[
    "action",
    "agree",
    "approv",
    "conclu",
    "decid",
    "decision",
    "deliver",
    "finding",
    "goal",
    "improv",
    "increas",
    "key",
    "launch",
    "must",
    "next step",
    "outcome",
    "plan",
    "priorit",
    "propos",
    "recommend",
    "reduc",
    "result",
    "risk",
    "should",
    "show",
    "takeaway",
];

const FILLER_PHRASES: &[&str] = &[
    "bear with me",
    "can everyone hear",
    "can everyone see",
    "can you hear me",
    "can you see my",
    "hit record",
    "is this working",
    "let me share",
    "one second",
    "share my screen",
    "sharing my screen",
    "start the recording",
    "started recording",
    "stop the recording",
    "this recording",
    "you're on mute",
];

/// Read-only word lists used for salience scoring.
///
/// Built once and shared between jobs behind an `Arc`.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    decision_stems: Vec<Vec<String>>,
    filler_phrases: Vec<String>,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::with_extras(&[], &[])
    }
}

impl Vocabulary {
    pub fn with_extras(extra_keywords: &[String], extra_fillers: &[String]) -> Self {
        let decision_stems = DECISION_TERMS
            .iter()
            .copied()
            .chain(extra_keywords.iter().map(String::as_str))
            .map(Self::term_stems)
            .filter(|stems| !stems.is_empty())
            .collect();
        let filler_phrases = FILLER_PHRASES
            .iter()
            .map(|p| p.to_string())
            .chain(extra_fillers.iter().map(|p| normalize_phrase(p)))
            .filter(|p| !p.is_empty())
            .collect();
        Self {
            decision_stems,
            filler_phrases,
        }
    }

    fn term_stems(term: &str) -> Vec<String> {
        // Built-in entries are already stem prefixes; only normalise case and spacing.
        term.split_whitespace().map(|w| w.to_lowercase()).collect()
    }

    /// Number of decision/outcome terms found among the text's content tokens.
    pub fn decision_hits(&self, tokens: &[String]) -> usize {
        self.decision_stems
            .iter()
            .filter(|stems| contains_prefix_run(tokens, stems))
            .count()
    }

    pub fn is_decision_token(&self, token: &str) -> bool {
        self.decision_stems
            .iter()
            .any(|stems| stems.len() == 1 && token.starts_with(stems[0].as_str()))
    }

    pub fn is_filler(&self, text: &str) -> bool {
        let lowered = normalize_phrase(text);
        self.filler_phrases
            .iter()
            .any(|phrase| lowered.contains(phrase.as_str()))
    }
}

/// Lowercase with typographic apostrophes folded to ASCII.
fn normalize_phrase(text: &str) -> String {
    text.trim().to_lowercase().replace('’', "'")
}

fn contains_prefix_run(tokens: &[String], stems: &[String]) -> bool {
    if stems.is_empty() || tokens.len() < stems.len() {
        return false;
    }
    tokens.windows(stems.len()).any(|window| {
        window
            .iter()
            .zip(stems)
            .all(|(token, stem)| token.starts_with(stem.as_str()))
    })
}

/// Tokens used for ranking; identical normalisation to the matcher.
pub fn ranking_tokens(text: &str) -> Vec<String> {
    content_tokens(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_decision_terms_by_prefix() {
        let vocab = Vocabulary::default();
        let tokens = ranking_tokens("Our key recommendation is to reduce churn");
        // key, recommend(ation), reduc(e)
        assert_eq!(vocab.decision_hits(&tokens), 3);
    }

    #[test]
    fn multi_word_terms_need_adjacent_tokens() {
        let vocab = Vocabulary::default();
        assert_eq!(vocab.decision_hits(&ranking_tokens("the next step")), 1);
        assert_eq!(vocab.decision_hits(&ranking_tokens("next quarter step back")), 0);
    }

    #[test]
    fn detects_meta_commentary() {
        let vocab = Vocabulary::default();
        assert!(vocab.is_filler("Can you hear me? Let me share my screen"));
        assert!(vocab.is_filler("You’re on mute"));
        assert!(!vocab.is_filler("Revenue grew twelve percent"));
    }

    #[test]
    fn extras_extend_the_lists() {
        let vocab = Vocabulary::with_extras(&["Churn".to_string()], &["  Coffee Break ".to_string()]);
        assert_eq!(vocab.decision_hits(&ranking_tokens("churn is falling")), 1);
        assert!(vocab.is_filler("quick coffee break everyone"));
    }

    #[test]
    fn extra_fillers_fold_typographic_apostrophes() {
        let vocab = Vocabulary::with_extras(&[], &["We’ll Circle Back".to_string()]);
        assert!(vocab.is_filler("OK, we'll circle back later"));
        assert!(vocab.is_filler("OK, we’ll circle back later"));
    }
}
