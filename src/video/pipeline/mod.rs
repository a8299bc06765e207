mod report;

use std::sync::Arc;

use serde_json::json;

use crate::ui::Level;

use super::config::RecapConfig;
use super::errors::PipelineError;
use super::matching::{MatchedBullet, SegmentMatcher, SimilarityStrategy};
use super::ranking::{BulletCandidate, ImportanceRanker, Vocabulary};
use super::segments::{SegmentStore, TranscriptSegment};
use super::timeline::{DropReason, Timeline, TimelineBuilder};

pub use self::report::{ReportLine, emit_report, format_report_lines};

/// Inputs for one job, as delivered by the transcription and summarization collaborators.
#[derive(Debug, Clone, Default)]
pub struct JobInput {
    pub segments: Vec<TranscriptSegment>,
    /// Externally ranked bullets; the built-in ranker is used when `None`.
    pub candidates: Option<Vec<BulletCandidate>>,
    /// Length of the source video; falls back to the end of the last segment.
    pub video_duration: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateSource {
    Ranked,
    External,
}

#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub store: SegmentStore,
    pub candidate_source: CandidateSource,
    pub candidates: Vec<BulletCandidate>,
    pub matches: Vec<MatchedBullet>,
    pub timeline: Timeline,
    pub video_duration: f64,
    pub lines: Vec<ReportLine>,
}

impl PipelineReport {
    /// Bullets that fell back to a placeholder time.
    pub fn unmatched(&self) -> impl Iterator<Item = &MatchedBullet> {
        self.matches.iter().filter(|m| m.is_fallback())
    }
}

/// Everything one job needs. Built per job; only the vocabulary is shared.
pub struct JobContext {
    config: RecapConfig,
    vocabulary: Arc<Vocabulary>,
    scorer: Box<dyn SimilarityStrategy>,
}

impl JobContext {
    pub fn new(config: RecapConfig, vocabulary: Arc<Vocabulary>) -> Self {
        let scorer = config.matching.strategy.build();
        Self {
            config,
            vocabulary,
            scorer,
        }
    }

    /// Context with a vocabulary built from the config's extra word lists.
    pub fn from_config(config: RecapConfig) -> Self {
        let vocabulary = Arc::new(Vocabulary::with_extras(
            &config.ranking.extra_keywords,
            &config.ranking.extra_fillers,
        ));
        Self::new(config, vocabulary)
    }

    pub fn with_scorer(mut self, scorer: Box<dyn SimilarityStrategy>) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn config(&self) -> &RecapConfig {
        &self.config
    }

    pub fn ranker(&self) -> ImportanceRanker<'_> {
        ImportanceRanker::new(&self.vocabulary, self.config.ranker_settings())
    }

    /// Segments -> candidates -> matches -> timeline.
    pub fn run(&self, input: JobInput) -> Result<PipelineReport, PipelineError> {
        let mut lines = Vec::new();

        let store = SegmentStore::new(input.segments)?;
        lines.push(ReportLine::new(
            Level::Debug,
            "recap.segments.loaded",
            format!("Loaded {} transcript segments", store.len()),
        ));

        let video_duration = input
            .video_duration
            .filter(|d| d.is_finite() && *d > 0.0)
            .unwrap_or_else(|| store.total_end());

        let ranker = self.ranker();
        let (candidate_source, candidates) = match input.candidates {
            Some(external) => {
                let accepted = ranker.accept_external(external)?;
                if accepted.dropped_blank > 0 {
                    lines.push(ReportLine::new(
                        Level::Debug,
                        "recap.rank.blank",
                        format!("Ignored {} blank bullet(s)", accepted.dropped_blank),
                    ));
                }
                if accepted.truncated > 0 {
                    lines.push(ReportLine::new(
                        Level::Warn,
                        "recap.rank.truncated",
                        format!(
                            "Received {} more bullet(s) than the maximum of {}; extra bullets were ignored",
                            accepted.truncated,
                            self.config.ranking.max_bullets
                        ),
                    ));
                }
                (CandidateSource::External, accepted.candidates)
            }
            None => (CandidateSource::Ranked, ranker.rank(&store)?),
        };
        lines.push(ReportLine::new(
            Level::Debug,
            "recap.rank.selected",
            format!("{} bullet candidate(s) selected", candidates.len()),
        ));

        lines.push(ReportLine::new(
            Level::Debug,
            "recap.match.strategy",
            format!("Matching bullets with the {} scorer", self.scorer.name()),
        ));
        let matcher = SegmentMatcher::new(self.scorer.as_ref(), self.config.matcher_settings());
        let matches = matcher.match_all(&candidates, &store, video_duration);
        for bullet in matches.iter().filter(|m| m.is_fallback()) {
            let spoken = store
                .at(bullet.timestamp_seconds)
                .map(|(_, segment)| segment.text.clone());
            lines.push(
                ReportLine::new(
                    Level::Warn,
                    "recap.match.unmatched",
                    format!(
                        "No transcript segment matched \"{}\"; placed at {:.1}s",
                        bullet.text, bullet.timestamp_seconds
                    ),
                )
                .with_data(json!({
                    "text": bullet.text,
                    "fallback_timestamp": bullet.timestamp_seconds,
                    "spoken_at_fallback": spoken,
                })),
            );
        }

        let settings = self.config.timeline_settings();
        let timeline = TimelineBuilder::new(settings).build(&matches, video_duration);
        for dropped in &timeline.dropped {
            let level = match dropped.reason {
                DropReason::DuplicateSegment | DropReason::SameStartTime => Level::Debug,
                DropReason::InvalidTimestamp | DropReason::PastVideoEnd | DropReason::OverLimit => {
                    Level::Warn
                }
            };
            lines.push(
                ReportLine::new(
                    level,
                    "recap.timeline.dropped",
                    format!(
                        "Dropped \"{}\" at {:.1}s ({:?})",
                        dropped.text, dropped.timestamp_seconds, dropped.reason
                    ),
                )
                .with_data(json!(dropped)),
            );
        }
        timeline.validate(settings.allow_overlap)?;
        for entry in timeline.iter() {
            let covered = store.in_range(entry.start_time, entry.end_time()).len();
            lines.push(ReportLine::new(
                Level::Debug,
                "recap.timeline.entry",
                format!(
                    "Bullet {} shown {:.1}s-{:.1}s over {covered} spoken segment(s)",
                    entry.slide_index + 1,
                    entry.start_time,
                    entry.end_time()
                ),
            ));
        }

        Ok(PipelineReport {
            store,
            candidate_source,
            candidates,
            matches,
            timeline,
            video_duration,
            lines,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::matching::JaroWinklerScorer;

    fn segments() -> Vec<TranscriptSegment> {
        vec![
            TranscriptSegment::new(73.0, 80.0, "Our key recommendation is to consolidate vendor contracts"),
            TranscriptSegment::new(5.0, 11.0, "Welcome everyone to the quarterly operations review"),
            TranscriptSegment::new(25.0, 32.0, "The data analysis shows onboarding time dropped 40 percent"),
            TranscriptSegment::new(40.0, 44.0, "Sorry, can you hear me, let me share my screen"),
        ]
    }

    fn external(texts: &[&str]) -> Option<Vec<BulletCandidate>> {
        Some(texts.iter().map(|t| BulletCandidate::new(*t)).collect())
    }

    #[test]
    fn scrambled_external_bullets_are_ordered_by_time() {
        let context = JobContext::from_config(RecapConfig::default());
        let report = context
            .run(JobInput {
                segments: segments(),
                candidates: external(&[
                    "Welcome to the quarterly operations review",
                    "Key recommendation: consolidate vendor contracts",
                    "Data analysis shows onboarding time dropped 40%",
                ]),
                video_duration: Some(120.0),
            })
            .unwrap();

        let starts: Vec<f64> = report.timeline.iter().map(|e| e.start_time).collect();
        assert_eq!(starts, vec![5.0, 25.0, 73.0]);
        assert_eq!(report.candidate_source, CandidateSource::External);
        assert_eq!(report.unmatched().count(), 0);
        // Last entry runs until the default span or the end of the video.
        assert_eq!(report.timeline.entries[2].duration, 15.0);
    }

    #[test]
    fn matched_timestamps_are_segment_starts() {
        let context = JobContext::from_config(RecapConfig::default());
        let report = context
            .run(JobInput {
                segments: segments(),
                candidates: None,
                video_duration: None,
            })
            .unwrap();

        assert_eq!(report.candidate_source, CandidateSource::Ranked);
        for matched in &report.matches {
            let index = matched.segment_index.expect("ranked bullets come from segments");
            assert_eq!(
                report.store.get(index).unwrap().start_time,
                matched.timestamp_seconds
            );
        }
        assert!(
            report
                .timeline
                .iter()
                .all(|e| !e.text.contains("share my screen"))
        );
        assert_eq!(report.video_duration, 80.0);
    }

    #[test]
    fn runs_are_idempotent() {
        let context = JobContext::from_config(RecapConfig::default());
        let input = JobInput {
            segments: segments(),
            candidates: None,
            video_duration: Some(90.0),
        };
        let first = context.run(input.clone()).unwrap();
        let second = context.run(input).unwrap();
        assert_eq!(first.timeline, second.timeline);
        assert_eq!(first.matches, second.matches);
    }

    #[test]
    fn unmatched_bullet_is_reported_not_raised() {
        let context = JobContext::from_config(RecapConfig::default());
        let report = context
            .run(JobInput {
                segments: segments(),
                candidates: external(&["Kubernetes autoscaling roadmap"]),
                video_duration: Some(100.0),
            })
            .unwrap();

        let unmatched: Vec<&MatchedBullet> = report.unmatched().collect();
        assert_eq!(unmatched.len(), 1);
        assert_eq!(unmatched[0].match_score, 0.0);
        assert_eq!(unmatched[0].timestamp_seconds, 50.0);
        assert!(report.lines.iter().any(|l| l.code == "recap.match.unmatched"));
        assert_eq!(report.timeline.len(), 1);
    }

    #[test]
    fn invalid_segment_aborts_before_matching() {
        let context = JobContext::from_config(RecapConfig::default());
        let mut bad = segments();
        bad.push(TranscriptSegment::new(50.0, 49.0, "backwards"));
        let err = context
            .run(JobInput {
                segments: bad,
                candidates: external(&["anything"]),
                video_duration: None,
            })
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidSegment { index: 4, .. }));
    }

    #[test]
    fn no_candidates_is_fatal() {
        let context = JobContext::from_config(RecapConfig::default());
        let err = context
            .run(JobInput {
                segments: segments(),
                candidates: external(&["", "   "]),
                video_duration: None,
            })
            .unwrap_err();
        assert_eq!(err, PipelineError::NoCandidates);
    }

    #[test]
    fn too_many_external_bullets_are_truncated_with_warning() {
        let mut config = RecapConfig::default();
        config.ranking.max_bullets = 1;
        let context = JobContext::from_config(config);
        let report = context
            .run(JobInput {
                segments: segments(),
                candidates: external(&[
                    "Key recommendation: consolidate vendor contracts",
                    "Welcome to the quarterly operations review",
                ]),
                video_duration: Some(120.0),
            })
            .unwrap();
        assert_eq!(report.candidates.len(), 1);
        assert_eq!(report.timeline.entries[0].start_time, 73.0);
        assert!(report.lines.iter().any(|l| l.code == "recap.rank.truncated"));
    }

    #[test]
    fn single_segment_timeline_is_clipped() {
        let context = JobContext::from_config(RecapConfig::default());
        let report = context
            .run(JobInput {
                segments: vec![TranscriptSegment::new(
                    3.0,
                    8.0,
                    "We decided to launch the beta in March",
                )],
                candidates: None,
                video_duration: Some(10.0),
            })
            .unwrap();
        assert_eq!(report.timeline.len(), 1);
        assert_eq!(report.timeline.entries[0].start_time, 3.0);
        assert_eq!(report.timeline.entries[0].duration, 7.0);
    }

    #[test]
    fn alternative_scorer_can_be_plugged_in() {
        let context = JobContext::from_config(RecapConfig::default())
            .with_scorer(Box::new(JaroWinklerScorer));
        let report = context
            .run(JobInput {
                segments: segments(),
                candidates: external(&["Welcome everyone to the quarterly operations review"]),
                video_duration: Some(120.0),
            })
            .unwrap();
        assert_eq!(report.timeline.entries[0].start_time, 5.0);
    }

    #[test]
    fn jobs_share_vocabulary_across_threads() {
        let vocabulary = Arc::new(Vocabulary::default());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let vocabulary = Arc::clone(&vocabulary);
                std::thread::spawn(move || {
                    let context = JobContext::new(RecapConfig::default(), vocabulary);
                    context
                        .run(JobInput {
                            segments: segments(),
                            candidates: None,
                            video_duration: Some(90.0),
                        })
                        .map(|report| report.timeline)
                })
            })
            .collect();

        let timelines: Vec<Timeline> = handles
            .into_iter()
            .map(|h| h.join().unwrap().unwrap())
            .collect();
        assert!(timelines.windows(2).all(|w| w[0] == w[1]));
    }
}
