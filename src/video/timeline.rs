use std::collections::HashMap;

use serde::Serialize;

use super::errors::PipelineError;
use super::matching::MatchedBullet;

/// Start times closer than this are treated as the same instant.
const TIME_EPSILON: f64 = 1e-6;

/// One scheduled overlay.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineEntry {
    pub slide_index: usize,
    pub start_time: f64,
    pub duration: f64,
    pub text: String,
}

impl TimelineEntry {
    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration
    }
}

/// Entries discarded while building, kept for reporting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DroppedBullet {
    pub text: String,
    pub timestamp_seconds: f64,
    pub reason: DropReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DropReason {
    DuplicateSegment,
    SameStartTime,
    InvalidTimestamp,
    PastVideoEnd,
    OverLimit,
}

/// Ordered, non-overlapping overlay schedule.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Timeline {
    pub entries: Vec<TimelineEntry>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dropped: Vec<DroppedBullet>,
}

impl Timeline {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TimelineEntry> {
        self.entries.iter()
    }

    /// End of the last overlay.
    pub fn end_time(&self) -> f64 {
        self.entries.last().map(TimelineEntry::end_time).unwrap_or(0.0)
    }

    /// Check the ordering and overlap invariants.
    pub fn validate(&self, allow_overlap: bool) -> Result<(), PipelineError> {
        for (position, entry) in self.entries.iter().enumerate() {
            if entry.slide_index != position {
                return Err(PipelineError::InvalidTimeline(format!(
                    "entry {position} has slide index {}",
                    entry.slide_index
                )));
            }
            if !entry.start_time.is_finite() || entry.start_time < 0.0 {
                return Err(PipelineError::InvalidTimeline(format!(
                    "entry {position} starts at {}",
                    entry.start_time
                )));
            }
            if !entry.duration.is_finite() || entry.duration <= 0.0 {
                return Err(PipelineError::InvalidTimeline(format!(
                    "entry {position} has duration {}",
                    entry.duration
                )));
            }
            if let Some(next) = self.entries.get(position + 1) {
                if next.start_time <= entry.start_time {
                    return Err(PipelineError::InvalidTimeline(format!(
                        "entry {} does not start after entry {position}",
                        position + 1
                    )));
                }
                if !allow_overlap && entry.end_time() > next.start_time + TIME_EPSILON {
                    return Err(PipelineError::InvalidTimeline(format!(
                        "entry {position} overlaps entry {}",
                        position + 1
                    )));
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TimelineSettings {
    pub max_bullets: usize,
    pub default_display_seconds: f64,
    pub allow_overlap: bool,
}

impl Default for TimelineSettings {
    fn default() -> Self {
        Self {
            max_bullets: 5,
            default_display_seconds: 15.0,
            allow_overlap: false,
        }
    }
}

pub struct TimelineBuilder {
    settings: TimelineSettings,
}

impl TimelineBuilder {
    pub fn new(settings: TimelineSettings) -> Self {
        Self { settings }
    }

    /// Order, deduplicate and time a set of matched bullets.
    ///
    /// `video_duration` bounds the last entry; bullets at or past it are dropped.
    pub fn build(&self, matched: &[MatchedBullet], video_duration: f64) -> Timeline {
        let mut dropped = Vec::new();

        // One bullet per segment, keeping the strongest match.
        let mut best_for_segment: HashMap<usize, usize> = HashMap::new();
        for (position, bullet) in matched.iter().enumerate() {
            let Some(segment) = bullet.segment_index else {
                continue;
            };
            match best_for_segment.get(&segment) {
                Some(&current) if matched[current].match_score >= bullet.match_score => {}
                _ => {
                    best_for_segment.insert(segment, position);
                }
            }
        }

        let mut kept: Vec<&MatchedBullet> = Vec::with_capacity(matched.len());
        for (position, bullet) in matched.iter().enumerate() {
            let is_best = match bullet.segment_index {
                Some(segment) => best_for_segment.get(&segment) == Some(&position),
                None => true,
            };
            if is_best {
                kept.push(bullet);
            } else {
                dropped.push(Self::dropped(bullet, DropReason::DuplicateSegment));
            }
        }

        // Chronological order is authoritative; stronger match first on equal times.
        kept.sort_by(|a, b| {
            a.timestamp_seconds
                .total_cmp(&b.timestamp_seconds)
                .then_with(|| b.match_score.total_cmp(&a.match_score))
        });

        let mut ordered: Vec<&MatchedBullet> = Vec::with_capacity(kept.len());
        for bullet in kept {
            if !bullet.timestamp_seconds.is_finite() || bullet.timestamp_seconds < 0.0 {
                dropped.push(Self::dropped(bullet, DropReason::InvalidTimestamp));
                continue;
            }
            if bullet.timestamp_seconds >= video_duration {
                dropped.push(Self::dropped(bullet, DropReason::PastVideoEnd));
                continue;
            }
            if let Some(previous) = ordered.last()
                && bullet.timestamp_seconds - previous.timestamp_seconds < TIME_EPSILON
            {
                dropped.push(Self::dropped(bullet, DropReason::SameStartTime));
                continue;
            }
            ordered.push(bullet);
        }

        let limit = self.settings.max_bullets;
        if ordered.len() > limit {
            for bullet in ordered.drain(limit..) {
                dropped.push(Self::dropped(bullet, DropReason::OverLimit));
            }
        }

        let default_span = self.settings.default_display_seconds.max(TIME_EPSILON);
        let entries = ordered
            .iter()
            .enumerate()
            .map(|(slide_index, bullet)| {
                let start_time = bullet.timestamp_seconds;
                let mut duration = default_span.min(video_duration - start_time);
                if !self.settings.allow_overlap
                    && let Some(next) = ordered.get(slide_index + 1)
                {
                    duration = duration.min(next.timestamp_seconds - start_time);
                }
                TimelineEntry {
                    slide_index,
                    start_time,
                    duration,
                    text: bullet.text.clone(),
                }
            })
            .collect();

        Timeline { entries, dropped }
    }

    fn dropped(bullet: &MatchedBullet, reason: DropReason) -> DroppedBullet {
        DroppedBullet {
            text: bullet.text.clone(),
            timestamp_seconds: bullet.timestamp_seconds,
            reason,
        }
    }
}
