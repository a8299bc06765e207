use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::json;

use crate::ui::prelude::{Level, emit, log_event};

use super::cli::{RankArgs, TimelineArgs};
use super::config::RecapConfig;
use super::errors::PipelineError;
use super::matching::MatchedBullet;
use super::pipeline::{JobContext, JobInput, emit_report, format_report_lines};
use super::ranking::ScoredSegment;
use super::segments::SegmentStore;
use super::support::candidates::load_candidates;
use super::support::transcript::load_segments;
use super::timeline::{DroppedBullet, Timeline, TimelineEntry};

pub fn handle_rank(args: RankArgs, config: RecapConfig) -> Result<()> {
    let config = config.with_max_bullets(args.max_bullets);
    let store = SegmentStore::new(load_segments(&args.transcript)?)?;
    log_event(
        Level::Debug,
        "recap.segments.loaded",
        format!("Loaded {} transcript segments", store.len()),
    );

    let context = JobContext::from_config(config);
    let ranked = context.ranker().top_segments(&store);
    if ranked.is_empty() {
        return Err(PipelineError::NoCandidates.into());
    }

    if args.json {
        let out = serde_json::to_string_pretty(&ranked).context("serializing ranked segments")?;
        println!("{out}");
        return Ok(());
    }

    for line in format_ranked_lines(&ranked) {
        log_event(Level::Info, "recap.rank.candidate", line);
    }
    Ok(())
}

#[derive(Serialize)]
struct TimelineOutput<'a> {
    video_duration: f64,
    entries: &'a [TimelineEntry],
    dropped: &'a [DroppedBullet],
    unmatched: Vec<&'a MatchedBullet>,
    notes: Vec<String>,
}

pub fn handle_timeline(args: TimelineArgs, config: RecapConfig) -> Result<()> {
    let config = config.with_max_bullets(args.max_bullets);
    let segments = load_segments(&args.transcript)?;
    let candidates = args
        .bullets
        .as_deref()
        .map(load_candidates)
        .transpose()?;

    let context = JobContext::from_config(config);
    let report = context.run(JobInput {
        segments,
        candidates,
        video_duration: args.video_duration,
    })?;
    emit_report(&report.lines);

    if args.json {
        let output = TimelineOutput {
            video_duration: report.video_duration,
            entries: &report.timeline.entries,
            dropped: &report.timeline.dropped,
            unmatched: report.unmatched().collect(),
            notes: format_report_lines(&report.lines),
        };
        let out = serde_json::to_string_pretty(&output).context("serializing timeline")?;
        println!("{out}");
        return Ok(());
    }

    for line in format_timeline_lines(&report.timeline) {
        log_event(Level::Info, "recap.timeline.entry", line);
    }
    emit(
        Level::Success,
        "recap.timeline.done",
        &format!(
            "{} bullet(s) scheduled over {}",
            report.timeline.len(),
            format_clock(report.video_duration)
        ),
        Some(json!({
            "bullets": report.timeline.len(),
            "unmatched": report.unmatched().count(),
            "dropped": report.timeline.dropped.len(),
        })),
    );
    Ok(())
}

/// `MM:SS.s`, or `H:MM:SS.s` past the hour.
fn format_clock(seconds: f64) -> String {
    let tenths = (seconds.max(0.0) * 10.0).round() as u64;
    let (hours, rest) = (tenths / 36_000, tenths % 36_000);
    let (minutes, rest) = (rest / 600, rest % 600);
    let (secs, tenth) = (rest / 10, rest % 10);
    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}.{tenth}")
    } else {
        format!("{minutes:02}:{secs:02}.{tenth}")
    }
}

fn format_timeline_lines(timeline: &Timeline) -> Vec<String> {
    timeline
        .iter()
        .map(|entry| {
            format!(
                "{:>2}. {} - {}  {}",
                entry.slide_index + 1,
                format_clock(entry.start_time),
                format_clock(entry.end_time()),
                entry.text
            )
        })
        .collect()
}

fn format_ranked_lines(ranked: &[ScoredSegment]) -> Vec<String> {
    ranked
        .iter()
        .map(|scored| {
            format!(
                "{:>5.2}  {}  {}",
                scored.score,
                format_clock(scored.start_time),
                scored.text.trim()
            )
        })
        .collect()
}
