use thiserror::Error;

/// Fatal conditions raised while turning a transcript into a timeline.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error(
        "Invalid transcript segment #{index}: end time {end_time} must be greater than start time {start_time}"
    )]
    InvalidSegment {
        index: usize,
        start_time: f64,
        end_time: f64,
    },

    #[error("Invalid transcript segment #{index}: {reason}")]
    MalformedSegment { index: usize, reason: String },

    #[error("No usable bullet candidates were produced")]
    NoCandidates,

    #[error("Timeline invariant violated: {0}")]
    InvalidTimeline(String),
}
