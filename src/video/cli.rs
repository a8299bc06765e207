use clap::{Args, Subcommand, ValueHint};
use std::path::PathBuf;

use super::render::ffmpeg::compiler::{CropRegion, Layout};

#[derive(Subcommand, Debug, Clone)]
pub enum RecapCommands {
    /// Score transcript segments and print the strongest bullet candidates
    Rank(RankArgs),
    /// Build the bullet timeline for a transcript without rendering
    Timeline(TimelineArgs),
    /// Render the side-by-side recap video with ffmpeg
    Render(RenderArgs),
    /// Inspect or create the configuration file
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Args, Debug, Clone)]
pub struct RankArgs {
    /// Timestamped transcript (SRT, WhisperX JSON or segment JSON)
    #[arg(value_hint = ValueHint::FilePath)]
    pub transcript: PathBuf,

    /// Maximum number of bullets to keep
    #[arg(long)]
    pub max_bullets: Option<usize>,

    /// Print the scored candidates as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct TimelineArgs {
    /// Timestamped transcript (SRT, WhisperX JSON or segment JSON)
    #[arg(value_hint = ValueHint::FilePath)]
    pub transcript: PathBuf,

    /// Externally ranked bullets (JSON array or one bullet per line)
    #[arg(short = 'b', long = "bullets", value_hint = ValueHint::FilePath)]
    pub bullets: Option<PathBuf>,

    /// Maximum number of bullets to keep
    #[arg(long)]
    pub max_bullets: Option<usize>,

    /// Video length in seconds; defaults to the end of the transcript
    #[arg(long)]
    pub video_duration: Option<f64>,

    /// Print the timeline as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct RenderArgs {
    /// Source video file
    #[arg(value_hint = ValueHint::FilePath)]
    pub video: PathBuf,

    /// Timestamped transcript (SRT, WhisperX JSON or segment JSON)
    #[arg(short = 't', long = "transcript", value_hint = ValueHint::FilePath)]
    pub transcript: PathBuf,

    /// Output file; defaults to <videoname>_recap.mp4 next to the video
    #[arg(short = 'o', long = "out-file", value_hint = ValueHint::FilePath)]
    pub out_file: Option<PathBuf>,

    /// Externally ranked bullets (JSON array or one bullet per line)
    #[arg(short = 'b', long = "bullets", value_hint = ValueHint::FilePath)]
    pub bullets: Option<PathBuf>,

    /// Still image to use as the slide pane background
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub slide: Option<PathBuf>,

    /// Part of the source frame to keep, as WIDTHxHEIGHT+X+Y
    #[arg(long)]
    pub crop: Option<CropRegion>,

    /// Source width in pixels; probed with ffprobe when omitted
    #[arg(long, requires = "height")]
    pub width: Option<u32>,

    /// Source height in pixels; probed with ffprobe when omitted
    #[arg(long, requires = "width")]
    pub height: Option<u32>,

    /// Video length in seconds; probed with ffprobe when omitted
    #[arg(long)]
    pub video_duration: Option<f64>,

    /// Stack the panes side by side or on top of each other
    #[arg(long, value_enum)]
    pub layout: Option<Layout>,

    /// Maximum number of bullets to keep
    #[arg(long)]
    pub max_bullets: Option<usize>,

    /// Abort ffmpeg after this many seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Print the ffmpeg command instead of running it
    #[arg(long)]
    pub dry_run: bool,

    /// Overwrite an existing output file
    #[arg(long)]
    pub force: bool,

    /// Stream ffmpeg's own output
    #[arg(long)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommands {
    /// Print the effective configuration as TOML
    Show,
    /// Write the default configuration file
    Init {
        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },
}
