mod overlays;
mod panes;
mod util;

#[cfg(test)]
mod tests;

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::video::support::ffmpeg::PROFILE_H264_AAC_FASTSTART;
use crate::video::timeline::TimelineEntry;

use self::util::escape_ffmpeg_path;

const SPEAKER_LABEL: &str = "speaker";
const SLIDE_BASE_LABEL: &str = "slide_base";
const OUTPUT_LABEL: &str = "outv";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompositionSpecError {
    #[error("Video dimensions must be positive, got {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("Pane size must be positive, got {width}x{height}")]
    InvalidPaneSize { width: u32, height: u32 },

    #[error("Timeline is empty; nothing to overlay")]
    EmptyTimeline,

    #[error("Source video path is not set")]
    MissingSourceVideo,

    #[error("Output path is not set")]
    MissingOutputPath,

    #[error("Output path {0} would overwrite the source video")]
    OutputOverwritesSource(PathBuf),

    #[error("Crop region {crop} does not fit inside a {width}x{height} frame")]
    CropOutOfBounds {
        crop: CropRegion,
        width: u32,
        height: u32,
    },

    #[error("Timeline entry {index} is invalid: {reason}")]
    InvalidTimeline { index: usize, reason: String },
}

/// How the speaker and slide panes are stacked.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum Layout {
    /// Speaker on the left, bullets on the right
    #[default]
    Horizontal,
    /// Speaker on top, bullets below
    Vertical,
}

impl Layout {
    fn stack_filter(self) -> &'static str {
        match self {
            Layout::Horizontal => "hstack",
            Layout::Vertical => "vstack",
        }
    }
}

/// Pixel rectangle of the source frame to keep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRegion {
    fn fits_within(&self, width: u32, height: u32) -> bool {
        self.width > 0
            && self.height > 0
            && u64::from(self.x) + u64::from(self.width) <= u64::from(width)
            && u64::from(self.y) + u64::from(self.height) <= u64::from(height)
    }
}

impl fmt::Display for CropRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}+{}+{}", self.width, self.height, self.x, self.y)
    }
}

impl FromStr for CropRegion {
    type Err = String;

    /// Parses `WIDTHxHEIGHT+X+Y`, e.g. `1280x720+320+0`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || format!("invalid crop '{s}', expected WIDTHxHEIGHT+X+Y");
        let (size, offset) = s.trim().split_once('+').ok_or_else(invalid)?;
        let (width, height) = size.split_once('x').ok_or_else(invalid)?;
        let (x, y) = offset.split_once('+').ok_or_else(invalid)?;
        let parse = |v: &str| v.trim().parse::<u32>().map_err(|_| invalid());
        Ok(Self {
            x: parse(x)?,
            y: parse(y)?,
            width: parse(width)?,
            height: parse(height)?,
        })
    }
}

/// Look of the two panes and the bullet text.
#[derive(Debug, Clone, PartialEq)]
pub struct PaneStyle {
    pub pane_width: u32,
    pub pane_height: u32,
    pub background_color: String,
    pub font_size: u32,
    pub font_color: String,
    pub box_color: String,
    pub font_file: Option<PathBuf>,
    pub wrap_width: usize,
    pub box_padding: u32,
}

impl Default for PaneStyle {
    fn default() -> Self {
        Self {
            pane_width: 960,
            pane_height: 1080,
            background_color: "0x1E1E2E".to_string(),
            font_size: 44,
            font_color: "0xCDD6F4".to_string(),
            box_color: "0x313244@0.85".to_string(),
            font_file: None,
            wrap_width: 28,
            box_padding: 24,
        }
    }
}

/// Everything needed to emit one composition command.
#[derive(Debug, Clone)]
pub struct CompositionSpec {
    pub video_width: u32,
    pub video_height: u32,
    pub crop_region: Option<CropRegion>,
    pub timeline: Vec<TimelineEntry>,
    pub source_video_path: PathBuf,
    pub output_path: PathBuf,
    pub slide_image: Option<PathBuf>,
    pub layout: Layout,
    pub style: PaneStyle,
}

impl CompositionSpec {
    pub fn validate(&self) -> Result<(), CompositionSpecError> {
        if self.video_width == 0 || self.video_height == 0 {
            return Err(CompositionSpecError::InvalidDimensions {
                width: self.video_width,
                height: self.video_height,
            });
        }
        if self.style.pane_width == 0 || self.style.pane_height == 0 {
            return Err(CompositionSpecError::InvalidPaneSize {
                width: self.style.pane_width,
                height: self.style.pane_height,
            });
        }
        if self.timeline.is_empty() {
            return Err(CompositionSpecError::EmptyTimeline);
        }
        if self.source_video_path.as_os_str().is_empty() {
            return Err(CompositionSpecError::MissingSourceVideo);
        }
        if self.output_path.as_os_str().is_empty() {
            return Err(CompositionSpecError::MissingOutputPath);
        }
        if self.output_path == self.source_video_path {
            return Err(CompositionSpecError::OutputOverwritesSource(
                self.output_path.clone(),
            ));
        }
        if let Some(crop) = self.crop_region
            && !crop.fits_within(self.video_width, self.video_height)
        {
            return Err(CompositionSpecError::CropOutOfBounds {
                crop,
                width: self.video_width,
                height: self.video_height,
            });
        }

        let mut previous_start: Option<f64> = None;
        for (index, entry) in self.timeline.iter().enumerate() {
            let invalid = |reason: String| CompositionSpecError::InvalidTimeline { index, reason };
            if !entry.start_time.is_finite() || entry.start_time < 0.0 {
                return Err(invalid(format!("start time {}", entry.start_time)));
            }
            if !entry.duration.is_finite() || entry.duration <= 0.0 {
                return Err(invalid(format!("duration {}", entry.duration)));
            }
            if let Some(previous) = previous_start
                && entry.start_time <= previous
            {
                return Err(invalid(format!(
                    "start time {} does not follow {previous}",
                    entry.start_time
                )));
            }
            previous_start = Some(entry.start_time);
        }
        Ok(())
    }
}

/// A fully resolved external invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositionCommand {
    pub program: String,
    pub args: Vec<String>,
    pub output_path: PathBuf,
}

impl CompositionCommand {
    /// Program followed by its arguments.
    pub fn to_tokens(&self) -> Vec<String> {
        std::iter::once(self.program.clone())
            .chain(self.args.iter().cloned())
            .collect()
    }

    /// Shell-quoted form for display and copy-paste.
    pub fn to_shell_string(&self) -> String {
        shell_words::join(self.to_tokens())
    }

    pub fn filter_graph(&self) -> Option<&str> {
        self.args
            .iter()
            .position(|arg| arg == "-filter_complex")
            .and_then(|idx| self.args.get(idx + 1))
            .map(String::as_str)
    }
}

#[derive(Debug, Clone, Default)]
pub struct FilterChain {
    filters: Vec<String>,
}

impl FilterChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, filter: String) {
        self.filters.push(filter);
    }

    pub fn join(&self) -> String {
        self.filters.join("; ")
    }
}

/// Turns a `CompositionSpec` into an ffmpeg argument list. Performs no I/O.
pub struct CompositionCompiler {
    program: String,
}

impl Default for CompositionCompiler {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl CompositionCompiler {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn compile(&self, spec: &CompositionSpec) -> Result<CompositionCommand, CompositionSpecError> {
        spec.validate()?;

        let mut args = vec![
            "-hide_banner".to_string(),
            "-y".to_string(),
            "-i".to_string(),
            spec.source_video_path.to_string_lossy().into_owned(),
        ];
        if let Some(slide) = &spec.slide_image {
            args.extend([
                "-loop".to_string(),
                "1".to_string(),
                "-i".to_string(),
                slide.to_string_lossy().into_owned(),
            ]);
        }

        let mut chain = FilterChain::new();
        chain.push(self.build_speaker_pane(spec, SPEAKER_LABEL));
        chain.push(self.build_slide_pane(spec, SLIDE_BASE_LABEL));
        let slide_label = self.build_bullet_overlays(&mut chain, spec, SLIDE_BASE_LABEL);
        chain.push(format!(
            "[{speaker}][{slide}]{stack}=inputs=2:shortest=1[{out}]",
            speaker = SPEAKER_LABEL,
            slide = slide_label,
            stack = spec.layout.stack_filter(),
            out = OUTPUT_LABEL,
        ));

        args.push("-filter_complex".to_string());
        args.push(chain.join());

        args.push("-map".to_string());
        args.push(format!("[{OUTPUT_LABEL}]"));
        args.push("-map".to_string());
        args.push("0:a?".to_string());

        PROFILE_H264_AAC_FASTSTART.push_to(&mut args);
        args.push(spec.output_path.to_string_lossy().into_owned());

        Ok(CompositionCommand {
            program: self.program.clone(),
            args,
            output_path: spec.output_path.clone(),
        })
    }

    fn font_option(&self, spec: &CompositionSpec) -> Option<String> {
        spec.style
            .font_file
            .as_ref()
            .map(|font| format!("fontfile={}", escape_ffmpeg_path(font)))
    }
}
