use anyhow::{Context, Result};
use std::path::Path;
use std::process::Command;

/// Encoder flags appended after the stream maps.
#[derive(Debug, Clone, Copy)]
pub struct EncodeProfile {
    pub video_codec: &'static str,
    pub preset: &'static str,
    pub crf: u8,
    pub pixel_format: &'static str,
    pub audio_codec: &'static str,
    pub audio_bitrate: &'static str,
    pub faststart: bool,
}

pub const PROFILE_H264_AAC_FASTSTART: EncodeProfile = EncodeProfile {
    video_codec: "libx264",
    preset: "medium",
    crf: 20,
    pixel_format: "yuv420p",
    audio_codec: "aac",
    audio_bitrate: "192k",
    faststart: true,
};

impl EncodeProfile {
    pub fn push_to(&self, args: &mut Vec<String>) {
        args.extend([
            "-c:v".to_string(),
            self.video_codec.to_string(),
            "-preset".to_string(),
            self.preset.to_string(),
            "-crf".to_string(),
            self.crf.to_string(),
            "-pix_fmt".to_string(),
            self.pixel_format.to_string(),
            "-c:a".to_string(),
            self.audio_codec.to_string(),
            "-b:a".to_string(),
            self.audio_bitrate.to_string(),
        ]);
        if self.faststart {
            args.push("-movflags".to_string());
            args.push("+faststart".to_string());
        }
    }
}

pub fn probe_duration_seconds(path: &Path) -> Result<f64> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(path)
        .output()
        .with_context(|| format!("Failed to run ffprobe for {}", path.display()))?;

    if !output.status.success() {
        anyhow::bail!(
            "ffprobe failed for {}: {}",
            path.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    parse_duration(&String::from_utf8_lossy(&output.stdout))
}

pub fn probe_video_dimensions(video_path: &Path) -> Result<(u32, u32)> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height",
            "-of",
            "csv=s=x:p=0",
        ])
        .arg(video_path)
        .output()
        .with_context(|| {
            format!(
                "Failed to probe video dimensions for {}",
                video_path.display()
            )
        })?;

    if !output.status.success() {
        anyhow::bail!(
            "ffprobe exited with status {:?} while probing {}",
            output.status.code(),
            video_path.display()
        );
    }

    let stdout = String::from_utf8(output.stdout)
        .context("ffprobe returned non-UTF8 output for video dimensions")?;
    parse_dimensions(&stdout)
        .with_context(|| format!("Unexpected ffprobe output for {}", video_path.display()))
}

fn parse_duration(raw: &str) -> Result<f64> {
    let duration: f64 = raw
        .trim()
        .parse()
        .context("Failed to parse ffprobe duration as f64")?;
    if !duration.is_finite() || duration <= 0.0 {
        anyhow::bail!("ffprobe reported a non-positive duration ({duration})");
    }
    Ok(duration)
}

fn parse_dimensions(raw: &str) -> Result<(u32, u32)> {
    // Some containers print one line per stream; only the first matters.
    let value = raw.lines().next().unwrap_or_default().trim();
    let (width_str, height_str) = value
        .split_once('x')
        .with_context(|| format!("expected WIDTHxHEIGHT, got '{value}'"))?;

    let width: u32 = width_str
        .trim()
        .parse()
        .with_context(|| format!("Unable to parse width '{width_str}'"))?;
    let height: u32 = height_str
        .trim()
        .trim_end_matches('x')
        .parse()
        .with_context(|| format!("Unable to parse height '{height_str}'"))?;

    Ok((width, height))
}
