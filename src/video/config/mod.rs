use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::common::paths;
use crate::video::matching::{FallbackPolicy, MatcherSettings, ScorerKind};
use crate::video::ranking::RankerSettings;
use crate::video::render::ffmpeg::compiler::{Layout, PaneStyle};
use crate::video::timeline::TimelineSettings;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecapConfig {
    pub ranking: RankingConfig,
    pub matching: MatchingConfig,
    pub timeline: TimelineConfig,
    pub composition: CompositionConfig,
    pub execution: ExecutionConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    /// Maximum number of bullets in a timeline
    pub max_bullets: usize,
    /// Segments scoring at or below this are never selected
    pub min_score: f64,
    /// Silence (seconds) that separates thematic spans
    pub span_gap_seconds: f64,
    /// Additional decision/outcome keywords
    pub extra_keywords: Vec<String>,
    /// Additional filler phrases to suppress
    pub extra_fillers: Vec<String>,
}

impl Default for RankingConfig {
    fn default() -> Self {
        let defaults = RankerSettings::default();
        Self {
            max_bullets: defaults.max_bullets,
            min_score: defaults.min_score,
            span_gap_seconds: defaults.span_gap_seconds,
            extra_keywords: Vec::new(),
            extra_fillers: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    pub strategy: ScorerKind,
    /// Minimum similarity for a bullet to be anchored to a segment
    pub min_similarity: f64,
    pub fallback: FallbackPolicy,
    /// Spacing used by the fixed-interval fallback
    pub fallback_interval_seconds: f64,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        let defaults = MatcherSettings::default();
        Self {
            strategy: ScorerKind::default(),
            min_similarity: defaults.min_similarity,
            fallback: defaults.fallback,
            fallback_interval_seconds: defaults.fallback_interval_seconds,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    /// How long a bullet stays on screen when nothing follows it closely
    pub default_display_seconds: f64,
    /// Let a bullet stay visible after the next one appears
    pub allow_overlap: bool,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        let defaults = TimelineSettings::default();
        Self {
            default_display_seconds: defaults.default_display_seconds,
            allow_overlap: defaults.allow_overlap,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositionConfig {
    pub layout: Layout,
    pub pane_width: u32,
    pub pane_height: u32,
    pub background_color: String,
    pub font_size: u32,
    pub font_color: String,
    pub box_color: String,
    pub font_file: Option<PathBuf>,
    /// Characters per line before bullet text wraps
    pub wrap_width: usize,
    /// Padding (pixels) around the text box
    pub box_padding: u32,
}

impl Default for CompositionConfig {
    fn default() -> Self {
        let style = PaneStyle::default();
        Self {
            layout: Layout::default(),
            pane_width: style.pane_width,
            pane_height: style.pane_height,
            background_color: style.background_color,
            font_size: style.font_size,
            font_color: style.font_color,
            box_color: style.box_color,
            font_file: style.font_file,
            wrap_width: style.wrap_width,
            box_padding: style.box_padding,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Media tool to invoke
    pub program: String,
    /// Seconds before the render is cancelled
    pub timeout_seconds: u64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            program: "ffmpeg".to_string(),
            timeout_seconds: 3600,
        }
    }
}

impl RecapConfig {
    pub const FILE_NAME: &'static str = "recap.toml";

    /// Load from `path`, or the default location when `None`. A missing file yields defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => Self::load_from_path(config_path()?),
        }
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading recap config from {}", path.display()))?;
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("parsing recap config {}", path.display()))?;
        Ok(config.sanitized())
    }

    pub fn save_to_path(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating config directory {}", parent.display()))?;
        }

        let toml = self.to_toml()?;
        fs::write(path, toml)
            .with_context(|| format!("writing recap config to {}", path.display()))?;
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("serializing recap config")
    }

    /// Replace out-of-range values with their defaults.
    pub fn sanitized(mut self) -> Self {
        let ranking = RankingConfig::default();
        if self.ranking.max_bullets == 0 {
            self.ranking.max_bullets = ranking.max_bullets;
        }
        if !self.ranking.min_score.is_finite() || self.ranking.min_score < 0.0 {
            self.ranking.min_score = ranking.min_score;
        }
        if !self.ranking.span_gap_seconds.is_finite() || self.ranking.span_gap_seconds < 0.0 {
            self.ranking.span_gap_seconds = ranking.span_gap_seconds;
        }

        let matching = MatchingConfig::default();
        if !(0.0..=1.0).contains(&self.matching.min_similarity) {
            self.matching.min_similarity = matching.min_similarity;
        }
        if !self.matching.fallback_interval_seconds.is_finite()
            || self.matching.fallback_interval_seconds <= 0.0
        {
            self.matching.fallback_interval_seconds = matching.fallback_interval_seconds;
        }

        let timeline = TimelineConfig::default();
        if !self.timeline.default_display_seconds.is_finite()
            || self.timeline.default_display_seconds <= 0.0
        {
            self.timeline.default_display_seconds = timeline.default_display_seconds;
        }

        let composition = CompositionConfig::default();
        if self.composition.pane_width == 0 || self.composition.pane_height == 0 {
            self.composition.pane_width = composition.pane_width;
            self.composition.pane_height = composition.pane_height;
        }
        if self.composition.font_size == 0 {
            self.composition.font_size = composition.font_size;
        }
        if self.composition.wrap_width == 0 {
            self.composition.wrap_width = composition.wrap_width;
        }

        if self.execution.program.trim().is_empty() {
            self.execution.program = ExecutionConfig::default().program;
        }
        if self.execution.timeout_seconds == 0 {
            self.execution.timeout_seconds = ExecutionConfig::default().timeout_seconds;
        }
        self
    }

    /// Command-line bullet limit; zero is ignored.
    pub fn with_max_bullets(mut self, max_bullets: Option<usize>) -> Self {
        if let Some(limit) = max_bullets.filter(|n| *n > 0) {
            self.ranking.max_bullets = limit;
        }
        self
    }

    pub fn ranker_settings(&self) -> RankerSettings {
        RankerSettings {
            max_bullets: self.ranking.max_bullets,
            min_score: self.ranking.min_score,
            span_gap_seconds: self.ranking.span_gap_seconds,
        }
    }

    pub fn matcher_settings(&self) -> MatcherSettings {
        MatcherSettings {
            min_similarity: self.matching.min_similarity,
            fallback: self.matching.fallback,
            fallback_interval_seconds: self.matching.fallback_interval_seconds,
        }
    }

    pub fn timeline_settings(&self) -> TimelineSettings {
        TimelineSettings {
            max_bullets: self.ranking.max_bullets,
            default_display_seconds: self.timeline.default_display_seconds,
            allow_overlap: self.timeline.allow_overlap,
        }
    }

    pub fn pane_style(&self) -> PaneStyle {
        PaneStyle {
            pane_width: self.composition.pane_width,
            pane_height: self.composition.pane_height,
            background_color: self.composition.background_color.clone(),
            font_size: self.composition.font_size,
            font_color: self.composition.font_color.clone(),
            box_color: self.composition.box_color.clone(),
            font_file: self.composition.font_file.clone(),
            wrap_width: self.composition.wrap_width,
            box_padding: self.composition.box_padding,
        }
    }

    pub fn execution_timeout(&self) -> Duration {
        Duration::from_secs(self.execution.timeout_seconds)
    }
}

pub fn config_path() -> Result<PathBuf> {
    Ok(paths::recap_config_dir()?.join(RecapConfig::FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = RecapConfig::load_from_path(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, RecapConfig::default());
        assert!(!dir.path().join("absent.toml").exists());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recap.toml");
        fs::write(
            &path,
            "[ranking]\nmax_bullets = 3\n\n[matching]\nstrategy = \"jaro-winkler\"\nfallback = \"fixed-interval\"\n",
        )
        .unwrap();

        let config = RecapConfig::load_from_path(&path).unwrap();
        assert_eq!(config.ranking.max_bullets, 3);
        assert_eq!(config.matching.strategy, ScorerKind::JaroWinkler);
        assert_eq!(config.matching.fallback, FallbackPolicy::FixedInterval);
        assert_eq!(config.timeline, TimelineConfig::default());
        assert_eq!(config.execution.program, "ffmpeg");
    }

    #[test]
    fn out_of_range_values_are_reset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recap.toml");
        fs::write(
            &path,
            "[ranking]\nmax_bullets = 0\n\n[matching]\nmin_similarity = 4.0\n\n[timeline]\ndefault_display_seconds = -2.0\n",
        )
        .unwrap();

        let config = RecapConfig::load_from_path(&path).unwrap();
        assert_eq!(config.ranking.max_bullets, RankingConfig::default().max_bullets);
        assert_eq!(config.matching.min_similarity, 0.2);
        assert_eq!(config.timeline.default_display_seconds, 15.0);
    }

    #[test]
    fn save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("recap.toml");
        let mut config = RecapConfig::default();
        config.composition.layout = Layout::Vertical;
        config.execution.timeout_seconds = 90;
        config.save_to_path(&path).unwrap();

        let loaded = RecapConfig::load_from_path(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.execution_timeout(), Duration::from_secs(90));
    }

    #[test]
    fn invalid_toml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recap.toml");
        fs::write(&path, "[ranking\nmax_bullets = ").unwrap();
        assert!(RecapConfig::load_from_path(&path).is_err());
    }
}
