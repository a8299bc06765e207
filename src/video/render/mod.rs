pub mod ffmpeg;
mod output;
pub mod paths;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Result, bail};
use serde_json::json;

use crate::common::progress::create_spinner;
use crate::ui::prelude::{Level, emit, log_event};

use self::ffmpeg::compiler::{CompositionCommand, CompositionCompiler, CompositionSpec};
use self::ffmpeg::services::{
    CommandExecutor, CommandRequest, ExecutionError, SystemCommandExecutor,
};
pub use self::output::{canonicalize_existing, verify_output};
use self::output::prepare_output_destination;
use super::cli::RenderArgs;
use super::config::RecapConfig;
use super::pipeline::{JobContext, JobInput, emit_report};
use super::support::candidates::load_candidates;
use super::support::ffmpeg::{probe_duration_seconds, probe_video_dimensions};
use super::support::transcript::load_segments;

pub async fn handle_render(args: RenderArgs, config: RecapConfig) -> Result<Option<PathBuf>> {
    let executor = SystemCommandExecutor;
    handle_render_with_services(args, config, &executor).await
}

async fn handle_render_with_services(
    args: RenderArgs,
    config: RecapConfig,
    executor: &dyn CommandExecutor,
) -> Result<Option<PathBuf>> {
    log_event(
        Level::Info,
        "recap.render.start",
        "Preparing render (reading transcript and bullets)",
    );

    let mut config = config.with_max_bullets(args.max_bullets);
    if let Some(layout) = args.layout {
        config.composition.layout = layout;
    }
    if let Some(seconds) = args.timeout.filter(|s| *s > 0) {
        config.execution.timeout_seconds = seconds;
    }

    let video_path = canonicalize_existing(&args.video)?;
    let slide_image = args
        .slide
        .as_deref()
        .map(canonicalize_existing)
        .transpose()?;
    let segments = load_segments(&args.transcript)?;
    let candidates = args
        .bullets
        .as_deref()
        .map(load_candidates)
        .transpose()?;

    let (video_width, video_height) = resolve_dimensions(&args, &video_path)?;
    let video_duration = resolve_duration(&args, &video_path);

    let context = JobContext::from_config(config.clone());
    let report = context.run(JobInput {
        segments,
        candidates,
        video_duration,
    })?;
    emit_report(&report.lines);
    log_event(
        Level::Info,
        "recap.render.timeline",
        format!(
            "Placing {} bullet(s) over {:.1}s of video",
            report.timeline.len(),
            report.video_duration
        ),
    );

    let output_path = paths::resolve_output_path(args.out_file.as_ref(), &video_path)?;
    let spec = CompositionSpec {
        video_width,
        video_height,
        crop_region: args.crop,
        timeline: report.timeline.entries.clone(),
        source_video_path: video_path.clone(),
        output_path: output_path.clone(),
        slide_image,
        layout: config.composition.layout,
        style: config.pane_style(),
    };
    let command = CompositionCompiler::new(config.execution.program.clone()).compile(&spec)?;

    if args.dry_run {
        emit(
            Level::Info,
            "recap.render.command",
            &command.to_shell_string(),
            Some(json!({ "tokens": command.to_tokens() })),
        );
        log_event(
            Level::Debug,
            "recap.render.dry_run",
            "Dry run completed - ffmpeg command printed above",
        );
        return Ok(None);
    }

    prepare_output_destination(&output_path, args.force, &video_path)?;

    log_event(Level::Info, "recap.render.execute", "Starting ffmpeg render");
    let bytes = run_composition(
        executor,
        &command,
        config.execution_timeout(),
        Some(report.video_duration),
        args.verbose,
    )
    .await?;

    emit(
        Level::Success,
        "recap.render.done",
        &format!("Rendered recap to {}", output_path.display()),
        Some(json!({
            "output": output_path,
            "bytes": bytes,
            "bullets": report.timeline.len(),
            "unmatched": report.unmatched().count(),
            "finished_at": chrono::Local::now().to_rfc3339(),
        })),
    );

    Ok(Some(output_path))
}

fn resolve_dimensions(args: &RenderArgs, video_path: &Path) -> Result<(u32, u32)> {
    match (args.width, args.height) {
        (Some(width), Some(height)) => Ok((width, height)),
        (None, None) => {
            let spinner = create_spinner("Probing source video dimensions");
            let dimensions = probe_video_dimensions(video_path);
            spinner.finish_and_clear();
            dimensions
        }
        _ => bail!("--width and --height must be given together"),
    }
}

/// Explicit duration, else the probed one. `None` lets the pipeline use the transcript end.
fn resolve_duration(args: &RenderArgs, video_path: &Path) -> Option<f64> {
    if args.video_duration.is_some() {
        return args.video_duration;
    }
    match probe_duration_seconds(video_path) {
        Ok(duration) => Some(duration),
        Err(err) => {
            log_event(
                Level::Warn,
                "recap.render.probe_failed",
                format!("Could not probe video duration ({err}); using transcript end"),
            );
            None
        }
    }
}

/// Runs the compiled command once and checks that it produced a non-empty output.
pub async fn run_composition(
    executor: &dyn CommandExecutor,
    command: &CompositionCommand,
    timeout: Duration,
    progress_total: Option<f64>,
    verbose: bool,
) -> Result<u64, ExecutionError> {
    let request = CommandRequest {
        program: command.program.clone(),
        args: command.args.clone(),
        timeout,
        progress_total,
        verbose,
    };
    let outcome = executor.execute(&request).await?;
    if !outcome.success() {
        return Err(ExecutionError::from_exit_status(
            &command.program,
            outcome.exit_code,
            &outcome.stderr,
        ));
    }
    log_event(
        Level::Debug,
        "recap.render.elapsed",
        format!("ffmpeg finished in {:.1}s", outcome.elapsed.as_secs_f64()),
    );
    verify_output(&command.output_path)
}
