use indicatif::{ProgressBar, ProgressStyle};

use crate::ui::{OutputFormat, get_output_format};

/// Progress bar measured in milliseconds of rendered media.
///
/// Hidden in JSON mode so stdout stays machine readable.
pub fn create_render_bar(total_seconds: f64) -> ProgressBar {
    if matches!(get_output_format(), OutputFormat::Json) {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new((total_seconds.max(0.0) * 1000.0) as u64);
    if let Ok(style) = ProgressStyle::default_bar().template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {percent:>3}% ({eta}) {msg}",
    ) {
        pb.set_style(style.progress_chars("█▉▊▋▌▍▎▏ "));
    }
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb.set_message("rendering");
    pb
}

pub fn create_spinner(message: impl Into<String>) -> ProgressBar {
    if matches!(get_output_format(), OutputFormat::Json) {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner} {msg}") {
        pb.set_style(style.tick_chars("⠁⠉⠙⠚⠒⠂⠲⠴⠤⠄⠦⠖⠓⠋ "));
    }
    pb.set_message(message.into());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}
