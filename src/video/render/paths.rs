use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};

const OUTPUT_SUFFIX: &str = "_recap";

/// The explicit output path, or `<stem>_recap.mp4` next to the source video.
pub fn resolve_output_path(out_file: Option<&PathBuf>, video_path: &Path) -> Result<PathBuf> {
    if let Some(provided) = out_file {
        return Ok(provided.clone());
    }

    let stem = video_path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .ok_or_else(|| anyhow!("Video path {} has no valid file name", video_path.display()))?;

    let mut output = video_path.to_path_buf();
    output.set_file_name(format!("{stem}{OUTPUT_SUFFIX}.mp4"));
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_next_to_the_video() {
        let output = resolve_output_path(None, Path::new("/talks/q3-review.mov")).unwrap();
        assert_eq!(output, PathBuf::from("/talks/q3-review_recap.mp4"));
    }

    #[test]
    fn explicit_path_wins() {
        let explicit = PathBuf::from("out/summary.mp4");
        let output = resolve_output_path(Some(&explicit), Path::new("talk.mp4")).unwrap();
        assert_eq!(output, explicit);
    }
}
