use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

use super::ffmpeg::services::ExecutionError;

pub fn canonicalize_existing(path: &Path) -> Result<PathBuf> {
    if !path.exists() {
        bail!("{} does not exist", path.display());
    }
    path.canonicalize()
        .with_context(|| format!("Failed to canonicalize path {}", path.display()))
}

pub(super) fn prepare_output_destination(
    output_path: &Path,
    force: bool,
    video_path: &Path,
) -> Result<()> {
    let same_file = output_path == video_path
        || output_path
            .canonicalize()
            .map(|resolved| resolved == video_path)
            .unwrap_or(false);
    if same_file {
        bail!(
            "Output path {} would overwrite the source video",
            output_path.display()
        );
    }

    if output_path.exists() {
        if force {
            fs::remove_file(output_path).with_context(|| {
                format!(
                    "Failed to remove existing output file {} before overwrite",
                    output_path.display()
                )
            })?;
        } else {
            bail!(
                "Output file {} already exists. Use --force to overwrite.",
                output_path.display()
            );
        }
    }

    if let Some(parent) = output_path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory {}", parent.display()))?;
    }

    Ok(())
}

/// The render only counts as successful if it left a non-empty file behind.
pub fn verify_output(path: &Path) -> Result<u64, ExecutionError> {
    match fs::metadata(path) {
        Ok(meta) if meta.len() > 0 => Ok(meta.len()),
        Ok(_) => Err(ExecutionError::EmptyOutput {
            path: path.to_path_buf(),
        }),
        Err(_) => Err(ExecutionError::MissingOutput {
            path: path.to_path_buf(),
        }),
    }
}
