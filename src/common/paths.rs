use anyhow::{Context, Result};
use std::path::PathBuf;

/// Directory holding recap's configuration file.
pub fn recap_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .context("Unable to determine user config directory")?
        .join("recap");
    Ok(config_dir)
}
