use anyhow::{Context, Result};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::video::ranking::BulletCandidate;

lazy_static! {
    static ref LIST_MARKER: Regex = Regex::new(r"^\s*(?:[-*•+]|\d+[.)])\s+").unwrap();
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawCandidate {
    Text(String),
    Record(BulletCandidate),
}

/// Read externally ranked bullets: a JSON array (strings or `{text, source_hint}`)
/// or plain text with one bullet per line.
pub fn load_candidates(path: &Path) -> Result<Vec<BulletCandidate>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read bullet file {}", path.display()))?;
    parse_candidates(&contents)
        .with_context(|| format!("Failed to parse bullet file {}", path.display()))
}

pub fn parse_candidates(contents: &str) -> Result<Vec<BulletCandidate>> {
    if contents.trim_start().starts_with('[') {
        let raw: Vec<RawCandidate> =
            serde_json::from_str(contents).context("Bullet JSON must be an array")?;
        return Ok(raw
            .into_iter()
            .map(|item| match item {
                RawCandidate::Text(text) => BulletCandidate::new(text),
                RawCandidate::Record(candidate) => candidate,
            })
            .collect());
    }

    Ok(contents
        .lines()
        .map(|line| LIST_MARKER.replace(line, "").trim().to_string())
        .filter(|line| !line.is_empty())
        .map(BulletCandidate::new)
        .collect())
}
