use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const TRANSCRIPT_SRT: &str = "1
00:00:05,000 --> 00:00:11,000
Welcome everyone to the quarterly operations review

2
00:00:25,000 --> 00:00:32,000
The data analysis shows onboarding time dropped 40 percent

3
00:00:40,000 --> 00:00:44,000
Sorry, can you hear me, let me share my screen

4
00:01:13,000 --> 00:01:20,000
Our key recommendation is to consolidate vendor contracts
";

/// Scratch directory holding inputs for one test, removed on drop.
pub struct TestEnvironment {
    temp_dir: TempDir,
}

impl TestEnvironment {
    pub fn new() -> Result<Self> {
        let temp_dir = tempfile::tempdir()?;
        Ok(Self { temp_dir })
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Config file location that keeps the test away from the user's real config.
    pub fn config_path(&self) -> PathBuf {
        self.path().join("config").join("recap.toml")
    }

    pub fn write_file(&self, name: &str, contents: &str) -> Result<PathBuf> {
        let path = self.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, contents)?;
        Ok(path)
    }

    pub fn write_transcript(&self) -> Result<PathBuf> {
        self.write_file("review.srt", TRANSCRIPT_SRT)
    }
}
