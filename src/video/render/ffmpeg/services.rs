use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use indicatif::ProgressBar;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command as TokioCommand;

use crate::common::progress::create_render_bar;

/// Lines of stderr kept when nothing looks like an error.
const DIAGNOSTIC_TAIL_LINES: usize = 8;

#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("{program} was not found in PATH")]
    NotInstalled { program: String },

    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} timed out after {}s: {diagnostics}", .timeout.as_secs())]
    TimedOut {
        program: String,
        timeout: Duration,
        diagnostics: String,
    },

    #[error("{program} exited with status {code:?}: {diagnostics}")]
    Failed {
        program: String,
        code: Option<i32>,
        diagnostics: String,
    },

    #[error("Output file {} was not created", .path.display())]
    MissingOutput { path: PathBuf },

    #[error("Output file {} is empty", .path.display())]
    EmptyOutput { path: PathBuf },

    #[error("I/O error while running {program}: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

impl ExecutionError {
    pub fn from_exit_status(program: &str, code: Option<i32>, stderr: &str) -> Self {
        ExecutionError::Failed {
            program: program.to_string(),
            code,
            diagnostics: summarize_stderr(stderr),
        }
    }

    /// Tool output preserved for the failure report, if any.
    pub fn diagnostics(&self) -> Option<&str> {
        match self {
            ExecutionError::TimedOut { diagnostics, .. }
            | ExecutionError::Failed { diagnostics, .. } => Some(diagnostics),
            _ => None,
        }
    }
}

/// One external invocation.
#[derive(Debug, Clone)]
pub struct CommandRequest {
    pub program: String,
    pub args: Vec<String>,
    pub timeout: Duration,
    /// Media duration in seconds, enables a progress bar fed from `time=` lines.
    pub progress_total: Option<f64>,
    pub verbose: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommandOutcome {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
}

impl CommandOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Run to completion or until the timeout. Non-zero exits are reported, not raised.
    async fn execute(&self, request: &CommandRequest) -> Result<CommandOutcome, ExecutionError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemCommandExecutor;

#[async_trait]
impl CommandExecutor for SystemCommandExecutor {
    async fn execute(&self, request: &CommandRequest) -> Result<CommandOutcome, ExecutionError> {
        let program = request.program.clone();
        which::which(&program).map_err(|_| ExecutionError::NotInstalled {
            program: program.clone(),
        })?;

        let started = Instant::now();
        let mut child = TokioCommand::new(&program)
            .args(&request.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ExecutionError::Spawn {
                program: program.clone(),
                source,
            })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let pb = request.progress_total.map(create_render_bar);

        let mut stdout_buf = Vec::new();
        let mut stderr_text = String::new();
        let waited = tokio::time::timeout(request.timeout, async {
            let (out, err) = tokio::join!(
                read_all(stdout, &mut stdout_buf),
                read_ffmpeg_stderr(stderr, request.verbose, pb.as_ref(), &mut stderr_text),
            );
            out?;
            err?;
            let status = child.wait().await?;
            Ok::<_, std::io::Error>(status)
        })
        .await;

        match waited {
            Err(_) => {
                let _ = child.kill().await;
                if let Some(pb) = pb {
                    pb.abandon_with_message("timed out");
                }
                Err(ExecutionError::TimedOut {
                    program,
                    timeout: request.timeout,
                    diagnostics: summarize_stderr(&stderr_text),
                })
            }
            Ok(Err(source)) => {
                if let Some(pb) = pb {
                    pb.abandon();
                }
                Err(ExecutionError::Io { program, source })
            }
            Ok(Ok(status)) => {
                if let Some(pb) = pb {
                    if status.success() {
                        pb.finish_with_message("done");
                    } else {
                        pb.abandon_with_message("failed");
                    }
                }
                Ok(CommandOutcome {
                    exit_code: status.code(),
                    stdout: String::from_utf8_lossy(&stdout_buf).into_owned(),
                    stderr: stderr_text,
                    elapsed: started.elapsed(),
                })
            }
        }
    }
}

async fn read_all<R: AsyncRead + Unpin>(
    reader: Option<R>,
    buffer: &mut Vec<u8>,
) -> std::io::Result<()> {
    if let Some(mut reader) = reader {
        reader.read_to_end(buffer).await?;
    }
    Ok(())
}

async fn read_ffmpeg_stderr<R: AsyncRead + Unpin>(
    stderr: Option<R>,
    verbose: bool,
    pb: Option<&ProgressBar>,
    collected: &mut String,
) -> std::io::Result<()> {
    let Some(mut stderr) = stderr else {
        return Ok(());
    };
    let mut buffer = [0u8; 4096];
    let mut accumulated = String::new();

    loop {
        let bytes_read = stderr.read(&mut buffer).await?;
        if bytes_read == 0 {
            break;
        }

        let chunk = String::from_utf8_lossy(&buffer[..bytes_read]);
        accumulated.push_str(&chunk);

        // ffmpeg redraws its status line with '\r'
        while let Some(pos) = accumulated.find(['\r', '\n']) {
            let line = accumulated[..pos].to_string();
            accumulated.drain(..=pos);

            if line.is_empty() {
                continue;
            }

            if verbose {
                if let Some(pb) = pb {
                    pb.println(&line);
                } else {
                    eprintln!("{}", line);
                }
            }

            if let Some(pb) = pb
                && let Some(progress) = parse_ffmpeg_progress(&line)
            {
                pb.set_position((progress * 1000.0) as u64);
                if let Some(speed) = parse_ffmpeg_speed(&line) {
                    pb.set_message(speed);
                }
                continue;
            }

            collected.push_str(&line);
            collected.push('\n');
        }
    }

    if !accumulated.trim().is_empty() {
        collected.push_str(accumulated.trim());
        collected.push('\n');
    }
    Ok(())
}

/// Error-looking lines, or the tail of the output when there are none.
fn summarize_stderr(stderr: &str) -> String {
    let lines: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    let error_lines: Vec<&str> = lines
        .iter()
        .copied()
        .filter(|line| line.contains("error") || line.contains("Error") || line.contains("ERROR"))
        .collect();
    if !error_lines.is_empty() {
        return error_lines.join("\n");
    }
    let tail_start = lines.len().saturating_sub(DIAGNOSTIC_TAIL_LINES);
    lines[tail_start..].join("\n")
}

fn parse_ffmpeg_progress(line: &str) -> Option<f64> {
    let time_start = line.find("time=")?;
    let time_str = &line[time_start + 5..];
    let time_end = time_str.find(' ').unwrap_or(time_str.len());
    parse_time_to_seconds(&time_str[..time_end])
}

fn parse_time_to_seconds(time_str: &str) -> Option<f64> {
    let parts: Vec<&str> = time_str.split(':').collect();
    if parts.len() != 3 {
        return None;
    }

    let hours: f64 = parts[0].parse().ok()?;
    let minutes: f64 = parts[1].parse().ok()?;
    let seconds: f64 = parts[2].parse().ok()?;

    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

fn parse_ffmpeg_speed(line: &str) -> Option<String> {
    let speed_start = line.find("speed=")?;
    let speed_str = line[speed_start + 6..].trim_start();
    let speed_end = speed_str.find('x')?;
    Some(speed_str[..speed_end + 1].to_string())
}
