use crate::ui::prelude::{Level, emit};

/// A note produced while running a job, emitted by the caller.
#[derive(Debug, Clone)]
pub struct ReportLine {
    pub level: Level,
    pub code: &'static str,
    pub message: String,
    pub data: Option<serde_json::Value>,
}

impl ReportLine {
    pub fn new(level: Level, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            level,
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}

pub fn emit_report(lines: &[ReportLine]) {
    for line in lines {
        emit(line.level, line.code, &line.message, line.data.clone());
    }
}

pub fn format_report_lines(lines: &[ReportLine]) -> Vec<String> {
    lines.iter().flat_map(format_report_line).collect()
}

fn format_report_line(line: &ReportLine) -> Vec<String> {
    let prefix = format!("[{}] ", level_label(line.level));
    let mut message_lines = line.message.lines();
    let Some(first) = message_lines.next() else {
        return vec![prefix.trim_end().to_string()];
    };

    let mut formatted = Vec::new();
    formatted.push(format!("{prefix}{first}"));

    let indent = " ".repeat(prefix.len());
    for rest in message_lines {
        formatted.push(format!("{indent}{rest}"));
    }

    formatted
}

fn level_label(level: Level) -> &'static str {
    match level {
        Level::Info => "INFO",
        Level::Success => "OK",
        Level::Warn => "WARN",
        Level::Error => "ERROR",
        Level::Debug => "DEBUG",
    }
}
