use std::path::Path;

pub fn format_time(value: f64) -> String {
    format!("{value:.6}")
}

// ffmpeg unescapes a filter argument twice: once when splitting the graph
// into filters, then again when splitting the filter's `key=value` options.
// Values are escaped innermost level first and emitted without quotes.

const OPTION_SPECIALS: &[char] = &['\\', '\'', ':'];
const GRAPH_SPECIALS: &[char] = &['\\', '\'', '[', ']', ',', ';'];
const DRAWTEXT_SPECIALS: &[char] = &['\\', '%'];

fn prefix_with_backslash(value: &str, specials: &[char]) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if specials.contains(&ch) {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Escape a filter option value for both graph and option parsing.
pub fn escape_filter_value(value: &str) -> String {
    let option_level = prefix_with_backslash(value, OPTION_SPECIALS);
    prefix_with_backslash(&option_level, GRAPH_SPECIALS)
}

pub fn escape_ffmpeg_path(path: &Path) -> String {
    escape_filter_value(&path.to_string_lossy())
}

/// Escape text for the drawtext `text` option, including its `%{...}` expansion.
pub fn escape_drawtext(text: &str) -> String {
    escape_filter_value(&prefix_with_backslash(text, DRAWTEXT_SPECIALS))
}
