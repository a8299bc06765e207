use std::path::PathBuf;

use super::overlays::gate_expression;
use super::{
    CompositionCompiler, CompositionSpec, CompositionSpecError, CropRegion, Layout, PaneStyle,
};
use crate::video::timeline::TimelineEntry;

fn entry(slide_index: usize, start_time: f64, duration: f64, text: &str) -> TimelineEntry {
    TimelineEntry {
        slide_index,
        start_time,
        duration,
        text: text.to_string(),
    }
}

fn spec(width: u32, height: u32, timeline: Vec<TimelineEntry>) -> CompositionSpec {
    CompositionSpec {
        video_width: width,
        video_height: height,
        crop_region: None,
        timeline,
        source_video_path: PathBuf::from("talk.mp4"),
        output_path: PathBuf::from("out/talk-recap.mp4"),
        slide_image: None,
        layout: Layout::Horizontal,
        style: PaneStyle::default(),
    }
}

fn three_entries() -> Vec<TimelineEntry> {
    vec![
        entry(0, 5.0, 15.0, "Welcome"),
        entry(1, 25.0, 15.0, "Data analysis shows growth"),
        entry(2, 73.0, 12.0, "Key recommendation"),
    ]
}

fn gate_starts(filter: &str) -> Vec<f64> {
    filter
        .match_indices("gte(t,")
        .map(|(pos, needle)| {
            let rest = &filter[pos + needle.len()..];
            let end = rest.find(')').unwrap();
            rest[..end].parse::<f64>().unwrap()
        })
        .collect()
}

#[test]
fn square_video_gets_one_gated_stage_per_entry() {
    let command = CompositionCompiler::default()
        .compile(&spec(1920, 1920, three_entries()))
        .unwrap();
    let filter = command.filter_graph().unwrap();

    assert_eq!(filter.matches("drawtext=").count(), 3);
    assert_eq!(gate_starts(filter), vec![5.0, 25.0, 73.0]);
    assert!(!filter.contains("crop="));
}

#[test]
fn stages_are_chained_in_slide_order() {
    let command = CompositionCompiler::default()
        .compile(&spec(1920, 1080, three_entries()))
        .unwrap();
    let filter = command.filter_graph().unwrap();

    let first = filter.find("[slide_base]drawtext").unwrap();
    let second = filter.find("[slide_0]drawtext").unwrap();
    let third = filter.find("[slide_1]drawtext").unwrap();
    assert!(first < second && second < third);
    assert!(filter.contains("[speaker][slide_2]hstack=inputs=2:shortest=1[outv]"));
}

#[test]
fn gate_expression_uses_start_and_end() {
    assert_eq!(
        gate_expression(&entry(0, 49.0, 6.5, "x")),
        "gte(t,49.000000)*lt(t,55.500000)"
    );
}

#[test]
fn crop_region_is_applied_before_scaling() {
    let mut spec = spec(1920, 1080, three_entries());
    spec.crop_region = Some(CropRegion {
        x: 320,
        y: 0,
        width: 1280,
        height: 1080,
    });
    let command = CompositionCompiler::default().compile(&spec).unwrap();
    let filter = command.filter_graph().unwrap();

    assert!(filter.starts_with(
        "[0:v]crop=1280:1080:320:0,scale=960:1080:force_original_aspect_ratio=decrease"
    ));
}

#[test]
fn slide_image_becomes_second_input() {
    let mut spec = spec(1280, 720, three_entries());
    spec.slide_image = Some(PathBuf::from("slide.png"));
    spec.layout = Layout::Vertical;
    let command = CompositionCompiler::default().compile(&spec).unwrap();

    let loop_idx = command.args.iter().position(|a| a == "-loop").unwrap();
    assert_eq!(command.args[loop_idx + 3], "slide.png");
    let filter = command.filter_graph().unwrap();
    assert!(filter.contains("[1:v]scale=960:1080"));
    assert!(filter.contains("vstack=inputs=2"));
    assert!(!filter.contains("color=c="));
}

#[test]
fn solid_pane_without_slide_image() {
    let command = CompositionCompiler::default()
        .compile(&spec(1920, 1080, three_entries()))
        .unwrap();
    let filter = command.filter_graph().unwrap();
    assert!(filter.contains("color=c=0x1E1E2E:s=960x1080:r=30"));
    assert!(!command.args.iter().any(|a| a == "-loop"));
}

#[test]
fn maps_streams_and_ends_with_output() {
    let command = CompositionCompiler::default()
        .compile(&spec(1920, 1080, three_entries()))
        .unwrap();

    let maps: Vec<&String> = command
        .args
        .windows(2)
        .filter(|w| w[0] == "-map")
        .map(|w| &w[1])
        .collect();
    assert_eq!(maps, vec!["[outv]", "0:a?"]);
    assert_eq!(command.args.last().unwrap(), "out/talk-recap.mp4");
    assert_eq!(command.output_path, PathBuf::from("out/talk-recap.mp4"));
    assert_eq!(command.to_tokens()[0], "ffmpeg");
    assert_eq!(command.to_tokens().len(), command.args.len() + 1);
}

#[test]
fn compile_is_deterministic() {
    let compiler = CompositionCompiler::default();
    let spec = spec(1920, 1080, three_entries());
    assert_eq!(compiler.compile(&spec).unwrap(), compiler.compile(&spec).unwrap());
}

#[test]
fn rejects_invalid_specs() {
    let compiler = CompositionCompiler::default();

    assert_eq!(
        compiler.compile(&spec(0, 1080, three_entries())).unwrap_err(),
        CompositionSpecError::InvalidDimensions {
            width: 0,
            height: 1080
        }
    );
    assert_eq!(
        compiler.compile(&spec(1920, 1080, Vec::new())).unwrap_err(),
        CompositionSpecError::EmptyTimeline
    );

    let mut missing_source = spec(1920, 1080, three_entries());
    missing_source.source_video_path = PathBuf::new();
    assert_eq!(
        compiler.compile(&missing_source).unwrap_err(),
        CompositionSpecError::MissingSourceVideo
    );

    let mut missing_output = spec(1920, 1080, three_entries());
    missing_output.output_path = PathBuf::new();
    assert_eq!(
        compiler.compile(&missing_output).unwrap_err(),
        CompositionSpecError::MissingOutputPath
    );

    let mut overwrite = spec(1920, 1080, three_entries());
    overwrite.output_path = overwrite.source_video_path.clone();
    assert!(matches!(
        compiler.compile(&overwrite),
        Err(CompositionSpecError::OutputOverwritesSource(_))
    ));

    let mut bad_crop = spec(1920, 1080, three_entries());
    bad_crop.crop_region = Some(CropRegion {
        x: 1000,
        y: 0,
        width: 1280,
        height: 720,
    });
    assert!(matches!(
        compiler.compile(&bad_crop),
        Err(CompositionSpecError::CropOutOfBounds { .. })
    ));

    let unordered = vec![entry(0, 30.0, 5.0, "b"), entry(1, 10.0, 5.0, "a")];
    assert!(matches!(
        compiler.compile(&spec(1920, 1080, unordered)),
        Err(CompositionSpecError::InvalidTimeline { index: 1, .. })
    ));
}

const WHITESPACE: &[char] = &[' ', '\n', '\t', '\r'];

/// Reads one token the way ffmpeg's `av_get_token` does, advancing `buf`.
fn get_token(buf: &mut &str, term: &str) -> String {
    let input: &str = *buf;
    let mut rest = input.trim_start_matches(WHITESPACE).chars();
    let mut out = String::new();
    let mut keep = 0;
    while let Some(c) = rest.clone().next() {
        if term.contains(c) {
            break;
        }
        rest.next();
        match c {
            '\\' => match rest.next() {
                Some(next) => {
                    out.push(next);
                    keep = out.len();
                }
                None => out.push(c),
            },
            '\'' => {
                let mut closed = false;
                for quoted in rest.by_ref() {
                    if quoted == '\'' {
                        closed = true;
                        break;
                    }
                    out.push(quoted);
                }
                if closed {
                    keep = out.len();
                }
            }
            _ => out.push(c),
        }
    }
    while out.len() > keep && out.ends_with(WHITESPACE) {
        out.pop();
    }
    *buf = rest.as_str();
    out
}

/// Arguments of each drawtext stage after graph-level unescaping.
fn drawtext_args(filter: &str) -> Vec<String> {
    let mut rest = filter;
    let mut args = Vec::new();
    while let Some(pos) = rest.find("drawtext=") {
        rest = &rest[pos + "drawtext=".len()..];
        args.push(get_token(&mut rest, "[],;"));
    }
    args
}

/// `key=value` pairs after option-level unescaping.
fn parse_options(args: &str) -> Vec<(String, String)> {
    let mut rest = args;
    let mut options = Vec::new();
    while let Some((key, value)) = rest.split_once('=') {
        rest = value;
        let value = get_token(&mut rest, ":");
        options.push((key.to_string(), value));
        rest = rest.strip_prefix(':').unwrap_or(rest);
    }
    options
}

fn option<'a>(options: &'a [(String, String)], key: &str) -> &'a str {
    options
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
        .unwrap_or_else(|| panic!("missing {key} in {options:?}"))
}

/// What drawtext renders from its `text` option.
fn expand_drawtext(text: &str) -> String {
    let mut out = String::new();
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.extend(chars.next()),
            '%' => panic!("bare % in drawtext text {text:?}"),
            _ => out.push(c),
        }
    }
    out
}

#[test]
fn bullet_text_survives_filter_parsing() {
    let text = "Let's cut churn by 40%: costs, [Q3]; a\\b";
    let mut spec = spec(1920, 1080, vec![entry(0, 1.0, 4.0, text)]);
    spec.style.wrap_width = 80;
    let command = CompositionCompiler::default().compile(&spec).unwrap();

    let args = drawtext_args(command.filter_graph().unwrap());
    assert_eq!(args.len(), 1);
    let options = parse_options(&args[0]);

    assert_eq!(options[0].0, "text");
    assert_eq!(option(&options, "text"), "Let's cut churn by 40\\%: costs, [Q3]; a\\\\b");
    assert_eq!(expand_drawtext(option(&options, "text")), text);
    assert_eq!(option(&options, "fontsize"), "44");
    assert_eq!(option(&options, "x"), "(w-text_w)/2");
    assert_eq!(
        option(&options, "enable"),
        gate_expression(&spec.timeline[0])
    );
    assert_eq!(options.last().unwrap().0, "enable");
}

#[test]
fn wrapped_bullet_keeps_line_breaks() {
    let mut spec = spec(
        1920,
        1080,
        vec![entry(0, 1.0, 4.0, "Margin up 12%: it's the best quarter yet")],
    );
    spec.style.wrap_width = 20;
    let command = CompositionCompiler::default().compile(&spec).unwrap();

    let args = drawtext_args(command.filter_graph().unwrap());
    let options = parse_options(&args[0]);
    assert_eq!(
        expand_drawtext(option(&options, "text")),
        "Margin up 12%: it's\nthe best quarter yet"
    );
    assert_eq!(option(&options, "enable"), "gte(t,1.000000)*lt(t,5.000000)");
}

#[test]
fn every_stage_keeps_its_gate() {
    let entries = three_entries();
    let command = CompositionCompiler::default()
        .compile(&spec(1920, 1080, entries.clone()))
        .unwrap();

    let gates: Vec<String> = drawtext_args(command.filter_graph().unwrap())
        .iter()
        .map(|args| option(&parse_options(args), "enable").to_string())
        .collect();
    let expected: Vec<String> = entries.iter().map(gate_expression).collect();
    assert_eq!(gates, expected);
}

#[test]
fn font_file_path_survives_filter_parsing() {
    let font = PathBuf::from("C:/fonts/O'Neil [Bold], v2; Inter.ttf");
    let mut spec = spec(1920, 1080, vec![entry(0, 2.0, 3.0, "Welcome")]);
    spec.style.font_file = Some(font.clone());
    let command = CompositionCompiler::default().compile(&spec).unwrap();

    let args = drawtext_args(command.filter_graph().unwrap());
    let options = parse_options(&args[0]);
    assert_eq!(option(&options, "fontfile"), font.to_string_lossy());
    assert_eq!(option(&options, "text"), "Welcome");
    assert_eq!(option(&options, "enable"), "gte(t,2.000000)*lt(t,5.000000)");
}

#[test]
fn crop_region_parses_geometry() {
    let crop: CropRegion = "1280x720+320+40".parse().unwrap();
    assert_eq!(
        crop,
        CropRegion {
            x: 320,
            y: 40,
            width: 1280,
            height: 720
        }
    );
    assert_eq!(crop.to_string(), "1280x720+320+40");
    assert!("1280x720".parse::<CropRegion>().is_err());
    assert!("axb+1+2".parse::<CropRegion>().is_err());
}

#[test]
fn shell_string_quotes_filter() {
    let command = CompositionCompiler::new("/usr/bin/ffmpeg")
        .compile(&spec(1920, 1080, three_entries()))
        .unwrap();
    let shell = command.to_shell_string();
    assert!(shell.starts_with("/usr/bin/ffmpeg -hide_banner -y -i talk.mp4"));
    let reparsed = shell_words::split(&shell).unwrap();
    assert_eq!(reparsed, command.to_tokens());
}
