use super::util::{escape_drawtext, format_time};
use super::{CompositionCompiler, CompositionSpec, FilterChain};
use crate::video::timeline::TimelineEntry;

const LINE_SPACING: u32 = 12;

impl CompositionCompiler {
    /// Chain one gated drawtext stage per entry onto the slide pane.
    ///
    /// Stages follow `slide_index` order; returns the label of the last stage.
    pub(super) fn build_bullet_overlays(
        &self,
        chain: &mut FilterChain,
        spec: &CompositionSpec,
        base_label: &str,
    ) -> String {
        let mut entries: Vec<&TimelineEntry> = spec.timeline.iter().collect();
        entries.sort_by_key(|entry| entry.slide_index);

        let mut current_label = base_label.to_string();
        for (idx, entry) in entries.into_iter().enumerate() {
            let output_label = format!("slide_{idx}");
            chain.push(format!(
                "[{input}]{drawtext}[{output}]",
                input = current_label,
                drawtext = self.build_drawtext(spec, entry),
                output = output_label,
            ));
            current_label = output_label;
        }
        current_label
    }

    fn build_drawtext(&self, spec: &CompositionSpec, entry: &TimelineEntry) -> String {
        let style = &spec.style;
        let wrapped = textwrap::wrap(entry.text.trim(), style.wrap_width.max(1)).join("\n");

        let mut options = vec![format!("text={}", escape_drawtext(&wrapped))];
        if let Some(font) = self.font_option(spec) {
            options.push(font);
        }
        options.extend([
            format!("fontsize={}", style.font_size),
            format!("fontcolor={}", style.font_color),
            format!("line_spacing={LINE_SPACING}"),
            "box=1".to_string(),
            format!("boxcolor={}", style.box_color),
            format!("boxborderw={}", style.box_padding),
            "x=(w-text_w)/2".to_string(),
            "y=(h-text_h)/2".to_string(),
            format!("enable='{}'", gate_expression(entry)),
        ]);
        format!("drawtext={}", options.join(":"))
    }
}

/// Visible while `start <= t < start + duration`.
pub(super) fn gate_expression(entry: &TimelineEntry) -> String {
    format!(
        "gte(t,{start})*lt(t,{end})",
        start = format_time(entry.start_time),
        end = format_time(entry.end_time()),
    )
}
