use super::{CompositionCompiler, CompositionSpec};

impl CompositionCompiler {
    /// Source video, optionally cropped, fitted into the speaker pane.
    pub(super) fn build_speaker_pane(&self, spec: &CompositionSpec, output_label: &str) -> String {
        let crop = spec
            .crop_region
            .map(|c| {
                format!(
                    "crop={w}:{h}:{x}:{y},",
                    w = c.width,
                    h = c.height,
                    x = c.x,
                    y = c.y
                )
            })
            .unwrap_or_default();

        format!(
            "[0:v]{crop}{fit}[{out}]",
            crop = crop,
            fit = self.fit_to_pane(spec),
            out = output_label,
        )
    }

    /// Slide image scaled into the pane, or a solid background when none is given.
    pub(super) fn build_slide_pane(&self, spec: &CompositionSpec, output_label: &str) -> String {
        let style = &spec.style;
        match spec.slide_image {
            Some(_) => format!(
                "[1:v]{fit}[{out}]",
                fit = self.fit_to_pane(spec),
                out = output_label,
            ),
            None => format!(
                "color=c={bg}:s={w}x{h}:r=30,format=yuv420p,setsar=1[{out}]",
                bg = style.background_color,
                w = style.pane_width,
                h = style.pane_height,
                out = output_label,
            ),
        }
    }

    fn fit_to_pane(&self, spec: &CompositionSpec) -> String {
        let style = &spec.style;
        format!(
            "scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2:{bg},format=yuv420p,setsar=1",
            w = style.pane_width,
            h = style.pane_height,
            bg = style.background_color,
        )
    }
}
