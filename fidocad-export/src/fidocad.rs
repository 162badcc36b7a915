//! Export back to the drawing's own text format.
//!
//! Every call becomes one primitive serialized with the token grammar, so
//! the output reads back with the same parser. Macros from the standard
//! libraries can be kept as single `MC` lines or split into primitives.

use std::io::Write;
use std::sync::Arc;

use fidocad_core::geom::ArrowSpec;
use fidocad_core::primitive::{TEXT_BOLD, TEXT_ITALIC, TEXT_MIRRORED};
use fidocad_core::{
    is_standard_key, AdvText, Dimension, DrawingModel, DrawingSettings, Layer, MacroLibrary, Point, PointF, Primitive,
    Shape,
};

use crate::backend::{Arrows, ExportBackend, MacroPlacement, PadItem, Stroke, TextItem};
use crate::error::ExportResult;

fn truncate(p: PointF) -> Point {
    Point::new(p.x as i32, p.y as i32)
}

fn arrow_spec(a: &Arrows) -> ArrowSpec {
    ArrowSpec { start: a.start, end: a.end, style: a.style, length: a.length as f32, half_width: a.half_width as f32 }
}

pub struct FidoCadBackend<W: Write> {
    out: W,
    extensions: bool,
    split_standard_macros: bool,
    settings: DrawingSettings,
}

impl<W: Write> FidoCadBackend<W> {
    pub fn new(out: W) -> Self {
        Self { out, extensions: true, split_standard_macros: false, settings: DrawingSettings::default() }
    }

    /// Writes FidoCadJ `FCJ` and `FJC` lines. On by default.
    pub fn with_extensions(mut self, extensions: bool) -> Self {
        self.extensions = extensions;
        self
    }

    /// Expands standard library macros into primitives too.
    pub fn split_standard_macros(mut self, split: bool) -> Self {
        self.split_standard_macros = split;
        self
    }

    /// Stroke settings written in the header configuration lines.
    pub fn with_settings(mut self, settings: DrawingSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write(&mut self, p: Primitive) -> ExportResult<()> {
        self.out.write_all(p.to_fidocad(self.extensions).as_bytes())?;
        Ok(())
    }

    /// Keys without a library prefix are standard. The newer standard
    /// libraries only count as such when extensions are on.
    fn is_standard(&self, key: &str) -> bool {
        if key.contains('.') {
            self.extensions && is_standard_key(key)
        } else {
            true
        }
    }
}

impl<W: Write> ExportBackend for FidoCadBackend<W> {
    fn export_start(&mut self, _size: Dimension, layers: &[Layer], _grid: i32) -> ExportResult<()> {
        let mut header = DrawingModel::new(Arc::new(MacroLibrary::new()));
        header.layers = layers.to_vec();
        header.settings = self.settings;
        self.out.write_all(header.to_fidocad(self.extensions).as_bytes())?;
        Ok(())
    }

    fn export_end(&mut self) -> ExportResult<()> {
        self.out.flush()?;
        Ok(())
    }

    fn export_adv_text(&mut self, t: &TextItem<'_>) -> ExportResult<()> {
        let mut style = 0;
        if t.bold {
            style |= TEXT_BOLD;
        }
        if t.italic {
            style |= TEXT_ITALIC;
        }
        if t.mirrored {
            style |= TEXT_MIRRORED;
        }
        let text = AdvText {
            p: t.p,
            size_y: t.size_y,
            size_x: t.size_x,
            orientation: t.orientation,
            style,
            font: t.font.to_string(),
            text: t.text.to_string(),
        };
        self.write(Primitive::new(t.layer, Shape::Text(text)))
    }

    fn export_bezier(&mut self, points: [Point; 4], arrows: &Arrows, stroke: &Stroke) -> ExportResult<()> {
        let shape = Shape::Bezier { points, arrow: arrow_spec(arrows), dash: stroke.dash };
        self.write(Primitive::new(stroke.layer, shape))
    }

    fn export_connection(&mut self, p: Point, layer: usize, _size: f64) -> ExportResult<()> {
        self.write(Primitive::new(layer, Shape::Connection { p }))
    }

    fn export_line(&mut self, p1: PointF, p2: PointF, arrows: &Arrows, stroke: &Stroke) -> ExportResult<()> {
        let shape =
            Shape::Line { p1: truncate(p1), p2: truncate(p2), arrow: arrow_spec(arrows), dash: stroke.dash };
        self.write(Primitive::new(stroke.layer, shape))
    }

    fn export_macro(&mut self, m: &MacroPlacement<'_>) -> ExportResult<bool> {
        if self.split_standard_macros || !self.is_standard(m.key) {
            return Ok(false);
        }
        let mut p = Primitive::macro_call(m.p, (m.orientation / 90).rem_euclid(4) as u8, m.mirror, m.key)
            .with_labels(m.name, m.value);
        p.labels.name_pos = m.name_pos;
        p.labels.value_pos = m.value_pos;
        p.labels.font = m.font.to_string();
        p.labels.font_size = m.font_size;
        self.write(p)?;
        Ok(true)
    }

    fn export_oval(&mut self, p1: Point, p2: Point, filled: bool, stroke: &Stroke) -> ExportResult<()> {
        self.write(Primitive::new(stroke.layer, Shape::Oval { p1, p2, filled, dash: stroke.dash }))
    }

    fn export_pcb_line(&mut self, p1: Point, p2: Point, width: i32, layer: usize) -> ExportResult<()> {
        self.write(Primitive::new(layer, Shape::PcbLine { p1, p2, width: width as f64 }))
    }

    fn export_pcb_pad(&mut self, pad: &PadItem) -> ExportResult<()> {
        if pad.only_hole {
            return Ok(());
        }
        let shape = Shape::PcbPad { p: pad.p, rx: pad.rx, ry: pad.ry, drill: pad.drill, style: pad.style };
        self.write(Primitive::new(pad.layer, shape))
    }

    fn export_polygon(&mut self, points: &[PointF], filled: bool, stroke: &Stroke) -> ExportResult<()> {
        let points = points.iter().copied().map(truncate).collect();
        self.write(Primitive::new(stroke.layer, Shape::Polygon { points, filled, dash: stroke.dash }))
    }

    fn export_curve(
        &mut self,
        points: &[PointF],
        filled: bool,
        closed: bool,
        arrows: &Arrows,
        stroke: &Stroke,
    ) -> ExportResult<bool> {
        let shape = Shape::Curve {
            points: points.iter().copied().map(truncate).collect(),
            filled,
            closed,
            arrow: arrow_spec(arrows),
            dash: stroke.dash,
        };
        self.write(Primitive::new(stroke.layer, shape))?;
        Ok(true)
    }

    fn export_rectangle(&mut self, p1: Point, p2: Point, filled: bool, stroke: &Stroke) -> ExportResult<()> {
        self.write(Primitive::new(stroke.layer, Shape::Rectangle { p1, p2, filled, dash: stroke.dash }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Exporter;
    use fidocad_core::{MapCoordinates, PadStyle};

    fn export(model: &DrawingModel, backend: FidoCadBackend<Vec<u8>>) -> String {
        let mut backend = backend;
        Exporter::new(model).export(&mut backend, &MapCoordinates::new(), None).unwrap();
        String::from_utf8(backend.into_inner()).unwrap()
    }

    fn library() -> Arc<MacroLibrary> {
        let mut lib = MacroLibrary::new();
        lib.parse_str("[r01 Resistor]\nLI 90 100 110 100 0\n[mylib.part Part]\nRV 95 95 105 105 1\n", "", "test").unwrap();
        Arc::new(lib)
    }

    #[test]
    fn test_single_line_without_extensions() {
        let mut m = DrawingModel::default();
        m.add(Primitive::line(Point::new(10, 10), Point::new(50, 50), 2));
        let text = export(&m, FidoCadBackend::new(Vec::new()).with_extensions(false));
        assert_eq!(text, "[FIDOCAD]\nLI 10 10 50 50 2\n");
    }

    #[test]
    fn test_standard_macro_kept_atomic() {
        let mut m = DrawingModel::new(library());
        m.add(Primitive::macro_call(Point::new(20, 30), 1, false, "r01"));
        let text = export(&m, FidoCadBackend::new(Vec::new()).with_extensions(false));
        assert_eq!(text, "[FIDOCAD]\nMC 20 30 1 0 r01\n");

        let split = export(&m, FidoCadBackend::new(Vec::new()).with_extensions(false).split_standard_macros(true));
        assert_eq!(split, "[FIDOCAD]\nLI 20 20 20 40 0\n");
    }

    #[test]
    fn test_library_macro_always_expanded() {
        let mut m = DrawingModel::new(library());
        m.add(Primitive::macro_call(Point::new(0, 0), 0, false, "mylib.part"));
        let text = export(&m, FidoCadBackend::new(Vec::new()).with_extensions(false));
        assert_eq!(text, "[FIDOCAD]\nRV -5 -5 5 5 1\n");
    }

    #[test]
    fn test_pads_written_once() {
        let mut m = DrawingModel::default();
        m.add(Primitive::pad(Point::new(5, 5), 10, 12, 4, PadStyle::Rounded, 2));
        let text = export(&m, FidoCadBackend::new(Vec::new()).with_extensions(false));
        assert_eq!(text, "[FIDOCAD]\nPA 5 5 10 12 4 2 2\n");
    }
}
