//! Scalable Vector Graphics output.

use std::io::Write;

use fidocad_core::geom::arrow::{arrow_head, ArrowHead};
use fidocad_core::settings::DASH_STYLES;
use fidocad_core::{round_half_up, Color, Dimension, Layer, PadStyle, Point, PointF};

use crate::backend::{dash_strings, layer_color, Arrows, ExportBackend, PadItem, Stroke, TextItem};
use crate::decorated;
use crate::error::ExportResult;
use crate::format::{decimal, decimal_f32, round2, round_to};
use crate::metrics::{text_x_scale, FixedPitchMetrics, TextMetrics};

/// Stroke width of pads and connection dots.
const THIN_STROKE: f64 = 0.33;

fn cle(v: f64) -> String {
    decimal(round2(v))
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

pub struct SvgBackend<W: Write> {
    out: W,
    layers: Vec<Layer>,
    dashes: [String; DASH_STYLES],
    dash_phase: f32,
    /// Last offset written, negative before the first one.
    current_phase: f32,
    /// Width of the shape being written, also used for its arrowheads.
    stroke_width: f64,
    metrics: Box<dyn TextMetrics>,
}

impl<W: Write> SvgBackend<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            layers: Vec::new(),
            dashes: dash_strings(1.0, ","),
            dash_phase: 0.0,
            current_phase: -1.0,
            stroke_width: 0.0,
            metrics: Box::new(FixedPitchMetrics::default()),
        }
    }

    /// Measures text chunks with `metrics` when placing exponents and
    /// indices.
    pub fn with_metrics(mut self, metrics: Box<dyn TextMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn color(&self, layer: usize) -> Color {
        layer_color(&self.layers, layer)
    }

    fn fill_pattern(color: Color, filled: bool) -> String {
        if filled {
            format!("fill=\"#{}\"", color.hex())
        } else {
            "fill=\"none\"".to_string()
        }
    }

    /// Closes an element with its stroke style and fill.
    fn finish_element(&mut self, color: Color, fill: &str, dash: u8) -> ExportResult<()> {
        write!(self.out, "style=\"stroke:#{}", color.hex())?;
        if dash > 0 {
            let pattern = self.dashes.get(dash as usize).map(String::as_str).unwrap_or("");
            write!(self.out, ";stroke-dasharray: {}", pattern)?;
        }
        if self.current_phase != self.dash_phase {
            self.current_phase = self.dash_phase;
            write!(self.out, ";stroke-dashoffset: {}", decimal_f32(self.dash_phase))?;
        }
        writeln!(self.out, ";stroke-width:{};fill-rule: evenodd;\" {}/>", decimal(self.stroke_width), fill)?;
        Ok(())
    }
}

impl<W: Write> ExportBackend for SvgBackend<W> {
    fn export_start(&mut self, size: Dimension, layers: &[Layer], _grid: i32) -> ExportResult<()> {
        self.layers = layers.to_vec();
        write!(
            self.out,
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"no\"?> \n\
             <!DOCTYPE svg PUBLIC \"-//W3C//Dtd SVG 1.1//EN\" \
             \"http://www.w3.org/Graphics/SVG/1.1/Dtd/svg11.dtd\">\n\
             <svg width=\"{}\" height=\"{}\" version=\"1.1\" \
             xmlns=\"http://www.w3.org/2000/svg\" xmlns:xlink=\"http://www.w3.org/1999/xlink\">\n\
             <!-- Created by {} -->\n",
            cle(size.width as f64),
            cle(size.height as f64),
            crate::creator(),
        )?;
        Ok(())
    }

    fn export_end(&mut self) -> ExportResult<()> {
        write!(self.out, "</svg>")?;
        self.out.flush()?;
        Ok(())
    }

    fn set_dash_unit(&mut self, unit: f64) {
        self.dashes = dash_strings(unit, ",");
    }

    fn set_dash_phase(&mut self, phase: f32) {
        self.dash_phase = phase;
    }

    fn export_adv_text(&mut self, t: &TextItem<'_>) -> ExportResult<()> {
        if t.size_y <= 0 {
            log::debug!("Text '{}' has no height, not written", t.text);
            return Ok(());
        }
        let color = self.color(t.layer);
        write!(self.out, "<g transform=\"translate({},{})", cle(t.p.x as f64), cle(t.p.y as f64))?;
        let mut x_scale = text_x_scale(t.size_x, t.size_y);
        if t.orientation != 0 {
            let alpha = if t.mirrored { t.orientation } else { -t.orientation };
            write!(self.out, " rotate({}) ", decimal(alpha as f64))?;
        }
        if t.mirrored {
            x_scale = -x_scale;
        }
        write!(self.out, " scale({},1) ", decimal(x_scale))?;
        write!(self.out, "\">")?;

        let chunks = decorated::layout(t.text, t.p.x, t.p.y, t.size_y as f64, t.font, self.metrics.as_ref());
        for c in chunks {
            writeln!(
                self.out,
                "<text x=\"{}\" y=\"{}\" font-family=\"{}\" font-size=\"{}\" font-style=\"{}\" \
                 font-weight=\"{}\" fill=\"#{}\">{}</text>",
                c.x - t.p.x,
                cle(c.size + (c.y - t.p.y) as f64),
                t.font,
                cle(c.size),
                if t.italic { "italic" } else { "" },
                if t.bold { "bold" } else { "" },
                color.hex(),
                escape(&c.text),
            )?;
        }
        writeln!(self.out, "</g>")?;
        Ok(())
    }

    fn export_bezier(&mut self, points: [Point; 4], arrows: &Arrows, stroke: &Stroke) -> ExportResult<()> {
        self.stroke_width = stroke.width;
        let [p1, p2, p3, p4] = points.map(|p| PointF::new(p.x as f64, p.y as f64));
        let (a, _) = self.shaft_with_arrows(p1, p2, &Arrows { end: false, ..*arrows }, stroke.layer)?;
        let (_, b) = self.shaft_with_arrows(p3, p4, &Arrows { start: false, ..*arrows }, stroke.layer)?;
        let r = |v: f64| cle(round_half_up(v) as f64);
        write!(
            self.out,
            "<path d=\"M {},{} C {},{} {},{} {},{}\" ",
            r(a.x),
            r(a.y),
            cle(p2.x),
            cle(p2.y),
            cle(p3.x),
            cle(p3.y),
            r(b.x),
            r(b.y),
        )?;
        self.finish_element(self.color(stroke.layer), "fill=\"none\"", stroke.dash)
    }

    fn export_connection(&mut self, p: Point, layer: usize, size: f64) -> ExportResult<()> {
        self.stroke_width = THIN_STROKE;
        let hex = self.color(layer).hex();
        writeln!(
            self.out,
            "<circle cx=\"{}\" cy=\"{}\" r=\"{}\" style=\"stroke:#{};stroke-width:{}\" fill=\"#{}\"/>",
            cle(p.x as f64),
            cle(p.y as f64),
            cle(size / 2.0),
            hex,
            decimal(THIN_STROKE),
            hex,
        )?;
        Ok(())
    }

    fn export_line(&mut self, p1: PointF, p2: PointF, arrows: &Arrows, stroke: &Stroke) -> ExportResult<()> {
        self.stroke_width = stroke.width;
        let (a, b) = self.shaft_with_arrows(p1, p2, arrows, stroke.layer)?;
        write!(
            self.out,
            "<line x1=\"{}\" y1=\"{}\" x2=\"{}\" y2=\"{}\" ",
            cle(a.x),
            cle(a.y),
            cle(b.x),
            cle(b.y)
        )?;
        self.finish_element(self.color(stroke.layer), "fill=\"none\"", stroke.dash)
    }

    fn export_oval(&mut self, p1: Point, p2: Point, filled: bool, stroke: &Stroke) -> ExportResult<()> {
        self.stroke_width = stroke.width;
        let color = self.color(stroke.layer);
        write!(
            self.out,
            "<ellipse cx=\"{}\" cy=\"{}\" rx=\"{}\" ry=\"{}\" ",
            cle((p1.x + p2.x) as f64 / 2.0),
            cle((p1.y + p2.y) as f64 / 2.0),
            cle((p2.x - p1.x).abs() as f64 / 2.0),
            cle((p2.y - p1.y).abs() as f64 / 2.0),
        )?;
        self.finish_element(color, &Self::fill_pattern(color, filled), stroke.dash)
    }

    fn export_pcb_line(&mut self, p1: Point, p2: Point, width: i32, layer: usize) -> ExportResult<()> {
        writeln!(
            self.out,
            "<line x1=\"{}\" y1=\"{}\" x2=\"{}\" y2=\"{}\" \
             style=\"stroke:#{};stroke-linejoin:round;stroke-linecap:round;stroke-width:{}\"/>",
            cle(p1.x as f64),
            cle(p1.y as f64),
            cle(p2.x as f64),
            cle(p2.y as f64),
            self.color(layer).hex(),
            width,
        )?;
        Ok(())
    }

    fn export_pcb_pad(&mut self, pad: &PadItem) -> ExportResult<()> {
        let (x, y) = (pad.p.x as f64, pad.p.y as f64);
        self.stroke_width = THIN_STROKE;
        let thin = decimal(THIN_STROKE);
        if pad.only_hole {
            writeln!(
                self.out,
                "<circle cx=\"{}\" cy=\"{}\" r=\"{}\" style=\"stroke:white;stroke-width:{}\" fill=\"white\"/>",
                cle(x),
                cle(y),
                cle(pad.drill as f64 / 2.0),
                thin,
            )?;
            return Ok(());
        }
        let hex = self.color(pad.layer).hex();
        let (six, siy) = (pad.rx as f64, pad.ry as f64);
        match pad.style {
            PadStyle::Square | PadStyle::Rounded => {
                let corner = if pad.style == PadStyle::Rounded { cle(2.5) } else { "0".to_string() };
                writeln!(
                    self.out,
                    "<rect x=\"{}\" y=\"{}\" rx=\"{c}\" ry=\"{c}\" width=\"{}\" height=\"{}\" \
                     style=\"stroke:#{hex};stroke-width:{}\" fill=\"#{hex}\"/>",
                    cle(x - six / 2.0),
                    cle(y - siy / 2.0),
                    cle(six),
                    cle(siy),
                    thin,
                    c = corner,
                    hex = hex,
                )?;
            }
            PadStyle::Oval => {
                writeln!(
                    self.out,
                    "<ellipse cx=\"{}\" cy=\"{}\" rx=\"{}\" ry=\"{}\" \
                     style=\"stroke:#{hex};stroke-width:{}\" fill=\"#{hex}\"/>",
                    cle(x),
                    cle(y),
                    cle(six / 2.0),
                    cle(siy / 2.0),
                    thin,
                    hex = hex,
                )?;
            }
        }
        Ok(())
    }

    fn export_polygon(&mut self, points: &[PointF], filled: bool, stroke: &Stroke) -> ExportResult<()> {
        self.stroke_width = stroke.width;
        let color = self.color(stroke.layer);
        write!(self.out, "<polygon points=\"")?;
        for p in points {
            write!(self.out, "{},{} ", cle(p.x), cle(p.y))?;
        }
        write!(self.out, "\" ")?;
        self.finish_element(color, &Self::fill_pattern(color, filled), stroke.dash)
    }

    fn export_rectangle(&mut self, p1: Point, p2: Point, filled: bool, stroke: &Stroke) -> ExportResult<()> {
        self.stroke_width = stroke.width;
        let color = self.color(stroke.layer);
        write!(
            self.out,
            "<rect x=\"{}\" y=\"{}\" rx=\"0\" ry=\"0\" width=\"{}\" height=\"{}\" ",
            cle(p1.x.min(p2.x) as f64),
            cle(p1.y.min(p2.y) as f64),
            cle((p2.x - p1.x).abs() as f64),
            cle((p2.y - p1.y).abs() as f64),
        )?;
        self.finish_element(color, &Self::fill_pattern(color, filled), stroke.dash)
    }

    fn export_arrow(
        &mut self,
        tip: PointF,
        from: PointF,
        length: f64,
        half_width: f64,
        style: u8,
        layer: usize,
    ) -> ExportResult<PointF> {
        let color = self.color(layer);
        let head = arrow_head(tip.x, tip.y, from.x, from.y, length, half_width, style);
        write!(
            self.out,
            "<polygon points=\"{},{} {},{} {},{}\" ",
            round_to(head.tip.x),
            round_to(head.tip.y),
            round_to(head.left.x),
            round_to(head.left.y),
            round_to(head.right.x),
            round_to(head.right.y),
        )?;
        let fill = Self::fill_pattern(color, ArrowHead::is_filled(style));
        self.finish_element(color, &fill, 0)?;
        if let Some((a, b)) = head.limiter {
            write!(
                self.out,
                "<line x1=\"{}\" y1=\"{}\" x2=\"{}\" y2=\"{}\" ",
                cle(a.x),
                cle(a.y),
                cle(b.x),
                cle(b.y)
            )?;
            self.finish_element(color, "fill=\"none\"", 0)?;
        }
        Ok(head.base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fidocad_core::standard_layers;

    fn started() -> SvgBackend<Vec<u8>> {
        let mut svg = SvgBackend::new(Vec::new());
        svg.export_start(Dimension::new(100, 50), &standard_layers(), 5).unwrap();
        svg
    }

    fn body(svg: SvgBackend<Vec<u8>>) -> String {
        let text = String::from_utf8(svg.into_inner()).unwrap();
        text.lines().skip(4).collect::<Vec<_>>().join("\n")
    }

    #[test]
    fn test_header_and_trailer() {
        let mut svg = started();
        svg.export_end().unwrap();
        let text = String::from_utf8(svg.into_inner()).unwrap();
        assert!(text.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"no\"?> \n<!DOCTYPE svg"));
        assert!(text.contains("<svg width=\"100.0\" height=\"50.0\" version=\"1.1\""));
        assert!(text.ends_with("</svg>"));
    }

    #[test]
    fn test_line_style() {
        let mut svg = started();
        svg.export_line(PointF::new(0.0, 0.0), PointF::new(10.0, 0.0), &Arrows::none(), &Stroke::new(0, 0, 0.5))
            .unwrap();
        assert_eq!(
            body(svg),
            "<line x1=\"0.0\" y1=\"0.0\" x2=\"10.0\" y2=\"0.0\" style=\"stroke:#000000;stroke-dashoffset: 0.0;\
             stroke-width:0.5;fill-rule: evenodd;\" fill=\"none\"/>"
        );
    }

    #[test]
    fn test_dash_and_phase_written_once() {
        let mut svg = started();
        svg.set_dash_unit(2.0);
        let stroke = Stroke::new(1, 1, 1.0);
        svg.export_rectangle(Point::new(10, 20), Point::new(0, 0), true, &stroke).unwrap();
        svg.export_oval(Point::new(0, 0), Point::new(10, 20), false, &stroke).unwrap();
        let out = body(svg);
        let lines: Vec<&str> = out.lines().collect();
        assert!(lines[0].starts_with("<rect x=\"0.0\" y=\"0.0\" rx=\"0\" ry=\"0\" width=\"10.0\" height=\"20.0\" "));
        assert!(lines[0].contains(";stroke-dasharray: 5.0,5.0;stroke-dashoffset: 0.0;"));
        assert!(lines[0].ends_with("fill=\"#000080\"/>"));
        assert!(lines[1].starts_with("<ellipse cx=\"5.0\" cy=\"10.0\" rx=\"5.0\" ry=\"10.0\" "));
        assert!(!lines[1].contains("dashoffset"));
    }

    #[test]
    fn test_arrow_written_before_shaft() {
        let mut svg = started();
        let arrows = Arrows { start: true, end: false, style: 0, length: 4, half_width: 2 };
        svg.export_line(PointF::new(0.0, 0.0), PointF::new(20.0, 0.0), &arrows, &Stroke::new(0, 0, 1.0)).unwrap();
        let out = body(svg);
        let lines: Vec<&str> = out.lines().collect();
        assert!(lines[0].starts_with("<polygon points=\"0.0,0.0 4.0,"));
        assert!(lines[0].ends_with("fill=\"#000000\"/>"));
        assert!(lines[1].starts_with("<line x1=\"4.0\" y1=\"0.0\" x2=\"20.0\""));
    }

    #[test]
    fn test_pads() {
        let mut svg = started();
        let pad = PadItem {
            p: Point::new(10, 10),
            style: PadStyle::Rounded,
            rx: 8,
            ry: 4,
            drill: 2,
            layer: 2,
            only_hole: false,
        };
        svg.export_pcb_pad(&pad).unwrap();
        svg.export_pcb_pad(&PadItem { only_hole: true, ..pad }).unwrap();
        let out = body(svg);
        let lines: Vec<&str> = out.lines().collect();
        assert!(lines[0].starts_with("<rect x=\"6.0\" y=\"8.0\" rx=\"2.5\" ry=\"2.5\" width=\"8.0\" height=\"4.0\""));
        assert_eq!(
            lines[1],
            "<circle cx=\"10.0\" cy=\"10.0\" r=\"1.0\" style=\"stroke:white;stroke-width:0.33\" fill=\"white\"/>"
        );
    }

    #[test]
    fn test_text_is_escaped() {
        let mut svg = started();
        let t = TextItem {
            p: Point::new(5, 5),
            size_x: 7,
            size_y: 12,
            font: "Courier New",
            bold: true,
            mirrored: false,
            italic: false,
            orientation: 90,
            layer: 0,
            text: "a<b & 'c'",
        };
        svg.export_adv_text(&t).unwrap();
        let out = body(svg);
        assert!(out.starts_with("<g transform=\"translate(5.0,5.0) rotate(-90.0)  scale("));
        assert!(out.contains(
            "<text x=\"0\" y=\"12.0\" font-family=\"Courier New\" font-size=\"12.0\" font-style=\"\" font-weight=\"bold\""
        ));
        assert!(out.contains(">a&lt;b &amp; &apos;c&apos;</text>"));
        assert!(out.ends_with("</g>"));
    }

    #[test]
    fn test_text_without_height_is_skipped() {
        let mut svg = started();
        let t = TextItem {
            p: Point::new(2, 2),
            size_x: 0,
            size_y: 0,
            font: "Courier New",
            bold: false,
            mirrored: false,
            italic: false,
            orientation: 0,
            layer: 0,
            text: "Hi",
        };
        svg.export_adv_text(&t).unwrap();
        svg.export_adv_text(&TextItem { size_x: 1, size_y: 1, ..t }).unwrap();
        let out = body(svg);
        assert!(!out.contains("NaN"), "{}", out);
        assert_eq!(out.matches("<g transform").count(), 1);
        assert!(out.contains(" scale(1.727"), "{}", out);
    }
}
