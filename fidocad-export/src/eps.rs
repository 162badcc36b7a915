//! Encapsulated PostScript output.
//!
//! Device units are FidoCad's 200 dpi; the header scales them to 72 dpi
//! points and flips the y axis so the drawing reads top-down.

use std::io::Write;

use fidocad_core::geom::arrow::{arrow_head, ArrowHead};
use fidocad_core::settings::DASH_STYLES;
use fidocad_core::{round_half_up, Color, Dimension, Layer, PadStyle, Point, PointF};

use crate::backend::{dash_strings, layer_color, Arrows, ExportBackend, PadItem, StyleMemo, Stroke, TextItem};
use crate::decorated;
use crate::error::ExportResult;
use crate::format::{decimal, decimal_f32, round_to, truncate_to};
use crate::metrics::{FixedPitchMetrics, TextMetrics};

/// Device units per PostScript point.
pub const RES_MULT: f64 = 200.0 / 72.0;

const THIN_STROKE: f64 = 0.33;
const PAD_CORNER: f64 = 4.0;

const ELLIPSE_DICT: &str = "/ellipsedict 8 dict def
ellipsedict /mtrx matrix put
/ellipse
   { ellipsedict begin
     /endangle exch def
     /startangle exch def
     /yrad exch def
     /xrad exch def
     /y exch def
     /x exch def
     /savematrix mtrx currentmatrix def
     x y translate
     xrad yrad scale
     0 0 1 startangle endangle arc
     savematrix setmatrix
     end
   } def
";

pub struct EpsBackend<W: Write> {
    out: W,
    layers: Vec<Layer>,
    dashes: [String; DASH_STYLES],
    dash_phase: f32,
    memo: StyleMemo,
    creation_date: Option<String>,
    metrics: Box<dyn TextMetrics>,
}

impl<W: Write> EpsBackend<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            layers: Vec::new(),
            dashes: bracketed(dash_strings(1.0, " ")),
            dash_phase: 0.0,
            memo: StyleMemo::default(),
            creation_date: None,
            metrics: Box::new(FixedPitchMetrics::default()),
        }
    }

    /// Measures text chunks with `metrics` when placing exponents and
    /// indices.
    pub fn with_metrics(mut self, metrics: Box<dyn TextMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Writes `date` as the creation date instead of the current time.
    pub fn with_creation_date(mut self, date: impl Into<String>) -> Self {
        self.creation_date = Some(date.into());
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn color(&self, layer: usize) -> Color {
        layer_color(&self.layers, layer)
    }

    /// Sets the color, and the line width when `width` is positive.
    fn use_color_and_width(&mut self, c: Color, width: f64) -> ExportResult<()> {
        if self.memo.set_color(c) {
            writeln!(
                self.out,
                "  {} {} {} setrgbcolor",
                round_to(c.red_f()),
                round_to(c.green_f()),
                round_to(c.blue_f())
            )?;
        }
        if width > 0.0 && self.memo.set_width(width) {
            writeln!(self.out, "  {} setlinewidth", decimal(width))?;
        }
        Ok(())
    }

    fn use_dash(&mut self, style: u8) -> ExportResult<()> {
        if self.memo.set_dash(style, self.dash_phase) {
            match self.dashes.get(style as usize) {
                Some(pattern) if style > 0 => {
                    writeln!(self.out, "{} {} setdash", pattern, decimal_f32(self.dash_phase))?
                }
                _ => writeln!(self.out, "[] 0 setdash")?,
            }
        }
        Ok(())
    }

    fn ellipse(&mut self, cx: f64, cy: f64, rx: f64, ry: f64, filled: bool) -> ExportResult<()> {
        writeln!(self.out, "newpath")?;
        writeln!(self.out, "{} {} {} {} 0 360 ellipse", decimal(cx), decimal(cy), decimal(rx), decimal(ry))?;
        writeln!(self.out, "{}", if filled { "fill" } else { "stroke" })?;
        Ok(())
    }

    fn round_rect(&mut self, x: f64, y: f64, w: f64, h: f64, r: f64, filled: bool) -> ExportResult<()> {
        let d = decimal;
        let o = &mut self.out;
        writeln!(o, "{} {} moveto", d(x + r), d(y))?;
        writeln!(o, "{} {} lineto", d(x + w - r), d(y))?;
        writeln!(o, "{} {} {} {} {} {} curveto", d(x + w), d(y), d(x + w), d(y), d(x + w), d(y + r))?;
        writeln!(o, "{} {} lineto", d(x + w), d(y + h - r))?;
        writeln!(o, "{} {} {} {} {} {} curveto", d(x + w), d(y + h), d(x + w), d(y + h), d(x + w - r), d(y + h))?;
        writeln!(o, "{} {} lineto", d(x + r), d(y + h))?;
        writeln!(o, "{} {} {} {} {} {} curveto", d(x), d(y + h), d(x), d(y + h), d(x), d(y + h - r))?;
        writeln!(o, "{} {} lineto", d(x), d(y + r))?;
        writeln!(o, "{} {} {} {} {} {} curveto", d(x), d(y), d(x), d(y), d(x + r), d(y))?;
        writeln!(o, "  {}", if filled { "fill" } else { "stroke" })?;
        Ok(())
    }

    fn set_font(&mut self, font: &str, size: f64) -> ExportResult<()> {
        writeln!(self.out, "/{} findfont\n{} scalefont\nsetfont", font, size as i32)?;
        Ok(())
    }
}

fn bracketed(dashes: [String; DASH_STYLES]) -> [String; DASH_STYLES] {
    dashes.map(|d| if d.is_empty() { d } else { format!("[{}]", d) })
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('(', "\\050").replace(')', "\\051")
}

impl<W: Write> ExportBackend for EpsBackend<W> {
    fn export_start(&mut self, size: Dimension, layers: &[Layer], _grid: i32) -> ExportResult<()> {
        self.layers = layers.to_vec();
        self.memo = StyleMemo::default();
        let (w, h) = (size.width as f64, size.height as f64);
        let date = self
            .creation_date
            .clone()
            .unwrap_or_else(|| chrono::Local::now().format("%Y/%m/%d %H:%M:%S").to_string());

        writeln!(self.out, "%!PS-Adobe-3.0 EPSF-3.0")?;
        writeln!(self.out, "%%Pages: 0")?;
        writeln!(self.out, "%%BoundingBox: -1 -1 {} {}", (w / RES_MULT + 1.0) as i32, (h / RES_MULT + 1.0) as i32)?;
        writeln!(self.out, "%%Creator: {}", crate::creator())?;
        writeln!(self.out, "%%CreationDate: {}", date)?;
        writeln!(self.out, "%%EndComments")?;
        write!(self.out, "{}", ELLIPSE_DICT)?;
        writeln!(self.out, "0 {} translate", decimal(h / RES_MULT))?;
        writeln!(self.out, "{} {} scale", decimal(1.0 / RES_MULT), decimal(-1.0 / RES_MULT))?;
        Ok(())
    }

    fn export_end(&mut self) -> ExportResult<()> {
        writeln!(self.out, "%%EOF")?;
        self.out.flush()?;
        Ok(())
    }

    fn set_dash_unit(&mut self, unit: f64) {
        self.dashes = bracketed(dash_strings(unit, " "));
    }

    fn set_dash_phase(&mut self, phase: f32) {
        self.dash_phase = phase;
    }

    fn export_adv_text(&mut self, t: &TextItem<'_>) -> ExportResult<()> {
        let c = self.color(t.layer);
        self.use_color_and_width(c, -1.0)?;
        let font_size = (t.size_x as f64 * 12.0 / 7.0 + 0.5) as i32 as f64;
        let font = format!("{}{}", t.font.replace(' ', "-"), if t.bold { "-Bold" } else { "" });

        self.set_font(&font, font_size)?;
        writeln!(self.out, "newpath")?;
        writeln!(self.out, "{} {} moveto", t.p.x, t.p.y)?;
        writeln!(self.out, "gsave")?;
        if t.orientation != 0 {
            writeln!(self.out, "  {} rotate", if t.mirrored { t.orientation } else { -t.orientation })?;
        }
        writeln!(self.out, "  {} -1 scale", if t.mirrored { -1 } else { 1 })?;
        let ratio = if t.size_x == 0 || t.size_y / t.size_x == 1 {
            1.0
        } else {
            t.size_y as f64 / t.size_x as f64 * 22.0 / 40.0
        };
        writeln!(self.out, "  1 {} scale", decimal(ratio))?;
        writeln!(self.out, "  0 {} rmoveto", decimal(-font_size * 0.8))?;
        self.use_color_and_width(c, THIN_STROKE)?;

        let placed = decorated::layout(t.text, t.p.x, t.p.y, font_size, &font, self.metrics.as_ref());
        let moves = decorated::pen_moves(&placed, t.p.x, t.p.y, &font, self.metrics.as_ref());
        for (chunk, (dx, dy)) in placed.iter().zip(moves) {
            self.set_font(&font, chunk.size)?;
            writeln!(self.out, "{} {} rmoveto", decimal(dx as f64), decimal(dy as f64))?;
            writeln!(self.out, "  ({}) show", escape(&chunk.text))?;
        }
        writeln!(self.out, "grestore")?;
        Ok(())
    }

    fn export_bezier(&mut self, points: [Point; 4], arrows: &Arrows, stroke: &Stroke) -> ExportResult<()> {
        let c = self.color(stroke.layer);
        self.use_color_and_width(c, stroke.width)?;
        self.use_dash(stroke.dash)?;
        let [p1, p2, p3, p4] = points;
        let f = |p: Point| PointF::new(p.x as f64, p.y as f64);
        let (a, _) = self.shaft_with_arrows(f(p1), f(p2), &Arrows { end: false, ..*arrows }, stroke.layer)?;
        let (_, b) = self.shaft_with_arrows(f(p3), f(p4), &Arrows { start: false, ..*arrows }, stroke.layer)?;
        let (a, b) = ((round_half_up(a.x), round_half_up(a.y)), (round_half_up(b.x), round_half_up(b.y)));
        writeln!(self.out, "{} {} moveto ", a.0, a.1)?;
        writeln!(self.out, "{} {} {} {} {} {} curveto stroke", p2.x, p2.y, p3.x, p3.y, b.0, b.1)?;
        Ok(())
    }

    fn export_connection(&mut self, p: Point, layer: usize, size: f64) -> ExportResult<()> {
        let c = self.color(layer);
        self.use_color_and_width(c, THIN_STROKE)?;
        writeln!(self.out, "newpath")?;
        writeln!(self.out, "{} {} {} {} 0 360 ellipse", p.x, p.y, decimal(size / 2.0), decimal(size / 2.0))?;
        writeln!(self.out, "fill")?;
        Ok(())
    }

    fn export_line(&mut self, p1: PointF, p2: PointF, arrows: &Arrows, stroke: &Stroke) -> ExportResult<()> {
        let c = self.color(stroke.layer);
        self.use_color_and_width(c, stroke.width)?;
        self.use_dash(stroke.dash)?;
        let (a, b) = self.shaft_with_arrows(p1, p2, arrows, stroke.layer)?;
        writeln!(
            self.out,
            "{} {} moveto {} {} lineto stroke",
            decimal(a.x),
            decimal(a.y),
            decimal(b.x),
            decimal(b.y)
        )?;
        Ok(())
    }

    fn export_oval(&mut self, p1: Point, p2: Point, filled: bool, stroke: &Stroke) -> ExportResult<()> {
        let c = self.color(stroke.layer);
        self.use_color_and_width(c, stroke.width)?;
        self.use_dash(stroke.dash)?;
        self.ellipse(
            (p1.x + p2.x) as f64 / 2.0,
            (p1.y + p2.y) as f64 / 2.0,
            (p2.x - p1.x).abs() as f64 / 2.0,
            (p2.y - p1.y).abs() as f64 / 2.0,
            filled,
        )
    }

    fn export_pcb_line(&mut self, p1: Point, p2: Point, width: i32, layer: usize) -> ExportResult<()> {
        let c = self.color(layer);
        self.use_color_and_width(c, width as f64)?;
        self.use_dash(0)?;
        writeln!(self.out, "1 setlinecap")?;
        writeln!(self.out, "{} {} moveto {} {} lineto stroke", p1.x, p1.y, p2.x, p2.y)?;
        Ok(())
    }

    fn export_pcb_pad(&mut self, pad: &PadItem) -> ExportResult<()> {
        let c = self.color(pad.layer);
        self.use_color_and_width(c, THIN_STROKE)?;
        let (x, y) = (pad.p.x as f64, pad.p.y as f64);
        let (six, siy) = (pad.rx as f64, pad.ry as f64);
        if !pad.only_hole {
            match pad.style {
                PadStyle::Rounded => self.round_rect(x - six / 2.0, y - siy / 2.0, six, siy, PAD_CORNER, true)?,
                PadStyle::Square => {
                    let (xd, yd) = (x - six / 2.0, y - siy / 2.0);
                    writeln!(self.out, "newpath")?;
                    writeln!(self.out, "{} {} moveto", decimal(xd), decimal(yd))?;
                    writeln!(self.out, "{} {} lineto", decimal(xd + six), decimal(yd))?;
                    writeln!(self.out, "{} {} lineto", decimal(xd + six), decimal(yd + siy))?;
                    writeln!(self.out, "{} {} lineto", decimal(xd), decimal(yd + siy))?;
                    writeln!(self.out, "closepath")?;
                    writeln!(self.out, "fill")?;
                }
                PadStyle::Oval => {
                    writeln!(self.out, "newpath")?;
                    writeln!(self.out, "{} {} {} {} 0 360 ellipse", pad.p.x, pad.p.y, decimal(six / 2.0), decimal(siy / 2.0))?;
                    writeln!(self.out, "fill")?;
                }
            }
        }
        self.use_color_and_width(Color::WHITE, THIN_STROKE)?;
        let r = decimal(pad.drill as f64 / 2.0);
        writeln!(self.out, "newpath")?;
        writeln!(self.out, "{} {} {} {} 0 360 ellipse", pad.p.x, pad.p.y, r, r)?;
        writeln!(self.out, "fill")?;
        Ok(())
    }

    fn export_polygon(&mut self, points: &[PointF], filled: bool, stroke: &Stroke) -> ExportResult<()> {
        let Some((first, rest)) = points.split_first() else {
            return Ok(());
        };
        let c = self.color(stroke.layer);
        self.use_color_and_width(c, stroke.width)?;
        self.use_dash(stroke.dash)?;
        writeln!(self.out, "newpath")?;
        writeln!(self.out, "{} {} moveto", decimal(first.x), decimal(first.y))?;
        for p in rest {
            writeln!(self.out, "{} {} lineto", decimal(p.x), decimal(p.y))?;
        }
        writeln!(self.out, "closepath")?;
        writeln!(self.out, "{}", if filled { "fill" } else { "stroke" })?;
        Ok(())
    }

    fn export_rectangle(&mut self, p1: Point, p2: Point, filled: bool, stroke: &Stroke) -> ExportResult<()> {
        let c = self.color(stroke.layer);
        self.use_color_and_width(c, stroke.width)?;
        self.use_dash(stroke.dash)?;
        let t = |v: i32| truncate_to(v as f64, 3);
        writeln!(self.out, "newpath")?;
        writeln!(self.out, "{} {} moveto", t(p1.x), t(p1.y))?;
        writeln!(self.out, "{} {} lineto", t(p2.x), t(p1.y))?;
        writeln!(self.out, "{} {} lineto", t(p2.x), t(p2.y))?;
        writeln!(self.out, "{} {} lineto", t(p1.x), t(p2.y))?;
        writeln!(self.out, "closepath")?;
        writeln!(self.out, "{}", if filled { "fill" } else { "stroke" })?;
        Ok(())
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
        let c = self.color(layer);
        self.use_color_and_width(c, -1.0)?;
        let head = arrow_head(tip.x, tip.y, from.x, from.y, length, half_width, style);
        writeln!(self.out, "newpath")?;
        writeln!(self.out, "{} {} moveto", round_to(head.tip.x), round_to(head.tip.y))?;
        writeln!(self.out, "{} {} lineto", round_to(head.left.x), round_to(head.left.y))?;
        writeln!(self.out, "{} {} lineto", round_to(head.right.x), round_to(head.right.y))?;
        writeln!(self.out, "closepath")?;
        writeln!(self.out, "{} ", if ArrowHead::is_filled(style) { "fill" } else { "stroke" })?;
        if let Some((a, b)) = head.limiter {
            writeln!(self.out, "{} {} moveto", round_to(a.x), round_to(a.y))?;
            writeln!(self.out, "{} {} lineto", round_to(b.x), round_to(b.y))?;
            writeln!(self.out, "stroke")?;
        }
        Ok(head.base)
    }
}
