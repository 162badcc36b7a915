//! Single page PDF 1.4 output.
//!
//! Drawing operators go to an in-memory content stream. At the end the
//! sixteen objects are written in a fixed order around that stream and the
//! cross-reference table records the offset of each one as actually
//! written.

use std::collections::{BTreeMap, HashMap};
use std::f64::consts::PI;
use std::io::Write;

use fidocad_core::geom::arrow::{arrow_head, ArrowHead};
use fidocad_core::settings::DASH_STYLES;
use fidocad_core::{round_half_up, Color, Dimension, Layer, PadStyle, Point, PointF};

use crate::backend::{dash_strings, layer_color, Arrows, ExportBackend, PadItem, StyleMemo, Stroke, TextItem};
use crate::decorated;
use crate::eps::RES_MULT;
use crate::error::ExportResult;
use crate::format::{decimal, decimal_f32, round_to};
use crate::glyphs::glyph_name;
use crate::metrics::{FixedPitchMetrics, TextMetrics};

/// Blank margin added around the page, in points.
const BORDER: f64 = 5.0;
const THIN_STROKE: f64 = 0.33;
const PAD_CORNER: f64 = 4.0;
/// Bezier arcs approximating a full ellipse.
const ELLIPSE_ARCS: usize = 32;
/// Codes 128..=255 are free for characters outside ASCII.
const FIRST_EXTRA_CODE: u32 = 128;
const LAST_EXTRA_CODE: u32 = 255;
const FALLBACK_FONT: &str = "Courier";

/// Type 1 fonts referenced by the page, as (object number, base font).
const STANDARD_FONTS: [(usize, &str); 8] = [
    (6, "Courier"),
    (7, "Courier-Bold"),
    (9, "Times-Roman"),
    (10, "Times-Bold"),
    (11, "Helvetica"),
    (12, "Helvetica-Bold"),
    (13, "Symbol"),
    (14, "Symbol"),
];

/// Characters beyond ASCII, each given one code of the custom encoding.
#[derive(Debug, Default)]
struct ExtraEncoding {
    by_code: BTreeMap<u32, char>,
    by_char: HashMap<char, u32>,
}

impl ExtraEncoding {
    /// Code for `c`, `None` once every free code is taken.
    fn code(&mut self, c: char) -> Option<u32> {
        if (c as u32) < FIRST_EXTRA_CODE {
            return Some(c as u32);
        }
        if let Some(&code) = self.by_char.get(&c) {
            return Some(code);
        }
        let code = FIRST_EXTRA_CODE + self.by_code.len() as u32;
        if code > LAST_EXTRA_CODE {
            return None;
        }
        self.by_code.insert(code, c);
        self.by_char.insert(c, code);
        Some(code)
    }

    fn last_code(&self) -> u32 {
        FIRST_EXTRA_CODE - 1 + self.by_code.len() as u32
    }
}

pub struct PdfBackend<W: Write> {
    out: W,
    content: Vec<u8>,
    layers: Vec<Layer>,
    dashes: [String; DASH_STYLES],
    dash_phase: f32,
    memo: StyleMemo,
    media_box: (i32, i32),
    current_font: &'static str,
    user_font: Option<String>,
    encoding: ExtraEncoding,
    dropped_glyphs: usize,
    author: String,
    metrics: Box<dyn TextMetrics>,
}

impl<W: Write> PdfBackend<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            content: Vec::new(),
            layers: Vec::new(),
            dashes: dash_strings(1.0, " ").map(|d| format!("[{}]", d)),
            dash_phase: 0.0,
            memo: StyleMemo::default(),
            media_box: (0, 0),
            current_font: "/F1",
            user_font: None,
            encoding: ExtraEncoding::default(),
            dropped_glyphs: 0,
            author: String::new(),
            metrics: Box::new(FixedPitchMetrics::default()),
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    /// Measures glyphs with `metrics` when building the width tables.
    pub fn with_metrics(mut self, metrics: Box<dyn TextMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Characters left out because the custom encoding was full.
    pub fn dropped_glyphs(&self) -> usize {
        self.dropped_glyphs
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn color(&self, layer: usize) -> Color {
        layer_color(&self.layers, layer)
    }

    fn use_color(&mut self, c: Color) -> ExportResult<()> {
        if self.memo.set_color(c) {
            let (r, g, b) = (round_to(c.red_f()), round_to(c.green_f()), round_to(c.blue_f()));
            writeln!(self.content, "  {} {} {} rg", r, g, b)?;
            writeln!(self.content, "  {} {} {} RG", r, g, b)?;
        }
        Ok(())
    }

    fn use_color_and_width(&mut self, c: Color, width: f64) -> ExportResult<()> {
        self.use_color(c)?;
        if self.memo.set_width(width) {
            writeln!(self.content, "  {} w", decimal(width))?;
        }
        Ok(())
    }

    fn use_dash(&mut self, style: u8) -> ExportResult<()> {
        if self.memo.set_dash(style, self.dash_phase) {
            match self.dashes.get(style as usize) {
                Some(pattern) if style > 0 => {
                    writeln!(self.content, "{} {} d", pattern, decimal_f32(self.dash_phase))?
                }
                _ => writeln!(self.content, "[] 0 d")?,
            }
        }
        Ok(())
    }

    /// Ellipse inscribed in the box, as a chain of `y` Bezier arcs.
    fn ellipse(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, filled: bool) -> ExportResult<()> {
        let (cx, cy) = ((x1 + x2) / 2.0, (y1 + y2) / 2.0);
        let (rx, ry) = ((x2 - x1).abs() / 2.0, (y2 - y1).abs() / 2.0);
        let step = 2.0 * PI / ELLIPSE_ARCS as f64;
        let tt = 1.01;
        writeln!(self.content, "  {} {} m", round_to(cx + rx), round_to(cy))?;
        for i in 0..ELLIPSE_ARCS {
            let mut alpha = step * i as f64 + 2.0 * step / 3.0;
            let (xc, yc) = (cx + tt * rx * alpha.cos(), cy + tt * ry * alpha.sin());
            alpha += step / 3.0;
            let (xd, yd) = (cx + rx * alpha.cos(), cy + ry * alpha.sin());
            writeln!(self.content, "{} {} {} {} y", round_to(xc), round_to(yc), round_to(xd), round_to(yd))?;
        }
        writeln!(self.content, "  {}", if filled { "f" } else { "s" })?;
        Ok(())
    }

    fn round_rect(&mut self, x: f64, y: f64, w: f64, h: f64, r: f64, filled: bool) -> ExportResult<()> {
        let d = decimal;
        let o = &mut self.content;
        writeln!(o, "{} {} m", d(x + r), d(y))?;
        writeln!(o, "{} {} l", d(x + w - r), d(y))?;
        writeln!(o, "{} {} {} {} y", d(x + w), d(y), d(x + w), d(y + r))?;
        writeln!(o, "{} {} l", d(x + w), d(y + h - r))?;
        writeln!(o, "{} {} {} {} y", d(x + w), d(y + h), d(x + w - r), d(y + h))?;
        writeln!(o, "{} {} l", d(x + r), d(y + h))?;
        writeln!(o, "{} {} {} {} y", d(x), d(y + h), d(x), d(y + h - r))?;
        writeln!(o, "{} {} l", d(x), d(y + r))?;
        writeln!(o, "{} {} {} {} y ", d(x), d(y), d(x + r), d(y))?;
        writeln!(o, "  {}", if filled { "f" } else { "s" })?;
        Ok(())
    }

    fn select_font(&mut self, font: &str, bold: bool) -> &'static str {
        let (regular, heavy) = match font {
            "Courier" | "Courier New" => ("/F1", "/F2"),
            "Times" | "Times New Roman" | "Times Roman" => ("/F3", "/F4"),
            "Helvetica" | "Arial" => ("/F5", "/F6"),
            "Symbol" => ("/F7", "/F8"),
            _ => {
                if self.user_font.as_deref() != Some(font) {
                    log::debug!("Font '{}' is not a standard PDF font", font);
                }
                self.user_font = Some(font.to_string());
                return "/F9";
            }
        };
        if bold {
            heavy
        } else {
            regular
        }
    }

    fn show_text(&mut self, text: &str) -> ExportResult<()> {
        write!(self.content, " <")?;
        for c in text.chars() {
            match self.encoding.code(c) {
                Some(code) => write!(self.content, "{:x} ", code)?,
                None => {
                    if self.dropped_glyphs == 0 {
                        log::warn!(
                            "More than {} different non-ASCII characters, extra ones are dropped",
                            LAST_EXTRA_CODE - FIRST_EXTRA_CODE + 1
                        );
                    }
                    self.dropped_glyphs += 1;
                }
            }
        }
        writeln!(self.content, "> Tj")?;
        Ok(())
    }

    /// `/FirstChar`, `/LastChar` and `/Widths` entries of a font, widths
    /// relative to an `M` 900 units wide.
    fn widths(&self, font: &str) -> String {
        let m = self.metrics.string_width("M", font, 24.0);
        let width = |c: char| {
            if m > 0.0 {
                (900.0 * self.metrics.string_width(&c.to_string(), font, 24.0) / m) as i32
            } else {
                0
            }
        };
        let mut s = format!("    /FirstChar 32\n    /LastChar {}\n    /Widths [", self.encoding.last_code());
        for c in (32u8..128).map(char::from).chain(self.encoding.by_code.values().copied()) {
            s.push_str(&format!("{} ", width(c)));
        }
        s.push_str("]\n");
        s
    }

    fn font_objects(&self) -> BTreeMap<usize, String> {
        let mut objects = BTreeMap::new();
        for (num, base) in STANDARD_FONTS {
            let spacing = if num == 6 { " " } else { "  " };
            let body = if num == 14 {
                format!("{}    /BaseFont /{}\n", self.widths(base), base)
            } else {
                format!("    /BaseFont /{}\n{}", base, self.widths(base))
            };
            objects.insert(
                num,
                format!(
                    "{} 0 obj\n  <<   /Type /Font\n    /Subtype /Type1\n{}    /Encoding{}16 0 R\n  >> endobj\n",
                    num, body, spacing
                ),
            );
        }
        let user = self.user_font.as_deref().unwrap_or(FALLBACK_FONT);
        objects.insert(
            15,
            format!(
                "15 0 obj\n  <<   /Type /Font\n    /Subtype /Type1\n{}    /BaseFont /{}\n    /Encoding  16 0 R\n  >> endobj\n",
                self.widths(user),
                user.replace(' ', "-")
            ),
        );
        let mut differences = String::new();
        for (code, c) in &self.encoding.by_code {
            differences.push_str(&format!("{}/{} ", code, glyph_name(*c)));
        }
        objects.insert(
            16,
            format!(
                "16 0 obj\n   <<  /Type /Encoding\n    /BaseEncoding /WinAnsiEncoding\n    /Differences [{}]\n  >> endobj\n",
                differences
            ),
        );
        objects
    }
}

fn escape_literal(s: &str) -> String {
    s.replace('\\', "\\\\").replace('(', "\\(").replace(')', "\\)")
}

impl<W: Write> ExportBackend for PdfBackend<W> {
    fn export_start(&mut self, size: Dimension, layers: &[Layer], _grid: i32) -> ExportResult<()> {
        self.layers = layers.to_vec();
        self.memo = StyleMemo::default();
        self.content.clear();
        self.encoding = ExtraEncoding::default();
        self.dropped_glyphs = 0;
        self.user_font = None;
        let (w, h) = (size.width as f64, size.height as f64);
        self.media_box = ((w / RES_MULT + 1.0 + BORDER) as i32, (h / RES_MULT + 1.0 + BORDER) as i32);
        writeln!(self.content, "   1 0 0 1 0 {}  cm", decimal(h / RES_MULT + BORDER))?;
        writeln!(self.content, "  {} 0  0 {} 0 0  cm", decimal(1.0 / RES_MULT), decimal(-1.0 / RES_MULT))?;
        writeln!(self.content, "1 J")?;
        Ok(())
    }

    fn export_end(&mut self) -> ExportResult<()> {
        let mut objects = self.font_objects();
        objects.insert(
            1,
            format!(
                "1 0 obj\n<<\n  /Creator ({})\n  /Author ({})\n  /Producer (FidoCad export)\n>>\nendobj\n",
                escape_literal(&crate::creator()),
                escape_literal(&self.author)
            ),
        );
        objects.insert(2, "2 0 obj\n[ /PDF /Text  ]\nendobj\n".to_string());
        objects.insert(3, "3 0 obj\n<<\n  /Pages 5 0 R\n  /Type /Catalog\n>>\nendobj\n".to_string());
        objects.insert(
            4,
            "4 0 obj\n<< \n  /Type /Page\n  /Parent 5 0 R\n  /Resources <<\n  /Font <<\n  \
             /F1 6 0 R\n  /F2 7 0 R\n  /F3 9 0 R\n  /F4 10 0 R\n  /F5 11 0 R\n  /F6 12 0 R\n  \
             /F7 13 0 R\n  /F8 14 0 R\n  /F9 15 0 R\n>>\n/ProcSet 2 0 R\n>>\n  /Contents 8 0 R\n>>\nendobj\n"
                .to_string(),
        );
        objects.insert(
            5,
            format!(
                "5 0 obj\n  <</Kids [4 0 R ]\n    /Count 1\n    /Type /Pages\n    /MediaBox [ 0 0  {} {} ]\n  >> endobj\n",
                self.media_box.0, self.media_box.1
            ),
        );

        let mut stream = format!("8 0 obj\n  <<\n    /Length {}\n  >>\n  stream\n", self.content.len()).into_bytes();
        stream.extend_from_slice(&self.content);
        stream.extend_from_slice(b"endstream\nendobj\n");

        let mut file: Vec<u8> = b"%PDF-1.4\n".to_vec();
        let mut offsets = [0usize; 17];
        for num in [5, 6, 7, 8, 4, 2, 1, 3, 9, 10, 11, 12, 13, 14, 15, 16] {
            offsets[num] = file.len();
            if num == 8 {
                file.extend_from_slice(&stream);
            } else if let Some(body) = objects.get(&num) {
                file.extend_from_slice(body.as_bytes());
            }
        }

        let xref = file.len();
        file.extend_from_slice(b"xref \n0 17\n0000000000 65535 f \n");
        for offset in &offsets[1..] {
            file.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
        }
        file.extend_from_slice(
            format!("trailer\n<<\n  /Size 17\n  /Root 3 0 R\n  /Info 1 0 R\n>>\nstartxref\n{}\n%%EOF\n", xref).as_bytes(),
        );
        self.out.write_all(&file)?;
        self.out.flush()?;

        if let Some(font) = &self.user_font {
            log::warn!("Font '{}' is not embedded, the viewer will substitute it", font);
        }
        if self.dropped_glyphs > 0 {
            log::warn!("{} character(s) could not be encoded in the PDF text", self.dropped_glyphs);
        }
        Ok(())
    }

    fn set_dash_unit(&mut self, unit: f64) {
        self.dashes = dash_strings(unit, " ").map(|d| format!("[{}]", d));
    }

    fn set_dash_phase(&mut self, phase: f32) {
        self.dash_phase = phase;
    }

    fn export_adv_text(&mut self, t: &TextItem<'_>) -> ExportResult<()> {
        if t.text.is_empty() {
            return Ok(());
        }
        let c = self.color(t.layer);
        self.use_color_and_width(c, THIN_STROKE)?;
        writeln!(self.content, "BT")?;
        let ys = (t.size_x as f64 * 12.0 / 7.0 + 0.5) as i32;
        let font = self.select_font(t.font, t.bold);
        self.current_font = font;
        writeln!(self.content, "{} {} Tf", font, ys)?;
        writeln!(self.content, "q")?;
        writeln!(self.content, "  1 0 0 1 {} {} cm", round_to(t.p.x as f64), round_to(t.p.y as f64))?;
        if t.orientation != 0 {
            let alpha = (if t.mirrored { t.orientation } else { -t.orientation }) as f64 / 180.0 * PI;
            writeln!(
                self.content,
                "  {} {} {} {} 0 0 cm",
                round_to(alpha.cos()),
                round_to(alpha.sin()),
                round_to(-alpha.sin()),
                round_to(alpha.cos())
            )?;
        }
        writeln!(self.content, "  {} 0 0 -1 0 0 cm", if t.mirrored { -1 } else { 1 })?;
        let ratio = if t.size_x == 0 || t.size_y / t.size_x == 1 {
            1.0
        } else {
            t.size_y as f64 / t.size_x as f64 * 22.0 / 40.0
        };
        writeln!(self.content, "  1 0 0 {} 0 {} cm", round_to(ratio), decimal(-(ys as f64) * ratio * 0.8))?;

        let placed = decorated::layout(t.text, t.p.x, t.p.y, ys as f64, t.font, self.metrics.as_ref());
        let moves = decorated::pen_moves(&placed, t.p.x, t.p.y, t.font, self.metrics.as_ref());
        for (chunk, (dx, dy)) in placed.iter().zip(moves) {
            writeln!(self.content, "{} {} Tf", self.current_font, decimal_f32(chunk.size as f32))?;
            writeln!(self.content, "  1 0 0 1 {} {} cm", round_to(dx as f64), round_to(dy as f64))?;
            self.show_text(&chunk.text)?;
        }
        writeln!(self.content, "Q\nET")?;
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
        writeln!(self.content, "{} {} m ", round_half_up(a.x), round_half_up(a.y))?;
        writeln!(
            self.content,
            "{} {} {} {} {} {} c S",
            p2.x,
            p2.y,
            p3.x,
            p3.y,
            round_half_up(b.x),
            round_half_up(b.y)
        )?;
        Ok(())
    }

    fn export_connection(&mut self, p: Point, layer: usize, size: f64) -> ExportResult<()> {
        let c = self.color(layer);
        self.use_color_and_width(c, THIN_STROKE)?;
        let (x, y, r) = (p.x as f64, p.y as f64, size / 2.0);
        self.ellipse(x - r, y - r, x + r, y + r, true)
    }

    fn export_line(&mut self, p1: PointF, p2: PointF, arrows: &Arrows, stroke: &Stroke) -> ExportResult<()> {
        let c = self.color(stroke.layer);
        self.use_color_and_width(c, stroke.width)?;
        self.use_dash(stroke.dash)?;
        let (a, b) = self.shaft_with_arrows(p1, p2, arrows, stroke.layer)?;
        writeln!(self.content, "  {} {} m {} {} l S", decimal(a.x), decimal(a.y), decimal(b.x), decimal(b.y))?;
        Ok(())
    }

    fn export_oval(&mut self, p1: Point, p2: Point, filled: bool, stroke: &Stroke) -> ExportResult<()> {
        let c = self.color(stroke.layer);
        self.use_color_and_width(c, stroke.width)?;
        self.use_dash(stroke.dash)?;
        self.ellipse(p1.x as f64, p1.y as f64, p2.x as f64, p2.y as f64, filled)
    }

    fn export_pcb_line(&mut self, p1: Point, p2: Point, width: i32, layer: usize) -> ExportResult<()> {
        let c = self.color(layer);
        self.use_color_and_width(c, width as f64)?;
        self.use_dash(0)?;
        writeln!(self.content, "  {} {} m {} {} l S", p1.x, p1.y, p2.x, p2.y)?;
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
                    writeln!(self.content, "{} {} m", decimal(xd), decimal(yd))?;
                    writeln!(self.content, "{} {} l", decimal(xd + six), decimal(yd))?;
                    writeln!(self.content, "{} {} l", decimal(xd + six), decimal(yd + siy))?;
                    writeln!(self.content, "{} {} l", decimal(xd), decimal(yd + siy))?;
                    writeln!(self.content, "B")?;
                }
                PadStyle::Oval => self.ellipse(x - six / 2.0, y - siy / 2.0, x + six / 2.0, y + siy / 2.0, true)?,
            }
        }
        self.use_color_and_width(Color::WHITE, THIN_STROKE)?;
        let r = pad.drill as f64 / 2.0;
        self.ellipse(x - r, y - r, x + r, y + r, true)
    }

    fn export_polygon(&mut self, points: &[PointF], filled: bool, stroke: &Stroke) -> ExportResult<()> {
        let Some((first, rest)) = points.split_first() else {
            return Ok(());
        };
        let c = self.color(stroke.layer);
        self.use_color_and_width(c, stroke.width)?;
        self.use_dash(stroke.dash)?;
        writeln!(self.content, "  {} {} m", decimal(first.x), decimal(first.y))?;
        for p in rest {
            writeln!(self.content, "  {} {} l", decimal(p.x), decimal(p.y))?;
        }
        writeln!(self.content, "  {}", if filled { "f*" } else { "s" })?;
        Ok(())
    }

    fn export_rectangle(&mut self, p1: Point, p2: Point, filled: bool, stroke: &Stroke) -> ExportResult<()> {
        let c = self.color(stroke.layer);
        self.use_color_and_width(c, stroke.width)?;
        self.use_dash(stroke.dash)?;
        writeln!(self.content, "  {} {} m", p1.x, p1.y)?;
        writeln!(self.content, "  {} {} l", p2.x, p1.y)?;
        writeln!(self.content, "  {} {} l", p2.x, p2.y)?;
        writeln!(self.content, "  {} {} l", p1.x, p2.y)?;
        writeln!(self.content, "{}", if filled { "f" } else { "s" })?;
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
        self.use_color(c)?;
        let head = arrow_head(tip.x, tip.y, from.x, from.y, length, half_width, style);
        writeln!(self.content, "{} {} m", round_to(head.tip.x), round_to(head.tip.y))?;
        writeln!(self.content, "{} {} l", round_to(head.left.x), round_to(head.left.y))?;
        writeln!(self.content, "{} {} l", round_to(head.right.x), round_to(head.right.y))?;
        writeln!(self.content, "  {}", if ArrowHead::is_filled(style) { "f*" } else { "s" })?;
        if let Some((a, b)) = head.limiter {
            writeln!(self.content, "{} {} m", round_to(a.x), round_to(a.y))?;
            writeln!(self.content, "{} {} l s", round_to(b.x), round_to(b.y))?;
        }
        Ok(head.base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fidocad_core::standard_layers;

    fn text_item(text: &str) -> TextItem<'_> {
        TextItem {
            p: Point::new(10, 10),
            size_x: 7,
            size_y: 12,
            font: "Helvetica",
            bold: false,
            mirrored: false,
            italic: false,
            orientation: 0,
            layer: 0,
            text,
        }
    }

    fn finish(mut pdf: PdfBackend<Vec<u8>>) -> (String, usize) {
        pdf.export_end().unwrap();
        let dropped = pdf.dropped_glyphs();
        (String::from_utf8(pdf.into_inner()).unwrap(), dropped)
    }

    fn started() -> PdfBackend<Vec<u8>> {
        let mut pdf = PdfBackend::new(Vec::new());
        pdf.export_start(Dimension::new(200, 100), &standard_layers(), 5).unwrap();
        pdf
    }

    #[test]
    fn test_xref_offsets_point_at_objects() {
        let mut pdf = started();
        pdf.export_line(PointF::new(0.0, 0.0), PointF::new(10.0, 10.0), &Arrows::none(), &Stroke::new(1, 0, 0.5))
            .unwrap();
        let (text, _) = finish(pdf);
        assert!(text.starts_with("%PDF-1.4\n5 0 obj\n"));
        assert!(text.contains("/MediaBox [ 0 0  78 42 ]"));

        let xref_at: usize = text.lines().rev().nth(1).unwrap().parse().unwrap();
        assert!(text[xref_at..].starts_with("xref \n0 17\n"));
        let entries: Vec<&str> = text[xref_at..].lines().skip(3).take(16).collect();
        for (i, entry) in entries.iter().enumerate() {
            let offset: usize = entry[..10].parse().unwrap();
            assert!(text[offset..].starts_with(&format!("{} 0 obj", i + 1)), "object {}", i + 1);
        }
    }

    #[test]
    fn test_stream_length_matches_content() {
        let mut pdf = started();
        pdf.export_rectangle(Point::new(0, 0), Point::new(10, 10), true, &Stroke::new(2, 0, 1.0)).unwrap();
        let (text, _) = finish(pdf);
        let start = text.find("stream\n").unwrap() + "stream\n".len();
        let end = text.find("endstream").unwrap();
        let declared: usize = text.split("/Length ").nth(1).unwrap().lines().next().unwrap().parse().unwrap();
        assert_eq!(declared, end - start);
        assert!(text[start..end].contains("  1.0 0.0 0.0 rg\n  1.0 0.0 0.0 RG\n  1.0 w\n[] 0 d\n  0 0 m\n"));
    }

    #[test]
    fn test_extra_characters_encoded_once() {
        let mut pdf = started();
        pdf.export_adv_text(&text_item("µA µV")).unwrap();
        let (text, dropped) = finish(pdf);
        assert_eq!(dropped, 0);
        assert!(text.contains("/F5 12 Tf\n"));
        assert!(text.contains(" <80 41 20 80 56 > Tj\n"));
        assert!(text.contains("/Differences [128/mu ]"));
        assert!(text.contains("/LastChar 128\n"));
    }

    #[test]
    fn test_encoding_overflow_drops_characters() {
        let mut pdf = started();
        let many: String = (0..130u32).filter_map(|i| char::from_u32(0x400 + i)).collect();
        pdf.export_adv_text(&text_item(&many)).unwrap();
        let (text, dropped) = finish(pdf);
        assert_eq!(dropped, 2);
        assert!(text.contains("/LastChar 255\n"));
    }

    #[test]
    fn test_unknown_font_uses_user_slot() {
        let mut pdf = started();
        let t = TextItem { font: "Futura", ..text_item("x") };
        pdf.export_adv_text(&t).unwrap();
        let (text, _) = finish(pdf);
        assert!(text.contains("/F9 12 Tf\n"));
        assert!(text.contains("/BaseFont /Futura\n"));
    }

    #[test]
    fn test_exponent_continues_from_previous_chunk() {
        let mut pdf = started();
        pdf.export_adv_text(&text_item("ab^2")).unwrap();
        let (text, _) = finish(pdf);
        assert!(text.contains("  1 0 0 1 0.0 0.0 cm\n <61 62 > Tj\n"), "{}", text);
        assert!(text.contains("  1 0 0 1 0.0 5.0 cm\n <32 > Tj\n"), "{}", text);
    }
}
