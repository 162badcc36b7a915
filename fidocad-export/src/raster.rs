//! Bitmap output on a tiny-skia pixmap.
//!
//! Every primitive becomes one path, filled or stroked with its layer color
//! at the layer alpha, so overlapping parts of a single stroke never blend
//! twice. Lines use round caps and joins. Text is set in a bundled
//! monospaced face, laid out like the vector backends lay it out.

use std::sync::OnceLock;

use fidocad_core::geom::arrow::{arrow_head, ArrowHead};
use fidocad_core::settings::DASH_STYLES;
use fidocad_core::{Color, Dimension, Layer, PadStyle, Point, PointF};
use image::{Rgba, RgbaImage};
use rusttype::{Font, OutlineBuilder, Scale};
use tiny_skia::{FillRule, LineCap, LineJoin, Paint, Path, PathBuilder, Pixmap, Rect, StrokeDash, Transform};

use crate::backend::{layer_color, scaled_dashes, Arrows, ExportBackend, PadItem, Stroke, TextItem};
use crate::decorated;
use crate::error::{ExportError, ExportResult};
use crate::metrics::{text_x_scale, TextMetrics};

/// Corner radius of rounded pads, in device units.
const PAD_CORNER: f32 = 2.5;
/// Control point distance approximating a quarter circle with a cubic.
const KAPPA: f32 = 0.552_284_8;
/// Horizontal shear of italic text.
const ITALIC_SLANT: f32 = 0.2;
/// Extra outline drawn around bold glyphs, relative to the font size.
const BOLD_WEIGHT: f32 = 0.04;

const TEXT_FONT: &[u8] = include_bytes!("../assets/fonts/DejaVuSansMono.ttf");

/// The face used for every text item, whatever font the drawing names.
fn text_font() -> Option<&'static Font<'static>> {
    static FONT: OnceLock<Option<Font<'static>>> = OnceLock::new();
    FONT.get_or_init(|| Font::try_from_bytes(TEXT_FONT)).as_ref()
}

/// Advance widths of the bundled face.
pub struct GlyphMetrics {
    font: &'static Font<'static>,
}

impl GlyphMetrics {
    /// `None` only if the bundled face cannot be read.
    pub fn bundled() -> Option<Self> {
        text_font().map(|font| Self { font })
    }
}

impl TextMetrics for GlyphMetrics {
    fn string_width(&self, text: &str, _font: &str, size: f64) -> f64 {
        let scale = Scale::uniform(size as f32);
        text.chars().map(|c| self.font.glyph(c).scaled(scale).h_metrics().advance_width as f64).sum()
    }
}

/// Feeds glyph outlines into a path, shifted to the glyph's pen position.
struct GlyphPath<'a> {
    pb: &'a mut PathBuilder,
    dx: f32,
    dy: f32,
}

impl OutlineBuilder for GlyphPath<'_> {
    fn move_to(&mut self, x: f32, y: f32) {
        self.pb.move_to(x + self.dx, y + self.dy);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.pb.line_to(x + self.dx, y + self.dy);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        self.pb.quad_to(x1 + self.dx, y1 + self.dy, x + self.dx, y + self.dy);
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        self.pb.cubic_to(x1 + self.dx, y1 + self.dy, x2 + self.dx, y2 + self.dy, x + self.dx, y + self.dy);
    }

    fn close(&mut self) {
        self.pb.close();
    }
}

fn fpoint(p: Point) -> PointF {
    PointF::new(p.x as f64, p.y as f64)
}

fn polyline(points: &[PointF], close: bool) -> Option<Path> {
    let (first, rest) = points.split_first()?;
    let mut pb = PathBuilder::new();
    pb.move_to(first.x as f32, first.y as f32);
    if rest.is_empty() {
        pb.line_to(first.x as f32, first.y as f32);
    }
    for p in rest {
        pb.line_to(p.x as f32, p.y as f32);
    }
    if close {
        pb.close();
    }
    pb.finish()
}

fn rect_points(p1: PointF, p2: PointF) -> [PointF; 4] {
    let (x0, x1) = (p1.x.min(p2.x), p1.x.max(p2.x));
    let (y0, y1) = (p1.y.min(p2.y), p1.y.max(p2.y));
    [PointF::new(x0, y0), PointF::new(x1, y0), PointF::new(x1, y1), PointF::new(x0, y1)]
}

/// Ellipse inscribed in the box `p1`-`p2`; a flat box degrades to a line.
fn oval(p1: PointF, p2: PointF) -> Option<Path> {
    Rect::from_ltrb(p1.x.min(p2.x) as f32, p1.y.min(p2.y) as f32, p1.x.max(p2.x) as f32, p1.y.max(p2.y) as f32)
        .and_then(PathBuilder::from_oval)
        .or_else(|| polyline(&[p1, p2], false))
}

fn round_rect(cx: f32, cy: f32, w: f32, h: f32, r: f32) -> Option<Path> {
    let r = r.min(w / 2.0).min(h / 2.0).max(0.0);
    let (l, t, rt, b) = (cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0);
    let k = r * KAPPA;
    let mut pb = PathBuilder::new();
    pb.move_to(l + r, t);
    pb.line_to(rt - r, t);
    pb.cubic_to(rt - r + k, t, rt, t + r - k, rt, t + r);
    pb.line_to(rt, b - r);
    pb.cubic_to(rt, b - r + k, rt - r + k, b, rt - r, b);
    pb.line_to(l + r, b);
    pb.cubic_to(l + r - k, b, l, b - r + k, l, b - r);
    pb.line_to(l, t + r);
    pb.cubic_to(l, t + r - k, l + r - k, t, l + r, t);
    pb.close();
    pb.finish()
}

pub struct RasterBackend {
    pixmap: Option<Pixmap>,
    antialias: bool,
    layers: Vec<Layer>,
    dashes: [Vec<f32>; DASH_STYLES],
    dash_phase: f32,
    /// Width of the shape being drawn, reused for the outline of its
    /// empty arrowheads.
    stroke_width: f64,
    skipped_text: usize,
}

impl Default for RasterBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl RasterBackend {
    pub fn new() -> Self {
        Self {
            pixmap: None,
            antialias: true,
            layers: Vec::new(),
            dashes: scaled_dashes(1.0),
            dash_phase: 0.0,
            stroke_width: 1.0,
            skipped_text: 0,
        }
    }

    pub fn with_antialias(mut self, antialias: bool) -> Self {
        self.antialias = antialias;
        self
    }

    /// The canvas as straight-alpha RGBA; empty before `export_start`.
    pub fn to_image(&self) -> RgbaImage {
        let Some(pixmap) = &self.pixmap else {
            return RgbaImage::new(0, 0);
        };
        let mut img = RgbaImage::new(pixmap.width(), pixmap.height());
        for (dst, src) in img.pixels_mut().zip(pixmap.pixels()) {
            let c = src.demultiply();
            *dst = Rgba([c.red(), c.green(), c.blue(), c.alpha()]);
        }
        img
    }

    pub fn into_image(self) -> RgbaImage {
        self.to_image()
    }

    /// Text items that could not be drawn because the face failed to load.
    pub fn skipped_text(&self) -> usize {
        self.skipped_text
    }

    fn paint(&self, color: Color, alpha: f32) -> Paint<'static> {
        let mut paint = Paint::default();
        paint.set_color_rgba8(color.r, color.g, color.b, (alpha.clamp(0.0, 1.0) * 255.0).round() as u8);
        paint.anti_alias = self.antialias;
        paint
    }

    fn layer_paint(&self, layer: usize) -> Paint<'static> {
        let alpha = self.layers.get(layer).map(|l| l.alpha).unwrap_or(1.0);
        self.paint(layer_color(&self.layers, layer), alpha)
    }

    fn line_style(&self, width: f64, dash: u8) -> tiny_skia::Stroke {
        let pattern = if dash > 0 { self.dashes.get(dash as usize) } else { None };
        tiny_skia::Stroke {
            width: width.max(0.0) as f32,
            line_cap: LineCap::Round,
            line_join: LineJoin::Round,
            dash: pattern.and_then(|p| StrokeDash::new(p.clone(), self.dash_phase)),
            ..Default::default()
        }
    }

    fn fill_path(&mut self, path: Option<Path>, paint: &Paint<'_>) {
        if let (Some(pixmap), Some(path)) = (self.pixmap.as_mut(), path) {
            pixmap.fill_path(&path, paint, FillRule::EvenOdd, Transform::identity(), None);
        }
    }

    fn fill(&mut self, path: Option<Path>, layer: usize) {
        let paint = self.layer_paint(layer);
        self.fill_path(path, &paint);
    }

    fn outline(&mut self, path: Option<Path>, stroke: &Stroke) {
        let paint = self.layer_paint(stroke.layer);
        let style = self.line_style(stroke.width, stroke.dash);
        if let (Some(pixmap), Some(path)) = (self.pixmap.as_mut(), path) {
            pixmap.stroke_path(&path, &paint, &style, Transform::identity(), None);
        }
    }

    fn shape(&mut self, path: Option<Path>, filled: bool, stroke: &Stroke) {
        if filled {
            self.fill(path, stroke.layer);
        } else {
            self.outline(path, stroke);
        }
    }

    /// Glyph outlines of `t` in text space: origin at the anchor, y down,
    /// baseline one font size below the anchor.
    fn text_path(t: &TextItem<'_>, font: &Font<'static>, metrics: &GlyphMetrics) -> Option<Path> {
        let mut pb = PathBuilder::new();
        for chunk in decorated::layout(t.text, t.p.x, t.p.y, t.size_y as f64, t.font, metrics) {
            let scale = Scale::uniform(chunk.size as f32);
            let mut x = (chunk.x - t.p.x) as f32;
            let baseline = (chunk.size + (chunk.y - t.p.y) as f64) as f32;
            for c in chunk.text.chars() {
                let glyph = font.glyph(c).scaled(scale);
                let advance = glyph.h_metrics().advance_width;
                glyph.build_outline(&mut GlyphPath { pb: &mut pb, dx: x, dy: baseline });
                x += advance;
            }
        }
        pb.finish()
    }
}

impl ExportBackend for RasterBackend {
    fn export_start(&mut self, size: Dimension, layers: &[Layer], _grid: i32) -> ExportResult<()> {
        let (w, h) = (size.width.max(1) as u32, size.height.max(1) as u32);
        let mut pixmap = Pixmap::new(w, h).ok_or(ExportError::Canvas { width: w, height: h })?;
        pixmap.fill(tiny_skia::Color::WHITE);
        self.pixmap = Some(pixmap);
        self.layers = layers.to_vec();
        self.skipped_text = 0;
        Ok(())
    }

    fn export_end(&mut self) -> ExportResult<()> {
        if self.skipped_text > 0 {
            log::warn!("{} text items not drawn: bundled font unavailable", self.skipped_text);
        }
        Ok(())
    }

    fn set_dash_unit(&mut self, unit: f64) {
        self.dashes = scaled_dashes(unit);
    }

    fn set_dash_phase(&mut self, phase: f32) {
        self.dash_phase = phase;
    }

    fn export_adv_text(&mut self, t: &TextItem<'_>) -> ExportResult<()> {
        if t.size_y <= 0 || t.size_x <= 0 {
            log::debug!("Text '{}' too small to draw", t.text);
            return Ok(());
        }
        let Some(metrics) = GlyphMetrics::bundled() else {
            self.skipped_text += 1;
            return Ok(());
        };
        let Some(path) = Self::text_path(t, metrics.font, &metrics) else {
            return Ok(());
        };

        let mut x_scale = text_x_scale(t.size_x, t.size_y) as f32;
        if t.mirrored {
            x_scale = -x_scale;
        }
        let angle = if t.mirrored { t.orientation } else { -t.orientation } as f32;
        let mut transform = Transform::from_translate(t.p.x as f32, t.p.y as f32).pre_rotate(angle).pre_scale(x_scale, 1.0);
        if t.italic {
            transform = transform.pre_concat(Transform::from_skew(-ITALIC_SLANT, 0.0));
        }

        let paint = self.layer_paint(t.layer);
        let bold = tiny_skia::Stroke { width: t.size_y as f32 * BOLD_WEIGHT, ..Default::default() };
        if let Some(pixmap) = self.pixmap.as_mut() {
            pixmap.fill_path(&path, &paint, FillRule::Winding, transform, None);
            if t.bold {
                pixmap.stroke_path(&path, &paint, &bold, transform, None);
            }
        }
        Ok(())
    }

    fn export_bezier(&mut self, points: [Point; 4], arrows: &Arrows, stroke: &Stroke) -> ExportResult<()> {
        self.stroke_width = stroke.width;
        let [p1, p2, p3, p4] = points.map(fpoint);
        let (a, _) = self.shaft_with_arrows(p1, p2, &Arrows { end: false, ..*arrows }, stroke.layer)?;
        let (_, b) = self.shaft_with_arrows(p3, p4, &Arrows { start: false, ..*arrows }, stroke.layer)?;
        let mut pb = PathBuilder::new();
        pb.move_to(a.x as f32, a.y as f32);
        pb.cubic_to(p2.x as f32, p2.y as f32, p3.x as f32, p3.y as f32, b.x as f32, b.y as f32);
        self.outline(pb.finish(), stroke);
        Ok(())
    }

    fn export_connection(&mut self, p: Point, layer: usize, size: f64) -> ExportResult<()> {
        let path = PathBuilder::from_circle(p.x as f32, p.y as f32, (size / 2.0) as f32);
        self.fill(path, layer);
        Ok(())
    }

    fn export_line(&mut self, p1: PointF, p2: PointF, arrows: &Arrows, stroke: &Stroke) -> ExportResult<()> {
        self.stroke_width = stroke.width;
        let (a, b) = self.shaft_with_arrows(p1, p2, arrows, stroke.layer)?;
        self.outline(polyline(&[a, b], false), stroke);
        Ok(())
    }

    fn export_oval(&mut self, p1: Point, p2: Point, filled: bool, stroke: &Stroke) -> ExportResult<()> {
        self.shape(oval(fpoint(p1), fpoint(p2)), filled, stroke);
        Ok(())
    }

    fn export_pcb_line(&mut self, p1: Point, p2: Point, width: i32, layer: usize) -> ExportResult<()> {
        self.outline(polyline(&[fpoint(p1), fpoint(p2)], false), &Stroke::new(layer, 0, width as f64));
        Ok(())
    }

    fn export_pcb_pad(&mut self, pad: &PadItem) -> ExportResult<()> {
        let (cx, cy) = (pad.p.x as f32, pad.p.y as f32);
        if pad.only_hole {
            let paint = self.paint(Color::WHITE, 1.0);
            self.fill_path(PathBuilder::from_circle(cx, cy, pad.drill as f32 / 2.0), &paint);
            return Ok(());
        }
        let (w, h) = (pad.rx as f32, pad.ry as f32);
        let c = fpoint(pad.p);
        let (hw, hh) = (w as f64 / 2.0, h as f64 / 2.0);
        let corner1 = PointF::new(c.x - hw, c.y - hh);
        let corner2 = PointF::new(c.x + hw, c.y + hh);
        let path = match pad.style {
            PadStyle::Oval => oval(corner1, corner2),
            PadStyle::Square => polyline(&rect_points(corner1, corner2), true),
            PadStyle::Rounded => round_rect(cx, cy, w, h, PAD_CORNER),
        };
        self.fill(path, pad.layer);
        Ok(())
    }

    fn export_polygon(&mut self, points: &[PointF], filled: bool, stroke: &Stroke) -> ExportResult<()> {
        self.shape(polyline(points, true), filled, stroke);
        Ok(())
    }

    fn export_rectangle(&mut self, p1: Point, p2: Point, filled: bool, stroke: &Stroke) -> ExportResult<()> {
        self.shape(polyline(&rect_points(fpoint(p1), fpoint(p2)), true), filled, stroke);
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
        let head = arrow_head(tip.x, tip.y, from.x, from.y, length, half_width, style);
        let triangle = polyline(&[head.tip, head.left, head.right], true);
        let solid = Stroke::new(layer, 0, self.stroke_width);
        if ArrowHead::is_filled(style) {
            self.fill(triangle, layer);
        } else {
            self.outline(triangle, &solid);
        }
        if let Some((a, b)) = head.limiter {
            self.outline(polyline(&[a, b], false), &solid);
        }
        Ok(head.base)
    }
}
