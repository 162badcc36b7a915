//! The contract every output format implements.
//!
//! The engine walks the drawing and calls one method per primitive kind with
//! coordinates already mapped to device units. Backends own their output
//! and any per-session state (current color, line width, dash memo).

use fidocad_core::geom::arrow::arrow_head;
use fidocad_core::settings::{DASH_PATTERNS, DASH_STYLES};
use fidocad_core::{Color, Dimension, Layer, MacroLibrary, PadStyle, Point, PointF};

use crate::error::ExportResult;
use crate::format::decimal_f32;

/// Stroke attributes shared by outlined shapes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stroke {
    pub layer: usize,
    /// Index into the dash table, 0 for a solid line.
    pub dash: u8,
    /// Line width in device units.
    pub width: f64,
}

impl Stroke {
    pub fn new(layer: usize, dash: u8, width: f64) -> Self {
        Self { layer, dash, width }
    }
}

/// Arrowheads requested at the ends of a line, sizes in device units.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Arrows {
    pub start: bool,
    pub end: bool,
    pub style: u8,
    pub length: i32,
    pub half_width: i32,
}

impl Arrows {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn any(&self) -> bool {
        self.start || self.end
    }
}

/// A text item: advanced text primitives and name/value labels alike.
#[derive(Debug, Clone, PartialEq)]
pub struct TextItem<'a> {
    pub p: Point,
    pub size_x: i32,
    pub size_y: i32,
    pub font: &'a str,
    pub bold: bool,
    pub mirrored: bool,
    pub italic: bool,
    /// Degrees, counter-clockwise.
    pub orientation: i32,
    pub layer: usize,
    pub text: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PadItem {
    pub p: Point,
    pub style: PadStyle,
    pub rx: i32,
    pub ry: i32,
    pub drill: i32,
    pub layer: usize,
    /// Draw the drill hole only, in the background color.
    pub only_hole: bool,
}

/// Everything a backend needs to place a macro as a single instance.
#[derive(Debug, Clone)]
pub struct MacroPlacement<'a> {
    pub p: Point,
    pub mirror: bool,
    /// Degrees, a multiple of 90.
    pub orientation: i32,
    pub key: &'a str,
    /// Primitive lines of the macro body.
    pub body: &'a str,
    pub name: &'a str,
    pub name_pos: Point,
    pub value: &'a str,
    pub value_pos: Point,
    pub font: &'a str,
    pub font_size: i32,
    pub library: &'a MacroLibrary,
}

pub trait ExportBackend {
    /// Writes the preamble. `layers` is the table used for colors.
    fn export_start(&mut self, size: Dimension, layers: &[Layer], grid: i32) -> ExportResult<()>;

    /// Writes the trailer and flushes.
    fn export_end(&mut self) -> ExportResult<()>;

    fn set_dash_unit(&mut self, _unit: f64) {}

    fn set_dash_phase(&mut self, _phase: f32) {}

    fn export_adv_text(&mut self, text: &TextItem<'_>) -> ExportResult<()>;

    fn export_bezier(&mut self, points: [Point; 4], arrows: &Arrows, stroke: &Stroke) -> ExportResult<()>;

    fn export_connection(&mut self, p: Point, layer: usize, size: f64) -> ExportResult<()>;

    fn export_line(&mut self, p1: PointF, p2: PointF, arrows: &Arrows, stroke: &Stroke) -> ExportResult<()>;

    /// Returns true when the macro was written as one instance and must
    /// not be expanded into its primitives.
    fn export_macro(&mut self, _placement: &MacroPlacement<'_>) -> ExportResult<bool> {
        Ok(false)
    }

    fn export_oval(&mut self, p1: Point, p2: Point, filled: bool, stroke: &Stroke) -> ExportResult<()>;

    fn export_pcb_line(&mut self, p1: Point, p2: Point, width: i32, layer: usize) -> ExportResult<()>;

    fn export_pcb_pad(&mut self, pad: &PadItem) -> ExportResult<()>;

    fn export_polygon(&mut self, points: &[PointF], filled: bool, stroke: &Stroke) -> ExportResult<()>;

    /// Returns true when the curve was written natively; otherwise the
    /// engine flattens it into lines or a polygon.
    fn export_curve(
        &mut self,
        _points: &[PointF],
        _filled: bool,
        _closed: bool,
        _arrows: &Arrows,
        _stroke: &Stroke,
    ) -> ExportResult<bool> {
        Ok(false)
    }

    fn export_rectangle(&mut self, p1: Point, p2: Point, filled: bool, stroke: &Stroke) -> ExportResult<()>;

    /// Draws an arrowhead with its tip at `tip`, pointing away from `from`,
    /// and returns its base point. The default draws nothing.
    fn export_arrow(
        &mut self,
        tip: PointF,
        from: PointF,
        length: f64,
        half_width: f64,
        style: u8,
        _layer: usize,
    ) -> ExportResult<PointF> {
        Ok(arrow_head(tip.x, tip.y, from.x, from.y, length, half_width, style).base)
    }

    /// Draws the requested arrowheads of a segment and returns its
    /// endpoints, pulled back to the arrow bases when the length is positive.
    fn shaft_with_arrows(
        &mut self,
        p1: PointF,
        p2: PointF,
        arrows: &Arrows,
        layer: usize,
    ) -> ExportResult<(PointF, PointF)> {
        let (mut a, mut b) = (p1, p2);
        let (l, h) = (arrows.length as f64, arrows.half_width as f64);
        if arrows.start {
            let base = self.export_arrow(p1, p2, l, h, arrows.style, layer)?;
            if arrows.length > 0 {
                a = base;
            }
        }
        if arrows.end {
            let base = self.export_arrow(p2, p1, l, h, arrows.style, layer)?;
            if arrows.length > 0 {
                b = base;
            }
        }
        Ok((a, b))
    }
}

/// Drawing state already in effect in a page description output, so
/// unchanged color, width and dash directives are not written again.
/// Starts empty for every export session.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleMemo {
    color: Option<Color>,
    width: Option<f64>,
    dash: u8,
    phase: f32,
}

impl Default for StyleMemo {
    fn default() -> Self {
        Self { color: None, width: None, dash: 0, phase: -1.0 }
    }
}

impl StyleMemo {
    /// Records `color`, returning true when it differs from the current one.
    pub fn set_color(&mut self, color: Color) -> bool {
        let changed = self.color != Some(color);
        self.color = Some(color);
        changed
    }

    pub fn set_width(&mut self, width: f64) -> bool {
        let changed = self.width != Some(width);
        self.width = Some(width);
        changed
    }

    pub fn set_dash(&mut self, style: u8, phase: f32) -> bool {
        let changed = self.dash != style || self.phase != phase;
        self.dash = style;
        self.phase = phase;
        changed
    }
}

/// Dash segment lengths for every style, scaled by `unit / 2`.
pub fn scaled_dashes(unit: f64) -> [Vec<f32>; DASH_STYLES] {
    std::array::from_fn(|i| DASH_PATTERNS[i].iter().map(|d| d * unit as f32 / 2.0).collect())
}

/// Dash arrays as text, joined by `sep`. Style 0 is solid and stays empty.
pub fn dash_strings(unit: f64, sep: &str) -> [String; DASH_STYLES] {
    let scaled = scaled_dashes(unit);
    std::array::from_fn(|i| {
        if i == 0 {
            String::new()
        } else {
            scaled[i].iter().map(|v| decimal_f32(*v)).collect::<Vec<_>>().join(sep)
        }
    })
}

/// Color of `layer`, black when the table has no such entry.
pub fn layer_color(layers: &[Layer], layer: usize) -> Color {
    layers.get(layer).map(|l| l.color).unwrap_or(Color::BLACK)
}
