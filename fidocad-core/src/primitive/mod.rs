//! Drawable primitives.
//!
//! A [`Primitive`] couples a [`Shape`] with the attributes every kind shares:
//! its layer, the optional name/value labels and the selection flag. The
//! token grammar lives in `grammar`, hit testing in `hit`.

mod grammar;
mod hit;

use crate::coords::Point;
use crate::geom::ArrowSpec;
use crate::layers::MAX_LAYERS;
use crate::settings::{DEFAULT_LABEL_SIZE, DEFAULT_MACRO_LABEL_SIZE, DEFAULT_TEXT_FONT};

pub use grammar::{font_token, parse_font_token, COMMANDS};

/// Advanced text style bits.
pub const TEXT_BOLD: i32 = 1;
pub const TEXT_ITALIC: i32 = 2;
pub const TEXT_MIRRORED: i32 = 4;

/// Text sizes are clamped into `1..=MAX_TEXT_SIZE`.
pub const MAX_TEXT_SIZE: i32 = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PadStyle {
    Oval,
    Square,
    Rounded,
}

impl PadStyle {
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => PadStyle::Square,
            2 => PadStyle::Rounded,
            _ => PadStyle::Oval,
        }
    }

    pub fn code(self) -> i32 {
        match self {
            PadStyle::Oval => 0,
            PadStyle::Square => 1,
            PadStyle::Rounded => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdvText {
    pub p: Point,
    pub size_y: i32,
    pub size_x: i32,
    /// Rotation in degrees, counter-clockwise.
    pub orientation: i32,
    pub style: i32,
    pub font: String,
    pub text: String,
}

impl AdvText {
    pub fn is_bold(&self) -> bool {
        self.style & TEXT_BOLD != 0
    }

    pub fn is_italic(&self) -> bool {
        self.style & TEXT_ITALIC != 0
    }

    pub fn is_mirrored(&self) -> bool {
        self.style & TEXT_MIRRORED != 0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MacroCall {
    pub p: Point,
    pub orientation: u8,
    pub mirror: bool,
    /// Library key, always lower case.
    pub key: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Line { p1: Point, p2: Point, arrow: ArrowSpec, dash: u8 },
    Rectangle { p1: Point, p2: Point, filled: bool, dash: u8 },
    Oval { p1: Point, p2: Point, filled: bool, dash: u8 },
    Polygon { points: Vec<Point>, filled: bool, dash: u8 },
    Curve { points: Vec<Point>, filled: bool, closed: bool, arrow: ArrowSpec, dash: u8 },
    Bezier { points: [Point; 4], arrow: ArrowSpec, dash: u8 },
    PcbLine { p1: Point, p2: Point, width: f64 },
    PcbPad { p: Point, rx: i32, ry: i32, drill: i32, style: PadStyle },
    Connection { p: Point },
    Text(AdvText),
    Macro(MacroCall),
}

impl Shape {
    /// Two-letter command code used when the shape is written out.
    pub fn command(&self) -> &'static str {
        match self {
            Shape::Line { .. } => "LI",
            Shape::Rectangle { filled: true, .. } => "RP",
            Shape::Rectangle { .. } => "RV",
            Shape::Oval { filled: true, .. } => "EP",
            Shape::Oval { .. } => "EV",
            Shape::Polygon { filled: true, .. } => "PP",
            Shape::Polygon { .. } => "PV",
            Shape::Curve { filled: true, .. } => "CP",
            Shape::Curve { .. } => "CV",
            Shape::Bezier { .. } => "BE",
            Shape::PcbLine { .. } => "PL",
            Shape::PcbPad { .. } => "PA",
            Shape::Connection { .. } => "SA",
            Shape::Text(_) => "TY",
            Shape::Macro(_) => "MC",
        }
    }

    /// Control points in logical units.
    pub fn control_points(&self) -> Vec<Point> {
        match self {
            Shape::Line { p1, p2, .. }
            | Shape::Rectangle { p1, p2, .. }
            | Shape::Oval { p1, p2, .. }
            | Shape::PcbLine { p1, p2, .. } => vec![*p1, *p2],
            Shape::Polygon { points, .. } | Shape::Curve { points, .. } => points.clone(),
            Shape::Bezier { points, .. } => points.to_vec(),
            Shape::PcbPad { p, .. } | Shape::Connection { p } => vec![*p],
            Shape::Text(t) => vec![t.p],
            Shape::Macro(m) => vec![m.p],
        }
    }

    pub fn is_pad(&self) -> bool {
        matches!(self, Shape::PcbPad { .. })
    }
}

/// Name and value attached to a primitive, drawn as plain text.
#[derive(Debug, Clone, PartialEq)]
pub struct Labels {
    pub name: String,
    pub value: String,
    pub name_pos: Point,
    pub value_pos: Point,
    pub font: String,
    pub font_size: i32,
}

impl Labels {
    /// Empty labels with the default placement relative to `anchor`.
    pub fn at(anchor: Point) -> Self {
        Self {
            name: String::new(),
            value: String::new(),
            name_pos: anchor.offset(5, 5),
            value_pos: anchor.offset(5, 10),
            font: DEFAULT_TEXT_FONT.to_string(),
            font_size: DEFAULT_LABEL_SIZE,
        }
    }

    /// Macro labels sit further away and use a larger font.
    pub fn for_macro(anchor: Point) -> Self {
        Self {
            name_pos: anchor.offset(10, 10),
            value_pos: anchor.offset(10, 5),
            font_size: DEFAULT_MACRO_LABEL_SIZE,
            ..Self::at(anchor)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_empty() && self.value.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Primitive {
    pub layer: usize,
    pub shape: Shape,
    pub labels: Labels,
    pub selected: bool,
}

impl Primitive {
    /// Wraps `shape` with default labels. Layers outside the table fall back
    /// to 0.
    pub fn new(layer: usize, shape: Shape) -> Self {
        let labels = match &shape {
            Shape::Macro(m) => Labels::for_macro(m.p),
            Shape::Polygon { points, .. } | Shape::Curve { points, .. } => {
                Labels::at(points.last().copied().unwrap_or_default())
            }
            other => Labels::at(other.control_points().first().copied().unwrap_or_default()),
        };
        Self { layer: checked_layer(layer as i64), shape, labels, selected: false }
    }

    pub fn line(p1: Point, p2: Point, layer: usize) -> Self {
        Self::new(layer, Shape::Line { p1, p2, arrow: ArrowSpec::default(), dash: 0 })
    }

    pub fn rectangle(p1: Point, p2: Point, filled: bool, layer: usize) -> Self {
        Self::new(layer, Shape::Rectangle { p1, p2, filled, dash: 0 })
    }

    pub fn oval(p1: Point, p2: Point, filled: bool, layer: usize) -> Self {
        Self::new(layer, Shape::Oval { p1, p2, filled, dash: 0 })
    }

    pub fn pad(p: Point, rx: i32, ry: i32, drill: i32, style: PadStyle, layer: usize) -> Self {
        Self::new(layer, Shape::PcbPad { p, rx, ry, drill, style })
    }

    pub fn macro_call(p: Point, orientation: u8, mirror: bool, key: &str) -> Self {
        Self::new(0, Shape::Macro(MacroCall { p, orientation: orientation % 4, mirror, key: key.to_lowercase() }))
    }

    pub fn with_labels(mut self, name: &str, value: &str) -> Self {
        self.labels.name = name.to_string();
        self.labels.value = value.to_string();
        self
    }

    pub fn is_macro(&self) -> bool {
        matches!(self.shape, Shape::Macro(_))
    }
}

/// Layer indices outside `0..MAX_LAYERS` map to 0.
pub fn checked_layer(l: i64) -> usize {
    if (0..MAX_LAYERS as i64).contains(&l) {
        l as usize
    } else {
        0
    }
}
