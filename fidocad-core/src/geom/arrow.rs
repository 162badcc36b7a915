//! Arrowheads on line and curve endpoints.
//!
//! Arrows are not stored as geometry. Only their attributes travel with a
//! primitive; the head polygon is computed from the tip, a direction point,
//! a length and a half width whenever a backend needs it.

use crate::coords::{round_half_up, MapCoordinates, PointF};
use crate::error::ParseErrorKind;
use crate::geom::distance::point_in_polygon;

/// Draw a perpendicular tick at the tip.
pub const ARROW_LIMITER: u8 = 0x01;
/// Outline only, no fill.
pub const ARROW_EMPTY: u8 = 0x02;

const ROUND_TOLERANCE: f32 = 1e-5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArrowSpec {
    pub start: bool,
    pub end: bool,
    pub style: u8,
    pub length: f32,
    pub half_width: f32,
}

impl Default for ArrowSpec {
    fn default() -> Self {
        Self { start: false, end: false, style: 0, length: 3.0, half_width: 1.0 }
    }
}

fn format_size(v: f32) -> String {
    if (v - v.round()).abs() < ROUND_TOLERANCE {
        format!("{}", v.round() as i32)
    } else {
        format!("{}", v)
    }
}

fn parse_num<T: std::str::FromStr>(tokens: &[&str], i: usize) -> Result<T, ParseErrorKind> {
    let tok = tokens.get(i).copied().unwrap_or("");
    tok.parse().map_err(|_| ParseErrorKind::InvalidNumber(tok.to_string()))
}

impl ArrowSpec {
    pub fn any(&self) -> bool {
        self.start || self.end
    }

    /// `arrows style length halfwidth`; sizes close to an integer are
    /// written without decimals.
    pub fn to_tokens(&self) -> String {
        let arrows = (self.start as u8) | ((self.end as u8) << 1);
        format!("{} {} {} {}", arrows, self.style, format_size(self.length), format_size(self.half_width))
    }

    /// Reads four tokens starting at `start`, returns the spec and the index
    /// of the next unread token.
    pub fn parse_tokens(tokens: &[&str], start: usize) -> Result<(Self, usize), ParseErrorKind> {
        let arrows: i32 = parse_num(tokens, start)?;
        let style: i32 = parse_num(tokens, start + 1)?;
        let length: f32 = parse_num(tokens, start + 2)?;
        let half_width: f32 = parse_num(tokens, start + 3)?;
        let spec = Self {
            start: arrows & 0x01 != 0,
            end: arrows & 0x02 != 0,
            style: (style & 0xff) as u8,
            length,
            half_width,
        };
        Ok((spec, start + 4))
    }

    /// Length and half width converted to device units, keeping their sign.
    pub fn device_sizes(&self, cs: &MapCoordinates) -> (i32, i32) {
        let scale = |v: f32| {
            let d = (cs.map_x(v as f64, v as f64) - cs.map_x(0.0, 0.0)).abs();
            if v < 0.0 {
                -d
            } else {
                d
            }
        };
        (scale(self.length), scale(self.half_width))
    }
}

/// Computed outline of one arrowhead, in the same units as its inputs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArrowHead {
    pub tip: PointF,
    /// Where the shaft should end when the length is positive.
    pub base: PointF,
    pub left: PointF,
    pub right: PointF,
    pub limiter: Option<(PointF, PointF)>,
}

impl ArrowHead {
    pub fn is_filled(style: u8) -> bool {
        style & ARROW_EMPTY == 0
    }

    /// The three corners rounded to integers.
    pub fn rounded_triangle(&self) -> [(i32, i32); 3] {
        [
            (round_half_up(self.tip.x), round_half_up(self.tip.y)),
            (round_half_up(self.left.x), round_half_up(self.left.y)),
            (round_half_up(self.right.x), round_half_up(self.right.y)),
        ]
    }
}

/// Direction of the shaft, from `(xc, yc)` toward the tip `(x, y)`.
pub fn arrow_angle(x: f64, y: f64, xc: f64, yc: f64) -> f64 {
    let mut alpha = if x == xc {
        std::f64::consts::FRAC_PI_2 + if y - yc < 0.0 { 0.0 } else { std::f64::consts::PI }
    } else {
        ((y - yc) / (x - xc)).atan()
    };
    if x - xc <= 0.0 {
        alpha += std::f64::consts::PI;
    }
    alpha
}

pub fn arrow_head(x: f64, y: f64, xc: f64, yc: f64, l: f64, h: f64, style: u8) -> ArrowHead {
    let alpha = arrow_angle(x, y, xc, yc);
    let (sin, cos) = alpha.sin_cos();
    let base = PointF::new(x - l * cos, y - l * sin);
    let left = PointF::new(base.x - h * sin, base.y + h * cos);
    let right = PointF::new(base.x + h * sin, base.y - h * cos);
    let limiter = (style & ARROW_LIMITER != 0)
        .then(|| (PointF::new(x - h * sin, y + h * cos), PointF::new(x + h * sin, y - h * cos)));
    ArrowHead { tip: PointF::new(x, y), base, left, right, limiter }
}

/// Hit test against the rounded head triangle.
pub fn point_in_arrow(px: i32, py: i32, head: &ArrowHead) -> bool {
    let t = head.rounded_triangle();
    let xs = [t[0].0, t[1].0, t[2].0];
    let ys = [t[0].1, t[1].1, t[2].1];
    point_in_polygon(&xs, &ys, px as f64, py as f64)
}
