//! Hit testing: how far a logical point is from each primitive kind.

use super::{AdvText, Labels, MacroCall, Primitive, Shape};
use crate::coords::{Point, PointF};
use crate::geom::arrow::{arrow_head, point_in_arrow};
use crate::geom::curves::{flatten_spline, spline_through};
use crate::geom::distance::{
    point_in_ellipse, point_in_polygon, point_in_rectangle, point_to_bezier, point_to_ellipse, point_to_point,
    point_to_rectangle, point_to_segment, MIN_DISTANCE,
};
use crate::geom::ArrowSpec;
use crate::library::MacroLibrary;
use crate::parser::parse_primitives;
use crate::settings::MAX_MACRO_DEPTH;

/// Rough advance of one character relative to the text height.
const CHAR_WIDTH_RATIO: f64 = 0.6;

fn text_box(len: usize, height: i32) -> (i32, i32) {
    let w = (len as f64 * height as f64 * CHAR_WIDTH_RATIO).round() as i32;
    (w, height)
}

fn in_labels(labels: &Labels, px: i32, py: i32) -> bool {
    let th = ((labels.font_size as f64) * 12.0 / 7.0 + 0.5) as i32;
    let hit = |pos: Point, text: &str| {
        let (w, h) = text_box(text.chars().count(), th);
        !text.is_empty() && point_in_rectangle(pos.x, pos.y, w, h, px, py)
    };
    hit(labels.name_pos, &labels.name) || hit(labels.value_pos, &labels.value)
}

fn box_of(p1: Point, p2: Point) -> (i32, i32, i32, i32) {
    (p1.x.min(p2.x), p1.y.min(p2.y), (p2.x - p1.x).abs(), (p2.y - p1.y).abs())
}

fn in_end_arrows(arrow: &ArrowSpec, start: (Point, Point), end: (Point, Point), px: i32, py: i32) -> bool {
    let head = |(tip, from): (Point, Point)| {
        arrow_head(
            tip.x as f64,
            tip.y as f64,
            from.x as f64,
            from.y as f64,
            arrow.length as f64,
            arrow.half_width as f64,
            arrow.style,
        )
    };
    (arrow.start && point_in_arrow(px, py, &head(start))) || (arrow.end && point_in_arrow(px, py, &head(end)))
}

fn polyline_distance(xs: &[i32], ys: &[i32], closed: bool, px: i32, py: i32) -> i32 {
    let n = xs.len();
    if n == 1 {
        return point_to_point(xs[0], ys[0], px, py);
    }
    let mut best = i32::MAX;
    for i in 0..n.saturating_sub(1) {
        best = best.min(point_to_segment(xs[i], ys[i], xs[i + 1], ys[i + 1], px, py));
    }
    if closed && n > 2 {
        best = best.min(point_to_segment(xs[n - 1], ys[n - 1], xs[0], ys[0], px, py));
    }
    best
}

fn text_distance(t: &AdvText, px: i32, py: i32) -> i32 {
    let th = ((t.size_y as f64) * 12.0 / 7.0 + 0.5) as i32;
    let (w, h) = text_box(t.text.chars().count(), th.max(t.size_y));
    // Rotate the query point into the text frame.
    let a = (t.orientation as f64).to_radians();
    let (dx, dy) = ((px - t.p.x) as f64, (py - t.p.y) as f64);
    let mut lx = dx * a.cos() - dy * a.sin();
    let ly = dx * a.sin() + dy * a.cos();
    if t.is_mirrored() {
        lx = -lx;
    }
    let (lx, ly) = (lx.round() as i32, ly.round() as i32);
    if point_in_rectangle(0, 0, w, h, lx, ly) {
        0
    } else {
        point_to_rectangle(0, 0, w, h, lx, ly)
    }
}

/// Expresses `(px, py)` in the frame of the macro body.
fn macro_local(call: &MacroCall, px: i32, py: i32) -> (i32, i32) {
    let (dx, dy) = (px - call.p.x, py - call.p.y);
    let o = 100;
    let (vx, vy) = match (call.mirror, call.orientation) {
        (true, 1) => (dy, dx),
        (true, 2) => (dx, -dy),
        (true, 3) => (-dy, -dx),
        (true, _) => (-dx, dy),
        (false, 1) => (dy, -dx),
        (false, 2) => (-dx, -dy),
        (false, 3) => (-dy, dx),
        (false, _) => (dx, dy),
    };
    (vx + o, vy + o)
}

impl Primitive {
    /// Distance from the logical point `(px, py)`. Values at or above
    /// `MIN_DISTANCE` only mean "far".
    pub fn distance_to_point(&self, px: i32, py: i32, library: &MacroLibrary) -> i32 {
        self.distance_at_depth(px, py, library, 0)
    }

    fn distance_at_depth(&self, px: i32, py: i32, library: &MacroLibrary, depth: usize) -> i32 {
        if in_labels(&self.labels, px, py) {
            return 0;
        }
        match &self.shape {
            Shape::Line { p1, p2, arrow, .. } => {
                if in_end_arrows(arrow, (*p1, *p2), (*p2, *p1), px, py) {
                    return 1;
                }
                point_to_segment(p1.x, p1.y, p2.x, p2.y, px, py)
            }
            Shape::Rectangle { p1, p2, filled, .. } => {
                let (x, y, w, h) = box_of(*p1, *p2);
                if *filled && point_in_rectangle(x, y, w, h, px, py) {
                    return 1;
                }
                point_to_rectangle(x, y, w, h, px, py)
            }
            Shape::Oval { p1, p2, filled, .. } => {
                let (x, y, w, h) = box_of(*p1, *p2);
                if *filled && point_in_ellipse(x as f64, y as f64, w as f64, h as f64, px as f64, py as f64) {
                    return 1;
                }
                point_to_ellipse(x, y, w, h, px, py)
            }
            Shape::Polygon { points, filled, .. } => {
                if points.is_empty() {
                    return MIN_DISTANCE;
                }
                let xs: Vec<i32> = points.iter().map(|p| p.x).collect();
                let ys: Vec<i32> = points.iter().map(|p| p.y).collect();
                if *filled && point_in_polygon(&xs, &ys, px as f64, py as f64) {
                    return 1;
                }
                polyline_distance(&xs, &ys, true, px, py)
            }
            Shape::Curve { points, filled, closed, arrow, .. } => {
                if points.is_empty() {
                    return MIN_DISTANCE;
                }
                if points.len() > 1 {
                    let last = points.len() - 1;
                    if !*closed && in_end_arrows(arrow, (points[0], points[1]), (points[last], points[last - 1]), px, py)
                    {
                        return 1;
                    }
                }
                let knots: Vec<PointF> = points.iter().map(|p| PointF::new(p.x as f64, p.y as f64)).collect();
                let (xx, yy) = spline_through(&knots, *closed);
                let flat = flatten_spline(&xx, &yy);
                let flat = if flat.is_empty() { knots } else { flat };
                let xs: Vec<i32> = flat.iter().map(|p| p.x.round() as i32).collect();
                let ys: Vec<i32> = flat.iter().map(|p| p.y.round() as i32).collect();
                if *filled && point_in_polygon(&xs, &ys, px as f64, py as f64) {
                    return 1;
                }
                polyline_distance(&xs, &ys, false, px, py)
            }
            Shape::Bezier { points, arrow, .. } => {
                if in_end_arrows(arrow, (points[0], points[1]), (points[3], points[2]), px, py) {
                    return 1;
                }
                point_to_bezier(points.map(|p| (p.x, p.y)), px, py)
            }
            Shape::PcbLine { p1, p2, width } => {
                let d = point_to_segment(p1.x, p1.y, p2.x, p2.y, px, py) - (*width / 2.0) as i32;
                d.max(0)
            }
            Shape::PcbPad { p, rx, ry, .. } => (point_to_point(p.x, p.y, px, py) - rx.min(ry) / 2).max(0),
            Shape::Connection { p } => point_to_point(p.x, p.y, px, py),
            Shape::Text(t) => text_distance(t, px, py),
            Shape::Macro(call) => {
                let Some(desc) = library.get(&call.key) else {
                    return i32::MAX;
                };
                if depth >= MAX_MACRO_DEPTH {
                    log::warn!("macro '{}' nested too deeply, ignored for hit testing", call.key);
                    return i32::MAX;
                }
                let (vx, vy) = macro_local(call, px, py);
                let (body, _) = parse_primitives(&desc.body);
                body.iter()
                    .map(|p| p.distance_at_depth(vx, vy, library, depth + 1))
                    .min()
                    .unwrap_or(i32::MAX)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::MacroDesc;
    use crate::primitive::PadStyle;

    fn lib() -> MacroLibrary {
        let mut lib = MacroLibrary::new();
        lib.insert(MacroDesc::new("box", "Box", "RV 90 90 110 110 0", "Test", "test"));
        lib
    }

    #[test]
    fn test_line_and_arrow() {
        let mut p = Primitive::line(Point::new(0, 0), Point::new(100, 0), 0);
        assert_eq!(p.distance_to_point(50, 7, &lib()), 7);
        if let Shape::Line { arrow, .. } = &mut p.shape {
            arrow.start = true;
            arrow.length = 10.0;
            arrow.half_width = 5.0;
        }
        assert_eq!(p.distance_to_point(3, 1, &lib()), 1);
    }

    #[test]
    fn test_filled_shapes_inside() {
        let r = Primitive::rectangle(Point::new(0, 0), Point::new(20, 10), true, 0);
        assert_eq!(r.distance_to_point(10, 5, &lib()), 1);
        let r = Primitive::rectangle(Point::new(0, 0), Point::new(20, 10), false, 0);
        assert_eq!(r.distance_to_point(10, 5, &lib()), 5);
        let o = Primitive::oval(Point::new(0, 0), Point::new(20, 20), true, 0);
        assert_eq!(o.distance_to_point(10, 10, &lib()), 1);
    }

    #[test]
    fn test_pad_distance_subtracts_radius() {
        let p = Primitive::pad(Point::new(0, 0), 10, 10, 4, PadStyle::Oval, 1);
        assert_eq!(p.distance_to_point(3, 4, &lib()), 0);
        assert_eq!(p.distance_to_point(30, 40, &lib()), 45);
    }

    #[test]
    fn test_labels_hit() {
        let p = Primitive::line(Point::new(0, 0), Point::new(0, 0), 0).with_labels("R1", "");
        assert_eq!(p.distance_to_point(6, 6, &lib()), 0);
    }

    #[test]
    fn test_macro_uses_body() {
        let m = Primitive::macro_call(Point::new(50, 50), 0, false, "box");
        // The body square spans 40..60 once placed at (50, 50).
        assert_eq!(m.distance_to_point(40, 50, &lib()), 0);
        assert_eq!(m.distance_to_point(30, 50, &lib()), 10);
        let missing = Primitive::macro_call(Point::new(50, 50), 0, false, "nope");
        assert_eq!(missing.distance_to_point(50, 50, &lib()), i32::MAX);
    }

    #[test]
    fn test_rotated_macro_frame() {
        let call = MacroCall { p: Point::new(0, 0), orientation: 1, mirror: false, key: String::new() };
        assert_eq!(macro_local(&call, 0, 10), (110, 100));
        let mirrored = MacroCall { mirror: true, orientation: 0, ..call };
        assert_eq!(macro_local(&mirrored, 10, 0), (90, 100));
    }
}
