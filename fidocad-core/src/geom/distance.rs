//! Point-to-shape distances used for hit testing.
//!
//! Distances beyond `MIN_DISTANCE` are not accurate; they only need to rank
//! candidates during selection.

pub const MIN_DISTANCE: i32 = 100;
pub const MAX_BEZIER_SEGMENTS: usize = 10;

pub fn point_to_point(xa: i32, ya: i32, xb: i32, yb: i32) -> i32 {
    if (xa - xb).abs() < MIN_DISTANCE || (ya - yb).abs() < MIN_DISTANCE {
        let (dx, dy) = ((xa - xb) as f64, (ya - yb) as f64);
        (dx * dx + dy * dy).sqrt() as i32
    } else {
        MIN_DISTANCE
    }
}

/// Fixed point (three digits) distance from `(x, y)` to the segment.
pub fn point_to_segment(xa: i32, ya: i32, xb: i32, yb: i32, x: i32, y: i32) -> i32 {
    let (xmin, xmax) = if xa > xb { (xb, xa) } else { (xa, xb) };
    if x < xmin - MIN_DISTANCE || x > xmax + MIN_DISTANCE {
        return MIN_DISTANCE;
    }
    let (ymin, ymax) = if ya > yb { (yb, ya) } else { (ya, yb) };
    if y < ymin - MIN_DISTANCE || y > ymax + MIN_DISTANCE {
        return MIN_DISTANCE;
    }
    let hyp = |dx: i64, dy: i64| ((dx * dx + dy * dy) as f64).sqrt() as i32;
    if xa == xb && ya == yb {
        return hyp((x - xa) as i64, (y - yb) as i64);
    }
    let (dx, dy) = ((xb - xa) as i64, (yb - ya) as i64);
    let t = 1000 * ((x - xa) as i64 * dx + (y - ya) as i64 * dy) / (dx * dx + dy * dy);
    if t < 0 {
        hyp((x - xa) as i64, (y - ya) as i64)
    } else if t > 1000 {
        hyp((x - xb) as i64, (y - yb) as i64)
    } else {
        hyp(x as i64 - (xa as i64 + t * dx / 1000), y as i64 - (ya as i64 + t * dy / 1000))
    }
}

/// Even-odd containment test.
pub fn point_in_polygon(xp: &[i32], yp: &[i32], x: f64, y: f64) -> bool {
    let n = xp.len().min(yp.len());
    if n == 0 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = (xp[i] as f64, yp[i] as f64);
        let (xj, yj) = (xp[j] as f64, yp[j] as f64);
        if ((yi <= y && y < yj) || (yj <= y && y < yi)) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// `(ex, ey)` is the top left corner of the bounding box.
pub fn point_in_ellipse(ex: f64, ey: f64, w: f64, h: f64, px: f64, py: f64) -> bool {
    let dx = (px - (ex + w / 2.0)).abs();
    let dy = (py - (ey + h / 2.0)).abs();
    if dx > w / 2.0 || dy > h / 2.0 {
        return false;
    }
    4.0 * dx * dx / w / w + 4.0 * dy * dy / h / h < 1.0
}

pub fn point_to_ellipse(ex: i32, ey: i32, w: i32, h: i32, px: i32, py: i32) -> i32 {
    if w == 0 {
        return point_to_segment(ex, ey, ex, ey + h, px, py);
    }
    if h == 0 {
        return point_to_segment(ex, ey, ex + w, ey, px, py);
    }
    let (w, h) = (w as f64, h as f64);
    let dx = (px as f64 - (ex as f64 + w / 2.0)).abs();
    let dy = (py as f64 - (ey as f64 + h / 2.0)).abs();
    let l = (dx * dx / w / w + dy * dy / h / h) * 4.0;
    ((l - 1.0).abs() * w.min(h) / 4.0).round() as i32
}

pub fn point_in_rectangle(ex: i32, ey: i32, w: i32, h: i32, px: i32, py: i32) -> bool {
    !(ex > px || px > ex + w || ey > py || py > ey + h)
}

/// Distance to the nearest side of the rectangle.
pub fn point_to_rectangle(ex: i32, ey: i32, w: i32, h: i32, px: i32, py: i32) -> i32 {
    let d1 = point_to_segment(ex, ey, ex + w, ey, px, py);
    let d2 = point_to_segment(ex + w, ey, ex + w, ey + h, px, py);
    let d3 = point_to_segment(ex + w, ey + h, ex, ey + h, px, py);
    let d4 = point_to_segment(ex, ey + h, ex, ey, px, py);
    d1.min(d2).min(d3.min(d4))
}

/// Distance to a cubic Bezier approximated by `MAX_BEZIER_SEGMENTS` chords.
pub fn point_to_bezier(p: [(i32, i32); 4], px: i32, py: i32) -> i32 {
    let mut xs = [0i32; MAX_BEZIER_SEGMENTS + 1];
    let mut ys = [0i32; MAX_BEZIER_SEGMENTS + 1];
    for i in 0..=MAX_BEZIER_SEGMENTS {
        let u = i as f64 / MAX_BEZIER_SEGMENTS as f64;
        let umu = 1.0 - u;
        let b = [umu * umu * umu, 3.0 * u * umu * umu, 3.0 * u * u * umu, u * u * u];
        xs[i] = (0..4).map(|k| p[k].0 as f64 * b[k]).sum::<f64>() as i32;
        ys[i] = (0..4).map(|k| p[k].1 as f64 * b[k]).sum::<f64>() as i32;
    }
    (0..MAX_BEZIER_SEGMENTS)
        .map(|j| point_to_segment(xs[j], ys[j], xs[j + 1], ys[j + 1], px, py))
        .min()
        .unwrap_or(i32::MAX)
}
