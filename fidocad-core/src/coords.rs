//! Logical to device coordinate mapping.
//!
//! One logical unit is 127 micron (1/200 inch). A mapping scales, shifts and,
//! for macro-local systems, rotates by quarter turns and mirrors. Nested
//! macros derive their mapping from the enclosing one with [`MapCoordinates::child`].

use serde::{Deserialize, Serialize};

pub const MIN_MAGNITUDE: f64 = 0.25;
pub const MAX_MAGNITUDE: f64 = 100.0;

/// Macro bodies are drawn around this logical point.
pub const MACRO_ORIGIN: f64 = 100.0;

/// Rounds half up, the way the drawing format has always snapped values
/// (`-2.5` goes to `-2`).
pub fn round_half_up(v: f64) -> i32 {
    (v + 0.5).floor() as i32
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PointF {
    pub x: f64,
    pub y: f64,
}

impl PointF {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Dimension {
    pub width: i32,
    pub height: i32,
}

impl Dimension {
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapCoordinates {
    x_center: f64,
    y_center: f64,
    x_magnitude: f64,
    y_magnitude: f64,
    orientation: u8,
    pub mirror: bool,
    pub is_macro: bool,
    snap: bool,
    x_grid_step: i32,
    y_grid_step: i32,
    x_min: i32,
    x_max: i32,
    y_min: i32,
    y_max: i32,
}

impl Default for MapCoordinates {
    fn default() -> Self {
        Self {
            x_center: 0.0,
            y_center: 0.0,
            x_magnitude: 1.0,
            y_magnitude: 1.0,
            orientation: 0,
            mirror: false,
            is_macro: false,
            snap: true,
            x_grid_step: 5,
            y_grid_step: 5,
            x_min: i32::MAX,
            x_max: i32::MIN,
            y_min: i32::MAX,
            y_max: i32::MIN,
        }
    }
}

fn clamp_magnitude(m: f64) -> f64 {
    if m.abs() < MIN_MAGNITUDE {
        MIN_MAGNITUDE
    } else if m.abs() > MAX_MAGNITUDE {
        MAX_MAGNITUDE
    } else {
        m
    }
}

impl MapCoordinates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mapping with the same magnitude on both axes and the given center.
    pub fn with_magnitude(magnitude: f64) -> Self {
        let mut m = Self::default();
        m.set_magnitudes(magnitude, magnitude);
        m
    }

    /// Coordinate system of a macro instance placed at logical `(x, y)` with
    /// quarter-turn `orientation` and `mirror` flag, inside `self`.
    pub fn child(&self, x: i32, y: i32, orientation: u8, mirror: bool) -> Self {
        let mut c = Self::default();
        c.set_magnitudes_no_check(self.x_magnitude, self.y_magnitude);
        c.x_center = self.map_xr(x as f64, y as f64);
        c.y_center = self.map_yr(x as f64, y as f64);
        c.set_orientation((orientation + self.orientation) % 4);
        c.mirror = mirror ^ self.mirror;
        c.is_macro = true;
        c
    }

    pub fn orientation(&self) -> u8 {
        self.orientation
    }

    /// Values above 3 are truncated to 3.
    pub fn set_orientation(&mut self, o: u8) {
        self.orientation = o.min(3);
    }

    pub fn x_magnitude(&self) -> f64 {
        self.x_magnitude
    }

    pub fn y_magnitude(&self) -> f64 {
        self.y_magnitude
    }

    pub fn set_x_magnitude(&mut self, m: f64) {
        self.x_magnitude = clamp_magnitude(m);
    }

    pub fn set_y_magnitude(&mut self, m: f64) {
        self.y_magnitude = clamp_magnitude(m);
    }

    pub fn set_magnitudes(&mut self, xm: f64, ym: f64) {
        self.set_x_magnitude(xm);
        self.set_y_magnitude(ym);
    }

    /// Skips the magnitude limits. Callers must not pass zero.
    pub fn set_magnitudes_no_check(&mut self, xm: f64, ym: f64) {
        self.x_magnitude = xm;
        self.y_magnitude = ym;
    }

    pub fn x_center(&self) -> f64 {
        self.x_center
    }

    pub fn y_center(&self) -> f64 {
        self.y_center
    }

    pub fn set_x_center(&mut self, c: f64) {
        self.x_center = c;
    }

    pub fn set_y_center(&mut self, c: f64) {
        self.y_center = c;
    }

    pub fn snap(&self) -> bool {
        self.snap
    }

    pub fn set_snap(&mut self, s: bool) {
        self.snap = s;
    }

    pub fn x_grid_step(&self) -> i32 {
        self.x_grid_step
    }

    pub fn y_grid_step(&self) -> i32 {
        self.y_grid_step
    }

    pub fn set_x_grid_step(&mut self, step: i32) {
        if step > 0 {
            self.x_grid_step = step;
        }
    }

    pub fn set_y_grid_step(&mut self, step: i32) {
        if step > 0 {
            self.y_grid_step = step;
        }
    }

    pub fn map_xr(&self, x: f64, y: f64) -> f64 {
        let v = if self.is_macro {
            let xc = x - MACRO_ORIGIN;
            let yc = y - MACRO_ORIGIN;
            match (self.mirror, self.orientation) {
                (true, 1) => yc * self.y_magnitude,
                (true, 2) => xc * self.x_magnitude,
                (true, 3) => -yc * self.y_magnitude,
                (true, _) => -xc * self.x_magnitude,
                (false, 1) => -yc * self.y_magnitude,
                (false, 2) => -xc * self.x_magnitude,
                (false, 3) => yc * self.y_magnitude,
                (false, _) => xc * self.x_magnitude,
            }
        } else {
            x * self.x_magnitude
        };
        v + self.x_center
    }

    pub fn map_yr(&self, x: f64, y: f64) -> f64 {
        let v = if self.is_macro {
            let xc = x - MACRO_ORIGIN;
            let yc = y - MACRO_ORIGIN;
            match self.orientation {
                1 => xc * self.x_magnitude,
                2 => -yc * self.y_magnitude,
                3 => -xc * self.x_magnitude,
                _ => yc * self.y_magnitude,
            }
        } else {
            y * self.y_magnitude
        };
        v + self.y_center
    }

    pub fn map_x(&self, x: f64, y: f64) -> i32 {
        round_half_up(self.map_xr(x, y))
    }

    pub fn map_y(&self, x: f64, y: f64) -> i32 {
        round_half_up(self.map_yr(x, y))
    }

    pub fn map_point(&self, p: Point) -> Point {
        Point::new(self.map_x(p.x as f64, p.y as f64), self.map_y(p.x as f64, p.y as f64))
    }

    pub fn map_point_f(&self, p: Point) -> PointF {
        PointF::new(self.map_xr(p.x as f64, p.y as f64), self.map_yr(p.x as f64, p.y as f64))
    }

    /// Device to logical, no snapping.
    pub fn unmap_x_nosnap(&self, x: i32) -> i32 {
        round_half_up((x as f64 - self.x_center) / self.x_magnitude)
    }

    pub fn unmap_y_nosnap(&self, y: i32) -> i32 {
        round_half_up((y as f64 - self.y_center) / self.y_magnitude)
    }

    pub fn unmap_x_snap(&self, x: i32) -> i32 {
        let xc = self.unmap_x_nosnap(x);
        self.snap_to_grid(xc, self.x_grid_step)
    }

    pub fn unmap_y_snap(&self, y: i32) -> i32 {
        let yc = self.unmap_y_nosnap(y);
        self.snap_to_grid(yc, self.y_grid_step)
    }

    fn snap_to_grid(&self, v: i32, step: i32) -> i32 {
        if self.snap {
            round_half_up(v as f64 / step as f64) * step
        } else {
            v
        }
    }

    /// Extends the tracked bounding box. Fractions are truncated.
    pub fn track_point(&mut self, x: f64, y: f64) {
        let (ix, iy) = (x as i32, y as i32);
        self.x_min = self.x_min.min(ix);
        self.x_max = self.x_max.max(ix);
        self.y_min = self.y_min.min(iy);
        self.y_max = self.y_max.max(iy);
    }

    pub fn reset_min_max(&mut self) {
        self.x_min = i32::MAX;
        self.y_min = i32::MAX;
        self.x_max = i32::MIN;
        self.y_max = i32::MIN;
    }

    pub fn x_min(&self) -> i32 {
        self.x_min
    }

    pub fn x_max(&self) -> i32 {
        self.x_max
    }

    pub fn y_min(&self) -> i32 {
        self.y_min
    }

    pub fn y_max(&self) -> i32 {
        self.y_max
    }

    /// True once at least one point has been tracked.
    pub fn has_bounds(&self) -> bool {
        self.x_max >= self.x_min && self.y_max >= self.y_min
    }
}
