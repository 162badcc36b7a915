use serde::{Deserialize, Serialize};

pub const DEFAULT_TEXT_FONT: &str = "Courier New";
pub const DEFAULT_LINE_WIDTH: f64 = 0.5;
pub const DEFAULT_LINE_WIDTH_CIRCLES: f64 = 0.35;
pub const DEFAULT_CONNECTION_SIZE: f64 = 2.0;

/// Font size of name/value labels on ordinary primitives.
pub const DEFAULT_LABEL_SIZE: i32 = 3;
/// Font size of name/value labels on macro instances.
pub const DEFAULT_MACRO_LABEL_SIZE: i32 = 4;

/// Deepest macro nesting followed before an instance is given up on.
pub const MAX_MACRO_DEPTH: usize = 16;

/// Canonical dash lengths in logical units; backends scale them by the
/// dash unit.
pub const DASH_PATTERNS: [&[f32]; 5] = [
    &[10.0, 0.0],
    &[5.0, 5.0],
    &[2.0, 2.0],
    &[2.0, 5.0],
    &[2.0, 5.0, 5.0, 5.0],
];

pub const DASH_STYLES: usize = DASH_PATTERNS.len();

/// Clamps a dash style index into the table.
pub fn check_dash_style(style: i32) -> u8 {
    style.clamp(0, DASH_STYLES as i32 - 1) as u8
}

/// Drawing-wide stroke settings, configurable through `FJC` header lines.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DrawingSettings {
    pub line_width: f64,
    pub line_width_circles: f64,
    pub connection_size: f64,
}

impl Default for DrawingSettings {
    fn default() -> Self {
        Self {
            line_width: DEFAULT_LINE_WIDTH,
            line_width_circles: DEFAULT_LINE_WIDTH_CIRCLES,
            connection_size: DEFAULT_CONNECTION_SIZE,
        }
    }
}
