//! Text measurement used to size PDF glyph tables and text bounding boxes.

/// Horizontal stretch of text whose x and y sizes are equal.
pub const TEXT_STRETCH: f64 = 38.0 / 22.0;

pub trait TextMetrics {
    /// Advance width of `text` set in `font` at `size`, in device units.
    fn string_width(&self, text: &str, font: &str, size: f64) -> f64;
}

/// Measures nothing. Backends relying on widths must cope with zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullMetrics;

impl TextMetrics for NullMetrics {
    fn string_width(&self, _text: &str, _font: &str, _size: f64) -> f64 {
        0.0
    }
}

/// Every character advances by the same fraction of the font size, as in a
/// monospaced face.
#[derive(Debug, Clone, Copy)]
pub struct FixedPitchMetrics {
    pub advance: f64,
}

impl Default for FixedPitchMetrics {
    fn default() -> Self {
        Self { advance: 0.6 }
    }
}

impl TextMetrics for FixedPitchMetrics {
    fn string_width(&self, text: &str, _font: &str, size: f64) -> f64 {
        text.chars().count() as f64 * size * self.advance
    }
}

/// Horizontal scale turning a `size_y` high font into a `size_x` wide one.
pub fn text_x_scale(size_x: i32, size_y: i32) -> f64 {
    if size_y == 0 {
        1.0
    } else {
        size_x as f64 / size_y as f64 * TEXT_STRETCH
    }
}
