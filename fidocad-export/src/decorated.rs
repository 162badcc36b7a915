//! Text with exponents and indices.
//!
//! `^` raises the following chunks by one level and `_` lowers them; `\`
//! makes the next character literal. Each level away from the baseline
//! shrinks the font a little more.

use fidocad_core::round_half_up;

use crate::metrics::TextMetrics;

#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub text: String,
    /// Positive for exponents, negative for indices.
    pub level: i32,
}

/// Font size multiplier for a level.
pub fn level_scale(level: i32) -> f64 {
    match level.abs() {
        0 => 1.0,
        1 => 0.8,
        2 => 0.7,
        3 => 0.6,
        _ => 0.5,
    }
}

pub fn chunks(s: &str) -> Vec<Chunk> {
    let mut out = Vec::new();
    let mut level = 0;
    let mut current = String::new();
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '^' | '_' => {
                if !current.is_empty() {
                    out.push(Chunk { text: std::mem::take(&mut current), level });
                }
                level += if c == '^' { 1 } else { -1 };
            }
            '\\' => {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            _ => current.push(c),
        }
    }
    if !current.is_empty() {
        out.push(Chunk { text: current, level });
    }
    out
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlacedChunk {
    pub text: String,
    pub x: i32,
    pub y: i32,
    pub size: f64,
}

/// Positions the chunks of `s` starting at `(x, y)` with a baseline font
/// of `size`.
pub fn layout(s: &str, x: i32, y: i32, size: f64, font: &str, metrics: &dyn TextMetrics) -> Vec<PlacedChunk> {
    let mut xc = x;
    chunks(s)
        .into_iter()
        .map(|c| {
            let scale = level_scale(c.level);
            let chunk_size = size * scale;
            let placed = PlacedChunk {
                x: xc,
                y: y - round_half_up(c.level as f64 * size * scale * 0.5),
                size: chunk_size,
                text: c.text,
            };
            xc += metrics.string_width(&placed.text, font, chunk_size) as i32;
            placed
        })
        .collect()
}

/// Move from where each chunk's predecessor ended to where the chunk
/// starts, the first one from `(x, y)`. Positive moves go right and up.
/// Page description outputs advance the pen themselves when showing
/// text, so only these differences are written.
pub fn pen_moves(placed: &[PlacedChunk], x: i32, y: i32, font: &str, metrics: &dyn TextMetrics) -> Vec<(i32, i32)> {
    let mut pen = (x, y);
    placed
        .iter()
        .map(|c| {
            let step = (c.x - pen.0, pen.1 - c.y);
            pen = (c.x + metrics.string_width(&c.text, font, c.size) as i32, c.y);
            step
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{FixedPitchMetrics, NullMetrics};

    #[test]
    fn test_plain_text_is_one_chunk() {
        assert_eq!(chunks("R12"), vec![Chunk { text: "R12".into(), level: 0 }]);
        assert!(chunks("").is_empty());
    }

    #[test]
    fn test_exponent_and_index() {
        let c = chunks("x^2_y");
        assert_eq!(c.len(), 3);
        assert_eq!((c[1].text.as_str(), c[1].level), ("2", 1));
        assert_eq!((c[2].text.as_str(), c[2].level), ("y", 0));
        let esc = chunks("a\\^b");
        assert_eq!(esc, vec![Chunk { text: "a^b".into(), level: 0 }]);
    }

    #[test]
    fn test_layout_advances_and_raises() {
        let placed = layout("ab^c", 10, 100, 10.0, "Courier", &FixedPitchMetrics::default());
        assert_eq!(placed[0].x, 10);
        assert_eq!(placed[1].x, 22);
        assert_eq!(placed[1].y, 96);
        assert!((placed[1].size - 8.0).abs() < 1e-9);
        let flat = layout("ab^c", 10, 100, 10.0, "Courier", &NullMetrics);
        assert_eq!(flat[1].x, 10);
    }

    #[test]
    fn test_pen_moves_continue_after_each_chunk() {
        let m = FixedPitchMetrics::default();
        let placed = layout("ab^c_d", 10, 100, 10.0, "Courier", &m);
        assert_eq!(pen_moves(&placed, 10, 100, "Courier", &m), vec![(0, 0), (0, 4), (0, -4)]);
    }
}
