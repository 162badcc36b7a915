use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Layer tables hold exactly this many entries.
pub const MAX_LAYERS: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const fn from_hex_u32(v: u32) -> Self {
        Self::rgb(((v >> 16) & 0xff) as u8, ((v >> 8) & 0xff) as u8, (v & 0xff) as u8)
    }

    /// Packed opaque ARGB value, as stored in `FJC L` configuration lines.
    pub fn to_argb(self) -> i32 {
        (0xff00_0000u32 | (self.r as u32) << 16 | (self.g as u32) << 8 | self.b as u32) as i32
    }

    pub fn from_argb(v: i32) -> Self {
        Self::from_hex_u32(v as u32)
    }

    /// Lower-case `rrggbb` without the leading hash.
    pub fn hex(self) -> String {
        format!("{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    pub fn red_f(self) -> f64 {
        self.r as f64 / 255.0
    }

    pub fn green_f(self) -> f64 {
        self.g as f64 / 255.0
    }

    pub fn blue_f(self) -> f64 {
        self.b as f64 / 255.0
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.hex())
    }
}

impl FromStr for Color {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim();
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if hex.len() != 6 {
            return Err(format!("expected a #rrggbb color, got '{}'", s));
        }
        let v = u32::from_str_radix(hex, 16).map_err(|e| format!("invalid color '{}': {}", s, e))?;
        Ok(Self::from_hex_u32(v))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub color: Color,
    pub visible: bool,
    pub name: String,
    pub alpha: f32,
    /// Set when the layer differs from the standard table and must be saved.
    #[serde(default)]
    pub modified: bool,
}

impl Layer {
    pub fn new(color: Color, visible: bool, name: impl Into<String>, alpha: f32) -> Self {
        Self { color, visible, name: name.into(), alpha, modified: false }
    }
}

const STANDARD: [(u32, &str, f32); MAX_LAYERS] = [
    (0x000000, "Circuit", 1.0),
    (0x000080, "Bottom copper", 1.0),
    (0xff0000, "Top copper", 1.0),
    (0x008080, "Silkscreen", 1.0),
    (0xffc800, "Other 1", 1.0),
    (0x7fff00, "Other 2", 1.0),
    (0x00ffff, "Other 3", 1.0),
    (0x008000, "Other 4", 1.0),
    (0x9acd32, "Other 5", 1.0),
    (0xff1493, "Other 6", 1.0),
    (0xb59b0c, "Other 7", 1.0),
    (0x0180ff, "Other 8", 1.0),
    (0xe1e1e1, "Other 9", 0.95),
    (0xa2a2a2, "Other 10", 0.9),
    (0x5f5f5f, "Other 11", 0.9),
    (0x000000, "Other 12", 1.0),
];

/// The sixteen default layers every new drawing starts with.
pub fn standard_layers() -> Vec<Layer> {
    STANDARD
        .iter()
        .map(|&(c, name, alpha)| Layer::new(Color::from_hex_u32(c), true, name, alpha))
        .collect()
}

/// Name of a standard layer, used to decide whether a rename must be saved.
pub fn standard_layer_name(index: usize) -> Option<&'static str> {
    STANDARD.get(index).map(|&(_, name, _)| name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_table() {
        let layers = standard_layers();
        assert_eq!(layers.len(), MAX_LAYERS);
        assert_eq!(layers[2].color, Color::rgb(255, 0, 0));
        assert_eq!(layers[12].alpha, 0.95);
        assert!(layers.iter().all(|l| l.visible && !l.modified));
    }

    #[test]
    fn test_argb_roundtrip() {
        let c = Color::rgb(0x12, 0x34, 0x56);
        assert_eq!(c.to_argb(), 0xff123456u32 as i32);
        assert_eq!(Color::from_argb(c.to_argb()), c);
        assert_eq!(Color::from_argb(-16777216), Color::BLACK);
    }

    #[test]
    fn test_hex_parse_and_display() {
        let c: Color = "#00FF80".parse().unwrap();
        assert_eq!(c, Color::rgb(0, 255, 128));
        assert_eq!(c.to_string(), "#00ff80");
        assert!("12345".parse::<Color>().is_err());
    }
}
