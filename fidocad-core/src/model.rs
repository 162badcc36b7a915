//! The drawing model: primitives, layer table, stroke settings and a shared
//! macro library.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use crate::error::{ModelResult, ParseError};
use crate::layers::{standard_layer_name, standard_layers, Layer};
use crate::library::MacroLibrary;
use crate::parser::parse_text;
use crate::primitive::Primitive;
use crate::settings::{
    DrawingSettings, DEFAULT_CONNECTION_SIZE, DEFAULT_LINE_WIDTH, DEFAULT_LINE_WIDTH_CIRCLES,
};

const SETTING_TOLERANCE: f64 = 1e-5;

/// Header line of every drawing file.
pub const FIDOCAD_HEADER: &str = "[FIDOCAD]";

#[derive(Debug, Clone)]
pub struct DrawingModel {
    pub primitives: Vec<Primitive>,
    pub layers: Vec<Layer>,
    pub settings: DrawingSettings,
    pub library: Arc<MacroLibrary>,
}

impl Default for DrawingModel {
    fn default() -> Self {
        Self::new(Arc::new(MacroLibrary::new()))
    }
}

/// Decimal form with at least one fractional digit, as the format has
/// always written settings.
fn decimal(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{:.1}", v)
    } else {
        format!("{}", v)
    }
}

impl DrawingModel {
    /// Empty drawing with the standard layers.
    pub fn new(library: Arc<MacroLibrary>) -> Self {
        Self { primitives: Vec::new(), layers: standard_layers(), settings: DrawingSettings::default(), library }
    }

    /// Parses `text`; malformed lines are returned alongside the model.
    pub fn parse(text: &str, library: Arc<MacroLibrary>) -> (Self, Vec<ParseError>) {
        let out = parse_text(text);
        log::debug!("Parsed {} primitives, {} errors", out.primitives.len(), out.errors.len());
        let model = Self { primitives: out.primitives, layers: out.layers, settings: out.settings, library };
        (model, out.errors)
    }

    pub fn load(path: &Path, library: Arc<MacroLibrary>) -> ModelResult<(Self, Vec<ParseError>)> {
        let text = std::fs::read_to_string(path)?;
        log::info!("Loaded drawing from {}", path.display());
        Ok(Self::parse(&text, library))
    }

    pub fn add(&mut self, p: Primitive) {
        self.primitives.push(p);
    }

    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }

    /// Layers used directly by top-level primitives.
    pub fn used_layers(&self) -> BTreeSet<usize> {
        self.primitives.iter().filter(|p| !p.is_macro()).map(|p| p.layer).collect()
    }

    /// `FJC` lines for settings and layers that differ from the defaults.
    pub fn config_lines(&self, extensions: bool) -> String {
        if !extensions {
            return String::new();
        }
        let mut s = String::new();
        if (self.settings.connection_size - DEFAULT_CONNECTION_SIZE).abs() > SETTING_TOLERANCE {
            s += &format!("FJC C {}\n", decimal(self.settings.connection_size));
        }
        for (i, layer) in self.layers.iter().enumerate().filter(|(_, l)| l.modified) {
            s += &format!("FJC L {} {} {}\n", i, layer.color.to_argb(), decimal(layer.alpha as f64));
            if standard_layer_name(i) != Some(layer.name.as_str()) {
                s += &format!("FJC N {} {}\n", i, layer.name);
            }
        }
        if (self.settings.line_width - DEFAULT_LINE_WIDTH).abs() > SETTING_TOLERANCE {
            s += &format!("FJC A {}\n", decimal(self.settings.line_width));
        }
        if (self.settings.line_width_circles - DEFAULT_LINE_WIDTH_CIRCLES).abs() > SETTING_TOLERANCE {
            s += &format!("FJC B {}\n", decimal(self.settings.line_width_circles));
        }
        s
    }

    /// The whole drawing in the text format.
    pub fn to_fidocad(&self, extensions: bool) -> String {
        let mut s = format!("{}\n", FIDOCAD_HEADER);
        s += &self.config_lines(extensions);
        for p in &self.primitives {
            s += &p.to_fidocad(extensions);
        }
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::Point;
    use crate::layers::Color;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_single_line_drawing() {
        let mut m = DrawingModel::default();
        m.add(Primitive::line(Point::new(10, 10), Point::new(50, 50), 2));
        assert_eq!(m.to_fidocad(false), "[FIDOCAD]\nLI 10 10 50 50 2\n");
    }

    #[test]
    fn test_config_roundtrip() {
        let mut m = DrawingModel::default();
        m.settings.connection_size = 3.0;
        m.settings.line_width = 0.25;
        m.layers[4].color = Color::rgb(1, 2, 3);
        m.layers[4].name = "Mechanical".into();
        m.layers[4].modified = true;
        let text = m.to_fidocad(true);
        assert!(text.contains("FJC C 3.0\n"));
        assert!(text.contains("FJC N 4 Mechanical\n"));
        assert!(!m.to_fidocad(false).contains("FJC"));

        let (back, errors) = DrawingModel::parse(&text, Arc::new(MacroLibrary::new()));
        assert!(errors.is_empty());
        assert_eq!(back.settings, m.settings);
        assert_eq!(back.layers[4], m.layers[4]);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[FIDOCAD]\nSA 5 5 1\nMC 0 0 0 0 missing").unwrap();
        let (m, errors) = DrawingModel::load(file.path(), Arc::new(MacroLibrary::new())).unwrap();
        assert!(errors.is_empty());
        assert_eq!(m.primitives.len(), 2);
        assert_eq!(m.used_layers().into_iter().collect::<Vec<_>>(), vec![1]);
    }
}
