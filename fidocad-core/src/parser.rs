//! Line-oriented reader for the FidoCad text format.
//!
//! Most primitives may be followed by an `FCJ` extension line and then by
//! two `TY` lines holding their name and value, so the reader keeps the
//! previous line around until it knows whether an extension follows.
//! Malformed lines are recorded and skipped.

use crate::error::{ParseError, ParseErrorKind};
use crate::layers::{standard_layers, Color, Layer};
use crate::primitive::Primitive;
use crate::settings::DrawingSettings;

/// Commands that may be followed by an `FCJ` line.
const EXTENSIBLE: &[&str] = &["LI", "BE", "MC", "RV", "RP", "EV", "EP", "PV", "PP", "CV", "CP", "PL", "PA", "SA"];

enum Pending {
    Idle,
    /// A primitive line waiting to see whether `FCJ` follows.
    Buffered { tokens: Vec<String>, line: usize },
    /// A parsed primitive waiting for its name and value `TY` lines.
    Labels { prim: Primitive, name: Option<(Vec<String>, usize)> },
}

/// What a parse produced besides the primitives.
pub struct ParseOutput {
    pub primitives: Vec<Primitive>,
    pub layers: Vec<Layer>,
    pub settings: DrawingSettings,
    pub errors: Vec<ParseError>,
}

struct LineParser {
    pending: Pending,
    out: ParseOutput,
}

fn as_strs(tokens: &[String]) -> Vec<&str> {
    tokens.iter().map(String::as_str).collect()
}

impl LineParser {
    fn new() -> Self {
        Self {
            pending: Pending::Idle,
            out: ParseOutput {
                primitives: Vec::new(),
                layers: standard_layers(),
                settings: DrawingSettings::default(),
                errors: Vec::new(),
            },
        }
    }

    fn error(&mut self, line: usize, kind: ParseErrorKind) {
        log::warn!("Skipping line {}: {}", line, kind);
        self.out.errors.push(ParseError::new(line, kind));
    }

    fn push_parsed(&mut self, tokens: &[&str], line: usize) {
        match Primitive::parse(tokens) {
            Ok(p) => self.out.primitives.push(p),
            Err(kind) => self.error(line, kind),
        }
    }

    /// Commits whatever is pending; a primitive still waiting for labels is
    /// kept without them.
    fn flush(&mut self) {
        match std::mem::replace(&mut self.pending, Pending::Idle) {
            Pending::Idle => {}
            Pending::Buffered { tokens, line } => self.push_parsed(&as_strs(&tokens), line),
            Pending::Labels { prim, .. } => self.out.primitives.push(prim),
        }
    }

    fn feed(&mut self, line_no: usize, raw: &str) {
        let tokens: Vec<&str> = raw.split_whitespace().collect();
        let Some(&cmd) = tokens.first() else {
            return;
        };

        if cmd != "FCJ" && matches!(self.pending, Pending::Buffered { .. }) {
            self.flush();
        }

        match cmd {
            "FCJ" => self.extension(&tokens),
            "FJC" => {
                self.flush();
                if let Err(kind) = self.config(&tokens) {
                    self.error(line_no, kind);
                }
            }
            "TY" => self.text(&tokens, line_no),
            "TE" => {
                self.flush();
                self.push_parsed(&tokens, line_no);
            }
            c if EXTENSIBLE.contains(&c) => {
                self.flush();
                self.pending = Pending::Buffered { tokens: tokens.iter().map(|t| t.to_string()).collect(), line: line_no };
            }
            c if c.starts_with('[') => log::debug!("Header line {}: {}", line_no, raw.trim()),
            other => self.error(line_no, ParseErrorKind::UnknownCommand(other.to_string())),
        }
    }

    fn extension(&mut self, tokens: &[&str]) {
        if !matches!(self.pending, Pending::Buffered { .. }) {
            return;
        }
        let Pending::Buffered { tokens: old, line } = std::mem::replace(&mut self.pending, Pending::Idle) else {
            return;
        };
        let old = as_strs(&old);
        match old[0] {
            "MC" | "PL" | "PA" | "SA" => match Primitive::parse(&old) {
                Ok(prim) => self.pending = Pending::Labels { prim, name: None },
                Err(kind) => self.error(line, kind),
            },
            cmd => {
                let mut all = old.clone();
                all.extend_from_slice(tokens);
                let threshold = if cmd == "LI" || cmd == "BE" { 5 } else { 2 };
                match Primitive::parse(&all) {
                    Ok(prim) if all.len() - 1 > threshold && all.last() == Some(&"1") => {
                        self.pending = Pending::Labels { prim, name: None };
                    }
                    Ok(prim) => self.out.primitives.push(prim),
                    Err(kind) => self.error(line, kind),
                }
            }
        }
    }

    fn text(&mut self, tokens: &[&str], line_no: usize) {
        match std::mem::replace(&mut self.pending, Pending::Idle) {
            Pending::Labels { prim, name: None } => {
                let owned = tokens.iter().map(|t| t.to_string()).collect();
                self.pending = Pending::Labels { prim, name: Some((owned, line_no)) };
            }
            Pending::Labels { mut prim, name: Some((name, name_line)) } => {
                if let Err(kind) = prim.set_name_from_tokens(&as_strs(&name)) {
                    self.error(name_line, kind);
                }
                if let Err(kind) = prim.set_value_from_tokens(tokens) {
                    self.error(line_no, kind);
                }
                self.out.primitives.push(prim);
            }
            other => {
                self.pending = other;
                self.flush();
                self.push_parsed(tokens, line_no);
            }
        }
    }

    /// `FJC` header lines: connection size, line widths, layer colors and
    /// names.
    fn config(&mut self, tokens: &[&str]) -> Result<(), ParseErrorKind> {
        let num = |i: usize| -> Result<f64, ParseErrorKind> {
            let t = tokens.get(i).copied().unwrap_or("");
            t.parse().map_err(|_| ParseErrorKind::InvalidNumber(t.to_string()))
        };
        let positive = |v: f64, target: &mut f64| {
            if v > 0.0 {
                *target = v;
            }
        };
        let settings = &mut self.out.settings;
        match tokens.get(1).copied() {
            Some("C") => positive(num(2)?, &mut settings.connection_size),
            Some("A") => positive(num(2)?, &mut settings.line_width),
            Some("B") => positive(num(2)?, &mut settings.line_width_circles),
            Some("L") => {
                let index = num(2)? as i64;
                let rgb = tokens.get(3).and_then(|t| t.parse::<i32>().ok());
                let rgb = rgb.ok_or_else(|| ParseErrorKind::InvalidNumber(tokens.get(3).unwrap_or(&"").to_string()))?;
                let alpha = num(4)? as f32;
                if let Some(layer) = usize::try_from(index).ok().and_then(|i| self.out.layers.get_mut(i)) {
                    layer.color = Color::from_argb(rgb);
                    layer.alpha = alpha;
                    layer.modified = true;
                }
            }
            Some("N") => {
                let index = num(2)? as i64;
                if let Some(layer) = usize::try_from(index).ok().and_then(|i| self.out.layers.get_mut(i)) {
                    layer.name = tokens.get(3..).map(|t| t.join(" ")).unwrap_or_default();
                    layer.modified = true;
                }
            }
            other => log::debug!("Ignoring FJC option {:?}", other),
        }
        Ok(())
    }

    fn finish(mut self) -> ParseOutput {
        self.flush();
        self.out
    }
}

/// Parses a whole drawing, including its `FJC` configuration.
pub fn parse_text(text: &str) -> ParseOutput {
    let mut parser = LineParser::new();
    for (i, line) in text.lines().enumerate() {
        parser.feed(i + 1, line);
    }
    parser.finish()
}

/// Parses a macro body: primitives only.
pub fn parse_primitives(text: &str) -> (Vec<Primitive>, Vec<ParseError>) {
    let out = parse_text(text);
    (out.primitives, out.errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitive::Shape;

    #[test]
    fn test_simple_drawing() {
        let out = parse_text("[FIDOCAD]\nLI 10 10 50 50 2\nRP 0 0 10 10 3\n");
        assert!(out.errors.is_empty());
        assert_eq!(out.primitives.len(), 2);
        assert_eq!(out.primitives[0].layer, 2);
        assert!(matches!(out.primitives[1].shape, Shape::Rectangle { filled: true, .. }));
    }

    #[test]
    fn test_extension_and_labels() {
        let text = "LI 0 0 20 0 1\nFCJ 2 0 3 1 1 1\nTY 5 5 4 3 0 0 1 * N1\nTY 5 10 4 3 0 0 1 * V1\nSA 0 0 0\n";
        let out = parse_text(text);
        assert!(out.errors.is_empty(), "{:?}", out.errors);
        assert_eq!(out.primitives.len(), 2);
        let line = &out.primitives[0];
        assert_eq!(line.labels.name, "N1");
        assert_eq!(line.labels.value, "V1");
        match &line.shape {
            Shape::Line { arrow, dash, .. } => {
                assert!(arrow.end && !arrow.start);
                assert_eq!(*dash, 1);
            }
            other => panic!("unexpected shape {:?}", other),
        }
    }

    #[test]
    fn test_macro_labels() {
        let text = "MC 40 40 0 0 R\nFCJ\nTY 50 50 5 4 0 0 0 * R1\nTY 50 45 5 4 0 0 0 * 1k\n";
        let out = parse_text(text);
        assert_eq!(out.primitives.len(), 1);
        assert_eq!(out.primitives[0].labels.value, "1k");
        assert_eq!(out.primitives[0].labels.font_size, 4);
    }

    #[test]
    fn test_standalone_text_after_primitive() {
        let out = parse_text("RV 0 0 10 10 1\nTY 1 2 4 3 0 0 0 * hello\n");
        assert_eq!(out.primitives.len(), 2);
        assert!(matches!(out.primitives[1].shape, Shape::Text(_)));
    }

    #[test]
    fn test_bad_lines_are_skipped() {
        let out = parse_text("LI 0 0 x 0 1\nXX 1 2\nSA 5 5 0\n");
        assert_eq!(out.primitives.len(), 1);
        let lines: Vec<usize> = out.errors.iter().map(|e| e.line).collect();
        assert_eq!(lines, vec![1, 2]);
    }

    #[test]
    fn test_fjc_configuration() {
        let out = parse_text("FJC C 3.5\nFJC A 0.2\nFJC B -1\nFJC L 2 -16776961 0.5\nFJC N 2 My layer\n");
        assert_eq!(out.settings.connection_size, 3.5);
        assert_eq!(out.settings.line_width, 0.2);
        assert_eq!(out.settings.line_width_circles, DrawingSettings::default().line_width_circles);
        assert_eq!(out.layers[2].color, Color::rgb(0, 0, 255));
        assert_eq!(out.layers[2].name, "My layer");
        assert!(out.layers[2].modified);
    }
}
