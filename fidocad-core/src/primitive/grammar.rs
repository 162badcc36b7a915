//! Token grammar of the FidoCad text format.
//!
//! Every primitive is one line whose first token is a two-letter command.
//! FidoCadJ attributes that the original format cannot hold (arrows, dash
//! styles, the name/value flag) follow on an extra line starting with `FCJ`.
//! Name and value are written as two `TY` lines after the primitive.

use super::{checked_layer, AdvText, MacroCall, PadStyle, Primitive, Shape, MAX_TEXT_SIZE};
use crate::coords::{round_half_up, Point};
use crate::error::ParseErrorKind;
use crate::geom::ArrowSpec;
use crate::settings::{check_dash_style, DEFAULT_TEXT_FONT};

/// Commands that start a primitive.
pub const COMMANDS: &[&str] = &[
    "LI", "BE", "RV", "RP", "EV", "EP", "PV", "PP", "CV", "CP", "PL", "PA", "SA", "TY", "TE", "MC",
];

const INT_TOLERANCE: f64 = 1e-5;

/// `*` stands for the default font; spaces in other names become `++`.
pub fn font_token(font: &str) -> String {
    if font == DEFAULT_TEXT_FONT {
        "*".to_string()
    } else {
        font.replace(' ', "++")
    }
}

pub fn parse_font_token(token: &str) -> String {
    if token == "*" {
        DEFAULT_TEXT_FONT.to_string()
    } else {
        token.replace("++", " ")
    }
}

fn round_intelligently(v: f64) -> String {
    if (v - v.round()).abs() < INT_TOLERANCE {
        format!("{}", v.round() as i64)
    } else {
        format!("{}", v)
    }
}

fn int(tokens: &[&str], i: usize) -> Result<i32, ParseErrorKind> {
    let tok = tokens.get(i).copied().unwrap_or("");
    tok.parse().map_err(|_| ParseErrorKind::InvalidNumber(tok.to_string()))
}

fn float(tokens: &[&str], i: usize) -> Result<f64, ParseErrorKind> {
    let tok = tokens.get(i).copied().unwrap_or("");
    tok.parse().map_err(|_| ParseErrorKind::InvalidNumber(tok.to_string()))
}

fn point(tokens: &[&str], i: usize) -> Result<Point, ParseErrorKind> {
    Ok(Point::new(int(tokens, i)?, int(tokens, i + 1)?))
}

/// Unreadable layers silently become layer 0.
fn layer(tokens: &[&str], i: usize) -> usize {
    tokens.get(i).and_then(|t| t.parse::<i64>().ok()).map(checked_layer).unwrap_or(0)
}

fn require(tokens: &[&str], expected: usize) -> Result<(), ParseErrorKind> {
    if tokens.len() < expected {
        return Err(ParseErrorKind::TooFewTokens {
            command: tokens.first().copied().unwrap_or("").to_string(),
            found: tokens.len(),
            expected,
        });
    }
    Ok(())
}

fn text_size(tokens: &[&str], i: usize) -> Result<i32, ParseErrorKind> {
    Ok(round_half_up(float(tokens, i)?).clamp(1, MAX_TEXT_SIZE))
}

fn joined(tokens: &[&str], from: usize) -> String {
    tokens.get(from..).map(|t| t.join(" ")).unwrap_or_default()
}

/// Point list of a polygon or curve, followed by the optional layer and
/// the index of the `FCJ` marker if one is present.
fn point_list(tokens: &[&str], from: usize) -> Result<(Vec<Point>, usize, Option<usize>), ParseErrorKind> {
    let fcj = tokens.iter().position(|t| *t == "FCJ");
    let end = fcj.unwrap_or(tokens.len());
    let body = tokens.get(from..end).unwrap_or(&[]);
    let mut points = Vec::with_capacity(body.len() / 2);
    let mut j = 0;
    while j + 1 < body.len() {
        points.push(point(body, j)?);
        j += 2;
    }
    let lay = if j < body.len() { layer(body, j) } else { 0 };
    Ok((points, lay, fcj))
}

impl Primitive {
    /// Parses one primitive line. `tokens[0]` is the command; for kinds with
    /// an extension line the `FCJ` tokens are appended after the main ones.
    pub fn parse(tokens: &[&str]) -> Result<Primitive, ParseErrorKind> {
        let cmd = tokens.first().copied().unwrap_or("");
        match cmd {
            "LI" => {
                require(tokens, 5)?;
                let (p1, p2) = (point(tokens, 1)?, point(tokens, 3)?);
                let (mut arrow, mut dash) = (ArrowSpec::default(), 0);
                if tokens.len() > 6 && tokens[6] == "FCJ" {
                    let (a, i) = ArrowSpec::parse_tokens(tokens, 7)?;
                    arrow = a;
                    dash = check_dash_style(int(tokens, i)?);
                }
                Ok(Primitive::new(layer(tokens, 5), Shape::Line { p1, p2, arrow, dash }))
            }
            "RV" | "RP" | "EV" | "EP" => {
                require(tokens, 5)?;
                let (p1, p2) = (point(tokens, 1)?, point(tokens, 3)?);
                let filled = cmd.ends_with('P');
                let dash = if tokens.len() > 7 && tokens[6] == "FCJ" {
                    check_dash_style(int(tokens, 7)?)
                } else {
                    0
                };
                let shape = if cmd.starts_with('R') {
                    Shape::Rectangle { p1, p2, filled, dash }
                } else {
                    Shape::Oval { p1, p2, filled, dash }
                };
                Ok(Primitive::new(layer(tokens, 5), shape))
            }
            "PV" | "PP" => {
                require(tokens, 6)?;
                let (points, lay, fcj) = point_list(tokens, 1)?;
                let dash = match fcj {
                    Some(i) if tokens.len() > i + 1 => check_dash_style(int(tokens, i + 1)?),
                    _ => 0,
                };
                Ok(Primitive::new(lay, Shape::Polygon { points, filled: cmd == "PP", dash }))
            }
            "CV" | "CP" => {
                require(tokens, 6)?;
                let closed = tokens[1] == "1";
                let (points, lay, fcj) = point_list(tokens, 2)?;
                let (mut arrow, mut dash) = (ArrowSpec::default(), 0);
                if let Some(i) = fcj {
                    let (a, k) = ArrowSpec::parse_tokens(tokens, i + 1)?;
                    arrow = a;
                    dash = check_dash_style(int(tokens, k)?);
                }
                Ok(Primitive::new(lay, Shape::Curve { points, filled: cmd == "CP", closed, arrow, dash }))
            }
            "BE" => {
                require(tokens, 9)?;
                let points = [point(tokens, 1)?, point(tokens, 3)?, point(tokens, 5)?, point(tokens, 7)?];
                let (mut arrow, mut dash) = (ArrowSpec::default(), 0);
                if tokens.len() > 10 && tokens[10] == "FCJ" {
                    let (a, i) = ArrowSpec::parse_tokens(tokens, 11)?;
                    arrow = a;
                    dash = check_dash_style(int(tokens, i)?);
                }
                Ok(Primitive::new(layer(tokens, 9), Shape::Bezier { points, arrow, dash }))
            }
            "PL" => {
                require(tokens, 6)?;
                let (p1, p2) = (point(tokens, 1)?, point(tokens, 3)?);
                let width = float(tokens, 5)?;
                Ok(Primitive::new(layer(tokens, 6), Shape::PcbLine { p1, p2, width }))
            }
            "PA" => {
                require(tokens, 7)?;
                let p = point(tokens, 1)?;
                let (rx, ry, drill) = (int(tokens, 3)?, int(tokens, 4)?, int(tokens, 5)?);
                let style = PadStyle::from_code(int(tokens, 6)?);
                Ok(Primitive::new(layer(tokens, 7), Shape::PcbPad { p, rx, ry, drill, style }))
            }
            "SA" => {
                require(tokens, 3)?;
                Ok(Primitive::new(layer(tokens, 3), Shape::Connection { p: point(tokens, 1)? }))
            }
            "TY" => {
                require(tokens, 9)?;
                let text = AdvText {
                    p: point(tokens, 1)?,
                    size_y: text_size(tokens, 3)?,
                    size_x: text_size(tokens, 4)?,
                    orientation: int(tokens, 5)?,
                    style: int(tokens, 6)?,
                    font: parse_font_token(tokens[8]),
                    text: joined(tokens, 9),
                };
                Ok(Primitive::new(layer(tokens, 7), Shape::Text(text)))
            }
            "TE" => {
                require(tokens, 4)?;
                let text = AdvText {
                    p: point(tokens, 1)?,
                    size_y: 4,
                    size_x: 3,
                    orientation: 0,
                    style: 0,
                    font: DEFAULT_TEXT_FONT.to_string(),
                    text: joined(tokens, 3),
                };
                Ok(Primitive::new(0, Shape::Text(text)))
            }
            "MC" => {
                require(tokens, 6)?;
                let call = MacroCall {
                    p: point(tokens, 1)?,
                    orientation: int(tokens, 3)?.rem_euclid(4) as u8,
                    mirror: int(tokens, 4)? == 1,
                    key: joined(tokens, 5).to_lowercase(),
                };
                Ok(Primitive::new(0, Shape::Macro(call)))
            }
            other => Err(ParseErrorKind::UnknownCommand(other.to_string())),
        }
    }

    /// Reads the `TY` line holding the name label.
    pub fn set_name_from_tokens(&mut self, tokens: &[&str]) -> Result<(), ParseErrorKind> {
        require(tokens, 9)?;
        self.labels.name_pos = point(tokens, 1)?;
        self.labels.name = joined(tokens, 9);
        Ok(())
    }

    /// Reads the `TY` line holding the value label, which also carries the
    /// label font and size.
    pub fn set_value_from_tokens(&mut self, tokens: &[&str]) -> Result<(), ParseErrorKind> {
        require(tokens, 9)?;
        self.labels.value_pos = point(tokens, 1)?;
        self.labels.font_size = int(tokens, 4)?;
        self.labels.font = parse_font_token(tokens[8]);
        self.labels.value = joined(tokens, 9);
        Ok(())
    }

    /// Writes the primitive back in the token grammar. With `extensions`
    /// off, FidoCadJ-only attributes are left out.
    pub fn to_fidocad(&self, extensions: bool) -> String {
        let layer = self.layer;
        let has_labels = !self.labels.is_empty();
        let text_flag = if has_labels { "1" } else { "0" };
        let pts = |points: &[Point]| points.iter().map(|p| format!("{} {} ", p.x, p.y)).collect::<String>();

        match &self.shape {
            Shape::Line { p1, p2, arrow, dash } => {
                let mut s = format!("LI {} {} {} {} {}\n", p1.x, p1.y, p2.x, p2.y, layer);
                if extensions && (arrow.any() || *dash > 0 || has_labels) {
                    s += &format!("FCJ {} {} {}\n", arrow.to_tokens(), dash, text_flag);
                }
                s + &self.save_labels(false)
            }
            Shape::Rectangle { p1, p2, dash, .. } | Shape::Oval { p1, p2, dash, .. } => {
                let mut s = format!("{} {} {} {} {} {}\n", self.shape.command(), p1.x, p1.y, p2.x, p2.y, layer);
                if extensions && (*dash > 0 || has_labels) {
                    s += &format!("FCJ {} {}\n", dash, text_flag);
                }
                s + &self.save_labels(false)
            }
            Shape::Polygon { points, dash, .. } => {
                let mut s = format!("{} {}{}\n", self.shape.command(), pts(points.as_slice()), layer);
                if extensions && (*dash > 0 || has_labels) {
                    s += &format!("FCJ {} {}\n", dash, text_flag);
                }
                s + &self.save_labels(false)
            }
            Shape::Curve { points, closed, arrow, dash, .. } => {
                if points.len() == 1 && !has_labels {
                    return String::new();
                }
                let mut s = format!("{} {} {}{}\n", self.shape.command(), *closed as u8, pts(points.as_slice()), layer);
                if extensions && (arrow.any() || *dash > 0 || has_labels) {
                    s += &format!("FCJ {} {} {}\n", arrow.to_tokens(), dash, text_flag);
                }
                s + &self.save_labels(false)
            }
            Shape::Bezier { points, arrow, dash } => {
                let mut s = format!("BE {}{}\n", pts(&points[..]), layer);
                if extensions && (arrow.any() || *dash > 0 || has_labels) {
                    s += &format!("FCJ {} {} {}\n", arrow.to_tokens(), dash, text_flag);
                }
                s + &self.save_labels(false)
            }
            Shape::PcbLine { p1, p2, width } => {
                format!("PL {} {} {} {} {} {}\n", p1.x, p1.y, p2.x, p2.y, round_intelligently(*width), layer)
                    + &self.save_labels(extensions)
            }
            Shape::PcbPad { p, rx, ry, drill, style } => {
                format!("PA {} {} {} {} {} {} {}\n", p.x, p.y, rx, ry, drill, style.code(), layer)
                    + &self.save_labels(extensions)
            }
            Shape::Connection { p } => format!("SA {} {} {}\n", p.x, p.y, layer) + &self.save_labels(extensions),
            Shape::Text(t) => format!(
                "TY {} {} {} {} {} {} {} {} {}\n",
                t.p.x,
                t.p.y,
                t.size_y,
                t.size_x,
                t.orientation,
                t.style,
                layer,
                font_token(&t.font),
                t.text
            ),
            Shape::Macro(m) => {
                format!("MC {} {} {} {} {}\n", m.p.x, m.p.y, m.orientation, m.mirror as u8, m.key)
                    + &self.save_labels(extensions)
            }
        }
    }

    /// The two `TY` lines holding name and value, or nothing when both are
    /// empty.
    fn save_labels(&self, extensions: bool) -> String {
        let l = &self.labels;
        if l.is_empty() {
            return String::new();
        }
        let font = font_token(&l.font);
        let mut s = String::new();
        if extensions {
            s.push_str("FCJ\n");
        }
        for (pos, text) in [(l.name_pos, &l.name), (l.value_pos, &l.value)] {
            s += &format!(
                "TY {} {} {} {} 0 0 {} {} {}\n",
                pos.x,
                pos.y,
                l.font_size * 4 / 3,
                l.font_size,
                self.layer,
                font,
                text
            );
        }
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Primitive {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        Primitive::parse(&tokens).unwrap()
    }

    #[test]
    fn test_line_without_extensions() {
        let p = parse("LI 10 10 50 50 2");
        assert_eq!(p.layer, 2);
        assert_eq!(p.to_fidocad(false), "LI 10 10 50 50 2\n");
        assert_eq!(p.to_fidocad(true), "LI 10 10 50 50 2\n");
    }

    #[test]
    fn test_line_with_arrow_extension() {
        let p = parse("LI 0 0 20 0 1 FCJ 1 0 3 1 2 0");
        match &p.shape {
            Shape::Line { arrow, dash, .. } => {
                assert!(arrow.start && !arrow.end);
                assert_eq!(*dash, 2);
            }
            other => panic!("unexpected shape {:?}", other),
        }
        assert_eq!(p.to_fidocad(true), "LI 0 0 20 0 1\nFCJ 1 0 3 1 2 0\n");
        assert_eq!(p.to_fidocad(false), "LI 0 0 20 0 1\n");
    }

    #[test]
    fn test_polygon_layer_and_dash() {
        let p = parse("PP 0 0 10 0 10 10 3 FCJ 1 0");
        assert_eq!(p.layer, 3);
        match &p.shape {
            Shape::Polygon { points, filled, dash } => {
                assert_eq!(points.len(), 3);
                assert!(*filled);
                assert_eq!(*dash, 1);
            }
            other => panic!("unexpected shape {:?}", other),
        }
        assert_eq!(p.labels.name_pos, Point::new(15, 15));
        assert_eq!(p.to_fidocad(true), "PP 0 0 10 0 10 10 3\nFCJ 1 0\n");
    }

    #[test]
    fn test_curve_closed_flag() {
        let p = parse("CV 1 0 0 10 10 20 0 4");
        match &p.shape {
            Shape::Curve { points, closed, filled, .. } => {
                assert_eq!(points.len(), 3);
                assert!(*closed);
                assert!(!*filled);
            }
            other => panic!("unexpected shape {:?}", other),
        }
        assert_eq!(p.to_fidocad(false), "CV 1 0 0 10 10 20 0 4\n");
    }

    #[test]
    fn test_text_fonts_and_sizes() {
        let p = parse("TY 5 5 0 3 0 1 2 Times++New++Roman Hello world");
        match &p.shape {
            Shape::Text(t) => {
                assert_eq!(t.size_y, 1);
                assert_eq!(t.font, "Times New Roman");
                assert_eq!(t.text, "Hello world");
                assert!(t.is_bold());
            }
            other => panic!("unexpected shape {:?}", other),
        }
        assert_eq!(p.to_fidocad(true), "TY 5 5 1 3 0 1 2 Times++New++Roman Hello world\n");
    }

    #[test]
    fn test_legacy_text() {
        let p = parse("TE 10 20 some text");
        assert_eq!(p.layer, 0);
        assert_eq!(p.to_fidocad(false), "TY 10 20 4 3 0 0 0 * some text\n");
    }

    #[test]
    fn test_macro_key_lowercased() {
        let p = parse("MC 40 30 1 1 PCB.Resistor");
        assert_eq!(p.to_fidocad(true), "MC 40 30 1 1 pcb.resistor\n");
    }

    #[test]
    fn test_labels_serialized() {
        let p = parse("PA 10 10 15 15 4 1 2").with_labels("R1", "10k");
        assert_eq!(
            p.to_fidocad(true),
            "PA 10 10 15 15 4 1 2\nFCJ\nTY 15 15 4 3 0 0 2 * R1\nTY 15 20 4 3 0 0 2 * 10k\n"
        );
    }

    #[test]
    fn test_pcb_line_width_format() {
        assert_eq!(parse("PL 0 0 10 10 2.0 1").to_fidocad(false), "PL 0 0 10 10 2 1\n");
        assert_eq!(parse("PL 0 0 10 10 0.8 1").to_fidocad(false), "PL 0 0 10 10 0.8 1\n");
    }

    #[test]
    fn test_errors() {
        let tokens = ["LI", "1", "2"];
        assert!(matches!(Primitive::parse(&tokens), Err(ParseErrorKind::TooFewTokens { .. })));
        let tokens = ["RV", "1", "x", "3", "4"];
        assert_eq!(Primitive::parse(&tokens), Err(ParseErrorKind::InvalidNumber("x".into())));
        let tokens = ["ZZ", "1"];
        assert_eq!(Primitive::parse(&tokens), Err(ParseErrorKind::UnknownCommand("ZZ".into())));
    }
}
