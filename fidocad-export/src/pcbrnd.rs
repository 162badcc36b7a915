//! gEDA PCB / pcb-rnd layout output.
//!
//! Coordinates are centimils, 500 per logical unit. Drawing elements are
//! sorted into the sixteen layers of the default pcb-rnd stack-up and
//! written at the end, after the footprints built from macro bodies.

use std::collections::HashSet;
use std::f64::consts::PI;
use std::io::Write;

use fidocad_core::geom::bezier_points;
use fidocad_core::{Dimension, Layer, PadStyle, Point, PointF, MAX_LAYERS};

use crate::backend::{Arrows, ExportBackend, MacroPlacement, PadItem, Stroke, TextItem};
use crate::error::ExportResult;

const DEFAULT_CLEARANCE: i64 = 1000;
const MIN_LINE_THICKNESS: i64 = 1000;
const BEZIER_SEGMENTS: usize = 11;
const FOOTPRINT_BEZIER_SEGMENTS: usize = 9;
const ELLIPSE_SEGMENTS: usize = 22;
/// Footprint lines default to 10 mil.
const FOOTPRINT_LINE: f64 = 2.0;
/// Macro bodies are drawn around this point.
const MACRO_ORIGIN: i32 = 100;
/// Height of the default gEDA font at 100%, centimils.
const GEDA_FONT_HEIGHT: i64 = 5789;

const LAYER_NAMES: [&str; MAX_LAYERS] = [
    "B.Cu", "F.Cu", "Inner1.Cu", "Inner2.Cu", "Inner3.Cu", "Inner4.Cu", "Inner5.Cu", "Inner6.Cu", "Inner7.Cu",
    "Inner8.Cu", "Inner9.Cu", "Inner10.Cu", "Inner11.Cu", "Inner12.Cu", "B.SilkS", "F.SilkS",
];

const HEADER: &str = "# release: pcb 20110918\n\n\
# To read pcb files, the pcb version (or the git source date) must be >= the file version\n\
FileVersion[20070407]\n\n\
PCB[\"\" 600000 500000]\n\n\
Grid[500.0 0 0 1]\n\
Cursor[2500 62500 0.000000]\n\
PolyArea[3100.006200]\n\
Thermal[0.500000]\n\
DRC[1200 900 1000 700 1500 1000]\n\
Flags(\"nameonpcb,clearnew,snappin\")\n\
Groups(\"1,s:2,c:3:4:5:6:7:8:9:10:11:12:13:14\")\n\
Styles[\"Signal,1000,7874,3150,2000:Power,2000,8661,3937,2000:Fat,8000,13780,4724,2500:Sig-tight,1000,6400,3150,1200\"]\n\n\
Attribute(\"PCB::grid::unit\" \"mil\")\n";

fn pcb(v: f64) -> i64 {
    (500.0 * v) as i64
}

fn thickness(v: f64) -> i64 {
    pcb(v).max(MIN_LINE_THICKNESS)
}

/// pcb-rnd stack-up slot of a drawing layer: circuit and silk go to the
/// silk layers, copper to the copper layers, the rest inward.
fn stack_slot(layer: usize) -> Option<usize> {
    match layer {
        0 => Some(14),
        1 => Some(0),
        2 => Some(1),
        3 => Some(15),
        4..=15 => Some(layer - 2),
        _ => None,
    }
}

fn line(x1: f64, y1: f64, x2: f64, y2: f64, width: f64) -> String {
    format!(
        "\tLine[{} {} {} {} {} {} \"clearline\"]\n",
        pcb(x1),
        pcb(y1),
        pcb(x2),
        pcb(y2),
        thickness(width),
        DEFAULT_CLEARANCE
    )
}

fn polyline(points: &[PointF], width: f64) -> String {
    points.windows(2).map(|s| line(s[0].x, s[0].y, s[1].x, s[1].y, width)).collect()
}

fn polygon(points: &[PointF], width: f64, filled: bool) -> String {
    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        return String::new();
    };
    if filled {
        let corners: Vec<String> = points.iter().map(|p| format!("[{} {}]", pcb(p.x), pcb(p.y))).collect();
        format!("\tPolygon(\"clearpoly\")\n\t(\n\t\t{}\n)\n", corners.join(" "))
    } else {
        polyline(points, width) + &line(last.x, last.y, first.x, first.y, width)
    }
}

fn arc(cx: f64, cy: f64, d: i32, width: f64, filled: bool) -> String {
    let d = pcb(d as f64);
    if filled {
        format!("\tArc[{} {} {} {} {} {} 0 360 \"clearline\"]\n", pcb(cx), pcb(cy), d / 4, d / 4, d / 2, DEFAULT_CLEARANCE)
    } else {
        format!(
            "\tArc[{} {} {} {} {} {} 0 360 \"clearline\"]\n",
            pcb(cx),
            pcb(cy),
            d / 2,
            d / 2,
            thickness(width),
            DEFAULT_CLEARANCE
        )
    }
}

fn element_line(x1: f64, y1: f64, x2: f64, y2: f64, width: f64) -> String {
    format!("\tElementLine[{} {} {} {} {}]\n", pcb(x1), pcb(y1), pcb(x2), pcb(y2), thickness(width))
}

fn element_arc(cx: f64, cy: f64, d: i32, filled: bool) -> String {
    let d = pcb(d as f64);
    if filled {
        format!("\tElementArc[{} {} {} {} 0 360 {}]\n", pcb(cx), pcb(cy), d / 4, d / 4, d / 2)
    } else {
        format!(
            "\tElementArc[{} {} {} {} 0 360 {} ]\n",
            pcb(cx),
            pcb(cy),
            d / 2,
            d / 2,
            thickness(FOOTPRINT_LINE)
        )
    }
}

/// A rectangle as one pad stroke along its longer side, or as a silk line
/// when it sits on the silk layer.
fn rect_pad(x1: f64, y1: f64, x2: f64, y2: f64, layer: i64, number: usize) -> String {
    let (mx, my) = ((x2 - x1) / 2.0 + x1, (y2 - y1) / 2.0 + y1);
    let (dx, dy) = ((x2 - x1).abs(), (y2 - y1).abs());
    let (t, a, b) = if dy > dx {
        (dx, (mx, my + (dy - dx) / 2.0), (mx, my - (dy - dx) / 2.0))
    } else {
        (dy, (mx + (dx - dy) / 2.0, my), (mx - (dx - dy) / 2.0, my))
    };
    if layer == 3 {
        return format!("\tElementLine[{} {} {} {} {}]\n", pcb(a.0), pcb(a.1), pcb(b.0), pcb(b.1), pcb(t));
    }
    format!(
        "\tPad[{} {} {} {} {} {} {} \"{n}\" \"{n}\" \"square\"]\n",
        pcb(a.0),
        pcb(a.1),
        pcb(b.0),
        pcb(b.1),
        pcb(t),
        DEFAULT_CLEARANCE,
        pcb(t) + 600,
        n = number
    )
}

fn pin(x: f64, y: f64, dx: f64, dy: f64, drill: i64, style: i64, number: usize) -> String {
    let t = dx.min(dy);
    let mut s = format!(
        "\tPin[{} {} {} {} {} {} \"{n}\" \"{n}\" \"\"]\n",
        pcb(x),
        pcb(y),
        pcb(t),
        DEFAULT_CLEARANCE,
        pcb(t) + 600,
        pcb(drill as f64),
        n = number
    );
    if style > 0 {
        let (x1, x2, y1, y2) = (x - dx / 2.0, x + dx / 2.0, y - dy / 2.0, y + dy / 2.0);
        s += &rect_pad(x1, y1, x2, y2, 1, number);
        s += &rect_pad(x1, y1, x2, y2, 2, number);
    }
    s
}

/// Footprint element for one primitive line of a macro body, relative to
/// the macro origin. Only silk shapes, pads and pins have a counterpart;
/// `None` means the line did not parse.
fn footprint_element(tokens: &[&str], pad_number: &mut usize) -> Option<String> {
    let int = |i: usize| tokens.get(i).and_then(|t| t.parse::<i64>().ok());
    let local = |i: usize| int(i).map(|v| (v - MACRO_ORIGIN as i64) as f64);
    let on_silk = tokens.get(5) == Some(&"3");
    let lines = |points: &[PointF]| -> String {
        points.windows(2).map(|s| element_line(s[0].x, s[0].y, s[1].x, s[1].y, FOOTPRINT_LINE)).collect()
    };

    let element = match tokens[0] {
        "LI" if on_silk => element_line(local(1)?, local(2)?, local(3)?, local(4)?, FOOTPRINT_LINE),
        "EP" | "EV" if on_silk => {
            let (x1, y1, x2, y2) = (int(1)?, int(2)?, int(3)?, int(4)?);
            let (dx, dy) = ((x2 - x1).abs(), (y2 - y1).abs());
            if dx != dy {
                // ellipses are left out
                return Some(String::new());
            }
            let origin = MACRO_ORIGIN as i64;
            let (mx, my) = ((x1 + x2) / 2 - origin, (y1 + y2) / 2 - origin);
            element_arc(mx as f64, my as f64, dx as i32, tokens[0] == "EP")
        }
        "RP" if tokens[5] != "0" => {
            let pad = rect_pad(local(1)?, local(2)?, local(3)?, local(4)?, int(5)?, *pad_number);
            *pad_number += 1;
            pad
        }
        "RV" if on_silk => {
            let (x1, y1, x2, y2) = (local(1)?, local(2)?, local(3)?, local(4)?);
            let corners = [(x1, y1), (x1, y2), (x2, y2), (x2, y1), (x1, y1)].map(|(x, y)| PointF::new(x, y));
            lines(&corners)
        }
        "PA" => {
            let pin = pin(local(1)?, local(2)?, int(3)? as f64, int(4)? as f64, int(5)?, int(6)?, *pad_number);
            *pad_number += 1;
            pin
        }
        "PV" => {
            let n = if tokens.len() % 2 == 0 { (tokens.len() - 2) / 2 } else { 0 };
            let points = (0..n)
                .map(|v| Some(PointF::new(local(2 * v + 1)?, local(2 * v + 2)?)))
                .collect::<Option<Vec<_>>>()?;
            lines(&points)
        }
        "BE" if tokens.get(9).is_some_and(|l| *l != "0") => {
            let mut ctrl = [PointF::default(); 4];
            for (k, c) in ctrl.iter_mut().enumerate() {
                *c = PointF::new(local(2 * k + 1)?, local(2 * k + 2)?);
            }
            lines(&bezier_points(ctrl, FOOTPRINT_BEZIER_SEGMENTS))
        }
        other => {
            log::debug!("No footprint counterpart for '{}' in macro body", other);
            String::new()
        }
    };
    Some(element)
}

fn footprint_body(body: &str) -> String {
    let mut out = String::new();
    let mut pad_number = 1;
    for raw in body.lines() {
        let tokens: Vec<&str> = raw.split_whitespace().collect();
        if tokens.len() < 6 {
            continue;
        }
        match footprint_element(&tokens, &mut pad_number) {
            Some(e) => out.push_str(&e),
            None => log::debug!("Malformed macro body line skipped: {}", raw),
        }
    }
    out
}

pub struct PcbRndBackend<W: Write> {
    out: W,
    footprints: Vec<String>,
    placed: HashSet<String>,
    vias: Vec<String>,
    layers: [Vec<String>; MAX_LAYERS],
}

impl<W: Write> PcbRndBackend<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            footprints: Vec::new(),
            placed: HashSet::new(),
            vias: Vec::new(),
            layers: Default::default(),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn push(&mut self, element: String, layer: usize) {
        match stack_slot(layer) {
            Some(slot) => self.layers[slot].push(element),
            None => log::debug!("Layer {} has no pcb-rnd counterpart", layer),
        }
    }
}

impl<W: Write> ExportBackend for PcbRndBackend<W> {
    fn export_start(&mut self, _size: Dimension, _layers: &[Layer], _grid: i32) -> ExportResult<()> {
        self.footprints.clear();
        self.placed.clear();
        self.vias.clear();
        self.layers.iter_mut().for_each(Vec::clear);
        self.out.write_all(HEADER.as_bytes())?;
        writeln!(self.out, "# Created by {}", crate::creator())?;
        Ok(())
    }

    fn export_end(&mut self) -> ExportResult<()> {
        for fp in self.footprints.drain(..) {
            self.out.write_all(fp.as_bytes())?;
        }
        for via in self.vias.drain(..) {
            self.out.write_all(via.as_bytes())?;
        }
        for (i, name) in LAYER_NAMES.iter().enumerate() {
            writeln!(self.out, "Layer({} \"{}\")\n(", i + 1, name)?;
            for el in self.layers[i].drain(..) {
                self.out.write_all(el.as_bytes())?;
            }
            writeln!(self.out, ")")?;
        }
        self.out.flush()?;
        Ok(())
    }

    fn export_adv_text(&mut self, t: &TextItem<'_>) -> ExportResult<()> {
        let scaling = 2 * 100 * pcb(t.size_y as f64) / GEDA_FONT_HEIGHT;
        let rotation = match t.orientation.rem_euclid(360) {
            46..=135 => 1,
            136..=225 => 2,
            226..=315 => 3,
            _ => 0,
        };
        let text = format!(
            "\tText[{} {} {} {} \"{}\" \"clearline\"]\n",
            pcb(t.p.x as f64),
            pcb(t.p.y as f64),
            rotation,
            scaling,
            t.text
        );
        self.push(text, t.layer);
        Ok(())
    }

    fn export_bezier(&mut self, points: [Point; 4], _arrows: &Arrows, stroke: &Stroke) -> ExportResult<()> {
        let ctrl = points.map(|p| PointF::new(p.x as f64, p.y as f64));
        let lines = polyline(&bezier_points(ctrl, BEZIER_SEGMENTS), stroke.width);
        self.push(lines, stroke.layer);
        Ok(())
    }

    fn export_connection(&mut self, _p: Point, _layer: usize, _size: f64) -> ExportResult<()> {
        Ok(())
    }

    fn export_line(&mut self, p1: PointF, p2: PointF, _arrows: &Arrows, stroke: &Stroke) -> ExportResult<()> {
        self.push(line(p1.x, p1.y, p2.x, p2.y, stroke.width), stroke.layer);
        Ok(())
    }

    fn export_macro(&mut self, m: &MacroPlacement<'_>) -> ExportResult<bool> {
        let id = format!(
            "macroName={}-x={}-y={}-rot={}-mirror={}",
            m.key, m.p.x, m.p.y, m.orientation, m.mirror
        );
        if self.placed.insert(id.clone()) {
            let body = footprint_body(m.body);
            if !body.is_empty() {
                self.footprints.push(format!(
                    "Element[\"\" \"{}\" \"\" \"\" {} {} -2500 -1500 0 100 \"\"]\n(\n{})\n",
                    id,
                    pcb(m.p.x as f64),
                    pcb(m.p.y as f64),
                    body
                ));
            } else {
                log::debug!("Macro '{}' has no footprint elements", m.key);
            }
        }
        Ok(true)
    }

    fn export_oval(&mut self, p1: Point, p2: Point, filled: bool, stroke: &Stroke) -> ExportResult<()> {
        let (dx, dy) = ((p2.x - p1.x).abs(), (p2.y - p1.y).abs());
        let (mx, my) = ((p1.x + p2.x) as f64 / 2.0, (p1.y + p2.y) as f64 / 2.0);
        let shape = if dx == dy {
            arc(mx, my, dx, stroke.width, filled)
        } else {
            let step = 2.0 * PI / ELLIPSE_SEGMENTS as f64;
            let vertices: Vec<PointF> = (0..ELLIPSE_SEGMENTS)
                .map(|t| {
                    let theta = step * t as f64;
                    PointF::new(mx + theta.cos() * dx as f64 / 2.0, my + theta.sin() * dy as f64 / 2.0)
                })
                .collect();
            polygon(&vertices, stroke.width, filled)
        };
        self.push(shape, stroke.layer);
        Ok(())
    }

    fn export_pcb_line(&mut self, p1: Point, p2: Point, width: i32, layer: usize) -> ExportResult<()> {
        self.push(line(p1.x as f64, p1.y as f64, p2.x as f64, p2.y as f64, width as f64), layer);
        Ok(())
    }

    fn export_pcb_pad(&mut self, pad: &PadItem) -> ExportResult<()> {
        if pad.only_hole {
            return Ok(());
        }
        let size = pcb(pad.rx.max(pad.ry) as f64);
        let flags = match pad.style {
            PadStyle::Square => "square",
            PadStyle::Rounded => "square,shape(17)",
            PadStyle::Oval => "",
        };
        self.vias.push(format!(
            "\tVia[{} {} {} {} {} {} \"\" \"{}\"]\n# Oval and rect pad export approximated\n",
            pcb(pad.p.x as f64),
            pcb(pad.p.y as f64),
            size,
            size + 100,
            size + 100,
            pcb(pad.drill as f64),
            flags
        ));
        Ok(())
    }

    fn export_polygon(&mut self, points: &[PointF], filled: bool, stroke: &Stroke) -> ExportResult<()> {
        self.push(polygon(points, stroke.width, filled), stroke.layer);
        Ok(())
    }

    fn export_curve(
        &mut self,
        points: &[PointF],
        _filled: bool,
        _closed: bool,
        _arrows: &Arrows,
        stroke: &Stroke,
    ) -> ExportResult<bool> {
        match points {
            [] => {
                log::debug!("Empty curve ignored");
                Ok(true)
            }
            [a, b] => {
                self.push(line(a.x, a.y, b.x, b.y, stroke.width), stroke.layer);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn export_rectangle(&mut self, p1: Point, p2: Point, filled: bool, stroke: &Stroke) -> ExportResult<()> {
        let (x1, y1, x2, y2) = (p1.x as f64, p1.y as f64, p2.x as f64, p2.y as f64);
        let shape = if filled {
            format!(
                "\tPolygon(\"clearpoly\")\n\t(\n\t\t[{} {}] [{} {}] [{} {}] [{} {}]\n\t)\n",
                pcb(x1),
                pcb(y1),
                pcb(x1),
                pcb(y2),
                pcb(x2),
                pcb(y2),
                pcb(x2),
                pcb(y1)
            )
        } else {
            let w = stroke.width;
            line(x1, y1, x1, y2, w) + &line(x1, y2, x2, y2, w) + &line(x2, y2, x2, y1, w) + &line(x2, y1, x1, y1, w)
        };
        self.push(shape, stroke.layer);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fidocad_core::{standard_layers, MacroLibrary};

    fn started() -> PcbRndBackend<Vec<u8>> {
        let mut b = PcbRndBackend::new(Vec::new());
        b.export_start(Dimension::new(100, 100), &standard_layers(), 5).unwrap();
        b
    }

    fn finish(mut b: PcbRndBackend<Vec<u8>>) -> String {
        b.export_end().unwrap();
        String::from_utf8(b.into_inner()).unwrap()
    }

    fn placement<'a>(lib: &'a MacroLibrary, body: &'a str) -> MacroPlacement<'a> {
        MacroPlacement {
            p: Point::new(20, 30),
            mirror: false,
            orientation: 0,
            key: "pcb.dip",
            body,
            name: "",
            name_pos: Point::new(0, 0),
            value: "",
            value_pos: Point::new(0, 0),
            font: "Courier New",
            font_size: 4,
            library: lib,
        }
    }

    #[test]
    fn test_layers_follow_stack_up() {
        let mut b = started();
        b.export_line(PointF::new(0.0, 0.0), PointF::new(10.0, 0.0), &Arrows::none(), &Stroke::new(2, 0, 0.5))
            .unwrap();
        b.export_pcb_line(Point::new(0, 0), Point::new(0, 10), 4, 1).unwrap();
        let text = finish(b);
        assert!(text.starts_with("# release: pcb 20110918\n"));
        let f_cu = text.find("Layer(2 \"F.Cu\")\n(\n\tLine[0 0 5000 0 1000 1000 \"clearline\"]\n)\n").unwrap();
        let b_cu = text.find("Layer(1 \"B.Cu\")\n(\n\tLine[0 0 0 5000 2000 1000 \"clearline\"]\n)\n").unwrap();
        assert!(b_cu < f_cu);
        assert_eq!(text.matches("Layer(").count(), 16);
        assert!(text.contains("Layer(16 \"F.SilkS\")\n(\n)\n"));
    }

    #[test]
    fn test_footprint_from_macro_body() {
        let lib = MacroLibrary::new();
        let body = "LI 90 100 110 100 3\nPA 100 100 10 10 4 0 1\nTY 0 0 3 2 0 0 0 * x";
        let mut b = started();
        assert!(b.export_macro(&placement(&lib, body)).unwrap());
        assert!(b.export_macro(&placement(&lib, body)).unwrap());
        let text = finish(b);
        assert_eq!(text.matches("Element[").count(), 1);
        assert!(text.contains(
            "Element[\"\" \"macroName=pcb.dip-x=20-y=30-rot=0-mirror=false\" \"\" \"\" 10000 15000 -2500 -1500 0 100 \"\"]\n(\n\
             \tElementLine[-5000 0 5000 0 1000]\n\
             \tPin[0 0 5000 1000 5600 2000 \"1\" \"1\" \"\"]\n)\n"
        ));
    }

    #[test]
    fn test_session_state_reset() {
        let lib = MacroLibrary::new();
        let body = "LI 90 100 110 100 3";
        let mut b = started();
        b.export_macro(&placement(&lib, body)).unwrap();
        b.export_end().unwrap();
        b.export_start(Dimension::new(100, 100), &standard_layers(), 5).unwrap();
        b.export_macro(&placement(&lib, body)).unwrap();
        let text = finish(b);
        assert_eq!(text.matches("Element[").count(), 2);
    }

    #[test]
    fn test_pads_and_filled_rectangles() {
        let mut b = started();
        let pad = PadItem {
            p: Point::new(10, 10),
            style: PadStyle::Square,
            rx: 6,
            ry: 8,
            drill: 2,
            layer: 1,
            only_hole: false,
        };
        b.export_pcb_pad(&pad).unwrap();
        b.export_pcb_pad(&PadItem { only_hole: true, ..pad }).unwrap();
        b.export_rectangle(Point::new(0, 0), Point::new(2, 4), true, &Stroke::new(3, 0, 0.5)).unwrap();
        let text = finish(b);
        assert_eq!(text.matches("\tVia[").count(), 1);
        assert!(text.contains("\tVia[5000 5000 4000 4100 4100 1000 \"\" \"square\"]\n"));
        assert!(text.contains("\tPolygon(\"clearpoly\")\n\t(\n\t\t[0 0] [0 2000] [1000 2000] [1000 0]\n\t)\n"));
    }

    #[test]
    fn test_curve_shortcuts() {
        let mut b = started();
        let stroke = Stroke::new(2, 0, 0.5);
        assert!(b.export_curve(&[], false, false, &Arrows::none(), &stroke).unwrap());
        let two = [PointF::new(0.0, 0.0), PointF::new(2.0, 0.0)];
        assert!(b.export_curve(&two, false, false, &Arrows::none(), &stroke).unwrap());
        let three = [PointF::new(0.0, 0.0), PointF::new(2.0, 0.0), PointF::new(2.0, 2.0)];
        assert!(!b.export_curve(&three, false, false, &Arrows::none(), &stroke).unwrap());
    }

    #[test]
    fn test_text_rotation_wraps_negative_angles() {
        let rotation_of = |orientation: i32| {
            let mut b = started();
            let t = TextItem {
                p: Point::new(0, 0),
                size_x: 3,
                size_y: 4,
                font: "Courier New",
                bold: false,
                mirrored: false,
                italic: false,
                orientation,
                layer: 0,
                text: "R1",
            };
            b.export_adv_text(&t).unwrap();
            let text = finish(b);
            let line = text.lines().find(|l| l.starts_with("\tText[")).unwrap().to_string();
            line.split(' ').nth(2).unwrap().parse::<i32>().unwrap()
        };
        assert_eq!(rotation_of(0), 0);
        assert_eq!(rotation_of(90), 1);
        assert_eq!(rotation_of(-90), 3);
        assert_eq!(rotation_of(-180), 2);
        assert_eq!(rotation_of(-270), 1);
        assert_eq!(rotation_of(450), 1);
    }
}
