//! Drawing traversal shared by every backend.
//!
//! Layers are exported in index order, each pass visiting every primitive
//! and keeping those on the current layer, so a lower layer is always
//! complete before the next one starts. A final pass re-emits PCB pads as
//! drill holes only, keeping them open whatever was drawn on top.
//!
//! Macro instances are expanded recursively through a child coordinate
//! mapping. Each instance is identified by its index path from the top of
//! the drawing; a backend's `export_macro` hook is asked once per instance
//! and, when it takes over, the instance is skipped in every later pass.

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use fidocad_core::geom::arrow::arrow_head;
use fidocad_core::geom::curves::{flatten_spline, spline_through};
use fidocad_core::geom::ArrowSpec;
use fidocad_core::settings::MAX_MACRO_DEPTH;
use fidocad_core::{
    parse_primitives, round_half_up, Dimension, DrawingModel, Layer, MacroCall, MapCoordinates, Point, PointF,
    Primitive, Shape,
};

use crate::backend::{Arrows, ExportBackend, MacroPlacement, PadItem, Stroke, TextItem};
use crate::bounds::{image_size, EXPORT_BORDER};
use crate::error::{ExportError, ExportReport, ExportResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    Layer(usize),
    Pads,
}

fn to_f(p: Point) -> PointF {
    PointF::new(p.x as f64, p.y as f64)
}

/// Arrow sizes scaled to device units, truncated.
fn device_arrows(a: &ArrowSpec, cs: &MapCoordinates) -> Arrows {
    Arrows {
        start: a.start,
        end: a.end,
        style: a.style,
        length: (a.length as f64 * cs.x_magnitude()) as i32,
        half_width: (a.half_width as f64 * cs.x_magnitude()) as i32,
    }
}

/// Flattened vertices of a complex curve. On open curves with arrows of
/// positive length the end knots move to the arrow bases first.
pub fn curve_vertices(knots: &[PointF], closed: bool, arrow: &ArrowSpec, cs: &MapCoordinates) -> Vec<PointF> {
    let (mut xx, mut yy) = spline_through(knots, closed);
    if xx.is_empty() || yy.is_empty() {
        return Vec::new();
    }
    if !closed && arrow.any() {
        let (l, h) = arrow.device_sizes(cs);
        let mut moved = knots.to_vec();
        let base = |t: (f64, f64), from: (f64, f64)| {
            let head = arrow_head(
                round_half_up(t.0) as f64,
                round_half_up(t.1) as f64,
                round_half_up(from.0) as f64,
                round_half_up(from.1) as f64,
                l as f64,
                h as f64,
                arrow.style,
            );
            PointF::new(round_half_up(head.base.x) as f64, round_half_up(head.base.y) as f64)
        };
        if arrow.start && arrow.length > 0.0 {
            moved[0] = base((xx[0].eval(0.0), yy[0].eval(0.0)), (xx[0].eval(0.05), yy[0].eval(0.05)));
        }
        if arrow.end && arrow.length > 0.0 {
            let k = xx.len() - 1;
            let last = moved.len() - 1;
            moved[last] = base((xx[k].eval(1.0), yy[k].eval(1.0)), (xx[k].eval(0.95), yy[k].eval(0.95)));
        }
        if arrow.length > 0.0 {
            (xx, yy) = spline_through(&moved, false);
        }
    }
    flatten_spline(&xx, &yy)
}

pub struct Exporter<'m> {
    model: &'m DrawingModel,
    layers: Cow<'m, [Layer]>,
    export_invisible: bool,
    bodies: HashMap<String, Rc<Vec<Primitive>>>,
    /// Hook answer per macro instance path.
    placed: HashMap<Vec<usize>, bool>,
    /// Instances already counted as unresolved or too deep.
    reported: HashSet<Vec<usize>>,
    report: ExportReport,
}

impl<'m> Exporter<'m> {
    pub fn new(model: &'m DrawingModel) -> Self {
        Self {
            model,
            layers: Cow::Borrowed(&model.layers[..]),
            export_invisible: false,
            bodies: HashMap::new(),
            placed: HashMap::new(),
            reported: HashSet::new(),
            report: ExportReport::default(),
        }
    }

    /// Uses `layers` for colors and visibility instead of the model's table.
    pub fn with_layers(mut self, layers: Vec<Layer>) -> Self {
        self.layers = Cow::Owned(layers);
        self
    }

    pub fn export_invisible(mut self, yes: bool) -> Self {
        self.export_invisible = yes;
        self
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn report(&self) -> &ExportReport {
        &self.report
    }

    pub fn into_report(self) -> ExportReport {
        self.report
    }

    fn visible(&self, layer: usize) -> bool {
        self.export_invisible || self.layers.get(layer).is_some_and(|l| l.visible)
    }

    /// Sizes the page from the drawing bounds plus a border, sets the dash
    /// unit and writes the backend preamble.
    pub fn export_header<B: ExportBackend + ?Sized>(&mut self, backend: &mut B, cs: &MapCoordinates) -> ExportResult<()> {
        let (size, _) = image_size(self.model, 1.0, true)?;
        let size = Dimension::new(
            ((size.width + EXPORT_BORDER) as f64 * cs.x_magnitude()) as i32,
            ((size.height + EXPORT_BORDER) as f64 * cs.y_magnitude()) as i32,
        );
        backend.set_dash_unit(cs.x_magnitude());
        log::debug!("Export page {}x{}", size.width, size.height);
        backend.export_start(size, &self.layers, cs.x_grid_step())
    }

    /// Exports every primitive: one pass per layer, or a single pass when
    /// `only_layer` is set, then the drill holes.
    pub fn export_drawing<B: ExportBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        cs: &MapCoordinates,
        only_layer: Option<usize>,
    ) -> ExportResult<()> {
        let model = self.model;
        let mut path = Vec::new();
        match only_layer {
            Some(l) => self.export_list(backend, &model.primitives, cs, Pass::Layer(l), &mut path, 0)?,
            None => {
                for l in 0..self.layers.len() {
                    self.export_list(backend, &model.primitives, cs, Pass::Layer(l), &mut path, 0)?;
                }
            }
        }
        self.export_list(backend, &model.primitives, cs, Pass::Pads, &mut path, 0)
    }

    /// Header, drawing and trailer in one go.
    pub fn export<B: ExportBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        cs: &MapCoordinates,
        only_layer: Option<usize>,
    ) -> ExportResult<()> {
        self.export_header(backend, cs)?;
        self.export_drawing(backend, cs, only_layer)?;
        backend.export_end()
    }

    fn export_list<B: ExportBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        prims: &[Primitive],
        cs: &MapCoordinates,
        pass: Pass,
        path: &mut Vec<usize>,
        depth: usize,
    ) -> ExportResult<()> {
        for (i, p) in prims.iter().enumerate() {
            path.push(i);
            let result = self.export_one(backend, p, cs, pass, path, depth);
            path.pop();
            result?;
        }
        Ok(())
    }

    fn export_one<B: ExportBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        p: &Primitive,
        cs: &MapCoordinates,
        pass: Pass,
        path: &mut Vec<usize>,
        depth: usize,
    ) -> ExportResult<()> {
        if !self.visible(p.layer) {
            return Ok(());
        }
        match (&p.shape, pass) {
            (Shape::Macro(call), _) => match self.export_macro(backend, p, call, cs, pass, path, depth) {
                Err(e @ ExportError::MacroRecursion { .. }) => {
                    if self.reported.insert(path.clone()) {
                        log::warn!("Skipping macro instance: {}", e);
                        self.report.recursion_limit_hits += 1;
                    }
                    Ok(())
                }
                other => other,
            },
            (Shape::PcbPad { .. }, Pass::Pads) => self.export_pad(backend, p, cs, true),
            (_, Pass::Layer(l)) if p.layer == l => self.export_shape(backend, p, cs),
            _ => Ok(()),
        }
    }

    fn body(&mut self, key: &str, text: &str) -> Rc<Vec<Primitive>> {
        if let Some(body) = self.bodies.get(key) {
            return Rc::clone(body);
        }
        let (prims, errors) = parse_primitives(text);
        if !errors.is_empty() {
            log::warn!("Macro '{}': {} malformed line(s) skipped", key, errors.len());
            self.report.skipped_parse_lines += errors.len();
        }
        let body = Rc::new(prims);
        self.bodies.insert(key.to_string(), Rc::clone(&body));
        body
    }

    #[allow(clippy::too_many_arguments)]
    fn export_macro<B: ExportBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        p: &Primitive,
        call: &MacroCall,
        cs: &MapCoordinates,
        pass: Pass,
        path: &mut Vec<usize>,
        depth: usize,
    ) -> ExportResult<()> {
        let model = self.model;
        let Some(desc) = model.library.get(&call.key) else {
            if self.reported.insert(path.clone()) {
                log::warn!("Macro '{}' not found in the library, skipped", call.key);
                self.report.unresolved_macros += 1;
            }
            return Ok(());
        };
        if depth >= MAX_MACRO_DEPTH {
            return Err(ExportError::MacroRecursion { key: call.key.clone(), depth: MAX_MACRO_DEPTH });
        }

        let handled = match self.placed.get(path.as_slice()) {
            Some(&handled) => handled,
            None => {
                let fs = p.labels.font_size as f64;
                let placement = MacroPlacement {
                    p: cs.map_point(call.p),
                    mirror: call.mirror,
                    orientation: call.orientation as i32 * 90,
                    key: &call.key,
                    body: &desc.body,
                    name: &p.labels.name,
                    name_pos: cs.map_point(p.labels.name_pos),
                    value: &p.labels.value,
                    value_pos: cs.map_point(p.labels.value_pos),
                    font: &p.labels.font,
                    font_size: (cs.map_yr(fs, fs) - cs.map_yr(0.0, 0.0)) as i32,
                    library: model.library.as_ref(),
                };
                let handled = backend.export_macro(&placement)?;
                if handled {
                    log::debug!("Macro '{}' written as a single instance", call.key);
                }
                self.placed.insert(path.clone(), handled);
                handled
            }
        };
        if handled {
            return Ok(());
        }

        let body = self.body(&call.key, &desc.body);
        let child = cs.child(call.p.x, call.p.y, call.orientation, call.mirror);
        self.export_list(backend, &body, &child, pass, path, depth + 1)?;
        if pass == Pass::Layer(p.layer) {
            self.export_labels(backend, p, cs)?;
        }
        Ok(())
    }

    /// Name and value, upright and unmirrored in the enclosing mapping.
    fn export_labels<B: ExportBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        p: &Primitive,
        cs: &MapCoordinates,
    ) -> ExportResult<()> {
        let labels = &p.labels;
        if labels.is_empty() {
            return Ok(());
        }
        let fs = labels.font_size as f64;
        let size = (cs.map_xr(fs, fs) - cs.map_xr(0.0, 0.0)).abs();
        for (text, pos) in [(&labels.name, labels.name_pos), (&labels.value, labels.value_pos)] {
            if text.is_empty() {
                continue;
            }
            backend.export_adv_text(&TextItem {
                p: cs.map_point(pos),
                size_x: size as i32,
                size_y: (size * 12.0 / 7.0 + 0.5) as i32,
                font: &labels.font,
                bold: false,
                mirrored: false,
                italic: false,
                orientation: 0,
                layer: p.layer,
                text,
            })?;
        }
        Ok(())
    }

    fn export_pad<B: ExportBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        p: &Primitive,
        cs: &MapCoordinates,
        only_hole: bool,
    ) -> ExportResult<()> {
        let Shape::PcbPad { p: c, rx, ry, drill, style } = &p.shape else {
            return Ok(());
        };
        let (x, y) = (c.x as f64, c.y as f64);
        let (xa, ya) = (cs.map_x(x, y), cs.map_y(x, y));
        let (xb, yb) = (*rx as f64 + x, *ry as f64 + y);
        backend.export_pcb_pad(&PadItem {
            p: Point::new(xa, ya),
            style: *style,
            rx: (cs.map_x(xb, yb) - xa).abs(),
            ry: (cs.map_y(xb, yb) - ya).abs(),
            drill: (*drill as f64 * cs.x_magnitude()) as i32,
            layer: p.layer,
            only_hole,
        })
    }

    fn export_shape<B: ExportBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        p: &Primitive,
        cs: &MapCoordinates,
    ) -> ExportResult<()> {
        let model = self.model;
        let settings = &model.settings;
        let width = settings.line_width * cs.x_magnitude();
        let stroke = |dash: u8| Stroke::new(p.layer, dash, width);

        if !matches!(p.shape, Shape::Text(_) | Shape::Curve { .. }) {
            self.export_labels(backend, p, cs)?;
        }

        match &p.shape {
            Shape::Line { p1, p2, arrow, dash } => backend.export_line(
                to_f(cs.map_point(*p1)),
                to_f(cs.map_point(*p2)),
                &device_arrows(arrow, cs),
                &stroke(*dash),
            ),
            Shape::Rectangle { p1, p2, filled, dash } => {
                backend.export_rectangle(cs.map_point(*p1), cs.map_point(*p2), *filled, &stroke(*dash))
            }
            Shape::Oval { p1, p2, filled, dash } => {
                backend.export_oval(cs.map_point(*p1), cs.map_point(*p2), *filled, &stroke(*dash))
            }
            Shape::Polygon { points, filled, dash } => {
                let vertices: Vec<PointF> = points.iter().map(|q| to_f(cs.map_point(*q))).collect();
                backend.export_polygon(&vertices, *filled, &stroke(*dash))
            }
            Shape::Curve { points, filled, closed, arrow, dash } => {
                self.export_curve(backend, p, points, *filled, *closed, arrow, &stroke(*dash), cs)
            }
            Shape::Bezier { points, arrow, dash } => {
                backend.export_bezier(points.map(|q| cs.map_point(q)), &device_arrows(arrow, cs), &stroke(*dash))
            }
            Shape::PcbLine { p1, p2, width } => backend.export_pcb_line(
                cs.map_point(*p1),
                cs.map_point(*p2),
                (width * cs.x_magnitude()) as i32,
                p.layer,
            ),
            Shape::PcbPad { .. } => self.export_pad(backend, p, cs, false),
            Shape::Connection { p: c } => {
                backend.export_connection(cs.map_point(*c), p.layer, settings.connection_size * cs.x_magnitude())
            }
            Shape::Text(t) => {
                let (sx, sy) = (t.size_x as f64, t.size_y as f64);
                backend.export_adv_text(&TextItem {
                    p: cs.map_point(t.p),
                    size_x: (cs.map_xr(sx, sx) - cs.map_xr(0.0, 0.0)).abs() as i32,
                    size_y: (cs.map_yr(sy, sy) - cs.map_yr(0.0, 0.0)).abs() as i32,
                    font: &t.font,
                    bold: t.is_bold(),
                    mirrored: t.is_mirrored(),
                    italic: t.is_italic(),
                    orientation: t.orientation - cs.orientation() as i32 * 90,
                    layer: p.layer,
                    text: &t.text,
                })
            }
            Shape::Macro(_) => Ok(()),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn export_curve<B: ExportBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        p: &Primitive,
        points: &[Point],
        filled: bool,
        closed: bool,
        arrow: &ArrowSpec,
        stroke: &Stroke,
        cs: &MapCoordinates,
    ) -> ExportResult<()> {
        let knots: Vec<PointF> = points.iter().map(|q| cs.map_point_f(*q)).collect();
        if !backend.export_curve(&knots, filled, closed, &device_arrows(arrow, cs), stroke)? {
            let vertices = curve_vertices(&knots, closed, arrow, cs);
            if closed {
                if !vertices.is_empty() {
                    backend.export_polygon(&vertices, filled, stroke)?;
                }
            } else {
                let mut phase = 0.0f32;
                for seg in vertices.windows(2) {
                    backend.set_dash_phase(phase);
                    backend.export_line(seg[0], seg[1], &Arrows::none(), stroke)?;
                    phase += (seg[0].x - seg[1].x).hypot(seg[0].y - seg[1].y) as f32;
                }
                backend.set_dash_phase(0.0);
            }

            let n = vertices.len();
            if n > 2 && !closed {
                let l = arrow.length as f64 * cs.x_magnitude();
                let h = arrow.half_width as f64 * cs.x_magnitude();
                if arrow.start {
                    let tip = to_f(cs.map_point(points[0]));
                    backend.export_arrow(tip, vertices[1], l, h, arrow.style, p.layer)?;
                }
                if let (true, Some(last)) = (arrow.end, points.last()) {
                    let tip = to_f(cs.map_point(*last));
                    backend.export_arrow(tip, vertices[n - 2], l, h, arrow.style, p.layer)?;
                }
            }
        }
        self.export_labels(backend, p, cs)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use fidocad_core::{MacroDesc, MacroLibrary, PadStyle};
    use std::sync::Arc;

    /// Records calls as short strings.
    #[derive(Default)]
    pub(crate) struct Recorder {
        pub calls: Vec<String>,
        pub take_macros: bool,
        pub phases: Vec<f32>,
    }

    impl ExportBackend for Recorder {
        fn export_start(&mut self, size: Dimension, _layers: &[Layer], grid: i32) -> ExportResult<()> {
            self.calls.push(format!("start {} {} {}", size.width, size.height, grid));
            Ok(())
        }
        fn export_end(&mut self) -> ExportResult<()> {
            self.calls.push("end".into());
            Ok(())
        }
        fn set_dash_phase(&mut self, phase: f32) {
            self.phases.push(phase);
        }
        fn export_adv_text(&mut self, t: &TextItem<'_>) -> ExportResult<()> {
            self.calls.push(format!("text {} {} {} {}", t.layer, t.p.x, t.p.y, t.text));
            Ok(())
        }
        fn export_bezier(&mut self, _points: [Point; 4], _arrows: &Arrows, stroke: &Stroke) -> ExportResult<()> {
            self.calls.push(format!("bezier {}", stroke.layer));
            Ok(())
        }
        fn export_connection(&mut self, p: Point, layer: usize, _size: f64) -> ExportResult<()> {
            self.calls.push(format!("connection {} {} {}", layer, p.x, p.y));
            Ok(())
        }
        fn export_line(&mut self, p1: PointF, p2: PointF, arrows: &Arrows, stroke: &Stroke) -> ExportResult<()> {
            let (a, b) = self.shaft_with_arrows(p1, p2, arrows, stroke.layer)?;
            let r = round_half_up;
            self.calls.push(format!("line {} {} {} {} {}", stroke.layer, r(a.x), r(a.y), r(b.x), r(b.y)));
            Ok(())
        }
        fn export_macro(&mut self, m: &MacroPlacement<'_>) -> ExportResult<bool> {
            self.calls.push(format!("macro {} {} {}", m.key, m.p.x, m.p.y));
            Ok(self.take_macros)
        }
        fn export_oval(&mut self, _p1: Point, _p2: Point, _filled: bool, stroke: &Stroke) -> ExportResult<()> {
            self.calls.push(format!("oval {}", stroke.layer));
            Ok(())
        }
        fn export_pcb_line(&mut self, _p1: Point, _p2: Point, width: i32, layer: usize) -> ExportResult<()> {
            self.calls.push(format!("pcbline {} {}", layer, width));
            Ok(())
        }
        fn export_pcb_pad(&mut self, pad: &PadItem) -> ExportResult<()> {
            self.calls.push(format!("pad {} {} {} {} {}", pad.layer, pad.rx, pad.ry, pad.drill, pad.only_hole));
            Ok(())
        }
        fn export_polygon(&mut self, points: &[PointF], _filled: bool, stroke: &Stroke) -> ExportResult<()> {
            self.calls.push(format!("polygon {} {}", stroke.layer, points.len()));
            Ok(())
        }
        fn export_rectangle(&mut self, p1: Point, p2: Point, filled: bool, stroke: &Stroke) -> ExportResult<()> {
            self.calls.push(format!("rect {} {} {} {} {} {}", stroke.layer, p1.x, p1.y, p2.x, p2.y, filled));
            Ok(())
        }
    }

    fn model(text: &str, lib: MacroLibrary) -> DrawingModel {
        DrawingModel::parse(text, Arc::new(lib)).0
    }

    fn run(m: &DrawingModel, rec: &mut Recorder) -> ExportReport {
        let mut ex = Exporter::new(m);
        ex.export_drawing(rec, &MapCoordinates::new(), None).unwrap();
        ex.into_report()
    }

    fn starts(calls: &[String], prefix: &str) -> Vec<String> {
        calls.iter().filter(|c| c.starts_with(prefix)).cloned().collect()
    }

    #[test]
    fn test_layers_exported_in_index_order() {
        let m = model("LI 0 0 10 0 2\nLI 0 0 10 0 0\nLI 0 0 10 0 1\n", MacroLibrary::new());
        let mut rec = Recorder::default();
        run(&m, &mut rec);
        let layers: Vec<&str> = rec.calls.iter().map(|c| &c[5..6]).collect();
        assert_eq!(layers, vec!["0", "1", "2"]);
    }

    #[test]
    fn test_pads_pass_draws_holes_last() {
        let m = model("PA 10 10 20 20 8 0 2\nRP 0 0 30 30 3\n", MacroLibrary::new());
        let mut rec = Recorder::default();
        run(&m, &mut rec);
        assert_eq!(rec.calls.len(), 3);
        assert_eq!(rec.calls[0], "pad 2 20 20 8 false");
        assert!(rec.calls[1].starts_with("rect 3"));
        assert_eq!(rec.calls[2], "pad 2 20 20 8 true");
    }

    #[test]
    fn test_invisible_layers_skipped_unless_requested() {
        let mut m = model("LI 0 0 10 0 1\nLI 0 0 10 0 2\n", MacroLibrary::new());
        m.layers[2].visible = false;
        let mut rec = Recorder::default();
        run(&m, &mut rec);
        assert_eq!(rec.calls.len(), 1);

        let mut rec = Recorder::default();
        Exporter::new(&m).export_invisible(true).export_drawing(&mut rec, &MapCoordinates::new(), None).unwrap();
        assert_eq!(rec.calls.len(), 2);
    }

    #[test]
    fn test_arrow_pull_back() {
        let m = model("LI 0 0 100 0 1\nFCJ 1 0 10 5 0 0\nLI 0 50 100 50 1\nFCJ 1 0 -10 5 0 0\n", MacroLibrary::new());
        let mut rec = Recorder::default();
        run(&m, &mut rec);
        assert_eq!(rec.calls[0], "line 1 10 0 100 0");
        assert_eq!(rec.calls[1], "line 1 0 50 100 50");
    }

    #[test]
    fn test_unresolved_macro_skipped_once() {
        let m = model("MC 10 10 0 0 missing\nLI 0 0 10 0 1\n", MacroLibrary::new());
        let mut rec = Recorder::default();
        let report = run(&m, &mut rec);
        assert_eq!(report.unresolved_macros, 1);
        assert_eq!(rec.calls, vec!["line 1 0 0 10 0"]);
    }

    fn box_library() -> MacroLibrary {
        let mut lib = MacroLibrary::new();
        lib.insert(MacroDesc::new("box", "Box", "RV 90 90 110 110 1\nPA 100 100 10 10 4 0 2", "Test", "test"));
        lib.insert(MacroDesc::new("loop", "Loop", "LI 90 100 110 100 1\nMC 100 100 0 0 loop", "Test", "test"));
        lib
    }

    #[test]
    fn test_macro_expanded_with_labels() {
        let m = model("MC 50 50 0 0 box\nFCJ\nTY 60 60 4 3 0 0 0 * R1\nTY 60 55 4 3 0 0 0 * 1k\n", box_library());
        let mut rec = Recorder::default();
        let report = run(&m, &mut rec);
        assert!(report.is_clean());
        assert_eq!(starts(&rec.calls, "macro").len(), 1);
        assert_eq!(starts(&rec.calls, "rect 1 40 40 60 60").len(), 1);
        assert_eq!(starts(&rec.calls, "text 0").len(), 2);
        assert_eq!(starts(&rec.calls, "pad 2 10 10 4"), vec!["pad 2 10 10 4 false", "pad 2 10 10 4 true"]);
    }

    #[test]
    fn test_macro_hook_takes_over() {
        let m = model("MC 50 50 0 0 box\n", box_library());
        let mut rec = Recorder { take_macros: true, ..Default::default() };
        run(&m, &mut rec);
        assert_eq!(rec.calls, vec!["macro box 50 50"]);
    }

    #[test]
    fn test_self_referencing_macro_stops() {
        let m = model("MC 0 0 0 0 loop\n", box_library());
        let mut rec = Recorder::default();
        let report = run(&m, &mut rec);
        assert_eq!(report.recursion_limit_hits, 1);
        assert_eq!(starts(&rec.calls, "line").len(), MAX_MACRO_DEPTH);
    }

    #[test]
    fn test_only_layer_filter() {
        let m = model("LI 0 0 10 0 1\nLI 0 0 10 0 2\nMC 50 50 0 0 box\n", box_library());
        let mut rec = Recorder::default();
        Exporter::new(&m).export_drawing(&mut rec, &MapCoordinates::new(), Some(1)).unwrap();
        assert_eq!(starts(&rec.calls, "line").len(), 1);
        assert_eq!(starts(&rec.calls, "rect 1").len(), 1);
        // Holes are drilled whatever the filter.
        assert_eq!(starts(&rec.calls, "pad"), vec!["pad 2 10 10 4 true"]);
    }

    #[test]
    fn test_open_curve_flattened_into_lines() {
        let m = model("CV 0 0 0 50 20 100 0 1\nFCJ 0 0 3 1 1 0\n", MacroLibrary::new());
        let mut rec = Recorder::default();
        run(&m, &mut rec);
        assert_eq!(starts(&rec.calls, "line").len(), 2 * fidocad_core::geom::CURVE_STEPS);
        assert_eq!(rec.phases.first(), Some(&0.0));
        assert!(rec.phases.iter().any(|p| *p > 0.0));
        assert_eq!(rec.phases.last(), Some(&0.0));
    }

    #[test]
    fn test_closed_curve_is_polygon() {
        let m = model("CP 1 0 0 50 0 50 50 0 50 3\n", MacroLibrary::new());
        let mut rec = Recorder::default();
        run(&m, &mut rec);
        assert_eq!(starts(&rec.calls, "polygon 3").len(), 1);
    }

    #[test]
    fn test_pad_sizes_scale_with_magnitude() {
        let mut m = DrawingModel::default();
        m.add(Primitive::pad(Point::new(10, 10), 20, 10, 6, PadStyle::Square, 2));
        let mut rec = Recorder::default();
        Exporter::new(&m).export_drawing(&mut rec, &MapCoordinates::with_magnitude(2.0), None).unwrap();
        assert_eq!(rec.calls[0], "pad 2 40 20 12 false");
    }

    #[test]
    fn test_header_adds_border() {
        let m = model("LI 0 0 100 50 1\n", MacroLibrary::new());
        let mut rec = Recorder::default();
        Exporter::new(&m).export_header(&mut rec, &MapCoordinates::with_magnitude(2.0)).unwrap();
        assert_eq!(rec.calls[0], format!("start {} {} 5", (100 + EXPORT_BORDER) * 2, (50 + EXPORT_BORDER) * 2));
    }
}
