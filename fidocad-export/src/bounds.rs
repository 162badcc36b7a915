//! Drawing extent, measured by exporting to a backend that writes nothing
//! and only tracks the points it is given.

use std::collections::BTreeSet;

use fidocad_core::geom::arrow::arrow_head;
use fidocad_core::{Dimension, DrawingModel, Layer, MapCoordinates, Point, PointF};

use crate::backend::{Arrows, ExportBackend, PadItem, Stroke, TextItem};
use crate::engine::Exporter;
use crate::error::ExportResult;
use crate::metrics::{text_x_scale, FixedPitchMetrics, TextMetrics};

/// Blank margin around exported drawings, in logical units.
pub const EXPORT_BORDER: i32 = 6;

#[derive(Debug, Default)]
pub struct BoundsBackend {
    tracker: MapCoordinates,
    layers_used: BTreeSet<usize>,
    metrics: FixedPitchMetrics,
}

impl BoundsBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Layers that received at least one primitive.
    pub fn layers_used(&self) -> &BTreeSet<usize> {
        &self.layers_used
    }

    /// `(x_min, y_min, x_max, y_max)`, `None` when nothing was drawn.
    pub fn extent(&self) -> Option<(i32, i32, i32, i32)> {
        let t = &self.tracker;
        t.has_bounds().then(|| (t.x_min(), t.y_min(), t.x_max(), t.y_max()))
    }

    fn track(&mut self, layer: usize, points: impl IntoIterator<Item = PointF>) {
        self.layers_used.insert(layer);
        for p in points {
            self.tracker.track_point(p.x, p.y);
        }
    }

    fn track_box(&mut self, layer: usize, p1: Point, p2: Point) {
        self.track(layer, [to_f(p1), to_f(p2)]);
    }
}

fn to_f(p: Point) -> PointF {
    PointF::new(p.x as f64, p.y as f64)
}

impl ExportBackend for BoundsBackend {
    fn export_start(&mut self, _size: Dimension, _layers: &[Layer], _grid: i32) -> ExportResult<()> {
        self.tracker.reset_min_max();
        self.layers_used.clear();
        Ok(())
    }

    fn export_end(&mut self) -> ExportResult<()> {
        Ok(())
    }

    fn export_adv_text(&mut self, t: &TextItem<'_>) -> ExportResult<()> {
        let w = self.metrics.string_width(t.text, t.font, t.size_y as f64) * text_x_scale(t.size_x, t.size_y);
        let h = t.size_y as f64;
        let (sin, cos) = (-(t.orientation as f64).to_radians()).sin_cos();
        let sign = if t.mirrored { -1.0 } else { 1.0 };
        let corners = [(0.0, 0.0), (w * sign, 0.0), (0.0, h), (w * sign, h)]
            .map(|(dx, dy)| PointF::new(t.p.x as f64 + dx * cos - dy * sin, t.p.y as f64 + dx * sin + dy * cos));
        self.track(t.layer, corners);
        Ok(())
    }

    fn export_bezier(&mut self, points: [Point; 4], arrows: &Arrows, stroke: &Stroke) -> ExportResult<()> {
        self.shaft_with_arrows(to_f(points[0]), to_f(points[1]), &Arrows { end: false, ..*arrows }, stroke.layer)?;
        self.shaft_with_arrows(to_f(points[2]), to_f(points[3]), &Arrows { start: false, ..*arrows }, stroke.layer)?;
        self.track(stroke.layer, points.map(to_f));
        Ok(())
    }

    fn export_connection(&mut self, p: Point, layer: usize, size: f64) -> ExportResult<()> {
        let r = size / 2.0;
        let c = to_f(p);
        self.track(layer, [PointF::new(c.x - r, c.y - r), PointF::new(c.x + r, c.y + r)]);
        Ok(())
    }

    fn export_line(&mut self, p1: PointF, p2: PointF, arrows: &Arrows, stroke: &Stroke) -> ExportResult<()> {
        self.shaft_with_arrows(p1, p2, arrows, stroke.layer)?;
        self.track(stroke.layer, [p1, p2]);
        Ok(())
    }

    fn export_oval(&mut self, p1: Point, p2: Point, _filled: bool, stroke: &Stroke) -> ExportResult<()> {
        self.track_box(stroke.layer, p1, p2);
        Ok(())
    }

    fn export_pcb_line(&mut self, p1: Point, p2: Point, width: i32, layer: usize) -> ExportResult<()> {
        let r = width as f64 / 2.0;
        let (a, b) = (to_f(p1), to_f(p2));
        self.track(
            layer,
            [
                PointF::new(a.x.min(b.x) - r, a.y.min(b.y) - r),
                PointF::new(a.x.max(b.x) + r, a.y.max(b.y) + r),
            ],
        );
        Ok(())
    }

    fn export_pcb_pad(&mut self, pad: &PadItem) -> ExportResult<()> {
        if pad.only_hole {
            return Ok(());
        }
        let c = to_f(pad.p);
        let (rx, ry) = (pad.rx as f64 / 2.0, pad.ry as f64 / 2.0);
        self.track(pad.layer, [PointF::new(c.x - rx, c.y - ry), PointF::new(c.x + rx, c.y + ry)]);
        Ok(())
    }

    fn export_polygon(&mut self, points: &[PointF], _filled: bool, stroke: &Stroke) -> ExportResult<()> {
        self.track(stroke.layer, points.iter().copied());
        Ok(())
    }

    fn export_rectangle(&mut self, p1: Point, p2: Point, _filled: bool, stroke: &Stroke) -> ExportResult<()> {
        self.track_box(stroke.layer, p1, p2);
        Ok(())
    }

    fn export_arrow(
        &mut self,
        tip: PointF,
        from: PointF,
        length: f64,
        half_width: f64,
        style: u8,
        layer: usize,
    ) -> ExportResult<PointF> {
        let head = arrow_head(tip.x, tip.y, from.x, from.y, length, half_width, style);
        self.track(layer, [head.tip, head.left, head.right]);
        Ok(head.base)
    }
}

/// Measures `model` at `unit` device units per logical unit. Returns the
/// size, never below one unit on each side, and the top-left corner. With
/// `count_min` false the size is measured from the origin instead.
pub fn image_size(model: &DrawingModel, unit: f64, count_min: bool) -> ExportResult<(Dimension, Point)> {
    let (bounds, _) = measure(model, unit)?;
    let (x_min, y_min, x_max, y_max) = bounds.extent().unwrap_or((0, 0, 0, 0));
    let (mut w, mut h) = if count_min { (x_max - x_min, y_max - y_min) } else { (x_max, y_max) };
    if w <= 0 {
        w = 1;
    }
    if h <= 0 {
        h = 1;
    }
    Ok((Dimension::new(w, h), Point::new(x_min, y_min)))
}

/// Runs a measuring export of the whole drawing.
pub fn measure(model: &DrawingModel, unit: f64) -> ExportResult<(BoundsBackend, MapCoordinates)> {
    let mut cs = MapCoordinates::new();
    cs.set_magnitudes(unit, unit);
    let mut bounds = BoundsBackend::new();
    bounds.tracker.reset_min_max();
    Exporter::new(model).export_drawing(&mut bounds, &cs, None)?;
    Ok((bounds, cs))
}

/// Magnitude fitting the drawing plus its border into `width` by `height`
/// device units.
pub fn fit_magnitude(model: &DrawingModel, width: u32, height: u32) -> ExportResult<f64> {
    let (size, _) = image_size(model, 1.0, true)?;
    let sx = width as f64 / (size.width + EXPORT_BORDER) as f64;
    let sy = height as f64 / (size.height + EXPORT_BORDER) as f64;
    Ok(sx.min(sy))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fidocad_core::{MacroDesc, MacroLibrary};
    use std::sync::Arc;

    fn model(text: &str) -> DrawingModel {
        let mut lib = MacroLibrary::new();
        lib.insert(MacroDesc::new("box", "Box", "RV 90 90 110 110 4", "Test", "test"));
        DrawingModel::parse(text, Arc::new(lib)).0
    }

    #[test]
    fn test_line_extent() {
        let (size, origin) = image_size(&model("LI 10 20 110 70 1\n"), 1.0, true).unwrap();
        assert_eq!(size, Dimension::new(100, 50));
        assert_eq!(origin, Point::new(10, 20));
        let (size, _) = image_size(&model("LI 10 20 110 70 1\n"), 1.0, false).unwrap();
        assert_eq!(size, Dimension::new(110, 70));
    }

    #[test]
    fn test_empty_drawing_is_one_unit() {
        let (size, origin) = image_size(&DrawingModel::default(), 1.0, true).unwrap();
        assert_eq!(size, Dimension::new(1, 1));
        assert_eq!(origin, Point::new(0, 0));
    }

    #[test]
    fn test_scales_with_unit() {
        let m = model("RV 0 0 40 30 1\n");
        let (one, _) = image_size(&m, 1.0, true).unwrap();
        let (two, _) = image_size(&m, 2.0, true).unwrap();
        assert_eq!(two.width, one.width * 2);
        assert_eq!(two.height, one.height * 2);
    }

    #[test]
    fn test_macro_contents_and_layers() {
        let (b, _) = measure(&model("MC 50 50 0 0 box\nLI 0 0 5 5 2\n"), 1.0).unwrap();
        assert_eq!(b.extent(), Some((0, 0, 60, 60)));
        assert_eq!(b.layers_used().iter().copied().collect::<Vec<_>>(), vec![2, 4]);
    }

    #[test]
    fn test_fit_magnitude() {
        let m = model("LI 0 0 94 44 1\n");
        assert!((fit_magnitude(&m, 200, 500).unwrap() - 2.0).abs() < 1e-12);
    }
}
