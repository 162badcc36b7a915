//! Eagle command script output.
//!
//! Only wires, nets, rectangles, circles, text and part placement have an
//! Eagle counterpart. Macros become `Add` commands referencing a library
//! assumed to hold the same symbols, and junctions are collected and written
//! after every net so Eagle can attach them.

use std::io::Write;

use fidocad_core::{Dimension, Layer, Point, PointF};

use crate::backend::{Arrows, ExportBackend, MacroPlacement, PadItem, Stroke, TextItem};
use crate::error::ExportResult;

/// Eagle units (inches) per logical unit.
const RES: f64 = 5e-2;
/// Library holding the FidoCad symbols on the Eagle side.
const EAGLE_LIBRARY: &str = "FidoCadJLIB";
/// Eagle text size relative to the font height.
const TEXT_STRETCH: f64 = 0.73;

/// Up to four decimals, no trailing zeros, dot separator.
fn een(v: f64) -> String {
    let s = format!("{:.4}", v);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    match s {
        "-0" | "" => "0".to_string(),
        _ => s.to_string(),
    }
}

pub struct EagleBackend<W: Write> {
    out: W,
    page: Dimension,
    old_text_size: Option<i32>,
    macro_list: String,
    junction_list: String,
}

impl<W: Write> EagleBackend<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            page: Dimension::default(),
            old_text_size: None,
            macro_list: String::new(),
            junction_list: String::new(),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn pt(&self, x: f64, y: f64) -> String {
        format!("({} {})", een(x * RES), een((self.page.height as f64 - y) * RES))
    }
}

impl<W: Write> ExportBackend for EagleBackend<W> {
    fn export_start(&mut self, size: Dimension, _layers: &[Layer], grid: i32) -> ExportResult<()> {
        self.page = size;
        self.old_text_size = None;
        self.macro_list.clear();
        self.junction_list.clear();
        writeln!(self.out, "# Created by {}", crate::creator())?;
        writeln!(self.out, "Set Wire_Bend 2; ")?;
        writeln!(self.out, "Grid inch {};", een(grid as f64 * RES))?;
        writeln!(self.out, "Change font fixed;")?;
        writeln!(self.out, "Set auto_junction off;")?;
        Ok(())
    }

    fn export_end(&mut self) -> ExportResult<()> {
        self.out.write_all(self.macro_list.as_bytes())?;
        self.out.write_all(self.junction_list.as_bytes())?;
        writeln!(self.out, "Window Fit; ")?;
        self.out.flush()?;
        Ok(())
    }

    fn export_adv_text(&mut self, t: &TextItem<'_>) -> ExportResult<()> {
        if self.old_text_size != Some(t.size_y) {
            writeln!(self.out, "Change size {}", een(t.size_y as f64 * RES * TEXT_STRETCH))?;
        }
        self.old_text_size = Some(t.size_y);
        writeln!(
            self.out,
            "Text {} {}R{} {};",
            t.text,
            if t.mirrored { "M" } else { "" },
            -t.orientation,
            self.pt(t.p.x as f64, t.p.y as f64)
        )?;
        Ok(())
    }

    fn export_bezier(&mut self, _points: [Point; 4], _arrows: &Arrows, _stroke: &Stroke) -> ExportResult<()> {
        log::debug!("Bezier curve skipped in Eagle output");
        writeln!(self.out, "# Bezier export not implemented yet")?;
        Ok(())
    }

    fn export_connection(&mut self, p: Point, _layer: usize, _size: f64) -> ExportResult<()> {
        let junction = format!("Junction {};\n", self.pt(p.x as f64, p.y as f64));
        self.junction_list.push_str(&junction);
        Ok(())
    }

    fn export_line(&mut self, p1: PointF, p2: PointF, _arrows: &Arrows, _stroke: &Stroke) -> ExportResult<()> {
        writeln!(self.out, "Net {} {};", self.pt(p1.x, p1.y), self.pt(p2.x, p2.y))?;
        Ok(())
    }

    fn export_macro(&mut self, m: &MacroPlacement<'_>) -> ExportResult<bool> {
        let name = m.name.replace(' ', "_");
        let placement = format!(
            "Add {}@{} {} {}R{} {};\nValue {} {};\n",
            m.key,
            EAGLE_LIBRARY,
            name,
            if m.mirror { "M" } else { "" },
            -m.orientation,
            self.pt(m.p.x as f64, m.p.y as f64),
            name,
            m.value
        );
        self.macro_list.push_str(&placement);
        Ok(true)
    }

    fn export_oval(&mut self, p1: Point, p2: Point, _filled: bool, _stroke: &Stroke) -> ExportResult<()> {
        writeln!(self.out, "# Circle export not fully implemented")?;
        writeln!(
            self.out,
            "Circle {} ({} {});",
            self.pt(p1.x as f64, p1.y as f64),
            een((p2.x - p1.x) as f64 * RES),
            een((p2.y - p1.y) as f64 * RES)
        )?;
        Ok(())
    }

    fn export_pcb_line(&mut self, _p1: Point, _p2: Point, _width: i32, _layer: usize) -> ExportResult<()> {
        writeln!(self.out, "# PCBLine export not implemented yet")?;
        Ok(())
    }

    fn export_pcb_pad(&mut self, _pad: &PadItem) -> ExportResult<()> {
        writeln!(self.out, "# PCBpad export not implemented yet")?;
        Ok(())
    }

    fn export_polygon(&mut self, _points: &[PointF], _filled: bool, _stroke: &Stroke) -> ExportResult<()> {
        writeln!(self.out, "# Polygon export not implemented yet")?;
        Ok(())
    }

    fn export_rectangle(&mut self, p1: Point, p2: Point, filled: bool, _stroke: &Stroke) -> ExportResult<()> {
        let (a, b) = (self.pt(p1.x as f64, p1.y as f64), self.pt(p2.x as f64, p2.y as f64));
        writeln!(self.out, "Layer 94;")?;
        if filled {
            writeln!(self.out, "Rect {} {};", a, b)?;
        } else {
            writeln!(self.out, "Set Wire_Bend 0;")?;
            writeln!(self.out, "Wire {} {};", a, b)?;
            writeln!(self.out, "Wire {} {};", b, a)?;
            writeln!(self.out, "Set Wire_Bend 2;")?;
        }
        writeln!(self.out, "Layer 91;")?;
        Ok(())
    }
}
