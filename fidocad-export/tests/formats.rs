use std::sync::Arc;

use fidocad_core::{DrawingModel, MacroLibrary};
use fidocad_export::{export_to_file, ExportFormat, ExportOptions};

const DRAWING: &str = "[FIDOCAD]\n\
LI 10 10 60 10 0\n\
FCJ 1 0 3 2 1 0\n\
RV 10 20 40 40 1\n\
EP 50 20 70 40 2\n\
PV 10 50 30 50 20 60 0\n\
BE 10 70 20 60 40 80 50 70 0\n\
SA 60 10 0\n\
PL 80 10 100 10 4 2\n\
PA 90 30 10 10 4 0 1\n\
TY 10 90 4 3 0 0 0 * R1 µ_{2}\n";

fn model() -> DrawingModel {
    DrawingModel::parse(DRAWING, Arc::new(MacroLibrary::new())).0
}

fn export(format: ExportFormat) -> Vec<u8> {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(format!("drawing.{}", format.extension()));
    export_to_file(&path, &model(), format, &ExportOptions::default()).unwrap();
    std::fs::read(&path).unwrap()
}

#[test]
fn eps_frame() {
    let text = String::from_utf8(export(ExportFormat::Eps)).unwrap();
    assert!(text.starts_with("%!PS-Adobe-3.0 EPSF-3.0\n"));
    assert!(text.contains("%%BoundingBox: -1 -1 "));
    assert!(text.trim_end().ends_with("%%EOF"));
}

#[test]
fn svg_frame() {
    let text = String::from_utf8(export(ExportFormat::Svg)).unwrap();
    assert!(text.starts_with("<?xml version=\"1.0\""));
    assert!(text.contains("<svg width=\""));
    assert!(text.ends_with("</svg>"));
}

#[test]
fn pdf_startxref_points_at_table() {
    let bytes = export(ExportFormat::Pdf);
    let text = String::from_utf8_lossy(&bytes);
    assert!(text.starts_with("%PDF-1.4\n"));
    let tail: Vec<&str> = text.trim_end().lines().rev().take(2).collect();
    assert_eq!(tail[0], "%%EOF");
    let offset: usize = tail[1].parse().unwrap();
    assert!(bytes[offset..].starts_with(b"xref"));
    for n in 1..=16 {
        assert!(text.contains(&format!("\n{} 0 obj", n)), "object {}", n);
    }
}

#[test]
fn eagle_script_frame() {
    let text = String::from_utf8(export(ExportFormat::Scr)).unwrap();
    assert!(text.contains("Set Wire_Bend 2; \n"));
    assert!(text.contains("Net "));
    assert!(text.ends_with("Window Fit; \n"));
}

#[test]
fn pcb_layout_layer_blocks() {
    let text = String::from_utf8(export(ExportFormat::Pcb)).unwrap();
    assert!(text.starts_with("# release: pcb "));
    assert!(text.contains("PCB["));
    assert_eq!(text.matches("Layer(").count(), 16);
    let bottom = text.find("Layer(1 \"B.Cu\"").unwrap();
    let front = text.find("Layer(16 \"F.SilkS\"").unwrap();
    assert!(bottom < front);
}

#[test]
fn fidocad_output_reparses() {
    let bytes = export(ExportFormat::Fcda);
    let text = String::from_utf8(bytes).unwrap();
    let (again, errors) = DrawingModel::parse(&text, Arc::new(MacroLibrary::new()));
    assert!(errors.is_empty(), "{:?}", errors);
    assert_eq!(again.primitives.len(), model().primitives.len());
}

#[test]
fn black_and_white_svg_has_only_black() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bw.svg");
    let options = ExportOptions { black_white: true, ..Default::default() };
    export_to_file(&path, &model(), ExportFormat::Svg, &options).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("#000000"));
    assert!(!text.contains("#000080"));
    assert!(!text.contains("#ff0000"));
}
