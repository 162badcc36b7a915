use std::sync::Arc;

use fidocad_core::{DrawingModel, MacroLibrary};
use fidocad_export::{export_to_file, ExportFormat, ExportOptions};

fn demo_drawing() -> DrawingModel {
    let text = "[FIDOCAD]\n\
        LI 10 10 80 10 0\n\
        RP 10 20 40 50 1\n\
        EV 50 20 80 50 2\n\
        PP 10 60 40 60 25 80 3\n\
        CV 1 50 60 70 65 80 80 0\n\
        TY 10 90 4 3 0 0 0 * V_{out}\n";
    DrawingModel::parse(text, Arc::new(MacroLibrary::new())).0
}

#[test]
fn svg_export_is_deterministic() {
    let m = demo_drawing();
    let dir = tempfile::tempdir().unwrap();
    let f1 = dir.path().join("a.svg");
    let f2 = dir.path().join("b.svg");

    export_to_file(&f1, &m, ExportFormat::Svg, &ExportOptions::default()).unwrap();
    export_to_file(&f2, &m, ExportFormat::Svg, &ExportOptions::default()).unwrap();

    let b1 = std::fs::read(&f1).unwrap();
    let b2 = std::fs::read(&f2).unwrap();
    assert_eq!(b1, b2, "SVG bytes differ between identical exports");
}

#[test]
fn pdf_export_is_deterministic() {
    let m = demo_drawing();
    let dir = tempfile::tempdir().unwrap();
    let f1 = dir.path().join("a.pdf");
    let f2 = dir.path().join("b.pdf");

    export_to_file(&f1, &m, ExportFormat::Pdf, &ExportOptions::default()).unwrap();
    export_to_file(&f2, &m, ExportFormat::Pdf, &ExportOptions::default()).unwrap();
    assert_eq!(std::fs::read(&f1).unwrap(), std::fs::read(&f2).unwrap());
}
