use std::sync::Arc;

use fidocad_core::{DrawingModel, MacroLibrary};
use fidocad_export::{export_to_vec, ExportFormat, ExportOptions};
use image::RgbaImage;

fn model(text: &str) -> DrawingModel {
    DrawingModel::parse(text, Arc::new(MacroLibrary::new())).0
}

fn render(m: &DrawingModel, format: ExportFormat, options: &ExportOptions) -> RgbaImage {
    let bytes = export_to_vec(m, format, options).unwrap();
    image::load_from_memory(&bytes).unwrap().to_rgba8()
}

/// Bounding box of the pixels darker than `limit` on every channel sum.
fn ink_box(img: &RgbaImage, limit: u32) -> (u32, u32, u32, u32) {
    let (mut x0, mut y0, mut x1, mut y1) = (u32::MAX, u32::MAX, 0, 0);
    for (x, y, p) in img.enumerate_pixels() {
        if (p[0] as u32 + p[1] as u32 + p[2] as u32) < limit {
            x0 = x0.min(x);
            y0 = y0.min(y);
            x1 = x1.max(x);
            y1 = y1.max(y);
        }
    }
    (x0, y0, x1, y1)
}

#[test]
fn bounding_box_scales_with_resolution() {
    let m = model("RV 10 10 110 60 0\nLI 10 80 110 80 0\n");
    for format in [ExportFormat::Png, ExportFormat::Jpg] {
        let one = ExportOptions { resolution: 2.0, antialias: false, ..Default::default() };
        let two = ExportOptions { resolution: 4.0, antialias: false, ..Default::default() };
        let (a, b) = (render(&m, format, &one), render(&m, format, &two));
        assert_eq!(b.width(), a.width() * 2);

        let (ax0, ay0, ax1, ay1) = ink_box(&a, 300);
        let (bx0, by0, bx1, by1) = ink_box(&b, 300);
        let (wa, ha) = ((ax1 - ax0) as f64, (ay1 - ay0) as f64);
        let (wb, hb) = ((bx1 - bx0) as f64, (by1 - by0) as f64);
        assert!((wb / wa - 2.0).abs() < 0.05, "{:?}: {} vs {}", format, wa, wb);
        assert!((hb / ha - 2.0).abs() < 0.05, "{:?}: {} vs {}", format, ha, hb);
    }
}

#[test]
fn antialiased_output_has_target_size() {
    let m = model("LI 0 0 50 30 0\n");
    let options = ExportOptions { resolution: 3.0, ..Default::default() };
    let img = render(&m, ExportFormat::Png, &options);
    assert_eq!((img.width(), img.height()), fidocad_export::driver::page_size(&m, 3.0).unwrap());
    assert!(img.pixels().any(|p| p[0] > 0 && p[0] < 255));
}

#[test]
fn drill_hole_stays_clear_under_other_layers() {
    let m = model("RP 0 0 40 40 5\nPA 20 20 20 20 8 0 2\n");
    let options = ExportOptions { resolution: 2.0, antialias: false, ..Default::default() };
    let img = render(&m, ExportFormat::Png, &options);
    // Drawing starts half a border in, at (6, 6) on this page.
    let center = img.get_pixel(6 + 40, 6 + 40);
    assert_eq!(center.0, [255, 255, 255, 255]);
    let covered = img.get_pixel(6 + 40, 6 + 24);
    assert_ne!(covered.0, [255, 255, 255, 255]);
}

#[test]
fn png_histogram_is_stable() {
    let m = model("EP 10 10 60 40 1\nLI 0 0 70 50 2\n");
    let options = ExportOptions::default();
    let a = export_to_vec(&m, ExportFormat::Png, &options).unwrap();
    let b = export_to_vec(&m, ExportFormat::Png, &options).unwrap();
    assert_eq!(a, b);
}

#[test]
fn text_is_rasterized() {
    let m = model("TY 10 10 40 30 0 0 0 * HELLO WORLD\n");
    let options = ExportOptions { antialias: false, ..Default::default() };
    let img = render(&m, ExportFormat::Png, &options);
    let inked = img.pixels().filter(|p| p.0 != [255, 255, 255, 255]).count();
    assert!(inked > 100, "only {} pixels drawn", inked);
    // Glyphs stay below the anchor row.
    let (_, y0, _, _) = ink_box(&img, 700);
    assert!(y0 >= 3, "{}", y0);
}

#[test]
fn bold_text_inks_more_than_regular() {
    let regular = model("TY 10 10 40 30 0 0 0 * HELLO\n");
    let bold = model("TY 10 10 40 30 0 1 0 * HELLO\n");
    let options = ExportOptions { resolution: 2.0, antialias: false, ..Default::default() };
    let count = |m: &DrawingModel| render(m, ExportFormat::Png, &options).pixels().filter(|p| p[0] < 128).count();
    assert!(count(&bold) > count(&regular));
}
