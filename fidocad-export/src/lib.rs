/*!
# FidoCad export

Writes FidoCad drawings to other formats. The [`Exporter`] walks a
[`DrawingModel`](fidocad_core::DrawingModel) layer by layer, expands macros
and hands every primitive, already mapped to device units, to an
[`ExportBackend`]. Drill holes are exported last so they punch through
every layer.

## Backends

- **Page description**: EPS, PDF and SVG
- **CAD exchange**: FidoCadJ text, Eagle scripts and gEDA PCB-rnd layouts
- **Bitmaps**: PNG and JPEG, optionally anti-aliased

Problems that do not stop an export (missing macros, glyphs the PDF
encoding cannot hold) are counted in an [`ExportReport`].
*/

pub mod backend;
pub mod bounds;
pub mod decorated;
pub mod driver;
pub mod eagle;
pub mod engine;
pub mod eps;
pub mod error;
pub mod fidocad;
pub mod format;
mod glyphs;
pub mod metrics;
pub mod pcbrnd;
pub mod pdf;
pub mod raster;
pub mod svg;

pub use backend::{Arrows, ExportBackend, MacroPlacement, PadItem, Stroke, TextItem};
pub use bounds::{fit_magnitude, image_size, BoundsBackend, EXPORT_BORDER};
pub use driver::{export_by_extension, export_to_file, export_to_vec, ExportFormat, ExportOptions};
pub use engine::Exporter;
pub use error::{ExportError, ExportReport, ExportResult};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name written in the header comments of generated files.
pub(crate) fn creator() -> String {
    format!("FidoCad export {}", VERSION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
        assert!(creator().starts_with("FidoCad export "));
    }
}
