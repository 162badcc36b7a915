//! File-level export: picks the backend for a format, sizes the page,
//! optionally splits the drawing into one file per layer and writes each
//! output through a temporary file persisted once complete.

use std::fmt;
use std::io::{BufWriter, Seek, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use fidocad_core::coords::{MAX_MAGNITUDE, MIN_MAGNITUDE};
use fidocad_core::{Color, DrawingModel, Layer, MapCoordinates};
use image::{DynamicImage, ImageOutputFormat};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::bounds::{fit_magnitude, image_size, measure, EXPORT_BORDER};
use crate::eagle::EagleBackend;
use crate::engine::Exporter;
use crate::eps::EpsBackend;
use crate::error::{ExportError, ExportReport, ExportResult};
use crate::fidocad::FidoCadBackend;
use crate::pcbrnd::PcbRndBackend;
use crate::pdf::PdfBackend;
use crate::raster::RasterBackend;
use crate::svg::SvgBackend;
use crate::ExportBackend;

const JPEG_QUALITY: u8 = 90;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// FidoCadJ text, standard macros kept as `MC` lines.
    Fcd,
    /// FidoCadJ text, every macro expanded.
    Fcda,
    Svg,
    Eps,
    Pdf,
    /// Eagle command script.
    Scr,
    /// gEDA PCB-rnd layout.
    Pcb,
    Png,
    Jpg,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 9] = [
        ExportFormat::Fcd,
        ExportFormat::Fcda,
        ExportFormat::Svg,
        ExportFormat::Eps,
        ExportFormat::Pdf,
        ExportFormat::Scr,
        ExportFormat::Pcb,
        ExportFormat::Png,
        ExportFormat::Jpg,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ExportFormat::Fcd => "fcd",
            ExportFormat::Fcda => "fcda",
            ExportFormat::Svg => "svg",
            ExportFormat::Eps => "eps",
            ExportFormat::Pdf => "pdf",
            ExportFormat::Scr => "scr",
            ExportFormat::Pcb => "pcb",
            ExportFormat::Png => "png",
            ExportFormat::Jpg => "jpg",
        }
    }

    /// File extension of the output.
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Fcda => "fcd",
            other => other.name(),
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ExportFormat::Fcd => "FidoCadJ drawing, standard macros kept",
            ExportFormat::Fcda => "FidoCadJ drawing, all macros expanded",
            ExportFormat::Svg => "Scalable Vector Graphics",
            ExportFormat::Eps => "Encapsulated PostScript",
            ExportFormat::Pdf => "Portable Document Format",
            ExportFormat::Scr => "Eagle command script",
            ExportFormat::Pcb => "gEDA PCB-rnd layout",
            ExportFormat::Png => "PNG bitmap",
            ExportFormat::Jpg => "JPEG bitmap",
        }
    }

    pub fn is_raster(self) -> bool {
        matches!(self, ExportFormat::Png | ExportFormat::Jpg)
    }

    /// Formats whose coordinates must stay the drawing's own.
    fn keeps_coordinates(self) -> bool {
        matches!(self, ExportFormat::Fcd | ExportFormat::Fcda | ExportFormat::Pcb)
    }

    /// Guesses the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension().and_then(|e| e.to_str()).and_then(|e| e.parse().ok())
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fcd" | "fidocad" => Ok(ExportFormat::Fcd),
            "fcda" => Ok(ExportFormat::Fcda),
            "svg" => Ok(ExportFormat::Svg),
            "eps" => Ok(ExportFormat::Eps),
            "pdf" => Ok(ExportFormat::Pdf),
            "scr" | "eagle" => Ok(ExportFormat::Scr),
            "pcb" => Ok(ExportFormat::Pcb),
            "png" => Ok(ExportFormat::Png),
            "jpg" | "jpeg" => Ok(ExportFormat::Jpg),
            _ => Err(ExportError::UnsupportedFormat(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportOptions {
    /// Device units per logical unit. Ignored when `size` is set.
    pub resolution: f64,
    /// Page size in device units; the resolution is fitted to it.
    pub size: Option<(u32, u32)>,
    /// Bitmaps only.
    pub antialias: bool,
    pub black_white: bool,
    /// One file per used layer, named `<stem>_<layer>.<ext>`.
    pub split_layers: bool,
    pub extensions: bool,
    pub export_invisible: bool,
    /// Moves the drawing so it starts at the page border.
    pub shift_origin: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            resolution: 1.0,
            size: None,
            antialias: true,
            black_white: false,
            split_layers: false,
            extensions: true,
            export_invisible: false,
            shift_origin: true,
        }
    }
}

/// Everything fixed for one export run, shared by the per-layer outputs.
struct Job<'a> {
    model: &'a DrawingModel,
    format: ExportFormat,
    options: &'a ExportOptions,
    layers: Vec<Layer>,
    unit: f64,
}

impl Job<'_> {
    /// Mapping at `unit` device units per logical unit, shifted so the
    /// drawing starts half a border from the page corner.
    fn mapping(&self, unit: f64) -> ExportResult<MapCoordinates> {
        let mut cs = MapCoordinates::new();
        cs.set_magnitudes(unit, unit);
        if self.options.shift_origin && !self.format.keeps_coordinates() {
            let (_, org) = image_size(self.model, 1.0, true)?;
            let margin = EXPORT_BORDER as f64 * unit / 2.0;
            cs.set_x_center(-(org.x as f64 * unit - margin));
            cs.set_y_center(-(org.y as f64 * unit - margin));
        }
        Ok(cs)
    }

    fn exporter(&self) -> Exporter<'_> {
        Exporter::new(self.model).with_layers(self.layers.clone()).export_invisible(self.options.export_invisible)
    }

    fn write_file(&self, path: &Path, only_layer: Option<usize>) -> ExportResult<ExportReport> {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir)?;
        let report = {
            let mut out = BufWriter::new(tmp.as_file_mut());
            let report = self.write(&mut out, only_layer)?;
            out.flush()?;
            report
        };
        tmp.persist(path).map_err(|e| ExportError::Io(e.error))?;
        log::info!("Wrote {}", path.display());
        Ok(report)
    }

    fn write<W: Write + Seek>(&self, out: &mut W, only_layer: Option<usize>) -> ExportResult<ExportReport> {
        let cs = self.mapping(self.unit)?;
        let mut exporter = self.exporter();
        let mut dropped_glyphs = 0;
        match self.format {
            ExportFormat::Fcd | ExportFormat::Fcda => {
                let mut b = FidoCadBackend::new(out)
                    .with_extensions(self.options.extensions)
                    .split_standard_macros(self.format == ExportFormat::Fcda)
                    .with_settings(self.model.settings);
                exporter.export(&mut b, &cs, only_layer)?;
            }
            ExportFormat::Svg => exporter.export(&mut SvgBackend::new(out), &cs, only_layer)?,
            ExportFormat::Eps => exporter.export(&mut EpsBackend::new(out), &cs, only_layer)?,
            ExportFormat::Pdf => {
                let mut b = PdfBackend::new(out);
                exporter.export(&mut b, &cs, only_layer)?;
                dropped_glyphs = b.dropped_glyphs();
            }
            ExportFormat::Scr => exporter.export(&mut EagleBackend::new(out), &cs, only_layer)?,
            ExportFormat::Pcb => exporter.export(&mut PcbRndBackend::new(out), &cs, only_layer)?,
            ExportFormat::Png | ExportFormat::Jpg => return self.write_raster(out, only_layer),
        }
        let mut report = exporter.into_report();
        report.dropped_glyphs += dropped_glyphs;
        Ok(report)
    }

    fn write_raster<W: Write + Seek>(&self, out: &mut W, only_layer: Option<usize>) -> ExportResult<ExportReport> {
        let cs = self.mapping(self.unit)?;
        let mut exporter = self.exporter();
        let mut raster = RasterBackend::new().with_antialias(self.options.antialias);
        exporter.export(&mut raster, &cs, only_layer)?;

        let img = DynamicImage::ImageRgba8(raster.into_image());
        match self.format {
            ExportFormat::Jpg => {
                DynamicImage::ImageRgb8(img.to_rgb8()).write_to(out, ImageOutputFormat::Jpeg(JPEG_QUALITY))?
            }
            _ => img.write_to(out, ImageOutputFormat::Png)?,
        }
        Ok(exporter.into_report())
    }
}

/// Device units per logical unit for `options`, limited to the range the
/// coordinate mapping accepts so the page and the drawing agree.
fn export_unit(model: &DrawingModel, options: &ExportOptions) -> ExportResult<f64> {
    let unit = match options.size {
        Some((w, h)) => fit_magnitude(model, w, h)?,
        None => options.resolution,
    };
    if !unit.is_finite() || unit <= 0.0 {
        return Err(ExportError::InvalidMagnitude(unit));
    }
    let clamped = unit.clamp(MIN_MAGNITUDE, MAX_MAGNITUDE);
    if clamped != unit {
        log::warn!("Resolution {} out of range, using {}", unit, clamped);
    }
    Ok(clamped)
}

/// Page size in device units at `unit`, border included.
pub fn page_size(model: &DrawingModel, unit: f64) -> ExportResult<(u32, u32)> {
    let (d, _) = image_size(model, 1.0, true)?;
    let w = ((d.width + EXPORT_BORDER) as f64 * unit) as u32;
    let h = ((d.height + EXPORT_BORDER) as f64 * unit) as u32;
    Ok((w.max(1), h.max(1)))
}

/// Path of the file holding `layer` when splitting `path`.
pub fn layer_path(path: &Path, layer: usize) -> PathBuf {
    let stem = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{}_{}.{}", stem, layer, ext.to_string_lossy()),
        None => format!("{}_{}", stem, layer),
    };
    path.with_file_name(name)
}

fn export_layers(model: &DrawingModel, black_white: bool) -> Vec<Layer> {
    model
        .layers
        .iter()
        .map(|l| if black_white { Layer { color: Color::BLACK, ..l.clone() } } else { l.clone() })
        .collect()
}

/// Exports `model` to `path`. With split layers, writes one file per
/// layer that holds something and leaves `path` itself untouched.
pub fn export_to_file(
    path: &Path,
    model: &DrawingModel,
    format: ExportFormat,
    options: &ExportOptions,
) -> ExportResult<ExportReport> {
    let unit = export_unit(model, options)?;
    log::info!("Exporting {} primitives as {} at {} units per pixel", model.primitives.len(), format, unit);

    let job = Job { model, format, options, layers: export_layers(model, options.black_white), unit };
    let report = if options.split_layers {
        let (bounds, _) = measure(model, 1.0)?;
        let used: Vec<usize> = bounds.layers_used().iter().copied().collect();
        log::debug!("Splitting into layers {:?}", used);
        let reports = used
            .par_iter()
            .map(|&l| job.write_file(&layer_path(path, l), Some(l)))
            .collect::<ExportResult<Vec<_>>>()?;
        reports.iter().fold(ExportReport::default(), |mut acc, r| {
            acc.merge(r);
            acc
        })
    } else {
        job.write_file(path, None)?
    };
    report.log_summary();
    Ok(report)
}

/// Exports to a file named after `path`, inferring the format from its
/// extension.
pub fn export_by_extension(path: &Path, model: &DrawingModel, options: &ExportOptions) -> ExportResult<ExportReport> {
    let format = ExportFormat::from_path(path)
        .ok_or_else(|| ExportError::UnsupportedFormat(path.display().to_string()))?;
    export_to_file(path, model, format, options)
}

/// Writes `model` to an in-memory buffer.
pub fn export_to_vec(model: &DrawingModel, format: ExportFormat, options: &ExportOptions) -> ExportResult<Vec<u8>> {
    let unit = export_unit(model, options)?;
    let job = Job { model, format, options, layers: export_layers(model, options.black_white), unit };
    let mut out = std::io::Cursor::new(Vec::new());
    job.write(&mut out, None)?;
    Ok(out.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fidocad_core::MacroLibrary;
    use std::sync::Arc;

    fn model(text: &str) -> DrawingModel {
        DrawingModel::parse(text, Arc::new(MacroLibrary::new())).0
    }

    #[test]
    fn test_format_names() {
        assert_eq!("JPEG".parse::<ExportFormat>().unwrap(), ExportFormat::Jpg);
        assert_eq!("scr".parse::<ExportFormat>().unwrap(), ExportFormat::Scr);
        assert!("doc".parse::<ExportFormat>().is_err());
        assert_eq!(ExportFormat::Fcda.extension(), "fcd");
        assert_eq!(ExportFormat::from_path(Path::new("a/b.svg")), Some(ExportFormat::Svg));
        assert_eq!(ExportFormat::from_path(Path::new("noext")), None);
        for f in ExportFormat::ALL {
            assert_eq!(f.name().parse::<ExportFormat>().unwrap(), f);
        }
    }

    #[test]
    fn test_layer_path() {
        assert_eq!(layer_path(Path::new("/tmp/out.png"), 3), PathBuf::from("/tmp/out_3.png"));
        assert_eq!(layer_path(Path::new("out"), 0), PathBuf::from("out_0"));
    }

    #[test]
    fn test_fidocad_keeps_coordinates() {
        let m = model("LI 10 10 50 50 2\n");
        let options = ExportOptions { extensions: false, ..Default::default() };
        let out = export_to_vec(&m, ExportFormat::Fcd, &options).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "[FIDOCAD]\nLI 10 10 50 50 2\n");
    }

    #[test]
    fn test_svg_origin_shift() {
        let m = model("LI 10 20 50 20 0\n");
        let out = String::from_utf8(export_to_vec(&m, ExportFormat::Svg, &ExportOptions::default()).unwrap()).unwrap();
        assert!(out.contains("<line x1=\"3.0\" y1=\"3.0\" x2=\"43.0\" y2=\"3.0\""));
    }

    #[test]
    fn test_black_white_layers() {
        let m = model("RV 0 0 10 10 2\n");
        let layers = export_layers(&m, true);
        assert!(layers.iter().all(|l| l.color == Color::BLACK));
        assert_eq!(layers[12].alpha, m.layers[12].alpha);
    }

    #[test]
    fn test_invalid_resolution() {
        let m = model("LI 0 0 10 10 0\n");
        let options = ExportOptions { resolution: 0.0, ..Default::default() };
        assert!(matches!(
            export_to_vec(&m, ExportFormat::Svg, &options),
            Err(ExportError::InvalidMagnitude(_))
        ));
    }

    #[test]
    fn test_unit_is_clamped() {
        let m = model("LI 0 0 10 10 0\n");
        let unit = |resolution| export_unit(&m, &ExportOptions { resolution, ..Default::default() });
        assert_eq!(unit(500.0).unwrap(), MAX_MAGNITUDE);
        assert_eq!(unit(0.01).unwrap(), MIN_MAGNITUDE);
        assert_eq!(unit(3.0).unwrap(), 3.0);
        assert!(matches!(unit(0.0), Err(ExportError::InvalidMagnitude(_))));
    }

    #[test]
    fn test_oversized_resolution_matches_page() {
        let m = model("RV 0 0 4 2 0\n");
        let options = ExportOptions { resolution: 1000.0, antialias: false, ..Default::default() };
        let bytes = export_to_vec(&m, ExportFormat::Png, &options).unwrap();
        let img = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(img.dimensions(), page_size(&m, MAX_MAGNITUDE).unwrap());
        // The rectangle fills its whole share of the page at the clamped scale.
        let half_border = (EXPORT_BORDER as f64 * MAX_MAGNITUDE / 2.0) as u32;
        assert_ne!(*img.get_pixel(half_border + 350, half_border + 150), image::Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_png_size() {
        let m = model("RV 0 0 40 20 0\n");
        let options = ExportOptions { resolution: 2.0, ..Default::default() };
        let bytes = export_to_vec(&m, ExportFormat::Png, &options).unwrap();
        let img = image::load_from_memory(&bytes).unwrap();
        assert_eq!((img.width(), img.height()), page_size(&m, 2.0).unwrap());
    }
}
