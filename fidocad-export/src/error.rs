use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image encoding error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Unsupported export format: {0}")]
    UnsupportedFormat(String),

    #[error("Macro '{key}' nested deeper than {depth} levels")]
    MacroRecursion { key: String, depth: usize },

    #[error("Invalid magnitude {0}: must be finite and positive")]
    InvalidMagnitude(f64),

    #[error("Cannot allocate a {width}x{height} bitmap")]
    Canvas { width: u32, height: u32 },
}

pub type ExportResult<T> = Result<T, ExportError>;

/// Recoverable problems met during one export. None of them stops the
/// export; they are logged once when it ends.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportReport {
    /// Macro instances whose key is not in the library.
    pub unresolved_macros: usize,
    /// Macro instances skipped because they nest too deeply.
    pub recursion_limit_hits: usize,
    /// Characters left out of PDF text for lack of encoding slots.
    pub dropped_glyphs: usize,
    /// Malformed lines skipped while reading macro bodies.
    pub skipped_parse_lines: usize,
}

impl ExportReport {
    pub fn is_clean(&self) -> bool {
        *self == Self::default()
    }

    pub fn merge(&mut self, other: &ExportReport) {
        self.unresolved_macros += other.unresolved_macros;
        self.recursion_limit_hits += other.recursion_limit_hits;
        self.dropped_glyphs += other.dropped_glyphs;
        self.skipped_parse_lines += other.skipped_parse_lines;
    }

    /// One warning line per non-zero counter.
    pub fn log_summary(&self) {
        if self.unresolved_macros > 0 {
            log::warn!("{} macro instance(s) not found in the library were skipped", self.unresolved_macros);
        }
        if self.recursion_limit_hits > 0 {
            log::warn!("{} macro instance(s) nested too deeply were skipped", self.recursion_limit_hits);
        }
        if self.dropped_glyphs > 0 {
            log::warn!("{} character(s) could not be encoded in the PDF and were dropped", self.dropped_glyphs);
        }
        if self.skipped_parse_lines > 0 {
            log::warn!("{} malformed macro line(s) were skipped", self.skipped_parse_lines);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_and_clean() {
        let mut a = ExportReport::default();
        assert!(a.is_clean());
        let b = ExportReport { unresolved_macros: 2, dropped_glyphs: 1, ..Default::default() };
        a.merge(&b);
        a.merge(&b);
        assert_eq!(a.unresolved_macros, 4);
        assert_eq!(a.dropped_glyphs, 2);
        assert!(!a.is_clean());
    }

    #[test]
    fn test_error_messages() {
        let e = ExportError::MacroRecursion { key: "loop".into(), depth: 16 };
        assert_eq!(e.to_string(), "Macro 'loop' nested deeper than 16 levels");
        let e = ExportError::UnsupportedFormat("doc".into());
        assert!(e.to_string().contains("doc"));
    }
}
