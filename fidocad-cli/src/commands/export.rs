//! Export command implementation - convert a drawing to another format

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::Config;
use crate::error::{CliError, CliResult};
use fidocad_core::{DrawingModel, MacroLibrary};
use fidocad_export::{export_to_file, ExportFormat, ExportOptions, ExportReport};

#[allow(clippy::too_many_arguments)]
pub fn execute(
    config: &Config,
    input: PathBuf,
    output: PathBuf,
    format: Option<String>,
    resolution: Option<f64>,
    width: Option<u32>,
    height: Option<u32>,
    split_layers: bool,
    black_white: bool,
    no_antialias: bool,
    no_ext: bool,
    strict: bool,
    libraries: Vec<PathBuf>,
) -> Result<ExportReport> {
    log::info!("Starting export");
    log::info!("Input drawing: {}", input.display());
    log::info!("Output file: {}", output.display());

    if !input.exists() {
        return Err(CliError::file_not_found(input).into());
    }

    let format = resolve_format(format.as_deref(), &output)?;
    log::info!("Output format: {}", format);

    let mut library_paths = config.library.paths.clone();
    library_paths.extend(libraries);
    let library = load_libraries(&library_paths)?;

    let (mut model, errors) = DrawingModel::load(&input, Arc::new(library))
        .map_err(CliError::from)
        .with_context(|| format!("Failed to read drawing {}", input.display()))?;
    for e in &errors {
        log::warn!("{}: {}", input.display(), e);
    }
    if strict && !errors.is_empty() {
        let file = input.display().to_string();
        return Err(CliError::parse(file, format!("{} malformed line(s)", errors.len())).into());
    }
    log::info!("Loaded {} primitives", model.primitives.len());

    config.apply_to(&mut model)?;

    let mut options = config.export_options();
    if let Some(r) = resolution {
        options.resolution = r;
    }
    options.size = match (width, height) {
        (Some(w), Some(h)) => Some((w, h)),
        (None, None) => None,
        _ => return Err(CliError::validation("--width and --height must be given together").into()),
    };
    apply_flags(&mut options, split_layers, black_white, no_antialias, no_ext);

    let mut report = export_to_file(&output, &model, format, &options)
        .map_err(CliError::from)
        .with_context(|| format!("Failed to export {}", output.display()))?;
    report.skipped_parse_lines += errors.len();

    if report.is_clean() {
        log::info!("Export completed");
    } else {
        log::info!("Export completed with warnings");
    }
    Ok(report)
}

/// The explicit format wins over the output extension.
fn resolve_format(format: Option<&str>, output: &Path) -> CliResult<ExportFormat> {
    match format {
        Some(name) => Ok(name.parse::<ExportFormat>()?),
        None => ExportFormat::from_path(output).ok_or_else(|| {
            CliError::invalid_format(format!("cannot tell the format of '{}' from its extension", output.display()))
        }),
    }
}

fn load_libraries(paths: &[PathBuf]) -> CliResult<MacroLibrary> {
    let mut library = MacroLibrary::new();
    for path in paths {
        if !path.exists() {
            return Err(CliError::file_not_found(path.clone()));
        }
        library.load_file(path)?;
    }
    log::debug!("{} macros available", library.len());
    Ok(library)
}

/// Command-line switches only ever turn features on or off against the
/// configuration.
fn apply_flags(options: &mut ExportOptions, split_layers: bool, black_white: bool, no_antialias: bool, no_ext: bool) {
    options.split_layers |= split_layers;
    options.black_white |= black_white;
    if no_antialias {
        options.antialias = false;
    }
    if no_ext {
        options.extensions = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, text: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn test_resolve_format() {
        assert_eq!(resolve_format(None, Path::new("out.svg")).unwrap(), ExportFormat::Svg);
        assert_eq!(resolve_format(Some("fcda"), Path::new("out.fcd")).unwrap(), ExportFormat::Fcda);
        assert!(matches!(resolve_format(None, Path::new("out")), Err(CliError::InvalidFormat { .. })));
        assert!(matches!(resolve_format(Some("doc"), Path::new("out.svg")), Err(CliError::InvalidFormat { .. })));
    }

    #[test]
    fn test_flags_override_config() {
        let mut options = ExportOptions::default();
        apply_flags(&mut options, true, false, true, true);
        assert!(options.split_layers);
        assert!(!options.black_white);
        assert!(!options.antialias);
        assert!(!options.extensions);
    }

    #[test]
    fn test_export_with_library() {
        let dir = tempfile::tempdir().unwrap();
        let lib = write(dir.path(), "mylib.fcl", "[FIDOLIB My parts]\n{Passive}\n[res Resistor]\nLI 90 100 110 100 0\n");
        let input = write(dir.path(), "in.fcd", "[FIDOCAD]\nMC 50 50 0 0 mylib.res\nLI 0 0 10 0 1\n");
        let output = dir.path().join("out.fcd");

        let report = execute(
            &Config::default(),
            input,
            output.clone(),
            None,
            None,
            None,
            None,
            false,
            false,
            false,
            true,
            false,
            vec![lib],
        )
        .unwrap();
        assert!(report.is_clean());
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "[FIDOCAD]\nLI 40 50 60 50 0\nLI 0 0 10 0 1\n");
    }

    #[test]
    fn test_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let err = execute(
            &Config::default(),
            dir.path().join("nope.fcd"),
            dir.path().join("out.svg"),
            None,
            None,
            None,
            None,
            false,
            false,
            false,
            false,
            false,
            Vec::new(),
        )
        .unwrap_err();
        assert!(matches!(err.downcast_ref::<CliError>(), Some(CliError::FileNotFound { .. })));
    }

    #[test]
    fn test_strict_rejects_malformed_lines() {
        let dir = tempfile::tempdir().unwrap();
        let input = write(dir.path(), "bad.fcd", "[FIDOCAD]\nLI 0 0\nXX 1 2 3\n");
        let run = |strict| {
            execute(
                &Config::default(),
                input.clone(),
                dir.path().join("out.svg"),
                None,
                None,
                None,
                None,
                false,
                false,
                false,
                false,
                strict,
                Vec::new(),
            )
        };
        assert_eq!(run(false).unwrap().skipped_parse_lines, 2);
        assert!(matches!(run(true).unwrap_err().downcast_ref::<CliError>(), Some(CliError::Parse { .. })));
    }
}
