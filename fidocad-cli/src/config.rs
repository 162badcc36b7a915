//! Configuration handling for the fidocad CLI
//!
//! Supports loading configuration from fidocad.toml files with CLI argument overrides.

use anyhow::{Context, Result};
use fidocad_core::{Color, DrawingModel, DrawingSettings, MAX_LAYERS};
use fidocad_export::ExportOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::CliError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub drawing: DrawingConfig,
    #[serde(default)]
    pub layers: Vec<LayerOverride>,
    #[serde(default)]
    pub library: LibraryConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Pixels per logical unit
    #[serde(default = "default_resolution")]
    pub resolution: f64,

    /// Smooth bitmap output
    #[serde(default = "default_true")]
    pub antialias: bool,

    #[serde(default)]
    pub black_white: bool,

    /// Write one file per used layer
    #[serde(default)]
    pub split_layers: bool,

    /// Write FidoCadJ extensions in FidoCad output
    #[serde(default = "default_true")]
    pub extensions: bool,

    #[serde(default)]
    pub export_invisible: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawingConfig {
    #[serde(default = "default_line_width")]
    pub line_width: f64,

    #[serde(default = "default_line_width_circles")]
    pub line_width_circles: f64,

    /// Diameter of connection dots
    #[serde(default = "default_connection_size")]
    pub connection_size: f64,
}

/// Changes to one entry of the layer table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerOverride {
    pub index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// `#rrggbb`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alpha: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LibraryConfig {
    /// Macro library files loaded before every export
    #[serde(default)]
    pub paths: Vec<PathBuf>,
}

// Default value functions
fn default_resolution() -> f64 { 1.0 }
fn default_true() -> bool { true }
fn default_line_width() -> f64 { fidocad_core::settings::DEFAULT_LINE_WIDTH }
fn default_line_width_circles() -> f64 { fidocad_core::settings::DEFAULT_LINE_WIDTH_CIRCLES }
fn default_connection_size() -> f64 { fidocad_core::settings::DEFAULT_CONNECTION_SIZE }

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            resolution: default_resolution(),
            antialias: true,
            black_white: false,
            split_layers: false,
            extensions: true,
            export_invisible: false,
        }
    }
}

impl Default for DrawingConfig {
    fn default() -> Self {
        Self {
            line_width: default_line_width(),
            line_width_circles: default_line_width_circles(),
            connection_size: default_connection_size(),
        }
    }
}

impl DrawingConfig {
    fn settings(&self) -> DrawingSettings {
        DrawingSettings {
            line_width: self.line_width,
            line_width_circles: self.line_width_circles,
            connection_size: self.connection_size,
        }
    }
}

impl Config {
    /// Load configuration from file or use defaults
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let config = match config_path {
            Some(path) => {
                log::info!("Loading configuration from: {}", path.display());
                Self::load_from_file(path)?
            }
            None => {
                // Try to find fidocad.toml in current directory
                let default_path = PathBuf::from("fidocad.toml");
                if default_path.exists() {
                    log::info!("Loading configuration from: fidocad.toml");
                    Self::load_from_file(&default_path)?
                } else {
                    log::debug!("Using default configuration");
                    Self::default()
                }
            }
        };

        Ok(config)
    }

    /// Load configuration from a specific TOML file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file: {}", path.display()))?;

        let config: Config = toml::from_str(&content).map_err(CliError::from)
            .with_context(|| format!("Failed to parse configuration file: {}", path.display()))?;

        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .context("Failed to serialize configuration")?;

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write configuration file: {}", path.display()))?;

        Ok(())
    }

    /// Generate example configuration file content
    pub fn example_toml() -> Result<String> {
        let mut config = Self::default();
        config.layers.push(LayerOverride {
            index: 3,
            name: Some("Silkscreen".to_string()),
            color: Some("#008080".to_string()),
            alpha: Some(1.0),
            visible: Some(true),
        });
        config.library.paths.push(PathBuf::from("libraries/mylib.fcl"));
        toml::to_string_pretty(&config).context("Failed to serialize default configuration")
    }

    /// Export options before command-line overrides.
    pub fn export_options(&self) -> ExportOptions {
        ExportOptions {
            resolution: self.export.resolution,
            antialias: self.export.antialias,
            black_white: self.export.black_white,
            split_layers: self.export.split_layers,
            extensions: self.export.extensions,
            export_invisible: self.export.export_invisible,
            ..ExportOptions::default()
        }
    }

    /// Applies the stroke settings, unless the drawing sets its own, and
    /// every layer override.
    pub fn apply_to(&self, model: &mut DrawingModel) -> Result<(), CliError> {
        if model.settings == DrawingSettings::default() {
            model.settings = self.drawing.settings();
        }
        for o in &self.layers {
            if o.index >= MAX_LAYERS {
                return Err(CliError::config(format!(
                    "layer index {} out of range, must be below {}",
                    o.index, MAX_LAYERS
                )));
            }
            let layer = &mut model.layers[o.index];
            if let Some(name) = &o.name {
                layer.name = name.clone();
            }
            if let Some(color) = &o.color {
                layer.color = color.parse::<Color>().map_err(CliError::config)?;
            }
            if let Some(alpha) = o.alpha {
                layer.alpha = alpha.clamp(0.0, 1.0);
            }
            if let Some(visible) = o.visible {
                layer.visible = visible;
            }
            log::debug!("Layer {} overridden: {:?}", o.index, layer);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.export.resolution, 1.0);
        assert!(config.export.antialias);
        assert_eq!(config.drawing.line_width, 0.5);
        assert!(config.layers.is_empty());
    }

    #[test]
    fn test_config_roundtrip() -> Result<()> {
        let mut config = Config::default();
        config.export.split_layers = true;
        config.layers.push(LayerOverride { index: 2, name: None, color: Some("#123456".into()), alpha: None, visible: None });
        let temp_file = NamedTempFile::new()?;

        config.save_to_file(temp_file.path())?;
        let loaded_config = Config::load_from_file(temp_file.path())?;
        assert_eq!(config, loaded_config);

        Ok(())
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = toml::from_str("[export]\nresolution = 3.0\n").unwrap();
        assert_eq!(config.export.resolution, 3.0);
        assert!(config.export.extensions);
        assert_eq!(config.drawing.connection_size, 2.0);
    }

    #[test]
    fn test_example_toml_generation() {
        let example = Config::example_toml().unwrap();
        assert!(example.contains("[export]"));
        assert!(example.contains("[drawing]"));
        assert!(example.contains("[[layers]]"));
        assert!(example.contains("[library]"));
        let parsed: Config = toml::from_str(&example).unwrap();
        assert_eq!(parsed.layers[0].index, 3);
    }

    #[test]
    fn test_layer_overrides_applied() {
        let config: Config = toml::from_str(
            "[[layers]]\nindex = 1\nname = \"Copper\"\ncolor = \"#ff8000\"\nvisible = false\n",
        )
        .unwrap();
        let mut model = DrawingModel::default();
        config.apply_to(&mut model).unwrap();
        assert_eq!(model.layers[1].name, "Copper");
        assert_eq!(model.layers[1].color, Color::rgb(0xff, 0x80, 0));
        assert!(!model.layers[1].visible);
    }

    #[test]
    fn test_bad_layer_override_rejected() {
        let config: Config = toml::from_str("[[layers]]\nindex = 16\n").unwrap();
        assert!(config.apply_to(&mut DrawingModel::default()).is_err());
        let config: Config = toml::from_str("[[layers]]\nindex = 0\ncolor = \"red\"\n").unwrap();
        assert!(matches!(config.apply_to(&mut DrawingModel::default()), Err(CliError::Config { .. })));
    }

    #[test]
    fn test_drawing_settings_kept_when_set_in_file() {
        let config: Config = toml::from_str("[drawing]\nline_width = 1.5\n").unwrap();
        let mut plain = DrawingModel::default();
        config.apply_to(&mut plain).unwrap();
        assert_eq!(plain.settings.line_width, 1.5);

        let mut custom = DrawingModel::default();
        custom.settings.line_width = 0.8;
        config.apply_to(&mut custom).unwrap();
        assert_eq!(custom.settings.line_width, 0.8);
    }
}
