//! Error handling for the fidocad CLI

use fidocad_core::ModelError;
use fidocad_export::ExportError;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for fidocad CLI operations
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Input/Output error: {message}")]
    Io { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Invalid format: {message}")]
    InvalidFormat { message: String },

    #[error("Parsing error in {file}: {message}")]
    Parse { file: String, message: String },

    #[error("Library error in {file}: {message}")]
    Library { file: String, message: String },

    #[error("Export error: {message}")]
    Export { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },
}

impl CliError {
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config { message: message.into() }
    }

    pub fn io<S: Into<String>>(message: S) -> Self {
        Self::Io { message: message.into() }
    }

    pub fn file_not_found(path: PathBuf) -> Self {
        Self::FileNotFound { path }
    }

    pub fn invalid_format<S: Into<String>>(message: S) -> Self {
        Self::InvalidFormat { message: message.into() }
    }

    pub fn parse<S: Into<String>>(file: S, message: S) -> Self {
        Self::Parse {
            file: file.into(),
            message: message.into(),
        }
    }

    pub fn library<S: Into<String>>(file: S, message: S) -> Self {
        Self::Library {
            file: file.into(),
            message: message.into(),
        }
    }

    pub fn export<S: Into<String>>(message: S) -> Self {
        Self::Export { message: message.into() }
    }

    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation { message: message.into() }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::io(err.to_string())
    }
}

impl From<toml::de::Error> for CliError {
    fn from(err: toml::de::Error) -> Self {
        Self::config(format!("TOML parsing error: {}", err))
    }
}

impl From<toml::ser::Error> for CliError {
    fn from(err: toml::ser::Error) -> Self {
        Self::config(format!("TOML serialization error: {}", err))
    }
}

impl From<ModelError> for CliError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::Io(e) => Self::io(e.to_string()),
            ModelError::Library { file, message } => Self::library(file, message),
        }
    }
}

impl From<ExportError> for CliError {
    fn from(err: ExportError) -> Self {
        match err {
            ExportError::UnsupportedFormat(name) => Self::invalid_format(format!("unsupported export format '{}'", name)),
            ExportError::InvalidMagnitude(m) => Self::validation(format!("resolution {} must be finite and positive", m)),
            ExportError::Io(e) => Self::io(e.to_string()),
            other => Self::export(other.to_string()),
        }
    }
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// Provide helpful error messages and suggestions
pub fn format_error_with_suggestions(error: &CliError) -> String {
    let mut message = error.to_string();

    // Add helpful suggestions based on error type
    match error {
        CliError::FileNotFound { path } => {
            message.push_str(&format!(
                "\n\nSuggestions:\n\
                 • Check that the file path is correct: {}\n\
                 • Ensure you have read permissions for the file",
                path.display()
            ));
        }

        CliError::InvalidFormat { .. } => {
            let names: Vec<&str> = fidocad_export::ExportFormat::ALL.iter().map(|f| f.name()).collect();
            message.push_str(&format!(
                "\n\nSuggestions:\n\
                 • Use --format with one of: {}\n\
                 • Or give the output file one of these extensions\n\
                 • Run 'fidocad formats' for descriptions",
                names.join(", ")
            ));
        }

        CliError::Config { .. } => {
            message.push_str(
                "\n\nSuggestions:\n\
                 • Check your fidocad.toml configuration file\n\
                 • Use 'fidocad config --example' to generate a sample configuration\n\
                 • Colors are written as \"#rrggbb\" and layer indices run from 0 to 15"
            );
        }

        CliError::Library { .. } => {
            message.push_str(
                "\n\nSuggestions:\n\
                 • Every macro starts with a [key description] line\n\
                 • Categories are written as {name} on their own line"
            );
        }

        CliError::Validation { .. } => {
            message.push_str(
                "\n\nSuggestions:\n\
                 • Use a resolution above zero, for example --resolution 2"
            );
        }

        _ => {}
    }

    message
}

/// Print error with helpful suggestions and exit
pub fn print_error_and_exit(error: &CliError) -> ! {
    eprintln!("Error: {}", format_error_with_suggestions(error));
    std::process::exit(1);
}
