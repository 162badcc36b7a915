use thiserror::Error;

/// What went wrong with a single primitive line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    #[error("bad arguments on {command}: {found} tokens, at least {expected} expected")]
    TooFewTokens { command: String, found: usize, expected: usize },

    #[error("invalid number '{0}'")]
    InvalidNumber(String),

    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    #[error("macro '{0}' not found in the library")]
    UnknownMacro(String),
}

/// A recoverable parse failure, tagged with the 1-based line number.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {kind}")]
pub struct ParseError {
    pub line: usize,
    pub kind: ParseErrorKind,
}

impl ParseError {
    pub fn new(line: usize, kind: ParseErrorKind) -> Self {
        Self { line, kind }
    }
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Library error in {file}: {message}")]
    Library { file: String, message: String },
}

pub type ModelResult<T> = Result<T, ModelError>;
