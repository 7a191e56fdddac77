use crate::token::Loc;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParserError {
    #[error("Syntax error in {path}:{line}:{column}: {message}", path = .file.display())]
    Syntax {
        file: PathBuf,
        line: usize,
        column: usize,
        message: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ParserError {
    pub fn syntax(file: impl Into<PathBuf>, error: SyntaxError) -> Self {
        ParserError::Syntax {
            file: file.into(),
            line: error.loc.line,
            column: error.loc.column,
            message: error.message,
        }
    }
}

pub type Result<T> = std::result::Result<T, ParserError>;

/// Error raised while tokenizing or parsing, before it is tied to a file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub loc: Loc,
    pub message: String,
}

impl SyntaxError {
    pub fn new(loc: Loc, message: impl Into<String>) -> Self {
        Self {
            loc,
            message: message.into(),
        }
    }
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.loc, self.message)
    }
}

impl std::error::Error for SyntaxError {}

pub type SyntaxResult<T> = std::result::Result<T, SyntaxError>;

/// Recovered error inside an otherwise usable file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub file: PathBuf,
    pub loc: Loc,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.file.display(), self.loc, self.message)
    }
}
