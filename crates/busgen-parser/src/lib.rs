//! Go source provider for busgen: tokenizer, parser and package loader

pub mod error;
pub mod lexer;
pub mod loader;
pub mod parser;
pub mod token;

use std::path::Path;

pub use error::{Diagnostic, ParserError, Result};
pub use loader::{LoadedPackages, Package, PackageLoader, SkippedFile};
pub use parser::{ParsedFile, Parser};

/// Parse one Go source file held in memory
pub fn parse_source(path: impl AsRef<Path>, source: &str) -> Result<ParsedFile> {
    let path = path.as_ref();
    let tokens = lexer::tokenize(source).map_err(|e| ParserError::syntax(path, e))?;
    Parser::new(path, tokens)
        .parse_file()
        .map_err(|e| ParserError::syntax(path, e))
}

/// Read and parse one Go source file
pub fn parse_file(path: impl AsRef<Path>) -> Result<ParsedFile> {
    let path = path.as_ref();
    let source = std::fs::read_to_string(path)?;
    parse_source(path, &source)
}
