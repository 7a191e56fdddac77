//! Go source file assembly
//!
//! [`SourceFile`] owns the package clause and a deduplicated import set; the declarations
//! themselves go into a [`SourceBody`], an indentation-aware line writer. Output uses tabs
//! the way gofmt does, so generated files stay stable under formatting.

use crate::error::{CodegenError, Result};
use std::collections::BTreeSet;
use std::fmt::Write;

pub const GENERATED_HEADER: &str = "// Code generated by busgen. DO NOT EDIT.";

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct Import {
    path: String,
    alias: Option<String>,
}

impl Import {
    /// `path` or `alias,path`
    fn parse(spec: &str) -> Self {
        match spec.split_once(',') {
            Some((alias, path)) => Import {
                path: path.trim().to_string(),
                alias: Some(alias.trim().to_string()),
            },
            None => Import {
                path: spec.trim().to_string(),
                alias: None,
            },
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SourceBody {
    text: String,
    depth: usize,
}

impl SourceBody {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn line(&mut self, text: impl AsRef<str>) {
        let text = text.as_ref();
        if !text.is_empty() {
            for _ in 0..self.depth {
                self.text.push('\t');
            }
            self.text.push_str(text);
        }
        self.text.push('\n');
    }

    pub fn blank(&mut self) {
        self.text.push('\n');
    }

    /// Write `text` and indent what follows
    pub fn open(&mut self, text: impl AsRef<str>) {
        self.line(text);
        self.depth += 1;
    }

    /// Dedent and write `text`
    pub fn close(&mut self, text: impl AsRef<str>) {
        self.depth = self.depth.saturating_sub(1);
        self.line(text);
    }

    /// Dedent, write `text` and indent again, as for `} else {`
    pub fn middle(&mut self, text: impl AsRef<str>) {
        self.depth = self.depth.saturating_sub(1);
        self.line(text);
        self.depth += 1;
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// One generated `.go` file
#[derive(Debug, Clone)]
pub struct SourceFile {
    package: String,
    imports: BTreeSet<Import>,
    pub body: SourceBody,
}

impl SourceFile {
    pub fn new(package: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            imports: BTreeSet::new(),
            body: SourceBody::new(),
        }
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    /// Add an import; duplicates are ignored
    pub fn add_import(&mut self, spec: &str) {
        self.imports.insert(Import::parse(spec));
    }

    pub fn render(&self) -> Result<String> {
        if !is_identifier(&self.package) {
            return Err(CodegenError::InvalidIdentifier(self.package.clone()));
        }

        let mut out = String::new();
        writeln!(out, "{}", GENERATED_HEADER)?;
        writeln!(out)?;
        writeln!(out, "package {}", self.package)?;
        writeln!(out)?;
        if !self.imports.is_empty() {
            writeln!(out, "import (")?;
            for import in &self.imports {
                match &import.alias {
                    Some(alias) => writeln!(out, "\t{} {:?}", alias, import.path)?,
                    None => writeln!(out, "\t{:?}", import.path)?,
                }
            }
            writeln!(out, ")")?;
            writeln!(out)?;
        }
        out.push_str(self.body.as_str());
        Ok(out)
    }
}

/// Whether `name` is a valid Go identifier
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_alphanumeric())
}
