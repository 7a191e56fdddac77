//! Package discovery
//!
//! Walks a directory tree, parses every non-test `.go` file and groups the resulting units
//! by directory and package clause. Files are visited in name order, so packages and their
//! units come out in a stable order.

use crate::error::{Diagnostic, Result};
use crate::parse_file;
use busgen_core::SourceUnit;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// Go files of one directory that share a package clause
#[derive(Debug, Clone)]
pub struct Package {
    pub dir: PathBuf,
    pub name: String,
    pub units: Vec<SourceUnit>,
    pub diagnostics: Vec<Diagnostic>,
}

/// A file that could not be read or tokenized
#[derive(Debug, Clone, Serialize)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct LoadedPackages {
    pub packages: Vec<Package>,
    pub skipped: Vec<SkippedFile>,
}

pub struct PackageLoader {
    root: PathBuf,
}

impl PackageLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Go source files under the root, sorted by path
    pub fn source_files(&self) -> Result<Vec<PathBuf>> {
        std::fs::metadata(&self.root)?;

        let mut files = Vec::new();
        let walker = WalkDir::new(&self.root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_ignored_dir(entry));
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!("skipping unreadable entry: {}", err);
                    continue;
                }
            };
            if entry.file_type().is_file() && is_source_file(entry.path()) {
                files.push(entry.into_path());
            }
        }
        files.sort();
        Ok(files)
    }

    pub fn load(&self) -> Result<LoadedPackages> {
        let mut grouped: BTreeMap<(PathBuf, String), Package> = BTreeMap::new();
        let mut skipped = Vec::new();

        for path in self.source_files()? {
            let parsed = match parse_file(&path) {
                Ok(parsed) => parsed,
                Err(err) => {
                    warn!("skipping {}: {}", path.display(), err);
                    skipped.push(SkippedFile {
                        reason: err.to_string(),
                        path,
                    });
                    continue;
                }
            };
            for diagnostic in &parsed.diagnostics {
                debug!("recovered: {}", diagnostic);
            }

            let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
            let name = parsed.unit.package.clone();
            let package = grouped
                .entry((dir.clone(), name.clone()))
                .or_insert_with(|| Package {
                    dir,
                    name,
                    units: Vec::new(),
                    diagnostics: Vec::new(),
                });
            package.units.push(parsed.unit);
            package.diagnostics.extend(parsed.diagnostics);
        }

        let packages: Vec<Package> = grouped.into_values().collect();
        debug!(
            "loaded {} package(s) from {}, skipped {} file(s)",
            packages.len(),
            self.root.display(),
            skipped.len()
        );
        Ok(LoadedPackages { packages, skipped })
    }
}

/// `.go` files other than tests
fn is_source_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    name.ends_with(".go") && !name.ends_with("_test.go")
}

/// Directories the go tool never treats as packages
fn is_ignored_dir(entry: &DirEntry) -> bool {
    if !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || name.starts_with('_') || name == "testdata"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_file_filter() {
        assert!(is_source_file(Path::new("a/b/manager.go")));
        assert!(!is_source_file(Path::new("a/b/manager_test.go")));
        assert!(!is_source_file(Path::new("a/b/notes.txt")));
        assert!(!is_source_file(Path::new("a/b/go")));
    }
}
