//! Package loading over real directory trees

use busgen_parser::{PackageLoader, ParserError};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write(dir: &Path, relative: &str, contents: &str) -> Result<(), Box<dyn std::error::Error>> {
    let path = dir.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)?;
    Ok(())
}

#[test]
fn test_groups_files_by_directory_and_package() -> Result<(), Box<dyn std::error::Error>> {
    let temp = TempDir::new()?;
    let root = temp.path();
    write(root, "svc/b.go", "package svc\n\nconst B = \"b\"\n")?;
    write(root, "svc/a.go", "package svc\n\nconst A = \"a\"\n")?;
    write(root, "svc/a_test.go", "package svc\n\nconst T = \"t\"\n")?;
    write(root, "svc/tool.go", "package main\n\nfunc main() {}\n")?;
    write(root, "other/x.go", "package other\n")?;
    write(root, "testdata/fixture.go", "package fixture\n")?;
    write(root, ".hidden/y.go", "package hidden\n")?;
    write(root, "svc/README.md", "not go")?;

    let loaded = PackageLoader::new(root).load()?;
    let summary: Vec<_> = loaded
        .packages
        .iter()
        .map(|p| {
            let files: Vec<_> = p
                .units
                .iter()
                .filter_map(|u| u.path.file_name().and_then(|n| n.to_str()).map(str::to_string))
                .collect();
            (p.name.clone(), files)
        })
        .collect();

    assert_eq!(
        summary,
        vec![
            ("other".to_string(), vec!["x.go".to_string()]),
            ("main".to_string(), vec!["tool.go".to_string()]),
            ("svc".to_string(), vec!["a.go".to_string(), "b.go".to_string()]),
        ]
    );
    assert!(loaded.skipped.is_empty());
    Ok(())
}

#[test]
fn test_unreadable_file_is_skipped_not_fatal() -> Result<(), Box<dyn std::error::Error>> {
    let temp = TempDir::new()?;
    let root = temp.path();
    write(root, "svc/good.go", "package svc\n\nconst Path = \"/org/x\"\n")?;
    write(root, "svc/bad.go", "package svc\n\nconst Broken = \"unterminated\n")?;

    let loaded = PackageLoader::new(root).load()?;
    assert_eq!(loaded.packages.len(), 1);
    assert_eq!(loaded.packages[0].units.len(), 1);
    assert_eq!(loaded.skipped.len(), 1);
    assert!(loaded.skipped[0].path.ends_with("svc/bad.go"));
    assert!(loaded.skipped[0].reason.contains("string literal not terminated"));
    Ok(())
}

#[test]
fn test_recovered_errors_are_kept_as_diagnostics() -> Result<(), Box<dyn std::error::Error>> {
    let temp = TempDir::new()?;
    write(
        temp.path(),
        "svc/mixed.go",
        "package svc\n\nfunc broken( {\n}\n\ntype Manager struct{}\n",
    )?;

    let loaded = PackageLoader::new(temp.path()).load()?;
    let package = &loaded.packages[0];
    assert_eq!(package.diagnostics.len(), 1);
    assert_eq!(package.units[0].decls.len(), 1);
    Ok(())
}

#[test]
fn test_missing_root_is_an_error() {
    let result = PackageLoader::new("/definitely/not/here/busgen").load();
    assert!(matches!(result, Err(ParserError::Io(_))));
}
