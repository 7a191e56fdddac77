//! Per-package orchestration
//!
//! Each package goes through index, scan, resolve, classify, dedup, emit and, when a
//! prober is configured, the probe run. A failing package is recorded in its
//! [`UnitReport`] and the run moves on to the next one.

use anyhow::{Context, Result};
use busgen_codegen::{
    render_probe_with, Codegen, CodegenConfig, ExportedObject, ProxyEmitter, ProxyUnit,
};
use busgen_core::{
    classify_named, Binding, BindingResolver, ExportRegistry, ExportSite, PackageScope,
};
use busgen_parser::{Diagnostic, LoadedPackages, Package, PackageLoader, SkippedFile};
use busgen_verification::{ProbeOutput, Prober};
use indexmap::IndexMap;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, trace, warn};

/// Outcome of one package
#[derive(Debug, Serialize)]
pub struct UnitReport {
    pub dir: PathBuf,
    pub package: String,
    pub sites: Vec<ExportSite>,
    pub bindings: Vec<Binding>,
    /// Deduplicated, classified objects in registration order
    pub objects: Vec<ExportedObject>,
    pub generated: Option<String>,
    pub probe: Option<ProbeOutput>,
    pub diagnostics: Vec<Diagnostic>,
    pub failures: Vec<String>,
}

impl UnitReport {
    fn new(package: &Package) -> Self {
        Self {
            dir: package.dir.clone(),
            package: package.name.clone(),
            sites: Vec::new(),
            bindings: Vec::new(),
            objects: Vec::new(),
            generated: None,
            probe: None,
            diagnostics: package.diagnostics.clone(),
            failures: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug, Default, Serialize)]
pub struct RunReport {
    pub units: Vec<UnitReport>,
    /// Files that could not be read or tokenized
    pub skipped: Vec<SkippedFile>,
}

impl RunReport {
    /// False when any package failed or any file had to be skipped
    pub fn is_success(&self) -> bool {
        self.skipped.is_empty() && self.units.iter().all(UnitReport::is_success)
    }

    pub fn failed_units(&self) -> impl Iterator<Item = &UnitReport> {
        self.units.iter().filter(|unit| !unit.is_success())
    }
}

pub struct Orchestrator {
    codegen: CodegenConfig,
    write_go: bool,
    prober: Option<Box<dyn Prober>>,
}

impl Orchestrator {
    pub fn new(codegen: CodegenConfig) -> Self {
        Self {
            codegen,
            write_go: false,
            prober: None,
        }
    }

    /// Generate proxy source for every package with exported objects
    pub fn with_proxies(mut self, write_go: bool) -> Self {
        self.write_go = write_go;
        self
    }

    /// Run the probe program in every package with exported objects
    pub fn with_prober(mut self, prober: Box<dyn Prober>) -> Self {
        self.prober = Some(prober);
        self
    }

    /// Load every package under `root` and process them in order
    pub fn run(&self, root: &Path) -> Result<RunReport> {
        let loaded = PackageLoader::new(root)
            .load()
            .with_context(|| format!("Failed to load Go packages from {}", root.display()))?;
        Ok(self.run_packages(loaded))
    }

    pub fn run_packages(&self, loaded: LoadedPackages) -> RunReport {
        let units: Vec<UnitReport> = loaded
            .packages
            .iter()
            .map(|package| self.process_package(package))
            .collect();

        let report = RunReport {
            units,
            skipped: loaded.skipped,
        };
        info!(
            "processed {} package(s): {} failed, {} file(s) skipped",
            report.units.len(),
            report.failed_units().count(),
            report.skipped.len()
        );
        report
    }

    #[instrument(skip_all, fields(package = %package.name, dir = %package.dir.display()))]
    pub fn process_package(&self, package: &Package) -> UnitReport {
        let mut report = UnitReport::new(package);

        let scope = PackageScope::new(&package.units);
        let registry = ExportRegistry::scan_units(&package.units);
        if registry.is_empty() {
            debug!("no export sites");
            return report;
        }

        let bindings = BindingResolver::new(&scope, &registry).resolve();
        report.objects = exported_objects(&scope, &bindings);
        report.sites = registry.sites;
        report.bindings = bindings;
        info!(
            "{} binding(s), {} exported object(s)",
            report.bindings.len(),
            report.objects.len()
        );
        if report.objects.is_empty() {
            return report;
        }

        if self.write_go {
            let unit = ProxyUnit {
                package: package.name.clone(),
                objects: report.objects.clone(),
            };
            let mut emitter = ProxyEmitter::new().with_config(self.codegen.clone());
            match emitter.generate(&unit) {
                Ok(source) => report.generated = Some(source),
                Err(e) => {
                    warn!("proxy generation failed: {}", e);
                    report.failures.push(format!("codegen: {}", e));
                }
            }
        }

        if let Some(prober) = &self.prober {
            let type_names: Vec<String> = report
                .objects
                .iter()
                .map(|object| object.classified.type_name.clone())
                .collect();
            let outcome = render_probe_with(&self.codegen, &package.name, &type_names)
                .map_err(|e| e.to_string())
                .and_then(|program| {
                    prober
                        .compile_and_run(&program, &package.dir)
                        .map_err(|e| e.to_string())
                });
            match outcome {
                Ok(output) => report.probe = Some(output),
                Err(e) => {
                    warn!("probe failed: {}", e);
                    report.failures.push(format!("probe: {}", e));
                }
            }
        }

        report
    }
}

/// Classify the resolved bindings, keeping the first registration of each type
///
/// One generated file can declare a proxy type only once, so registrations of the same
/// type collapse even when they resolved different interface names. An empty interface
/// name is filled from a later registration of the same type.
fn exported_objects(scope: &PackageScope<'_>, bindings: &[Binding]) -> Vec<ExportedObject> {
    let mut objects: IndexMap<String, ExportedObject> = IndexMap::new();

    for binding in bindings {
        let (Some(type_name), Some(export_path)) =
            (&binding.object_type_name, &binding.export_path)
        else {
            trace!("dropping unresolved binding {:?}", binding);
            continue;
        };
        let interface_name = binding.interface_name.clone().unwrap_or_default();

        if let Some(existing) = objects.get_mut(type_name) {
            if existing.interface_name.is_empty() && !interface_name.is_empty() {
                debug!("{} takes interface {:?} from a later registration", type_name, interface_name);
                existing.interface_name = interface_name;
            } else if existing.interface_name != interface_name && !interface_name.is_empty() {
                warn!(
                    "{} already exported as {:?}, ignoring {:?}",
                    type_name, existing.interface_name, interface_name
                );
            } else {
                debug!("{} already exported as {:?}", type_name, existing.interface_name);
            }
            continue;
        }

        match classify_named(scope, type_name) {
            Ok(classified) => {
                objects.insert(
                    type_name.clone(),
                    ExportedObject {
                        classified,
                        export_path: export_path.clone(),
                        interface_name,
                    },
                );
            }
            Err(e) => debug!("skipping {}: {}", type_name, e),
        }
    }

    for object in objects.values().filter(|o| o.interface_name.is_empty()) {
        warn!(
            "{} exported at {} has no interface name",
            object.classified.type_name, object.export_path
        );
    }
    objects.into_values().collect()
}

/// Write each generated proxy to `<out_dir>/<dir relative to root>/<package>_proxy.go`
///
/// Write failures are recorded on the unit. Returns the files written.
pub fn write_proxies(report: &mut RunReport, root: &Path, out_dir: &Path) -> Vec<PathBuf> {
    let mut written = Vec::new();
    for unit in &mut report.units {
        let Some(source) = &unit.generated else {
            continue;
        };
        let relative = unit.dir.strip_prefix(root).unwrap_or(&unit.dir);
        let target_dir = out_dir.join(relative);
        let target = target_dir.join(format!("{}_proxy.go", unit.package));

        let result = fs::create_dir_all(&target_dir).and_then(|()| fs::write(&target, source));
        match result {
            Ok(()) => {
                info!("wrote {}", target.display());
                written.push(target);
            }
            Err(e) => {
                warn!("failed to write {}: {}", target.display(), e);
                unit.failures.push(format!("write {}: {}", target.display(), e));
            }
        }
    }
    written
}

/// An absolute `path` under `cwd` becomes relative to it
pub fn relative_to(path: &Path, cwd: &Path) -> PathBuf {
    if !path.is_absolute() {
        return path.to_path_buf();
    }
    match path.strip_prefix(cwd) {
        Ok(relative) if relative.as_os_str().is_empty() => PathBuf::from("."),
        Ok(relative) => relative.to_path_buf(),
        Err(_) => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_to() {
        let cwd = Path::new("/home/dev/project");
        assert_eq!(relative_to(Path::new("/home/dev/project/svc"), cwd), PathBuf::from("svc"));
        assert_eq!(relative_to(Path::new("/home/dev/project"), cwd), PathBuf::from("."));
        assert_eq!(relative_to(Path::new("/srv/other"), cwd), PathBuf::from("/srv/other"));
        assert_eq!(relative_to(Path::new("svc"), cwd), PathBuf::from("svc"));
    }

    #[test]
    fn test_run_report_success() {
        let report = RunReport::default();
        assert!(report.is_success());

        let skipped = RunReport {
            units: Vec::new(),
            skipped: vec![SkippedFile {
                path: PathBuf::from("bad.go"),
                reason: "unterminated".into(),
            }],
        };
        assert!(!skipped.is_success());
    }
}
