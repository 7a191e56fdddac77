//! Probe program rendering
//!
//! The probe is a throwaway `_test.go` file dropped into the analyzed package. Running its
//! single test instantiates every exported type and has the helper library write the
//! introspection XML for it.

use crate::config::CodegenConfig;
use crate::error::{CodegenError, Result};
use crate::source::{is_identifier, SourceFile};
use serde::Serialize;

pub const PROBE_TEST_NAME: &str = "TestBusgenWriteXml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeProgram {
    /// File name inside the package directory
    pub file_name: String,
    /// Test function to select with `-run`
    pub test_name: String,
    pub source: String,
}

pub fn probe_file_name(package: &str) -> String {
    format!("Test_{}_BusgenWriteXml_test.go", package)
}

/// Render the probe for `type_names` with the default helper library
pub fn render_probe(package: &str, type_names: &[String]) -> Result<ProbeProgram> {
    render_probe_with(&CodegenConfig::default(), package, type_names)
}

pub fn render_probe_with(
    config: &CodegenConfig,
    package: &str,
    type_names: &[String],
) -> Result<ProbeProgram> {
    if type_names.is_empty() {
        return Err(CodegenError::EmptyUnit(package.to_string()));
    }
    if let Some(bad) = type_names.iter().find(|name| !is_identifier(name)) {
        return Err(CodegenError::InvalidIdentifier(bad.clone()));
    }

    let mut file = SourceFile::new(package);
    file.add_import("testing");
    file.add_import(&config.dbusutil_import);

    let body = &mut file.body;
    body.open("var busgenImplementers = []dbusutil.Implementer{");
    for name in type_names {
        body.line(format!("&{}{{}},", name));
    }
    body.close("}");
    body.blank();
    body.line(format!("// go test -count=1 -v -run={}", PROBE_TEST_NAME));
    body.open(format!("func {}(t *testing.T) {{", PROBE_TEST_NAME));
    body.open("for _, implementer := range busgenImplementers {");
    body.line("dbusutil.WriteXML(implementer)");
    body.close("}");
    body.close("}");

    Ok(ProbeProgram {
        file_name: probe_file_name(package),
        test_name: PROBE_TEST_NAME.to_string(),
        source: file.render()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_probe_lists_every_type() -> Result<()> {
        let program = render_probe("audio", &["Audio".to_string(), "Sink".to_string()])?;
        assert_eq!(program.file_name, "Test_audio_BusgenWriteXml_test.go");
        assert_eq!(program.test_name, "TestBusgenWriteXml");
        assert_eq!(
            program.source,
            r#"// Code generated by busgen. DO NOT EDIT.

package audio

import (
	"pkg.deepin.io/lib/dbusutil"
	"testing"
)

var busgenImplementers = []dbusutil.Implementer{
	&Audio{},
	&Sink{},
}

// go test -count=1 -v -run=TestBusgenWriteXml
func TestBusgenWriteXml(t *testing.T) {
	for _, implementer := range busgenImplementers {
		dbusutil.WriteXML(implementer)
	}
}
"#
        );
        Ok(())
    }

    #[test]
    fn test_probe_needs_types() {
        assert!(matches!(
            render_probe("audio", &[]),
            Err(CodegenError::EmptyUnit(_))
        ));
    }

    #[test]
    fn test_probe_rejects_non_identifiers() {
        assert!(matches!(
            render_probe("audio", &["Foo{}".to_string()]),
            Err(CodegenError::InvalidIdentifier(_))
        ));
    }
}
