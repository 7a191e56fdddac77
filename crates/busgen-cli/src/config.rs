//! TOML configuration
//!
//! ```toml
//! file_path = "services/audio"
//! write_go = true
//! output_dir = "proxies"
//!
//! [codegen]
//! proxy_suffix = "Client"
//!
//! [probe]
//! go_binary = "/usr/local/go/bin/go"
//! ```
//!
//! Every key is optional. Command-line flags take precedence.

use anyhow::{Context, Result};
use busgen_codegen::CodegenConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Directory to analyze
    pub file_path: Option<PathBuf>,
    /// Emit client proxies
    pub write_go: bool,
    /// Run the introspection probe
    pub write_xml: bool,
    /// Where generated proxies go; stdout when unset
    pub output_dir: Option<PathBuf>,
    pub codegen: CodegenConfig,
    pub probe: ProbeConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Go executable; searched on `PATH` when unset
    pub go_binary: Option<PathBuf>,
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_config_is_default() -> Result<()> {
        let config: Config = toml::from_str("")?;
        assert_eq!(config, Config::default());
        assert_eq!(config.codegen.proxy_suffix, "Proxy");
        Ok(())
    }

    #[test]
    fn test_partial_sections_keep_defaults() -> Result<()> {
        let config: Config = toml::from_str(
            r#"
            write_go = true

            [codegen]
            proxy_suffix = "Client"

            [probe]
            go_binary = "/opt/go/bin/go"
            "#,
        )?;
        assert!(config.write_go);
        assert!(!config.write_xml);
        assert_eq!(config.codegen.proxy_suffix, "Client");
        assert_eq!(config.codegen.read_marker, "read");
        assert_eq!(config.probe.go_binary, Some(PathBuf::from("/opt/go/bin/go")));
        Ok(())
    }

    #[test]
    fn test_unreadable_file_names_the_path() {
        let err = Config::from_file(Path::new("/no/such/busgen.toml")).unwrap_err();
        assert!(err.to_string().contains("/no/such/busgen.toml"));
    }
}
