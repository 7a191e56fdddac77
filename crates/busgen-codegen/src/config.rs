use serde::{Deserialize, Serialize};

/// Settings for proxy generation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodegenConfig {
    /// Import path of the wire library (`dbus.Conn`, `dbus.Call`, ...)
    pub dbus_import: String,
    /// Import path of the helper library (`SignalRule`, `WriteXML`, ...)
    pub dbusutil_import: String,
    /// Import path of the proxy runtime (`proxy.Object`, `proxy.Prop*`)
    pub proxy_import: String,
    /// Appended to the type name to form the wrapper name
    pub proxy_suffix: String,
    /// A generic property name containing this gets a `Get`.
    ///
    /// Markers match ASCII case-insensitively, so `ReadOnlyMode` and `ThreadCount` both
    /// contain `read`. A plain `strings.Contains` check would only match the lowercase
    /// occurrence inside `ThreadCount`.
    pub read_marker: String,
    /// A generic property name containing this gets a `Set`, matched like `read_marker`
    pub write_marker: String,
}

impl Default for CodegenConfig {
    fn default() -> Self {
        Self {
            dbus_import: "github.com/godbus/dbus".to_string(),
            dbusutil_import: "pkg.deepin.io/lib/dbusutil".to_string(),
            proxy_import: "pkg.deepin.io/lib/dbusutil/proxy".to_string(),
            proxy_suffix: "Proxy".to_string(),
            read_marker: "read".to_string(),
            write_marker: "write".to_string(),
        }
    }
}

impl CodegenConfig {
    pub fn wrapper_name(&self, type_name: &str) -> String {
        format!("{}{}", type_name, self.proxy_suffix)
    }

    pub fn is_readable(&self, property: &str) -> bool {
        contains_ignore_case(property, &self.read_marker)
    }

    pub fn is_writable(&self, property: &str) -> bool {
        contains_ignore_case(property, &self.write_marker)
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    !needle.is_empty()
        && haystack
            .to_ascii_lowercase()
            .contains(&needle.to_ascii_lowercase())
}
