//! Go code generation for exported bus objects

pub mod config;
pub mod error;
pub mod probe;
pub mod proxy;
pub mod source;

pub use config::CodegenConfig;
pub use error::{CodegenError, Result};
pub use probe::{render_probe, render_probe_with, ProbeProgram, PROBE_TEST_NAME};
pub use proxy::{ExportedObject, ProxyEmitter, ProxyUnit};
pub use source::{SourceBody, SourceFile};

/// Common trait for all code generators
pub trait Codegen {
    fn generate(&mut self, unit: &ProxyUnit) -> Result<String>;
}
