//! Verification collaborator for busgen
//!
//! A [`Prober`] compiles and runs a generated probe program inside the analyzed package.
//! When the run succeeds the package's helper library has written the introspection XML
//! of every listed object as a side effect; when it fails the captured output is returned
//! as the error.


mod error;

use busgen_codegen::ProbeProgram;
use serde::Serialize;
use std::path::Path;

pub use error::{Result, VerificationError};
pub use go_test::{GoTestProber, ProbeFileGuard};

/// Captured output of a successful probe run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProbeOutput {
    pub stdout: String,
    pub stderr: String,
}

impl ProbeOutput {
    /// stdout followed by stderr
    pub fn combined(&self) -> String {
        match (self.stdout.is_empty(), self.stderr.is_empty()) {
            (_, true) => self.stdout.clone(),
            (true, false) => self.stderr.clone(),
            (false, false) => format!("{}\n{}", self.stdout.trim_end(), self.stderr),
        }
    }
}

pub trait Prober {
    /// Place `program` in `dir`, run it and remove it again, whatever the outcome
    fn compile_and_run(&self, program: &ProbeProgram, dir: &Path) -> Result<ProbeOutput>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combined_output() {
        let both = ProbeOutput {
            stdout: "=== RUN\n".into(),
            stderr: "FAIL\n".into(),
        };
        assert_eq!(both.combined(), "=== RUN\nFAIL\n");

        let only_err = ProbeOutput {
            stdout: String::new(),
            stderr: "boom".into(),
        };
        assert_eq!(only_err.combined(), "boom");
        assert_eq!(ProbeOutput::default().combined(), "");
    }
}
