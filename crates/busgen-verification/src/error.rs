//! Error types for verification

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, VerificationError>;

#[derive(Error, Debug)]
pub enum VerificationError {
    #[error("Go executable not found. Please install Go: https://go.dev/dl/")]
    GoNotFound,

    #[error("Probe file already exists: {}", .0.display())]
    ProbeFileExists(PathBuf),

    #[error("Probe failed:\n{output}")]
    ProbeFailed { output: String },

    #[error("Process execution failed: {0}")]
    ProcessFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
