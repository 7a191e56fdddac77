use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodegenError {
    #[error("Nothing to generate for package {0}")]
    EmptyUnit(String),

    #[error("Invalid Go identifier: {0:?}")]
    InvalidIdentifier(String),

    #[error("Format error: {0}")]
    Fmt(#[from] std::fmt::Error),
}

pub type Result<T> = std::result::Result<T, CodegenError>;
