use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Unknown type: {0}")]
    UnknownType(String),

    #[error("Type does not implement the export interface: {0}")]
    NotExportable(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
