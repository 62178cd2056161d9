//! Driver errors.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DriverError>;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("input file not found: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("import path does not exist: {}", .0.display())]
    ImportPathNotFound(PathBuf),

    #[error("compilation failed")]
    CompilationFailed,
}
