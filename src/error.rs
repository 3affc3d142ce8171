// ABOUTME: Application-wide error types for ocirootfs.
// ABOUTME: Uses thiserror for ergonomic error handling.

use crate::backend::SelectionError;
use crate::rootfs::{RootfsError, RootfsErrorKind};
use crate::types::ParseImageRefError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("file already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("configuration file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid image reference: {0}")]
    InvalidImage(#[from] ParseImageRefError),

    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error(transparent)]
    Rootfs(#[from] RootfsError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Process exit status for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Rootfs(e) if e.kind() == RootfsErrorKind::Cancelled => 130,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
