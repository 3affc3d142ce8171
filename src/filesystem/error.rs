// ABOUTME: Error types for filesystem image construction.
// ABOUTME: Each external step has its own variant carrying the tool's output.

use crate::process::CommandError;
use std::path::PathBuf;

/// Errors that can occur while building an image file.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("source directory does not exist: {0}")]
    SourceMissing(PathBuf),

    #[error("source path is not a directory: {0}")]
    SourceNotDirectory(PathBuf),

    #[error("output path is a directory: {0}")]
    OutputConflict(PathBuf),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to create image file: {0}")]
    Allocate(#[source] CommandError),

    #[error("failed to format ext4: {0}")]
    Format(#[source] CommandError),

    #[error("failed to mount image: {0}")]
    Mount(#[source] CommandError),

    #[error("failed to copy contents: {0}")]
    Copy(#[source] CommandError),

    #[error("failed to unmount image: {0}")]
    Unmount(#[source] CommandError),
}

impl BuildError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        BuildError::Io {
            context: context.into(),
            source,
        }
    }

    /// The failing tool's error, if a tool failed.
    pub fn command_error(&self) -> Option<&CommandError> {
        match self {
            BuildError::Allocate(e)
            | BuildError::Format(e)
            | BuildError::Mount(e)
            | BuildError::Copy(e)
            | BuildError::Unmount(e) => Some(e),
            _ => None,
        }
    }
}
