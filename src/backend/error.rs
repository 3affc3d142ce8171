// ABOUTME: Errors from pulling and extracting an image.
// ABOUTME: Each variant keeps the failing tool's captured output.

use crate::process::CommandError;
use std::path::PathBuf;

/// Coarse classification of a backend failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendErrorKind {
    /// The image could not be fetched.
    Pull,
    /// The image was fetched but its filesystem could not be produced.
    Extraction,
    Cancelled,
    TimedOut,
}

/// Error while producing a filesystem tree from an image.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("image pull failed: {0}")]
    Pull(#[source] CommandError),

    #[error("failed to mount image with buildah: {0}")]
    Mount(#[source] CommandError),

    #[error("failed to read mount point from {path}: {source}")]
    MountPointUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("buildah reported an empty mount point in {0}")]
    EmptyMountPoint(PathBuf),

    #[error("failed to create container: {0}")]
    ContainerCreate(#[source] CommandError),

    #[error("failed to create extraction directory {path}: {source}")]
    ExtractDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to start export pipeline: {0}")]
    PipeStart(#[source] CommandError),

    #[error("container export failed: {0}")]
    Export(#[source] CommandError),

    #[error("tar extraction failed: {0}")]
    Extract(#[source] CommandError),

    #[error("export stream broke: {0}")]
    Relay(#[source] std::io::Error),

    #[error("extraction interrupted: {0}")]
    Interrupted(#[source] CommandError),
}

impl BackendError {
    /// The tool failure behind this error, if any.
    pub fn command_error(&self) -> Option<&CommandError> {
        match self {
            BackendError::Pull(e)
            | BackendError::Mount(e)
            | BackendError::ContainerCreate(e)
            | BackendError::PipeStart(e)
            | BackendError::Export(e)
            | BackendError::Extract(e)
            | BackendError::Interrupted(e) => Some(e),
            BackendError::MountPointUnreadable { .. }
            | BackendError::EmptyMountPoint(_)
            | BackendError::ExtractDir { .. }
            | BackendError::Relay(_) => None,
        }
    }

    pub fn kind(&self) -> BackendErrorKind {
        if let Some(e) = self.command_error() {
            if e.is_cancelled() {
                return BackendErrorKind::Cancelled;
            }
            if e.is_timeout() {
                return BackendErrorKind::TimedOut;
            }
        }
        match self {
            BackendError::Pull(_) => BackendErrorKind::Pull,
            _ => BackendErrorKind::Extraction,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn failed(output: &str) -> CommandError {
        CommandError::Failed {
            program: "skopeo".to_string(),
            code: Some(1),
            output: output.to_string(),
        }
    }

    #[test]
    fn pull_failure_is_classified_as_pull() {
        let err = BackendError::Pull(failed("manifest unknown"));
        assert_eq!(err.kind(), BackendErrorKind::Pull);
        assert_eq!(
            err.command_error().and_then(|e| e.output()),
            Some("manifest unknown")
        );
    }

    #[test]
    fn export_failure_is_extraction() {
        assert_eq!(
            BackendError::Export(failed("no such container")).kind(),
            BackendErrorKind::Extraction
        );
        assert_eq!(
            BackendError::EmptyMountPoint(PathBuf::from("/w/op-1/mountpoint")).kind(),
            BackendErrorKind::Extraction
        );
    }

    #[test]
    fn cancellation_wins_over_step() {
        let err = BackendError::Pull(CommandError::Cancelled {
            program: "skopeo".to_string(),
        });
        assert_eq!(err.kind(), BackendErrorKind::Cancelled);
    }

    #[test]
    fn timeout_wins_over_step() {
        let err = BackendError::Export(CommandError::TimedOut {
            program: "docker".to_string(),
            timeout: Duration::from_secs(1),
        });
        assert_eq!(err.kind(), BackendErrorKind::TimedOut);
    }
}
