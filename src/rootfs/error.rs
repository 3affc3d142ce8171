// ABOUTME: Rootfs error types with SNAFU pattern.
// ABOUTME: Unifies selection, extraction and build failures for programmatic handling.

use snafu::Snafu;

use crate::backend::{BackendError, BackendErrorKind, BackendKind, SelectionError};
use crate::filesystem::BuildError;
use crate::process::CommandError;

/// Unified error for one materialization or manager lifecycle step.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum RootfsError {
    #[snafu(display("workspace error: {source}"))]
    Workspace { source: std::io::Error },

    #[snafu(display("{source}"))]
    Selection { source: SelectionError },

    #[snafu(display("{backend} backend failed: {source}"))]
    Backend {
        backend: BackendKind,
        source: BackendError,
    },

    #[snafu(display("sizing interrupted: {source}"))]
    Sizing { source: CommandError },

    #[snafu(display("image build failed: {source}"))]
    Build { source: BuildError },
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootfsErrorKind {
    /// No usable backend tool set on this host.
    ToolUnavailable,
    /// The image could not be fetched.
    PullFailure,
    /// The image was fetched but not turned into a directory tree.
    ExtractionFailure,
    /// Allocating, formatting, mounting, copying or unmounting failed.
    ImageBuildFailure,
    Cancelled,
    TimedOut,
    /// The temp workspace could not be created or removed.
    Workspace,
}

impl RootfsError {
    /// Returns the error kind for programmatic handling.
    pub fn kind(&self) -> RootfsErrorKind {
        if let Some(e) = self.command_error() {
            if e.is_cancelled() {
                return RootfsErrorKind::Cancelled;
            }
            if e.is_timeout() {
                return RootfsErrorKind::TimedOut;
            }
        }

        match self {
            RootfsError::Workspace { .. } => RootfsErrorKind::Workspace,
            RootfsError::Selection { .. } => RootfsErrorKind::ToolUnavailable,
            RootfsError::Backend { source, .. } => match source.kind() {
                BackendErrorKind::Pull => RootfsErrorKind::PullFailure,
                BackendErrorKind::Extraction => RootfsErrorKind::ExtractionFailure,
                BackendErrorKind::Cancelled => RootfsErrorKind::Cancelled,
                BackendErrorKind::TimedOut => RootfsErrorKind::TimedOut,
            },
            // Sizing only surfaces interruptions; anything else is a fallback.
            RootfsError::Sizing { .. } => RootfsErrorKind::Cancelled,
            RootfsError::Build { .. } => RootfsErrorKind::ImageBuildFailure,
        }
    }

    fn command_error(&self) -> Option<&CommandError> {
        match self {
            RootfsError::Backend { source, .. } => source.command_error(),
            RootfsError::Sizing { source } => Some(source),
            RootfsError::Build { source } => source.command_error(),
            RootfsError::Workspace { .. } | RootfsError::Selection { .. } => None,
        }
    }

    /// Combined stdout and stderr of the tool whose exit caused this error.
    pub fn tool_output(&self) -> Option<&str> {
        self.command_error().and_then(CommandError::output)
    }
}
