// ABOUTME: The capability every pull-and-extract backend provides.
// ABOUTME: Extraction yields a tree that must be released after the image is built.

use super::engine::{Engine, EngineBackend};
use super::error::BackendError;
use super::sealed::Sealed;
use super::skopeo::SkopeoBuildahBackend;
use super::types::BackendKind;
use crate::diagnostics::Diagnostics;
use crate::process::CommandRunner;
use crate::types::{ContainerName, Credentials, ImageRef};
use crate::workspace::OperationDir;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Inputs for one extraction.
#[derive(Debug)]
pub struct ExtractRequest<'a> {
    pub image: &'a ImageRef,
    pub credentials: Option<&'a Credentials>,
    pub operation: &'a OperationDir,
    pub container_prefix: &'a str,
}

impl ExtractRequest<'_> {
    /// Credentials worth passing to a tool. Partial pairs pull anonymously.
    pub fn usable_credentials(&self) -> Option<&Credentials> {
        self.credentials.filter(|c| c.is_usable())
    }

    /// Container name for this operation.
    pub fn container_name(&self) -> ContainerName {
        self.operation.id().container_name(self.container_prefix)
    }
}

/// A root filesystem tree produced by a backend.
#[derive(Debug)]
pub struct ExtractedTree {
    root: PathBuf,
    container: Option<ContainerName>,
}

impl ExtractedTree {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            container: None,
        }
    }

    /// The tree stays mounted through this container until released.
    pub fn with_container(mut self, container: ContainerName) -> Self {
        self.container = Some(container);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn container(&self) -> Option<&ContainerName> {
        self.container.as_ref()
    }

    pub(crate) fn into_parts(self) -> (PathBuf, Option<ContainerName>) {
        (self.root, self.container)
    }
}

/// Pull an image and expose its root filesystem as a host directory.
#[async_trait]
pub trait Backend: Sealed + Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Fetch the image and produce its filesystem tree.
    ///
    /// On error, anything this call created (containers, mounts) has
    /// already been cleaned up.
    async fn extract(
        &self,
        runner: &CommandRunner,
        request: &ExtractRequest<'_>,
        diagnostics: &mut Diagnostics,
    ) -> Result<ExtractedTree, BackendError>;

    /// Give back whatever keeps `tree` alive. Failures are warnings.
    ///
    /// Runs even after cancellation, so implementations use a detached
    /// runner for their cleanup commands.
    async fn release(
        &self,
        runner: &CommandRunner,
        tree: ExtractedTree,
        diagnostics: &mut Diagnostics,
    );
}

/// The backend implementation for `kind`.
pub fn backend_for(kind: BackendKind) -> Box<dyn Backend> {
    match kind {
        BackendKind::SkopeoBuildah => Box::new(SkopeoBuildahBackend),
        BackendKind::Podman => Box::new(EngineBackend::new(Engine::Podman)),
        BackendKind::Docker => Box::new(EngineBackend::new(Engine::Docker)),
    }
}
