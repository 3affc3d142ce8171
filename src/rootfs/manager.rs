// ABOUTME: RootfsManager drives one image through pull, sizing and image build.
// ABOUTME: Owns the temp workspace; every call gets its own operation directory.

use super::error::{
    BackendSnafu, BuildSnafu, RootfsError, SelectionSnafu, SizingSnafu, WorkspaceSnafu,
};
use super::report::RootfsReport;
use crate::backend::{
    BackendKind, ExtractRequest, ExtractedTree, SelectionError, backend_for,
    select_backend,
};
use crate::diagnostics::Diagnostics;
use crate::filesystem::{BuiltImage, build_image};
use crate::process::{CommandRunner, DEFAULT_COMMAND_TIMEOUT, Toolbox};
use crate::sizing::{DEFAULT_FALLBACK_SIZE, SizeEstimate, SizeSpec, estimate_size};
use crate::types::{Credentials, ImageRef};
use crate::workspace::{OperationDir, Workspace};
use snafu::ResultExt;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Container name prefix when none is configured.
pub const DEFAULT_CONTAINER_PREFIX: &str = "ocirootfs-extract";

/// Knobs for a [`RootfsManager`].
#[derive(Debug, Clone)]
pub struct ManagerSettings {
    /// Parent of the temp workspace; the system temp dir when `None`.
    pub work_dir: Option<PathBuf>,
    /// Where host tools are looked up; `$PATH` when `None`.
    pub search_path: Option<OsString>,
    /// Skip auto-detection and always use this backend.
    pub backend: Option<BackendKind>,
    /// Capacity used when the extracted tree cannot be measured.
    pub fallback_size: SizeSpec,
    pub command_timeout: Duration,
    pub container_prefix: String,
}

impl Default for ManagerSettings {
    fn default() -> Self {
        Self {
            work_dir: None,
            search_path: None,
            backend: None,
            fallback_size: DEFAULT_FALLBACK_SIZE,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            container_prefix: DEFAULT_CONTAINER_PREFIX.to_string(),
        }
    }
}

/// Turns image references into ext4 rootfs images.
///
/// Methods take `&self`; concurrent calls use disjoint operation
/// directories and container names.
#[derive(Debug)]
pub struct RootfsManager {
    workspace: Workspace,
    toolbox: Arc<Toolbox>,
    settings: ManagerSettings,
}

impl RootfsManager {
    pub fn new(settings: ManagerSettings) -> Result<Self, RootfsError> {
        let workspace = Workspace::create(settings.work_dir.as_deref()).context(WorkspaceSnafu)?;
        let toolbox = match &settings.search_path {
            Some(path) => Toolbox::with_search_path(path.clone()),
            None => Toolbox::from_env(),
        };

        Ok(Self {
            workspace,
            toolbox: Arc::new(toolbox),
            settings,
        })
    }

    pub fn settings(&self) -> &ManagerSettings {
        &self.settings
    }

    pub fn toolbox(&self) -> &Toolbox {
        &self.toolbox
    }

    pub fn workspace_path(&self) -> &Path {
        self.workspace.path()
    }

    /// The backend the next materialization would use.
    pub fn select_backend(&self) -> Result<BackendKind, SelectionError> {
        select_backend(self.toolbox.as_ref(), self.settings.backend)
    }

    /// Pull `image` and write it as an ext4 filesystem to `output`.
    pub async fn materialize_rootfs(
        &self,
        image: &ImageRef,
        output: &Path,
        credentials: Option<&Credentials>,
    ) -> Result<RootfsReport, RootfsError> {
        self.materialize_rootfs_with_cancel(image, output, credentials, CancellationToken::new())
            .await
    }

    /// Like [`materialize_rootfs`](Self::materialize_rootfs), stopping early
    /// with a cancelled error once `cancel` fires. Cleanup still runs.
    pub async fn materialize_rootfs_with_cancel(
        &self,
        image: &ImageRef,
        output: &Path,
        credentials: Option<&Credentials>,
        cancel: CancellationToken,
    ) -> Result<RootfsReport, RootfsError> {
        // Select before touching the workspace so a host without tools has
        // no side effects.
        let kind = self.select_backend().context(SelectionSnafu)?;
        let backend = backend_for(kind);
        tracing::info!("materializing {} with {}", image, kind);

        let runner = CommandRunner::new(Arc::clone(&self.toolbox))
            .with_timeout(self.settings.command_timeout)
            .with_cancellation(cancel);
        let operation = self.workspace.begin_operation().context(WorkspaceSnafu)?;
        let mut diagnostics = Diagnostics::default();

        let request = ExtractRequest {
            image,
            credentials,
            operation: &operation,
            container_prefix: &self.settings.container_prefix,
        };
        let tree = backend
            .extract(&runner, &request, &mut diagnostics)
            .await
            .context(BackendSnafu { backend: kind })?;
        tracing::info!("extracted {} to {}", image, tree.root().display());

        let built = self
            .build_from_tree(&runner, &tree, output, &operation, &mut diagnostics)
            .await;
        backend.release(&runner, tree, &mut diagnostics).await;
        let (built, estimate) = built?;

        Ok(RootfsReport {
            output: built.path,
            backend: kind,
            size: built.size,
            tree_bytes: estimate.tree_bytes,
            operation: operation.id().clone(),
            warnings: diagnostics.into_warnings(),
        })
    }

    async fn build_from_tree(
        &self,
        runner: &CommandRunner,
        tree: &ExtractedTree,
        output: &Path,
        operation: &OperationDir,
        diagnostics: &mut Diagnostics,
    ) -> Result<(BuiltImage, SizeEstimate), RootfsError> {
        let estimate = estimate_size(runner, tree.root(), self.settings.fallback_size, diagnostics)
            .await
            .context(SizingSnafu)?;

        let built = build_image(
            runner,
            tree.root(),
            output,
            &operation.mount_dir(),
            estimate.size,
        )
        .await
        .context(BuildSnafu)?;

        Ok((built, estimate))
    }

    /// Remove the workspace. Consumes the manager, so it runs at most once.
    pub fn close(self) -> Result<(), RootfsError> {
        self.workspace.close().context(WorkspaceSnafu)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rootfs::RootfsErrorKind;

    fn empty_tools() -> (tempfile::TempDir, ManagerSettings) {
        let tools = tempfile::tempdir().unwrap();
        let settings = ManagerSettings {
            search_path: Some(tools.path().as_os_str().to_owned()),
            ..ManagerSettings::default()
        };
        (tools, settings)
    }

    #[test]
    fn default_settings() {
        let settings = ManagerSettings::default();
        assert_eq!(settings.fallback_size.mib(), 1024);
        assert_eq!(settings.command_timeout, Duration::from_secs(300));
        assert_eq!(settings.container_prefix, "ocirootfs-extract");
    }

    #[test]
    fn workspace_lives_under_work_dir_and_close_removes_it() {
        let parent = tempfile::tempdir().unwrap();
        let manager = RootfsManager::new(ManagerSettings {
            work_dir: Some(parent.path().join("work")),
            ..ManagerSettings::default()
        })
        .unwrap();

        let path = manager.workspace_path().to_path_buf();
        assert!(path.starts_with(parent.path().join("work")));
        assert!(path.is_dir());

        manager.close().unwrap();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn no_tools_fails_without_side_effects() {
        let (_tools, settings) = empty_tools();
        let manager = RootfsManager::new(settings).unwrap();
        let out = tempfile::tempdir().unwrap();
        let output = out.path().join("rootfs.ext4");

        let err = manager
            .materialize_rootfs(&ImageRef::parse("alpine").unwrap(), &output, None)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), RootfsErrorKind::ToolUnavailable);
        assert!(!output.exists());
        assert_eq!(
            std::fs::read_dir(manager.workspace_path()).unwrap().count(),
            0
        );
    }
}
