// ABOUTME: Rootless pull via skopeo into a local OCI layout, mounted with buildah.
// ABOUTME: The working container stays mounted until the tree is released.

use super::error::BackendError;
use super::sealed::Sealed;
use super::traits::{Backend, ExtractRequest, ExtractedTree};
use super::types::BackendKind;
use crate::diagnostics::{Diagnostics, Warning};
use crate::process::{CommandError, CommandRunner, shell_quote};
use crate::types::ContainerName;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// skopeo copies, buildah mounts inside its user namespace.
#[derive(Debug, Clone, Copy, Default)]
pub struct SkopeoBuildahBackend;

impl Sealed for SkopeoBuildahBackend {}

impl SkopeoBuildahBackend {
    async fn copy_image(
        &self,
        runner: &CommandRunner,
        request: &ExtractRequest<'_>,
        layout: &Path,
    ) -> Result<(), BackendError> {
        let mut copy = runner
            .tool("skopeo")
            .map_err(BackendError::Pull)?
            .arg("copy");
        if let Some(creds) = request.usable_credentials() {
            copy = copy.arg("--src-creds").secret_arg(creds.inline());
        }

        copy.arg(format!("docker://{}", request.image))
            .arg(format!("oci:{}", layout.display()))
            .run()
            .await
            .map_err(BackendError::Pull)?;
        Ok(())
    }

    /// Create the working container and mount it, all inside one
    /// `buildah unshare` so the mount is visible to the host tools that
    /// read from it afterwards.
    async fn mount_container(
        &self,
        runner: &CommandRunner,
        container: &ContainerName,
        layout: &Path,
        report: &Path,
    ) -> Result<(), BackendError> {
        let unshare = runner.tool("buildah").map_err(BackendError::Mount)?;
        let buildah = runner
            .toolbox()
            .resolve("buildah")
            .ok_or_else(|| {
                BackendError::Mount(CommandError::NotFound {
                    tool: "buildah".to_string(),
                })
            })?
            .display()
            .to_string();

        let buildah = shell_quote(&buildah);
        let container = shell_quote(container.as_str());
        let script = format!(
            "{buildah} from --name {container} {source} && {buildah} mount {container} > {report}",
            source = shell_quote(&format!("oci:{}", layout.display())),
            report = shell_quote(&report.display().to_string()),
        );

        unshare
            .args(["unshare", "sh", "-c"])
            .arg(script)
            .run()
            .await
            .map_err(BackendError::Mount)?;
        Ok(())
    }

    async fn remove_container(
        &self,
        runner: &CommandRunner,
        container: &ContainerName,
    ) -> Result<(), CommandError> {
        let cleanup = runner.detached();
        cleanup
            .tool("buildah")?
            .arg("rm")
            .arg(container.as_str())
            .run()
            .await?;
        Ok(())
    }
}

fn read_mount_point(report: &Path) -> Result<PathBuf, BackendError> {
    let contents =
        std::fs::read_to_string(report).map_err(|source| BackendError::MountPointUnreadable {
            path: report.to_path_buf(),
            source,
        })?;

    let mount_point = contents.trim();
    if mount_point.is_empty() {
        return Err(BackendError::EmptyMountPoint(report.to_path_buf()));
    }
    Ok(PathBuf::from(mount_point))
}

#[async_trait]
impl Backend for SkopeoBuildahBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::SkopeoBuildah
    }

    async fn extract(
        &self,
        runner: &CommandRunner,
        request: &ExtractRequest<'_>,
        _diagnostics: &mut Diagnostics,
    ) -> Result<ExtractedTree, BackendError> {
        let layout = request.operation.oci_layout_dir();
        let report = request.operation.mount_point_file();
        let container = request.container_name();

        tracing::info!("pulling {} with skopeo", request.image);
        self.copy_image(runner, request, &layout).await?;

        tracing::debug!("mounting {} as {}", layout.display(), container);
        let mounted = match self
            .mount_container(runner, &container, &layout, &report)
            .await
        {
            Ok(()) => read_mount_point(&report),
            Err(e) => Err(e),
        };

        match mounted {
            Ok(root) => {
                tracing::debug!("{} mounted at {}", container, root.display());
                Ok(ExtractedTree::new(root).with_container(container))
            }
            Err(e) => {
                // The container may or may not exist at this point.
                if let Err(cleanup) = self.remove_container(runner, &container).await {
                    tracing::debug!("discarding {} failed: {}", container, cleanup);
                }
                Err(e)
            }
        }
    }

    async fn release(
        &self,
        runner: &CommandRunner,
        tree: ExtractedTree,
        diagnostics: &mut Diagnostics,
    ) {
        let (_, container) = tree.into_parts();
        let Some(container) = container else {
            return;
        };

        if let Err(e) = self.remove_container(runner, &container).await {
            diagnostics.warn(Warning::container_cleanup(format!(
                "failed to remove buildah container {container}: {e}"
            )));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mount_point_is_trimmed() {
        let dir = tempfile::tempdir().unwrap();
        let report = dir.path().join("mountpoint");
        std::fs::write(&report, "/var/lib/containers/storage/overlay/abc/merged\n").unwrap();

        let root = read_mount_point(&report).unwrap();
        assert_eq!(
            root,
            PathBuf::from("/var/lib/containers/storage/overlay/abc/merged")
        );
    }

    #[test]
    fn empty_mount_point_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let report = dir.path().join("mountpoint");
        std::fs::write(&report, "  \n").unwrap();

        let err = read_mount_point(&report).unwrap_err();
        assert!(matches!(err, BackendError::EmptyMountPoint(_)));
    }

    #[test]
    fn missing_report_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_mount_point(&dir.path().join("mountpoint")).unwrap_err();
        assert!(matches!(err, BackendError::MountPointUnreadable { .. }));
    }
}
