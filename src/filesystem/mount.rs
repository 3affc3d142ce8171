// ABOUTME: RAII guard for a loop mount.
// ABOUTME: Unmounts explicitly on the normal path and synchronously on drop otherwise.

use crate::process::{CommandError, CommandRunner};
use std::path::{Path, PathBuf};

/// A live mount on `mount_point`.
///
/// `unmount()` is the normal path. If the guard is dropped while still
/// mounted (an early return, a panic, or a cancelled future) `Drop` runs the
/// same umount binary synchronously so a loop device never outlives the build.
#[derive(Debug)]
pub struct MountGuard {
    mount_point: PathBuf,
    umount: PathBuf,
    mounted: bool,
}

impl MountGuard {
    /// Mount `image` on `mount_point` with `mount -o loop`.
    ///
    /// `umount` is resolved before mounting so release is always possible.
    pub async fn mount_loop(
        runner: &CommandRunner,
        image: &Path,
        mount_point: &Path,
    ) -> Result<Self, CommandError> {
        let umount = runner
            .toolbox()
            .resolve("umount")
            .ok_or_else(|| CommandError::NotFound {
                tool: "umount".to_string(),
            })?;

        runner
            .tool("mount")?
            .args(["-o", "loop"])
            .arg_path(image)
            .arg_path(mount_point)
            .run()
            .await?;

        Ok(Self {
            mount_point: mount_point.to_path_buf(),
            umount,
            mounted: true,
        })
    }

    pub fn mount_point(&self) -> &Path {
        &self.mount_point
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Unmount. Ignores the runner's cancellation: release must happen even
    /// when the build was cancelled.
    pub async fn unmount(&mut self, runner: &CommandRunner) -> Result<(), CommandError> {
        if !self.mounted {
            return Ok(());
        }

        runner
            .detached()
            .tool("umount")?
            .arg_path(&self.mount_point)
            .run()
            .await?;

        self.mounted = false;
        tracing::debug!("unmounted {}", self.mount_point.display());
        Ok(())
    }
}

impl Drop for MountGuard {
    fn drop(&mut self) {
        if !self.mounted {
            return;
        }

        tracing::debug!("releasing mount {} on drop", self.mount_point.display());
        match std::process::Command::new(&self.umount)
            .arg(&self.mount_point)
            .status()
        {
            Ok(status) if status.success() => {}
            Ok(status) => tracing::warn!(
                "umount {} exited with {}",
                self.mount_point.display(),
                status
            ),
            Err(e) => tracing::warn!("failed to run umount {}: {}", self.mount_point.display(), e),
        }
    }
}
