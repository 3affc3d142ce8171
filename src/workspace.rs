// ABOUTME: Manager-owned temporary workspace with per-operation subdirectories.
// ABOUTME: Each materialization gets its own op-<n> tree so concurrent calls never alias.

use crate::types::OperationId;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tempfile::TempDir;

const WORKSPACE_PREFIX: &str = "ocirootfs-";

/// The manager's private temporary directory.
#[derive(Debug)]
pub struct Workspace {
    /// `None` once closed.
    root: Option<TempDir>,
    path: PathBuf,
    next_operation: AtomicU64,
}

impl Workspace {
    /// Create a uniquely named workspace under `parent`, or under the system
    /// temp directory when `parent` is `None`.
    pub fn create(parent: Option<&Path>) -> std::io::Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(WORKSPACE_PREFIX);
        let root = match parent {
            Some(parent) => {
                std::fs::create_dir_all(parent)?;
                builder.tempdir_in(parent)?
            }
            None => builder.tempdir()?,
        };
        tracing::debug!("created workspace {}", root.path().display());

        Ok(Self {
            path: root.path().to_path_buf(),
            root: Some(root),
            next_operation: AtomicU64::new(1),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reserve a fresh subdirectory for one materialization.
    pub fn begin_operation(&self) -> std::io::Result<OperationDir> {
        let index = self.next_operation.fetch_add(1, Ordering::Relaxed);
        let id = OperationId::from_index(index);
        let path = self.path.join(id.as_str());
        std::fs::create_dir(&path)?;
        Ok(OperationDir { id, path })
    }

    /// Remove the workspace and everything left in it.
    ///
    /// A workspace with a filesystem still mounted inside it is left on disk
    /// and reported as an error.
    pub fn close(mut self) -> std::io::Result<()> {
        let Some(root) = self.root.take() else {
            return Ok(());
        };
        if let Some(mounted) = self.live_mount() {
            let _ = root.keep();
            return Err(std::io::Error::other(format!(
                "{} is still mounted; leaving workspace {} in place",
                mounted.display(),
                self.path.display()
            )));
        }
        tracing::debug!("removing workspace {}", self.path.display());
        root.close()
    }

    /// First operation mount directory that still has a filesystem on it.
    fn live_mount(&self) -> Option<PathBuf> {
        std::fs::read_dir(&self.path)
            .ok()?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path().join(MOUNT_DIR))
            .find(|dir| is_mount_point(dir))
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if let Some(root) = self.root.take()
            && let Some(mounted) = self.live_mount()
        {
            tracing::warn!(
                "{} is still mounted; leaving workspace {} in place",
                mounted.display(),
                self.path.display()
            );
            let _ = root.keep();
        }
    }
}

const MOUNT_DIR: &str = "mount";

/// Whether `dir` is the root of a mounted filesystem, judged by its device
/// differing from its parent's. Missing paths are not mount points.
pub(crate) fn is_mount_point(dir: &Path) -> bool {
    let Some(parent) = dir.parent() else {
        return false;
    };
    match (std::fs::symlink_metadata(dir), std::fs::metadata(parent)) {
        (Ok(meta), Ok(parent_meta)) => meta.is_dir() && meta.dev() != parent_meta.dev(),
        _ => false,
    }
}

/// One operation's private subtree. Removed on drop.
#[derive(Debug)]
pub struct OperationDir {
    id: OperationId,
    path: PathBuf,
}

impl OperationDir {
    pub fn id(&self) -> &OperationId {
        &self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Where container filesystems are unpacked.
    pub fn extract_dir(&self) -> PathBuf {
        self.path.join("extract")
    }

    /// Where the output image is loop-mounted.
    pub fn mount_dir(&self) -> PathBuf {
        self.path.join(MOUNT_DIR)
    }

    /// Local OCI layout written by the copy tool.
    pub fn oci_layout_dir(&self) -> PathBuf {
        self.path.join("oci-image")
    }

    /// File the rootless builder writes its mount point into.
    pub fn mount_point_file(&self) -> PathBuf {
        self.path.join("mountpoint")
    }
}

impl Drop for OperationDir {
    fn drop(&mut self) {
        // Recursing into a live mount would delete the image's contents.
        let mount_dir = self.mount_dir();
        if is_mount_point(&mount_dir) {
            tracing::warn!(
                "{} is still mounted; leaving operation directory {} in place",
                mount_dir.display(),
                self.path.display()
            );
            return;
        }
        if let Err(e) = std::fs::remove_dir_all(&self.path)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            tracing::warn!(
                "failed to remove operation directory {}: {}",
                self.path.display(),
                e
            );
        }
    }
}
