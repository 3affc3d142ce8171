// ABOUTME: Image build state marker types for the type state pattern.
// ABOUTME: Mounted states own the mount guard so it cannot leak past a transition.

use super::mount::MountGuard;
use std::path::{Path, PathBuf};

/// Capacity estimated, nothing on disk yet.
/// Available actions: `allocate()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Estimated;

/// Sparse file allocated at the output path.
/// Available actions: `format()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Allocated;

/// Output file holds an empty ext4 filesystem.
/// Available actions: `prepare_mount_point()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Formatted;

/// Scratch mount point exists.
/// Available actions: `mount()`
#[derive(Debug, Clone)]
pub struct MountPointReady {
    pub(crate) mount_dir: PathBuf,
}

impl MountPointReady {
    pub fn mount_dir(&self) -> &Path {
        &self.mount_dir
    }
}

/// Image loop-mounted on the mount point.
/// Available actions: `copy_tree()`
#[derive(Debug)]
pub struct Mounted {
    pub(crate) guard: MountGuard,
}

impl Mounted {
    pub fn mount_dir(&self) -> &Path {
        self.guard.mount_point()
    }
}

/// Tree copied into the mounted image.
/// Available actions: `unmount()`
#[derive(Debug)]
pub struct Copied {
    pub(crate) guard: MountGuard,
}

/// Image unmounted and complete.
/// Available actions: `finish()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Unmounted;
