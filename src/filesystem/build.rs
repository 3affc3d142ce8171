// ABOUTME: State transition methods for image construction.
// ABOUTME: Each method consumes self and returns the next state on success.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::process::CommandRunner;
use crate::sizing::SizeSpec;

use super::error::BuildError;
use super::mount::MountGuard;
use super::state::{
    Allocated, Copied, Estimated, Formatted, MountPointReady, Mounted, Unmounted,
};

/// A finished image file.
#[derive(Debug, Clone)]
pub struct BuiltImage {
    pub path: PathBuf,
    pub size: SizeSpec,
}

/// An image build in progress, parameterized by its current state.
#[derive(Debug)]
pub struct ImageBuild<'a, S> {
    runner: &'a CommandRunner,
    source: PathBuf,
    output: PathBuf,
    size: SizeSpec,
    state: S,
}

impl<'a, S> ImageBuild<'a, S> {
    fn transition<T>(self, state: T) -> ImageBuild<'a, T> {
        ImageBuild {
            runner: self.runner,
            source: self.source,
            output: self.output,
            size: self.size,
            state,
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    pub fn size(&self) -> SizeSpec {
        self.size
    }

    pub fn state(&self) -> &S {
        &self.state
    }
}

// =============================================================================
// Estimated -> Allocated -> Formatted
// =============================================================================

impl<'a> ImageBuild<'a, Estimated> {
    /// Validate inputs and start a build of `source` into `output`.
    ///
    /// The output's parent directory is created if needed. A stale regular
    /// file at `output` is removed so the image is always created fresh; a
    /// directory there is refused.
    pub fn new(
        runner: &'a CommandRunner,
        source: &Path,
        output: &Path,
        size: SizeSpec,
    ) -> Result<Self, BuildError> {
        if !source.exists() {
            return Err(BuildError::SourceMissing(source.to_path_buf()));
        }
        if !source.is_dir() {
            return Err(BuildError::SourceNotDirectory(source.to_path_buf()));
        }

        match std::fs::symlink_metadata(output) {
            Ok(meta) if meta.is_dir() => {
                return Err(BuildError::OutputConflict(output.to_path_buf()));
            }
            Ok(_) => {
                tracing::debug!("removing stale output {}", output.display());
                std::fs::remove_file(output).map_err(|e| {
                    BuildError::io(format!("failed to remove stale {}", output.display()), e)
                })?;
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(BuildError::io(
                    format!("failed to inspect {}", output.display()),
                    e,
                ));
            }
        }

        if let Some(parent) = output.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                BuildError::io(
                    format!("failed to create output directory {}", parent.display()),
                    e,
                )
            })?;
        }

        Ok(ImageBuild {
            runner,
            source: source.to_path_buf(),
            output: output.to_path_buf(),
            size,
            state: Estimated,
        })
    }

    /// Allocate a sparse file of the estimated size.
    pub async fn allocate(self) -> Result<ImageBuild<'a, Allocated>, BuildError> {
        self.runner
            .tool("fallocate")
            .map_err(BuildError::Allocate)?
            .arg("-l")
            .arg(self.size.to_arg())
            .arg_path(&self.output)
            .run()
            .await
            .map_err(BuildError::Allocate)?;

        Ok(self.transition(Allocated))
    }
}

impl<'a> ImageBuild<'a, Allocated> {
    /// Format the file as ext4.
    pub async fn format(self) -> Result<ImageBuild<'a, Formatted>, BuildError> {
        self.runner
            .tool("mkfs.ext4")
            .map_err(BuildError::Format)?
            .args(["-F", "-q"])
            .arg_path(&self.output)
            .run()
            .await
            .map_err(BuildError::Format)?;

        Ok(self.transition(Formatted))
    }
}

// =============================================================================
// Formatted -> MountPointReady -> Mounted
// =============================================================================

impl<'a> ImageBuild<'a, Formatted> {
    /// Create the scratch mount point.
    pub fn prepare_mount_point(
        self,
        mount_dir: &Path,
    ) -> Result<ImageBuild<'a, MountPointReady>, BuildError> {
        std::fs::create_dir_all(mount_dir).map_err(|e| {
            BuildError::io(
                format!("failed to create mount directory {}", mount_dir.display()),
                e,
            )
        })?;

        Ok(self.transition(MountPointReady {
            mount_dir: mount_dir.to_path_buf(),
        }))
    }
}

impl<'a> ImageBuild<'a, MountPointReady> {
    /// Loop-mount the image on the mount point.
    pub async fn mount(self) -> Result<ImageBuild<'a, Mounted>, BuildError> {
        let guard = MountGuard::mount_loop(self.runner, &self.output, &self.state.mount_dir)
            .await
            .map_err(BuildError::Mount)?;

        Ok(self.transition(Mounted { guard }))
    }
}

// =============================================================================
// Mounted -> Copied -> Unmounted
// =============================================================================

impl<'a> ImageBuild<'a, Mounted> {
    /// Copy the whole source tree into the image, preserving permissions,
    /// ownership, timestamps, links and special files.
    ///
    /// On failure the image is unmounted before the copy error is returned.
    pub async fn copy_tree(mut self) -> Result<ImageBuild<'a, Copied>, BuildError> {
        let mut target: OsString = self.state.guard.mount_point().as_os_str().to_owned();
        target.push("/");

        let copied = match self.runner.tool("cp") {
            Ok(cp) => {
                cp.arg("-a")
                    .arg_path(&self.source.join("."))
                    .arg(&target)
                    .run()
                    .await
            }
            Err(e) => Err(e),
        };

        if let Err(e) = copied {
            if let Err(unmount) = self.state.guard.unmount(self.runner).await {
                tracing::warn!("unmount after failed copy also failed: {}", unmount);
            }
            return Err(BuildError::Copy(e));
        }

        let guard = self.state.guard;
        Ok(ImageBuild {
            runner: self.runner,
            source: self.source,
            output: self.output,
            size: self.size,
            state: Copied { guard },
        })
    }
}

impl<'a> ImageBuild<'a, Copied> {
    /// Unmount the finished image.
    pub async fn unmount(mut self) -> Result<ImageBuild<'a, Unmounted>, BuildError> {
        self.state
            .guard
            .unmount(self.runner)
            .await
            .map_err(BuildError::Unmount)?;

        Ok(self.transition(Unmounted))
    }
}

impl ImageBuild<'_, Unmounted> {
    pub fn finish(self) -> BuiltImage {
        BuiltImage {
            path: self.output,
            size: self.size,
        }
    }
}

/// Run the whole chain: allocate, format, mount, copy, unmount.
pub async fn build_image(
    runner: &CommandRunner,
    source: &Path,
    output: &Path,
    mount_dir: &Path,
    size: SizeSpec,
) -> Result<BuiltImage, BuildError> {
    tracing::info!(
        "building {} image at {} from {}",
        size,
        output.display(),
        source.display()
    );

    let built = ImageBuild::new(runner, source, output, size)?
        .allocate()
        .await?
        .format()
        .await?
        .prepare_mount_point(mount_dir)?
        .mount()
        .await?
        .copy_tree()
        .await?
        .unmount()
        .await?
        .finish();

    tracing::info!("image {} ready", built.path.display());
    Ok(built)
}
