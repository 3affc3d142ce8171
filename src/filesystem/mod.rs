// ABOUTME: Turns an extracted directory tree into a populated ext4 image file.
// ABOUTME: Linear typestate chain from sizing to unmount, with guaranteed unmount.

mod build;
mod error;
mod mount;
mod state;

pub use build::{BuiltImage, ImageBuild, build_image};
pub use error::BuildError;
pub use mount::MountGuard;
pub use state::{Allocated, Copied, Estimated, Formatted, MountPointReady, Mounted, Unmounted};
