// ABOUTME: Orchestration from image reference to finished rootfs image.
// ABOUTME: Select backend, extract, size, build, then release everything.

mod error;
mod manager;
mod report;

pub use error::{RootfsError, RootfsErrorKind};
pub use manager::{DEFAULT_CONTAINER_PREFIX, ManagerSettings, RootfsManager};
pub use report::RootfsReport;
