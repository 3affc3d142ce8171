// ABOUTME: Backend kind definitions.
// ABOUTME: Names each tool chain and the host tools it needs.

use serde::{Deserialize, Serialize};

/// The tool chain used to pull and extract an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    /// skopeo copies the image, rootless buildah mounts it.
    SkopeoBuildah,
    /// podman creates a container and exports it.
    Podman,
    /// docker creates a container and exports it.
    Docker,
}

impl BackendKind {
    /// Tools that must all be present for this backend.
    pub fn required_tools(&self) -> &'static [&'static str] {
        match self {
            BackendKind::SkopeoBuildah => &["skopeo", "buildah"],
            BackendKind::Podman => &["podman"],
            BackendKind::Docker => &["docker"],
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::SkopeoBuildah => write!(f, "skopeo+buildah"),
            BackendKind::Podman => write!(f, "podman"),
            BackendKind::Docker => write!(f, "docker"),
        }
    }
}
